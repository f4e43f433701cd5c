//! Builder patterns for creating test data programmatically.
//!
//! These builders allow creating engine configs and scanner output without
//! repetitive boilerplate code.

#![allow(dead_code)]

use std::path::PathBuf;

use reelname::config::{EngineConfig, NamingPreset};
use reelname::db::{ExtraType, FileCategory, MediaType};
use reelname::ingest::{ParsedFile, ParsedFolder, ScannedFile, ScannedFolder};

/// Builder for creating `EngineConfig` instances.
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    /// Create a new builder with sensible defaults for testing.
    pub fn new() -> Self {
        let mut config = EngineConfig::default();
        config.transfer.chunk_size = 1024;
        Self { config }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.auto_match_threshold = threshold;
        self
    }

    pub fn max_concurrent(mut self, count: usize) -> Self {
        self.config.max_concurrent_transfers = count;
        self
    }

    pub fn preset(mut self, preset: NamingPreset) -> Self {
        self.config.naming.preset = preset;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.transfer.chunk_size = size;
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.config.catalog.api_key = Some(key.to_string());
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one scanned folder. Files are written to disk as they are added.
pub struct FolderBuilder {
    dir: PathBuf,
    folder_name: String,
    parsed: ParsedFolder,
    files: Vec<ScannedFile>,
}

impl FolderBuilder {
    pub fn new(dir: PathBuf, folder_name: &str) -> Self {
        std::fs::create_dir_all(&dir).expect("Failed to create folder");
        Self {
            dir,
            folder_name: folder_name.to_string(),
            parsed: ParsedFolder::default(),
            files: Vec::new(),
        }
    }

    /// Parser output for the folder name.
    pub fn parsed(mut self, title: &str, year: Option<i64>) -> Self {
        self.parsed = ParsedFolder {
            title: Some(title.to_string()),
            year,
        };
        self
    }

    fn write(&self, file_name: &str, content: &[u8]) -> String {
        let path = self.dir.join(file_name);
        std::fs::write(&path, content).expect("Failed to write media file");
        path.to_string_lossy().into_owned()
    }

    fn push(
        mut self,
        file_name: &str,
        content: &[u8],
        category: FileCategory,
        extra_type: Option<ExtraType>,
        parsed: ParsedFile,
    ) -> Self {
        let source_path = self.write(file_name, content);
        let file_extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();
        self.files.push(ScannedFile {
            source_path,
            file_name: file_name.to_string(),
            file_size: content.len() as i64,
            file_extension,
            detected_season: parsed.season,
            file_category: category,
            extra_type,
            parsed,
        });
        self
    }

    pub fn episode(self, file_name: &str, season: i64, episode: i64, content: &[u8]) -> Self {
        let parsed = ParsedFile {
            season: Some(season),
            episode: Some(episode),
            media_type: MediaType::Tv,
            ..Default::default()
        };
        self.push(file_name, content, FileCategory::Episode, None, parsed)
    }

    /// A season 0 episode.
    pub fn special(self, file_name: &str, episode: i64, content: &[u8]) -> Self {
        let parsed = ParsedFile {
            season: Some(0),
            episode: Some(episode),
            media_type: MediaType::Tv,
            ..Default::default()
        };
        self.push(file_name, content, FileCategory::Special, None, parsed)
    }

    pub fn movie(self, file_name: &str, content: &[u8]) -> Self {
        let parsed = ParsedFile {
            media_type: MediaType::Movie,
            ..Default::default()
        };
        self.push(file_name, content, FileCategory::Movie, None, parsed)
    }

    pub fn extra(self, file_name: &str, extra_type: ExtraType, content: &[u8]) -> Self {
        self.push(
            file_name,
            content,
            FileCategory::Extra,
            Some(extra_type),
            ParsedFile::default(),
        )
    }

    pub fn build(self) -> ScannedFolder {
        ScannedFolder {
            folder_path: self.dir.to_string_lossy().into_owned(),
            folder_name: self.folder_name,
            parsed: self.parsed,
            files: self.files,
        }
    }
}

/// Deterministic bytes of length `len`.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}
