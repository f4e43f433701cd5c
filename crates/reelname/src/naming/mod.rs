//! Destination path resolution.
//!
//! Turns a file, its group and the naming settings into a path relative to the
//! destination's base directory, following Jellyfin or Plex library layout.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::{NamingConfig, NamingPreset};
use crate::db::{ExtraType, FileCategory, Group, MediaFile};

static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static MULTI_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z]+)(?::(\d+))?\}").unwrap());

/// Computes where a file goes inside a destination.
pub trait PathResolver: Send + Sync {
    /// Relative path, `/`-separated, including the file extension.
    fn resolve_path(&self, file: &MediaFile, group: &Group, naming: &NamingConfig) -> String;
}

struct Templates {
    movie: &'static str,
    episode: &'static str,
    special: &'static str,
    extra: &'static str,
}

const JELLYFIN: Templates = Templates {
    movie: "{title} ({year})/{title} ({year}).{ext}",
    episode: "{title} ({year})/Season {season:2}/{title} S{season:2}E{episode:2} - {episodeTitle}.{ext}",
    special: "{title} ({year})/Season 00/{title} S00E{episode:2} - {episodeTitle}.{ext}",
    extra: "{title} ({year})/{extraFolder}/{fileName}.{ext}",
};

const PLEX: Templates = Templates {
    movie: "{title} ({year})/{title} ({year}).{ext}",
    episode: "{title} ({year})/Season {season:2}/{title} ({year}) - s{season:2}e{episode:2} - {episodeTitle}.{ext}",
    special: "{title} ({year})/{specialsFolder}/{title} ({year}) - s00e{episode:2} - {episodeTitle}.{ext}",
    extra: "{title} ({year})/{extraFolder}/{fileName}.{ext}",
};

fn jellyfin_extra_folder(extra_type: ExtraType) -> &'static str {
    match extra_type {
        ExtraType::BehindTheScenes => "behind the scenes",
        ExtraType::DeletedScenes => "deleted scenes",
        ExtraType::Featurettes => "featurettes",
        ExtraType::Interviews => "interviews",
        ExtraType::Scenes => "clips",
        ExtraType::Shorts => "shorts",
        ExtraType::Trailers => "trailers",
        ExtraType::Other => "extras",
    }
}

fn plex_extra_folder(extra_type: ExtraType) -> &'static str {
    match extra_type {
        ExtraType::BehindTheScenes => "Behind The Scenes",
        ExtraType::DeletedScenes => "Deleted Scenes",
        ExtraType::Featurettes => "Featurettes",
        ExtraType::Interviews => "Interviews",
        ExtraType::Scenes => "Scenes",
        ExtraType::Shorts => "Shorts",
        ExtraType::Trailers => "Trailers",
        ExtraType::Other => "Other",
    }
}

/// Makes a string safe as a single path component.
///
/// Drops characters that are invalid on common filesystems, collapses
/// whitespace, and strips leading dots so a component can never be `..`.
pub fn sanitize(s: &str) -> String {
    let cleaned = INVALID_CHARS.replace_all(s, "");
    let cleaned = MULTI_SPACES.replace_all(&cleaned, " ");
    cleaned.trim().trim_start_matches('.').trim_start().to_string()
}

/// The stock resolver: one fixed template per file category and preset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver;

impl TemplateResolver {
    pub fn new() -> Self {
        Self
    }
}

impl PathResolver for TemplateResolver {
    fn resolve_path(&self, file: &MediaFile, group: &Group, naming: &NamingConfig) -> String {
        let templates = match naming.preset {
            NamingPreset::Jellyfin => &JELLYFIN,
            NamingPreset::Plex => &PLEX,
        };
        let template = match file.file_category {
            FileCategory::Movie => templates.movie,
            FileCategory::Episode => templates.episode,
            FileCategory::Special => templates.special,
            FileCategory::Extra => templates.extra,
        };

        let title = [
            group.catalog_title.as_deref(),
            group.parsed_title.as_deref(),
            file.catalog_title.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(sanitize)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

        let year = group
            .catalog_year
            .or(group.parsed_year)
            .or(file.catalog_year)
            .map(|y| y.to_string())
            .unwrap_or_default();

        let ext = file.file_extension.trim_start_matches('.');
        let episode_title = sanitize(file.episode_title.as_deref().unwrap_or(""));
        let file_stem = match file.file_name.rfind('.') {
            Some(pos) if pos > 0 => sanitize(&file.file_name[..pos]),
            _ => sanitize(&file.file_name),
        };

        let extra_folder = match (file.extra_type, naming.preset) {
            (Some(et), NamingPreset::Jellyfin) => jellyfin_extra_folder(et).to_string(),
            (Some(et), NamingPreset::Plex) => plex_extra_folder(et).to_string(),
            (None, NamingPreset::Jellyfin) => sanitize(&naming.extras_folder_name).to_lowercase(),
            (None, NamingPreset::Plex) => sanitize(&naming.extras_folder_name),
        };
        let specials_folder = sanitize(&naming.specials_folder_name);

        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| -> String {
            let width = caps
                .get(2)
                .and_then(|w| w.as_str().parse::<usize>().ok())
                .unwrap_or(0);
            match &caps[1] {
                "title" => title.clone(),
                "year" => year.clone(),
                "ext" => ext.to_string(),
                "episodeTitle" => episode_title.clone(),
                "fileName" => file_stem.clone(),
                "extraFolder" => extra_folder.clone(),
                "specialsFolder" => specials_folder.clone(),
                "season" => pad(file.parsed_season, width),
                "episode" => pad(file.parsed_episode, width),
                other => format!("{{{}}}", other),
            }
        });

        rendered.replace(" - .", ".").replace(" ()", "")
    }
}

fn pad(value: Option<i64>, width: usize) -> String {
    format!("{:0>width$}", value.unwrap_or(0), width = width)
}
