//! Runs one file transfer from start to a recorded outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use super::local::copy_local;
use super::progress::{NoopObserver, TransferObserver, TransferOutcome, TransferProgress};
use super::sftp::copy_sftp;
use crate::config::{NamingConfig, TransferSettings};
use crate::db::{
    destination_repo, file_repo, group_repo, Database, DestinationKind, FileUpdate, GroupStatus,
    MediaFile,
};
use crate::error::TransferError;
use crate::naming::{PathResolver, TemplateResolver};

/// Everything a worker needs to run transfers.
pub struct TransferContext {
    pub db: Database,
    pub resolver: Arc<dyn PathResolver>,
    pub naming: NamingConfig,
    pub settings: TransferSettings,
    pub observer: Arc<dyn TransferObserver>,
}

impl TransferContext {
    /// Context with the template resolver and no observer.
    pub fn new(db: Database, naming: NamingConfig, settings: TransferSettings) -> Self {
        Self {
            db,
            resolver: Arc::new(TemplateResolver::new()),
            naming,
            settings,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Joins a `/`-separated relative path onto a remote base directory.
fn remote_join(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        format!("/{}", relative)
    } else {
        format!("{}/{}", base, relative)
    }
}

fn local_join(base: &str, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(PathBuf::from(base), |path, segment| path.join(segment))
}

/// Transfers one file and records the outcome on it.
///
/// Only a missing file is returned as an error, since there is nothing to
/// record it on. Every other failure is written to the file as
/// `status = failed` with the message and last known progress.
pub async fn process_transfer(
    ctx: &TransferContext,
    file_id: i64,
    destination_id: i64,
) -> Result<TransferOutcome, TransferError> {
    let file = file_repo::find_by_id(&ctx.db, file_id)?.ok_or(TransferError::EntityNotFound {
        kind: "file",
        id: file_id,
    })?;

    let mut last: Option<TransferProgress> = None;
    let outcome = match run(ctx, &file, destination_id, &mut last).await {
        Ok((destination_path, total_bytes)) => {
            file_repo::update(
                &ctx.db,
                file_id,
                &FileUpdate {
                    status: Some(GroupStatus::Completed),
                    transfer_progress: Some(Some(1.0)),
                    transfer_error: Some(None),
                    destination_path: Some(Some(destination_path.clone())),
                    ..Default::default()
                },
            )?;
            info!("Transferred file {} to {}", file_id, destination_path);
            TransferOutcome::Completed {
                destination_path,
                total_bytes,
            }
        }
        Err(e) => {
            let message = e.to_string();
            error!("Transfer of file {} failed: {}", file_id, message);
            file_repo::update(
                &ctx.db,
                file_id,
                &FileUpdate {
                    status: Some(GroupStatus::Failed),
                    transfer_error: Some(Some(message.clone())),
                    transfer_progress: Some(Some(last.map_or(0.0, |p| p.fraction()))),
                    ..Default::default()
                },
            )?;
            TransferOutcome::Failed {
                error: message,
                progress: last,
            }
        }
    };

    ctx.observer.on_finished(file_id, &outcome);
    Ok(outcome)
}

async fn run(
    ctx: &TransferContext,
    file: &MediaFile,
    destination_id: i64,
    last: &mut Option<TransferProgress>,
) -> Result<(String, u64), TransferError> {
    let destination = destination_repo::find_by_id(&ctx.db, destination_id)?.ok_or(
        TransferError::EntityNotFound {
            kind: "destination",
            id: destination_id,
        },
    )?;
    let group_id = file.group_id.ok_or(TransferError::EntityNotFound {
        kind: "group",
        id: 0,
    })?;
    let group = group_repo::find_by_id(&ctx.db, group_id)?.ok_or(TransferError::EntityNotFound {
        kind: "group",
        id: group_id,
    })?;

    file_repo::update(
        &ctx.db,
        file.id,
        &FileUpdate {
            status: Some(GroupStatus::Transferring),
            transfer_progress: Some(Some(0.0)),
            transfer_error: Some(None),
            destination_id: Some(Some(destination_id)),
            ..Default::default()
        },
    )?;

    let relative = ctx.resolver.resolve_path(file, &group, &ctx.naming);
    let source = Path::new(&file.source_path);

    let db = &ctx.db;
    let observer = &ctx.observer;
    let file_id = file.id;
    let on_progress = |progress: TransferProgress| {
        *last = Some(progress);
        let fraction = progress.fraction();
        // The final 1.0 is written together with the completed status.
        if fraction < 1.0 {
            if let Err(e) = file_repo::update(db, file_id, &FileUpdate::progress(fraction)) {
                warn!("Could not record progress for file {}: {}", file_id, e);
            }
        }
        observer.on_progress(file_id, progress);
    };

    match destination.kind {
        DestinationKind::Local => {
            let target = local_join(&destination.base_path, &relative);
            info!("Copying file {} to {}", file.id, target.display());
            let bytes = copy_local(source, &target, ctx.settings.chunk_size, on_progress).await?;
            Ok((target.to_string_lossy().into_owned(), bytes))
        }
        DestinationKind::Ssh => {
            let target = remote_join(&destination.base_path, &relative);
            info!(
                "Uploading file {} to {}:{}",
                file.id, destination.name, target
            );
            let bytes = copy_sftp(
                &destination,
                source,
                &target,
                ctx.settings.chunk_size,
                ctx.settings.connect_timeout(),
                on_progress,
            )
            .await?;
            Ok((target, bytes))
        }
    }
}
