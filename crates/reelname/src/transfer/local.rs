//! Resumable copy to a locally mounted destination.

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use log::{debug, warn};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::progress::TransferProgress;
use crate::error::TransferError;

/// Copies `source` to `dest`, creating parent directories.
///
/// A partial `dest` shorter than the source is resumed from its length; one of
/// equal length is taken as complete without reading the source; a longer one
/// is truncated and rewritten. `on_progress` is called after every chunk with
/// absolute byte counts. Returns the number of bytes now at `dest`.
pub async fn copy_local<F>(
    source: &Path,
    dest: &Path,
    chunk_size: usize,
    mut on_progress: F,
) -> Result<u64, TransferError>
where
    F: FnMut(TransferProgress),
{
    let total = fs::metadata(source)
        .await
        .map_err(|e| TransferError::io(source, e))?
        .len();

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| TransferError::io(parent, e))?;
    }

    let existing = match fs::metadata(dest).await {
        Ok(meta) if meta.is_dir() => {
            return Err(TransferError::io(
                dest,
                std::io::Error::other("destination is a directory"),
            ))
        }
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => 0,
        Err(e) => return Err(TransferError::io(dest, e)),
    };

    if existing == total {
        if total == 0 {
            File::create(dest)
                .await
                .map_err(|e| TransferError::io(dest, e))?;
        }
        debug!("{} already complete ({} bytes)", dest.display(), total);
        on_progress(TransferProgress::new(total, total));
        return Ok(total);
    }

    let (offset, mut out) = if existing < total && existing > 0 {
        debug!(
            "Resuming {} at byte {} of {}",
            dest.display(),
            existing,
            total
        );
        let file = OpenOptions::new()
            .append(true)
            .open(dest)
            .await
            .map_err(|e| TransferError::io(dest, e))?;
        (existing, file)
    } else {
        if existing > total {
            warn!(
                "{} is larger than its source ({} > {} bytes), restarting",
                dest.display(),
                existing,
                total
            );
        }
        let file = File::create(dest)
            .await
            .map_err(|e| TransferError::io(dest, e))?;
        (0, file)
    };

    let mut input = File::open(source)
        .await
        .map_err(|e| TransferError::io(source, e))?;
    if offset > 0 {
        input
            .seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| TransferError::io(source, e))?;
    }

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut transferred = offset;
    loop {
        let n = input
            .read(&mut buf)
            .await
            .map_err(|e| TransferError::io(source, e))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])
            .await
            .map_err(|e| TransferError::io(dest, e))?;
        transferred += n as u64;
        on_progress(TransferProgress::new(transferred, total.max(transferred)));
    }
    out.flush().await.map_err(|e| TransferError::io(dest, e))?;

    if transferred < total {
        return Err(TransferError::io(
            source,
            std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("source ended after {} of {} bytes", transferred, total),
            ),
        ));
    }
    Ok(transferred)
}
