//! Uploads to SSH destinations over SFTP.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use russh::client::{self, Handle};
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::progress::TransferProgress;
use crate::db::{Destination, DestinationKind};
use crate::error::TransferError;
use crate::secrets::expand_home;

const DEFAULT_SSH_PORT: u16 = 22;

struct SshHandler;

#[async_trait]
impl client::Handler for SshHandler {
    type Error = russh::Error;

    // Host keys are not pinned; destinations are configured by the user.
    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

struct SshTarget<'a> {
    host: &'a str,
    port: u16,
    user: &'a str,
}

impl std::fmt::Display for SshTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

fn ssh_target(dest: &Destination) -> Result<SshTarget<'_>, TransferError> {
    if dest.kind != DestinationKind::Ssh {
        return Err(TransferError::InvalidDestination(format!(
            "'{}' is not an SSH destination",
            dest.name
        )));
    }
    let host = dest
        .ssh_host
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            TransferError::InvalidDestination(format!("'{}' has no SSH host", dest.name))
        })?;
    let user = dest
        .ssh_user
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            TransferError::InvalidDestination(format!("'{}' has no SSH user", dest.name))
        })?;
    Ok(SshTarget {
        host,
        port: dest.ssh_port.unwrap_or(DEFAULT_SSH_PORT),
        user,
    })
}

async fn load_key(dest: &Destination) -> Result<Option<ssh_key::PrivateKey>, TransferError> {
    let Some(path) = dest.ssh_key_path.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let path = expand_home(path);
    let data = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| TransferError::io(&path, e))?;
    let passphrase = dest
        .ssh_key_passphrase
        .as_deref()
        .filter(|p| !p.is_empty());
    russh_keys::decode_secret_key(&data, passphrase)
        .map(Some)
        .map_err(|e| TransferError::Connection(format!("cannot load key '{}': {}", path, e)))
}

fn connection_error(target: &SshTarget<'_>, e: impl std::fmt::Display) -> TransferError {
    TransferError::Connection(format!("{}: {}", target, e))
}

/// Connects and authenticates within `timeout`.
async fn connect(
    dest: &Destination,
    timeout: Duration,
) -> Result<Handle<SshHandler>, TransferError> {
    let target = ssh_target(dest)?;
    let key = load_key(dest).await?;

    let handshake = async {
        let config = Arc::new(client::Config::default());
        let mut session = client::connect(config, (target.host, target.port), SshHandler)
            .await
            .map_err(|e| connection_error(&target, e))?;

        let authenticated = match key {
            Some(key) => {
                session
                    .authenticate_publickey(target.user, Arc::new(key))
                    .await
            }
            None => session.authenticate_none(target.user).await,
        }
        .map_err(|e| connection_error(&target, e))?;

        if !authenticated {
            return Err(connection_error(&target, "authentication rejected"));
        }
        Ok(session)
    };

    tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| {
            connection_error(
                &target,
                format!("timed out after {}s", timeout.as_secs_f64()),
            )
        })?
}

async fn disconnect(session: Handle<SshHandler>) {
    if let Err(e) = session
        .disconnect(Disconnect::ByApplication, "", "en")
        .await
    {
        debug!("SSH disconnect failed: {}", e);
    }
}

/// Directory operations `create_dirs` needs from a remote filesystem.
#[async_trait]
trait RemoteDirs: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, String>;
    async fn mkdir(&self, path: &str) -> Result<(), String>;
}

#[async_trait]
impl RemoteDirs for SftpSession {
    async fn exists(&self, path: &str) -> Result<bool, String> {
        self.try_exists(path).await.map_err(|e| e.to_string())
    }

    async fn mkdir(&self, path: &str) -> Result<(), String> {
        self.create_dir(path).await.map_err(|e| e.to_string())
    }
}

/// Creates every directory along `dir`.
///
/// A segment whose mkdir fails but which exists afterwards is fine. Other
/// failures are tolerated on the way down, since an ancestor may be
/// unreadable to the user. If `dir` is still missing at the end, the first
/// failure is returned.
async fn create_dirs<D: RemoteDirs + ?Sized>(dirs: &D, dir: &str) -> Result<(), TransferError> {
    let mut current = String::new();
    if dir.starts_with('/') {
        current.push('/');
    }
    let mut failure = None;
    for segment in dir.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(segment);
        if let Err(e) = dirs.mkdir(&current).await {
            if matches!(dirs.exists(&current).await, Ok(true)) {
                continue;
            }
            debug!("Remote mkdir '{}' failed: {}", current, e);
            if failure.is_none() {
                failure = Some((current.clone(), e));
            }
        }
    }

    match failure {
        Some((path, e)) if !matches!(dirs.exists(dir).await, Ok(true)) => Err(TransferError::io(
            path,
            std::io::Error::other(format!("cannot create directory: {}", e)),
        )),
        _ => Ok(()),
    }
}

fn remote_parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i]).filter(|p| !p.is_empty())
}

async fn upload<F>(
    session: &Handle<SshHandler>,
    target: &SshTarget<'_>,
    source: &Path,
    remote_path: &str,
    chunk_size: usize,
    on_progress: &mut F,
) -> Result<u64, TransferError>
where
    F: FnMut(TransferProgress),
{
    let channel = session
        .channel_open_session()
        .await
        .map_err(|e| connection_error(target, e))?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(|e| connection_error(target, e))?;
    let sftp = SftpSession::new(channel.into_stream())
        .await
        .map_err(|e| connection_error(target, e))?;

    if let Some(parent) = remote_parent(remote_path) {
        create_dirs(&sftp, parent).await?;
    }

    let mut input = File::open(source)
        .await
        .map_err(|e| TransferError::io(source, e))?;
    let total = input
        .metadata()
        .await
        .map_err(|e| TransferError::io(source, e))?
        .len();

    let remote_io = |e: std::io::Error| TransferError::io(remote_path, e);
    let mut remote = sftp
        .create(remote_path)
        .await
        .map_err(|e| remote_io(std::io::Error::other(e.to_string())))?;

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut transferred = 0u64;
    if total == 0 {
        on_progress(TransferProgress::new(0, 0));
    }
    loop {
        let n = input
            .read(&mut buf)
            .await
            .map_err(|e| TransferError::io(source, e))?;
        if n == 0 {
            break;
        }
        remote.write_all(&buf[..n]).await.map_err(remote_io)?;
        transferred += n as u64;
        on_progress(TransferProgress::new(transferred, total.max(transferred)));
    }
    remote.flush().await.map_err(remote_io)?;
    remote.shutdown().await.map_err(remote_io)?;
    Ok(transferred)
}

/// Uploads `source` to the absolute `remote_path` on an SSH destination.
///
/// Remote files are always written from the start. The session is closed on
/// every path out, success or not.
pub async fn copy_sftp<F>(
    dest: &Destination,
    source: &Path,
    remote_path: &str,
    chunk_size: usize,
    connect_timeout: Duration,
    mut on_progress: F,
) -> Result<u64, TransferError>
where
    F: FnMut(TransferProgress),
{
    let target = ssh_target(dest)?;
    let session = connect(dest, connect_timeout).await?;
    debug!("Connected to {} for {}", target, remote_path);

    let result = upload(
        &session,
        &target,
        source,
        remote_path,
        chunk_size,
        &mut on_progress,
    )
    .await;
    disconnect(session).await;
    result
}

/// Connects and authenticates only, to validate a destination before it is saved.
pub async fn test_connection(
    dest: &Destination,
    timeout: Duration,
) -> Result<String, TransferError> {
    let target = ssh_target(dest)?;
    let session = connect(dest, timeout).await?;
    disconnect(session).await;
    info!("SSH connection test to {} succeeded", target);
    Ok(format!("Connected and authenticated as {}", target))
}
