//! Uploads post images to the web host over SFTP.
use crate::config::{Sftp, SftpAuth};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ssh2::Session;
use std::io::Write;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Remote asset store. Returns the public URL of the uploaded file, or `None`
/// when the upload failed; callers treat `None` as "image skipped", never as
/// a fatal batch error.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, local_path: &Path, post_number: u32) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct SftpUploader {
    cfg: Sftp,
    auth: SftpAuth,
}

impl SftpUploader {
    /// Fails when the config carries neither a private key nor a password.
    pub fn from_config(cfg: &Sftp) -> Result<Self> {
        let auth = cfg.auth()?;
        Ok(Self {
            cfg: cfg.clone(),
            auth,
        })
    }

    /// Open a session, authenticate, and return the SFTP channel. The session
    /// is torn down on drop, so every exit path closes it.
    fn connect(&self) -> Result<(Session, ssh2::Sftp)> {
        let addr = format!("{}:{}", self.cfg.host, self.cfg.port);
        let tcp = TcpStream::connect(&addr)
            .with_context(|| format!("failed to connect to {addr}"))?;
        let mut session = Session::new().context("failed to create ssh session")?;
        session.set_tcp_stream(tcp);
        session.handshake().context("ssh handshake failed")?;

        match &self.auth {
            SftpAuth::PrivateKey(key) => {
                let key_path = shellexpand::tilde(key);
                session
                    .userauth_pubkey_file(
                        &self.cfg.username,
                        None,
                        Path::new(key_path.as_ref()),
                        None,
                    )
                    .with_context(|| format!("key auth failed for {}", self.cfg.username))?;
            }
            SftpAuth::Password(password) => {
                session
                    .userauth_password(&self.cfg.username, password)
                    .with_context(|| format!("password auth failed for {}", self.cfg.username))?;
            }
        }

        let sftp = session.sftp().context("failed to open sftp channel")?;
        Ok((session, sftp))
    }

    /// Connectivity probe: authenticate and list the configured remote image
    /// path. `Ok(true)` means the path is listable; `Ok(false)` means auth
    /// succeeded but the path is missing.
    pub fn probe_remote_path(&self) -> Result<bool> {
        let (_session, sftp) = self.connect()?;
        Ok(sftp
            .readdir(Path::new(&self.cfg.remote_image_path))
            .is_ok())
    }

    pub fn remote_image_path(&self) -> &str {
        &self.cfg.remote_image_path
    }

    fn upload_blocking(&self, local_path: &Path, post_number: u32) -> Result<String> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid image file name: {}", local_path.display()))?;

        let (_session, sftp) = self.connect()?;

        let remote_dir = format!("{}/post_{}", self.cfg.remote_image_path, post_number);
        // Idempotent create: already-exists errors are swallowed.
        if let Err(err) = sftp.mkdir(Path::new(&remote_dir), 0o755) {
            debug!(%remote_dir, %err, "mkdir skipped");
        }

        let data = std::fs::read(local_path)
            .with_context(|| format!("failed to read {}", local_path.display()))?;
        let remote_file = format!("{remote_dir}/{filename}");
        let mut handle = sftp
            .create(Path::new(&remote_file))
            .with_context(|| format!("failed to create remote file {remote_file}"))?;
        handle
            .write_all(&data)
            .with_context(|| format!("failed to write remote file {remote_file}"))?;

        Ok(format!(
            "{}/post_{}/{}",
            self.cfg.image_url_base, post_number, filename
        ))
    }
}

#[async_trait]
impl AssetStore for SftpUploader {
    // One session per upload. Wasteful but simple; reusing a session across a
    // post's images is a candidate enhancement.
    async fn upload(&self, local_path: &Path, post_number: u32) -> Option<String> {
        let uploader = self.clone();
        let local: PathBuf = local_path.to_path_buf();
        let result =
            tokio::task::spawn_blocking(move || uploader.upload_blocking(&local, post_number))
                .await;

        match result {
            Ok(Ok(url)) => Some(url),
            Ok(Err(err)) => {
                warn!(path = %local_path.display(), error = %format!("{err:#}"), "image upload failed");
                None
            }
            Err(err) => {
                warn!(path = %local_path.display(), %err, "upload task panicked");
                None
            }
        }
    }
}
