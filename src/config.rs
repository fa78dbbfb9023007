//! Configuration loader and validator for the WordPress auto-poster.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub wordpress: Wordpress,
    pub sftp: Sftp,
    /// Only used by the `wp_maintenance` utility; the posting pipeline never
    /// touches the database directly.
    #[serde(default)]
    pub database: Option<Database>,
}

/// WordPress REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wordpress {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_password: Option<String>,
}

/// SFTP transport settings for image uploads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sftp {
    pub host: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, rename = "privateKey", skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    pub remote_image_path: String,
    pub image_url_base: String,
}

/// MySQL connection settings for the WordPress post store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

fn default_sftp_port() -> u16 {
    22
}

fn default_mysql_port() -> u16 {
    3306
}

/// WordPress credential, resolved once at configuration-load time.
/// An application password takes precedence over the account password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Application { username: String, token: String },
    Basic { username: String, password: String },
}

impl Credential {
    pub fn username(&self) -> &str {
        match self {
            Credential::Application { username, .. } => username,
            Credential::Basic { username, .. } => username,
        }
    }

    pub fn secret(&self) -> &str {
        match self {
            Credential::Application { token, .. } => token,
            Credential::Basic { password, .. } => password,
        }
    }
}

/// SFTP authentication method. A private key takes precedence when both a key
/// and a password are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SftpAuth {
    PrivateKey(String),
    Password(String),
}

impl Wordpress {
    pub fn credential(&self) -> Credential {
        match &self.application_password {
            Some(token) if !token.trim().is_empty() => Credential::Application {
                username: self.username.clone(),
                token: token.clone(),
            },
            _ => Credential::Basic {
                username: self.username.clone(),
                password: self.password.clone(),
            },
        }
    }
}

impl Sftp {
    /// Validation guarantees at least one method is configured, so this never
    /// fails after `load` has succeeded.
    pub fn auth(&self) -> Result<SftpAuth, ConfigError> {
        if let Some(key) = self.private_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(SftpAuth::PrivateKey(key.clone()));
        }
        if let Some(pw) = self.password.as_ref().filter(|p| !p.is_empty()) {
            return Ok(SftpAuth::Password(pw.clone()));
        }
        Err(ConfigError::Invalid(
            "sftp requires either privateKey or password",
        ))
    }
}

impl Database {
    pub fn url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `wp_config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("wp_config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.wordpress.url.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.url must be non-empty"));
    }
    if cfg.wordpress.username.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.username must be non-empty"));
    }
    if cfg.wordpress.password.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.password must be non-empty"));
    }

    if cfg.sftp.host.trim().is_empty() {
        return Err(ConfigError::Invalid("sftp.host must be non-empty"));
    }
    if cfg.sftp.username.trim().is_empty() {
        return Err(ConfigError::Invalid("sftp.username must be non-empty"));
    }
    if cfg.sftp.remote_image_path.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "sftp.remote_image_path must be non-empty",
        ));
    }
    if cfg.sftp.image_url_base.trim().is_empty() {
        return Err(ConfigError::Invalid("sftp.image_url_base must be non-empty"));
    }
    // Resolve the auth method now so a missing credential aborts before any
    // processing rather than at the first upload.
    cfg.sftp.auth()?;

    Ok(())
}

/// Example YAML configuration.
pub fn example() -> &'static str {
    r#"wordpress:
  url: "https://blog.example.com"
  username: "admin"
  password: "ACCOUNT_PASSWORD"
  application_password: "xxxx xxxx xxxx xxxx"

sftp:
  host: "blog.example.com"
  username: "deploy"
  privateKey: "~/.ssh/id_ed25519"
  port: 22
  remote_image_path: "/var/www/html/wp-content/uploads/auto"
  image_url_base: "https://blog.example.com/wp-content/uploads/auto"

database:
  host: "127.0.0.1"
  port: 3306
  user: "wordpress"
  password: "DB_PASSWORD"
  name: "wordpress"
"#
}
