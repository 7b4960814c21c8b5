use std::path::{Path, PathBuf};

use crate::UploadError;

pub const ENV_SSH_KEY: &str = "UPLINK_SSH_KEY";
pub const ENV_SSH_KEY_PATH: &str = "UPLINK_SSH_KEY_PATH";
pub const ENV_SSH_PASSWORD: &str = "UPLINK_SSH_PASSWORD";

/// Effective authentication material: exactly one of password or private
/// key, never both, never neither.
#[derive(Clone)]
pub enum Credentials {
    Password(String),
    PrivateKey(String),
}

impl std::fmt::Debug for Credentials {
    // 不把密码/私钥内容打进日志
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password(_) => f.write_str("Credentials::Password(***)"),
            Credentials::PrivateKey(_) => f.write_str("Credentials::PrivateKey(***)"),
        }
    }
}

/// Explicit credential options from the CLI.
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Private key content passed on the command line.
    pub key: Option<String>,
    /// Path to a private key file.
    pub key_path: Option<PathBuf>,
}

/// Environment-sourced fallbacks. Captured as plain values so resolution
/// stays a pure function over its inputs.
#[derive(Debug, Clone, Default)]
pub struct EnvCreds {
    pub key: Option<String>,
    pub key_path: Option<String>,
    pub password: Option<String>,
}

impl EnvCreds {
    pub fn from_process() -> Self {
        Self {
            key: std::env::var(ENV_SSH_KEY).ok(),
            key_path: std::env::var(ENV_SSH_KEY_PATH).ok(),
            password: std::env::var(ENV_SSH_PASSWORD).ok(),
        }
    }
}

/// Resolve the effective credentials. Precedence, first hit wins:
/// 1. password embedded in the URL
/// 2. explicit key content (`--key`)
/// 3. explicit key file path (`--key-path`, read eagerly)
/// 4. env key content (`UPLINK_SSH_KEY`)
/// 5. env key file path (`UPLINK_SSH_KEY_PATH`, read eagerly)
/// 6. env password (`UPLINK_SSH_PASSWORD`)
///
/// A missing or unreadable key file is fatal and names the resolved path;
/// no source at all is [`UploadError::CredentialsMissing`].
pub fn resolve_credentials(
    url_password: Option<String>,
    options: &AuthOptions,
    env: &EnvCreds,
) -> Result<Credentials, UploadError> {
    if let Some(pw) = url_password {
        return Ok(Credentials::Password(pw));
    }
    if let Some(key) = &options.key {
        return Ok(Credentials::PrivateKey(key.clone()));
    }
    if let Some(path) = &options.key_path {
        return read_key_file(path);
    }
    if let Some(key) = &env.key {
        return Ok(Credentials::PrivateKey(key.clone()));
    }
    if let Some(path) = &env.key_path {
        return read_key_file(Path::new(path));
    }
    if let Some(pw) = &env.password {
        return Ok(Credentials::Password(pw.clone()));
    }
    Err(UploadError::CredentialsMissing)
}

fn read_key_file(path: &Path) -> Result<Credentials, UploadError> {
    let resolved = expand_tilde(path);
    match std::fs::read_to_string(&resolved) {
        Ok(content) => Ok(Credentials::PrivateKey(content)),
        Err(_) => Err(UploadError::KeyFile(resolved)),
    }
}

/// Expand a leading `~/` against the local home directory so operators can
/// pass `--key-path ~/.ssh/id_ed25519` through shells that do not expand it.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
