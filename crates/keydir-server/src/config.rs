use keydir_types::KeydirError;
use std::net::SocketAddr;

/// Directory server configuration.
#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// SQLite database path.
    pub db_path: String,
    /// PEM file holding the authority's P-256 private key.
    pub authority_key_path: String,
    /// Upper bound on uploaded key material, in bytes. Generous for EC
    /// keys; raise it if clients start shipping post-quantum material.
    pub max_key_len: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 25519).into(),
            db_path: "data/keydir.db".to_string(),
            authority_key_path: "data/kauth/kauth.pem".to_string(),
            max_key_len: 4096,
        }
    }
}

impl DirectoryConfig {
    /// Overlay `KEYDIR_*` environment variables on the defaults.
    pub fn from_env() -> Result<Self, KeydirError> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("KEYDIR_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| KeydirError::Config(format!("KEYDIR_ADDR: {e}")))?;
        }
        if let Ok(db_path) = std::env::var("KEYDIR_DB") {
            config.db_path = db_path;
        }
        if let Ok(key_path) = std::env::var("KEYDIR_AUTHORITY_KEY") {
            config.authority_key_path = key_path;
        }
        if let Ok(max) = std::env::var("KEYDIR_MAX_KEY_LEN") {
            config.max_key_len = max
                .parse()
                .map_err(|e| KeydirError::Config(format!("KEYDIR_MAX_KEY_LEN: {e}")))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DirectoryConfig::default();
        assert_eq!(config.max_key_len, 4096);
        assert_eq!(config.bind_addr.port(), 25519);
    }
}
