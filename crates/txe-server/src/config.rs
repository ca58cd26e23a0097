use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Exchange configuration, loaded from a TOML file.
///
/// The exchange starts with any subset of these set. Without an incoming
/// folder or a maximum package size it still serves, answering every
/// request with a plain-text diagnostic naming the missing setting, so a
/// half-configured instance is debuggable from the client side.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the exchange listens on.
    pub bind_addr: SocketAddr,
    /// Incoming root all transaction artifacts live under. Created at
    /// startup if missing.
    pub incoming_folder: Option<PathBuf>,
    /// External scratch folder included in retention sweeps.
    pub temporary_folder: Option<PathBuf>,
    /// Upload size limit in bytes.
    pub maximum_size: Option<u64>,
    /// Maximum artifact age in minutes before the retention sweep deletes
    /// it. Unset disables sweeping.
    pub max_state_age: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8780".parse().unwrap(),
            incoming_folder: None,
            temporary_folder: None,
            maximum_size: None,
            max_state_age: None,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&text).map_err(|e| {
            ServerError::Config(format!("cannot parse {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_unconfigured_but_bindable() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8780".parse::<SocketAddr>().unwrap());
        assert!(c.incoming_folder.is_none());
        assert!(c.maximum_size.is_none());
        assert!(c.max_state_age.is_none());
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txe.toml");
        fs::write(
            &path,
            "incoming_folder = \"/srv/txe/incoming\"\nmaximum_size = 104857600\nmax_state_age = 120\n",
        )
        .unwrap();

        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(
            c.incoming_folder.as_deref(),
            Some(Path::new("/srv/txe/incoming"))
        );
        assert_eq!(c.maximum_size, Some(104857600));
        assert_eq!(c.max_state_age, Some(120));
        // Untouched fields keep their defaults.
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
        assert!(c.temporary_folder.is_none());
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            ServerConfig::load(&missing),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn unparseable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "maximum_size = \"lots\"").unwrap();
        assert!(matches!(
            ServerConfig::load(&path),
            Err(ServerError::Config(_))
        ));
    }
}
