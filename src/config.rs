//! The cryptex home directory and its `cryptex.toml` settings.
//!
//! Configuration is loaded once by the front end and passed down
//! explicitly; nothing in the crypto layer reads it.

use crate::error::{CryptexError, Result};
use crate::keys::{PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use crate::storage;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside the home directory.
pub const CONFIG_FILE: &str = "cryptex.toml";

const DEFAULT_PAGER: &str = "less";

const DEFAULT_CONFIG: &str = r#"# Configuration file for cryptex
[config]
# viewer that receives decrypted content on stdin, e.g. "less", "vim -", "code -"
pager = "less"
# default private key for RSA decryption (empty: my_key in this folder)
private-key = ""
# default public key for RSA encryption (empty: my_key.pub in this folder)
public-key = ""
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_pager")]
    pub pager: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub public_key: String,
}

fn default_pager() -> String {
    DEFAULT_PAGER.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pager: default_pager(),
            private_key: String::new(),
            public_key: String::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    config: Settings,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| CryptexError::Config(e.to_string()))?;
        Ok(file.config)
    }

    fn non_empty(value: &str) -> Option<PathBuf> {
        let value = value.trim();
        (!value.is_empty()).then(|| PathBuf::from(value))
    }
}

/// Directory holding the default key pair and the configuration file.
#[derive(Debug, Clone)]
pub struct Home {
    dir: PathBuf,
}

impl Home {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn default_private_key(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    pub fn default_public_key(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Creates the home directory; returns `true` if it did not exist.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;
        Ok(true)
    }

    /// Loads `cryptex.toml`, falling back to defaults when it is absent.
    pub fn load_settings(&self) -> Result<Settings> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Settings::default());
        }

        let text = fs::read_to_string(&path)?;
        Settings::from_toml(&text).map_err(|e| match e {
            CryptexError::Config(msg) => {
                CryptexError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Writes the default `cryptex.toml`; returns `false` if one already exists.
    pub fn create_config(&self) -> Result<bool> {
        let path = self.config_path();
        if path.exists() {
            return Ok(false);
        }
        storage::write(&path, DEFAULT_CONFIG.as_bytes())?;
        Ok(true)
    }

    /// Raw contents of `cryptex.toml`, `None` if it has not been created.
    pub fn read_config(&self) -> Result<Option<String>> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// Resolves the private key path: explicit flag, then settings, then home default.
    pub fn private_key_path(&self, explicit: Option<PathBuf>, settings: &Settings) -> PathBuf {
        explicit
            .or_else(|| Settings::non_empty(&settings.private_key))
            .unwrap_or_else(|| self.default_private_key())
    }

    /// Resolves the public key path: explicit flag, then settings, then home default.
    pub fn public_key_path(&self, explicit: Option<PathBuf>, settings: &Settings) -> PathBuf {
        explicit
            .or_else(|| Settings::non_empty(&settings.public_key))
            .unwrap_or_else(|| self.default_public_key())
    }
}

/// Platform configuration directory for cryptex.
pub fn default_home() -> Result<Home> {
    let project_dirs = ProjectDirs::from("", "", "cryptex")
        .ok_or_else(|| CryptexError::Config("could not determine platform directories".into()))?;

    Ok(Home::new(project_dirs.config_dir().to_path_buf()))
}
