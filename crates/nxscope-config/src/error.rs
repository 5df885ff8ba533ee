//! Errors from loading and saving `nxscope.toml`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What was being done to a config path when I/O failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIo {
    Read,
    Write,
    CreateDir,
}

impl fmt::Display for ConfigIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::CreateDir => "create directory",
        })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot {action} '{path}': {source}")]
    Io {
        action: ConfigIo,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `nxscope.toml` is not valid TOML or has the wrong shape
    #[error("malformed {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    /// No home directory, so no global settings file
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("{key}: {message}")]
    InvalidSetting { key: String, message: String },
}

impl ConfigError {
    pub fn io(action: ConfigIo, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }
}
