//! Error types for configuration parsing.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing KDL syntax.
	#[error("KDL parse error: {0}")]
	Kdl(#[from] kdl::KdlError),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A known key carries a value of the wrong shape.
	#[error("invalid value for `{key}`: {message}")]
	InvalidValue { key: String, message: String },
}

impl ConfigError {
	pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			key: key.to_string(),
			message: message.into(),
		}
	}
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Non-fatal problem found while parsing.
///
/// Collected in [`Config::warnings`](crate::Config::warnings); the rest of the
/// document still applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
	/// A top-level node this crate does not know.
	UnknownNode(String),
	/// A key given more than once; the last occurrence wins.
	Duplicate(String),
}

impl fmt::Display for ConfigWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnknownNode(name) => write!(f, "unknown config node '{name}' ignored"),
			Self::Duplicate(name) => write!(f, "'{name}' given more than once; last value wins"),
		}
	}
}
