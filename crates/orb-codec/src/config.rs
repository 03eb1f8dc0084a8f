// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serializer configuration: fixup behavior and wire verbosity toggles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Toggles governing graph serialization and wire verbosity.
///
/// Loadable from TOML:
///
/// ```
/// use orb_codec::SerializerConfig;
///
/// let cfg = SerializerConfig::from_toml_str("fixup_duplicates = false").unwrap();
/// assert!(!cfg.fixup_duplicates);
/// assert!(cfg.fixup_circular_refs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerConfig {
    /// Encode cycles as fixups.  When off, a detected cycle fails the
    /// marshal with "circular reference detected".
    #[serde(default = "default_true")]
    pub fixup_circular_refs: bool,

    /// Encode duplicate nodes as fixups.  When off, duplicates are
    /// re-expanded in place (cycles are still governed by
    /// `fixup_circular_refs`).
    #[serde(default = "default_true")]
    pub fixup_duplicates: bool,

    /// Emit `javaClass` hints on containers and beans.
    #[serde(default = "default_true")]
    pub marshal_class_hints: bool,

    /// Emit explicit JSON `null` for null bean properties instead of
    /// omitting them.
    #[serde(default)]
    pub marshal_null_props: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            fixup_circular_refs: true,
            fixup_duplicates: true,
            marshal_class_hints: true,
            marshal_null_props: false,
        }
    }
}

impl SerializerConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ParseError`] when the document is not valid TOML for
    /// this shape.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`] when the path cannot be read,
    /// [`ConfigError::ParseError`] when the content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Advisory issues with the current settings.
    #[must_use]
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if !self.fixup_circular_refs {
            warnings.push(ConfigWarning::CircularRefsDisabled);
        }
        if self.marshal_null_props {
            warnings.push(ConfigWarning::NullPropsEnabled);
        }
        warnings
    }
}

/// Errors raised while loading a [`SerializerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested file was not found or unreadable.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },
}

/// Advisory-level configuration issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Cyclic graphs will fail to marshal.
    CircularRefsDisabled,
    /// Explicit nulls enlarge every bean payload.
    NullPropsEnabled,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircularRefsDisabled => {
                f.write_str("circular-reference fixups are disabled; cyclic graphs will fail")
            }
            Self::NullPropsEnabled => {
                f.write_str("null properties are marshalled explicitly; payloads grow")
            }
        }
    }
}
