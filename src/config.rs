//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::DecodePolicy;

/// How many values `decrypt` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLength {
    /// Every slot (N/2 values), zero-padded past the encrypted vector.
    #[default]
    Capacity,
    /// The length recorded when the vector was encrypted.
    Logical,
}

/// Boundary behavior that does not change the cryptography.
///
/// ```toml
/// decode_policy = "strict"
/// output_length = "logical"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How transport text is decoded on input.
    pub decode_policy: DecodePolicy,
    /// Slots returned by decrypt.
    pub output_length: OutputLength,
}

impl EngineConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
