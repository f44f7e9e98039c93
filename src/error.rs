//! Error taxonomy shared by every engine operation.

use thiserror::Error;

/// Everything a boundary operation can fail with.
///
/// All variants are deterministic given the same inputs; nothing is retried.
#[derive(Debug, Error)]
pub enum CkksError {
    /// The requested parameter set cannot back a Context.
    #[error("invalid parameters: {0}")]
    Parameter(String),

    /// A key artifact is not a structurally valid key for this Context.
    #[error("malformed key artifact: {0}")]
    KeyFormat(String),

    /// A ciphertext artifact is not a structurally valid ciphertext for this Context.
    #[error("malformed ciphertext artifact: {0}")]
    CiphertextFormat(String),

    /// The input vector does not fit into the slots of one plaintext.
    #[error("vector of length {len} exceeds packing capacity {capacity}")]
    Capacity {
        /// Values supplied.
        len: usize,
        /// Slots available (N/2).
        capacity: usize,
    },

    /// A value cannot be encoded at the requested scale.
    #[error("cannot encode value: {0}")]
    Encoding(String),

    /// Operands sit at different modulus levels.
    #[error("level mismatch: left operand at level {left}, right operand at level {right}")]
    LevelMismatch {
        /// Level of the first operand.
        left: usize,
        /// Level of the second operand.
        right: usize,
    },

    /// No modulus prime is left to rescale by.
    #[error("modulus chain exhausted: ciphertext at level {level}, chain depth {depth}")]
    DepthExhausted {
        /// Level of the ciphertext that was to be multiplied or rescaled.
        level: usize,
        /// Multiplicative depth of the Context.
        depth: usize,
    },

    /// The product scale would not fit below the current modulus.
    #[error("scale 2^{scale_bits:.1} out of bounds for {modulus_bits}-bit modulus")]
    ScaleOutOfBounds {
        /// log2 of the would-be product scale.
        scale_bits: f64,
        /// Bits of the modulus at the operands' level.
        modulus_bits: u32,
    },

    /// Artifacts were produced under different key triples.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    /// Decryption produced no well-formed result.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Engine configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CkksError>;
