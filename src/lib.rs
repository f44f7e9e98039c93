//! CKKS ― approximate homomorphic encryption behind a text transport boundary
//!
//! Keys and ciphertexts travel as base64 artifacts; the engine itself keeps
//! only an immutable [`Context`].

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, missing_docs)]

pub mod error;
pub mod transport;
pub mod modulus;
pub mod ntt;
pub mod polynomial;
pub mod context;
pub mod encoding;
pub mod keys;
pub mod cipher;
pub mod scheme;
pub mod algebra;
pub mod artifact;
pub mod config;
pub mod session;
pub mod evaluator;
pub mod engine;

pub use artifact::Artifact;
pub use cipher::Ciphertext;
pub use config::{EngineConfig, OutputLength};
pub use context::Context;
pub use engine::CkksEngine;
pub use error::{CkksError, Result};
pub use evaluator::{compute_dot_product, compute_dot_products};
pub use keys::{generate_keys, KeyTriple};
pub use session::{decrypt, encrypt};
pub use transport::DecodePolicy;
