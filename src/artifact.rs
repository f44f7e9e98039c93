//! Tagged, versioned binary envelope for keys and ciphertexts.
//!
//! Layout: `"CKKS" | version | kind | context fingerprint (8 bytes) | payload`,
//! payload in bincode with fixed-width integers. The text form is the base64
//! transport encoding of those bytes.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::cipher::Ciphertext;
use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::keys::{PublicKey, RelinKey, SecretKey};
use crate::transport::{self, DecodePolicy};

const MAGIC: &[u8; 4] = b"CKKS";
/// Version byte of the current envelope layout.
pub const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 1 + 8;
/// Upper bound on a decoded payload.
const MAX_PAYLOAD: u64 = 1 << 30;

/// Kind byte written after the version in every envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    /// [`SecretKey`]
    SecretKey = 1,
    /// [`PublicKey`]
    PublicKey = 2,
    /// [`RelinKey`]
    RelinKey = 3,
    /// [`Ciphertext`]
    Ciphertext = 4,
}

impl ArtifactKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::SecretKey),
            2 => Some(Self::PublicKey),
            3 => Some(Self::RelinKey),
            4 => Some(Self::Ciphertext),
            _ => None,
        }
    }

    /// Format error of the family this kind belongs to.
    fn format_error(self, reason: impl Into<String>) -> CkksError {
        match self {
            Self::Ciphertext => CkksError::CiphertextFormat(reason.into()),
            _ => CkksError::KeyFormat(reason.into()),
        }
    }
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD)
}

/// A value that crosses the boundary as an artifact.
pub trait Artifact: Serialize + DeserializeOwned {
    /// Kind byte this type is written and expected under.
    const KIND: ArtifactKind;

    /// Structural check run on every decoded payload before use.
    fn check(&self, ctx: &Context) -> std::result::Result<(), String>;

    /// Serialize: envelope header plus bincode payload.
    fn to_bytes(&self, ctx: &Context) -> Result<Vec<u8>> {
        let payload = codec()
            .serialize(self)
            .map_err(|e| Self::KIND.format_error(format!("cannot serialize: {}", e)))?;
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.push(Self::KIND as u8);
        out.extend_from_slice(&ctx.fingerprint());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Deserialize and validate against `ctx`.
    fn from_bytes(bytes: &[u8], ctx: &Context) -> Result<Self> {
        let kind = Self::KIND;
        if bytes.len() < HEADER_LEN {
            return Err(kind.format_error(format!("{} bytes is shorter than the envelope header", bytes.len())));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        if &header[..4] != MAGIC {
            return Err(kind.format_error("missing artifact magic"));
        }
        if header[4] != FORMAT_VERSION {
            return Err(kind.format_error(format!("unsupported format version {}", header[4])));
        }
        match ArtifactKind::from_byte(header[5]) {
            Some(found) if found == kind => {}
            Some(found) => {
                return Err(kind.format_error(format!("expected {:?} artifact, found {:?}", kind, found)))
            }
            None => return Err(kind.format_error(format!("unknown artifact kind {}", header[5]))),
        }
        if header[6..] != ctx.fingerprint() {
            return Err(kind.format_error("artifact was produced under a different context"));
        }

        let value: Self = codec()
            .deserialize(payload)
            .map_err(|e| kind.format_error(format!("corrupt payload: {}", e)))?;
        value.check(ctx).map_err(|reason| kind.format_error(reason))?;
        Ok(value)
    }

    /// Serialize and transport-encode.
    fn to_text(&self, ctx: &Context) -> Result<String> {
        Ok(transport::encode(&self.to_bytes(ctx)?))
    }

    /// Transport-decode under `policy`, then [`Artifact::from_bytes`].
    fn from_text(text: &str, policy: DecodePolicy, ctx: &Context) -> Result<Self> {
        let bytes = transport::decode_with(policy, text)
            .map_err(|e| Self::KIND.format_error(e.to_string()))?;
        Self::from_bytes(&bytes, ctx).map_err(|e| {
            log::warn!("rejected {:?} artifact: {}", Self::KIND, e);
            e
        })
    }
}

impl Artifact for SecretKey {
    const KIND: ArtifactKind = ArtifactKind::SecretKey;
    fn check(&self, ctx: &Context) -> std::result::Result<(), String> {
        self.validate(ctx)
    }
}

impl Artifact for PublicKey {
    const KIND: ArtifactKind = ArtifactKind::PublicKey;
    fn check(&self, ctx: &Context) -> std::result::Result<(), String> {
        self.validate(ctx)
    }
}

impl Artifact for RelinKey {
    const KIND: ArtifactKind = ArtifactKind::RelinKey;
    fn check(&self, ctx: &Context) -> std::result::Result<(), String> {
        self.validate(ctx)
    }
}

impl Artifact for Ciphertext {
    const KIND: ArtifactKind = ArtifactKind::Ciphertext;
    fn check(&self, ctx: &Context) -> std::result::Result<(), String> {
        self.validate(ctx)
    }
}
