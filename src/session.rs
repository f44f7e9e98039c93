//! Encrypt and decrypt at the transport boundary.

use crate::artifact::Artifact;
use crate::cipher::Ciphertext;
use crate::config::{EngineConfig, OutputLength};
use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::keys::{hex_prefix, PublicKey, SecretKey};
use crate::scheme;

/// Encrypt `values` under a transport-encoded public key, default config.
pub fn encrypt(values: &[f64], public_key: &str, ctx: &Context) -> Result<String> {
    encrypt_with(values, public_key, ctx, &EngineConfig::default())
}

/// [`encrypt`] with an explicit decode policy.
pub fn encrypt_with(values: &[f64], public_key: &str, ctx: &Context, config: &EngineConfig) -> Result<String> {
    let pk = PublicKey::from_text(public_key, config.decode_policy, ctx)?;
    let plain = ctx.encoder().encode(values, ctx.scale(), ctx.level_moduli(0))?;
    let ct = scheme::encrypt(ctx, &pk, &plain, &mut rand::thread_rng());
    log::debug!(
        "encrypted {} values under key {} at scale 2^{:.1}",
        values.len(),
        hex_prefix(&pk.key_id),
        ct.scale.log2()
    );
    ct.to_text(ctx)
}

/// Decrypt a transport-encoded ciphertext, default config.
pub fn decrypt(ciphertext: &str, secret_key: &str, ctx: &Context) -> Result<Vec<f64>> {
    decrypt_with(ciphertext, secret_key, ctx, &EngineConfig::default())
}

/// Decrypt and decode with the ciphertext's own scale.
pub fn decrypt_with(ciphertext: &str, secret_key: &str, ctx: &Context, config: &EngineConfig) -> Result<Vec<f64>> {
    let sk = SecretKey::from_text(secret_key, config.decode_policy, ctx)?;
    let ct = Ciphertext::from_text(ciphertext, config.decode_policy, ctx)?;
    let plain = scheme::decrypt(ctx, &sk, &ct)?;
    let mut values = ctx.encoder().decode(&plain);
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(CkksError::Decryption(format!("slot {} decoded to a non-finite value", pos)));
    }
    if config.output_length == OutputLength::Logical {
        values.truncate(ct.logical_len);
    }
    log::debug!(
        "decrypted level {} ciphertext into {} values (scale 2^{:.1})",
        ct.level,
        values.len(),
        ct.scale.log2()
    );
    Ok(values)
}
