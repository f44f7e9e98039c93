//! Homomorphic evaluator: the slot-wise product protocol.
//!
//! Every product runs multiply → relinearize → rescale in that order and
//! consumes exactly one level.

use crate::algebra;
use crate::artifact::Artifact;
use crate::cipher::Ciphertext;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::keys::{hex_prefix, RelinKey};

/// Slot-wise product of two transport-encoded ciphertexts.
pub fn compute_dot_product(a: &str, b: &str, relin_key: &str, ctx: &Context) -> Result<String> {
    compute_dot_product_with(a, b, relin_key, ctx, &EngineConfig::default())
}

/// [`compute_dot_product`] with an explicit decode policy.
pub fn compute_dot_product_with(
    a: &str,
    b: &str,
    relin_key: &str,
    ctx: &Context,
    config: &EngineConfig,
) -> Result<String> {
    let a = Ciphertext::from_text(a, config.decode_policy, ctx)?;
    let b = Ciphertext::from_text(b, config.decode_policy, ctx)?;
    let rk = RelinKey::from_text(relin_key, config.decode_policy, ctx)?;
    dot_product(ctx, &a, &b, &rk)?.to_text(ctx)
}

/// Score one query against many stored ciphertexts.
///
/// A malformed query or relinearization key fails the whole call; each record
/// otherwise succeeds or fails on its own.
pub fn compute_dot_products<S: AsRef<str>>(
    query: &str,
    records: &[S],
    relin_key: &str,
    ctx: &Context,
    config: &EngineConfig,
) -> Result<Vec<Result<String>>> {
    let query = Ciphertext::from_text(query, config.decode_policy, ctx)?;
    let rk = RelinKey::from_text(relin_key, config.decode_policy, ctx)?;
    log::debug!("scoring query against {} records", records.len());
    Ok(records
        .iter()
        .map(|record| {
            let record = Ciphertext::from_text(record.as_ref(), config.decode_policy, ctx)?;
            dot_product(ctx, &query, &record, &rk)?.to_text(ctx)
        })
        .collect())
}

/// Typed product with every precondition checked before any arithmetic.
pub fn dot_product(ctx: &Context, a: &Ciphertext, b: &Ciphertext, rk: &RelinKey) -> Result<Ciphertext> {
    if a.key_id != b.key_id {
        return Err(CkksError::KeyMismatch(format!(
            "operands belong to key triples {} and {}",
            hex_prefix(&a.key_id),
            hex_prefix(&b.key_id)
        )));
    }
    if rk.key_id != a.key_id {
        return Err(CkksError::KeyMismatch(format!(
            "relinearization key {} does not match operands under {}",
            hex_prefix(&rk.key_id),
            hex_prefix(&a.key_id)
        )));
    }
    if a.level != b.level {
        return Err(CkksError::LevelMismatch { left: a.level, right: b.level });
    }
    if a.remaining_depth(ctx) == 0 {
        return Err(CkksError::DepthExhausted { level: a.level, depth: ctx.depth() });
    }
    let scale_bits = (a.scale * b.scale).log2();
    let modulus_bits = ctx.level_bits(a.level);
    if scale_bits >= f64::from(modulus_bits) {
        return Err(CkksError::ScaleOutOfBounds { scale_bits, modulus_bits });
    }

    let product = algebra::multiply(ctx, a, b);
    let relinearized = algebra::relinearize(ctx, &product, rk)?;
    let out = algebra::rescale_next(ctx, &relinearized)?;
    log::debug!(
        "dot product: level {} -> {}, scale 2^{:.1}, {} slots in use",
        a.level,
        out.level,
        out.scale.log2(),
        out.logical_len
    );
    Ok(out)
}
