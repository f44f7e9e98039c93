//! CKKS ciphertext container.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::keys::KeyId;
use crate::polynomial::RnsPoly;

/// (c₀, c₁) with the level/scale bookkeeping kept beside the payload.
///
/// Decrypts to `c₀ + c₁·s`. `level` counts rescales already applied, so the
/// polynomials carry `data_primes - level` residues.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ciphertext {
    /// Body.
    pub c0: RnsPoly,
    /// Mask.
    pub c1: RnsPoly,
    /// Rescales applied so far.
    pub level: usize,
    /// Current scale Δ of the payload.
    pub scale: f64,
    /// Length of the vector that was encrypted.
    pub logical_len: usize,
    /// Key triple whose public key produced this ciphertext.
    pub key_id: KeyId,
}

impl Ciphertext {
    /// Rescales still available before the chain runs out.
    pub fn remaining_depth(&self, ctx: &Context) -> usize {
        ctx.depth().saturating_sub(self.level)
    }

    /// Structural check against the Context this ciphertext claims to belong to.
    pub fn validate(&self, ctx: &Context) -> Result<(), String> {
        if self.level > ctx.depth() {
            return Err(format!("level {} exceeds chain depth {}", self.level, ctx.depth()));
        }
        if !self.scale.is_finite() || self.scale < 1.0 {
            return Err(format!("scale {} is not a finite value >= 1", self.scale));
        }
        if self.scale.log2() >= f64::from(ctx.level_bits(self.level)) {
            return Err(format!(
                "scale 2^{:.1} does not fit the {}-bit modulus at level {}",
                self.scale.log2(),
                ctx.level_bits(self.level),
                self.level
            ));
        }
        if self.logical_len > ctx.slot_count() {
            return Err(format!(
                "logical length {} exceeds slot count {}",
                self.logical_len,
                ctx.slot_count()
            ));
        }
        let moduli = ctx.level_moduli(self.level);
        self.c0.validate(ctx.ring_dimension(), moduli).map_err(|e| format!("c0: {}", e))?;
        self.c1.validate(ctx.ring_dimension(), moduli).map_err(|e| format!("c1: {}", e))?;
        Ok(())
    }
}
