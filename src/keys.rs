//! Key material and the key manager.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::artifact::Artifact;
use crate::context::Context;
use crate::error::Result;
use crate::polynomial::RnsPoly;
use crate::scheme;

/// Identifies the key triple a key or ciphertext belongs to.
pub type KeyId = [u8; 32];

/// Ternary secret `s`, stored by its small coefficients.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretKey {
    /// Shared by every key of one generation.
    pub key_id: KeyId,
    /// Coefficients in {-1, 0, 1}.
    pub coeffs: Vec<i8>,
}

impl SecretKey {
    /// `s` lifted into the given RNS basis.
    pub fn to_rns(&self, moduli: &[u64]) -> RnsPoly {
        let wide: Vec<i64> = self.coeffs.iter().map(|&c| i64::from(c)).collect();
        RnsPoly::from_signed(&wide, moduli)
    }

    /// Shape and range check against `ctx`.
    pub fn validate(&self, ctx: &Context) -> std::result::Result<(), String> {
        if self.coeffs.len() != ctx.ring_dimension() {
            return Err(format!(
                "secret has {} coefficients, expected {}",
                self.coeffs.len(),
                ctx.ring_dimension()
            ));
        }
        if self.coeffs.iter().any(|c| !(-1..=1).contains(c)) {
            return Err("secret coefficients must be ternary".to_string());
        }
        Ok(())
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("key_id", &hex_prefix(&self.key_id))
            .finish_non_exhaustive()
    }
}

/// `(b, a) = (-a·s + e, a)` over the data primes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicKey {
    /// Shared by every key of one generation.
    pub key_id: KeyId,
    /// `-a·s + e`.
    pub b: RnsPoly,
    /// Uniform mask.
    pub a: RnsPoly,
}

impl PublicKey {
    /// Shape and range check against `ctx`.
    pub fn validate(&self, ctx: &Context) -> std::result::Result<(), String> {
        let moduli = ctx.level_moduli(0);
        self.b.validate(ctx.ring_dimension(), moduli).map_err(|e| format!("b: {}", e))?;
        self.a.validate(ctx.ring_dimension(), moduli).map_err(|e| format!("a: {}", e))?;
        if compute_key_id(&self.b, &self.a) != self.key_id {
            return Err("key id does not match key material".to_string());
        }
        Ok(())
    }
}

/// One key-switching pair per data prime, over data primes plus the special prime.
///
/// Component `j` satisfies `b_j + a_j·s = e_j + P·s²` modulo `q_j` and
/// `b_j + a_j·s = e_j` modulo every other prime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelinKey {
    /// Shared by every key of one generation.
    pub key_id: KeyId,
    /// One `(b_j, a_j)` per data prime, over the data primes plus P.
    pub components: Vec<(RnsPoly, RnsPoly)>,
}

impl RelinKey {
    /// Shape and range check against `ctx`.
    pub fn validate(&self, ctx: &Context) -> std::result::Result<(), String> {
        let data = ctx.data_primes().len();
        if self.components.len() != data {
            return Err(format!(
                "{} key-switching components, expected {}",
                self.components.len(),
                data
            ));
        }
        let moduli = ctx.key_switch_moduli(0);
        for (j, (b, a)) in self.components.iter().enumerate() {
            b.validate(ctx.ring_dimension(), &moduli).map_err(|e| format!("b[{}]: {}", j, e))?;
            a.validate(ctx.ring_dimension(), &moduli).map_err(|e| format!("a[{}]: {}", j, e))?;
        }
        Ok(())
    }
}

/// Digest of the public key; shared by all three keys of a triple.
pub fn compute_key_id(b: &RnsPoly, a: &RnsPoly) -> KeyId {
    let mut hasher = Sha256::new();
    hasher.update(b"ckks_key_id_v1");
    for poly in [b, a] {
        for residue in &poly.residues {
            for c in residue {
                hasher.update(c.to_le_bytes());
            }
        }
    }
    hasher.finalize().into()
}

pub(crate) fn hex_prefix(id: &KeyId) -> String {
    id[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Transport form of one key generation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTriple {
    /// Transport text of the [`SecretKey`].
    pub secret_key: String,
    /// Transport text of the [`PublicKey`].
    pub public_key: String,
    /// Transport text of the [`RelinKey`].
    #[serde(rename = "relinKeys")]
    pub relin_key: String,
}

impl std::fmt::Debug for KeyTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTriple")
            .field("secret_key", &"<redacted>")
            .field("public_key_len", &self.public_key.len())
            .field("relin_key_len", &self.relin_key.len())
            .finish()
    }
}

/// Typed key generation bound to one Context.
pub struct KeyGenerator<'a> {
    ctx: &'a Context,
}

impl<'a> KeyGenerator<'a> {
    /// Generator over `ctx`'s chain and ring dimension.
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Fresh, independent key triple drawn from the thread CSPRNG.
    pub fn generate(&self) -> (SecretKey, PublicKey, RelinKey) {
        scheme::keygen(self.ctx, &mut rand::thread_rng())
    }
}

/// Generate a key triple and transport-encode each key.
pub fn generate_keys(ctx: &Context) -> Result<KeyTriple> {
    let (sk, pk, rk) = KeyGenerator::new(ctx).generate();
    log::debug!("generated key triple {}", hex_prefix(&pk.key_id));
    Ok(KeyTriple {
        secret_key: sk.to_text(ctx)?,
        public_key: pk.to_text(ctx)?,
        relin_key: rk.to_text(ctx)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_validate() {
        let ctx = Context::with_parameters(4096, &[30, 20, 30], 2f64.powi(20)).unwrap();
        let (sk, pk, rk) = KeyGenerator::new(&ctx).generate();
        assert!(sk.validate(&ctx).is_ok());
        assert!(pk.validate(&ctx).is_ok());
        assert!(rk.validate(&ctx).is_ok());
        assert_eq!(sk.key_id, pk.key_id);
        assert_eq!(rk.key_id, pk.key_id);
    }

    #[test]
    fn test_independent_triples() {
        let ctx = Context::with_parameters(4096, &[30, 20, 30], 2f64.powi(20)).unwrap();
        let first = generate_keys(&ctx).unwrap();
        let second = generate_keys(&ctx).unwrap();
        assert_ne!(first.secret_key, second.secret_key);
        assert_ne!(first.public_key, second.public_key);
        assert_ne!(first.relin_key, second.relin_key);
    }

    #[test]
    fn test_tampered_public_key_rejected() {
        let ctx = Context::with_parameters(4096, &[30, 20, 30], 2f64.powi(20)).unwrap();
        let (_, mut pk, _) = KeyGenerator::new(&ctx).generate();
        pk.a.residues[0][0] = (pk.a.residues[0][0] + 1) % pk.a.moduli[0];
        assert!(pk.validate(&ctx).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let ctx = Context::with_parameters(4096, &[30, 20, 30], 2f64.powi(20)).unwrap();
        let keys = generate_keys(&ctx).unwrap();
        let shown = format!("{:?}", keys);
        assert!(!shown.contains(&keys.secret_key));
        assert!(shown.contains("redacted"));
    }
}
