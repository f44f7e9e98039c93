//! Homomorphic mult, relinearize, rescale.

use crate::cipher::Ciphertext;
use crate::context::Context;
use crate::error::{CkksError, Result};
use crate::keys::{KeyId, RelinKey};
use crate::polynomial::RnsPoly;

/// Degree-2 ciphertext straight out of a multiplication; decrypts to
/// `d₀ + d₁·s + d₂·s²`. Lives only between multiply and relinearize.
#[derive(Clone, Debug)]
pub struct ProductCiphertext {
    /// Constant term.
    pub d0: RnsPoly,
    /// Coefficient of `s`.
    pub d1: RnsPoly,
    /// Coefficient of `s²`; removed by relinearization.
    pub d2: RnsPoly,
    /// Shared level of both factors.
    pub level: usize,
    /// Product of the factors' scales.
    pub scale: f64,
    /// Shorter of the two factors' logical lengths.
    pub logical_len: usize,
    /// Key the factors were encrypted under.
    pub key_id: KeyId,
}

/// Tensor product of two ciphertexts at the same level; slot-wise product of
/// the underlying vectors at scale `a.scale · b.scale`.
pub fn multiply(ctx: &Context, a: &Ciphertext, b: &Ciphertext) -> ProductCiphertext {
    assert_eq!(a.level, b.level, "multiply expects operands at one level");
    let tables = ctx.ntt_tables(ctx.level_moduli(a.level));

    // d1 = a0·b1 + a1·b0
    let d0 = a.c0.mul(&b.c0, &tables);
    let d1 = &a.c0.mul(&b.c1, &tables) + &a.c1.mul(&b.c0, &tables);
    let d2 = a.c1.mul(&b.c1, &tables);

    log::trace!("multiplied at level {}", a.level);
    ProductCiphertext {
        d0,
        d1,
        d2,
        level: a.level,
        scale: a.scale * b.scale,
        logical_len: a.logical_len.max(b.logical_len),
        key_id: a.key_id,
    }
}

/// Residues of `poly` for exactly `moduli`, in that order.
fn select_residues(poly: &RnsPoly, moduli: &[u64]) -> Result<RnsPoly> {
    let residues = moduli
        .iter()
        .map(|q| {
            poly.moduli
                .iter()
                .position(|p| p == q)
                .map(|i| poly.residues[i].clone())
                .ok_or_else(|| CkksError::KeyFormat(format!("relinearization key lacks modulus {}", q)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RnsPoly { residues, moduli: moduli.to_vec() })
}

/// Key-switch `d₂·s²` back to a linear ciphertext.
///
/// Each residue of `d₂` is lifted to the data primes plus the special prime
/// and multiplied into its key component; the sum is then divided by the
/// special prime, which removes the `P` folded into the key.
pub fn relinearize(ctx: &Context, product: &ProductCiphertext, rk: &RelinKey) -> Result<Ciphertext> {
    let level = product.level;
    let data = ctx.level_moduli(level);
    let ks = ctx.key_switch_moduli(level);
    let tables = ctx.ntt_tables(&ks);
    let n = ctx.ring_dimension();

    let mut acc0 = RnsPoly::zero(n, &ks);
    let mut acc1 = RnsPoly::zero(n, &ks);
    for (j, digit) in product.d2.residues.iter().enumerate().take(data.len()) {
        let (b_j, a_j) = rk
            .components
            .get(j)
            .ok_or_else(|| CkksError::KeyFormat(format!("relinearization key lacks component {}", j)))?;
        let t = RnsPoly::from_unsigned(digit, &ks);
        acc0 = &acc0 + &t.mul(&select_residues(b_j, &ks)?, &tables);
        acc1 = &acc1 + &t.mul(&select_residues(a_j, &ks)?, &tables);
    }

    let c0 = &product.d0 + &acc0.divide_round_by_last();
    let c1 = &product.d1 + &acc1.divide_round_by_last();
    log::trace!("relinearized at level {} over {} primes", level, ks.len());
    Ok(Ciphertext {
        c0,
        c1,
        level,
        scale: product.scale,
        logical_len: product.logical_len,
        key_id: product.key_id,
    })
}

/// Drop the last data prime `q`, dividing payload and scale by `q`.
pub fn rescale_next(ctx: &Context, ct: &Ciphertext) -> Result<Ciphertext> {
    if ct.c0.num_moduli() <= 1 || ct.level >= ctx.depth() {
        return Err(CkksError::DepthExhausted { level: ct.level, depth: ctx.depth() });
    }
    let q = ct.c0.moduli[ct.c0.num_moduli() - 1];
    log::trace!("rescaling level {} by {}", ct.level, q);
    Ok(Ciphertext {
        c0: ct.c0.divide_round_by_last(),
        c1: ct.c1.divide_round_by_last(),
        level: ct.level + 1,
        scale: ct.scale / q as f64,
        logical_len: ct.logical_len,
        key_id: ct.key_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{decrypt, encrypt, keygen};
    use rand::{thread_rng, Rng};

    fn encrypt_values(ctx: &Context, pk: &crate::keys::PublicKey, values: &[f64]) -> Ciphertext {
        let plain = ctx.encoder().encode(values, ctx.scale(), ctx.level_moduli(0)).unwrap();
        encrypt(ctx, pk, &plain, &mut thread_rng())
    }

    #[test]
    fn test_mult_relin_rescale() {
        let ctx = Context::new(8192).unwrap();
        let (sk, pk, rk) = keygen(&ctx, &mut thread_rng());
        let mut rng = thread_rng();
        let x: Vec<f64> = (0..16).map(|_| rng.gen_range(-4.0..4.0)).collect();
        let y: Vec<f64> = (0..16).map(|_| rng.gen_range(-4.0..4.0)).collect();
        let a = encrypt_values(&ctx, &pk, &x);
        let b = encrypt_values(&ctx, &pk, &y);

        let product = multiply(&ctx, &a, &b);
        assert_eq!(product.scale, ctx.scale() * ctx.scale());
        let relin = relinearize(&ctx, &product, &rk).unwrap();
        let out = rescale_next(&ctx, &relin).unwrap();
        assert_eq!(out.level, 1);
        assert_eq!(out.c0.num_moduli(), 2);
        let dropped = ctx.level_moduli(0)[2] as f64;
        assert_eq!(out.scale, relin.scale / dropped);

        let decoded = ctx.encoder().decode(&decrypt(&ctx, &sk, &out).unwrap());
        for i in 0..16 {
            assert!((decoded[i] - x[i] * y[i]).abs() < 1e-3, "slot {}: {} vs {}", i, decoded[i], x[i] * y[i]);
        }
    }

    #[test]
    fn test_rescale_stops_at_base_prime() {
        let ctx = Context::new(8192).unwrap();
        let (_, pk, _) = keygen(&ctx, &mut thread_rng());
        let mut ct = encrypt_values(&ctx, &pk, &[1.0]);
        for _ in 0..ctx.depth() {
            ct = rescale_next(&ctx, &ct).unwrap();
        }
        assert_eq!(ct.c0.num_moduli(), 1);
        assert!(matches!(
            rescale_next(&ctx, &ct),
            Err(CkksError::DepthExhausted { level: 2, depth: 2 })
        ));
    }

    #[test]
    fn test_select_residues() {
        let poly = RnsPoly::from_signed(&[1, -1], &[17, 97, 193]);
        let picked = select_residues(&poly, &[17, 193]).unwrap();
        assert_eq!(picked.moduli, vec![17, 193]);
        assert_eq!(picked.residues[1], vec![1, 192]);
        assert!(select_residues(&poly, &[13]).is_err());
    }
}
