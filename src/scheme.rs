//! Key generation, encryption & decryption.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::cipher::Ciphertext;
use crate::context::Context;
use crate::encoding::Plaintext;
use crate::error::{CkksError, Result};
use crate::keys::{compute_key_id, PublicKey, RelinKey, SecretKey};
use crate::polynomial::RnsPoly;

/// Standard deviation of the error distribution.
pub const SIGMA: f64 = 3.2;
/// Error samples are rejected beyond this many standard deviations.
const TAIL_CUT: f64 = 6.0;

/// Uniform coefficients in {-1, 0, 1}.
pub fn sample_ternary<R: Rng>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n).map(|_| rng.gen_range(-1..=1)).collect()
}

/// Rounded Gaussian with σ = 3.2, tail-cut at 6σ.
pub fn sample_error<R: Rng>(n: usize, rng: &mut R) -> Vec<i64> {
    (0..n)
        .map(|_| loop {
            let x = rng.sample::<f64, _>(StandardNormal) * SIGMA;
            if x.abs() <= TAIL_CUT * SIGMA {
                break x.round() as i64;
            }
        })
        .collect()
}

/// KeyGen: ternary secret, public key over the data primes, and one
/// relinearization component per data prime over data primes + special prime.
pub fn keygen<R: Rng>(ctx: &Context, rng: &mut R) -> (SecretKey, PublicKey, RelinKey) {
    let n = ctx.ring_dimension();
    let s = sample_ternary(n, rng);

    // public key
    let data = ctx.level_moduli(0);
    let data_tables = ctx.ntt_tables(data);
    let s_data = RnsPoly::from_signed(&s, data);
    let a = RnsPoly::random(n, data, rng);
    let e = RnsPoly::from_signed(&sample_error(n, rng), data);
    let b = &(-a.mul(&s_data, &data_tables)) + &e;
    let key_id = compute_key_id(&b, &a);

    // relinearization key
    let ks = ctx.key_switch_moduli(0);
    let ks_tables = ctx.ntt_tables(&ks);
    let s_ks = RnsPoly::from_signed(&s, &ks);
    let s_squared = s_ks.mul(&s_ks, &ks_tables);
    let special = ctx.special_prime();
    let components = (0..data.len())
        .map(|j| {
            let a_j = RnsPoly::random(n, &ks, rng);
            let e_j = RnsPoly::from_signed(&sample_error(n, rng), &ks);
            let b_j = &(-a_j.mul(&s_ks, &ks_tables)) + &e_j;
            // P·s² only in residue j
            let gadget: Vec<u64> = ks
                .iter()
                .enumerate()
                .map(|(i, &q)| if i == j { special % q } else { 0 })
                .collect();
            (&b_j + &s_squared.mul_scalars(&gadget), a_j)
        })
        .collect();

    let sk = SecretKey {
        key_id,
        coeffs: s.iter().map(|&c| c as i8).collect(),
    };
    (
        sk,
        PublicKey { key_id, b, a },
        RelinKey { key_id, components },
    )
}

/// Encrypt: `(b·u + e₀ + m, a·u + e₁)` with ternary `u`.
pub fn encrypt<R: Rng>(ctx: &Context, pk: &PublicKey, plain: &Plaintext, rng: &mut R) -> Ciphertext {
    let n = ctx.ring_dimension();
    let moduli = ctx.level_moduli(0);
    let tables = ctx.ntt_tables(moduli);
    let u = RnsPoly::from_signed(&sample_ternary(n, rng), moduli);
    let e0 = RnsPoly::from_signed(&sample_error(n, rng), moduli);
    let e1 = RnsPoly::from_signed(&sample_error(n, rng), moduli);

    let c0 = &(&pk.b.mul(&u, &tables) + &e0) + &plain.poly;
    let c1 = &pk.a.mul(&u, &tables) + &e1;
    Ciphertext {
        c0,
        c1,
        level: 0,
        scale: plain.scale,
        logical_len: plain.logical_len,
        key_id: pk.key_id,
    }
}

/// Decrypt: `c₀ + c₁·s` at the ciphertext's own level and scale.
pub fn decrypt(ctx: &Context, sk: &SecretKey, ct: &Ciphertext) -> Result<Plaintext> {
    if sk.key_id != ct.key_id {
        return Err(CkksError::Decryption(
            "ciphertext was not produced under this secret key's key triple".to_string(),
        ));
    }
    let moduli = ctx.level_moduli(ct.level);
    if ct.c0.moduli != moduli || ct.c1.moduli != moduli {
        return Err(CkksError::Decryption(format!(
            "ciphertext residues do not match level {}",
            ct.level
        )));
    }
    let tables = ctx.ntt_tables(moduli);
    let s = sk.to_rns(moduli);
    let poly = &ct.c0 + &ct.c1.mul(&s, &tables);
    Ok(Plaintext {
        poly,
        scale: ct.scale,
        logical_len: ct.logical_len,
    })
}
