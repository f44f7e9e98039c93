//! Word-sized modular arithmetic and NTT-friendly prime selection.

use num_integer::Integer;

use crate::error::{CkksError, Result};

// ------------------------------------------------------------
// u64 arithmetic with u128 intermediates
// ------------------------------------------------------------

/// `a + b mod q` for reduced inputs.
#[inline]
pub fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let s = a + b;
    if s >= q { s - q } else { s }
}

/// `a - b mod q` for reduced inputs.
#[inline]
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b { a - b } else { a + q - b }
}

/// `a·b mod q`.
#[inline]
pub fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 * b as u128) % q as u128) as u64
}

/// Square-and-multiply exponentiation.
pub fn pow_mod(mut base: u64, mut exp: u64, q: u64) -> u64 {
    let mut res = 1u64 % q;
    base %= q;
    while exp > 0 {
        if exp & 1 == 1 {
            res = mul_mod(res, base, q);
        }
        base = mul_mod(base, base, q);
        exp >>= 1;
    }
    res
}

/// Inverse modulo a prime (Fermat).
#[inline]
pub fn inv_mod(x: u64, q: u64) -> u64 {
    pow_mod(x, q - 2, q)
}

/// Reduce a signed value into `[0, q)`.
#[inline]
pub fn reduce_i128(x: i128, q: u64) -> u64 {
    x.rem_euclid(q as i128) as u64
}

/// Centered representative of `x mod q` in `(-q/2, q/2]`.
#[inline]
pub fn center(x: u64, q: u64) -> i64 {
    if x > q / 2 { x as i64 - q as i64 } else { x as i64 }
}

// ------------------------------------------------------------
// primality
// ------------------------------------------------------------

/// Deterministic Miller–Rabin for every `u64`.
pub fn is_prime(n: u64) -> bool {
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    if n < 2 {
        return false;
    }
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }
    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for &a in &WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Primitive `2n`-th root of unity modulo the prime `q` (`q ≡ 1 mod 2n`).
///
/// For `ψ = g^((q-1)/2n)` the order divides `2n`; since `2n` is a power of
/// two the order is exactly `2n` iff `ψ^n = -1`.
pub fn primitive_root_2n(q: u64, n: usize) -> Option<u64> {
    let two_n = 2 * n as u64;
    if !Integer::is_multiple_of(&(q - 1), &two_n) {
        return None;
    }
    let exp = (q - 1) / two_n;
    (2..q.min(1 << 16))
        .map(|g| pow_mod(g, exp, q))
        .find(|&psi| pow_mod(psi, n as u64, q) == q - 1)
}

// ------------------------------------------------------------
// modulus chain selection
// ------------------------------------------------------------

/// Bit sizes of the default chain: two 40-bit middle primes between a
/// 60-bit base prime and a 60-bit special prime.
pub const DEFAULT_CHAIN_BITS: [u32; 4] = [60, 40, 40, 60];

/// Smallest accepted chain prime, in bits.
pub const MIN_PRIME_BITS: u32 = 20;
/// Largest accepted chain prime; keeps products inside u128.
pub const MAX_PRIME_BITS: u32 = 60;

/// Pick one NTT-friendly prime per requested bit size.
///
/// For each size, primes are taken in decreasing order starting just below
/// `2^bits`, so repeated sizes receive distinct primes. The output keeps the
/// request order.
pub fn select_chain(degree: usize, bit_sizes: &[u32]) -> Result<Vec<u64>> {
    if !degree.is_power_of_two() {
        return Err(CkksError::Parameter(format!("degree {} is not a power of two", degree)));
    }
    let two_n = 2 * degree as u64;
    let mut chain = vec![0u64; bit_sizes.len()];

    let mut sizes: Vec<u32> = bit_sizes.to_vec();
    sizes.sort_unstable();
    sizes.dedup();
    for bits in sizes {
        if !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&bits) {
            return Err(CkksError::Parameter(format!(
                "prime bit size {} outside {}..={}",
                bits, MIN_PRIME_BITS, MAX_PRIME_BITS
            )));
        }
        let wanted = bit_sizes.iter().filter(|&&b| b == bits).count();
        let lower = 1u64 << (bits - 1);
        if two_n >= lower {
            return Err(CkksError::Parameter(format!(
                "{}-bit primes are too small for degree {}",
                bits, degree
            )));
        }
        let mut found = Vec::with_capacity(wanted);
        // Largest candidate ≡ 1 (mod 2n) strictly below 2^bits.
        let mut candidate = (1u64 << bits) - two_n + 1;
        while found.len() < wanted && candidate > lower {
            if is_prime(candidate) {
                found.push(candidate);
            }
            candidate -= two_n;
        }
        if found.len() < wanted {
            return Err(CkksError::Parameter(format!(
                "only {} of {} NTT-friendly {}-bit primes exist for degree {}",
                found.len(),
                wanted,
                bits,
                degree
            )));
        }
        let mut found = found.into_iter();
        for (slot, &b) in chain.iter_mut().zip(bit_sizes) {
            if b == bits {
                if let Some(p) = found.next() {
                    *slot = p;
                }
            }
        }
    }
    log::trace!("selected modulus chain {:?} for degree {}", chain, degree);
    Ok(chain)
}

/// Number of significant bits of `x`.
#[inline]
pub fn bit_length(x: u64) -> u32 {
    64 - x.leading_zeros()
}
