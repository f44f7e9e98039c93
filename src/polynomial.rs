//! Polynomials of Z_Q[X]/(X^N + 1) in residue-number-system form.

use std::ops::{Add, Neg, Sub};

use itertools::izip;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modulus::{add_mod, center, inv_mod, mul_mod, reduce_i128, sub_mod};
use crate::ntt::NttTable;

/// `residues[i][j]` = coefficient `j` reduced modulo `moduli[i]`, coefficient form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RnsPoly {
    /// One row per modulus.
    pub residues: Vec<Vec<u64>>,
    /// RNS basis, in chain order.
    pub moduli: Vec<u64>,
}

impl RnsPoly {
    /// The zero polynomial of degree `n` over `moduli`.
    pub fn zero(n: usize, moduli: &[u64]) -> Self {
        Self {
            residues: vec![vec![0; n]; moduli.len()],
            moduli: moduli.to_vec(),
        }
    }

    /// Lift small signed coefficients (secrets, errors) into every residue.
    pub fn from_signed(coeffs: &[i64], moduli: &[u64]) -> Self {
        let residues = moduli
            .iter()
            .map(|&q| coeffs.iter().map(|&c| reduce_i128(c as i128, q)).collect())
            .collect();
        Self { residues, moduli: moduli.to_vec() }
    }

    /// Lift wide signed coefficients (scaled plaintext values).
    pub fn from_i128(coeffs: &[i128], moduli: &[u64]) -> Self {
        let residues = moduli
            .iter()
            .map(|&q| coeffs.iter().map(|&c| reduce_i128(c, q)).collect())
            .collect();
        Self { residues, moduli: moduli.to_vec() }
    }

    /// Reinterpret non-negative integers `< 2^64` modulo each of `moduli`.
    pub fn from_unsigned(coeffs: &[u64], moduli: &[u64]) -> Self {
        let residues = moduli
            .iter()
            .map(|&q| coeffs.iter().map(|&c| c % q).collect())
            .collect();
        Self { residues, moduli: moduli.to_vec() }
    }

    /// Uniform element of Z_Q[X]/(X^N + 1); uniform per residue is uniform mod Q.
    pub fn random<R: Rng>(n: usize, moduli: &[u64], rng: &mut R) -> Self {
        let residues = moduli
            .iter()
            .map(|&q| (0..n).map(|_| rng.gen_range(0..q)).collect())
            .collect();
        Self { residues, moduli: moduli.to_vec() }
    }

    /// Ring degree N.
    pub fn degree(&self) -> usize {
        self.residues.first().map_or(0, Vec::len)
    }

    /// Number of RNS limbs.
    pub fn num_moduli(&self) -> usize {
        self.moduli.len()
    }

    /// Negacyclic product; `tables[i]` must belong to `moduli[i]`.
    pub fn mul(&self, other: &Self, tables: &[&NttTable]) -> Self {
        assert_eq!(self.moduli, other.moduli, "modulus mismatch in mul");
        let residues = izip!(&self.residues, &other.residues, &self.moduli, tables)
            .map(|(a, b, &q, table)| {
                assert_eq!(table.modulus, q, "NTT table does not match modulus");
                table.multiply(a, b)
            })
            .collect();
        Self { residues, moduli: self.moduli.clone() }
    }

    /// Multiply residue `i` by `scalars[i]`.
    pub fn mul_scalars(&self, scalars: &[u64]) -> Self {
        assert_eq!(scalars.len(), self.num_moduli(), "one scalar per modulus");
        let residues = izip!(&self.residues, &self.moduli, scalars)
            .map(|(r, &q, &s)| r.iter().map(|&c| mul_mod(c, s % q, q)).collect())
            .collect();
        Self { residues, moduli: self.moduli.clone() }
    }

    /// Exact division by the last modulus with rounding, dropping that residue.
    ///
    /// With `r` the centered residue modulo the last prime `p`, every other
    /// residue becomes `(x - r) * p^-1`. This is both the CKKS rescale and the
    /// mod-down step that ends key switching.
    pub fn divide_round_by_last(&self) -> Self {
        assert!(self.num_moduli() > 1, "cannot divide away the only modulus");
        let last = self.num_moduli() - 1;
        let p = self.moduli[last];
        let top = &self.residues[last];
        let residues = self.residues[..last]
            .iter()
            .zip(&self.moduli[..last])
            .map(|(res, &q)| {
                let p_inv = inv_mod(p % q, q);
                res.iter()
                    .zip(top)
                    .map(|(&x, &t)| {
                        let r = reduce_i128(center(t, p) as i128, q);
                        mul_mod(sub_mod(x, r, q), p_inv, q)
                    })
                    .collect()
            })
            .collect();
        Self { residues, moduli: self.moduli[..last].to_vec() }
    }

    /// CRT-reconstruct every coefficient, center it in `(-Q/2, Q/2]` and
    /// convert to `f64`.
    pub fn to_centered_f64(&self) -> Vec<f64> {
        if self.num_moduli() == 1 {
            let q = self.moduli[0];
            return self.residues[0].iter().map(|&x| center(x, q) as f64).collect();
        }
        let big_q: BigUint = self.moduli.iter().map(|&q| BigUint::from(q)).product();
        let half_q = &big_q >> 1u32;
        // Q/q_i and (Q/q_i)^-1 mod q_i
        let basis: Vec<(BigUint, u64)> = self
            .moduli
            .iter()
            .map(|&q| {
                let q_hat = &big_q / q;
                let q_hat_mod = (&q_hat % q).to_u64().unwrap_or(0);
                (q_hat, inv_mod(q_hat_mod, q))
            })
            .collect();

        (0..self.degree())
            .map(|j| {
                let mut acc = BigUint::zero();
                for ((q_hat, q_hat_inv), (res, &q)) in basis.iter().zip(self.residues.iter().zip(&self.moduli)) {
                    let v = mul_mod(res[j], *q_hat_inv, q);
                    acc += q_hat * v;
                }
                acc %= &big_q;
                if acc > half_q {
                    -(&big_q - acc).to_f64().unwrap_or(f64::INFINITY)
                } else {
                    acc.to_f64().unwrap_or(f64::INFINITY)
                }
            })
            .collect()
    }

    /// Check shape and ranges against an expected basis.
    pub fn validate(&self, n: usize, moduli: &[u64]) -> Result<(), String> {
        if self.moduli != moduli {
            return Err(format!(
                "modulus basis {:?} does not match expected {:?}",
                self.moduli, moduli
            ));
        }
        if self.residues.len() != moduli.len() {
            return Err(format!(
                "{} residues for {} moduli",
                self.residues.len(),
                moduli.len()
            ));
        }
        for (i, (res, &q)) in self.residues.iter().zip(moduli).enumerate() {
            if res.len() != n {
                return Err(format!("residue {} has {} coefficients, expected {}", i, res.len(), n));
            }
            if let Some(pos) = res.iter().position(|&c| c >= q) {
                return Err(format!("coefficient {} of residue {} is not reduced", pos, i));
            }
        }
        Ok(())
    }
}

impl Add for &RnsPoly {
    type Output = RnsPoly;
    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.moduli, rhs.moduli, "modulus mismatch in add");
        let residues = izip!(&self.residues, &rhs.residues, &self.moduli)
            .map(|(a, b, &q)| a.iter().zip(b).map(|(&x, &y)| add_mod(x, y, q)).collect())
            .collect();
        RnsPoly { residues, moduli: self.moduli.clone() }
    }
}

impl Add for RnsPoly {
    type Output = RnsPoly;
    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl Sub for &RnsPoly {
    type Output = RnsPoly;
    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.moduli, rhs.moduli, "modulus mismatch in sub");
        let residues = izip!(&self.residues, &rhs.residues, &self.moduli)
            .map(|(a, b, &q)| a.iter().zip(b).map(|(&x, &y)| sub_mod(x, y, q)).collect())
            .collect();
        RnsPoly { residues, moduli: self.moduli.clone() }
    }
}

impl Neg for &RnsPoly {
    type Output = RnsPoly;
    fn neg(self) -> Self::Output {
        let residues = self
            .residues
            .iter()
            .zip(&self.moduli)
            .map(|(a, &q)| a.iter().map(|&x| if x == 0 { 0 } else { q - x }).collect())
            .collect();
        RnsPoly { residues, moduli: self.moduli.clone() }
    }
}

impl Neg for RnsPoly {
    type Output = RnsPoly;
    fn neg(self) -> Self::Output {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::select_chain;
    use rand::thread_rng;

    fn tables(n: usize, moduli: &[u64]) -> Vec<NttTable> {
        moduli.iter().map(|&q| NttTable::new(q, n).unwrap()).collect()
    }

    fn refs(tables: &[NttTable]) -> Vec<&NttTable> {
        tables.iter().collect()
    }

    #[test]
    fn test_basic_ops() {
        let moduli = [17u64, 97];
        let p1 = RnsPoly::from_signed(&[1, 2, -3, 0], &moduli);
        let p2 = RnsPoly::from_signed(&[4, -5, 6, 1], &moduli);

        let sum = &p1 + &p2;
        assert_eq!(sum.to_centered_f64(), vec![5.0, -3.0, 3.0, 1.0]);

        let diff = &p1 - &p2;
        assert_eq!(diff.to_centered_f64(), vec![-3.0, 7.0, -9.0, -1.0]);

        let neg = -&p1;
        assert_eq!(neg.to_centered_f64(), vec![-1.0, -2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_crt_reconstruction_wide() {
        let n = 8;
        let moduli = select_chain(n, &[60, 40, 40]).unwrap();
        // Values beyond i64 range but far below Q/2 ≈ 2^139.
        let big: i128 = 1 << 100;
        let coeffs: Vec<i128> = vec![big, -big, 12345, -1, 0, 7, -(1 << 70), 1 << 62];
        let p = RnsPoly::from_i128(&coeffs, &moduli);
        let back = p.to_centered_f64();
        for (&c, &b) in coeffs.iter().zip(&back) {
            assert_eq!(c as f64, b);
        }
    }

    #[test]
    fn test_mul_matches_signed_product() {
        let n = 16;
        let moduli = select_chain(n, &[40, 40]).unwrap();
        let t = tables(n, &moduli);
        let mut a = vec![0i64; n];
        let mut b = vec![0i64; n];
        a[0] = 3;
        a[n - 1] = 2; // 3 + 2X^{n-1}
        b[1] = -5; // -5X
        let prod = RnsPoly::from_signed(&a, &moduli).mul(&RnsPoly::from_signed(&b, &moduli), &refs(&t));
        // (3 + 2X^{n-1}) * (-5X) = -15X - 10X^n = 10 - 15X
        let mut expected = vec![0.0; n];
        expected[0] = 10.0;
        expected[1] = -15.0;
        assert_eq!(prod.to_centered_f64(), expected);
    }

    #[test]
    fn test_divide_round_by_last() {
        let n = 4;
        let moduli = select_chain(n, &[40, 30]).unwrap();
        let p = moduli[1] as i128;
        let coeffs = vec![7 * p, -3 * p, 5 * p + p / 2 - 1, -(2 * p) - 1];
        let poly = RnsPoly::from_i128(&coeffs, &moduli);
        let divided = poly.divide_round_by_last();
        assert_eq!(divided.num_moduli(), 1);
        assert_eq!(divided.to_centered_f64(), vec![7.0, -3.0, 5.0, -2.0]);
    }

    #[test]
    fn test_validate() {
        let n = 4;
        let moduli = [17u64, 97];
        let mut rng = thread_rng();
        let mut p = RnsPoly::random(n, &moduli, &mut rng);
        assert!(p.validate(n, &moduli).is_ok());
        assert!(p.validate(8, &moduli).is_err());
        assert!(p.validate(n, &[17]).is_err());
        p.residues[1][2] = 97;
        assert!(p.validate(n, &moduli).is_err());
    }
}
