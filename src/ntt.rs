// ------------------------------------------------------------
// Negacyclic NTT over Z_q[X]/(X^N + 1)
// ------------------------------------------------------------
//
// Forward transform: Cooley–Tukey, normal order in, bit-reversed out.
// Inverse transform: Gentleman–Sande, bit-reversed in, normal order out.
// Both fold the ψ twist into the twiddles, so a pointwise product of two
// forward transforms is the negacyclic product after the inverse.

use crate::modulus::{add_mod, inv_mod, mul_mod, pow_mod, primitive_root_2n, sub_mod};

/// Precomputed twiddles for one prime and one ring degree.
#[derive(Clone, Debug)]
pub struct NttTable {
    /// Prime q with q ≡ 1 mod 2N.
    pub modulus: u64,
    n: usize,
    /// ψ^bitrev(i)
    psi_rev: Vec<u64>,
    /// ψ^-bitrev(i)
    psi_inv_rev: Vec<u64>,
    n_inv: u64,
}

fn bit_reverse(x: usize, bits: u32) -> usize {
    if bits == 0 {
        0
    } else {
        x.reverse_bits() >> (usize::BITS - bits)
    }
}

impl NttTable {
    /// Build the table, or `None` if `q` has no primitive `2n`-th root.
    pub fn new(modulus: u64, n: usize) -> Option<Self> {
        assert!(n.is_power_of_two(), "NTT length must be a power of two");
        let psi = primitive_root_2n(modulus, n)?;
        let psi_inv = inv_mod(psi, modulus);
        let log_n = n.trailing_zeros();

        let mut psi_rev = vec![0u64; n];
        let mut psi_inv_rev = vec![0u64; n];
        let (mut pw, mut pw_inv) = (1u64, 1u64);
        for i in 0..n {
            let r = bit_reverse(i, log_n);
            psi_rev[r] = pw;
            psi_inv_rev[r] = pw_inv;
            pw = mul_mod(pw, psi, modulus);
            pw_inv = mul_mod(pw_inv, psi_inv, modulus);
        }
        debug_assert_eq!(pow_mod(psi, n as u64, modulus), modulus - 1);

        Some(Self {
            modulus,
            n,
            psi_rev,
            psi_inv_rev,
            n_inv: inv_mod(n as u64 % modulus, modulus),
        })
    }

    /// Ring degree N.
    pub fn degree(&self) -> usize {
        self.n
    }

    /// In-place forward transform.
    pub fn forward(&self, a: &mut [u64]) {
        assert_eq!(a.len(), self.n, "length mismatch in forward NTT");
        let q = self.modulus;
        let mut t = self.n;
        let mut m = 1;
        while m < self.n {
            t >>= 1;
            for i in 0..m {
                let s = self.psi_rev[m + i];
                let j1 = 2 * i * t;
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = mul_mod(a[j + t], s, q);
                    a[j] = add_mod(u, v, q);
                    a[j + t] = sub_mod(u, v, q);
                }
            }
            m <<= 1;
        }
    }

    /// In-place inverse transform, including the `1/n` factor.
    pub fn inverse(&self, a: &mut [u64]) {
        assert_eq!(a.len(), self.n, "length mismatch in inverse NTT");
        let q = self.modulus;
        let mut t = 1;
        let mut m = self.n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let s = self.psi_inv_rev[h + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = a[j + t];
                    a[j] = add_mod(u, v, q);
                    a[j + t] = mul_mod(sub_mod(u, v, q), s, q);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        for x in a.iter_mut() {
            *x = mul_mod(*x, self.n_inv, q);
        }
    }

    /// Negacyclic product of two coefficient vectors.
    pub fn multiply(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let mut fa = a.to_vec();
        let mut fb = b.to_vec();
        self.forward(&mut fa);
        self.forward(&mut fb);
        for (x, &y) in fa.iter_mut().zip(&fb) {
            *x = mul_mod(*x, y, self.modulus);
        }
        self.inverse(&mut fa);
        fa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::select_chain;
    use rand::{Rng, thread_rng};

    /// Schoolbook product in Z_q[X]/(X^n + 1).
    fn negacyclic_naive(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let p = mul_mod(a[i], b[j], q);
                let k = i + j;
                if k < n {
                    out[k] = add_mod(out[k], p, q);
                } else {
                    out[k - n] = sub_mod(out[k - n], p, q);
                }
            }
        }
        out
    }

    #[test]
    fn test_forward_inverse_identity() {
        let n = 64;
        let q = select_chain(n, &[40]).unwrap()[0];
        let table = NttTable::new(q, n).unwrap();
        let mut rng = thread_rng();
        let a: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
        let mut b = a.clone();
        table.forward(&mut b);
        table.inverse(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_multiply_matches_schoolbook() {
        let n = 32;
        let mut rng = thread_rng();
        for q in select_chain(n, &[30, 60]).unwrap() {
            let table = NttTable::new(q, n).unwrap();
            let a: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            let b: Vec<u64> = (0..n).map(|_| rng.gen_range(0..q)).collect();
            assert_eq!(table.multiply(&a, &b), negacyclic_naive(&a, &b, q));
        }
    }

    #[test]
    fn test_x_times_x_pow_n_minus_1_is_minus_one() {
        let n = 16;
        let q = select_chain(n, &[30]).unwrap()[0];
        let table = NttTable::new(q, n).unwrap();
        let mut x = vec![0u64; n];
        x[1] = 1;
        let mut top = vec![0u64; n];
        top[n - 1] = 1;
        let prod = table.multiply(&x, &top);
        let mut expected = vec![0u64; n];
        expected[0] = q - 1;
        assert_eq!(prod, expected);
    }
}
