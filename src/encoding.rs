//! CKKS encode/decode through the canonical embedding.
//!
//! Slot `i` is the evaluation at `ζ^(5^i mod 2N)` with `ζ = e^(πi/N)`, its
//! conjugate slot mirrors it, so real inputs give real coefficients and ring
//! multiplication is slot-wise multiplication.

use std::f64::consts::PI;

use crate::error::{CkksError, Result};
use crate::polynomial::RnsPoly;

const GALOIS_GEN: usize = 5;

/// Encoded vector plus the scale it was encoded at. Never serialized.
#[derive(Clone, Debug)]
pub struct Plaintext {
    /// Scaled, rounded coefficients.
    pub poly: RnsPoly,
    /// Δ the values were multiplied by.
    pub scale: f64,
    /// Number of values the caller supplied.
    pub logical_len: usize,
}

/// Precomputed twist factors, twiddles and slot ordering for one ring degree.
#[derive(Clone, Debug)]
pub struct CkksEncoder {
    n: usize,
    /// ζ^j
    twist_re: Vec<f64>,
    twist_im: Vec<f64>,
    bit_rev: Vec<usize>,
    /// e^(+2πik/2^(s+1)) for stage s
    twiddle_re: Vec<Vec<f64>>,
    twiddle_im: Vec<Vec<f64>>,
    slot_to_fft: Vec<usize>,
}

impl CkksEncoder {
    /// Panics unless `n` is a power of two.
    pub fn new(n: usize) -> Self {
        assert!(n.is_power_of_two() && n >= 2, "ring degree must be a power of two");
        let log_n = n.trailing_zeros();

        let (twist_re, twist_im) = (0..n)
            .map(|j| {
                let angle = PI * j as f64 / n as f64;
                (angle.cos(), angle.sin())
            })
            .unzip();

        let bit_rev = (0..n)
            .map(|i| i.reverse_bits() >> (usize::BITS - log_n))
            .collect();

        let mut twiddle_re = Vec::with_capacity(log_n as usize);
        let mut twiddle_im = Vec::with_capacity(log_n as usize);
        for s in 0..log_n {
            let half = 1usize << s;
            let (re, im): (Vec<f64>, Vec<f64>) = (0..half)
                .map(|k| {
                    let angle = PI * k as f64 / half as f64;
                    (angle.cos(), angle.sin())
                })
                .unzip();
            twiddle_re.push(re);
            twiddle_im.push(im);
        }

        let slots = n / 2;
        let mut slot_to_fft = Vec::with_capacity(slots);
        let mut root = 1usize;
        for _ in 0..slots {
            slot_to_fft.push((root - 1) / 2);
            root = root * GALOIS_GEN % (2 * n);
        }

        Self { n, twist_re, twist_im, bit_rev, twiddle_re, twiddle_im, slot_to_fft }
    }

    /// N/2.
    pub fn slot_count(&self) -> usize {
        self.n / 2
    }

    /// In-place radix-2 FFT with a positive exponent; `inverse` conjugates
    /// the twiddles and divides by `n`.
    fn fft(&self, re: &mut [f64], im: &mut [f64], inverse: bool) {
        let n = self.n;
        for i in 0..n {
            let j = self.bit_rev[i];
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
        }
        let sign = if inverse { -1.0 } else { 1.0 };
        for (s, (tw_re, tw_im)) in self.twiddle_re.iter().zip(&self.twiddle_im).enumerate() {
            let half = 1usize << s;
            for start in (0..n).step_by(half << 1) {
                for k in 0..half {
                    let (w_re, w_im) = (tw_re[k], sign * tw_im[k]);
                    let i0 = start + k;
                    let i1 = i0 + half;
                    let v_re = w_re * re[i1] - w_im * im[i1];
                    let v_im = w_re * im[i1] + w_im * re[i1];
                    let (u_re, u_im) = (re[i0], im[i0]);
                    re[i0] = u_re + v_re;
                    im[i0] = u_im + v_im;
                    re[i1] = u_re - v_re;
                    im[i1] = u_im - v_im;
                }
            }
        }
        if inverse {
            let inv_n = 1.0 / n as f64;
            re.iter_mut().for_each(|x| *x *= inv_n);
            im.iter_mut().for_each(|x| *x *= inv_n);
        }
    }

    /// Real coefficients (unscaled) whose slot evaluations are `values`,
    /// zero-padded to the full slot count.
    pub fn embed_inverse(&self, values: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut re = vec![0.0; n];
        let mut im = vec![0.0; n];
        for (&v, &pos) in values.iter().zip(&self.slot_to_fft) {
            re[pos] = v;
            re[n - 1 - pos] = v;
        }
        self.fft(&mut re, &mut im, true);
        // untwist by ζ^-j and keep the real part
        (0..n)
            .map(|j| re[j] * self.twist_re[j] + im[j] * self.twist_im[j])
            .collect()
    }

    /// Slot values of a polynomial given by real coefficients.
    pub fn embed(&self, coeffs: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut re: Vec<f64> = coeffs.iter().zip(&self.twist_re).map(|(&c, &t)| c * t).collect();
        let mut im: Vec<f64> = coeffs.iter().zip(&self.twist_im).map(|(&c, &t)| c * t).collect();
        re.resize(n, 0.0);
        im.resize(n, 0.0);
        self.fft(&mut re, &mut im, false);
        self.slot_to_fft.iter().map(|&pos| re[pos]).collect()
    }

    /// EncodeVector: scale, round and lift into the given RNS basis.
    pub fn encode(&self, values: &[f64], scale: f64, moduli: &[u64]) -> Result<Plaintext> {
        let capacity = self.slot_count();
        if values.len() > capacity {
            return Err(CkksError::Capacity { len: values.len(), capacity });
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(CkksError::Encoding(format!("value at index {} is not finite", pos)));
        }

        let modulus_bits: f64 = moduli.iter().map(|&q| (q as f64).log2()).sum();
        // Leave one bit for the sign and keep the rounding inside i128.
        let limit = 2f64.powf((modulus_bits - 1.0).min(126.0));
        let coeffs = self
            .embed_inverse(values)
            .into_iter()
            .map(|c| {
                let scaled = (c * scale).round();
                if scaled.abs() >= limit {
                    Err(CkksError::Encoding(format!(
                        "scaled coefficient 2^{:.1} does not fit a {:.0}-bit modulus",
                        scaled.abs().log2(),
                        modulus_bits
                    )))
                } else {
                    Ok(scaled as i128)
                }
            })
            .collect::<Result<Vec<i128>>>()?;

        log::trace!("encoded {} values at scale 2^{:.1}", values.len(), scale.log2());
        Ok(Plaintext {
            poly: RnsPoly::from_i128(&coeffs, moduli),
            scale,
            logical_len: values.len(),
        })
    }

    /// DecodeVector: every slot, divided by the plaintext's own scale.
    pub fn decode(&self, plain: &Plaintext) -> Vec<f64> {
        let coeffs: Vec<f64> = plain
            .poly
            .to_centered_f64()
            .into_iter()
            .map(|c| c / plain.scale)
            .collect();
        self.embed(&coeffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::select_chain;

    #[test]
    fn test_embed_roundtrip() {
        let enc = CkksEncoder::new(64);
        let values: Vec<f64> = (0..32).map(|i| i as f64 * 0.25 - 3.0).collect();
        let coeffs = enc.embed_inverse(&values);
        let back = enc.embed(&coeffs);
        for (a, b) in values.iter().zip(&back) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_slot_positions_are_a_permutation() {
        let enc = CkksEncoder::new(32);
        let mut seen = vec![false; 32];
        for &pos in &enc.slot_to_fft {
            assert!(!seen[pos] && !seen[31 - pos]);
            seen[pos] = true;
            seen[31 - pos] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_encode_decode() {
        let n = 1024;
        let enc = CkksEncoder::new(n);
        let moduli = select_chain(n, &[60, 40]).unwrap();
        let values = [1.5, -2.25, 0.0, 3.75];
        let plain = enc.encode(&values, 2f64.powi(40), &moduli).unwrap();
        assert_eq!(plain.logical_len, 4);
        let decoded = enc.decode(&plain);
        assert_eq!(decoded.len(), n / 2);
        for (i, d) in decoded.iter().enumerate() {
            let expected = values.get(i).copied().unwrap_or(0.0);
            assert!((d - expected).abs() < 1e-6, "slot {}: {} vs {}", i, d, expected);
        }
    }

    #[test]
    fn test_encode_rejects_bad_input() {
        let n = 1024;
        let enc = CkksEncoder::new(n);
        let moduli = select_chain(n, &[60]).unwrap();
        let too_long = vec![1.0; n / 2 + 1];
        assert!(matches!(
            enc.encode(&too_long, 2f64.powi(40), &moduli),
            Err(CkksError::Capacity { len: 513, capacity: 512 })
        ));
        assert!(matches!(
            enc.encode(&[f64::NAN], 2f64.powi(40), &moduli),
            Err(CkksError::Encoding(_))
        ));
        assert!(matches!(
            enc.encode(&[1e12], 2f64.powi(40), &moduli),
            Err(CkksError::Encoding(_))
        ));
    }
}
