//! Immutable CKKS parameter set shared by reference with every operation.

use sha2::{Digest, Sha256};

use crate::encoding::CkksEncoder;
use crate::error::{CkksError, Result};
use crate::modulus::{bit_length, select_chain, DEFAULT_CHAIN_BITS, MAX_PRIME_BITS, MIN_PRIME_BITS};
use crate::ntt::NttTable;

/// Default fixed-point scale, 2^40.
pub const DEFAULT_SCALE: f64 = (1u64 << 40) as f64;

/// Smallest supported ring dimension.
pub const MIN_RING_DIMENSION: usize = 1024;
/// Largest supported ring dimension.
pub const MAX_RING_DIMENSION: usize = 32768;

/// Largest total coefficient-modulus bit count that keeps 128-bit security
/// for a ring dimension (HomomorphicEncryption.org standard, ternary secret).
pub fn max_modulus_bits(ring_dimension: usize) -> Option<u32> {
    match ring_dimension {
        1024 => Some(27),
        2048 => Some(54),
        4096 => Some(109),
        8192 => Some(218),
        16384 => Some(438),
        32768 => Some(881),
        _ => None,
    }
}

/// Ring dimension, modulus chain and default scale.
///
/// The chain is `[q_0, .., q_{L-1}, P]`: `L` data primes that ciphertexts live
/// under, then one special prime used only while key switching. A ciphertext at
/// level `l` keeps the first `L - l` data primes.
pub struct Context {
    ring_dimension: usize,
    chain: Vec<u64>,
    chain_bits: Vec<u32>,
    scale: f64,
    ntt: Vec<NttTable>,
    encoder: CkksEncoder,
    fingerprint: [u8; 8],
}

impl Context {
    /// Default parameter set: chain {60, 40, 40, 60} bits, scale 2^40.
    pub fn new(ring_dimension: usize) -> Result<Self> {
        Self::with_parameters(ring_dimension, &DEFAULT_CHAIN_BITS, DEFAULT_SCALE)
    }

    /// Custom chain bit sizes (last entry is the special prime) and scale.
    pub fn with_parameters(ring_dimension: usize, bit_sizes: &[u32], scale: f64) -> Result<Self> {
        if !ring_dimension.is_power_of_two()
            || !(MIN_RING_DIMENSION..=MAX_RING_DIMENSION).contains(&ring_dimension)
        {
            return Err(CkksError::Parameter(format!(
                "ring dimension {} is not a power of two in {}..={}",
                ring_dimension, MIN_RING_DIMENSION, MAX_RING_DIMENSION
            )));
        }
        if bit_sizes.len() < 3 {
            return Err(CkksError::Parameter(format!(
                "modulus chain needs at least 3 primes, got {}",
                bit_sizes.len()
            )));
        }
        if let Some(&bits) = bit_sizes
            .iter()
            .find(|b| !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(*b))
        {
            return Err(CkksError::Parameter(format!(
                "prime bit size {} outside {}..={}",
                bits, MIN_PRIME_BITS, MAX_PRIME_BITS
            )));
        }
        let total_bits: u32 = bit_sizes.iter().sum();
        let ceiling = max_modulus_bits(ring_dimension).unwrap_or(0);
        if total_bits > ceiling {
            return Err(CkksError::Parameter(format!(
                "{}-bit modulus chain exceeds the {}-bit security ceiling for ring dimension {}",
                total_bits, ceiling, ring_dimension
            )));
        }
        let special_bits = bit_sizes[bit_sizes.len() - 1];
        let data_bits = &bit_sizes[..bit_sizes.len() - 1];
        let largest_data = data_bits.iter().copied().max().unwrap_or(0);
        if special_bits < largest_data {
            return Err(CkksError::Parameter(format!(
                "special prime ({} bits) must be at least as large as every data prime ({} bits)",
                special_bits, largest_data
            )));
        }
        if !scale.is_finite() || scale < 1.0 || scale.log2() >= f64::from(data_bits[0]) {
            return Err(CkksError::Parameter(format!(
                "scale {} must be finite, at least 1 and below the {}-bit base prime",
                scale, data_bits[0]
            )));
        }

        let chain = select_chain(ring_dimension, bit_sizes)?;
        let ntt = chain
            .iter()
            .map(|&q| {
                NttTable::new(q, ring_dimension).ok_or_else(|| {
                    CkksError::Parameter(format!("prime {} has no 2N-th root of unity", q))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let encoder = CkksEncoder::new(ring_dimension);
        let fingerprint = fingerprint(ring_dimension, &chain, scale);

        log::debug!(
            "context ready: N = {}, chain = {:?}, scale = 2^{}",
            ring_dimension,
            chain,
            scale.log2()
        );
        Ok(Self {
            ring_dimension,
            chain_bits: chain.iter().map(|&q| bit_length(q)).collect(),
            chain,
            scale,
            ntt,
            encoder,
            fingerprint,
        })
    }

    /// Polynomial degree N.
    pub fn ring_dimension(&self) -> usize {
        self.ring_dimension
    }

    /// Number of real values one plaintext packs (N/2).
    pub fn slot_count(&self) -> usize {
        self.ring_dimension / 2
    }

    /// Scale fresh plaintexts are encoded at.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Whole chain, special prime last.
    pub fn modulus_chain(&self) -> &[u64] {
        &self.chain
    }

    /// Bit length of each chain prime, in chain order.
    pub fn chain_bits(&self) -> &[u32] {
        &self.chain_bits
    }

    /// Chain without the special prime.
    pub fn data_primes(&self) -> &[u64] {
        &self.chain[..self.chain.len() - 1]
    }

    /// Key-switching prime P.
    pub fn special_prime(&self) -> u64 {
        self.chain[self.chain.len() - 1]
    }

    /// Number of multiply + rescale steps a fresh ciphertext survives:
    /// chain length minus the base prime and the special prime.
    pub fn depth(&self) -> usize {
        self.chain.len() - 2
    }

    /// Data primes still present at `level`.
    pub fn level_moduli(&self, level: usize) -> &[u64] {
        let primes = self.data_primes();
        &primes[..primes.len() - level]
    }

    /// Data primes at `level` followed by the special prime.
    pub fn key_switch_moduli(&self, level: usize) -> Vec<u64> {
        let mut moduli = self.level_moduli(level).to_vec();
        moduli.push(self.special_prime());
        moduli
    }

    /// Total bits of the data modulus at `level`.
    pub fn level_bits(&self, level: usize) -> u32 {
        self.chain_bits[..self.data_primes().len() - level].iter().sum()
    }

    /// NTT tables matching `moduli`, which must be drawn from the chain.
    pub fn ntt_tables(&self, moduli: &[u64]) -> Vec<&NttTable> {
        moduli
            .iter()
            .filter_map(|q| self.ntt.iter().find(|t| t.modulus == *q))
            .collect()
    }

    /// Level implied by a residue count, if the count is a valid one.
    pub fn level_for_moduli(&self, count: usize) -> Option<usize> {
        let data = self.data_primes().len();
        (1..=data).contains(&count).then(|| data - count)
    }

    /// Canonical-embedding encoder for this ring dimension.
    pub fn encoder(&self) -> &CkksEncoder {
        &self.encoder
    }

    /// Stamp written into every artifact produced under this Context.
    pub fn fingerprint(&self) -> [u8; 8] {
        self.fingerprint
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("ring_dimension", &self.ring_dimension)
            .field("chain", &self.chain)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

fn fingerprint(ring_dimension: usize, chain: &[u64], scale: f64) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(b"ckks_context_v1");
    hasher.update((ring_dimension as u64).to_le_bytes());
    for q in chain {
        hasher.update(q.to_le_bytes());
    }
    hasher.update(scale.to_bits().to_le_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}
