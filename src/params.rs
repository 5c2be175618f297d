//! Parameter sets for the BSGS PIR protocol.
//!
//! This module defines the cryptographic parameters for the two-dimensional
//! BSGS query engine: ring dimension, the RNS moduli, the plaintext modulus
//! and the gadget configurations used by switching keys, the query RGSW and
//! the packing key.
//!
//! # Overview
//!
//! All arithmetic happens in R_q = Z_q[X]/(X^N + 1) for a handful of moduli:
//!
//! - the *primary* modulus `crt_mod = crt_q1 * crt_q2`, a product of two
//!   28-bit NTT-friendly primes, carrying the main computation;
//! - the *baby-step* modulus `bs_mod` (24 bits) and the *auxiliary* modulus
//!   `aux_mod` (28 bits), which support the RNS lift tricks during
//!   automorphism key switching;
//! - the legacy 50-bit prime `big_mod` for the single-modulus path.
//!
//! Messages live in Z_p for `bsgs_p` ∈ {7681, 40961, 65537}; all three are
//! NTT-friendly modulo 2N so that decryption can re-enter the NTT domain
//! over p.
//!
//! # Example
//!
//! ```
//! use bsgs_pir::params::ParameterSet;
//!
//! let params = ParameterSet::n2048();
//! assert!(params.validate(128, 1).is_ok());
//! assert_eq!(params.bsgs_delta(), params.crt_mod / params.bsgs_p);
//! ```

use eyre::{ensure, Result};
use serde::{Deserialize, Serialize};

/// First 28-bit CRT prime: 2^28 - 2^16 + 1.
pub const CRT_Q1: u64 = 268369921;
/// Second 28-bit CRT prime: 2^21 * 7 * 17 + 1.
pub const CRT_Q2: u64 = 249561089;
/// Auxiliary 28-bit modulus: 2^13 * 32759 + 1.
pub const AUX_MOD: u64 = 268361729;
/// Baby-step modulus: 2^24 - 2^14 + 1.
pub const BS_MOD: u64 = 16760833;
/// Legacy single-modulus prime: 2^50 - 2^14 + 1.
pub const BIG_MOD: u64 = 1125899906826241;
/// Scaling factor for the legacy path: floor(big_mod / 2^16).
pub const DELTA: u64 = BIG_MOD >> 16;

/// Gadget configuration: digits d_i with Sum d_i * bg^i * 2^base = value.
///
/// `base_bits` is the number of low bits dropped by a lazy decomposition;
/// `ell * bg_bits + base_bits` must cover the width of the decomposed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetConfig {
    /// Number of digits.
    pub ell: usize,
    /// log2 of the digit base B_g.
    pub bg_bits: u32,
    /// log2 of the implicit low shift (lazy decomposition offset).
    pub base_bits: u32,
}

impl GadgetConfig {
    /// Digit base B_g.
    pub fn bg(&self) -> u64 {
        1u64 << self.bg_bits
    }

    /// Total bit width covered by the decomposition.
    pub fn covered_bits(&self) -> u32 {
        self.ell as u32 * self.bg_bits + self.base_bits
    }
}

/// Immutable parameter record for one ring dimension.
///
/// Construct via [`ParameterSet::n256`], [`ParameterSet::n2048`] or
/// [`ParameterSet::n4096`] and pass by reference; there is no global
/// parameter state.
///
/// # Fields
///
/// * `n` - Ring dimension N (power of two)
/// * `crt_q1`, `crt_q2` - The two 28-bit primes of the primary modulus
/// * `crt_mod` - Primary modulus q1 * q2 (< 2^56)
/// * `bs_mod` - Baby-step modulus (24 bits)
/// * `aux_mod` - Auxiliary modulus (28 bits)
/// * `big_mod` - Legacy single-modulus prime (50 bits)
/// * `bsgs_p` - Plaintext modulus of the BSGS path
/// * `threads` - Worker thread count for the response path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Ring dimension N (power of two).
    pub n: usize,
    /// First CRT prime.
    pub crt_q1: u64,
    /// Second CRT prime.
    pub crt_q2: u64,
    /// Primary modulus crt_q1 * crt_q2.
    pub crt_mod: u64,
    /// Baby-step modulus.
    pub bs_mod: u64,
    /// Auxiliary modulus for the RNS lift variants.
    pub aux_mod: u64,
    /// Legacy single-modulus prime.
    pub big_mod: u64,
    /// Plaintext modulus of the BSGS path.
    pub bsgs_p: u64,
    /// Plaintext bit width of the legacy path.
    pub pbits: u32,
    /// Gadget configuration for automorphism switching keys.
    pub ks_gadget: GadgetConfig,
    /// Gadget configuration for the query RGSW ciphertext.
    pub rgsw_gadget: GadgetConfig,
    /// Gadget configuration for the packing key.
    pub pack_gadget: GadgetConfig,
    /// Worker thread count, read once at startup.
    pub threads: usize,
}

impl ParameterSet {
    fn with_n(n: usize, crt_q2: u64, aux_mod: u64, bsgs_p: u64) -> Self {
        Self {
            n,
            crt_q1: CRT_Q1,
            crt_q2,
            crt_mod: CRT_Q1 * crt_q2,
            bs_mod: BS_MOD,
            aux_mod,
            big_mod: BIG_MOD,
            bsgs_p,
            pbits: 16,
            // The switching-key digits cover the top of the 80-bit
            // crt_mod * bs_mod lift; the low 29 bits are absorbed as noise.
            ks_gadget: GadgetConfig {
                ell: 3,
                bg_bits: 17,
                base_bits: 29,
            },
            rgsw_gadget: GadgetConfig {
                ell: 2,
                bg_bits: 18,
                base_bits: 20,
            },
            pack_gadget: GadgetConfig {
                ell: 4,
                bg_bits: 14,
                base_bits: 0,
            },
            threads: 16,
        }
    }

    /// Parameters for N = 256 (test-scale ring, p = 7681).
    pub fn n256() -> Self {
        Self::with_n(256, CRT_Q2, AUX_MOD, 7681)
    }

    /// Parameters for N = 2048 (p = 40961).
    pub fn n2048() -> Self {
        Self::with_n(2048, CRT_Q2, AUX_MOD, 40961)
    }

    /// Parameters for N = 4096 (p = 65537).
    pub fn n4096() -> Self {
        Self::with_n(4096, CRT_Q2, AUX_MOD, 65537)
    }

    /// Parameters for a given ring dimension.
    pub fn for_dimension(n: usize) -> Result<Self> {
        match n {
            256 => Ok(Self::n256()),
            2048 => Ok(Self::n2048()),
            4096 => Ok(Self::n4096()),
            _ => eyre::bail!("unsupported ring dimension {n}"),
        }
    }

    /// Scaling factor of the BSGS path: floor(crt_mod / bsgs_p).
    pub fn bsgs_delta(&self) -> u64 {
        self.crt_mod / self.bsgs_p
    }

    /// Gadget configuration for single-modulus switching keys: full
    /// coverage of the 50-bit legacy prime with small digits, since this
    /// path has no companion modulus to absorb key-switch noise.
    pub fn ks_gadget_single(&self) -> GadgetConfig {
        GadgetConfig {
            ell: 5,
            bg_bits: 10,
            base_bits: 0,
        }
    }

    /// Scaling factor of the legacy single-modulus path.
    pub fn delta(&self) -> u64 {
        self.big_mod >> self.pbits
    }

    /// Number of NTT slots, equal to the database column count.
    pub fn half_n(&self) -> usize {
        self.n / 2
    }

    /// Validates the parameter set together with the runtime knobs
    /// `n1` (baby-step size) and `r` (database packing count).
    pub fn validate(&self, n1: usize, r: usize) -> Result<()> {
        ensure!(self.n.is_power_of_two(), "ring dimension must be a power of two");
        let two_n = 2 * self.n as u64;
        for &(name, q) in &[
            ("crt_q1", self.crt_q1),
            ("crt_q2", self.crt_q2),
            ("bs_mod", self.bs_mod),
            ("big_mod", self.big_mod),
        ] {
            ensure!(
                (q - 1) % two_n == 0,
                "{name} = {q} is not NTT-friendly for N = {}",
                self.n
            );
        }
        ensure!(
            (self.bsgs_p - 1) % two_n == 0,
            "plaintext modulus {} is not NTT-friendly for N = {}",
            self.bsgs_p,
            self.n
        );
        ensure!(self.bsgs_p < self.bs_mod, "plaintext modulus must stay below bs_mod");
        ensure!(n1 > 0 && self.half_n() % n1 == 0, "N1 = {n1} must divide N/2");
        ensure!(r.is_power_of_two(), "packing count r = {r} must be a power of two");
        ensure!(r <= self.n, "packing count r = {r} exceeds ring dimension");
        Ok(())
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::n2048()
    }
}
