//! CRT (Chinese Remainder Theorem) helpers.
//!
//! Two flavours of residue recombination are used by the protocol: the
//! 64-bit compose for the pair of 28-bit primes inside `crt_mod`, and a
//! 128-bit compose for lifting a (`crt_mod`, companion) ciphertext pair
//! before gadget decomposition.

use super::modular::mod_inverse;

/// Precomputed context for composing two residues.
#[derive(Debug, Clone, Copy)]
pub struct CrtContext {
    pub q0: u64,
    pub q1: u64,
    /// q0^-1 mod q1.
    pub q0_inv_mod_q1: u64,
}

impl CrtContext {
    pub fn new(q0: u64, q1: u64) -> Self {
        Self {
            q0,
            q1,
            q0_inv_mod_q1: mod_inverse(q0, q1),
        }
    }

    /// Composes residues (a0 mod q0, a1 mod q1) into a value mod q0 * q1.
    ///
    /// Formula: x = a0 + q0 * ((a1 - a0) * q0^-1 mod q1).
    /// The product q0 * q1 must fit in 64 bits.
    #[inline]
    pub fn compose(&self, a0: u64, a1: u64) -> u64 {
        let a0_mod_q1 = a0 % self.q1;
        let diff = if a1 >= a0_mod_q1 {
            a1 - a0_mod_q1
        } else {
            (a1 + self.q1) - a0_mod_q1
        };
        let t = ((diff as u128 * self.q0_inv_mod_q1 as u128) % self.q1 as u128) as u64;
        a0 + self.q0 * t
    }

    /// Composes into a 128-bit value; needed when q0 * q1 exceeds 64 bits
    /// (the crt_mod * bs_mod lift is ~80 bits wide).
    #[inline]
    pub fn compose_wide(&self, a0: u64, a1: u64) -> u128 {
        let a0_mod_q1 = a0 % self.q1;
        let diff = if a1 >= a0_mod_q1 {
            a1 - a0_mod_q1
        } else {
            (a1 + self.q1) - a0_mod_q1
        };
        let t = ((diff as u128 * self.q0_inv_mod_q1 as u128) % self.q1 as u128) as u64;
        a0 as u128 + self.q0 as u128 * t as u128
    }

    /// Product of the two moduli as a 128-bit value.
    #[inline]
    pub fn modulus_wide(&self) -> u128 {
        self.q0 as u128 * self.q1 as u128
    }
}

/// Splits a value into two residues.
#[inline]
pub fn crt_decompose_2(value: u64, q0: u64, q1: u64) -> (u64, u64) {
    (value % q0, value % q1)
}
