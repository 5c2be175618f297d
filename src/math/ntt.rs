//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^N + 1). The forward transform produces evaluations in
//! bit-reversed order: slot k holds the evaluation at psi^(2*br(k)+1), where
//! psi is a primitive 2N-th root of unity and br is the log2(N)-bit
//! reversal. Every consumer of slot indices (the query encoder, the
//! permutation tables) relies on exactly this convention.
//!
//! # Requirements
//!
//! The modulus must be odd and admit a primitive 2N-th root of unity. For
//! the composite primary modulus the root is CRT-composed from the
//! per-prime roots; the butterflies themselves are modulus-agnostic.
//!
//! Montgomery multiplication is used inside the transform; inputs and
//! outputs are plain residues in [0, q).

use super::modular::{mod_inverse, mod_pow};

/// Precomputed NTT context: twiddle tables and Montgomery constants for one
/// modulus. Create once per (dimension, modulus) pair and share.
#[derive(Clone)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// Modulus.
    q: u64,
    /// -q^(-1) mod 2^64 for Montgomery reduction.
    q_inv_neg: u64,
    /// R^2 mod q for conversion into Montgomery form.
    r_squared: u64,
    /// Forward twiddle factors (powers of psi), Montgomery form.
    psi_powers: Vec<u64>,
    /// Inverse twiddle factors (powers of psi^(-1)), Montgomery form.
    psi_inv_powers: Vec<u64>,
    /// N^(-1) mod q in Montgomery form.
    n_inv: u64,
}

impl NttContext {
    /// Creates an NTT context for a prime modulus, searching for the
    /// primitive 2N-th root of unity.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or `q` is not ≡ 1 (mod 2N).
    pub fn new(n: usize, q: u64) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");
        assert!(
            (q - 1) % (2 * n as u64) == 0,
            "q = {q} must be ≡ 1 (mod 2n)"
        );
        let psi = Self::find_primitive_root(2 * n as u64, q);
        Self::with_root(n, q, psi)
    }

    /// Creates an NTT context for the composite modulus q1 * q2 by
    /// CRT-composing the per-prime 2N-th roots.
    pub fn for_composite(n: usize, q1: u64, q2: u64) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");
        let two_n = 2 * n as u64;
        assert!((q1 - 1) % two_n == 0, "q1 = {q1} must be ≡ 1 (mod 2n)");
        assert!((q2 - 1) % two_n == 0, "q2 = {q2} must be ≡ 1 (mod 2n)");

        let psi1 = Self::find_primitive_root(two_n, q1);
        let psi2 = Self::find_primitive_root(two_n, q2);
        let crt = super::crt::CrtContext::new(q1, q2);
        Self::with_root(n, q1 * q2, crt.compose(psi1, psi2))
    }

    /// Creates a context from an explicit primitive 2N-th root of unity.
    pub fn with_root(n: usize, q: u64, psi: u64) -> Self {
        let q_inv_neg = Self::compute_q_inv_neg(q);
        let r_squared = Self::compute_r_squared(q);

        let psi_mont = Self::to_montgomery(psi, q, r_squared, q_inv_neg);
        let psi_powers = Self::compute_twiddle_factors(n, psi_mont, q, q_inv_neg, r_squared);

        let psi_inv = mod_inverse(psi, q);
        let psi_inv_mont = Self::to_montgomery(psi_inv, q, r_squared, q_inv_neg);
        let psi_inv_powers =
            Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv_neg, r_squared);

        let n_inv_val = mod_inverse(n as u64, q);
        let n_inv = Self::to_montgomery(n_inv_val, q, r_squared, q_inv_neg);

        Self {
            n,
            q,
            q_inv_neg,
            r_squared,
            psi_powers,
            psi_inv_powers,
            n_inv,
        }
    }

    /// Ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Modulus.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Forward NTT in place (Cooley-Tukey decimation-in-time).
    ///
    /// Input: coefficients in [0, q). Output: NTT values in [0, q),
    /// bit-reversed evaluation order.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "input length must match dimension");

        for c in coeffs.iter_mut() {
            *c = Self::to_montgomery(*c, self.q, self.r_squared, self.q_inv_neg);
        }

        let n = self.n;
        let q = self.q;
        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let w = self.psi_powers[m + i];

                for j in j1..j2 {
                    let u = coeffs[j];
                    let v = self.montgomery_mul(coeffs[j + t], w);

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }

        for c in coeffs.iter_mut() {
            *c = self.montgomery_mul(*c, 1);
        }
    }

    /// Inverse NTT in place (Gentleman-Sande decimation-in-frequency),
    /// scaled by N^(-1). Input and output are plain residues.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(coeffs.len(), self.n, "input length must match dimension");

        for c in coeffs.iter_mut() {
            *c = Self::to_montgomery(*c, self.q, self.r_squared, self.q_inv_neg);
        }

        let n = self.n;
        let q = self.q;
        let mut t = 1;
        let mut m = n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j2 = i * 2 * t;
                let w = self.psi_inv_powers[m + i];

                for j in j2..(j2 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul(diff, w);
                }
            }
            t <<= 1;
        }

        for c in coeffs.iter_mut() {
            let scaled = self.montgomery_mul(*c, self.n_inv);
            *c = self.montgomery_mul(scaled, 1);
        }
    }

    /// Pointwise multiplication of two NTT-domain vectors.
    ///
    /// # Panics
    ///
    /// Panics if any length does not equal the dimension.
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        assert_eq!(a.len(), self.n, "input length must match dimension");
        assert_eq!(b.len(), self.n, "input length must match dimension");
        assert_eq!(result.len(), self.n, "output length must match dimension");

        let q = self.q as u128;
        for i in 0..self.n {
            result[i] = ((a[i] as u128 * b[i] as u128) % q) as u64;
        }
    }

    #[inline]
    fn montgomery_mul(&self, a: u64, b: u64) -> u64 {
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(self.q_inv_neg)) as u128;
        let t = ((ab + m * (self.q as u128)) >> 64) as u64;
        if t >= self.q {
            t - self.q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    /// Find a primitive n-th root of unity modulo a prime q.
    fn find_primitive_root(n: u64, q: u64) -> u64 {
        let exp = (q - 1) / n;

        for g in 2..q {
            let candidate = mod_pow(g, exp, q);
            if mod_pow(candidate, n, q) == 1 && mod_pow(candidate, n / 2, q) != 1 {
                return candidate;
            }
        }
        panic!("no primitive root found for n = {n}, q = {q}");
    }

    /// Twiddle factors indexed by butterfly group: factors[m + i] is the
    /// root used by group i at level m, built incrementally so that
    /// factors[m] for m = sum of powers of two is the product of the
    /// per-level roots.
    fn compute_twiddle_factors(
        n: usize,
        psi: u64,
        q: u64,
        q_inv_neg: u64,
        r_squared: u64,
    ) -> Vec<u64> {
        let mont_mul = |a: u64, b: u64| -> u64 {
            let ab = (a as u128) * (b as u128);
            let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
            let t = ((ab + m * (q as u128)) >> 64) as u64;
            if t >= q {
                t - q
            } else {
                t
            }
        };

        let mut factors = vec![0u64; n];
        if n == 1 {
            return factors;
        }

        for m in 1..n {
            if m.is_power_of_two() {
                // New level: psi^(n / (2m)).
                let exp = n / (2 * m);
                let mut pow = Self::to_montgomery(1, q, r_squared, q_inv_neg);
                for _ in 0..exp {
                    pow = mont_mul(pow, psi);
                }
                factors[m] = pow;
            } else {
                let prev_idx = m & (m - 1); // clear lowest set bit
                let step_idx = m & m.wrapping_neg(); // lowest set bit
                factors[m] = mont_mul(factors[prev_idx], factors[step_idx]);
            }
        }

        factors
    }
}
