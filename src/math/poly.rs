//! Polynomial operations over R_q = Z_q[X]/(X^N + 1)
//!
//! A `Poly` carries its modulus and an explicit form tag. Pointwise
//! multiplication requires both operands in NTT form; automorphisms and
//! coefficient access require coefficient form. Form transitions are always
//! explicit via [`Poly::to_ntt`] / [`Poly::to_coeff`].

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::modular::{mod_add, mod_mul, mod_neg, mod_sub};
use super::ntt::NttContext;
use super::sampler::ErrorSampler;

/// Polynomial in R_q = Z_q[X]/(X^N + 1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Poly {
    /// Residues, in coefficient or NTT order depending on `is_ntt`.
    coeffs: Vec<u64>,
    /// Modulus q.
    q: u64,
    /// Whether the residues are in NTT (evaluation) order.
    is_ntt: bool,
}

impl Poly {
    /// Zero polynomial in coefficient form.
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: false,
        }
    }

    /// Polynomial from a coefficient vector, reduced mod q.
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut p = Self {
            coeffs,
            q,
            is_ntt: false,
        };
        for c in &mut p.coeffs {
            *c %= q;
        }
        p
    }

    /// Polynomial from NTT-order residues. The caller asserts the values
    /// really are NTT-domain evaluations under the crate's convention.
    pub fn from_ntt_values(values: Vec<u64>, q: u64) -> Self {
        Self {
            coeffs: values,
            q,
            is_ntt: true,
        }
    }

    /// Constant polynomial.
    pub fn constant(value: u64, dim: usize, q: u64) -> Self {
        let mut coeffs = vec![0; dim];
        coeffs[0] = value % q;
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Monomial c * X^k.
    pub fn monomial(c: u64, k: usize, dim: usize, q: u64) -> Self {
        debug_assert!(k < dim, "monomial degree out of range");
        let mut coeffs = vec![0; dim];
        coeffs[k] = c % q;
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Uniformly random polynomial in coefficient form.
    pub fn random<R: Rng>(dim: usize, q: u64, rng: &mut R) -> Self {
        let coeffs: Vec<u64> = (0..dim).map(|_| rng.gen_range(0..q)).collect();
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Polynomial with coefficients from the error distribution.
    pub fn sample_error(dim: usize, q: u64, sampler: &mut ErrorSampler) -> Self {
        let coeffs: Vec<u64> = (0..dim).map(|_| sampler.sample_mod(q)).collect();
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Ring dimension.
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    /// Modulus.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Whether the polynomial is in NTT form.
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Coefficient at index `i`. Coefficient form only.
    pub fn coeff(&self, i: usize) -> u64 {
        debug_assert!(!self.is_ntt, "coefficient access requires coefficient form");
        self.coeffs[i]
    }

    /// Sets coefficient `i`. Coefficient form only.
    pub fn set_coeff(&mut self, i: usize, value: u64) {
        debug_assert!(!self.is_ntt, "coefficient access requires coefficient form");
        self.coeffs[i] = value % self.q;
    }

    /// Raw residue vector, whichever form it is in.
    pub fn values(&self) -> &[u64] {
        &self.coeffs
    }

    /// Mutable raw residue vector.
    pub fn values_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    /// Converts to NTT form in place. Idempotent.
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        debug_assert_eq!(ctx.modulus(), self.q, "NTT context modulus mismatch");
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Converts to coefficient form in place. Idempotent.
    pub fn to_coeff(&mut self, ctx: &NttContext) {
        debug_assert_eq!(ctx.modulus(), self.q, "NTT context modulus mismatch");
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Copy in NTT form.
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Copy in coefficient form.
    pub fn to_coeff_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_coeff(ctx);
        result
    }

    /// Scalar multiplication.
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let scalar = scalar % self.q;
        let coeffs: Vec<u64> = self
            .coeffs
            .iter()
            .map(|&c| mod_mul(c, scalar, self.q))
            .collect();
        Self {
            coeffs,
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }

    /// Pointwise product; both operands must be in NTT form.
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        debug_assert!(
            self.is_ntt && other.is_ntt,
            "pointwise multiply requires both operands in NTT form"
        );
        debug_assert_eq!(self.q, other.q, "moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);

        Self {
            coeffs: result,
            q: self.q,
            is_ntt: true,
        }
    }

    /// Full negacyclic product of two coefficient-form polynomials,
    /// returned in coefficient form.
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        debug_assert_eq!(self.q, other.q, "moduli must match");
        debug_assert_eq!(self.coeffs.len(), other.coeffs.len(), "dimensions must match");

        let a = self.to_ntt_new(ctx);
        let b = other.to_ntt_new(ctx);
        let mut prod = a.mul_ntt_domain(&b, ctx);
        prod.to_coeff(ctx);
        prod
    }

    /// Negacyclic multiplication by X^t for t in [0, 2N).
    ///
    /// Coefficient form only; X^N = -1 wraps signs.
    pub fn mul_monomial(&self, t: usize) -> Self {
        debug_assert!(!self.is_ntt, "monomial shift requires coefficient form");
        let n = self.coeffs.len();
        let two_n = 2 * n;
        let t = t % two_n;

        let mut coeffs = vec![0u64; n];
        for (i, &c) in self.coeffs.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let idx = (i + t) % two_n;
            if idx < n {
                coeffs[idx] = mod_add(coeffs[idx], c, self.q);
            } else {
                coeffs[idx - n] = mod_sub(coeffs[idx - n], c, self.q);
            }
        }

        Self {
            coeffs,
            q: self.q,
            is_ntt: false,
        }
    }

    /// True if every residue is zero.
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Maximum absolute coefficient in centered representation.
    pub fn linf_norm(&self) -> u64 {
        debug_assert!(!self.is_ntt, "norm requires coefficient form");
        self.coeffs
            .iter()
            .map(|&c| if c <= self.q / 2 { c } else { self.q - c })
            .max()
            .unwrap_or(0)
    }
}

impl PartialEq for Poly {
    fn eq(&self, other: &Self) -> bool {
        self.q == other.q && self.is_ntt == other.is_ntt && self.coeffs == other.coeffs
    }
}

impl Eq for Poly {}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Poly {
        debug_assert_eq!(self.q, rhs.q, "moduli must match");
        debug_assert_eq!(self.is_ntt, rhs.is_ntt, "forms must match");

        let coeffs: Vec<u64> = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(&a, &b)| mod_add(a, b, self.q))
            .collect();

        Poly {
            coeffs,
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Add for Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Poly {
        &self + &rhs
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Poly) {
        debug_assert_eq!(self.q, rhs.q, "moduli must match");
        debug_assert_eq!(self.is_ntt, rhs.is_ntt, "forms must match");
        for (a, &b) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a = mod_add(*a, b, self.q);
        }
    }
}

impl AddAssign for Poly {
    fn add_assign(&mut self, rhs: Poly) {
        *self += &rhs;
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Poly {
        debug_assert_eq!(self.q, rhs.q, "moduli must match");
        debug_assert_eq!(self.is_ntt, rhs.is_ntt, "forms must match");

        let coeffs: Vec<u64> = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(&a, &b)| mod_sub(a, b, self.q))
            .collect();

        Poly {
            coeffs,
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Sub for Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Poly {
        &self - &rhs
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Poly) {
        debug_assert_eq!(self.q, rhs.q, "moduli must match");
        debug_assert_eq!(self.is_ntt, rhs.is_ntt, "forms must match");
        for (a, &b) in self.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a = mod_sub(*a, b, self.q);
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        let coeffs: Vec<u64> = self.coeffs.iter().map(|&c| mod_neg(c, self.q)).collect();
        Poly {
            coeffs,
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        -&self
    }
}
