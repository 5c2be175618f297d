//! RLWE ciphertext and key types.
//!
//! Ring-LWE over R_q = Z_q[X]/(X^N + 1). A ciphertext is the pair (b, a)
//! with b + a·s ≈ Δ·m; the RNS query carries one such pair per modulus.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::modular::from_signed;
use crate::math::{ErrorSampler, NttContext, Poly};

/// RLWE secret key: a ternary polynomial, shared across moduli.
///
/// The key stores its small signed coefficients so it can be instantiated
/// modulo any of the protocol moduli; the BSGS path uses the same secret
/// under `crt_mod` and `bs_mod`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Secret {
    /// Ternary coefficients in {-1, 0, 1}.
    signed: Vec<i64>,
    /// Primary modulus this secret was created for.
    modulus: u64,
}

impl Secret {
    /// Samples a fresh ternary secret for the given ring dimension and
    /// primary modulus.
    pub fn new(n: usize, modulus: u64, sampler: &mut ErrorSampler) -> Self {
        let signed: Vec<i64> = (0..n).map(|_| sampler.sample()).collect();
        Self { signed, modulus }
    }

    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.signed.len()
    }

    /// Primary modulus.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// The secret as a coefficient-form polynomial modulo its primary
    /// modulus.
    pub fn poly(&self) -> Poly {
        self.poly_mod(self.modulus)
    }

    /// The secret as a coefficient-form polynomial modulo an arbitrary
    /// modulus; the ternary coefficients embed exactly.
    pub fn poly_mod(&self, q: u64) -> Poly {
        let coeffs: Vec<u64> = self.signed.iter().map(|&c| from_signed(c, q)).collect();
        Poly::from_coeffs(coeffs, q)
    }
}

/// RLWE ciphertext (b, a) with b + a·s ≈ Δ·m.
///
/// Both components always share dimension, modulus and form; the form is
/// whatever the producing operation documents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Masked component: b = -a·s + e + Δ·m.
    pub b: Poly,
    /// Uniform component.
    pub a: Poly,
}

impl RlweCiphertext {
    /// Builds a ciphertext from its components.
    ///
    /// Debug-asserts dimension, modulus and form agreement.
    pub fn from_parts(b: Poly, a: Poly) -> Self {
        debug_assert_eq!(b.dimension(), a.dimension(), "component dimension mismatch");
        debug_assert_eq!(b.modulus(), a.modulus(), "component modulus mismatch");
        debug_assert_eq!(b.is_ntt(), a.is_ntt(), "component form mismatch");
        Self { b, a }
    }

    /// The (0, 0) ciphertext, identity for homomorphic addition.
    pub fn zero(n: usize, q: u64) -> Self {
        Self {
            b: Poly::zero(n, q),
            a: Poly::zero(n, q),
        }
    }

    /// Trivial encryption (Δ·m, 0): decrypts to m under any key. No
    /// security, useful for plaintext operands in homomorphic sums.
    pub fn trivial(message: &Poly, delta: u64) -> Self {
        let b = message.scalar_mul(delta);
        let a = Poly::zero(message.dimension(), message.modulus());
        Self { b, a }
    }

    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    /// Modulus.
    pub fn modulus(&self) -> u64 {
        self.a.modulus()
    }

    /// Whether both components are in NTT form.
    pub fn is_ntt(&self) -> bool {
        self.a.is_ntt()
    }

    /// Converts both components to NTT form.
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        self.b.to_ntt(ctx);
        self.a.to_ntt(ctx);
    }

    /// Converts both components to coefficient form.
    pub fn to_coeff(&mut self, ctx: &NttContext) {
        self.b.to_coeff(ctx);
        self.a.to_coeff(ctx);
    }

    /// Homomorphic addition.
    pub fn add(&self, other: &Self) -> Self {
        Self {
            b: &self.b + &other.b,
            a: &self.a + &other.a,
        }
    }

    /// In-place homomorphic addition.
    pub fn add_assign(&mut self, other: &Self) {
        self.b += &other.b;
        self.a += &other.a;
    }

    /// Homomorphic subtraction.
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            b: &self.b - &other.b,
            a: &self.a - &other.a,
        }
    }

    /// Scalar multiplication of both components.
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        Self {
            b: self.b.scalar_mul(scalar),
            a: self.a.scalar_mul(scalar),
        }
    }

    /// Multiplication by the monomial X^t (coefficient form).
    pub fn mul_monomial(&self, t: usize) -> Self {
        Self {
            b: self.b.mul_monomial(t),
            a: self.a.mul_monomial(t),
        }
    }

    /// Multiplication by a plaintext polynomial.
    pub fn poly_mul(&self, plaintext: &Poly, ctx: &NttContext) -> Self {
        Self {
            b: self.b.mul_ntt(plaintext, ctx),
            a: self.a.mul_ntt(plaintext, ctx),
        }
    }
}

/// RNS ciphertext for the BSGS query: the same message under `crt_mod` and
/// `bs_mod`, sharing one error polynomial so the joint value is consistent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RnsRlweCiphertext {
    /// Component modulo the primary modulus.
    pub crt: RlweCiphertext,
    /// Component modulo the baby-step modulus.
    pub bs: RlweCiphertext,
}

impl RnsRlweCiphertext {
    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.crt.ring_dim()
    }
}

/// Samples a uniform polynomial; kept here so encryption call sites share
/// one code path.
pub(crate) fn uniform_poly<R: Rng>(n: usize, q: u64, rng: &mut R) -> Poly {
    Poly::random(n, q, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;

    #[test]
    fn test_secret_embeds_in_any_modulus() {
        let params = ParameterSet::n256();
        let mut sampler = ErrorSampler::with_seed(1);
        let secret = Secret::new(params.n, params.crt_mod, &mut sampler);

        let s_crt = secret.poly_mod(params.crt_mod);
        let s_bs = secret.poly_mod(params.bs_mod);

        for i in 0..params.n {
            let a = s_crt.coeff(i);
            let b = s_bs.coeff(i);
            // Same signed value under both moduli.
            let signed_a = if a > params.crt_mod / 2 {
                a as i64 - params.crt_mod as i64
            } else {
                a as i64
            };
            let signed_b = if b > params.bs_mod / 2 {
                b as i64 - params.bs_mod as i64
            } else {
                b as i64
            };
            assert_eq!(signed_a, signed_b);
        }
    }

    #[test]
    fn test_trivial_ciphertext_shape() {
        let params = ParameterSet::n256();
        let msg = Poly::constant(5, params.n, params.crt_mod);
        let ct = RlweCiphertext::trivial(&msg, params.bsgs_delta());

        assert!(ct.a.is_zero());
        assert_eq!(ct.b.coeff(0), 5 * params.bsgs_delta());
    }

    #[test]
    fn test_monomial_shift_of_ciphertext() {
        let params = ParameterSet::n256();
        let msg = Poly::monomial(3, 0, params.n, params.crt_mod);
        let ct = RlweCiphertext::trivial(&msg, 1);

        let shifted = ct.mul_monomial(1);
        assert_eq!(shifted.b.coeff(1), 3);

        // Wrap past N flips the sign.
        let wrapped = ct.mul_monomial(params.n);
        assert_eq!(wrapped.b.coeff(0), params.crt_mod - 3);
    }
}
