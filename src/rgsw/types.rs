//! RGSW ciphertext type.
//!
//! An RGSW ciphertext encrypting a small message w is a 2ℓ × 2 matrix of
//! ring elements: ℓ rows whose phase is w·z_i·s and ℓ rows whose phase is
//! w·z_i, for the gadget powers z_i = 2^base · B_g^i. The only operation
//! consumers need is the external product (see `external_product`).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{ErrorSampler, NttContext, Poly};
use crate::params::GadgetConfig;
use crate::rlwe::{RlweCiphertext, Secret};

/// RGSW ciphertext: 2ℓ RLWE rows in NTT form.
///
/// Rows 0..ℓ carry the message on the `a` component (phase w·z_i·s); rows
/// ℓ..2ℓ carry it on the `b` component (phase w·z_i).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RgswCiphertext {
    /// 2ℓ RLWE ciphertexts, NTT form.
    pub rows: Vec<RlweCiphertext>,
    /// Gadget configuration of the rows.
    pub gadget: GadgetConfig,
}

impl RgswCiphertext {
    /// Encrypts a message polynomial (coefficient form, small norm).
    ///
    /// Rows are generated in coefficient form and stored in NTT form so the
    /// external product's inner loop is pure pointwise arithmetic.
    pub fn encrypt<R: Rng>(
        secret: &Secret,
        message: &Poly,
        gadget: GadgetConfig,
        ctx: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) -> Self {
        let n = secret.ring_dim();
        let q = ctx.modulus();
        debug_assert_eq!(message.modulus(), q, "message modulus mismatch");

        let s = secret.poly_mod(q);
        let ell = gadget.ell;
        let mut rows = Vec::with_capacity(2 * ell);

        let mut power = (1u128 << gadget.base_bits) % q as u128;
        let mut powers = Vec::with_capacity(ell);
        for _ in 0..ell {
            powers.push(power as u64);
            power = power * gadget.bg() as u128 % q as u128;
        }

        // Rows 0..ell: (b, a) = (-a'·s + e, a' + w·z_i) for fresh a'.
        for &z in &powers {
            let a_rand = Poly::random(n, q, rng);
            let e = Poly::sample_error(n, q, sampler);

            let b = &(-a_rand.mul_ntt(&s, ctx)) + &e;
            let a = &a_rand + &message.scalar_mul(z);

            let mut row = RlweCiphertext::from_parts(b, a);
            row.to_ntt(ctx);
            rows.push(row);
        }

        // Rows ell..2ell: (b, a) = (-a'·s + e + w·z_i, a').
        for &z in &powers {
            let a = Poly::random(n, q, rng);
            let e = Poly::sample_error(n, q, sampler);

            let b = &(&(-a.mul_ntt(&s, ctx)) + &e) + &message.scalar_mul(z);

            let mut row = RlweCiphertext::from_parts(b, a);
            row.to_ntt(ctx);
            rows.push(row);
        }

        Self { rows, gadget }
    }

    /// Encrypts the monomial X^{-w}, the second-dimension selector of the
    /// PIR query: w = 0 gives 1, otherwise -X^{N-w}.
    pub fn encrypt_monomial<R: Rng>(
        secret: &Secret,
        w: usize,
        gadget: GadgetConfig,
        ctx: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) -> Self {
        let n = secret.ring_dim();
        let q = ctx.modulus();
        debug_assert!(w < n, "monomial exponent out of range");

        let message = if w == 0 {
            Poly::constant(1, n, q)
        } else {
            -&Poly::monomial(1, n - w, n, q)
        };
        Self::encrypt(secret, &message, gadget, ctx, sampler, rng)
    }

    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.rows[0].ring_dim()
    }

    /// Modulus.
    pub fn modulus(&self) -> u64 {
        self.rows[0].modulus()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_rgsw_structure() {
        let params = ParameterSet::n256();
        let ctx = NttContext::for_composite(params.n, params.crt_q1, params.crt_q2);
        let mut sampler = ErrorSampler::with_seed(21);
        let mut rng = ChaCha20Rng::seed_from_u64(22);

        let secret = Secret::new(params.n, params.crt_mod, &mut sampler);
        let rgsw = RgswCiphertext::encrypt_monomial(
            &secret,
            3,
            params.rgsw_gadget,
            &ctx,
            &mut sampler,
            &mut rng,
        );

        assert_eq!(rgsw.rows.len(), 2 * params.rgsw_gadget.ell);
        assert_eq!(rgsw.ring_dim(), params.n);
        assert!(rgsw.rows.iter().all(|r| r.is_ntt()));
    }

    #[test]
    fn test_message_rows_decrypt_to_scaled_message() {
        let params = ParameterSet::n256();
        let ctx = NttContext::for_composite(params.n, params.crt_q1, params.crt_q2);
        let mut sampler = ErrorSampler::with_seed(23);
        let mut rng = ChaCha20Rng::seed_from_u64(24);

        let secret = Secret::new(params.n, params.crt_mod, &mut sampler);
        let message = Poly::constant(1, params.n, params.crt_mod);
        let gadget = params.rgsw_gadget;
        let rgsw =
            RgswCiphertext::encrypt(&secret, &message, gadget, &ctx, &mut sampler, &mut rng);

        // Row ell (first b-side row) has phase w·2^base = 2^base up to the
        // ternary error.
        let mut row = rgsw.rows[gadget.ell].clone();
        row.to_coeff(&ctx);
        let phase = row.phase(&secret, &ctx);

        let expected = 1u64 << gadget.base_bits;
        let diff = crate::math::modular::to_signed(
            crate::math::modular::mod_sub(phase.coeff(0), expected, params.crt_mod),
            params.crt_mod,
        );
        assert!(diff.unsigned_abs() < 1000, "phase error too large: {diff}");
    }
}
