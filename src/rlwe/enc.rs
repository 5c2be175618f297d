//! RLWE encryption and decryption
//!
//! Encryption computes b = -a·s + e + Δ·m, so decryption is the rounding of
//! the phase b + a·s. The RNS variant encrypts the same Δ·m + e jointly
//! under `crt_mod` and `bs_mod`; because the defining equation is linear,
//! computing it residue-wise with a shared error is the joint computation.

use rand::Rng;

use crate::math::modular::{div_round, to_signed};
use crate::math::{ErrorSampler, NttContext, Poly};
use crate::params::ParameterSet;

use super::types::{uniform_poly, RlweCiphertext, RnsRlweCiphertext, Secret};

impl RlweCiphertext {
    /// Encrypts a message polynomial (coefficients in [0, p)) scaled by
    /// `delta` under `secret`. Output is in coefficient form.
    pub fn encrypt<R: Rng>(
        secret: &Secret,
        message: &Poly,
        delta: u64,
        ctx: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) -> Self {
        let n = secret.ring_dim();
        let q = ctx.modulus();
        debug_assert_eq!(message.modulus(), q, "message modulus mismatch");

        let a = uniform_poly(n, q, rng);
        let e = Poly::sample_error(n, q, sampler);

        let s = secret.poly_mod(q);
        let a_s = a.mul_ntt(&s, ctx);
        let b = &(&(-a_s) + &e) + &message.scalar_mul(delta);

        Self { b, a }
    }

    /// The phase b + a·s in coefficient form.
    pub fn phase(&self, secret: &Secret, ctx: &NttContext) -> Poly {
        let q = self.modulus();
        let s = secret.poly_mod(q);

        let mut ct = self.clone();
        ct.to_ntt(ctx);
        let mut a_s = ct.a.mul_ntt_domain(&s.to_ntt_new(ctx), ctx);
        a_s += &ct.b;
        a_s.to_coeff(ctx);
        a_s
    }

    /// Decrypts by rounding the phase: m = round((b + a·s) / Δ) mod p.
    pub fn decrypt(&self, secret: &Secret, delta: u64, p: u64, ctx: &NttContext) -> Poly {
        let q = self.modulus();
        let noisy = self.phase(secret, ctx);

        let coeffs: Vec<u64> = noisy
            .values()
            .iter()
            .map(|&v| {
                let rounded = div_round(to_signed(v, q) as i128, delta);
                (rounded.rem_euclid(p as i128)) as u64
            })
            .collect();

        Poly::from_coeffs(coeffs, p)
    }
}

/// Encrypts a message for the BSGS path: the same Δ·m + e under `crt_mod`
/// and `bs_mod`, with Δ = `params.bsgs_delta()`.
///
/// The message is given in coefficient form with values in [0, bsgs_p).
/// Both output components are in coefficient form.
pub fn encrypt_rns_bsgs<R: Rng>(
    params: &ParameterSet,
    secret: &Secret,
    message: &Poly,
    ctx_crt: &NttContext,
    ctx_bs: &NttContext,
    sampler: &mut ErrorSampler,
    rng: &mut R,
) -> RnsRlweCiphertext {
    let n = params.n;
    let delta = params.bsgs_delta();
    debug_assert_eq!(message.dimension(), n, "message dimension mismatch");

    // One shared error; the scaled message embeds exactly in each modulus.
    let e_signed: Vec<i64> = (0..n).map(|_| sampler.sample()).collect();

    let encrypt_residue = |q: u64, ctx: &NttContext, rng: &mut R| -> RlweCiphertext {
        let a = uniform_poly(n, q, rng);
        let e = Poly::from_coeffs(
            e_signed
                .iter()
                .map(|&v| crate::math::modular::from_signed(v, q))
                .collect(),
            q,
        );
        let scaled: Vec<u64> = message
            .values()
            .iter()
            .map(|&m| ((delta as u128 * m as u128) % q as u128) as u64)
            .collect();
        let scaled = Poly::from_coeffs(scaled, q);

        let s = secret.poly_mod(q);
        let a_s = a.mul_ntt(&s, ctx);
        let b = &(&(-a_s) + &e) + &scaled;
        RlweCiphertext { b, a }
    };

    RnsRlweCiphertext {
        crt: encrypt_residue(params.crt_mod, ctx_crt, rng),
        bs: encrypt_residue(params.bs_mod, ctx_bs, rng),
    }
}
