//! Modulus switching: collapse an RNS ciphertext pair onto the primary
//! modulus.
//!
//! The (crt_mod, bs_mod) pair jointly encrypts a value modulo
//! crt_mod·bs_mod. Coefficient-wise, the joint value is recomposed by CRT,
//! centered, and divided by bs_mod with rounding (half away from zero, the
//! crate-wide convention), leaving a ciphertext modulo crt_mod whose noise
//! is the joint noise divided by bs_mod plus at most |s|/2 + 1/2 from the
//! rounding itself.

use crate::math::modular::div_round;
use crate::math::{CrtContext, NttContext, Poly};
use crate::params::ParameterSet;
use crate::rlwe::{RlweCiphertext, RnsRlweCiphertext};

/// Switches an RNS pair down to a single ciphertext modulo crt_mod,
/// returned in coefficient form.
pub fn mod_switch(
    params: &ParameterSet,
    ct: &RnsRlweCiphertext,
    ctx_crt: &NttContext,
    ctx_bs: &NttContext,
    lift: &CrtContext,
) -> RlweCiphertext {
    let n = params.n;
    let crt = params.crt_mod;
    let bs = params.bs_mod;
    let wide = lift.modulus_wide();
    let half_wide = (wide / 2) as i128;

    let mut crt_ct = ct.crt.clone();
    let mut bs_ct = ct.bs.clone();
    crt_ct.to_coeff(ctx_crt);
    bs_ct.to_coeff(ctx_bs);

    let switch_component = |c_crt: &Poly, c_bs: &Poly| -> Poly {
        let coeffs: Vec<u64> = (0..n)
            .map(|i| {
                let joint = lift.compose_wide(c_crt.coeff(i), c_bs.coeff(i));
                let centered = if joint as i128 > half_wide {
                    joint as i128 - wide as i128
                } else {
                    joint as i128
                };
                div_round(centered, bs).rem_euclid(crt as i128) as u64
            })
            .collect();
        Poly::from_coeffs(coeffs, crt)
    };

    RlweCiphertext::from_parts(
        switch_component(&crt_ct.b, &bs_ct.b),
        switch_component(&crt_ct.a, &bs_ct.a),
    )
}
