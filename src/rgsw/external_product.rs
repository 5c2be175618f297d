//! External product: RLWE × RGSW → RLWE.
//!
//! The second-dimension fold of the PIR response: multiplying the BSGS
//! output by RGSW(X^{-w}) selects the packed lane w.

use crate::math::{decompose, NttContext, Poly};
use crate::rlwe::RlweCiphertext;

use super::types::RgswCiphertext;

/// Computes RLWE(m) ⊡ RGSW(w) → RLWE(m·w).
///
/// The input may be in either form (the digit decomposition forces a
/// conversion to coefficient form); the output is in NTT form.
pub fn external_product(
    rlwe: &RlweCiphertext,
    rgsw: &RgswCiphertext,
    ctx: &NttContext,
) -> RlweCiphertext {
    let n = rlwe.ring_dim();
    let q = rlwe.modulus();
    let gadget = &rgsw.gadget;
    let ell = gadget.ell;
    debug_assert_eq!(rgsw.modulus(), q, "moduli must match");
    debug_assert_eq!(rgsw.rows.len(), 2 * ell, "RGSW must have 2ℓ rows");

    let mut input = rlwe.clone();
    input.to_coeff(ctx);

    let a_digits = decompose(&input.a, gadget);
    let b_digits = decompose(&input.b, gadget);

    let mut result_b = Poly::zero(n, q).to_ntt_new(ctx);
    let mut result_a = Poly::zero(n, q).to_ntt_new(ctx);

    for i in 0..ell {
        let da = a_digits[i].to_ntt_new(ctx);
        let row = &rgsw.rows[i];
        result_b += &da.mul_ntt_domain(&row.b, ctx);
        result_a += &da.mul_ntt_domain(&row.a, ctx);

        let db = b_digits[i].to_ntt_new(ctx);
        let row = &rgsw.rows[ell + i];
        result_b += &db.mul_ntt_domain(&row.b, ctx);
        result_a += &db.mul_ntt_domain(&row.a, ctx);
    }

    RlweCiphertext::from_parts(result_b, result_a)
}
