//! Gadget decomposition.
//!
//! Splits ring elements into small centered digits so that multiplication
//! by key material can be evaluated as a short inner product. Digits are in
//! (-B_g/2, B_g/2], mapped back into [0, q) per target modulus.
//!
//! Three variants:
//! - [`decompose`]: one modulus, digits against that modulus;
//! - [`decompose_rns`]: a (primary, companion) residue pair is CRT-lifted
//!   to a 128-bit integer first, and every digit is emitted against both
//!   moduli, so a single digit stream is valid for the whole RNS ciphertext;
//! - [`reconstruct`] / [`reconstruct_rns`]: test oracles.
//!
//! A nonzero `base_bits` makes the decomposition lazy: the low bits are
//! rounded off and left to the noise budget.

use super::crt::CrtContext;
use super::modular::{div_round, from_signed, to_signed};
use super::poly::Poly;
use crate::params::GadgetConfig;

/// Extracts `ell` centered digits from a signed value.
///
/// The value must satisfy |x| < B_g^ell / 2 after the lazy shift, which the
/// gadget configurations guarantee by construction.
fn centered_digits(x: i128, cfg: &GadgetConfig) -> Vec<i64> {
    let bg = cfg.bg() as i128;
    let half = bg / 2;
    let mut x = div_round(x, 1u64 << cfg.base_bits);

    let mut digits = Vec::with_capacity(cfg.ell);
    for _ in 0..cfg.ell {
        let mut d = x % bg;
        x /= bg;
        if d > half {
            d -= bg;
            x += 1;
        } else if d <= -half {
            d += bg;
            x -= 1;
        }
        digits.push(d as i64);
    }
    digits
}

/// Decomposes a coefficient-form polynomial into `ell` digit polynomials.
///
/// Satisfies `sum_i d_i * B_g^i * 2^base ≡ a (mod q)` exactly when
/// `base_bits == 0`, and up to the rounded-off low bits otherwise.
pub fn decompose(poly: &Poly, cfg: &GadgetConfig) -> Vec<Poly> {
    debug_assert!(!poly.is_ntt(), "decomposition requires coefficient form");
    let dim = poly.dimension();
    let q = poly.modulus();

    let mut result: Vec<Poly> = (0..cfg.ell).map(|_| Poly::zero(dim, q)).collect();

    for j in 0..dim {
        let centered = to_signed(poly.coeff(j), q) as i128;
        for (i, d) in centered_digits(centered, cfg).into_iter().enumerate() {
            result[i].set_coeff(j, from_signed(d, q));
        }
    }

    result
}

/// Reconstructs `sum_i d_i * B_g^i * 2^base mod q`; test oracle for
/// [`decompose`].
pub fn reconstruct(digits: &[Poly], cfg: &GadgetConfig) -> Poly {
    assert_eq!(digits.len(), cfg.ell, "digit count must match gadget length");
    let q = digits[0].modulus();

    let mut result = Poly::zero(digits[0].dimension(), q);
    let mut power = (1u128 << cfg.base_bits) % q as u128;
    for d in digits {
        result += &d.scalar_mul(power as u64);
        power = power * cfg.bg() as u128 % q as u128;
    }
    result
}

/// Decomposes a (primary, companion) residue pair in lockstep.
///
/// Each coefficient pair is CRT-lifted to its unique representative modulo
/// `primary * companion` (up to ~80 bits), centered, and split into digits;
/// digit i is returned both modulo the primary and modulo the companion, so
/// the same digit stream multiplies key material in either residue.
///
/// Inputs are the raw component slices of two coefficient-form polynomials.
pub fn decompose_rns(
    primary: &[u64],
    companion: &[u64],
    crt: &CrtContext,
    cfg: &GadgetConfig,
) -> (Vec<Poly>, Vec<Poly>) {
    debug_assert_eq!(primary.len(), companion.len(), "dimension mismatch");
    let dim = primary.len();
    let q0 = crt.q0;
    let q1 = crt.q1;
    let wide = crt.modulus_wide();
    let half_wide = (wide / 2) as i128;

    let mut out0: Vec<Poly> = (0..cfg.ell).map(|_| Poly::zero(dim, q0)).collect();
    let mut out1: Vec<Poly> = (0..cfg.ell).map(|_| Poly::zero(dim, q1)).collect();

    for j in 0..dim {
        let lifted = crt.compose_wide(primary[j], companion[j]);
        let centered = if lifted as i128 > half_wide {
            lifted as i128 - wide as i128
        } else {
            lifted as i128
        };

        for (i, d) in centered_digits(centered, cfg).into_iter().enumerate() {
            out0[i].set_coeff(j, from_signed(d, q0));
            out1[i].set_coeff(j, from_signed(d, q1));
        }
    }

    (out0, out1)
}

/// Reconstructs the 128-bit lift from an RNS digit stream; test oracle for
/// [`decompose_rns`]. Returns the value modulo `crt.modulus_wide()`.
pub fn reconstruct_rns(digits0: &[Poly], crt: &CrtContext, cfg: &GadgetConfig) -> Vec<u128> {
    assert_eq!(digits0.len(), cfg.ell, "digit count must match gadget length");
    let dim = digits0[0].dimension();
    let q0 = crt.q0;
    let wide = crt.modulus_wide() as i128;

    let mut result = vec![0u128; dim];
    for j in 0..dim {
        let mut acc: i128 = 0;
        let mut power: i128 = 1i128 << cfg.base_bits;
        for d in digits0 {
            acc += to_signed(d.coeff(j), q0) as i128 * power;
            power *= cfg.bg() as i128;
        }
        acc %= wide;
        if acc < 0 {
            acc += wide;
        }
        result[j] = acc as u128;
    }
    result
}
