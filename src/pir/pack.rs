//! Response packing: combine r RLWE ciphertexts into one.
//!
//! Recursive halving: at level ℓ the pair (c_even, c_odd) becomes
//! (c_even + X^{N/2^ℓ}·c_odd + σ_{2^ℓ+1}(c_even - X^{N/2^ℓ}·c_odd)) / 2;
//! the automorphism fixes everything already packed at coarser strides and
//! doubles the fresh terms, because σ_{2^ℓ+1}(X^{N/2^ℓ}) = -X^{N/2^ℓ}, so
//! the halving keeps every level at unit scale.
//!
//! Dividing a ciphertext by two in Z_q (q odd) would send odd noise values
//! to ±q/2, so the per-level halvings are realized as one multiplication
//! by r^{-1} mod p after the tree: a small plaintext scalar that restores
//! unit scale exactly (up to a drift below r·p², far inside the rounding
//! margin) while amplifying noise by at most p.
//!
//! After log2(r) levels the output carries input i's message at
//! coefficient i·N/r. Each level is sequential (it consumes the previous
//! one), matching the packing key whose indices are 2^ℓ + 1.

use eyre::{ensure, Result};

use crate::keys::{eval_auto, AutoKey};
use crate::math::modular::mod_inverse;
use crate::math::NttContext;
use crate::rlwe::RlweCiphertext;

fn pack_inner(
    level: usize,
    start: usize,
    log_r: usize,
    ciphers: &[RlweCiphertext],
    autokey: &AutoKey,
    ctx: &NttContext,
) -> RlweCiphertext {
    if level == 0 {
        return ciphers[start].clone();
    }

    let n = ctx.dimension();
    let stride = 1 << (log_r - level);
    let even = pack_inner(level - 1, start, log_r, ciphers, autokey, ctx);
    let odd = pack_inner(level - 1, start + stride, log_r, ciphers, autokey, ctx);

    let shift = n >> level;
    let shifted_odd = odd.mul_monomial(shift);

    let sum = even.add(&shifted_odd);
    let diff = even.sub(&shifted_odd);

    let index = (1 << level) + 1;
    let mut rotated = eval_auto(&diff, index, autokey, ctx);
    rotated.to_coeff(ctx);

    sum.add(&rotated)
}

/// Packs `ciphers` (each in coefficient form, all under one secret, with
/// plaintexts in Z_p) into a single RLWE ciphertext in coefficient form.
///
/// The input count is padded to the next power of two with zero
/// ciphertexts. The output carries input i's message at coefficient
/// i·N/r, at unit scale: `decrypt(pack_rlwes(c))` agrees with m_i there
/// directly.
pub fn pack_rlwes(
    ciphers: &[RlweCiphertext],
    autokey: &AutoKey,
    p: u64,
    ctx: &NttContext,
) -> Result<RlweCiphertext> {
    ensure!(!ciphers.is_empty(), "nothing to pack");
    ensure!(p > 1, "plaintext modulus must exceed 1");
    let n = ctx.dimension();
    let q = ctx.modulus();

    let r = ciphers.len().next_power_of_two();
    ensure!(r <= n, "cannot pack more ciphertexts than coefficients");

    let mut padded: Vec<RlweCiphertext> = ciphers
        .iter()
        .map(|ct| {
            let mut c = ct.clone();
            c.to_coeff(ctx);
            c
        })
        .collect();
    padded.resize_with(r, || RlweCiphertext::zero(n, q));

    if r == 1 {
        return Ok(padded.remove(0));
    }

    let log_r = r.trailing_zeros() as usize;
    let packed = pack_inner(log_r, 0, log_r, &padded, autokey, ctx);

    // The deferred per-level halvings: one scale by r^{-1} mod p.
    let scale = mod_inverse(r as u64 % p, p);
    Ok(packed.scalar_mul(scale))
}
