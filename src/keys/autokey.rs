//! Single-modulus automorphism switching keys.
//!
//! An `AutoKey` maps an automorphism index i to gadget-encrypted key
//! material for σ_i(s): ℓ RLWE rows whose phase is σ_i(s)·z_k for the
//! gadget powers z_k. Key switching a permuted ciphertext is then the digit
//! inner product with these rows.
//!
//! The same type serves the legacy single-modulus BSGS path and the
//! response packing (whose index family is 2^l + 1, one index per
//! halving level).

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{decompose, ErrorSampler, NttContext, Poly};
use crate::params::GadgetConfig;
use crate::rlwe::{apply_automorphism, RlweCiphertext, Secret};

/// Switching-key table indexed by automorphism exponent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutoKey {
    /// Per-index key material: ℓ RLWE rows in NTT form.
    keys: HashMap<usize, Vec<RlweCiphertext>>,
    /// Gadget configuration shared by all rows.
    pub gadget: GadgetConfig,
    /// Ring dimension.
    n: usize,
    /// Modulus.
    q: u64,
}

impl AutoKey {
    /// Creates an empty table for the given ring and gadget.
    pub fn new(n: usize, q: u64, gadget: GadgetConfig) -> Self {
        Self {
            keys: HashMap::new(),
            gadget,
            n,
            q,
        }
    }

    /// Generates key material for each index in `indices`.
    ///
    /// Row k encrypts σ_i(s)·z_k under s: (b, a) = (-a·s + e + σ_i(s)·z_k, a).
    pub fn keygen<R: Rng>(
        &mut self,
        secret: &Secret,
        indices: &[usize],
        ctx: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) {
        debug_assert_eq!(secret.ring_dim(), self.n, "secret dimension mismatch");
        debug_assert_eq!(ctx.modulus(), self.q, "context modulus mismatch");

        let s = secret.poly_mod(self.q);

        for &index in indices {
            let sigma_s = apply_automorphism(&s, index);
            let rows = gadget_rows(&s, &sigma_s, &self.gadget, ctx, sampler, rng);
            self.keys.insert(index, rows);
        }
    }

    /// Generates the packing key for r lanes: one index per halving level,
    /// {2^l + 1 : l = 1..=log2(r)} = {3, 5, 9, ...}.
    pub fn packing_keygen<R: Rng>(
        &mut self,
        secret: &Secret,
        r: usize,
        ctx: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) {
        debug_assert!(r.is_power_of_two(), "packing count must be a power of two");
        let indices: Vec<usize> = (1..=r.trailing_zeros())
            .map(|l| (1usize << l) + 1)
            .collect();
        self.keygen(secret, &indices, ctx, sampler, rng);
    }

    /// Generates the single-modulus BSGS schedule: baby indices 5^j
    /// (j = 1..=N1/2) and giant indices 5^{N1·g} (g = 1..N2).
    pub fn bsgs_keygen<R: Rng>(
        &mut self,
        secret: &Secret,
        n1: usize,
        ctx: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) {
        let two_n = 2 * self.n as u64;
        let n2 = self.n / 2 / n1;

        let mut indices: Vec<usize> = (1..=n1 / 2)
            .map(|j| crate::math::modular::mod_pow(5, j as u64, two_n) as usize)
            .collect();
        indices.extend(
            (1..n2).map(|g| crate::math::modular::mod_pow(5, (n1 * g) as u64, two_n) as usize),
        );
        self.keygen(secret, &indices, ctx, sampler, rng);
    }

    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.n
    }

    /// Modulus.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Key material for one index.
    ///
    /// # Panics
    ///
    /// Panics if no key was generated for `index`; the switching key must
    /// have been generated for precisely this automorphism.
    pub fn rows(&self, index: usize) -> &[RlweCiphertext] {
        self.keys
            .get(&index)
            .unwrap_or_else(|| panic!("no switching key for automorphism index {index}"))
            .as_slice()
    }

    /// True if key material exists for `index`.
    pub fn contains(&self, index: usize) -> bool {
        self.keys.contains_key(&index)
    }
}

/// Builds the ℓ gadget rows encrypting `message`·z_k under `s`.
fn gadget_rows<R: Rng>(
    s: &Poly,
    message: &Poly,
    gadget: &GadgetConfig,
    ctx: &NttContext,
    sampler: &mut ErrorSampler,
    rng: &mut R,
) -> Vec<RlweCiphertext> {
    let n = s.dimension();
    let q = ctx.modulus();
    let mut rows = Vec::with_capacity(gadget.ell);

    let mut power = (1u128 << gadget.base_bits) % q as u128;
    for _ in 0..gadget.ell {
        let a = Poly::random(n, q, rng);
        let e = Poly::sample_error(n, q, sampler);

        let b = &(&(-a.mul_ntt(s, ctx)) + &e) + &message.scalar_mul(power as u64);

        let mut row = RlweCiphertext::from_parts(b, a);
        row.to_ntt(ctx);
        rows.push(row);

        power = power * gadget.bg() as u128 % q as u128;
    }
    rows
}

/// Homomorphically evaluates σ_i on a ciphertext and switches back to s.
///
/// State machine: (any form) → coefficient form → permute → digit-decompose
/// → inner product with key rows in NTT → output in NTT form.
pub fn eval_auto(
    ct: &RlweCiphertext,
    index: usize,
    autokey: &AutoKey,
    ctx: &NttContext,
) -> RlweCiphertext {
    let n = ct.ring_dim();
    let q = ct.modulus();
    debug_assert_eq!(autokey.ring_dim(), n, "key dimension mismatch");
    debug_assert_eq!(autokey.modulus(), q, "key modulus mismatch");

    if index == 1 {
        let mut out = ct.clone();
        out.to_ntt(ctx);
        return out;
    }

    let mut input = ct.clone();
    input.to_coeff(ctx);

    let permuted_b = apply_automorphism(&input.b, index);
    let permuted_a = apply_automorphism(&input.a, index);

    let rows = autokey.rows(index);
    let digits = decompose(&permuted_a, &autokey.gadget);

    let mut result_b = permuted_b.to_ntt_new(ctx);
    let mut result_a = Poly::zero(n, q).to_ntt_new(ctx);

    for (digit, row) in digits.iter().zip(rows) {
        let d = digit.to_ntt_new(ctx);
        result_b += &d.mul_ntt_domain(&row.b, ctx);
        result_a += &d.mul_ntt_domain(&row.a, ctx);
    }

    RlweCiphertext::from_parts(result_b, result_a)
}
