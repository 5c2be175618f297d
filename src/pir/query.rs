//! Query encoding, query generation and client-side decryption.
//!
//! The query encoder maps a database column u to the pair of NTT slots
//! whose exponents are ±5^u mod 2N. The encoding composes the 5^j orbit
//! walk with the bit reversal of the NTT's output order, computed once per
//! ring dimension and cached.
//!
//! Slot bookkeeping: NTT slot k holds the evaluation at psi^(2·br(k)+1).
//! The odd exponents split into the two orbits {5^t} and {-5^t} of the
//! subgroup generated by 5; orbit position t addresses database rows t
//! (positive orbit) and N-1-t (negative orbit).

use rand::Rng;

use crate::math::modular::{div_round, mod_pow, to_signed};
use crate::math::{ErrorSampler, NttContext, Poly};
use crate::params::ParameterSet;
use crate::rlwe::{RlweCiphertext, RnsRlweCiphertext, Secret};

/// Cached slot-permutation tables for one ring dimension.
#[derive(Clone, Debug)]
pub struct QueryEncoding {
    /// Ring dimension N.
    n: usize,
    /// encode[i]: slot index of exponent 5^i (i < N/2) or -5^(i-N/2).
    encode: Vec<usize>,
    /// orbit_pos[slot]: the orbit position t of the slot's exponent.
    orbit_pos: Vec<usize>,
    /// negative[slot]: true if the slot's exponent lies in the -5^t orbit.
    negative: Vec<bool>,
}

impl QueryEncoding {
    /// Builds the tables for ring dimension `n`.
    pub fn new(n: usize) -> Self {
        debug_assert!(n.is_power_of_two());
        let two_n = 2 * n as u64;
        let log_n = n.trailing_zeros();
        let bit_reverse = |v: u64| -> usize {
            ((v as u32).reverse_bits() >> (32 - log_n)) as usize
        };

        let mut encode = vec![0usize; n];
        let mut orbit_pos = vec![0usize; n];
        let mut negative = vec![false; n];

        let mut power = 1u64; // 5^t mod 2N
        for t in 0..n / 2 {
            let plus_slot = bit_reverse((power - 1) / 2);
            let minus_slot = bit_reverse((two_n - power - 1) / 2);

            encode[t] = plus_slot;
            encode[t + n / 2] = minus_slot;
            orbit_pos[plus_slot] = t;
            orbit_pos[minus_slot] = t;
            negative[minus_slot] = true;

            power = power * 5 % two_n;
        }

        Self {
            n,
            encode,
            orbit_pos,
            negative,
        }
    }

    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.n
    }

    /// Slot index of exponent 5^t.
    pub fn slot_plus(&self, t: usize) -> usize {
        self.encode[t % (self.n / 2)]
    }

    /// Slot index of exponent -5^t.
    pub fn slot_minus(&self, t: usize) -> usize {
        self.encode[t % (self.n / 2) + self.n / 2]
    }

    /// Orbit position t of a slot's exponent.
    pub fn orbit_pos(&self, slot: usize) -> usize {
        self.orbit_pos[slot]
    }

    /// Whether the slot's exponent is in the negative orbit.
    pub fn is_negative_orbit(&self, slot: usize) -> bool {
        self.negative[slot]
    }

    /// The database row a slot decodes to: t for the positive orbit,
    /// N-1-t for the negative one.
    pub fn row_of_slot(&self, slot: usize) -> usize {
        let t = self.orbit_pos[slot];
        if self.negative[slot] {
            self.n - 1 - t
        } else {
            t
        }
    }

    /// The slot a database row decodes from; inverse of
    /// [`row_of_slot`](Self::row_of_slot).
    pub fn slot_of_row(&self, row: usize) -> usize {
        if row < self.n / 2 {
            self.slot_plus(row)
        } else {
            self.slot_minus(self.n - 1 - row)
        }
    }

    /// Applies the column-side pre-permutation: value for row `row` is
    /// placed at the slot it will decode from.
    pub fn inverse_encode(&self, column: &[u64]) -> Vec<u64> {
        debug_assert_eq!(column.len(), self.n);
        let mut out = vec![0u64; self.n];
        for (row, &v) in column.iter().enumerate() {
            out[self.slot_of_row(row)] = v;
        }
        out
    }
}

/// Builds the one-hot slot message for column `u` scaled by `scale`,
/// returned in coefficient form: INTT(scale · (1_{5^u} + 1_{-5^u})).
fn one_hot_message(encoding: &QueryEncoding, u: usize, scale: u64, ctx: &NttContext) -> Poly {
    let n = encoding.ring_dim();
    let mut slots = vec![0u64; n];
    slots[encoding.slot_plus(u)] = scale;
    slots[encoding.slot_minus(u)] = scale;

    let mut message = Poly::from_ntt_values(slots, ctx.modulus());
    message.to_coeff(ctx);
    message
}

/// Builds the RNS query for column `u`.
///
/// The joint plaintext is (Δ·bs_mod)·one_hot(u) at modulus
/// crt_mod·bs_mod, so the crt component encrypts (Δ·bs_mod mod crt_mod)
/// times the one-hot message and the bs component encrypts zero; a shared
/// error keeps the pair CRT-consistent. The large joint scale is what lets
/// the final modulus switch divide the server-side noise by bs_mod.
pub fn query_bsgs_rns<R: Rng>(
    params: &ParameterSet,
    encoding: &QueryEncoding,
    secret: &Secret,
    u: usize,
    ctx_crt: &NttContext,
    ctx_bs: &NttContext,
    sampler: &mut ErrorSampler,
    rng: &mut R,
) -> RnsRlweCiphertext {
    debug_assert!(u < params.half_n(), "column index out of range");
    let n = params.n;

    let joint_scale =
        ((params.bsgs_delta() as u128 * params.bs_mod as u128) % params.crt_mod as u128) as u64;
    let message = one_hot_message(encoding, u, joint_scale, ctx_crt);

    let e_signed: Vec<i64> = (0..n).map(|_| sampler.sample()).collect();
    let embed = |q: u64| -> Poly {
        Poly::from_coeffs(
            e_signed
                .iter()
                .map(|&v| crate::math::modular::from_signed(v, q))
                .collect(),
            q,
        )
    };

    let s_crt = secret.poly_mod(params.crt_mod);
    let a_crt = Poly::random(n, params.crt_mod, rng);
    let b_crt = &(&(-a_crt.mul_ntt(&s_crt, ctx_crt)) + &embed(params.crt_mod)) + &message;

    let s_bs = secret.poly_mod(params.bs_mod);
    let a_bs = Poly::random(n, params.bs_mod, rng);
    let b_bs = &(-a_bs.mul_ntt(&s_bs, ctx_bs)) + &embed(params.bs_mod);

    RnsRlweCiphertext {
        crt: RlweCiphertext::from_parts(b_crt, a_crt),
        bs: RlweCiphertext::from_parts(b_bs, a_bs),
    }
}

/// Builds the legacy single-modulus query for column `u` over `big_mod`,
/// scaled by floor(big_mod / bsgs_p).
pub fn query_bsgs<R: Rng>(
    params: &ParameterSet,
    encoding: &QueryEncoding,
    secret: &Secret,
    u: usize,
    ctx_big: &NttContext,
    sampler: &mut ErrorSampler,
    rng: &mut R,
) -> RlweCiphertext {
    debug_assert!(u < params.half_n(), "column index out of range");
    let n = params.n;
    let q = params.big_mod;
    let delta = q / params.bsgs_p;

    let message = one_hot_message(encoding, u, delta, ctx_big);

    let s = secret.poly_mod(q);
    let a = Poly::random(n, q, rng);
    let e = Poly::sample_error(n, q, sampler);
    let b = &(&(-a.mul_ntt(&s, ctx_big)) + &e) + &message;

    RlweCiphertext::from_parts(b, a)
}

/// Rounds the phase of a ciphertext slot-wise by `delta` into Z_p.
fn round_slots(
    cipher: &RlweCiphertext,
    secret: &Secret,
    delta: u64,
    p: u64,
    ctx: &NttContext,
) -> Vec<u64> {
    let q = cipher.modulus();

    let mut ct = cipher.clone();
    ct.to_ntt(ctx);
    let s_ntt = secret.poly_mod(q).to_ntt_new(ctx);
    let mut phase = ct.a.mul_ntt_domain(&s_ntt, ctx);
    phase += &ct.b;

    phase
        .values()
        .iter()
        .map(|&v| {
            let rounded = div_round(to_signed(v, q) as i128, delta);
            rounded.rem_euclid(p as i128) as u64
        })
        .collect()
}

/// Decrypts a BSGS response (single ciphertext modulo `crt_mod`): rounds
/// the phase slot-wise by Δ and reads each database row from its slot.
pub fn decrypt_bsgs(
    params: &ParameterSet,
    encoding: &QueryEncoding,
    cipher: &RlweCiphertext,
    secret: &Secret,
    ctx_crt: &NttContext,
) -> Vec<u64> {
    let slots = round_slots(cipher, secret, params.bsgs_delta(), params.bsgs_p, ctx_crt);
    (0..params.n)
        .map(|row| slots[encoding.slot_of_row(row)])
        .collect()
}

/// Decrypts a legacy single-modulus BSGS response over `big_mod`.
pub fn decrypt_bsgs_single(
    params: &ParameterSet,
    encoding: &QueryEncoding,
    cipher: &RlweCiphertext,
    secret: &Secret,
    ctx_big: &NttContext,
) -> Vec<u64> {
    let delta = params.big_mod / params.bsgs_p;
    let slots = round_slots(cipher, secret, delta, params.bsgs_p, ctx_big);
    (0..params.n)
        .map(|row| slots[encoding.slot_of_row(row)])
        .collect()
}

/// Decrypts a packed response of `r` lanes. The packing transform already
/// normalizes its per-level halvings, so the payload is at unit scale;
/// `r` names the lane structure of the response.
pub fn decrypt_bsgs_total(
    params: &ParameterSet,
    encoding: &QueryEncoding,
    cipher: &RlweCiphertext,
    secret: &Secret,
    r: usize,
    ctx_crt: &NttContext,
) -> Vec<u64> {
    debug_assert!(r.is_power_of_two(), "lane count must be a power of two");
    let slots = round_slots(cipher, secret, params.bsgs_delta(), params.bsgs_p, ctx_crt);
    (0..params.n)
        .map(|row| slots[encoding.slot_of_row(row)])
        .collect()
}

/// 5^t mod 2N, the automorphism index of the t-th rotation.
pub fn rotation_index(t: usize, n: usize) -> usize {
    mod_pow(5, t as u64, 2 * n as u64) as usize
}
