//! The BSGS matrix-vector core.
//!
//! Computes the encrypted product of the preprocessed database with the
//! encrypted one-hot query. A naive evaluation needs N/2 homomorphic
//! rotations of the query; the baby-step/giant-step split reduces this to
//! N1 + N2 - 2 with N1·N2 = N/2:
//!
//! - baby step: materialize the rotations σ_{5^j}(q) for j < N1. Only
//!   N1/2 switching keys exist; rotations past N1/2 are composed as
//!   σ_{5^{N1/2}} of an earlier rotation, so each costs at most two key
//!   switches;
//! - inner loop: for each giant block g, multiply-accumulate the N1 baby
//!   rotations against the block's pre-rotated diagonals, slot by slot, in
//!   lazy 128-bit arithmetic;
//! - giant step: apply σ_{5^{N1·g}} to block g's accumulator and sum.
//!
//! All inner sums stay in NTT form; only the giant-step automorphism
//! passes through coefficient form. The RNS variant runs both residues in
//! lockstep and modulus-switches the bs_mod residue away at the end.

use eyre::Result;
use rayon::prelude::*;
use tracing::debug;

use crate::keys::{eval_auto, eval_auto_rns, AutoKey, AutoKeyBsgsRns, RnsKeyMaterial, StepFamily};
use crate::math::{decompose, decompose_rns, CrtContext, NttContext, Poly};
use crate::modulus_switch::mod_switch;
use crate::rlwe::{RlweCiphertext, RnsRlweCiphertext};

use super::database::DatabaseBuffer;
use super::query::{rotation_index, QueryEncoding};
use super::PirContext;

/// Baby-step slot permutation schedule: row j maps output slot s to the
/// input slot that σ_{5^j} reads from.
#[derive(Clone, Debug)]
pub struct PermutationMatrix {
    rows: Vec<Vec<u32>>,
}

impl PermutationMatrix {
    /// Row for rotation j.
    #[inline]
    pub fn row(&self, j: usize) -> &[u32] {
        &self.rows[j]
    }

    /// Number of rotations covered (N1).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Precomputes the N1 × N baby-step permutation schedule.
///
/// σ_{5^j} moves the evaluation at exponent e to the slot whose exponent
/// is e·5^{-j}; in orbit coordinates the slot at position t reads from
/// position t + j of the same orbit half, so the inner loop can fetch
/// rotated slots by direct indexed copy.
pub fn compute_permutation_matrix(encoding: &QueryEncoding, n1: usize) -> PermutationMatrix {
    let n = encoding.ring_dim();
    let half = n / 2;

    let rows = (0..n1)
        .map(|j| {
            (0..n)
                .map(|s| {
                    let t = (encoding.orbit_pos(s) + j) % half;
                    let src = if encoding.is_negative_orbit(s) {
                        encoding.slot_minus(t)
                    } else {
                        encoding.slot_plus(t)
                    };
                    src as u32
                })
                .collect()
        })
        .collect();

    PermutationMatrix { rows }
}

#[inline]
fn permute_values(values: &[u64], perm: &[u32]) -> Vec<u64> {
    perm.iter().map(|&src| values[src as usize]).collect()
}

/// Applies σ to an NTT-form RNS pair by indexed copy, then key-switches
/// back under s using the CRT digit stream.
fn switch_permuted_rns(
    ct: &RnsRlweCiphertext,
    perm: &[u32],
    material: &RnsKeyMaterial,
    autokey: &AutoKeyBsgsRns,
    ctx_crt: &NttContext,
    ctx_bs: &NttContext,
    lift: &CrtContext,
) -> RnsRlweCiphertext {
    debug_assert!(ct.crt.is_ntt() && ct.bs.is_ntt(), "expected NTT form");
    let n = ct.ring_dim();

    let perm_b_crt = permute_values(ct.crt.b.values(), perm);
    let perm_a_crt = permute_values(ct.crt.a.values(), perm);
    let perm_b_bs = permute_values(ct.bs.b.values(), perm);
    let perm_a_bs = permute_values(ct.bs.a.values(), perm);

    // The digit decomposition needs σ(a) in coefficient form.
    let mut a_crt_coeff = Poly::from_ntt_values(perm_a_crt, ct.crt.modulus());
    a_crt_coeff.to_coeff(ctx_crt);
    let mut a_bs_coeff = Poly::from_ntt_values(perm_a_bs, ct.bs.modulus());
    a_bs_coeff.to_coeff(ctx_bs);

    let (digits_crt, digits_bs) = decompose_rns(
        a_crt_coeff.values(),
        a_bs_coeff.values(),
        lift,
        &autokey.gadget,
    );

    let inner = |perm_b: Vec<u64>,
                 q: u64,
                 digits: &[Poly],
                 rows: &[RlweCiphertext],
                 ctx: &NttContext|
     -> RlweCiphertext {
        let mut result_b = Poly::from_ntt_values(perm_b, q);
        let mut result_a = Poly::zero(n, q).to_ntt_new(ctx);
        for (digit, row) in digits.iter().zip(rows) {
            let d = digit.to_ntt_new(ctx);
            result_b += &d.mul_ntt_domain(&row.b, ctx);
            result_a += &d.mul_ntt_domain(&row.a, ctx);
        }
        RlweCiphertext::from_parts(result_b, result_a)
    };

    RnsRlweCiphertext {
        crt: inner(
            perm_b_crt,
            ct.crt.modulus(),
            &digits_crt,
            &material.crt_rows,
            ctx_crt,
        ),
        bs: inner(
            perm_b_bs,
            ct.bs.modulus(),
            &digits_bs,
            &material.bs_rows,
            ctx_bs,
        ),
    }
}

/// Materializes the N1 baby-step rotations of the query, NTT form.
fn baby_rotations_rns(
    query: &RnsRlweCiphertext,
    autokey: &AutoKeyBsgsRns,
    n1: usize,
    permutations: &PermutationMatrix,
    srv: &PirContext,
) -> Vec<RnsRlweCiphertext> {
    let n = query.ring_dim();
    let mut rotated = Vec::with_capacity(n1);

    let mut base = query.clone();
    base.crt.to_ntt(&srv.ctx_crt);
    base.bs.to_ntt(&srv.ctx_bs);
    rotated.push(base);

    let hop = n1 / 2;
    for j in 1..n1 {
        let (source, steps) = if j <= hop { (0, j) } else { (j - hop, hop) };
        let index = rotation_index(steps, n);
        let material = autokey.material(index, StepFamily::BabyStep);
        let next = switch_permuted_rns(
            &rotated[source],
            permutations.row(steps),
            material,
            autokey,
            &srv.ctx_crt,
            &srv.ctx_bs,
            &srv.lift_crt_bs,
        );
        rotated.push(next);
    }
    rotated
}

/// Per-rotation residue planes, computed once so the inner loop does no
/// modular reductions on the query side.
struct BabyPlanes {
    b1: Vec<u64>,
    b2: Vec<u64>,
    a1: Vec<u64>,
    a2: Vec<u64>,
    b_bs: Vec<u64>,
    a_bs: Vec<u64>,
}

impl BabyPlanes {
    fn new(ct: &RnsRlweCiphertext, q1: u64, q2: u64) -> Self {
        let split = |v: &[u64], m: u64| -> Vec<u64> { v.iter().map(|&x| x % m).collect() };
        Self {
            b1: split(ct.crt.b.values(), q1),
            b2: split(ct.crt.b.values(), q2),
            a1: split(ct.crt.a.values(), q1),
            a2: split(ct.crt.a.values(), q2),
            b_bs: ct.bs.b.values().to_vec(),
            a_bs: ct.bs.a.values().to_vec(),
        }
    }
}

/// One giant block's inner multiply-accumulate over the baby rotations.
fn accumulate_block(
    db: &DatabaseBuffer,
    copy: usize,
    block: usize,
    planes: &[BabyPlanes],
    srv: &PirContext,
) -> RnsRlweCiphertext {
    let n = db.ring_dim();
    let n1 = db.n1();
    let (q1, q2) = (srv.params.crt_q1, srv.params.crt_q2);
    let bs = srv.params.bs_mod;

    let mut acc_b1 = vec![0u128; n];
    let mut acc_b2 = vec![0u128; n];
    let mut acc_a1 = vec![0u128; n];
    let mut acc_a2 = vec![0u128; n];
    let mut acc_b_bs = vec![0u64; n];
    let mut acc_a_bs = vec![0u64; n];

    for (r, plane) in planes.iter().enumerate().take(n1) {
        for s in 0..n {
            let (d1, d2) = db.slot(copy, block, r, s);
            acc_b1[s] += plane.b1[s] as u128 * d1 as u128;
            acc_a1[s] += plane.a1[s] as u128 * d1 as u128;
            acc_b2[s] += plane.b2[s] as u128 * d2 as u128;
            acc_a2[s] += plane.a2[s] as u128 * d2 as u128;

            let signed = db.slot_signed(copy, block, r, s);
            let d_bs = if signed < 0 {
                bs - signed.unsigned_abs()
            } else {
                signed as u64
            };
            acc_b_bs[s] = (acc_b_bs[s] + plane.b_bs[s] * d_bs % bs) % bs;
            acc_a_bs[s] = (acc_a_bs[s] + plane.a_bs[s] * d_bs % bs) % bs;
        }
    }

    let compose = |acc1: &[u128], acc2: &[u128]| -> Vec<u64> {
        acc1.iter()
            .zip(acc2)
            .map(|(&v1, &v2)| {
                srv.lift_q12
                    .compose((v1 % q1 as u128) as u64, (v2 % q2 as u128) as u64)
            })
            .collect()
    };

    let crt_mod = srv.params.crt_mod;
    RnsRlweCiphertext {
        crt: RlweCiphertext::from_parts(
            Poly::from_ntt_values(compose(&acc_b1, &acc_b2), crt_mod),
            Poly::from_ntt_values(compose(&acc_a1, &acc_a2), crt_mod),
        ),
        bs: RlweCiphertext::from_parts(
            Poly::from_ntt_values(acc_b_bs, bs),
            Poly::from_ntt_values(acc_a_bs, bs),
        ),
    }
}

/// The full two-level fold for one database copy: baby rotations, inner
/// accumulation per giant block (in parallel), giant-step automorphisms,
/// and the final modulus switch to crt_mod.
fn fold_one_copy(
    db: &DatabaseBuffer,
    copy: usize,
    planes: &[BabyPlanes],
    autokey: &AutoKeyBsgsRns,
    n1: usize,
    srv: &PirContext,
) -> RlweCiphertext {
    let n = db.ring_dim();
    let n2 = n / 2 / n1;
    let two_n = 2 * n as u64;

    let total = (0..n2)
        .into_par_iter()
        .map(|g| {
            let acc = accumulate_block(db, copy, g, planes, srv);
            if g == 0 {
                let mut out = acc;
                out.crt.to_ntt(&srv.ctx_crt);
                out.bs.to_ntt(&srv.ctx_bs);
                out
            } else {
                let index =
                    crate::math::modular::mod_pow(5, (n1 * g) as u64, two_n) as usize;
                eval_auto_rns(
                    &acc,
                    index,
                    StepFamily::GiantStep,
                    autokey,
                    &srv.ctx_crt,
                    &srv.ctx_bs,
                    &srv.lift_crt_bs,
                )
            }
        })
        .reduce_with(|mut a, b| {
            a.crt.add_assign(&b.crt);
            a.bs.add_assign(&b.bs);
            a
        })
        .expect("at least one giant block");

    mod_switch(&srv.params, &total, &srv.ctx_crt, &srv.ctx_bs, &srv.lift_crt_bs)
}

/// Runs the BSGS core over `r` packed database copies, returning one RLWE
/// ciphertext modulo crt_mod (coefficient form) per copy.
pub fn matrix_vector_mul_bsgs_rns_crt_large(
    query: &RnsRlweCiphertext,
    db: &DatabaseBuffer,
    autokey: &AutoKeyBsgsRns,
    n1: usize,
    permutations: &PermutationMatrix,
    r: usize,
    srv: &PirContext,
) -> Result<Vec<RlweCiphertext>> {
    srv.params.validate(n1, r)?;
    eyre::ensure!(db.n1() == n1, "database was preprocessed for N1 = {}", db.n1());
    eyre::ensure!(db.copies() >= r, "database holds {} copies", db.copies());
    eyre::ensure!(permutations.len() >= n1, "permutation matrix too small");

    let rotated = baby_rotations_rns(query, autokey, n1, permutations, srv);
    let planes: Vec<BabyPlanes> = rotated
        .iter()
        .map(|ct| BabyPlanes::new(ct, srv.params.crt_q1, srv.params.crt_q2))
        .collect();
    debug!(n1, r, "baby rotations materialized");

    Ok((0..r)
        .into_par_iter()
        .map(|copy| fold_one_copy(db, copy, &planes, autokey, n1, srv))
        .collect())
}

/// Single-copy convenience wrapper.
pub fn matrix_vector_mul_bsgs_rns_crt(
    query: &RnsRlweCiphertext,
    db: &DatabaseBuffer,
    autokey: &AutoKeyBsgsRns,
    n1: usize,
    permutations: &PermutationMatrix,
    srv: &PirContext,
) -> Result<RlweCiphertext> {
    Ok(matrix_vector_mul_bsgs_rns_crt_large(query, db, autokey, n1, permutations, 1, srv)?
        .remove(0))
}

/// Applies σ to a single-modulus NTT-form ciphertext by indexed copy and
/// key-switches back.
fn switch_permuted(
    ct: &RlweCiphertext,
    perm: &[u32],
    index: usize,
    autokey: &AutoKey,
    ctx: &NttContext,
) -> RlweCiphertext {
    debug_assert!(ct.is_ntt(), "expected NTT form");
    let n = ct.ring_dim();
    let q = ct.modulus();

    let perm_b = permute_values(ct.b.values(), perm);
    let perm_a = permute_values(ct.a.values(), perm);

    let mut a_coeff = Poly::from_ntt_values(perm_a, q);
    a_coeff.to_coeff(ctx);
    let digits = decompose(&a_coeff, &autokey.gadget);

    let mut result_b = Poly::from_ntt_values(perm_b, q);
    let mut result_a = Poly::zero(n, q).to_ntt_new(ctx);
    for (digit, row) in digits.iter().zip(autokey.rows(index)) {
        let d = digit.to_ntt_new(ctx);
        result_b += &d.mul_ntt_domain(&row.b, ctx);
        result_a += &d.mul_ntt_domain(&row.a, ctx);
    }

    RlweCiphertext::from_parts(result_b, result_a)
}

/// Legacy single-modulus BSGS fold over big_mod.
///
/// `rows` is the diagonal slot-value table from `database_to_bsgs_ntt`;
/// the autokey must hold the baby indices 5^j (j = 1..=N1/2) and giant
/// indices 5^{N1·g} (g = 1..N2).
pub fn matrix_vector_mul_bsgs(
    query: &RlweCiphertext,
    rows: &[Vec<u64>],
    autokey: &AutoKey,
    n1: usize,
    permutations: &PermutationMatrix,
    srv: &PirContext,
) -> Result<RlweCiphertext> {
    let n = srv.params.n;
    let q = srv.params.big_mod;
    srv.params.validate(n1, 1)?;
    eyre::ensure!(rows.len() == n / 2, "expected N/2 diagonal rows");

    let ctx = &srv.ctx_big;
    let n2 = n / 2 / n1;
    let two_n = 2 * n as u64;

    // Baby rotations, two-hop composed past N1/2.
    let mut rotated: Vec<RlweCiphertext> = Vec::with_capacity(n1);
    let mut base = query.clone();
    base.to_ntt(ctx);
    rotated.push(base);

    let hop = n1 / 2;
    for j in 1..n1 {
        let (source, steps) = if j <= hop { (0, j) } else { (j - hop, hop) };
        let index = rotation_index(steps, n);
        let next = switch_permuted(&rotated[source], permutations.row(steps), index, autokey, ctx);
        rotated.push(next);
    }

    let total = (0..n2)
        .into_par_iter()
        .map(|g| {
            let mut acc_b = vec![0u128; n];
            let mut acc_a = vec![0u128; n];
            for (r, rot) in rotated.iter().enumerate().take(n1) {
                let row = &rows[g * n1 + r];
                for s in 0..n {
                    acc_b[s] += rot.b.values()[s] as u128 * row[s] as u128;
                    acc_a[s] += rot.a.values()[s] as u128 * row[s] as u128;
                }
            }
            let reduce =
                |acc: Vec<u128>| -> Vec<u64> { acc.iter().map(|&v| (v % q as u128) as u64).collect() };
            let block = RlweCiphertext::from_parts(
                Poly::from_ntt_values(reduce(acc_b), q),
                Poly::from_ntt_values(reduce(acc_a), q),
            );

            if g == 0 {
                block
            } else {
                let index = crate::math::modular::mod_pow(5, (n1 * g) as u64, two_n) as usize;
                eval_auto(&block, index, autokey, ctx)
            }
        })
        .reduce_with(|mut a, b| {
            a.add_assign(&b);
            a
        })
        .expect("at least one giant block");

    Ok(total)
}

/// Plain diagonal matrix-vector product: N1 = 1 degenerates the fold to
/// one automorphism per diagonal. Reference oracle for the BSGS core.
pub fn matrix_vector_mul(
    query: &RlweCiphertext,
    rows: &[Vec<u64>],
    autokey: &AutoKey,
    srv: &PirContext,
) -> Result<RlweCiphertext> {
    let permutations = compute_permutation_matrix(&srv.encoding, 1);
    matrix_vector_mul_bsgs(query, rows, autokey, 1, &permutations, srv)
}
