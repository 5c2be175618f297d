//! RNS automorphism switching keys for the BSGS core.
//!
//! An `AutoKeyBsgsRns` carries two index families over the (crt_mod,
//! bs_mod) residue pair:
//!
//! - `BabyStep`: indices 5^j mod 2N for j = 1..=N1/2. Rotations beyond
//!   N1/2 are composed as σ_{5^{N1/2}} applied to an earlier rotation, so
//!   every baby rotation costs at most two key switches.
//! - `GiantStep`: indices 5^{N1·g} mod 2N for g = 1..N2.
//!
//! Key material for an index is ℓ rows per modulus, all encrypting the
//! same σ_i(s)·z_k with a shared error so the digit stream produced by the
//! CRT decomposition is valid for both residues at once.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::modular::mod_pow;
use crate::math::{decompose_rns, CrtContext, ErrorSampler, NttContext, Poly};
use crate::params::{GadgetConfig, ParameterSet};
use crate::rlwe::{apply_automorphism, RlweCiphertext, RnsRlweCiphertext, Secret};

/// Which index family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepFamily {
    BabyStep,
    GiantStep,
}

/// Key material for one automorphism index: ℓ rows per residue, NTT form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RnsKeyMaterial {
    pub crt_rows: Vec<RlweCiphertext>,
    pub bs_rows: Vec<RlweCiphertext>,
}

/// Two-family switching-key table for the RNS BSGS core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutoKeyBsgsRns {
    baby: HashMap<usize, RnsKeyMaterial>,
    giant: HashMap<usize, RnsKeyMaterial>,
    /// Gadget configuration against the crt_mod * bs_mod lift.
    pub gadget: GadgetConfig,
    n: usize,
    crt_mod: u64,
    bs_mod: u64,
}

impl AutoKeyBsgsRns {
    /// Creates an empty table.
    pub fn new(params: &ParameterSet) -> Self {
        Self {
            baby: HashMap::new(),
            giant: HashMap::new(),
            gadget: params.ks_gadget,
            n: params.n,
            crt_mod: params.crt_mod,
            bs_mod: params.bs_mod,
        }
    }

    /// Generates key material for the given indices in one family.
    pub fn keygen<R: Rng>(
        &mut self,
        secret: &Secret,
        indices: &[usize],
        family: StepFamily,
        ctx_crt: &NttContext,
        ctx_bs: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) {
        debug_assert_eq!(secret.ring_dim(), self.n, "secret dimension mismatch");

        for &index in indices {
            let material = self.gen_index(secret, index, ctx_crt, ctx_bs, sampler, rng);
            match family {
                StepFamily::BabyStep => self.baby.insert(index, material),
                StepFamily::GiantStep => self.giant.insert(index, material),
            };
        }
    }

    /// Generates the full BSGS schedule for baby-step size `n1`:
    /// baby indices 5^j (j = 1..=N1/2) and giant indices 5^{N1·g}
    /// (g = 1..N2) with N2 = N/2/N1.
    pub fn bsgs_keygen<R: Rng>(
        &mut self,
        secret: &Secret,
        n1: usize,
        ctx_crt: &NttContext,
        ctx_bs: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) {
        let two_n = 2 * self.n as u64;
        let n2 = self.n / 2 / n1;

        let baby: Vec<usize> = (1..=n1 / 2)
            .map(|j| mod_pow(5, j as u64, two_n) as usize)
            .collect();
        self.keygen(secret, &baby, StepFamily::BabyStep, ctx_crt, ctx_bs, sampler, rng);

        let giant: Vec<usize> = (1..n2)
            .map(|g| mod_pow(5, (n1 * g) as u64, two_n) as usize)
            .collect();
        self.keygen(secret, &giant, StepFamily::GiantStep, ctx_crt, ctx_bs, sampler, rng);
    }

    fn gen_index<R: Rng>(
        &self,
        secret: &Secret,
        index: usize,
        ctx_crt: &NttContext,
        ctx_bs: &NttContext,
        sampler: &mut ErrorSampler,
        rng: &mut R,
    ) -> RnsKeyMaterial {
        let n = self.n;
        let ell = self.gadget.ell;

        // Shared per-row errors keep the two residues CRT-consistent.
        let errors: Vec<Vec<i64>> = (0..ell)
            .map(|_| (0..n).map(|_| sampler.sample()).collect())
            .collect();

        let build = |q: u64, ctx: &NttContext, rng: &mut R| -> Vec<RlweCiphertext> {
            let s = secret.poly_mod(q);
            let sigma_s = apply_automorphism(&s, index);

            let mut rows = Vec::with_capacity(ell);
            let mut power = (1u128 << self.gadget.base_bits) % q as u128;
            for e_signed in &errors {
                let a = Poly::random(n, q, rng);
                let e = Poly::from_coeffs(
                    e_signed
                        .iter()
                        .map(|&v| crate::math::modular::from_signed(v, q))
                        .collect(),
                    q,
                );
                let b = &(&(-a.mul_ntt(&s, ctx)) + &e) + &sigma_s.scalar_mul(power as u64);

                let mut row = RlweCiphertext::from_parts(b, a);
                row.to_ntt(ctx);
                rows.push(row);

                power = power * self.gadget.bg() as u128 % q as u128;
            }
            rows
        };

        RnsKeyMaterial {
            crt_rows: build(self.crt_mod, ctx_crt, rng),
            bs_rows: build(self.bs_mod, ctx_bs, rng),
        }
    }

    /// Key material for one index.
    ///
    /// # Panics
    ///
    /// Panics if no key exists for `index` in `family`.
    pub fn material(&self, index: usize, family: StepFamily) -> &RnsKeyMaterial {
        let table = match family {
            StepFamily::BabyStep => &self.baby,
            StepFamily::GiantStep => &self.giant,
        };
        table
            .get(&index)
            .unwrap_or_else(|| panic!("no {family:?} switching key for index {index}"))
    }

    /// Ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.n
    }
}

/// Homomorphically evaluates σ_i on an RNS ciphertext pair and switches
/// back to s, running both residues in lockstep.
///
/// The digit stream is produced once from the CRT lift of the permuted `a`
/// components and multiplies the key rows of each residue. Output pair is
/// in NTT form.
pub fn eval_auto_rns(
    ct: &RnsRlweCiphertext,
    index: usize,
    family: StepFamily,
    autokey: &AutoKeyBsgsRns,
    ctx_crt: &NttContext,
    ctx_bs: &NttContext,
    lift: &CrtContext,
) -> RnsRlweCiphertext {
    let n = ct.ring_dim();
    debug_assert_eq!(autokey.ring_dim(), n, "key dimension mismatch");

    if index == 1 {
        let mut out = ct.clone();
        out.crt.to_ntt(ctx_crt);
        out.bs.to_ntt(ctx_bs);
        return out;
    }

    let mut crt_ct = ct.crt.clone();
    let mut bs_ct = ct.bs.clone();
    crt_ct.to_coeff(ctx_crt);
    bs_ct.to_coeff(ctx_bs);

    let perm_b_crt = apply_automorphism(&crt_ct.b, index);
    let perm_a_crt = apply_automorphism(&crt_ct.a, index);
    let perm_b_bs = apply_automorphism(&bs_ct.b, index);
    let perm_a_bs = apply_automorphism(&bs_ct.a, index);

    let (digits_crt, digits_bs) = decompose_rns(
        perm_a_crt.values(),
        perm_a_bs.values(),
        lift,
        &autokey.gadget,
    );

    let material = autokey.material(index, family);

    let inner = |perm_b: Poly,
                 digits: &[Poly],
                 rows: &[RlweCiphertext],
                 ctx: &NttContext|
     -> RlweCiphertext {
        let q = perm_b.modulus();
        let mut result_b = perm_b.to_ntt_new(ctx);
        let mut result_a = Poly::zero(n, q).to_ntt_new(ctx);

        for (digit, row) in digits.iter().zip(rows) {
            let d = digit.to_ntt_new(ctx);
            result_b += &d.mul_ntt_domain(&row.b, ctx);
            result_a += &d.mul_ntt_domain(&row.a, ctx);
        }
        RlweCiphertext::from_parts(result_b, result_a)
    };

    RnsRlweCiphertext {
        crt: inner(perm_b_crt, &digits_crt, &material.crt_rows, ctx_crt),
        bs: inner(perm_b_bs, &digits_bs, &material.bs_rows, ctx_bs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rlwe::encrypt_rns_bsgs;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        params: ParameterSet,
        ctx_crt: NttContext,
        ctx_bs: NttContext,
        lift: CrtContext,
        sampler: ErrorSampler,
        rng: ChaCha20Rng,
        secret: Secret,
    }

    fn fixture(seed: u64) -> Fixture {
        let params = ParameterSet::n256();
        let ctx_crt = NttContext::for_composite(params.n, params.crt_q1, params.crt_q2);
        let ctx_bs = NttContext::new(params.n, params.bs_mod);
        let lift = CrtContext::new(params.crt_mod, params.bs_mod);
        let mut sampler = ErrorSampler::with_seed(seed);
        let rng = ChaCha20Rng::seed_from_u64(seed + 1);
        let secret = Secret::new(params.n, params.crt_mod, &mut sampler);
        Fixture {
            params,
            ctx_crt,
            ctx_bs,
            lift,
            sampler,
            rng,
            secret,
        }
    }

    #[test]
    fn test_bsgs_keygen_index_families() {
        let mut f = fixture(51);
        let n1 = 16;
        let two_n = 2 * f.params.n;

        let mut autokey = AutoKeyBsgsRns::new(&f.params);
        autokey.bsgs_keygen(
            &f.secret, n1, &f.ctx_crt, &f.ctx_bs, &mut f.sampler, &mut f.rng,
        );

        // Baby: 5^1 .. 5^{N1/2}; giant: 5^{N1} .. 5^{N1(N2-1)}.
        let baby_1 = mod_pow(5, 1, two_n as u64) as usize;
        let baby_last = mod_pow(5, (n1 / 2) as u64, two_n as u64) as usize;
        let giant_1 = mod_pow(5, n1 as u64, two_n as u64) as usize;
        assert!(autokey.baby.contains_key(&baby_1));
        assert!(autokey.baby.contains_key(&baby_last));
        assert!(autokey.giant.contains_key(&giant_1));
        assert_eq!(autokey.baby.len(), n1 / 2);
        assert_eq!(autokey.giant.len(), f.params.n / 2 / n1 - 1);
    }

    #[test]
    fn test_eval_auto_rns_decrypts_to_permuted_message() {
        let mut f = fixture(53);
        let index = 5usize;

        let mut autokey = AutoKeyBsgsRns::new(&f.params);
        autokey.keygen(
            &f.secret,
            &[index],
            StepFamily::BabyStep,
            &f.ctx_crt,
            &f.ctx_bs,
            &mut f.sampler,
            &mut f.rng,
        );

        let msg = Poly::from_coeffs(
            (0..f.params.n as u64).map(|i| i % 50).collect(),
            f.params.crt_mod,
        );
        let ct = encrypt_rns_bsgs(
            &f.params, &f.secret, &msg, &f.ctx_crt, &f.ctx_bs, &mut f.sampler, &mut f.rng,
        );

        let switched = eval_auto_rns(
            &ct, index, StepFamily::BabyStep, &autokey, &f.ctx_crt, &f.ctx_bs, &f.lift,
        );

        let mut crt_out = switched.crt.clone();
        crt_out.to_coeff(&f.ctx_crt);
        let decrypted = crt_out.decrypt(
            &f.secret,
            f.params.bsgs_delta(),
            f.params.bsgs_p,
            &f.ctx_crt,
        );

        let msg_p = Poly::from_coeffs(
            (0..f.params.n as u64).map(|i| i % 50).collect(),
            f.params.bsgs_p,
        );
        let expected = apply_automorphism(&msg_p, index);
        for i in 0..f.params.n {
            assert_eq!(decrypted.coeff(i), expected.coeff(i), "mismatch at {i}");
        }
    }

    #[test]
    fn test_eval_preserves_rns_consistency() {
        // After a switch, the two residues still carry the same noise
        // integers, so a second switch with CRT digits stays correct.
        let mut f = fixture(55);
        let index = 5usize;
        let index2 = 25usize;

        let mut autokey = AutoKeyBsgsRns::new(&f.params);
        autokey.keygen(
            &f.secret,
            &[index, index2],
            StepFamily::BabyStep,
            &f.ctx_crt,
            &f.ctx_bs,
            &mut f.sampler,
            &mut f.rng,
        );

        let msg = Poly::from_coeffs(
            (0..f.params.n as u64).map(|i| (i * 7) % 50).collect(),
            f.params.crt_mod,
        );
        let ct = encrypt_rns_bsgs(
            &f.params, &f.secret, &msg, &f.ctx_crt, &f.ctx_bs, &mut f.sampler, &mut f.rng,
        );

        // σ_25 ∘ σ_5 = σ_125.
        let first = eval_auto_rns(
            &ct, index, StepFamily::BabyStep, &autokey, &f.ctx_crt, &f.ctx_bs, &f.lift,
        );
        let second = eval_auto_rns(
            &first, index2, StepFamily::BabyStep, &autokey, &f.ctx_crt, &f.ctx_bs, &f.lift,
        );

        let mut crt_out = second.crt.clone();
        crt_out.to_coeff(&f.ctx_crt);
        let decrypted = crt_out.decrypt(
            &f.secret,
            f.params.bsgs_delta(),
            f.params.bsgs_p,
            &f.ctx_crt,
        );

        let msg_p = Poly::from_coeffs(
            (0..f.params.n as u64).map(|i| (i * 7) % 50).collect(),
            f.params.bsgs_p,
        );
        let expected = apply_automorphism(&msg_p, 125);
        for i in 0..f.params.n {
            assert_eq!(decrypted.coeff(i), expected.coeff(i), "mismatch at {i}");
        }
    }
}
