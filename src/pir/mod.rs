//! The PIR protocol surface.
//!
//! A server preprocesses its N × N/2 database once (`preprocess_database`).
//! A client builds an RNS query for one column (`query_bsgs_rns`), an RGSW
//! selector for the packed copy (`RgswCiphertext::encrypt_monomial`), and
//! the switching keys. The server folds the row dimension with the BSGS
//! core (`matrix_vector_mul_bsgs_rns_crt_large`), the copy dimension with
//! external products, packs the outputs (`pack_rlwes`) and returns one
//! ciphertext; the client decrypts with `decrypt_bsgs` /
//! `decrypt_bsgs_total`.
//!
//! `PirContext` bundles the per-parameter-set derived state (NTT contexts,
//! CRT lifts, the query encoding) that both sides share.

mod database;
mod pack;
mod query;
mod respond;

pub use database::{database_to_bsgs_ntt, preprocess_database, DatabaseBuffer};
pub use pack::pack_rlwes;
pub use query::{
    decrypt_bsgs, decrypt_bsgs_single, decrypt_bsgs_total, query_bsgs, query_bsgs_rns,
    rotation_index, QueryEncoding,
};
pub use respond::{
    compute_permutation_matrix, matrix_vector_mul, matrix_vector_mul_bsgs,
    matrix_vector_mul_bsgs_rns_crt, matrix_vector_mul_bsgs_rns_crt_large, PermutationMatrix,
};

use eyre::Result;
use tracing::info;

use crate::math::{CrtContext, NttContext};
use crate::params::ParameterSet;

/// Derived per-parameter-set state, built once and shared by client and
/// server code paths.
pub struct PirContext {
    /// The parameter record.
    pub params: ParameterSet,
    /// Slot permutation tables of the query encoding.
    pub encoding: QueryEncoding,
    /// NTT over the composite primary modulus.
    pub ctx_crt: NttContext,
    /// NTT over the baby-step modulus.
    pub ctx_bs: NttContext,
    /// NTT over the legacy single-modulus prime.
    pub ctx_big: NttContext,
    /// CRT compose for the (q1, q2) pair.
    pub lift_q12: CrtContext,
    /// CRT lift across (crt_mod, bs_mod).
    pub lift_crt_bs: CrtContext,
}

impl PirContext {
    /// Builds the derived state for a parameter set.
    pub fn new(params: ParameterSet) -> Result<Self> {
        params.validate(1, 1)?;

        let encoding = QueryEncoding::new(params.n);
        let ctx_crt = NttContext::for_composite(params.n, params.crt_q1, params.crt_q2);
        let ctx_bs = NttContext::new(params.n, params.bs_mod);
        let ctx_big = NttContext::new(params.n, params.big_mod);
        let lift_q12 = CrtContext::new(params.crt_q1, params.crt_q2);
        let lift_crt_bs = CrtContext::new(params.crt_mod, params.bs_mod);

        info!(n = params.n, p = params.bsgs_p, "PIR context ready");
        Ok(Self {
            params,
            encoding,
            ctx_crt,
            ctx_bs,
            ctx_big,
            lift_q12,
            lift_crt_bs,
        })
    }

    /// Sizes the global worker pool from the parameter set's thread knob.
    /// Call once at startup; later calls are no-ops.
    pub fn init_thread_pool(&self) {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.threads)
            .build_global();
    }
}
