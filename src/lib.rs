//! Private information retrieval with a two-dimensional BSGS query engine
//! over Ring-LWE.
//!
//! A client retrieves one record from a server-held N × N/2 database
//! without revealing which one. The server evaluates an encrypted
//! matrix-vector product between the client's one-hot query and the
//! NTT-domain database using a baby-step/giant-step automorphism schedule,
//! selects the packed copy with an RGSW external product, packs the
//! outputs into a single ciphertext and modulus-switches it down to the
//! primary modulus.
//!
//! Key components:
//! - `math`: modular arithmetic, the negacyclic NTT kernel, CRT lifts,
//!   gadget decomposition
//! - `rlwe` / `rgsw`: ciphertext types, encryption, automorphisms, the
//!   external product
//! - `keys`: automorphism switching keys (single-modulus and RNS BSGS
//!   families)
//! - `pir`: query encoding, database preprocessing, the BSGS response
//!   core, response packing

pub mod keys;
pub mod math;
pub mod modulus_switch;
pub mod params;
pub mod pir;
pub mod rgsw;
pub mod rlwe;

pub use keys::{eval_auto, eval_auto_rns, AutoKey, AutoKeyBsgsRns, StepFamily};
pub use modulus_switch::mod_switch;
pub use params::ParameterSet;
pub use pir::{
    compute_permutation_matrix, decrypt_bsgs, decrypt_bsgs_single, decrypt_bsgs_total,
    database_to_bsgs_ntt, matrix_vector_mul, matrix_vector_mul_bsgs,
    matrix_vector_mul_bsgs_rns_crt, matrix_vector_mul_bsgs_rns_crt_large, pack_rlwes,
    preprocess_database, query_bsgs, query_bsgs_rns, DatabaseBuffer, PirContext, QueryEncoding,
};
pub use rgsw::{external_product, RgswCiphertext};
pub use rlwe::{encrypt_rns_bsgs, RlweCiphertext, RnsRlweCiphertext, Secret};
