//! RLWE (Ring Learning With Errors) encryption module
//!
//! Implements RLWE over the ring R_q = Z_q[X]/(X^N + 1):
//!
//! - Secret key s is a ternary polynomial shared across the protocol moduli
//! - Ciphertext (b, a) encrypts message m as b = -a·s + e + Δ·m
//! - The BSGS query uses an RNS pair of ciphertexts at (crt_mod, bs_mod)
//!
//! Automorphisms σ_i: X -> X^i permute coefficients (with sign flips past
//! N) and drive both the BSGS rotation schedule and response packing; after
//! an automorphism a ciphertext needs a key switch (see `keys`).

mod automorphism;
mod enc;
mod types;

pub use automorphism::{
    apply_automorphism, automorphism_ciphertext, compose_indices, inverse_index, is_valid_index,
};
pub use enc::encrypt_rns_bsgs;
pub use types::{RlweCiphertext, RnsRlweCiphertext, Secret};
