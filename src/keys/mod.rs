//! Automorphism switching keys.
//!
//! After applying σ_i to a ciphertext it is encrypted under σ_i(s); the
//! switching keys here (gadget-encrypted images of the secret) bring it
//! back under s. `AutoKey` serves the single-modulus paths (legacy BSGS,
//! response packing); `AutoKeyBsgsRns` carries the baby-step and giant-step
//! index families over the (crt_mod, bs_mod) residue pair.
//!
//! Keys are built once from a secret and immutable afterwards; the builder
//! borrows the secret only during generation.

mod autokey;
mod autokey_rns;

pub use autokey::{eval_auto, AutoKey};
pub use autokey_rns::{eval_auto_rns, AutoKeyBsgsRns, RnsKeyMaterial, StepFamily};
