//! Mathematical primitives for the BSGS PIR core.
//!
//! - **Modular arithmetic** over Z_q (u128-widening cold paths; the NTT
//!   kernel carries its own Montgomery constants)
//! - **Number-Theoretic Transform** for negacyclic polynomial multiplication
//! - **CRT** residue composition, including the 128-bit lift
//! - **Polynomial** container with an explicit coefficient/NTT form tag
//! - **Gadget decomposition** in single-modulus and RNS variants
//! - **Error sampling** for encryption
//!
//! All cryptographic layers (encryption, key switching, the BSGS response
//! path) are built on these primitives.

pub mod crt;
pub mod decompose;
pub mod modular;
pub mod ntt;
pub mod poly;
pub mod sampler;

pub use crt::CrtContext;
pub use decompose::{decompose, decompose_rns, reconstruct, reconstruct_rns};
pub use ntt::NttContext;
pub use poly::Poly;
pub use sampler::ErrorSampler;
