//! RGSW (Ring-GSW) encryption module
//!
//! An RGSW ciphertext is a 2ℓ × 2 matrix of ring elements encrypting a
//! small message w so that the external product
//! RLWE(m) ⊡ RGSW(w) → RLWE(m·w) can be evaluated as a digit inner
//! product. In the PIR protocol the query's RGSW encrypts the monomial
//! X^{-w} and selects the second database dimension.

mod external_product;
mod types;

pub use external_product::external_product;
pub use types::RgswCiphertext;
