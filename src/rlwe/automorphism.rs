//! Automorphisms of R_q = Z_q[X]/(X^N + 1).
//!
//! The automorphism σ_i maps X to X^i for odd i coprime to 2N. On
//! coefficients it is the permutation j -> j·i mod 2N with a sign flip when
//! the image wraps past N, since X^N = -1.
//!
//! Applying σ_i to a ciphertext re-encrypts it under σ_i(s); a switching
//! key (see `keys`) is required to return to the original secret.

use crate::math::modular::{mod_add, mod_sub};
use crate::math::Poly;

use super::types::RlweCiphertext;

/// Applies σ_i to a coefficient-form polynomial.
///
/// # Panics
///
/// Debug-asserts that the polynomial is in coefficient form and that `i`
/// is a valid automorphism index.
pub fn apply_automorphism(poly: &Poly, index: usize) -> Poly {
    debug_assert!(!poly.is_ntt(), "automorphism requires coefficient form");
    let n = poly.dimension();
    debug_assert!(is_valid_index(index, n), "invalid automorphism index {index}");

    let q = poly.modulus();
    let two_n = 2 * n;

    let mut result = vec![0u64; n];
    for j in 0..n {
        let coeff = poly.coeff(j);
        if coeff == 0 {
            continue;
        }

        let image = (index * j) % two_n;
        if image < n {
            result[image] = mod_add(result[image], coeff, q);
        } else {
            let wrapped = image - n;
            result[wrapped] = mod_sub(result[wrapped], coeff, q);
        }
    }

    Poly::from_coeffs(result, q)
}

/// Applies σ_i to both components of a ciphertext.
///
/// The result is encrypted under σ_i(s); key-switch to get back under s.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, index: usize) -> RlweCiphertext {
    RlweCiphertext {
        b: apply_automorphism(&ct.b, index),
        a: apply_automorphism(&ct.a, index),
    }
}

/// True if `i` is odd (N a power of two, so odd implies coprime to 2N) and
/// in range.
pub fn is_valid_index(index: usize, n: usize) -> bool {
    index % 2 == 1 && index < 2 * n
}

/// σ_{i1} ∘ σ_{i2} = σ_{i1·i2 mod 2N}.
pub fn compose_indices(i1: usize, i2: usize, n: usize) -> usize {
    (i1 * i2) % (2 * n)
}

/// The index of σ_i^{-1}, i.e. i^{-1} mod 2N.
pub fn inverse_index(index: usize, n: usize) -> usize {
    let two_n = 2 * n;
    // The odd residues mod 2^k form a group of order 2^(k-1), so
    // i^(order - 1) is the inverse.
    let mut result = 1usize;
    let mut base = index % two_n;
    let mut exp = n - 1; // group order 2N/2 = N, inverse exponent N - 1
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % two_n;
        }
        base = base * base % two_n;
        exp >>= 1;
    }
    debug_assert_eq!(result * index % two_n, 1, "inverse index computation failed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;

    fn sample_poly(n: usize, q: u64) -> Poly {
        Poly::from_coeffs((0..n as u64).map(|i| (i * 17 + 5) % 1000).collect(), q)
    }

    #[test]
    fn test_identity_automorphism() {
        let params = ParameterSet::n256();
        let poly = sample_poly(params.n, params.crt_mod);
        assert_eq!(apply_automorphism(&poly, 1), poly);
    }

    #[test]
    fn test_composition() {
        let params = ParameterSet::n256();
        let n = params.n;
        let poly = sample_poly(n, params.crt_mod);

        let step = apply_automorphism(&apply_automorphism(&poly, 5), 25);
        let direct = apply_automorphism(&poly, compose_indices(5, 25, n));
        assert_eq!(step, direct);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let params = ParameterSet::n256();
        let n = params.n;
        let poly = sample_poly(n, params.crt_mod);

        for index in [3usize, 5, 2 * n - 1, 125] {
            let inv = inverse_index(index, n);
            let back = apply_automorphism(&apply_automorphism(&poly, index), inv);
            assert_eq!(back, poly, "inverse of index {index} failed");
        }
    }

    #[test]
    fn test_negation_automorphism() {
        // σ_{2N-1}(X) = X^{-1} = -X^{N-1}.
        let params = ParameterSet::n256();
        let n = params.n;
        let q = params.crt_mod;

        let x = Poly::monomial(1, 1, n, q);
        let image = apply_automorphism(&x, 2 * n - 1);

        assert_eq!(image.coeff(n - 1), q - 1);
        for i in 0..n - 1 {
            assert_eq!(image.coeff(i), 0);
        }
    }

    #[test]
    fn test_linearity() {
        let params = ParameterSet::n256();
        let n = params.n;
        let q = params.crt_mod;
        let p1 = sample_poly(n, q);
        let p2 = Poly::from_coeffs((0..n as u64).map(|i| (i * 13 + 3) % 997).collect(), q);

        let sum_then_auto = apply_automorphism(&(&p1 + &p2), 5);
        let auto_then_sum = &apply_automorphism(&p1, 5) + &apply_automorphism(&p2, 5);
        assert_eq!(sum_then_auto, auto_then_sum);
    }

    #[test]
    fn test_valid_indices() {
        let n = 256;
        assert!(is_valid_index(1, n));
        assert!(is_valid_index(5, n));
        assert!(is_valid_index(2 * n - 1, n));
        assert!(!is_valid_index(2, n));
        assert!(!is_valid_index(2 * n + 1, n));
    }
}
