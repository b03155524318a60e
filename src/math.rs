//! Big integer helpers.

use core::mem;

use num_bigint::Sign::Plus;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use zeroize::Zeroize;

/// Calculates the [modular multiplicative
/// inverse](https://en.wikipedia.org/wiki/Modular_multiplicative_inverse)
/// of `a` modulo `m` with the extended Euclidean algorithm.
///
/// Returns `None` if `m` is zero or `a` and `m` are not coprime.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }

    let modulus = BigInt::from_biguint(Plus, m.clone());
    let mut old_r = BigInt::from_biguint(Plus, a % m);
    let mut r = modulus.clone();
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    // invariant: old_s * a ≡ old_r (mod m) and s * a ≡ r (mod m)
    while !r.is_zero() {
        let quotient = &old_r / &r;

        let next_r = &old_r - &quotient * &r;
        old_r = mem::replace(&mut r, next_r);

        let next_s = &old_s - &quotient * &s;
        old_s = mem::replace(&mut s, next_s);
    }

    let inverse = if old_r.is_one() {
        old_s.mod_floor(&modulus).to_biguint()
    } else {
        None
    };

    old_s.zeroize();
    s.zeroize();
    old_r.zeroize();
    inverse
}
