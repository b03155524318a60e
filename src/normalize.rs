//! Buffer width normalization and private key completion.
//!
//! Every function here returns fresh buffers and leaves its input alone.

use alloc::vec::Vec;

use num_bigint::BigUint;
use num_traits::One;
use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::math::mod_inverse;
use crate::params::{required, RsaParameters};

/// Drops one leading `0x00`, if present.
pub fn trim_leading_zero(buf: &[u8]) -> Vec<u8> {
    match buf.split_first() {
        Some((0, rest)) => rest.to_vec(),
        _ => buf.to_vec(),
    }
}

/// Strips every leading `0x00`.
pub fn trim_leading_zeros(buf: &[u8]) -> &[u8] {
    let start = buf.iter().position(|&b| b != 0).unwrap_or(buf.len());
    &buf[start..]
}

/// Prepends one `0x00` when the high bit of the first byte is set, so the
/// value cannot be mistaken for a negative two's complement integer, or
/// unconditionally when `always` is set.
pub fn prepend_leading_zero(buf: &[u8], always: bool) -> Vec<u8> {
    let needs_zero = always || buf.first().map_or(false, |&b| b & 0x80 != 0);
    if !needs_zero {
        return buf.to_vec();
    }

    let mut out = Vec::with_capacity(buf.len() + 1);
    out.push(0);
    out.extend_from_slice(buf);
    out
}

/// Moves `buf` one byte towards `len`: trims one leading zero when longer,
/// prepends one zero when shorter.
///
/// A single step is enough for values whose width differs from the target
/// only by a sign byte or one high zero byte. Anything else comes back with
/// the wrong width, which callers detect by checking the result.
pub fn trim_or_pad_to_length(buf: &[u8], len: usize) -> Vec<u8> {
    if buf.len() > len {
        trim_leading_zero(buf)
    } else if buf.len() < len {
        prepend_leading_zero(buf, true)
    } else {
        buf.to_vec()
    }
}

/// Derives `d`, `dp`, `dq` and `inverse_q` from `p`, `q`, the exponent and
/// the modulus.
///
/// `φ(n) = n - p - q + 1`, `d = e^-1 mod φ(n)`, `dp = d mod (p - 1)`,
/// `dq = d mod (q - 1)` and `inverse_q = q^-1 mod p`.
pub fn compute_full_private_key(params: &RsaParameters) -> Result<RsaParameters> {
    let n = BigUint::from_bytes_be(params.modulus()?);
    let e = BigUint::from_bytes_be(params.exponent()?);
    let mut p = BigUint::from_bytes_be(required(&params.p, "P")?);
    let mut q = BigUint::from_bytes_be(required(&params.q, "Q")?);

    let one = BigUint::one();
    if p <= one || q <= one {
        return Err(Error::invalid_argument("prime factors must be greater than 1"));
    }
    if &n + &one <= &p + &q {
        return Err(Error::invalid_argument(
            "modulus is inconsistent with its prime factors",
        ));
    }

    let mut phi = &n + &one - &p - &q;
    let mut d = mod_inverse(&e, &phi)
        .ok_or_else(|| Error::invalid_argument("exponent is not invertible modulo phi(n)"))?;
    let mut dp = &d % (&p - &one);
    let mut dq = &d % (&q - &one);
    let mut inverse_q = mod_inverse(&q, &p)
        .ok_or_else(|| Error::invalid_argument("Q is not invertible modulo P"))?;

    let full = RsaParameters {
        modulus: params.modulus.clone(),
        exponent: params.exponent.clone(),
        d: Some(d.to_bytes_be()),
        p: params.p.clone(),
        q: params.q.clone(),
        dp: Some(dp.to_bytes_be()),
        dq: Some(dq.to_bytes_be()),
        inverse_q: Some(inverse_q.to_bytes_be()),
    };

    for value in [&mut p, &mut q, &mut phi, &mut d, &mut dp, &mut dq, &mut inverse_q] {
        value.zeroize();
    }

    Ok(full)
}

/// Drops `d`, `dp`, `dq` and `inverse_q`, keeping the minimal `p`/`q`
/// private key.
pub fn strip_optional_private_data(params: &RsaParameters) -> RsaParameters {
    RsaParameters {
        modulus: params.modulus.clone(),
        exponent: params.exponent.clone(),
        d: None,
        p: params.p.clone(),
        q: params.q.clone(),
        dp: None,
        dq: None,
        inverse_q: None,
    }
}

/// Adjusts the private components towards the fixed widths of the CAPI
/// layout: `d` to the modulus length, every other private component to half
/// of it (rounded up).
///
/// This is best effort. Keys whose primes differ too much in length stay
/// incompatible; check the result with
/// [`is_capi_compatible`](crate::formats::capi::is_capi_compatible).
/// Public keys are returned unchanged.
pub fn negotiate_sizes(params: &RsaParameters) -> RsaParameters {
    if !params.has_private_key() {
        return params.clone();
    }

    let modulus = params
        .modulus
        .as_deref()
        .map(|modulus| trim_leading_zeros(modulus).to_vec());
    let modulus_len = modulus.as_ref().map_or(0, Vec::len);
    let half_len = (modulus_len + 1) / 2;

    let resize = |field: &Option<Vec<u8>>, len: usize| {
        field
            .as_deref()
            .map(|value| trim_or_pad_to_length(value, len))
    };

    let negotiated = RsaParameters {
        modulus,
        exponent: params.exponent.clone(),
        d: resize(&params.d, modulus_len),
        p: resize(&params.p, half_len),
        q: resize(&params.q, half_len),
        dp: resize(&params.dp, half_len),
        dq: resize(&params.dq, half_len),
        inverse_q: resize(&params.inverse_q, half_len),
    };

    tracing::trace!(modulus_len, half_len, "negotiated private component sizes");
    negotiated
}
