//! PKCS#1 RSA keys as defined in [RFC 8017 Appendix A.1].
//!
//! ```text
//! RSAPublicKey ::= SEQUENCE {
//!     modulus           INTEGER,  -- n
//!     publicExponent    INTEGER   -- e
//! }
//!
//! RSAPrivateKey ::= SEQUENCE {
//!     version           Version,
//!     modulus           INTEGER,  -- n
//!     publicExponent    INTEGER,  -- e
//!     privateExponent   INTEGER,  -- d
//!     prime1            INTEGER,  -- p
//!     prime2            INTEGER,  -- q
//!     exponent1         INTEGER,  -- d mod (p-1)
//!     exponent2         INTEGER,  -- d mod (q-1)
//!     coefficient       INTEGER   -- (inverse of q) mod p
//! }
//! ```
//!
//! Multi-prime keys (`otherPrimeInfos`) are not supported.
//!
//! [RFC 8017 Appendix A.1]: https://datatracker.ietf.org/doc/html/rfc8017#appendix-A.1

use alloc::vec::Vec;

use crate::asn1::{Class, DataElement, Elements, Limits, Tag};
use crate::errors::{Error, Result};
use crate::normalize::{prepend_leading_zero, trim_leading_zero, trim_leading_zeros};
use crate::params::RsaParameters;

const PUBLIC_KEY_ELEMENTS: usize = 2;
const PRIVATE_KEY_ELEMENTS: usize = 9;

/// Two-prime key version.
const VERSION: [u8; 1] = [0x00];

pub(crate) fn read(bytes: &[u8], limits: Limits) -> Result<RsaParameters> {
    let sequence = read_sequence(bytes, limits, "RSA key")?;

    let integers = sequence
        .children()
        .map(|element| {
            let element = element?;
            if !element.is_universal_primitive(Tag::INTEGER) {
                return Err(Error::malformed("RSA key element is not an INTEGER"));
            }
            Ok(element)
        })
        .collect::<Result<Vec<_>>>()?;

    match integers.len() {
        PUBLIC_KEY_ELEMENTS => Ok(RsaParameters::new_public(
            trim_leading_zero(&integers[0].content),
            trim_leading_zero(&integers[1].content),
        )),
        PRIVATE_KEY_ELEMENTS => {
            if integers[0].content != VERSION {
                tracing::debug!(version = ?integers[0].content, "unexpected PKCS#1 version");
                return Err(Error::malformed("unsupported PKCS#1 version"));
            }

            let field = |index: usize| Some(trim_leading_zero(&integers[index].content));
            Ok(RsaParameters {
                modulus: field(1),
                exponent: field(2),
                d: field(3),
                p: field(4),
                q: field(5),
                dp: field(6),
                dq: field(7),
                inverse_q: field(8),
            })
        }
        count => {
            tracing::debug!(count, "unexpected PKCS#1 element count");
            Err(Error::malformed(format!(
                "RSA key has {} elements, expected {} or {}",
                count, PUBLIC_KEY_ELEMENTS, PRIVATE_KEY_ELEMENTS
            )))
        }
    }
}

/// Encodes `params` as `RSAPrivateKey` when it carries a private key and as
/// `RSAPublicKey` otherwise.
///
/// `prepend_zeros` forces a leading zero on the modulus, `p`, `q`, `dp` and
/// `inverse_q`; `d`, `dq` and the exponent only get one when their high bit
/// is set.
pub(crate) fn write(params: &RsaParameters, prepend_zeros: bool) -> Result<Vec<u8>> {
    let modulus = integer(params.modulus()?, prepend_zeros);
    let exponent = integer(params.exponent()?, false);

    let sequence = if params.has_private_key() {
        let private = params.full_private()?;
        DataElement::sequence(&[
            DataElement::primitive(Tag::INTEGER, VERSION),
            modulus,
            exponent,
            integer(private.d, false),
            integer(private.p, prepend_zeros),
            integer(private.q, prepend_zeros),
            integer(private.dp, prepend_zeros),
            integer(private.dq, false),
            integer(private.inverse_q, prepend_zeros),
        ])
    } else {
        DataElement::sequence(&[modulus, exponent])
    };

    Ok(sequence.to_der())
}

/// Reads the first element of `bytes` and checks it is a `SEQUENCE`.
/// Anything following it is ignored.
pub(crate) fn read_sequence(bytes: &[u8], limits: Limits, what: &str) -> Result<DataElement> {
    let element = Elements::with_limits(bytes, limits)
        .next()
        .ok_or_else(|| Error::malformed(format!("empty input, expected {}", what)))??;

    if !element.is(Class::Universal, true, Tag::SEQUENCE) {
        tracing::debug!(class = ?element.class, tag = element.tag.number(), what, "expected SEQUENCE");
        return Err(Error::malformed(format!("{} is not a SEQUENCE", what)));
    }

    Ok(element)
}

/// Minimal unsigned DER `INTEGER` for a big-endian magnitude.
fn integer(value: &[u8], always_prepend_zero: bool) -> DataElement {
    let magnitude = trim_leading_zeros(value);
    let content = if magnitude.is_empty() {
        vec![0]
    } else {
        prepend_leading_zero(magnitude, always_prepend_zero)
    };
    DataElement::primitive(Tag::INTEGER, content)
}
