//! X.509 `SubjectPublicKeyInfo` as defined in [RFC 5280 Section 4.1].
//!
//! ```text
//! SubjectPublicKeyInfo ::= SEQUENCE {
//!     algorithm         AlgorithmIdentifier,
//!     subjectPublicKey  BIT STRING  -- PKCS#1 RSAPublicKey
//! }
//! ```
//!
//! [RFC 5280 Section 4.1]: https://datatracker.ietf.org/doc/html/rfc5280#section-4.1

use alloc::vec::Vec;

use crate::asn1::{DataElement, Limits, Tag};
use crate::errors::{Error, Result};
use crate::normalize::prepend_leading_zero;
use crate::params::RsaParameters;

use super::{pkcs1, pkcs8};

pub(crate) fn read(bytes: &[u8], limits: Limits) -> Result<RsaParameters> {
    let sequence = pkcs1::read_sequence(bytes, limits, "SubjectPublicKeyInfo")?;
    let mut elements = sequence.children();
    let mut next = |what: &str| {
        elements.next().ok_or_else(|| {
            Error::malformed(format!("SubjectPublicKeyInfo is missing {}", what))
        })?
    };

    let algorithm = next("algorithm")?;
    pkcs8::check_algorithm(&algorithm)?;

    let public_key = next("subjectPublicKey")?;
    if !public_key.is_universal_primitive(Tag::BIT_STRING) {
        return Err(Error::malformed("subjectPublicKey is not a BIT STRING"));
    }

    let key = match public_key.content.split_first() {
        Some((0, key)) => key,
        Some((&unused_bits, _)) => {
            tracing::debug!(unused_bits, "subjectPublicKey is not octet aligned");
            return Err(Error::malformed("subjectPublicKey has unused bits"));
        }
        None => return Err(Error::malformed("subjectPublicKey is empty")),
    };

    let params = pkcs1::read(key, limits)?;
    if params.has_private_key() {
        return Err(Error::malformed("SubjectPublicKeyInfo wraps a private key"));
    }
    Ok(params)
}

pub(crate) fn write(params: &RsaParameters) -> Result<Vec<u8>> {
    let public_key = pkcs1::write(&params.public_key(), false)?;

    Ok(DataElement::sequence(&[
        pkcs8::algorithm_identifier(),
        // unused bits
        DataElement::primitive(Tag::BIT_STRING, prepend_leading_zero(&public_key, true)),
    ])
    .to_der())
}
