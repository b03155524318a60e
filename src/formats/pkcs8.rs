//! PKCS#8 `PrivateKeyInfo` as defined in [RFC 5208 Section 5].
//!
//! ```text
//! PrivateKeyInfo ::= SEQUENCE {
//!     version                   Version,
//!     privateKeyAlgorithm       AlgorithmIdentifier,
//!     privateKey                OCTET STRING,  -- PKCS#1 RSAPrivateKey
//!     attributes           [0]  IMPLICIT Attributes OPTIONAL
//! }
//! ```
//!
//! The writer always emits an attribute set holding a single `keyUsage`
//! attribute (`dataEncipherment`), which some native importers expect. The
//! reader does not look at attributes.
//!
//! [RFC 5208 Section 5]: https://datatracker.ietf.org/doc/html/rfc5208#section-5

use alloc::vec::Vec;

use const_oid::ObjectIdentifier;
use zeroize::Zeroizing;

use crate::asn1::{Class, DataElement, Limits, Tag};
use crate::errors::{Error, Result};
use crate::params::RsaParameters;

use super::pkcs1;

/// `rsaEncryption` (1.2.840.113549.1.1.1).
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// `id-ce-keyUsage` (2.5.29.15).
pub const KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");

/// `KeyUsage` bit string content: no unused bits, `dataEncipherment` set.
const KEY_USAGE_DATA_ENCIPHERMENT: [u8; 2] = [0x00, 0x10];

const VERSION: [u8; 1] = [0x00];

pub(crate) fn read(bytes: &[u8], limits: Limits) -> Result<RsaParameters> {
    let sequence = pkcs1::read_sequence(bytes, limits, "PrivateKeyInfo")?;
    let mut elements = sequence.children();
    let mut next = |what: &str| {
        elements
            .next()
            .ok_or_else(|| Error::malformed(format!("PrivateKeyInfo is missing {}", what)))?
    };

    let version = next("version")?;
    if !version.is_universal_primitive(Tag::INTEGER) || version.content != VERSION {
        tracing::debug!(version = ?version.content, "unexpected PKCS#8 version");
        return Err(Error::malformed("unsupported PKCS#8 version"));
    }

    let algorithm = next("privateKeyAlgorithm")?;
    check_algorithm(&algorithm)?;

    let private_key = next("privateKey")?;
    if !private_key.is_universal_primitive(Tag::OCTET_STRING) {
        return Err(Error::malformed("privateKey is not an OCTET STRING"));
    }

    let params = pkcs1::read(&private_key.content, limits)?;
    if !params.has_private_key() {
        return Err(Error::malformed("PrivateKeyInfo wraps a public key"));
    }
    Ok(params)
}

pub(crate) fn write(params: &RsaParameters) -> Result<Vec<u8>> {
    let private_key = Zeroizing::new(pkcs1::write(params, false)?);

    let key_usage = DataElement::sequence(&[
        DataElement::primitive(Tag::OBJECT_IDENTIFIER, KEY_USAGE.as_bytes()),
        DataElement::constructed(
            Class::Universal,
            Tag::SET,
            &[DataElement::primitive(
                Tag::BIT_STRING,
                KEY_USAGE_DATA_ENCIPHERMENT,
            )],
        ),
    ]);

    Ok(DataElement::sequence(&[
        DataElement::primitive(Tag::INTEGER, VERSION),
        algorithm_identifier(),
        DataElement::primitive(Tag::OCTET_STRING, private_key.as_slice()),
        DataElement::constructed(Class::ContextSpecific, Tag::new(0), &[key_usage]),
    ])
    .to_der())
}

/// `AlgorithmIdentifier { rsaEncryption, NULL }`
pub(crate) fn algorithm_identifier() -> DataElement {
    DataElement::sequence(&[
        DataElement::primitive(Tag::OBJECT_IDENTIFIER, RSA_ENCRYPTION.as_bytes()),
        DataElement::primitive(Tag::NULL, Vec::new()),
    ])
}

/// Checks an `AlgorithmIdentifier` names `rsaEncryption`. Parameters are
/// not inspected.
pub(crate) fn check_algorithm(algorithm: &DataElement) -> Result<()> {
    if !algorithm.is(Class::Universal, true, Tag::SEQUENCE) {
        return Err(Error::malformed("AlgorithmIdentifier is not a SEQUENCE"));
    }

    let oid = algorithm
        .children()
        .next()
        .ok_or_else(|| Error::malformed("AlgorithmIdentifier is empty"))??;
    if !oid.is_universal_primitive(Tag::OBJECT_IDENTIFIER) {
        return Err(Error::malformed("AlgorithmIdentifier does not start with an OID"));
    }
    if oid.content != RSA_ENCRYPTION.as_bytes() {
        tracing::debug!(oid = ?oid.content, "unexpected key algorithm");
        return Err(Error::malformed("key algorithm is not rsaEncryption"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn small_key() -> RsaParameters {
        RsaParameters {
            modulus: Some(hex!("c5").to_vec()),
            exponent: Some(hex!("03").to_vec()),
            d: Some(hex!("6b").to_vec()),
            p: Some(hex!("0d").to_vec()),
            q: Some(hex!("0f").to_vec()),
            dp: Some(hex!("07").to_vec()),
            dq: Some(hex!("09").to_vec()),
            inverse_q: Some(hex!("07").to_vec()),
        }
    }

    #[test]
    fn oid_content_bytes() {
        assert_eq!(RSA_ENCRYPTION.as_bytes(), hex!("2a864886f70d010101"));
        assert_eq!(KEY_USAGE.as_bytes(), hex!("551d0f"));
    }

    #[test]
    fn writes_key_usage_attribute() {
        let der = write(&small_key()).unwrap();
        let pkcs1 = pkcs1::write(&small_key(), false).unwrap();

        let mut expected = vec![0x30, 0x41];
        expected.extend_from_slice(&hex!("020100"));
        expected.extend_from_slice(&hex!("300d 06092a864886f70d010101 0500"));
        expected.extend_from_slice(&[0x04, pkcs1.len() as u8]);
        expected.extend_from_slice(&pkcs1);
        expected.extend_from_slice(&hex!("a00d 300b 0603551d0f 3104 03020010"));
        assert_eq!(der, expected);

        assert_eq!(read(&der, Limits::default()).unwrap(), small_key());
    }

    #[test]
    fn accepts_missing_attributes() {
        let pkcs1 = pkcs1::write(&small_key(), false).unwrap();
        let der = DataElement::sequence(&[
            DataElement::primitive(Tag::INTEGER, VERSION),
            algorithm_identifier(),
            DataElement::primitive(Tag::OCTET_STRING, pkcs1),
        ])
        .to_der();
        assert_eq!(read(&der, Limits::default()).unwrap(), small_key());
    }

    #[test]
    fn rejects_other_algorithms() {
        let mut der = write(&small_key()).unwrap();
        // rsaEncryption -> md5WithRSAEncryption (1.2.840.113549.1.1.4)
        let position = der
            .windows(9)
            .position(|window| window == RSA_ENCRYPTION.as_bytes())
            .unwrap();
        der[position + 8] = 0x04;
        assert!(read(&der, Limits::default()).unwrap_err().is_format());
    }

    #[test]
    fn rejects_bad_version() {
        let mut der = write(&small_key()).unwrap();
        assert_eq!(&der[2..5], hex!("020100"));
        der[4] = 0x01;
        assert!(read(&der, Limits::default()).unwrap_err().is_format());
    }

    #[test]
    fn rejects_wrapped_public_key() {
        let pkcs1 = pkcs1::write(&small_key().public_key(), false).unwrap();
        let der = DataElement::sequence(&[
            DataElement::primitive(Tag::INTEGER, VERSION),
            algorithm_identifier(),
            DataElement::primitive(Tag::OCTET_STRING, pkcs1),
        ])
        .to_der();
        assert!(read(&der, Limits::default()).unwrap_err().is_format());
    }

    #[test]
    fn rejects_truncated_structure() {
        let der = DataElement::sequence(&[
            DataElement::primitive(Tag::INTEGER, VERSION),
            algorithm_identifier(),
        ])
        .to_der();
        assert!(read(&der, Limits::default()).unwrap_err().is_format());
    }
}
