//! Legacy CryptoAPI `PUBLICKEYBLOB` / `PRIVATEKEYBLOB` layout.
//!
//! ```text
//! BLOBHEADER  { bType: u8, bVersion: u8, reserved: u16, aiKeyAlg: u32 }
//! RSAPUBKEY   { magic: "RSA1" | "RSA2", bitlen: u32, pubexp: u32 }
//! modulus     [bitlen / 8]
//! prime1      [bitlen / 16]    -- private blobs only
//! prime2      [bitlen / 16]
//! exponent1   [bitlen / 16]
//! exponent2   [bitlen / 16]
//! coefficient [bitlen / 16]
//! privateExp  [bitlen / 8]
//! ```
//!
//! Integers are little-endian. Private components have fixed widths, so a
//! key only fits when its components are exactly as wide as the layout
//! expects; see [`is_capi_compatible`].

use alloc::vec::Vec;

use crate::errors::{Error, Result};
use crate::normalize::{negotiate_sizes, trim_leading_zeros};
use crate::params::RsaParameters;

use super::ByteReader;

/// `bType` of a public key blob.
pub const PUBLICKEYBLOB: u8 = 0x06;
/// `bType` of a private key blob.
pub const PRIVATEKEYBLOB: u8 = 0x07;
/// `bVersion` written and accepted.
pub const CUR_BLOB_VERSION: u8 = 0x02;
/// Key exchange RSA algorithm id, written into `aiKeyAlg`.
pub const CALG_RSA_KEYX: u32 = 0x0000_a400;

/// Magic of a public key blob.
pub const RSA1: [u8; 4] = *b"RSA1";
/// Magic of a private key blob.
pub const RSA2: [u8; 4] = *b"RSA2";

const EXPONENT_LEN: usize = 4;

/// Returns `true` if `params` can be written as a CAPI blob without
/// resizing.
///
/// Public keys always fit. Private keys need every component, with `d` as
/// wide as the modulus and the rest half as wide (rounded up). Leading
/// zeros of the modulus do not count towards its width.
pub fn is_capi_compatible(params: &RsaParameters) -> bool {
    if !params.has_private_key() {
        return true;
    }

    let (Some(modulus), Ok(private)) = (params.modulus.as_deref(), params.full_private()) else {
        return false;
    };

    let modulus_len = trim_leading_zeros(modulus).len();
    let half_len = half(modulus_len);

    private.d.len() == modulus_len
        && [private.p, private.q, private.dp, private.dq, private.inverse_q]
            .iter()
            .all(|component| component.len() == half_len)
}

pub(crate) fn read(bytes: &[u8]) -> Result<RsaParameters> {
    let mut reader = ByteReader::new(bytes);

    let blob_type = reader.u8("blob type")?;
    let version = reader.u8("blob version")?;
    reader.take(2, "reserved")?;
    // key spec: exchange and signature blobs share the layout
    reader.take(4, "key algorithm")?;
    let magic = reader.array4("magic")?;

    let private = match (blob_type, magic) {
        (PUBLICKEYBLOB, RSA1) => false,
        (PRIVATEKEYBLOB, RSA2) => true,
        _ => {
            tracing::debug!(blob_type, ?magic, "unexpected CAPI blob type");
            return Err(Error::malformed("not an RSA CAPI key blob"));
        }
    };
    if version != CUR_BLOB_VERSION {
        tracing::debug!(version, "unexpected CAPI blob version");
        return Err(Error::malformed("unsupported CAPI blob version"));
    }

    let bit_len = u32::from_le_bytes(reader.array4("bit length")?);
    let modulus_len = usize::try_from((u64::from(bit_len) + 7) / 8)
        .map_err(|_| Error::malformed("CAPI blob bit length is too large"))?;
    if modulus_len == 0 {
        return Err(Error::malformed("CAPI blob has an empty modulus"));
    }
    let half_len = half(modulus_len);

    let exponent = reader.take_reversed(EXPONENT_LEN, "public exponent")?;
    let exponent = trim_leading_zeros(&exponent).to_vec();
    let modulus = reader.take_reversed(modulus_len, "modulus")?;

    let mut params = RsaParameters::new_public(modulus, exponent);
    if !private {
        return Ok(params);
    }

    // partially read components are wiped with `params` on error
    params.p = Some(reader.take_reversed(half_len, "prime1")?);
    params.q = Some(reader.take_reversed(half_len, "prime2")?);
    params.dp = Some(reader.take_reversed(half_len, "exponent1")?);
    params.dq = Some(reader.take_reversed(half_len, "exponent2")?);
    params.inverse_q = Some(reader.take_reversed(half_len, "coefficient")?);
    params.d = Some(reader.take_reversed(modulus_len, "private exponent")?);

    Ok(params)
}

/// Encodes `params`, resizing private components first when they do not
/// already fit.
pub(crate) fn write(params: &RsaParameters) -> Result<Vec<u8>> {
    if params.has_private_key() {
        params.full_private()?;
        if !is_capi_compatible(params) {
            let negotiated = negotiate_sizes(params);
            if !is_capi_compatible(&negotiated) {
                return Err(Error::invalid_argument(
                    "private key components do not fit the CAPI layout",
                ));
            }
            return write_blob(&negotiated);
        }
    }

    write_blob(params)
}

fn write_blob(params: &RsaParameters) -> Result<Vec<u8>> {
    let modulus = trim_leading_zeros(params.modulus()?);
    let exponent = trim_leading_zeros(params.exponent()?);
    if modulus.is_empty() {
        return Err(Error::invalid_argument("modulus is zero"));
    }
    if exponent.len() > EXPONENT_LEN {
        return Err(Error::invalid_argument(format!(
            "CAPI exponents are at most {} bytes",
            EXPONENT_LEN
        )));
    }
    let bit_len = u32::try_from(modulus.len() * 8)
        .map_err(|_| Error::invalid_argument("modulus is too large"))?;

    let private = params.has_private_key();
    let mut out = Vec::new();

    out.push(if private { PRIVATEKEYBLOB } else { PUBLICKEYBLOB });
    out.push(CUR_BLOB_VERSION);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&CALG_RSA_KEYX.to_le_bytes());
    out.extend_from_slice(if private { &RSA2 } else { &RSA1 });
    out.extend_from_slice(&bit_len.to_le_bytes());

    let mut padded_exponent = [0u8; EXPONENT_LEN];
    padded_exponent[EXPONENT_LEN - exponent.len()..].copy_from_slice(exponent);
    extend_reversed(&mut out, &padded_exponent);
    extend_reversed(&mut out, modulus);

    if private {
        let private = params.full_private()?;
        for component in [
            private.p,
            private.q,
            private.dp,
            private.dq,
            private.inverse_q,
            private.d,
        ] {
            extend_reversed(&mut out, component);
        }
    }

    Ok(out)
}

fn half(len: usize) -> usize {
    (len + 1) / 2
}

fn extend_reversed(out: &mut Vec<u8>, value: &[u8]) {
    out.extend(value.iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const E: [u8; 3] = hex!("010001");

    // modulus of 65 bytes, q and dq one byte short of the 33 byte slots
    fn fixable_key() -> RsaParameters {
        RsaParameters {
            modulus: Some(
                hex!(
                    "c47d877c81a02c6c583fa1817919538505d87ef197512b3ab044f3528770006480"
                    "296c3fa853f73ffd665e2a6ca9bca252b43a6fcafee7c28adb3a305e8a121fa5"
                )
                .to_vec(),
            ),
            exponent: Some(E.to_vec()),
            d: Some(
                hex!(
                    "9846040abc564a3708c8ff3bdc82811454ec6bac84acf5c87cb462b1719e9dde97"
                    "32e00f3a82079700c53e0d78b2c45157a95247b8a3b7bfe3f5bc4bd5b61ead5d"
                )
                .to_vec(),
            ),
            p: Some(
                hex!("df43cfeadf1279688cfce205cd1aefca62e22b64a66d32a901faf20ac0292322d3")
                    .to_vec(),
            ),
            q: Some(
                hex!("e14cbde5a7094548b8e3621baafb37173a8335f8d89308826bd0cd12a5aef8a7").to_vec(),
            ),
            dp: Some(
                hex!("117bb1f0667f7fda5c1001730ad8ad26600fededf7ca5d4936ca7be1b3a28509d9")
                    .to_vec(),
            ),
            dq: Some(
                hex!("49f06991e8d3be0d33c04bfe508ac975b21a45a8394b67cb859eaceea5b95a99").to_vec(),
            ),
            inverse_q: Some(
                hex!("9be3aec3b78f87f63efc18ce7742c8dbdf4ecdd88f9287014877a706ad8432d492")
                    .to_vec(),
            ),
        }
    }

    // 64 byte modulus with a 34 byte p and a 30 byte q
    fn unfixable_key() -> RsaParameters {
        RsaParameters {
            modulus: Some(
                hex!(
                    "b398a6191f734270c18f148f642e7d2385d543ba0dd42c3ece181d3a83e6f06b"
                    "d38f82246005e12b523eb89a056ee2e80cf5942ff2c0538315f9ecce0b803aa7"
                )
                .to_vec(),
            ),
            exponent: Some(E.to_vec()),
            d: Some(
                hex!(
                    "3b7fc7076bb3f3bf07612f9e91c215133fb377cc9be83f004fa70d87e54ac20b"
                    "2048ea3907c12d416c96582b9c3930ece80dcde263bb3b5dd884312f78a0f581"
                )
                .to_vec(),
            ),
            p: Some(
                hex!("e2f5231ee9584f806351a2f20462338faa8617b0a8a269611b9458e400455b9a78bd")
                    .to_vec(),
            ),
            q: Some(
                hex!("ca940301c0fac57809a7731cc115427d720f1f002617a154711cd9f63133").to_vec(),
            ),
            dp: Some(
                hex!("b82cd41e5ea0228bfe8d1e1d25ff86f61c1c8b16fa122a4ffa708d1e2136279b1845")
                    .to_vec(),
            ),
            dq: Some(
                hex!("ca0f1264b87129700ee917f7915bbc4355f6612c8bd23c17f6ef1934e863").to_vec(),
            ),
            inverse_q: Some(
                hex!("de0c13a621ba9272cd5cdeb2c7c27be47f4a275e89697c1f3461f50e69a03710f1bd")
                    .to_vec(),
            ),
        }
    }

    #[test]
    fn public_blob_layout() {
        let params = RsaParameters::new_public(hex!("00c1c2c3c4"), E);
        let blob = write(&params).unwrap();
        assert_eq!(
            blob,
            hex!("0602 0000 00a40000 52534131 20000000 01000100 c4c3c2c1")
        );

        let read = read(&blob).unwrap();
        assert_eq!(read.modulus.as_deref(), Some(&hex!("c1c2c3c4")[..]));
        assert_eq!(read.exponent.as_deref(), Some(&E[..]));
        assert!(!read.has_private_key());
    }

    #[test]
    fn private_blob_layout() {
        let params = RsaParameters {
            modulus: Some(hex!("c1c2c3c4").to_vec()),
            exponent: Some(hex!("03").to_vec()),
            d: Some(hex!("d1d2d3d4").to_vec()),
            p: Some(hex!("a1a2").to_vec()),
            q: Some(hex!("b1b2").to_vec()),
            dp: Some(hex!("e1e2").to_vec()),
            dq: Some(hex!("f1f2").to_vec()),
            inverse_q: Some(hex!("0102").to_vec()),
        };
        let blob = write(&params).unwrap();
        assert_eq!(
            blob,
            hex!(
                "0702 0000 00a40000 52534132 20000000 03000000 c4c3c2c1"
                "a2a1 b2b1 e2e1 f2f1 0201 d4d3d2d1"
            )
        );
        assert_eq!(read(&blob).unwrap(), params);
    }

    #[test]
    fn odd_modulus_width_rounds_half_up() {
        let key = negotiate_sizes(&fixable_key());
        let blob = write(&key).unwrap();
        // header, exponent, modulus, five 33 byte components, d
        assert_eq!(blob.len(), 20 + 65 + 5 * 33 + 65);
        assert_eq!(read(&blob).unwrap(), key);
    }

    #[test]
    fn negotiation_fixes_near_miss_widths() {
        let key = fixable_key();
        assert!(!is_capi_compatible(&key));
        assert!(is_capi_compatible(&negotiate_sizes(&key)));

        let blob = write(&key).unwrap();
        assert_eq!(read(&blob).unwrap().to_canonical(), key.to_canonical());
    }

    #[test]
    fn unfixable_key_is_rejected() {
        let key = unfixable_key();
        assert!(!is_capi_compatible(&key));
        assert!(!is_capi_compatible(&negotiate_sizes(&key)));
        assert!(write(&key).unwrap_err().is_invalid_argument());

        // the public half still fits
        assert!(write(&key.public_key()).is_ok());
    }

    #[test]
    fn compatibility_of_partial_keys() {
        assert!(is_capi_compatible(&RsaParameters::new_public(hex!("c1"), E)));

        let minimal = crate::normalize::strip_optional_private_data(&fixable_key());
        assert!(!is_capi_compatible(&minimal));
        assert!(write(&minimal).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn wide_exponent_is_rejected() {
        let params = RsaParameters::new_public(hex!("c1c2"), hex!("0001020304"));
        assert!(write(&params).is_ok());

        let params = RsaParameters::new_public(hex!("c1c2"), hex!("0102030405"));
        assert!(write(&params).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn accepts_signature_key_spec() {
        let mut blob = write(&RsaParameters::new_public(hex!("c1c2"), E)).unwrap();
        // CALG_RSA_SIGN
        blob[5] = 0x24;
        assert!(read(&blob).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        let blob = write(&RsaParameters::new_public(hex!("c1c2"), E)).unwrap();

        let mut wrong_type = blob.clone();
        wrong_type[0] = PRIVATEKEYBLOB;
        assert!(read(&wrong_type).unwrap_err().is_format());

        let mut wrong_version = blob.clone();
        wrong_version[1] = 0x03;
        assert!(read(&wrong_version).unwrap_err().is_format());

        let mut wrong_magic = blob.clone();
        wrong_magic[8..12].copy_from_slice(b"DSS1");
        assert!(read(&wrong_magic).unwrap_err().is_format());

        let mut empty_modulus = blob.clone();
        empty_modulus[12..16].copy_from_slice(&0u32.to_le_bytes());
        assert!(read(&empty_modulus).unwrap_err().is_format());

        assert!(read(&blob[..blob.len() - 1]).unwrap_err().is_format());
        assert!(read(&[]).unwrap_err().is_format());
    }

    #[test]
    fn rejects_huge_bit_length() {
        let mut blob = write(&RsaParameters::new_public(hex!("c1c2"), E)).unwrap();
        for bit_len in [u32::MAX, u32::MAX - 6, u32::MAX - 7] {
            blob[12..16].copy_from_slice(&bit_len.to_le_bytes());
            assert!(read(&blob).unwrap_err().is_format());
        }
    }

    #[test]
    fn rejects_truncated_private_blob() {
        let blob = write(&negotiate_sizes(&fixable_key())).unwrap();
        assert!(read(&blob[..blob.len() - 1]).unwrap_err().is_format());
    }
}
