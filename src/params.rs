//! In-memory RSA key parameters.

use alloc::vec::Vec;
use core::fmt;

use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::normalize::trim_leading_zeros;

/// RSA key components as big-endian unsigned magnitudes.
///
/// A public key carries `modulus` and `exponent` only. `p` (and with it `q`)
/// marks a private key; `inverse_q` marks a fully populated one whose `d`,
/// `dp`, `dq` and `inverse_q` are all present.
///
/// Buffers may carry a leading zero byte when the layout they were read from
/// mandates one; [`RsaParameters::to_canonical`] strips those.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RsaParameters {
    /// Modulus `n`
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub modulus: Option<Vec<u8>>,
    /// Public exponent `e`
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub exponent: Option<Vec<u8>>,
    /// Private exponent
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub d: Option<Vec<u8>>,
    /// First prime factor
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub p: Option<Vec<u8>>,
    /// Second prime factor
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub q: Option<Vec<u8>>,
    /// `d mod (p - 1)`
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub dp: Option<Vec<u8>>,
    /// `d mod (q - 1)`
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub dq: Option<Vec<u8>>,
    /// `q^-1 mod p`
    #[cfg_attr(feature = "serde", serde(with = "hex_buffer"))]
    pub inverse_q: Option<Vec<u8>>,
}

impl RsaParameters {
    /// Parameters of a public key.
    pub fn new_public(modulus: impl Into<Vec<u8>>, exponent: impl Into<Vec<u8>>) -> Self {
        Self::from_public_parts(Some(modulus.into()), Some(exponent.into()))
    }

    /// Whether private key material is present.
    pub fn has_private_key(&self) -> bool {
        self.p.is_some()
    }

    /// Whether all of `d`, `dp`, `dq` and `inverse_q` are present.
    pub fn has_full_private_key(&self) -> bool {
        self.inverse_q.is_some()
    }

    /// Projects onto the public components (modulus and exponent).
    pub fn public_key(&self) -> RsaParameters {
        Self::from_public_parts(self.modulus.clone(), self.exponent.clone())
    }

    // Struct update syntax is unavailable because of the `Drop` impl.
    fn from_public_parts(modulus: Option<Vec<u8>>, exponent: Option<Vec<u8>>) -> Self {
        RsaParameters {
            modulus,
            exponent,
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            inverse_q: None,
        }
    }

    /// Copy of these parameters with every leading zero byte stripped from
    /// every component. Two encodings of the same key compare equal after
    /// this, whatever width rules their layouts impose.
    pub fn to_canonical(&self) -> RsaParameters {
        let canonical = |field: &Option<Vec<u8>>| {
            field.as_deref().map(|value| trim_leading_zeros(value).to_vec())
        };

        RsaParameters {
            modulus: canonical(&self.modulus),
            exponent: canonical(&self.exponent),
            d: canonical(&self.d),
            p: canonical(&self.p),
            q: canonical(&self.q),
            dp: canonical(&self.dp),
            dq: canonical(&self.dq),
            inverse_q: canonical(&self.inverse_q),
        }
    }

    pub(crate) fn modulus(&self) -> Result<&[u8]> {
        required(&self.modulus, "modulus")
    }

    pub(crate) fn exponent(&self) -> Result<&[u8]> {
        required(&self.exponent, "exponent")
    }

    /// The components a fully populated private key needs, in
    /// `(d, p, q, dp, dq, inverse_q)` order.
    pub(crate) fn full_private(&self) -> Result<FullPrivate<'_>> {
        Ok(FullPrivate {
            d: required(&self.d, "D")?,
            p: required(&self.p, "P")?,
            q: required(&self.q, "Q")?,
            dp: required(&self.dp, "DP")?,
            dq: required(&self.dq, "DQ")?,
            inverse_q: required(&self.inverse_q, "InverseQ")?,
        })
    }
}

/// Borrowed view of a fully populated private key.
pub(crate) struct FullPrivate<'a> {
    pub d: &'a [u8],
    pub p: &'a [u8],
    pub q: &'a [u8],
    pub dp: &'a [u8],
    pub dq: &'a [u8],
    pub inverse_q: &'a [u8],
}

pub(crate) fn required<'a>(field: &'a Option<Vec<u8>>, name: &str) -> Result<&'a [u8]> {
    field
        .as_deref()
        .ok_or_else(|| Error::invalid_argument(format!("missing {}", name)))
}

impl fmt::Debug for RsaParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Hex<'a>(&'a [u8]);

        impl fmt::Debug for Hex<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        let redacted = |field: &Option<Vec<u8>>| field.as_ref().map(|_| "..");

        f.debug_struct("RsaParameters")
            .field("modulus", &self.modulus.as_deref().map(Hex))
            .field("exponent", &self.exponent.as_deref().map(Hex))
            .field("d", &redacted(&self.d))
            .field("p", &redacted(&self.p))
            .field("q", &redacted(&self.q))
            .field("dp", &redacted(&self.dp))
            .field("dq", &redacted(&self.dq))
            .field("inverse_q", &redacted(&self.inverse_q))
            .finish()
    }
}

impl Zeroize for RsaParameters {
    fn zeroize(&mut self) {
        self.modulus.zeroize();
        self.exponent.zeroize();
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.dp.zeroize();
        self.dq.zeroize();
        self.inverse_q.zeroize();
    }
}

impl Drop for RsaParameters {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[cfg(feature = "serde")]
mod hex_buffer {
    use alloc::vec::Vec;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    struct HexRef<'a>(&'a [u8]);

    impl Serialize for HexRef<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serdect::slice::serialize_hex_lower_or_bin(&self.0, serializer)
        }
    }

    struct HexVec(Vec<u8>);

    impl<'de> Deserialize<'de> for HexVec {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            serdect::slice::deserialize_hex_or_bin_vec(deserializer).map(HexVec)
        }
    }

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.as_deref().map(HexRef).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Ok(Option::<HexVec>::deserialize(deserializer)?.map(|hex| hex.0))
    }
}
