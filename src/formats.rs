//! Key formatters and the blob type dispatch table.
//!
//! [`KeyFormatter`] is a closed set of layouts, each with one `read`/`write`
//! pair. [`formatter_for`] maps the blob type identifiers native key
//! import/export routines speak to the formatter handling them.

pub mod bcrypt;
pub mod capi;
pub mod pkcs1;
pub mod pkcs8;
pub mod x509;

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::asn1::Limits;
use crate::errors::{Error, Result};
use crate::normalize::negotiate_sizes;
use crate::params::RsaParameters;

use self::bcrypt::BCryptBlobKind;

#[cfg(feature = "pem")]
pub use crate::pem::from_pem;

/// One of the binary layouts an RSA key can be serialized to.
///
/// Formatters are stateless and cheap to copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyFormatter {
    /// PKCS#1 `RSAPrivateKey` / `RSAPublicKey`, DER.
    Pkcs1,
    /// PKCS#1 with an unconditional leading zero on the modulus, `p`, `q`,
    /// `dp` and `inverse_q`, as some native import routines insist on.
    Pkcs1PrependZeros,
    /// PKCS#8 `PrivateKeyInfo` wrapping a PKCS#1 private key.
    Pkcs8,
    /// X.509 `SubjectPublicKeyInfo`.
    X509SubjectPublicKeyInfo,
    /// Legacy CryptoAPI `PUBLICKEYBLOB` / `PRIVATEKEYBLOB`.
    Capi,
    /// BCrypt `BCRYPT_RSAPUBLIC_BLOB`.
    BCryptPublic,
    /// BCrypt `BCRYPT_RSAPRIVATE_BLOB`.
    BCryptPrivate,
    /// BCrypt `BCRYPT_RSAFULLPRIVATE_BLOB`.
    BCryptFullPrivate,
}

impl KeyFormatter {
    /// Every formatter.
    pub const ALL: [KeyFormatter; 8] = [
        KeyFormatter::Pkcs1,
        KeyFormatter::Pkcs1PrependZeros,
        KeyFormatter::Pkcs8,
        KeyFormatter::X509SubjectPublicKeyInfo,
        KeyFormatter::Capi,
        KeyFormatter::BCryptPublic,
        KeyFormatter::BCryptPrivate,
        KeyFormatter::BCryptFullPrivate,
    ];

    /// Whether this layout can carry a public-only key.
    pub fn can_hold_public_key(self) -> bool {
        match self {
            KeyFormatter::Pkcs1
            | KeyFormatter::Pkcs1PrependZeros
            | KeyFormatter::X509SubjectPublicKeyInfo
            | KeyFormatter::Capi
            | KeyFormatter::BCryptPublic => true,
            KeyFormatter::Pkcs8 | KeyFormatter::BCryptPrivate | KeyFormatter::BCryptFullPrivate => {
                false
            }
        }
    }

    /// Whether this layout can carry private key material.
    pub fn can_hold_private_key(self) -> bool {
        !matches!(
            self,
            KeyFormatter::X509SubjectPublicKeyInfo | KeyFormatter::BCryptPublic
        )
    }

    /// Decodes `bytes` with default ASN.1 [`Limits`].
    pub fn read(self, bytes: &[u8]) -> Result<RsaParameters> {
        self.read_with_limits(bytes, Limits::default())
    }

    /// Decodes `bytes`, applying `limits` to the ASN.1 based layouts.
    pub fn read_with_limits(self, bytes: &[u8], limits: Limits) -> Result<RsaParameters> {
        match self {
            KeyFormatter::Pkcs1 | KeyFormatter::Pkcs1PrependZeros => pkcs1::read(bytes, limits),
            KeyFormatter::Pkcs8 => pkcs8::read(bytes, limits),
            KeyFormatter::X509SubjectPublicKeyInfo => x509::read(bytes, limits),
            KeyFormatter::Capi => capi::read(bytes),
            KeyFormatter::BCryptPublic => bcrypt::read(bytes, BCryptBlobKind::Public),
            KeyFormatter::BCryptPrivate => bcrypt::read(bytes, BCryptBlobKind::Private),
            KeyFormatter::BCryptFullPrivate => bcrypt::read(bytes, BCryptBlobKind::FullPrivate),
        }
    }

    /// Decodes `bytes`, then tries to bring the result to the fixed widths
    /// the CAPI layout requires.
    ///
    /// The negotiated parameters are only returned when they actually become
    /// CAPI compatible; otherwise the parameters come back exactly as read.
    pub fn read_negotiated(self, bytes: &[u8]) -> Result<RsaParameters> {
        let params = self.read(bytes)?;
        if capi::is_capi_compatible(&params) {
            return Ok(params);
        }

        let negotiated = negotiate_sizes(&params);
        if capi::is_capi_compatible(&negotiated) {
            Ok(negotiated)
        } else {
            tracing::debug!(formatter = ?self, "key stays CAPI incompatible after negotiation");
            Ok(params)
        }
    }

    /// Encodes `params`, including the private key when it is present and
    /// this layout can carry one.
    pub fn write(self, params: &RsaParameters) -> Result<Vec<u8>> {
        self.write_with(
            params,
            params.has_private_key() && self.can_hold_private_key(),
        )
    }

    /// Encodes `params`, including the private key if `include_private` is set.
    ///
    /// Without `include_private` only the public components are written.
    pub fn write_with(self, params: &RsaParameters, include_private: bool) -> Result<Vec<u8>> {
        if include_private && !params.has_private_key() {
            return Err(Error::invalid_argument(
                "private key requested but the parameters carry no private key",
            ));
        }
        if include_private && !self.can_hold_private_key() {
            return Err(Error::unsupported(format!(
                "{} cannot carry a private key",
                self
            )));
        }
        if !include_private && !self.can_hold_public_key() {
            if !params.has_private_key() {
                return Err(Error::invalid_argument(format!(
                    "{} requires a private key but the parameters carry none",
                    self
                )));
            }
            return Err(Error::unsupported(format!(
                "{} requires a private key",
                self
            )));
        }

        let params = if include_private {
            Cow::Borrowed(params)
        } else {
            Cow::Owned(public_key_filter(params))
        };

        match self {
            KeyFormatter::Pkcs1 => pkcs1::write(&params, false),
            KeyFormatter::Pkcs1PrependZeros => pkcs1::write(&params, true),
            KeyFormatter::Pkcs8 => pkcs8::write(&params),
            KeyFormatter::X509SubjectPublicKeyInfo => x509::write(&params),
            KeyFormatter::Capi => capi::write(&params),
            KeyFormatter::BCryptPublic => bcrypt::write(&params, BCryptBlobKind::Public),
            KeyFormatter::BCryptPrivate => bcrypt::write(&params, BCryptBlobKind::Private),
            KeyFormatter::BCryptFullPrivate => {
                bcrypt::write(&params, BCryptBlobKind::FullPrivate)
            }
        }
    }
}

impl fmt::Display for KeyFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyFormatter::Pkcs1 => "PKCS#1",
            KeyFormatter::Pkcs1PrependZeros => "PKCS#1 (prepend zeros)",
            KeyFormatter::Pkcs8 => "PKCS#8",
            KeyFormatter::X509SubjectPublicKeyInfo => "X.509 SubjectPublicKeyInfo",
            KeyFormatter::Capi => "CAPI",
            KeyFormatter::BCryptPublic => "BCrypt public",
            KeyFormatter::BCryptPrivate => "BCrypt private",
            KeyFormatter::BCryptFullPrivate => "BCrypt full private",
        })
    }
}

/// Projects `params` onto the modulus and exponent.
pub fn public_key_filter(params: &RsaParameters) -> RsaParameters {
    params.public_key()
}

/// Key blob types exchanged with native key import and export routines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyBlobType {
    /// PKCS#8 `PrivateKeyInfo`.
    Pkcs8RawPrivateKeyInfo,
    /// PKCS#1 `RSAPrivateKey`.
    Pkcs1RsaPrivateKey,
    /// BCrypt private key blob (primes only).
    BCryptPrivateKey,
    /// BCrypt full private key blob.
    BCryptFullPrivateKey,
    /// CryptoAPI `PRIVATEKEYBLOB`.
    Capi1PrivateKey,
    /// X.509 `SubjectPublicKeyInfo`.
    X509SubjectPublicKeyInfo,
    /// PKCS#1 `RSAPublicKey`.
    Pkcs1RsaPublicKey,
    /// BCrypt public key blob.
    BCryptPublicKey,
    /// CryptoAPI `PUBLICKEYBLOB`.
    Capi1PublicKey,
}

impl KeyBlobType {
    /// The identifier's name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            KeyBlobType::Pkcs8RawPrivateKeyInfo => "Pkcs8RawPrivateKeyInfo",
            KeyBlobType::Pkcs1RsaPrivateKey => "Pkcs1RsaPrivateKey",
            KeyBlobType::BCryptPrivateKey => "BCryptPrivateKey",
            KeyBlobType::BCryptFullPrivateKey => "BCryptFullPrivateKey",
            KeyBlobType::Capi1PrivateKey => "Capi1PrivateKey",
            KeyBlobType::X509SubjectPublicKeyInfo => "X509SubjectPublicKeyInfo",
            KeyBlobType::Pkcs1RsaPublicKey => "Pkcs1RsaPublicKey",
            KeyBlobType::BCryptPublicKey => "BCryptPublicKey",
            KeyBlobType::Capi1PublicKey => "Capi1PublicKey",
        }
    }
}

const BLOB_TYPES: [KeyBlobType; 9] = [
    KeyBlobType::Pkcs8RawPrivateKeyInfo,
    KeyBlobType::Pkcs1RsaPrivateKey,
    KeyBlobType::BCryptPrivateKey,
    KeyBlobType::BCryptFullPrivateKey,
    KeyBlobType::Capi1PrivateKey,
    KeyBlobType::X509SubjectPublicKeyInfo,
    KeyBlobType::Pkcs1RsaPublicKey,
    KeyBlobType::BCryptPublicKey,
    KeyBlobType::Capi1PublicKey,
];

impl FromStr for KeyBlobType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        BLOB_TYPES
            .iter()
            .copied()
            .find(|blob_type| blob_type.name() == name)
            .ok_or_else(|| Error::unsupported(format!("unknown key blob type `{}`", name)))
    }
}

impl fmt::Display for KeyBlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The formatter handling `blob_type`.
pub fn formatter_for(blob_type: KeyBlobType) -> KeyFormatter {
    match blob_type {
        KeyBlobType::Pkcs8RawPrivateKeyInfo => KeyFormatter::Pkcs8,
        KeyBlobType::Pkcs1RsaPrivateKey | KeyBlobType::Pkcs1RsaPublicKey => KeyFormatter::Pkcs1,
        KeyBlobType::BCryptPrivateKey => KeyFormatter::BCryptPrivate,
        KeyBlobType::BCryptFullPrivateKey => KeyFormatter::BCryptFullPrivate,
        KeyBlobType::Capi1PrivateKey | KeyBlobType::Capi1PublicKey => KeyFormatter::Capi,
        KeyBlobType::X509SubjectPublicKeyInfo => KeyFormatter::X509SubjectPublicKeyInfo,
        KeyBlobType::BCryptPublicKey => KeyFormatter::BCryptPublic,
    }
}

/// The formatter handling the blob type called `name`.
///
/// Unknown names are [`Error::NotSupported`].
pub fn formatter_for_name(name: &str) -> Result<KeyFormatter> {
    name.parse().map(formatter_for)
}

/// Forward-only cursor over a fixed binary layout.
pub(crate) struct ByteReader<'a> {
    input: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    pub fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.input.len() < len {
            tracing::debug!(what, len, available = self.input.len(), "key blob truncated");
            return Err(Error::malformed(format!(
                "unexpected end of input reading {}",
                what
            )));
        }

        let (head, rest) = self.input.split_at(len);
        self.input = rest;
        Ok(head)
    }

    pub fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn array4(&mut self, what: &str) -> Result<[u8; 4]> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4, what)?);
        Ok(out)
    }

    /// Reads `len` bytes and reverses them, turning little-endian into
    /// big-endian or back.
    pub fn take_reversed(&mut self, len: usize, what: &str) -> Result<Vec<u8>> {
        let mut out = self.take(len, what)?.to_vec();
        out.reverse();
        Ok(out)
    }
}
