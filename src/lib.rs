#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs)]

//! RSA key serialization to and from the layouts native key stores speak.
//!
//! Keys are exchanged as [`RsaParameters`]: the eight RSA components as
//! optional big-endian byte buffers. A [`KeyFormatter`] maps those to and
//! from one binary layout:
//!
//! - PKCS#1 `RSAPrivateKey` / `RSAPublicKey` ([RFC8017]), optionally with
//!   unconditional leading zeros
//! - PKCS#8 `PrivateKeyInfo` ([RFC5208])
//! - X.509 `SubjectPublicKeyInfo` ([RFC5280])
//! - CryptoAPI `PRIVATEKEYBLOB` / `PUBLICKEYBLOB`
//! - BCrypt public, private and full private key blobs
//!
//! # Usage
//!
//! ```
//! use rsa_keyblob::{formatter_for, KeyBlobType, KeyFormatter, RsaParameters};
//!
//! let params = RsaParameters::new_public(vec![0xc5], vec![0x03]);
//!
//! // SubjectPublicKeyInfo to CAPI PUBLICKEYBLOB
//! let der = KeyFormatter::X509SubjectPublicKeyInfo.write(&params)?;
//! let decoded = KeyFormatter::X509SubjectPublicKeyInfo.read(&der)?;
//! let blob = formatter_for(KeyBlobType::Capi1PublicKey).write(&decoded)?;
//!
//! assert_eq!(KeyFormatter::Capi.read(&blob)?, params);
//! # Ok::<(), rsa_keyblob::Error>(())
//! ```
//!
//! Private keys that only carry `p` and `q` can be completed with
//! [`normalize::compute_full_private_key`] before being written to a layout
//! that needs every component.
//!
//! [RFC8017]: https://datatracker.ietf.org/doc/html/rfc8017
//! [RFC5208]: https://datatracker.ietf.org/doc/html/rfc5208
//! [RFC5280]: https://datatracker.ietf.org/doc/html/rfc5280

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use num_bigint::BigUint;

pub mod asn1;
pub mod errors;
pub mod formats;
pub mod normalize;
pub mod params;
#[cfg(feature = "pem")]
pub mod pem;

mod math;

pub use crate::{
    errors::{Error, Result},
    formats::{formatter_for, formatter_for_name, public_key_filter, KeyBlobType, KeyFormatter},
    math::mod_inverse,
    params::RsaParameters,
};

#[cfg(feature = "pem")]
pub use crate::pem::{from_pem, LineEnding};
