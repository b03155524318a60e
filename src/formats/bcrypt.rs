//! CNG `BCRYPT_RSAKEY_BLOB` layouts.
//!
//! ```text
//! BCRYPT_RSAKEY_BLOB { Magic, BitLength, cbPublicExp, cbModulus, cbPrime1, cbPrime2 }
//! PublicExponent[cbPublicExp]
//! Modulus[cbModulus]
//! Prime1[cbPrime1]            -- private and full private
//! Prime2[cbPrime2]
//! Exponent1[cbPrime1]         -- full private only
//! Exponent2[cbPrime2]
//! Coefficient[cbPrime1]
//! PrivateExponent[cbModulus]
//! ```
//!
//! Header fields are native-endian `u32`s; the integers that follow are
//! big-endian.

use alloc::vec::Vec;

use crate::errors::{Error, Result};
use crate::normalize::trim_leading_zeros;
use crate::params::{required, RsaParameters};

use super::ByteReader;

/// `BCRYPT_RSAPUBLIC_MAGIC` ("RSA1").
pub const BCRYPT_RSAPUBLIC_MAGIC: u32 = 0x3141_5352;
/// `BCRYPT_RSAPRIVATE_MAGIC` ("RSA2").
pub const BCRYPT_RSAPRIVATE_MAGIC: u32 = 0x3241_5352;
/// `BCRYPT_RSAFULLPRIVATE_MAGIC` ("RSA3").
pub const BCRYPT_RSAFULLPRIVATE_MAGIC: u32 = 0x3341_5352;

const HEADER_LEN: usize = 6 * 4;

/// Which of the three blob layouts a formatter reads and writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BCryptBlobKind {
    /// Exponent and modulus.
    Public,
    /// Adds the primes.
    Private,
    /// Adds every CRT component and the private exponent.
    FullPrivate,
}

impl BCryptBlobKind {
    /// Header magic of this layout.
    pub const fn magic(self) -> u32 {
        match self {
            BCryptBlobKind::Public => BCRYPT_RSAPUBLIC_MAGIC,
            BCryptBlobKind::Private => BCRYPT_RSAPRIVATE_MAGIC,
            BCryptBlobKind::FullPrivate => BCRYPT_RSAFULLPRIVATE_MAGIC,
        }
    }

    fn has_primes(self) -> bool {
        self != BCryptBlobKind::Public
    }
}

struct Header {
    public_exp: usize,
    modulus: usize,
    prime1: usize,
    prime2: usize,
}

impl Header {
    fn read(reader: &mut ByteReader<'_>, kind: BCryptBlobKind) -> Result<Self> {
        let mut field =
            |what: &str| -> Result<u32> { Ok(u32::from_ne_bytes(reader.array4(what)?)) };

        let magic = field("magic")?;
        if magic != kind.magic() {
            tracing::debug!(actual_magic = magic, expected_magic = kind.magic(), "magic mismatch");
            return Err(Error::malformed(format!(
                "BCrypt blob magic {:#010x} does not match {:?}",
                magic, kind
            )));
        }
        let _bit_length = field("bit length")?;

        Ok(Header {
            public_exp: field("public exponent size")? as usize,
            modulus: field("modulus size")? as usize,
            prime1: field("prime1 size")? as usize,
            prime2: field("prime2 size")? as usize,
        })
    }

    fn body_len(&self, kind: BCryptBlobKind) -> u64 {
        let (e, n, p, q) = (
            self.public_exp as u64,
            self.modulus as u64,
            self.prime1 as u64,
            self.prime2 as u64,
        );
        match kind {
            BCryptBlobKind::Public => e + n,
            BCryptBlobKind::Private => e + n + p + q,
            BCryptBlobKind::FullPrivate => e + 2 * n + 3 * p + 2 * q,
        }
    }

    fn write(&self, out: &mut Vec<u8>, kind: BCryptBlobKind) -> Result<()> {
        let too_large = || Error::invalid_argument("key is too large for a BCrypt blob");
        let size = |value: usize| u32::try_from(value).map_err(|_| too_large());

        let modulus = size(self.modulus)?;
        let bit_length = modulus.checked_mul(8).ok_or_else(too_large)?;
        for value in [
            kind.magic(),
            bit_length,
            size(self.public_exp)?,
            modulus,
            size(self.prime1)?,
            size(self.prime2)?,
        ] {
            out.extend_from_slice(&value.to_ne_bytes());
        }
        Ok(())
    }
}

pub(crate) fn read(bytes: &[u8], kind: BCryptBlobKind) -> Result<RsaParameters> {
    let mut reader = ByteReader::new(bytes);
    let header = Header::read(&mut reader, kind)?;

    if header.modulus == 0 {
        return Err(Error::malformed("BCrypt blob has an empty modulus"));
    }

    let expected = header.body_len(kind);
    if expected != reader.remaining() as u64 {
        tracing::debug!(expected, actual = reader.remaining(), "BCrypt blob length mismatch");
        return Err(Error::malformed("BCrypt blob length does not match its header"));
    }

    let mut take =
        |len: usize, what: &str| -> Result<Vec<u8>> { Ok(reader.take(len, what)?.to_vec()) };

    let exponent = take(header.public_exp, "public exponent")?;
    let modulus = take(header.modulus, "modulus")?;
    let mut params = RsaParameters::new_public(modulus, exponent);
    if !kind.has_primes() {
        return Ok(params);
    }

    params.p = Some(take(header.prime1, "prime1")?);
    params.q = Some(take(header.prime2, "prime2")?);
    if kind == BCryptBlobKind::Private {
        return Ok(params);
    }

    params.dp = Some(take(header.prime1, "exponent1")?);
    params.dq = Some(take(header.prime2, "exponent2")?);
    params.inverse_q = Some(take(header.prime1, "coefficient")?);
    params.d = Some(take(header.modulus, "private exponent")?);

    Ok(params)
}

pub(crate) fn write(params: &RsaParameters, kind: BCryptBlobKind) -> Result<Vec<u8>> {
    let exponent = trim_leading_zeros(params.exponent()?);
    let modulus = trim_leading_zeros(params.modulus()?);

    let (p, q) = if kind.has_primes() {
        (
            trim_leading_zeros(required(&params.p, "P")?),
            trim_leading_zeros(required(&params.q, "Q")?),
        )
    } else {
        (&[][..], &[][..])
    };

    let header = Header {
        public_exp: exponent.len(),
        modulus: modulus.len(),
        prime1: p.len(),
        prime2: q.len(),
    };

    let mut out = Vec::with_capacity(HEADER_LEN + header.body_len(kind) as usize);
    header.write(&mut out, kind)?;
    out.extend_from_slice(exponent);
    out.extend_from_slice(modulus);
    out.extend_from_slice(p);
    out.extend_from_slice(q);

    if kind == BCryptBlobKind::FullPrivate {
        let private = params.full_private()?;
        extend_padded(&mut out, private.dp, header.prime1, "DP")?;
        extend_padded(&mut out, private.dq, header.prime2, "DQ")?;
        extend_padded(&mut out, private.inverse_q, header.prime1, "InverseQ")?;
        extend_padded(&mut out, private.d, header.modulus, "D")?;
    }

    Ok(out)
}

/// Left-pads `value` with zeros to exactly `width` bytes.
fn extend_padded(out: &mut Vec<u8>, value: &[u8], width: usize, name: &str) -> Result<()> {
    let value = trim_leading_zeros(value);
    if value.len() > width {
        return Err(Error::invalid_argument(format!(
            "{} is wider than its {} byte slot",
            name, width
        )));
    }
    out.resize(out.len() + width - value.len(), 0);
    out.extend_from_slice(value);
    Ok(())
}
