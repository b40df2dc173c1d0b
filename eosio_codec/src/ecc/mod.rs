//! Curve-tagged public keys, signatures and private keys, their binary layout
//! and checksummed text forms, and signing with the curves that have a
//! backing implementation.
use crate::error::{CodecError, ParseResult};
use ripemd::{Digest, Ripemd160};
use std::{fmt, str::FromStr};

mod private_key;
mod public_key;
mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;

/// Length of a compressed secp256k1 or secp256r1 point.
pub const PUBLIC_KEY_LENGTH: usize = 33;
/// Length of a compact signature with its recovery byte.
pub const SIGNATURE_LENGTH: usize = 65;
/// Length of a secret scalar.
pub const PRIVATE_KEY_LENGTH: usize = 32;

const CHECKSUM_LENGTH: usize = 4;

/// Elliptic curve family of a key or signature. The discriminant is the curve
/// byte of the binary form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Curve {
    K1 = 0,
    R1 = 1,
    WA = 2,
}

impl Curve {
    pub fn as_str(self) -> &'static str {
        match self {
            Curve::K1 => "K1",
            Curve::R1 => "R1",
            Curve::WA => "WA",
        }
    }

    pub fn from_byte(b: u8) -> ParseResult<Self> {
        match b {
            0 => Ok(Curve::K1),
            1 => Ok(Curve::R1),
            2 => Ok(Curve::WA),
            _ => Err(CodecError::invalid(format!("unknown curve identifier {}", b))),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Curve {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "K1" => Ok(Curve::K1),
            "R1" => Ok(Curve::R1),
            "WA" => Ok(Curve::WA),
            _ => Err(CodecError::invalid(format!("unknown curve [{}]", s))),
        }
    }
}

/// First four bytes of RIPEMD-160 over the content, optionally followed by the
/// ASCII curve name.
fn ripemd160_checksum(content: &[u8], salt: Option<Curve>) -> [u8; CHECKSUM_LENGTH] {
    let mut hasher = Ripemd160::new();
    hasher.update(content);
    if let Some(curve) = salt {
        hasher.update(curve.as_str().as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LENGTH];
    out.copy_from_slice(&digest[..CHECKSUM_LENGTH]);
    out
}

/// Base58 of the content followed by its checksum.
pub(crate) fn encode_checked(content: &[u8], salt: Option<Curve>) -> String {
    let mut data = Vec::with_capacity(content.len() + CHECKSUM_LENGTH);
    data.extend_from_slice(content);
    data.extend_from_slice(&ripemd160_checksum(content, salt));
    bs58::encode(data).into_string()
}

/// Inverse of [encode_checked]. Returns the content without the checksum.
pub(crate) fn decode_checked(text: &str, salt: Option<Curve>) -> ParseResult<Vec<u8>> {
    let mut data = bs58::decode(text).into_vec()?;
    if data.len() < CHECKSUM_LENGTH {
        return Err(CodecError::SizeMismatch {
            expected: CHECKSUM_LENGTH,
            actual:   data.len(),
        });
    }
    let split = data.len() - CHECKSUM_LENGTH;
    let mut actual = [0u8; CHECKSUM_LENGTH];
    actual.copy_from_slice(&data[split..]);
    let expected = ripemd160_checksum(&data[..split], salt);
    if expected != actual {
        return Err(CodecError::ChecksumMismatch {
            expected,
            actual,
        });
    }
    data.truncate(split);
    Ok(data)
}

/// Split `<PREFIX>_<CURVE>_<data>` into the curve and the data.
pub(crate) fn split_prefixed<'a>(text: &'a str, prefix: &str) -> Option<ParseResult<(Curve, &'a str)>> {
    let rest = text.strip_prefix(prefix)?.strip_prefix('_')?;
    Some(match rest.split_once('_') {
        Some((curve, data)) => curve.parse().map(|c| (c, data)),
        None => Err(CodecError::invalid(format!("missing curve in [{}]", text))),
    })
}

/// Sign a 32-byte digest. Only K1 keys can sign.
pub fn sign(curve: Curve, private_key: &PrivateKey, digest: &[u8; 32]) -> ParseResult<Signature> {
    if curve != private_key.curve() {
        return Err(CodecError::invalid(format!(
            "cannot sign with a {} key on curve {}",
            private_key.curve(),
            curve
        )));
    }
    private_key.sign(digest)
}

/// Check that the signature over the digest was produced by the public key.
pub fn verify(signature: &Signature, digest: &[u8; 32], public_key: &PublicKey) -> ParseResult<bool> {
    signature.verify(digest, public_key)
}

/// Recover the public key that produced the signature over the digest.
pub fn recover(signature: &Signature, digest: &[u8; 32]) -> ParseResult<PublicKey> {
    signature.recover(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_salting() {
        let content =
            hex::decode("02c0ded2bc1f1305fb0faac5e6c03ee3a1924234985427b6167ca569d13df435cf")
                .unwrap();
        assert_eq!(hex::encode(ripemd160_checksum(&content, None)), "eb05f9d2");
        assert_ne!(
            ripemd160_checksum(&content, None),
            ripemd160_checksum(&content, Some(Curve::K1)),
            "Salting must change the checksum."
        );
        let text = encode_checked(&content, Some(Curve::K1));
        assert_eq!(decode_checked(&text, Some(Curve::K1)).unwrap(), content);
        assert!(matches!(
            decode_checked(&text, None).unwrap_err(),
            CodecError::ChecksumMismatch { .. }
        ));
    }

    #[test]
    fn test_not_base58() {
        assert!(matches!(decode_checked("0OIl", None).unwrap_err(), CodecError::Base58(_)));
    }

    #[test]
    fn test_split_prefixed() {
        let (curve, data) = split_prefixed("PUB_R1_abc", "PUB").unwrap().unwrap();
        assert_eq!(curve, Curve::R1);
        assert_eq!(data, "abc");
        assert!(split_prefixed("EOS123", "PUB").is_none());
        assert!(split_prefixed("PUB_X9_abc", "PUB").unwrap().is_err());
    }
}
