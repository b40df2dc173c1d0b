use super::{
    decode_checked, encode_checked, signature::COMPACT_RECOVERY_OFFSET, split_prefixed, Curve, PublicKey,
    Signature, PRIVATE_KEY_LENGTH, SIGNATURE_LENGTH,
};
use crate::{
    error::{CodecError, ParseResult},
    types::serde_via_string,
};
use log::trace;
use secp256k1::{ecdsa::RecoverableSignature, ffi, Secp256k1, SecretKey, SignOnly};
use std::{fmt, ptr, str::FromStr};

const PREFIX: &str = "PVT";
/// Version byte of the legacy wallet import format.
const WIF_VERSION: u8 = 0x80;

/// A secret scalar tagged with its curve.
#[derive(Clone, PartialEq, Eq)]
pub enum PrivateKey {
    K1([u8; PRIVATE_KEY_LENGTH]),
    R1([u8; PRIVATE_KEY_LENGTH]),
}

impl PrivateKey {
    pub fn curve(&self) -> Curve {
        match self {
            PrivateKey::K1(_) => Curve::K1,
            PrivateKey::R1(_) => Curve::R1,
        }
    }

    pub fn secret(&self) -> &[u8; PRIVATE_KEY_LENGTH] {
        match self {
            PrivateKey::K1(s) | PrivateKey::R1(s) => s,
        }
    }

    fn from_parts(curve: Curve, content: &[u8]) -> ParseResult<Self> {
        let secret: [u8; PRIVATE_KEY_LENGTH] =
            content.try_into().map_err(|_| CodecError::SizeMismatch {
                expected: PRIVATE_KEY_LENGTH,
                actual:   content.len(),
            })?;
        match curve {
            Curve::K1 => Ok(PrivateKey::K1(secret)),
            Curve::R1 => Ok(PrivateKey::R1(secret)),
            Curve::WA => Err(CodecError::UnsupportedType("WA private keys do not exist".into())),
        }
    }

    fn unsupported(&self, operation: &str) -> CodecError {
        CodecError::UnsupportedType(format!("{} is not implemented for {} keys", operation, self.curve()))
    }

    fn k1_secret(&self, operation: &str) -> ParseResult<SecretKey> {
        match self {
            PrivateKey::K1(secret) => Ok(SecretKey::from_slice(secret)?),
            _ => Err(self.unsupported(operation)),
        }
    }

    pub fn public_key(&self) -> ParseResult<PublicKey> {
        let secret = self.k1_secret("public key derivation")?;
        let key = secp256k1::PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(PublicKey::K1(key.serialize()))
    }

    /// Produce a compact recoverable signature over a 32-byte digest.
    ///
    /// nodeos only accepts canonical signatures, so signing is retried with
    /// an attempt counter as extra RFC 6979 nonce data until the result is
    /// canonical. The first attempt uses no extra data.
    pub fn sign(&self, digest: &[u8; 32]) -> ParseResult<Signature> {
        let secret = self.k1_secret("signing")?;
        let secp = Secp256k1::signing_only();
        for attempt in 0u32..=u32::MAX {
            let mut extra = [0u8; 32];
            extra[..4].copy_from_slice(&attempt.to_le_bytes());
            let nonce_data = if attempt == 0 {
                None
            } else {
                Some(&extra)
            };
            let (recid, rs) = sign_recoverable(&secp, &secret, digest, nonce_data)?.serialize_compact();
            if !is_canonical(&rs) {
                trace!("signature attempt {} is not canonical", attempt);
                continue;
            }
            let mut compact = [0u8; SIGNATURE_LENGTH];
            compact[0] = recid.to_i32() as u8 + COMPACT_RECOVERY_OFFSET;
            compact[1..].copy_from_slice(&rs);
            return Ok(Signature::K1(compact));
        }
        Err(CodecError::invalid("no canonical signature found"))
    }

    /// The legacy wallet import format. Only K1 keys have one.
    pub fn to_wif(&self) -> ParseResult<String> {
        match self {
            PrivateKey::K1(secret) => Ok(bs58::encode(secret).with_check_version(WIF_VERSION).into_string()),
            _ => Err(self.unsupported("wallet import format")),
        }
    }

    pub fn from_wif(wif: &str) -> ParseResult<Self> {
        let data = bs58::decode(wif).with_check(Some(WIF_VERSION)).into_vec().map_err(|e| match e {
            bs58::decode::Error::InvalidChecksum {
                checksum,
                expected_checksum,
            } => CodecError::ChecksumMismatch {
                expected: expected_checksum,
                actual:   checksum,
            },
            e => CodecError::Base58(e),
        })?;
        // Version byte, secret, and an optional compression flag.
        match data.len() {
            33 | 34 => Self::from_parts(Curve::K1, &data[1..33]),
            n => Err(CodecError::SizeMismatch {
                expected: 1 + PRIVATE_KEY_LENGTH,
                actual:   n,
            }),
        }
    }

    /// The `PVT_<CURVE>_` form.
    pub fn to_canonical_string(&self) -> String {
        let curve = self.curve();
        format!("{}_{}_{}", PREFIX, curve, encode_checked(self.secret(), Some(curve)))
    }
}

/// K1 keys are displayed in the wallet import format.
impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_wif() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(&self.to_canonical_string()),
        }
    }
}

/// Whether nodeos accepts a compact `r ‖ s`: neither half has its high bit
/// set, and a leading zero byte is only allowed before a byte with the high
/// bit set.
pub(crate) fn is_canonical(rs: &[u8; 64]) -> bool {
    let half = |h: &[u8]| h[0] & 0x80 == 0 && !(h[0] == 0 && h[1] & 0x80 == 0);
    half(&rs[..32]) && half(&rs[32..])
}

/// RFC 6979 recoverable signing with optional extra nonce data, which the
/// safe `secp256k1` API of this version does not expose.
fn sign_recoverable(
    secp: &Secp256k1<SignOnly>,
    secret: &SecretKey,
    digest: &[u8; 32],
    nonce_data: Option<&[u8; 32]>,
) -> ParseResult<RecoverableSignature> {
    let mut sig = ffi::recovery::RecoverableSignature::new();
    let data = nonce_data.map_or(ptr::null(), |d| d.as_ptr() as *const ffi::types::c_void);
    // SAFETY: every pointer refers to a live buffer of the length libsecp256k1
    // reads, and the context was created for signing.
    let ok = unsafe {
        ffi::recovery::secp256k1_ecdsa_sign_recoverable(
            *secp.ctx(),
            &mut sig,
            digest.as_ptr(),
            secret.as_ptr(),
            ffi::secp256k1_nonce_function_rfc6979,
            data,
        )
    };
    if ok != 1 {
        return Err(CodecError::Crypto(secp256k1::Error::InvalidSecretKey));
    }
    Ok(RecoverableSignature::from(sig))
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "PrivateKey({}, <hidden>)", self.curve()) }
}

impl FromStr for PrivateKey {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_prefixed(s, PREFIX) {
            Some(parts) => {
                let (curve, data) = parts?;
                Self::from_parts(curve, &decode_checked(data, Some(curve))?)
            }
            None => Self::from_wif(s),
        }
    }
}

serde_via_string!(PrivateKey);
