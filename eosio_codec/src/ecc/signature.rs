use super::{decode_checked, encode_checked, split_prefixed, Curve, PublicKey, SIGNATURE_LENGTH};
use crate::{
    error::{CodecError, ParseResult},
    serialize::{Buffer, Cursor, Deserial, Serial},
    types::{serde_via_string, Bytes},
};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, Secp256k1,
};
use std::{fmt, str::FromStr};

const PREFIX: &str = "SIG";

/// Offset added to the recovery id in the first byte of a compact signature,
/// marking a compressed public key.
pub(crate) const COMPACT_RECOVERY_OFFSET: u8 = 27 + 4;

/// A signature tagged with its curve.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    K1([u8; SIGNATURE_LENGTH]),
    R1([u8; SIGNATURE_LENGTH]),
    /// A WebAuthn assertion: the compact signature, the authenticator data and
    /// the client data JSON.
    WA {
        compact:     [u8; SIGNATURE_LENGTH],
        auth_data:   Vec<u8>,
        client_json: String,
    },
}

impl Signature {
    pub fn curve(&self) -> Curve {
        match self {
            Signature::K1(_) => Curve::K1,
            Signature::R1(_) => Curve::R1,
            Signature::WA { .. } => Curve::WA,
        }
    }

    pub fn content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serial_content(&mut out);
        out
    }

    fn serial_content<B: Buffer>(&self, out: &mut B) {
        match self {
            Signature::K1(sig) | Signature::R1(sig) => sig.serial(out),
            Signature::WA {
                compact,
                auth_data,
                client_json,
            } => {
                compact.serial(out);
                auth_data.serial(out);
                client_json.serial(out);
            }
        }
    }

    fn deserial_content(curve: Curve, source: &mut Cursor<'_>) -> ParseResult<Self> {
        Ok(match curve {
            Curve::K1 => Signature::K1(source.read_array()?),
            Curve::R1 => Signature::R1(source.read_array()?),
            Curve::WA => Signature::WA {
                compact:     source.read_array()?,
                auth_data:   Bytes::deserial(source)?.into(),
                client_json: String::deserial(source)?,
            },
        })
    }

    pub fn from_parts(curve: Curve, content: &[u8]) -> ParseResult<Self> {
        if curve != Curve::WA && content.len() != SIGNATURE_LENGTH {
            return Err(CodecError::SizeMismatch {
                expected: SIGNATURE_LENGTH,
                actual:   content.len(),
            });
        }
        let mut source = Cursor::new(content);
        let sig = Self::deserial_content(curve, &mut source)?;
        if source.has_remaining() {
            return Err(CodecError::SizeMismatch {
                expected: source.position(),
                actual:   content.len(),
            });
        }
        Ok(sig)
    }

    fn k1_recoverable(compact: &[u8; SIGNATURE_LENGTH]) -> ParseResult<RecoverableSignature> {
        let header = compact[0];
        let recid = if header >= COMPACT_RECOVERY_OFFSET {
            header - COMPACT_RECOVERY_OFFSET
        } else {
            header.wrapping_sub(27)
        };
        let recid = RecoveryId::from_i32(i32::from(recid))?;
        Ok(RecoverableSignature::from_compact(&compact[1..], recid)?)
    }

    fn unsupported(&self, operation: &str) -> CodecError {
        CodecError::UnsupportedType(format!("{} is not implemented for {} signatures", operation, self.curve()))
    }

    /// Recover the signer's public key from a signature over `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> ParseResult<PublicKey> {
        match self {
            Signature::K1(compact) => {
                let sig = Self::k1_recoverable(compact)?;
                let msg = Message::from_slice(digest)?;
                let key = Secp256k1::verification_only().recover_ecdsa(&msg, &sig)?;
                Ok(PublicKey::K1(key.serialize()))
            }
            _ => Err(self.unsupported("recovery")),
        }
    }

    /// Check that `public_key` signed `digest`.
    pub fn verify(&self, digest: &[u8; 32], public_key: &PublicKey) -> ParseResult<bool> {
        match (self, public_key) {
            (Signature::K1(compact), PublicKey::K1(key)) => {
                let sig = Self::k1_recoverable(compact)?.to_standard();
                let msg = Message::from_slice(digest)?;
                let key = secp256k1::PublicKey::from_slice(key)?;
                Ok(Secp256k1::verification_only().verify_ecdsa(&msg, &sig, &key).is_ok())
            }
            (Signature::K1(_), _) => Ok(false),
            _ => Err(self.unsupported("verification")),
        }
    }
}

/// Signatures are always displayed in the curve-salted `SIG_<CURVE>_` form.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let curve = self.curve();
        write!(f, "{}_{}_{}", PREFIX, curve, encode_checked(&self.content(), Some(curve)))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Signature({})", self) }
}

impl FromStr for Signature {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (curve, data) = split_prefixed(s, PREFIX)
            .ok_or_else(|| CodecError::invalid(format!("signature [{}] should start with {}_", s, PREFIX)))??;
        Self::from_parts(curve, &decode_checked(data, Some(curve))?)
    }
}

impl Serial for Signature {
    fn serial<B: Buffer>(&self, out: &mut B) {
        (self.curve() as u8).serial(out);
        self.serial_content(out);
    }
}

impl Deserial for Signature {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let curve = Curve::from_byte(source.read_u8()?)?;
        Self::deserial_content(curve, source)
    }
}

serde_via_string!(Signature);
