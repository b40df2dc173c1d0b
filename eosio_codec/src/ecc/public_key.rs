use super::{decode_checked, encode_checked, split_prefixed, Curve, PUBLIC_KEY_LENGTH};
use crate::{
    error::{CodecError, ParseResult},
    serialize::{Buffer, Cursor, Deserial, Serial},
    types::serde_via_string,
};
use std::{fmt, str::FromStr};

/// Prefix of the legacy K1 text form.
pub const LEGACY_PREFIX: &str = "EOS";
const PREFIX: &str = "PUB";

/// A public key tagged with its curve.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PublicKey {
    K1([u8; PUBLIC_KEY_LENGTH]),
    R1([u8; PUBLIC_KEY_LENGTH]),
    /// A WebAuthn key: the point, whether user presence is required, and the
    /// relying party.
    WA {
        key:           [u8; PUBLIC_KEY_LENGTH],
        user_presence: u8,
        rp_id:         String,
    },
}

impl PublicKey {
    pub fn curve(&self) -> Curve {
        match self {
            PublicKey::K1(_) => Curve::K1,
            PublicKey::R1(_) => Curve::R1,
            PublicKey::WA { .. } => Curve::WA,
        }
    }

    /// The curve-specific content, i.e., the binary form without the curve
    /// byte.
    pub fn content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serial_content(&mut out);
        out
    }

    fn serial_content<B: Buffer>(&self, out: &mut B) {
        match self {
            PublicKey::K1(key) | PublicKey::R1(key) => key.serial(out),
            PublicKey::WA {
                key,
                user_presence,
                rp_id,
            } => {
                key.serial(out);
                user_presence.serial(out);
                rp_id.serial(out);
            }
        }
    }

    fn deserial_content(curve: Curve, source: &mut Cursor<'_>) -> ParseResult<Self> {
        Ok(match curve {
            Curve::K1 => PublicKey::K1(source.read_array()?),
            Curve::R1 => PublicKey::R1(source.read_array()?),
            Curve::WA => PublicKey::WA {
                key:           source.read_array()?,
                user_presence: u8::deserial(source)?,
                rp_id:         String::deserial(source)?,
            },
        })
    }

    /// Build a key from its curve and content. The content must be exactly
    /// the size the curve requires.
    pub fn from_parts(curve: Curve, content: &[u8]) -> ParseResult<Self> {
        if curve != Curve::WA && content.len() != PUBLIC_KEY_LENGTH {
            return Err(CodecError::SizeMismatch {
                expected: PUBLIC_KEY_LENGTH,
                actual:   content.len(),
            });
        }
        let mut source = Cursor::new(content);
        let key = Self::deserial_content(curve, &mut source)?;
        if source.has_remaining() {
            return Err(CodecError::SizeMismatch {
                expected: source.position(),
                actual:   content.len(),
            });
        }
        Ok(key)
    }

    /// The `EOS` form. Only K1 keys have one.
    pub fn to_legacy_string(&self) -> ParseResult<String> {
        match self {
            PublicKey::K1(key) => Ok(format!("{}{}", LEGACY_PREFIX, encode_checked(key, None))),
            _ => Err(CodecError::UnsupportedType(format!(
                "{} public keys have no legacy text form",
                self.curve()
            ))),
        }
    }

    /// The `PUB_<CURVE>_` form, checksummed with the curve name.
    pub fn to_canonical_string(&self) -> String {
        let curve = self.curve();
        format!("{}_{}_{}", PREFIX, curve, encode_checked(&self.content(), Some(curve)))
    }
}

/// K1 keys are displayed in the legacy form, others in the canonical form.
impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_legacy_string() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(&self.to_canonical_string()),
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_canonical_string())
    }
}

impl FromStr for PublicKey {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(parts) = split_prefixed(s, PREFIX) {
            let (curve, data) = parts?;
            return Self::from_parts(curve, &decode_checked(data, Some(curve))?);
        }
        match s.strip_prefix(LEGACY_PREFIX) {
            Some(data) => Self::from_parts(Curve::K1, &decode_checked(data, None)?),
            None => Err(CodecError::invalid(format!(
                "public key [{}] should start with {} or {}_",
                s, LEGACY_PREFIX, PREFIX
            ))),
        }
    }
}

impl Serial for PublicKey {
    fn serial<B: Buffer>(&self, out: &mut B) {
        (self.curve() as u8).serial(out);
        self.serial_content(out);
    }
}

impl Deserial for PublicKey {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let curve = Curve::from_byte(source.read_u8()?)?;
        Self::deserial_content(curve, source)
    }
}

serde_via_string!(PublicKey);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    const LEGACY_K1: &str = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
    const CANONICAL_K1: &str = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5BoDq63";
    const K1_CONTENT: &str = "02c0ded2bc1f1305fb0faac5e6c03ee3a1924234985427b6167ca569d13df435cf";

    #[test]
    fn test_k1_text_forms() {
        let legacy: PublicKey = LEGACY_K1.parse().expect("Legacy key should parse.");
        let canonical: PublicKey = CANONICAL_K1.parse().expect("Canonical key should parse.");
        assert_eq!(legacy, canonical);
        assert_eq!(hex::encode(legacy.content()), K1_CONTENT);
        assert_eq!(legacy.to_string(), LEGACY_K1);
        assert_eq!(legacy.to_canonical_string(), CANONICAL_K1);
    }

    #[test]
    fn test_r1_text_form() {
        let text = "PUB_R1_78rbUHSk87e7eCBoccgWUkhNTCZLYdvJzerDRHg6fxj2SQy6Xm";
        let key: PublicKey = text.parse().unwrap();
        assert_eq!(key.curve(), Curve::R1);
        assert_eq!(
            hex::encode(key.content()),
            "03280331d89bdb4a17ea3b30805da6913ab7b5d930d0c45c43b1fc0e0e0f28ac74"
        );
        assert_eq!(key.to_string(), text);
        assert!(key.to_legacy_string().is_err());
    }

    #[test]
    fn test_wa_text_and_binary() {
        let text = "PUB_WA_5hyixc7vkMbKiThWi1TnFtXw7HTDcHfjREj2SzxCtgw3jQGepa5T9VHEy1Tunjzzj";
        let key: PublicKey = text.parse().unwrap();
        match &key {
            PublicKey::WA {
                user_presence,
                rp_id,
                ..
            } => {
                assert_eq!(*user_presence, 1);
                assert_eq!(rp_id, "localhost");
            }
            k => panic!("Expected a WA key, got {:?}", k),
        }
        assert_eq!(key.content().len(), 44);
        assert_eq!(key.to_string(), text);
        let bytes = to_bytes(&key);
        assert_eq!(bytes[0], 2);
        assert_eq!(from_bytes::<PublicKey>(&bytes).unwrap(), key);
    }

    #[test]
    fn test_binary_layout() {
        let key: PublicKey = LEGACY_K1.parse().unwrap();
        let bytes = to_bytes(&key);
        assert_eq!(bytes.len(), 34);
        assert_eq!(bytes[0], 0, "K1 is curve 0.");
        assert_eq!(from_bytes::<PublicKey>(&bytes).unwrap(), key);
        assert!(from_bytes::<PublicKey>(&[7; 34]).is_err(), "Unknown curve byte.");
    }

    #[test]
    fn test_checksum_failure() {
        // Last character changed.
        let bad = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CW";
        assert!(matches!(
            bad.parse::<PublicKey>().unwrap_err(),
            CodecError::ChecksumMismatch { .. }
        ));
        // The unsalted checksum is not accepted for the canonical prefix.
        let unsalted = "PUB_K1_6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
        assert!(matches!(
            unsalted.parse::<PublicKey>().unwrap_err(),
            CodecError::ChecksumMismatch { .. }
        ));
        assert!("XYZ6MRy".parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_from_parts_size() {
        assert!(matches!(
            PublicKey::from_parts(Curve::K1, &[2; 32]).unwrap_err(),
            CodecError::SizeMismatch {
                expected: 33,
                actual:   32,
            }
        ));
    }

    #[test]
    fn test_json() {
        let key: PublicKey = CANONICAL_K1.parse().unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), format!("\"{}\"", LEGACY_K1));
    }
}
