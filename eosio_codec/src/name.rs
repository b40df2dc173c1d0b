//! Account, action, table and permission identifiers.
//!
//! A name is a 64-bit integer that is simultaneously a base-32 string over
//! the alphabet `.12345abcdefghijklmnopqrstuvwxyz`. The first twelve
//! characters take five bits each, starting at the most significant end, and
//! a thirteenth character takes the remaining four bits.
use crate::{
    error::{CodecError, ParseResult},
    serialize::{Buffer, Cursor, Deserial, Serial},
};
use std::{convert::Infallible, fmt, str::FromStr};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Maximum number of characters that contribute to a name.
pub const MAX_NAME_LENGTH: usize = 13;

fn char_to_symbol(c: u8) -> u64 {
    match c {
        b'a'..=b'z' => u64::from(c - b'a') + 6,
        b'1'..=b'5' => u64::from(c - b'1') + 1,
        _ => 0,
    }
}

/// Pack a string into its 64-bit name value. Characters outside the alphabet
/// are mapped to `.`, and characters past the thirteenth are ignored.
pub fn string_to_name(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut name = 0u64;
    for i in 0..MAX_NAME_LENGTH {
        let mut c = bytes.get(i).copied().map_or(0, char_to_symbol);
        if i < MAX_NAME_LENGTH - 1 {
            c &= 0x1f;
            c <<= 64 - 5 * (i + 1);
        } else {
            c &= 0x0f;
        }
        name |= c;
    }
    name
}

/// Render a 64-bit name value, dropping trailing dots.
pub fn name_to_string(value: u64) -> String {
    let mut out = [b'.'; MAX_NAME_LENGTH];
    let mut tmp = value;
    for i in 0..MAX_NAME_LENGTH {
        let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
        out[MAX_NAME_LENGTH - 1 - i] = CHARMAP[(tmp & mask) as usize];
        tmp >>= shift;
    }
    let len = out.iter().rposition(|&c| c != b'.').map_or(0, |p| p + 1);
    // Only ASCII characters from CHARMAP are ever written.
    out[..len].iter().map(|&c| c as char).collect()
}

/// A name in its packed form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name(pub u64);

impl Name {
    pub const fn new(value: u64) -> Self { Name(value) }

    pub const fn value(self) -> u64 { self.0 }

    /// Parse a name, rejecting any input that would not survive a round trip
    /// through the packed form.
    pub fn from_str_strict(s: &str) -> ParseResult<Self> {
        if s.len() > MAX_NAME_LENGTH {
            return Err(CodecError::invalid(format!(
                "name [{}] is longer than {} characters",
                s,
                MAX_NAME_LENGTH
            )));
        }
        for (i, c) in s.bytes().enumerate() {
            let allowed = if i == MAX_NAME_LENGTH - 1 {
                matches!(c, b'.' | b'1'..=b'5' | b'a'..=b'j')
            } else {
                CHARMAP.contains(&c)
            };
            if !allowed {
                return Err(CodecError::invalid(format!(
                    "name [{}] contains invalid character {:?} at position {}",
                    s, c as char, i
                )));
            }
        }
        Ok(Name(string_to_name(s)))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&name_to_string(self.0)) }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Name({})", self) }
}

/// Lossy parsing, see [string_to_name].
impl FromStr for Name {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Name(string_to_name(s))) }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self { Name(string_to_name(s)) }
}

impl From<u64> for Name {
    fn from(v: u64) -> Self { Name(v) }
}

impl From<Name> for u64 {
    fn from(n: Name) -> Self { n.0 }
}

impl Serial for Name {
    fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
}

impl Deserial for Name {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(Name(u64::deserial(source)?)) }
}

impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        let s = String::deserialize(des)?;
        Ok(Name::from(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn test_known_names() {
        assert_eq!(string_to_name("eosio"), 6138663577826885632);
        assert_eq!(string_to_name("eosio.token"), 0x5530ea033482a600);
        assert_eq!(name_to_string(0x5530ea033482a600), "eosio.token");
        assert_eq!(string_to_name("active"), 0x3232eda800000000);
        assert_eq!(name_to_string(0), "");
        assert_eq!(name_to_string(u64::MAX), "zzzzzzzzzzzzj");
    }

    #[test]
    fn test_lossy_names() {
        // Upper case characters are not in the alphabet.
        assert_eq!(name_to_string(string_to_name("Hello")), ".ello");
        // Only 13 characters contribute and the last one has four bits.
        assert_eq!(name_to_string(string_to_name("abcdefghijklmnop")), "abcdefghijkl2");
        assert_eq!(name_to_string(string_to_name("exampleexample")), "exampleexamp1");
    }

    #[test]
    fn test_strict_parsing() {
        assert_eq!(Name::from_str_strict("eosio.token").unwrap(), Name(0x5530ea033482a600));
        assert!(Name::from_str_strict("Hello").is_err());
        assert!(Name::from_str_strict("abcdefghijklmnop").is_err());
        assert!(Name::from_str_strict("abcdefghijklz").is_err(), "13th character out of range.");
        assert!(Name::from_str_strict("abcdefghijklj").is_ok());
    }

    #[test]
    fn test_name_binary_and_json() {
        let name = Name::from("eosio");
        assert_eq!(to_bytes(&name), 6138663577826885632u64.to_le_bytes().to_vec());
        assert_eq!(from_bytes::<Name>(&to_bytes(&name)).unwrap(), name);
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"eosio\"");
        let parsed: Name = serde_json::from_str("\"eosio\"").unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_name_string_roundtrip_prop() {
        // Rendering is canonical: parsing a rendered name gives back the value.
        let prop = |v: u64| -> TestResult {
            TestResult::from_bool(string_to_name(&name_to_string(v)) == v)
        };
        QuickCheck::new().tests(1000).quickcheck(prop as fn(u64) -> TestResult);
    }
}
