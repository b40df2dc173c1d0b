//! Leaf types of the wire format: checksums, byte blobs, timestamps, symbols
//! and assets.
use crate::{
    error::{CodecError, ParseResult},
    name::Name,
    serialize::{write_length, Buffer, Cursor, Deserial, Serial},
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::{fmt, str::FromStr};

/// Implement serde via the `Display` and `FromStr` instances of the type.
macro_rules! serde_via_string {
    ($t:ty) => {
        impl serde::Serialize for $t {
            fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
                ser.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $t {
            fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
                let s = String::deserialize(des)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use serde_via_string;

macro_rules! checksum_type {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            /// Construct from a slice of at most the checksum length,
            /// zero-filling the missing trailing bytes.
            pub fn from_slice(bytes: &[u8]) -> ParseResult<Self> {
                if bytes.len() > $len {
                    return Err(CodecError::SizeMismatch {
                        expected: $len,
                        actual:   bytes.len(),
                    });
                }
                let mut out = [0u8; $len];
                out[..bytes.len()].copy_from_slice(bytes);
                Ok($name(out))
            }

            pub fn as_bytes(&self) -> &[u8] { &self.0 }
        }

        impl Default for $name {
            fn default() -> Self { $name([0u8; $len]) }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        /// Parse exactly `2 * LEN` hex digits.
        impl FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != 2 * $len {
                    return Err(CodecError::SizeMismatch {
                        expected: 2 * $len,
                        actual:   s.len(),
                    });
                }
                let mut out = [0u8; $len];
                hex::decode_to_slice(s, &mut out)?;
                Ok($name(out))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self { $name(bytes) }
        }

        impl Serial for $name {
            fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
        }

        impl Deserial for $name {
            fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
                Ok($name(source.read_array()?))
            }
        }

        serde_via_string!($name);
    };
}

checksum_type!(Checksum160, 20);
checksum_type!(Checksum256, 32);
checksum_type!(Checksum512, 64);

/// A length-prefixed byte blob, rendered as hex.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, derive_more::From, derive_more::Into)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&hex::encode(&self.0)) }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Bytes({})", self) }
}

impl FromStr for Bytes {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Bytes(hex::decode(s)?)) }
}

impl Serial for Bytes {
    fn serial<B: Buffer>(&self, out: &mut B) {
        write_length(out, self.0.len());
        self.0.as_slice().serial(out)
    }
}

impl Deserial for Bytes {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let len = source.read_length()?;
        Ok(Bytes(source.read_bytes(len)?.to_vec()))
    }
}

serde_via_string!(Bytes);

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z, the epoch of block
/// timestamps.
pub const YEAR_2000_EPOCH_SECS: i64 = 946_684_800;
const YEAR_2000_EPOCH_MILLIS: i64 = YEAR_2000_EPOCH_SECS * 1000;
/// Length of a block slot in milliseconds.
pub const BLOCK_INTERVAL_MS: i64 = 500;

const SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a timestamp of the form `2006-01-02T15:04:05[.fff][Z|+hh:mm]`.
pub(crate) fn parse_datetime(s: &str) -> ParseResult<DateTime<Utc>> {
    let trimmed = s.strip_suffix('Z').unwrap_or(s);
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CodecError::invalid(format!("invalid time [{}]: {}", s, e)))
}

fn datetime_from_micros(micros: i64) -> ParseResult<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| CodecError::invalid(format!("time out of range: {} microseconds", micros)))
}

/// Render with millisecond precision. Unless `fixed_millis` is set, trailing
/// zeros of the fraction and a zero fraction are omitted.
fn format_millis(dt: &DateTime<Utc>, fixed_millis: bool) -> String {
    let base = dt.format(SECONDS_FORMAT).to_string();
    let millis = dt.timestamp_subsec_millis();
    if fixed_millis {
        format!("{}.{:03}", base, millis)
    } else if millis == 0 {
        base
    } else {
        let frac = format!("{:03}", millis);
        format!("{}.{}", base, frac.trim_end_matches('0'))
    }
}

/// Microseconds since the Unix epoch.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, derive_more::From, derive_more::Into,
)]
pub struct TimePoint(pub u64);

impl TimePoint {
    pub fn from_datetime(dt: &DateTime<Utc>) -> ParseResult<Self> {
        u64::try_from(dt.timestamp_micros())
            .map(TimePoint)
            .map_err(|_| CodecError::invalid(format!("time [{}] is before the epoch", dt)))
    }

    pub fn to_datetime(self) -> ParseResult<DateTime<Utc>> {
        let micros = i64::try_from(self.0)
            .map_err(|_| CodecError::invalid(format!("time out of range: {}", self.0)))?;
        datetime_from_micros(micros)
    }

    /// Text form. With `fit_nodeos` the fraction always has three digits.
    pub fn format(self, fit_nodeos: bool) -> ParseResult<String> {
        Ok(format_millis(&self.to_datetime()?, fit_nodeos))
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format(false) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for TimePoint {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { TimePoint::from_datetime(&parse_datetime(s)?) }
}

impl Serial for TimePoint {
    fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
}

impl Deserial for TimePoint {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(TimePoint(u64::deserial(source)?)) }
}

serde_via_string!(TimePoint);

/// Seconds since the Unix epoch.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, derive_more::From, derive_more::Into,
)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub fn from_datetime(dt: &DateTime<Utc>) -> ParseResult<Self> {
        u32::try_from(dt.timestamp())
            .map(TimePointSec)
            .map_err(|_| CodecError::invalid(format!("time [{}] does not fit in 32 bits", dt)))
    }

    pub fn to_datetime(self) -> ParseResult<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(i64::from(self.0), 0)
            .ok_or_else(|| CodecError::invalid(format!("time out of range: {}", self.0)))
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Ok(dt) => write!(f, "{}", dt.format(SECONDS_FORMAT)),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for TimePointSec {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimePointSec::from_datetime(&parse_datetime(s)?)
    }
}

impl Serial for TimePointSec {
    fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
}

impl Deserial for TimePointSec {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(TimePointSec(u32::deserial(source)?)) }
}

serde_via_string!(TimePointSec);

/// Number of half-second block slots since 2000-01-01T00:00:00Z.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, derive_more::From, derive_more::Into,
)]
pub struct BlockTimestamp(pub u32);

impl BlockTimestamp {
    /// The slot containing the given time. Sub-slot precision is truncated.
    pub fn from_datetime(dt: &DateTime<Utc>) -> ParseResult<Self> {
        let slot = (dt.timestamp_millis() - YEAR_2000_EPOCH_MILLIS).div_euclid(BLOCK_INTERVAL_MS);
        u32::try_from(slot)
            .map(BlockTimestamp)
            .map_err(|_| CodecError::invalid(format!("time [{}] is not a valid block slot", dt)))
    }

    pub fn to_datetime(self) -> ParseResult<DateTime<Utc>> {
        let millis = i64::from(self.0) * BLOCK_INTERVAL_MS + YEAR_2000_EPOCH_MILLIS;
        datetime_from_micros(millis * 1000)
    }

    /// Text form as for [`TimePoint::format`].
    pub fn format(self, fit_nodeos: bool) -> ParseResult<String> {
        Ok(format_millis(&self.to_datetime()?, fit_nodeos))
    }
}

impl fmt::Display for BlockTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Ok(dt) => f.write_str(&format_millis(&dt, true)),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for BlockTimestamp {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockTimestamp::from_datetime(&parse_datetime(s)?)
    }
}

impl Serial for BlockTimestamp {
    fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
}

impl Deserial for BlockTimestamp {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(BlockTimestamp(u32::deserial(source)?)) }
}

serde_via_string!(BlockTimestamp);

/// Nanoseconds since the Unix epoch, as used by the peer protocol.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, derive_more::From, derive_more::Into,
)]
pub struct Tstamp(pub u64);

impl Tstamp {
    pub fn from_datetime(dt: &DateTime<Utc>) -> ParseResult<Self> {
        dt.timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .map(Tstamp)
            .ok_or_else(|| CodecError::invalid(format!("time [{}] out of range", dt)))
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        let secs = (self.0 / 1_000_000_000) as i64;
        let nanos = (self.0 % 1_000_000_000) as u32;
        // Any u64 nanosecond count is within chrono's range.
        Utc.timestamp_opt(secs, nanos).single().unwrap_or_default()
    }
}

/// The decimal nanosecond count.
impl fmt::Display for Tstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for Tstamp {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Tstamp)
            .map_err(|e| CodecError::invalid(format!("invalid tstamp [{}]: {}", s, e)))
    }
}

impl Serial for Tstamp {
    fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
}

impl Deserial for Tstamp {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(Tstamp(u64::deserial(source)?)) }
}

serde_via_string!(Tstamp);

/// Maximum length of a symbol code.
pub const MAX_SYMBOL_CODE_LENGTH: usize = 7;

/// Up to seven upper-case letters packed little-endian into a `u64`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct SymbolCode(pub u64);

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut code = self.0;
        for _ in 0..MAX_SYMBOL_CODE_LENGTH {
            if code == 0 {
                break;
            }
            write!(f, "{}", (code & 0xff) as u8 as char)?;
            code >>= 8;
        }
        Ok(())
    }
}

impl FromStr for SymbolCode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_SYMBOL_CODE_LENGTH {
            return Err(CodecError::invalid(format!(
                "symbol code [{}] is longer than {} characters",
                s, MAX_SYMBOL_CODE_LENGTH
            )));
        }
        let mut code = 0u64;
        for c in s.bytes().rev() {
            if !c.is_ascii_uppercase() {
                return Err(CodecError::invalid(format!(
                    "only uppercase letters allowed in symbol code [{}]",
                    s
                )));
            }
            code = (code << 8) | u64::from(c);
        }
        Ok(SymbolCode(code))
    }
}

impl Serial for SymbolCode {
    fn serial<B: Buffer>(&self, out: &mut B) { self.0.serial(out) }
}

impl Deserial for SymbolCode {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(SymbolCode(u64::deserial(source)?)) }
}

serde_via_string!(SymbolCode);

/// A currency symbol: a precision and a code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Symbol {
    pub precision: u8,
    pub code:      SymbolCode,
}

impl Symbol {
    pub fn new(precision: u8, code: &str) -> ParseResult<Self> {
        Ok(Symbol {
            precision,
            code: code.parse()?,
        })
    }

    /// The packed form: precision in the low byte, the code above it.
    pub fn value(&self) -> u64 { (self.code.0 << 8) | u64::from(self.precision) }

    pub fn from_value(value: u64) -> Self {
        Symbol {
            precision: (value & 0xff) as u8,
            code:      SymbolCode(value >> 8),
        }
    }
}

/// Rendered as `precision,CODE`, e.g., `4,EOS`.
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{},{}", self.precision, self.code) }
}

impl FromStr for Symbol {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| CodecError::invalid(format!("symbol [{}] should be of format '4,EOS'", s)))?;
        let precision = precision
            .parse::<u8>()
            .map_err(|e| CodecError::invalid(format!("symbol [{}] precision: {}", s, e)))?;
        if code.is_empty() {
            return Err(CodecError::invalid(format!("symbol [{}] has an empty code", s)));
        }
        Symbol::new(precision, code)
    }
}

impl Serial for Symbol {
    fn serial<B: Buffer>(&self, out: &mut B) { self.value().serial(out) }
}

impl Deserial for Symbol {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(Symbol::from_value(u64::deserial(source)?)) }
}

serde_via_string!(Symbol);

/// An amount of a currency. The amount is in units of `10^-precision`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

fn split_asset(input: &str) -> ParseResult<(&str, &str, &str)> {
    let input = input.trim_matches(' ');
    if input.is_empty() {
        return Err(CodecError::invalid("asset cannot be empty"));
    }
    let parts: Vec<&str> = input.split(' ').collect();
    let (amount, code) = match parts.as_slice() {
        [amount] => (*amount, ""),
        [amount, code] => (*amount, *code),
        _ => {
            return Err(CodecError::invalid(format!(
                "invalid asset [{}], expecting an amount alone or an amount and a currency symbol",
                input
            )))
        }
    };
    if code.len() > MAX_SYMBOL_CODE_LENGTH {
        return Err(CodecError::invalid(format!(
            "invalid asset [{}], symbol should have at most {} characters",
            input, MAX_SYMBOL_CODE_LENGTH
        )));
    }
    let (integral, decimal) = match amount.split_once('.') {
        None => (amount, ""),
        Some((_, d)) if d.contains('.') => {
            return Err(CodecError::invalid(format!(
                "invalid asset amount [{}], expected at most a single dot",
                amount
            )))
        }
        Some((i, d)) => (i, d),
    };
    if decimal.len() > usize::from(u8::MAX) {
        return Err(CodecError::invalid(format!("invalid asset amount precision [{}]", amount)));
    }
    Ok((integral, decimal, code))
}

fn parse_amount(integral: &str, decimal: &str) -> ParseResult<i64> {
    let digits = format!("{}{}", integral, decimal);
    digits
        .parse::<i64>()
        .map_err(|e| CodecError::invalid(format!("invalid asset amount [{}.{}]: {}", integral, decimal, e)))
}

impl Asset {
    /// Parse an amount against a known symbol. The fractional part is padded
    /// to the symbol's precision; more digits than that, or a different code,
    /// are rejected.
    pub fn from_str_with_symbol(symbol: Symbol, input: &str) -> ParseResult<Self> {
        let (integral, decimal, code) = split_asset(input)?;
        let precision = usize::from(symbol.precision);
        if decimal.len() > precision {
            return Err(CodecError::invalid(format!(
                "symbol {} precision mismatch: expected {}, got {}",
                symbol,
                precision,
                decimal.len()
            )));
        }
        if !code.is_empty() && code != symbol.code.to_string() {
            return Err(CodecError::invalid(format!(
                "symbol {} code mismatch: got {}",
                symbol, code
            )));
        }
        let padded = format!("{:0<width$}", decimal, width = precision);
        Ok(Asset {
            amount: parse_amount(integral, &padded)?,
            symbol,
        })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = usize::from(self.symbol.precision);
        let digits = format!("{:0>width$}", self.amount.unsigned_abs(), width = precision + 1);
        let sign = if self.amount < 0 { "-" } else { "" };
        if precision > 0 {
            let (int_part, frac_part) = digits.split_at(digits.len() - precision);
            write!(f, "{}{}.{} {}", sign, int_part, frac_part, self.symbol.code)
        } else {
            write!(f, "{}{} {}", sign, digits, self.symbol.code)
        }
    }
}

/// Parse `1.0000 EOS`. The precision is the number of fractional digits.
impl FromStr for Asset {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (integral, decimal, code) = split_asset(s)?;
        if code.is_empty() {
            return Err(CodecError::invalid(format!(
                "invalid asset [{}], expected an amount and a currency symbol",
                s
            )));
        }
        Ok(Asset {
            amount: parse_amount(integral, decimal)?,
            symbol: Symbol {
                precision: decimal.len() as u8,
                code:      code.parse()?,
            },
        })
    }
}

impl Serial for Asset {
    fn serial<B: Buffer>(&self, out: &mut B) {
        self.amount.serial(out);
        self.symbol.serial(out);
    }
}

impl Deserial for Asset {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let amount = i64::deserial(source)?;
        let symbol = Symbol::deserial(source)?;
        Ok(Asset {
            amount,
            symbol,
        })
    }
}

serde_via_string!(Asset);

/// An asset together with the contract that issues it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtendedAsset {
    pub quantity: Asset,
    pub contract: Name,
}

impl Serial for ExtendedAsset {
    fn serial<B: Buffer>(&self, out: &mut B) {
        self.quantity.serial(out);
        self.contract.serial(out);
    }
}

impl Deserial for ExtendedAsset {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let quantity = Asset::deserial(source)?;
        let contract = Name::deserial(source)?;
        Ok(ExtendedAsset {
            quantity,
            contract,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_checksum_padding() {
        let c = Checksum160::from_slice(&[1, 2, 3]).expect("Short input is zero filled.");
        assert_eq!(&c.0[..4], &[1, 2, 3, 0]);
        assert_eq!(to_bytes(&c).len(), 20);
        assert!(matches!(
            Checksum160::from_slice(&[0u8; 21]).unwrap_err(),
            CodecError::SizeMismatch {
                expected: 20,
                actual:   21,
            }
        ));
        assert!(matches!(
            "abcd".parse::<Checksum256>().unwrap_err(),
            CodecError::SizeMismatch { .. }
        ));
        let hex_str = "00".repeat(31) + "ff";
        let c: Checksum256 = hex_str.parse().unwrap();
        assert_eq!(c.to_string(), hex_str);
        assert!(from_bytes::<Checksum512>(&[0u8; 63]).is_err());
    }

    #[test]
    fn test_bytes() {
        let b = Bytes(vec![0xde, 0xad]);
        assert_eq!(to_bytes(&b), vec![2, 0xde, 0xad]);
        assert_eq!(b.to_string(), "dead");
        assert_eq!(from_bytes::<Bytes>(&[0]).unwrap(), Bytes::default());
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"dead\"");
    }

    #[test]
    fn test_time_point_text() {
        let t: TimePoint = "2018-06-15T19:17:47.500".parse().unwrap();
        assert_eq!(t.0, 1_529_090_267_500_000);
        assert_eq!(t.to_string(), "2018-06-15T19:17:47.5");
        assert_eq!(t.format(true).unwrap(), "2018-06-15T19:17:47.500");
        let whole: TimePoint = "2018-06-15T19:17:47".parse().unwrap();
        assert_eq!(whole.to_string(), "2018-06-15T19:17:47");
        assert_eq!(whole.format(true).unwrap(), "2018-06-15T19:17:47.000");
        let zulu: TimePoint = "2018-06-15T19:17:47Z".parse().unwrap();
        assert_eq!(zulu, whole);
    }

    #[test]
    fn test_time_point_sec() {
        let t: TimePointSec = "2018-06-15T19:17:47".parse().unwrap();
        assert_eq!(t.0, 1_529_090_267);
        assert_eq!(t.to_string(), "2018-06-15T19:17:47");
        assert_eq!(to_bytes(&t), 1_529_090_267u32.to_le_bytes().to_vec());
        assert_eq!(from_bytes::<TimePointSec>(&to_bytes(&t)).unwrap(), t);
    }

    #[test]
    fn test_block_timestamp() {
        let epoch: BlockTimestamp = "2000-01-01T00:00:00".parse().unwrap();
        assert_eq!(epoch.0, 0);
        let t: BlockTimestamp = "2018-06-15T19:17:47.500".parse().unwrap();
        assert_eq!(t.0, ((1_529_090_267_500i64 - 946_684_800_000) / 500) as u32);
        assert_eq!(t.to_string(), "2018-06-15T19:17:47.500");
        // Sub-slot precision is lost.
        let truncated: BlockTimestamp = "2018-06-15T19:17:47.700".parse().unwrap();
        assert_eq!(truncated, t);
        let with_zone: BlockTimestamp = "2018-06-15T21:17:47.5+02:00".parse().unwrap();
        assert_eq!(with_zone, t);
        assert!("1999-12-31T23:59:59".parse::<BlockTimestamp>().is_err());
    }

    #[test]
    fn test_tstamp() {
        let t = Tstamp(1_529_090_267_123_456_789);
        assert_eq!(t.to_datetime().timestamp_nanos_opt(), Some(1_529_090_267_123_456_789));
        assert_eq!(Tstamp::from_datetime(&t.to_datetime()).unwrap(), t);
        assert_eq!(from_bytes::<Tstamp>(&to_bytes(&t)).unwrap(), t);
    }

    #[test]
    fn test_symbol() {
        let s: Symbol = "4,EOS".parse().unwrap();
        assert_eq!(s.precision, 4);
        assert_eq!(s.code.to_string(), "EOS");
        assert_eq!(to_bytes(&s), vec![4, b'E', b'O', b'S', 0, 0, 0, 0]);
        assert_eq!(s.to_string(), "4,EOS");
        assert!("EOS".parse::<Symbol>().is_err());
        assert!("4,eos".parse::<Symbol>().is_err());
        assert!("4,ABCDEFGH".parse::<Symbol>().is_err());
        let code: SymbolCode = "EOS".parse().unwrap();
        assert_eq!(code.0, 0x534f45);
    }

    #[test]
    fn test_asset_text() {
        let a: Asset = "1.0000 EOS".parse().unwrap();
        assert_eq!(a.amount, 10000);
        assert_eq!(a.symbol.precision, 4);
        assert_eq!(a.to_string(), "1.0000 EOS");
        let neg: Asset = "-0.0050 EOS".parse().unwrap();
        assert_eq!(neg.amount, -50);
        assert_eq!(neg.to_string(), "-0.0050 EOS");
        let whole: Asset = "10 TOK".parse().unwrap();
        assert_eq!(whole.symbol.precision, 0);
        assert_eq!(whole.to_string(), "10 TOK");
        assert!("1.0000".parse::<Asset>().is_err(), "A symbol is required.");
        assert!("1.0.0 EOS".parse::<Asset>().is_err());
        assert!("1.0 EOS extra".parse::<Asset>().is_err());
    }

    #[test]
    fn test_asset_with_symbol() {
        let eos = Symbol::new(4, "EOS").unwrap();
        let a = Asset::from_str_with_symbol(eos, "1.5").unwrap();
        assert_eq!(a.amount, 15000);
        assert!(Asset::from_str_with_symbol(eos, "1.00001 EOS").is_err());
        assert!(Asset::from_str_with_symbol(eos, "1.0 TNT").is_err());
    }

    #[test]
    fn test_asset_binary() {
        let a: Asset = "1.0000 EOS".parse().unwrap();
        let bytes = to_bytes(&a);
        assert_eq!(bytes, vec![0x10, 0x27, 0, 0, 0, 0, 0, 0, 4, b'E', b'O', b'S', 0, 0, 0, 0]);
        assert_eq!(from_bytes::<Asset>(&bytes).unwrap(), a);
        let ext = ExtendedAsset {
            quantity: a,
            contract: Name::from("eosio.token"),
        };
        assert_eq!(to_bytes(&ext).len(), 24);
        assert_eq!(
            serde_json::to_value(ext).unwrap(),
            serde_json::json!({"quantity": "1.0000 EOS", "contract": "eosio.token"})
        );
    }
}
