use crate::error::{CodecError, ParseResult, ResultExt};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use core::cmp;
use sha2::Digest;
use std::{collections::btree_map::BTreeMap, io::Read, marker::PhantomData};

pub(crate) static MAX_PREALLOCATED_CAPACITY: usize = 4096;

/// As Vec::with_capacity, but only allocate maximum MAX_PREALLOCATED_CAPACITY
/// elements.
#[inline]
pub fn safe_with_capacity<T>(capacity: usize) -> Vec<T> {
    Vec::with_capacity(cmp::min(capacity, MAX_PREALLOCATED_CAPACITY))
}

/// A read position over a borrowed byte buffer.
///
/// All reads check the number of remaining bytes first, and fail with
/// [`CodecError::InsufficientData`] instead of reading past the end.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self { Self { data, pos: 0 } }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize { self.pos }

    pub fn remaining(&self) -> usize { self.data.len() - self.pos }

    pub fn has_remaining(&self) -> bool { self.pos < self.data.len() }

    /// The bytes that have not been read yet.
    pub fn rest(&self) -> &'a [u8] { &self.data[self.pos..] }

    fn ensure(&self, required: usize) -> ParseResult<()> {
        let remaining = self.remaining();
        if remaining < required {
            return Err(CodecError::InsufficientData {
                required,
                remaining,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> ParseResult<u8> {
        self.ensure(1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Read exactly `len` bytes, borrowing them from the underlying buffer.
    pub fn read_bytes(&mut self, len: usize) -> ParseResult<&'a [u8]> {
        self.ensure(len)?;
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> ParseResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a LEB128 encoded unsigned integer of at most 64 bits.
    ///
    /// Fails with [`CodecError::MalformedVarint`] if there is no terminating
    /// byte within 10 bytes, or the value does not fit in 64 bits.
    pub fn read_varuint64(&mut self) -> ParseResult<u64> {
        let mut rest = self.rest();
        let before = rest.len();
        // 10 is ceil(64 / 7)
        let value =
            leb128::read::unsigned(&mut (&mut rest).take(10)).map_err(|_| CodecError::MalformedVarint)?;
        self.pos += before - rest.len();
        Ok(value)
    }

    pub fn read_varuint32(&mut self) -> ParseResult<u32> {
        let v = self.read_varuint64()?;
        u32::try_from(v).map_err(|_| CodecError::MalformedVarint)
    }

    /// Zigzag decoding of a varuint.
    pub fn read_varint32(&mut self) -> ParseResult<i32> { Ok(zigzag_decode(self.read_varuint32()?)) }

    /// Read the presence byte of an optional value.
    pub fn read_presence(&mut self) -> ParseResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CodecError::invalid(format!("Unknown presence byte {}", b))),
        }
    }

    /// Read the varuint32 length prefix of a sequence.
    pub fn read_length(&mut self) -> ParseResult<usize> { Ok(self.read_varuint32()? as usize) }
}

/// Trait for types which can be recovered from byte sources.
pub trait Deserial: Sized {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self>;
}

/// Trait for writers which will not fail in normal operation with
/// small amounts of data, e.g., Vec<u8>.
/// Moreover having a special trait allows us to implement it for
/// other types, such as the SHA Digest.
pub trait Buffer: Sized + WriteBytesExt {
    type Result;
    fn start() -> Self;
    fn start_hint(_l: usize) -> Self { Self::start() }
    fn result(self) -> Self::Result;
}

impl Buffer for Vec<u8> {
    type Result = Vec<u8>;

    fn start() -> Vec<u8> { Vec::new() }

    fn start_hint(l: usize) -> Vec<u8> { Vec::with_capacity(l) }

    fn result(self) -> Self::Result { self }
}

impl Buffer for sha2::Sha256 {
    type Result = [u8; 32];

    fn start() -> Self { sha2::Sha256::new() }

    fn result(self) -> Self::Result { self.finalize().into() }
}

/// Trait implemented by types which can be encoded into byte arrays.
/// The encoding is the deterministic little-endian wire format.
pub trait Serial {
    fn serial<B: Buffer>(&self, out: &mut B);
}

/// Write a LEB128 encoded unsigned integer.
pub fn write_varuint64<B: Buffer>(out: &mut B, v: u64) {
    leb128::write::unsigned(out, v).expect("Writing to a buffer should not fail.");
}

fn zigzag_encode(v: i32) -> u32 { ((v << 1) ^ (v >> 31)) as u32 }

fn zigzag_decode(v: u32) -> i32 { ((v >> 1) as i32) ^ -((v & 1) as i32) }

/// Write the length prefix of a sequence.
pub fn write_length<B: Buffer>(out: &mut B, len: usize) { write_varuint64(out, len as u64) }

macro_rules! le_int_impls {
    ($($t:ty => $read:ident, $write:ident;)*) => {
        $(
            impl Serial for $t {
                fn serial<B: Buffer>(&self, out: &mut B) {
                    out.$write::<LittleEndian>(*self)
                        .expect("Writing to a buffer should not fail.")
                }
            }

            impl Deserial for $t {
                fn deserial(source: &mut Cursor<'_>) -> ParseResult<$t> {
                    let bytes = source.read_bytes(std::mem::size_of::<$t>())?;
                    Ok(LittleEndian::$read(bytes))
                }
            }
        )*
    };
}

le_int_impls! {
    u16 => read_u16, write_u16;
    u32 => read_u32, write_u32;
    u64 => read_u64, write_u64;
    i16 => read_i16, write_i16;
    i32 => read_i32, write_i32;
    i64 => read_i64, write_i64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
}

impl Serial for u8 {
    fn serial<B: Buffer>(&self, out: &mut B) {
        out.write_u8(*self)
            .expect("Writing to a buffer should not fail.")
    }
}

impl Deserial for u8 {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<u8> { source.read_u8() }
}

impl Serial for i8 {
    fn serial<B: Buffer>(&self, out: &mut B) {
        out.write_i8(*self)
            .expect("Writing to a buffer should not fail.")
    }
}

impl Deserial for i8 {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<i8> { Ok(source.read_u8()? as i8) }
}

impl Serial for bool {
    fn serial<B: Buffer>(&self, out: &mut B) {
        (if *self {
            out.write_u8(1)
        } else {
            out.write_u8(0)
        })
        .expect("Writing to a buffer should not fail.");
    }
}

impl Deserial for bool {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let x: u8 = source.read_u8()?;
        match x {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::invalid(format!("Unrecognized boolean value {}", x))),
        }
    }
}

/// An unsigned 32-bit integer written as a LEB128 varuint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct VarUint32(pub u32);

impl Serial for VarUint32 {
    fn serial<B: Buffer>(&self, out: &mut B) { write_varuint64(out, u64::from(self.0)) }
}

impl Deserial for VarUint32 {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(VarUint32(source.read_varuint32()?)) }
}

/// A signed 32-bit integer written zigzag encoded as a LEB128 varuint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct VarInt32(pub i32);

impl Serial for VarInt32 {
    fn serial<B: Buffer>(&self, out: &mut B) {
        write_varuint64(out, u64::from(zigzag_encode(self.0)))
    }
}

impl Deserial for VarInt32 {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(VarInt32(source.read_varint32()?)) }
}

impl Serial for str {
    fn serial<B: Buffer>(&self, out: &mut B) {
        write_length(out, self.len());
        out.write_all(self.as_bytes())
            .expect("Writing to a buffer should not fail.")
    }
}

impl Serial for String {
    #[inline]
    fn serial<B: Buffer>(&self, out: &mut B) { self.as_str().serial(out) }
}

impl Deserial for String {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let len = source.read_length()?;
        let bytes = source.read_bytes(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Write raw bytes without a length prefix.
impl Serial for [u8] {
    #[inline]
    fn serial<B: Buffer>(&self, out: &mut B) {
        out.write_all(self)
            .expect("Writing to a buffer should not fail.");
    }
}

/// Serialize a vector by encoding its length as a varuint and then the list of
/// elements in sequence.
impl<T: Serial> Serial for Vec<T> {
    fn serial<B: Buffer>(&self, out: &mut B) {
        write_length(out, self.len());
        serial_vector_no_length(self, out)
    }
}

/// Read a vector where the length is given by a varuint prefix.
impl<T: Deserial> Deserial for Vec<T> {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let len = source.read_length()?;
        deserial_vector_no_length(source, len)
    }
}

/// Serialize all of the elements in the iterator.
pub fn serial_iter<'a, B: Buffer, T: Serial + 'a, I: Iterator<Item = &'a T>>(xs: I, out: &mut B) {
    for x in xs {
        x.serial(out);
    }
}

/// Write an array without including length information.
pub fn serial_vector_no_length<B: Buffer, T: Serial>(xs: &[T], out: &mut B) {
    serial_iter(xs.iter(), out)
}

/// Read a vector of a given size. This protects against excessive memory
/// allocation by only pre-allocating a maximum safe size.
pub fn deserial_vector_no_length<T: Deserial>(
    reader: &mut Cursor<'_>,
    len: usize,
) -> ParseResult<Vec<T>> {
    let mut vec = safe_with_capacity(len);
    for i in 0..len {
        vec.push(T::deserial(reader).context_with(|| format!("decode index [{}]", i))?);
    }
    Ok(vec)
}

/// Options are preceded by a presence byte.
impl<T: Serial> Serial for Option<T> {
    fn serial<B: Buffer>(&self, out: &mut B) {
        match self {
            None => out.write_u8(0).expect("Writing to a buffer should not fail."),
            Some(t) => {
                out.write_u8(1).expect("Writing to a buffer should not fail.");
                t.serial(out)
            }
        }
    }
}

impl<T: Deserial> Deserial for Option<T> {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        if source.read_presence()? {
            T::deserial(source).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// A field that may be missing from the end of a struct. When absent nothing
/// is written, and when decoding it is absent if the input is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryExtension<T>(pub Option<T>);

impl<T: Serial> Serial for BinaryExtension<T> {
    fn serial<B: Buffer>(&self, out: &mut B) {
        if let Some(v) = &self.0 {
            v.serial(out)
        }
    }
}

impl<T: Deserial> Deserial for BinaryExtension<T> {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        if source.has_remaining() {
            Ok(BinaryExtension(Some(T::deserial(source)?)))
        } else {
            Ok(BinaryExtension(None))
        }
    }
}

/// Serialize an ordered map: a varuint count followed by the pairs in
/// increasing order of keys.
impl<K: Serial, V: Serial> Serial for BTreeMap<K, V> {
    fn serial<B: Buffer>(&self, out: &mut B) {
        write_length(out, self.len());
        serial_map_no_length(self, out)
    }
}

impl<K: Deserial + Ord, V: Deserial> Deserial for BTreeMap<K, V> {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let len = source.read_length()?;
        deserial_map_no_length(source, len)
    }
}

/// Serialize an ordered map. Serialization is by increasing order of keys.
pub fn serial_map_no_length<B: Buffer, K: Serial, V: Serial>(map: &BTreeMap<K, V>, out: &mut B) {
    for (k, v) in map.iter() {
        out.put(k);
        out.put(v);
    }
}

/// Deserialize a map from a byte source. This ensures there are no duplicate
/// keys.
pub fn deserial_map_no_length<K: Deserial + Ord, V: Deserial>(
    source: &mut Cursor<'_>,
    len: usize,
) -> ParseResult<BTreeMap<K, V>> {
    let mut out = BTreeMap::new();
    for _ in 0..len {
        let k = source.get()?;
        let v = source.get()?;
        if out.insert(k, v).is_some() {
            return Err(CodecError::invalid("Duplicate key in map."));
        }
    }
    Ok(out)
}

impl<T: Serial, S: Serial> Serial for (T, S) {
    #[inline]
    fn serial<B: Buffer>(&self, out: &mut B) {
        self.0.serial(out);
        self.1.serial(out);
    }
}

impl<T: Deserial, U: Deserial> Deserial for (T, U) {
    #[inline]
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let x = T::deserial(source)?;
        let y = U::deserial(source)?;
        Ok((x, y))
    }
}

impl<T> Serial for PhantomData<T> {
    #[inline]
    fn serial<B: Buffer>(&self, _out: &mut B) {}
}

impl<T> Deserial for PhantomData<T> {
    #[inline]
    fn deserial(_source: &mut Cursor<'_>) -> ParseResult<Self> { Ok(Default::default()) }
}

impl<T: Serial> Serial for Box<T> {
    #[inline]
    fn serial<B: Buffer>(&self, out: &mut B) { self.as_ref().serial(out) }
}

impl<T: Deserial> Deserial for Box<T> {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let x = T::deserial(source)?;
        Ok(Box::new(x))
    }
}

impl<T: Serial + ?Sized> Serial for &T {
    fn serial<B: Buffer>(&self, out: &mut B) { (*self).serial(out) }
}

/// Fixed-size arrays are written element by element, without a length.
impl<T: Serial, const N: usize> Serial for [T; N] {
    fn serial<B: Buffer>(&self, out: &mut B) {
        for x in self.iter() {
            x.serial(out);
        }
    }
}

impl<T: Deserial, const N: usize> Deserial for [T; N] {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let mut out_vec = Vec::with_capacity(N);
        for _ in 0..N {
            out_vec.push(T::deserial(source)?);
        }
        out_vec.try_into().map_err(|v: Vec<T>| CodecError::SizeMismatch {
            expected: N,
            actual:   v.len(),
        })
    }
}

/// Analogue of [Deserial], but instead this has the type to deserialize as a
/// type parameter, and is implemented once for a source. Contrast
/// `A::deserial(source)` to `source.get()`. In the latter case the return type
/// is usually clear from context.
pub trait Get<A> {
    fn get(&mut self) -> ParseResult<A>;
}

impl<'a, A: Deserial> Get<A> for Cursor<'a> {
    #[inline]
    fn get(&mut self) -> ParseResult<A> { A::deserial(self) }
}

/// Dual to `Get`, and the analogue of `Serial`. It allows writing
/// `sink.put(value)` in contrast to `value.serial(sink)`.
pub trait Put<A: ?Sized> {
    fn put(&mut self, _v: &A);
}

impl<R: Buffer, A: Serial + ?Sized> Put<A> for R {
    #[inline]
    fn put(&mut self, v: &A) { v.serial(self) }
}

/// A convenient way to refer to both [Serial] and [Deserial] together.
pub trait Serialize: Serial + Deserial {}

impl<A: Deserial + Serial> Serialize for A {}

/// Directly serialize to a vector of bytes.
#[inline]
pub fn to_bytes<A: Serial + ?Sized>(x: &A) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put(x);
    buf
}

/// Deserialize a value from the start of the buffer, returning it together
/// with the number of bytes consumed.
pub fn unpack_partial<A: Deserial>(bytes: &[u8]) -> ParseResult<(A, usize)> {
    let mut source = Cursor::new(bytes);
    let value = A::deserial(&mut source)?;
    Ok((value, source.position()))
}

/// Deserialize a value that must occupy the whole buffer.
pub fn from_bytes<A: Deserial>(bytes: &[u8]) -> ParseResult<A> {
    let (value, consumed) = unpack_partial(bytes)?;
    if consumed != bytes.len() {
        return Err(CodecError::SizeMismatch {
            expected: consumed,
            actual:   bytes.len(),
        });
    }
    Ok(value)
}

/// Produce the wire bytes of a value. Used by the HTTP and peer-to-peer
/// collaborators before framing.
#[inline]
pub fn pack<A: Serial + ?Sized>(value: &A) -> Vec<u8> { to_bytes(value) }

/// Inverse of [pack]. The whole buffer must be consumed.
#[inline]
pub fn unpack<A: Deserial>(bytes: &[u8]) -> ParseResult<A> { from_bytes(bytes) }

/// Encode the given value into a byte array using its [Serial] instance, and
/// then encode that byte array as a hex string.
pub fn base16_encode_string<S: Serial + ?Sized>(x: &S) -> String { hex::encode(to_bytes(x)) }

/// Dual to [base16_encode_string].
pub fn base16_decode_string<S: Deserial>(x: &str) -> ParseResult<S> {
    let d = hex::decode(x)?;
    from_bytes(&d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    fn varuint_bytes(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varuint64(&mut out, v);
        out
    }

    #[test]
    fn test_varuint_boundaries() {
        assert_eq!(varuint_bytes(0), vec![0x00]);
        assert_eq!(varuint_bytes(127), vec![0x7f]);
        assert_eq!(varuint_bytes(128), vec![0x80, 0x01]);
        assert_eq!(varuint_bytes(u64::from(u32::MAX)), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
        let max = varuint_bytes(u64::MAX);
        assert_eq!(max.len(), 10, "2^64-1 needs ten bytes.");
        assert!(max[..9].iter().all(|b| b & 0x80 != 0), "All but the last byte continue.");
        assert_eq!(max[9], 0x01);
        assert_eq!(Cursor::new(&max).read_varuint64().unwrap(), u64::MAX);
    }

    #[test]
    fn test_varuint_truncated() {
        let err = Cursor::new(&[0x80, 0x80]).read_varuint64().unwrap_err();
        assert!(matches!(err, CodecError::MalformedVarint), "Truncated varuint: {}", err);
        let err = Cursor::new(&[]).read_varuint64().unwrap_err();
        assert!(matches!(err, CodecError::MalformedVarint), "Empty varuint: {}", err);
    }

    #[test]
    fn test_varuint_overflow() {
        let mut bytes = vec![0xff; 10];
        bytes.push(0x01);
        let err = Cursor::new(&bytes).read_varuint64().unwrap_err();
        assert!(matches!(err, CodecError::MalformedVarint));
        // 2^64 does not fit.
        let mut bytes = vec![0x80; 9];
        bytes.push(0x02);
        assert!(Cursor::new(&bytes).read_varuint64().is_err());
        // A value above u32::MAX is not a valid varuint32.
        let bytes = varuint_bytes(1 << 32);
        assert!(matches!(
            Cursor::new(&bytes).read_varuint32().unwrap_err(),
            CodecError::MalformedVarint
        ));
    }

    #[test]
    fn test_varuint_advances_cursor() {
        let mut cursor = Cursor::new(&[0xac, 0x02, 0x07]);
        assert_eq!(cursor.read_varuint32().unwrap(), 300);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.read_u8().unwrap(), 7);
        assert!(!cursor.has_remaining());
    }

    #[test]
    fn test_varint32_zigzag() {
        assert_eq!(to_bytes(&VarInt32(0)), vec![0x00]);
        assert_eq!(to_bytes(&VarInt32(-1)), vec![0x01]);
        assert_eq!(to_bytes(&VarInt32(1)), vec![0x02]);
        assert_eq!(to_bytes(&VarInt32(-64)), vec![0x7f]);
        assert_eq!(to_bytes(&VarInt32(64)), vec![0x80, 0x01]);
        for v in [i32::MIN, -1, 0, 1, i32::MAX] {
            let bytes = to_bytes(&VarInt32(v));
            assert_eq!(from_bytes::<VarInt32>(&bytes).unwrap(), VarInt32(v));
        }
    }

    #[test]
    fn test_little_endian() {
        assert_eq!(to_bytes(&0x0102_0304u32), vec![4, 3, 2, 1]);
        assert_eq!(to_bytes(&-2i16), vec![0xfe, 0xff]);
        assert_eq!(from_bytes::<u64>(&[1, 0, 0, 0, 0, 0, 0, 0]).unwrap(), 1);
    }

    #[test]
    fn test_insufficient_data() {
        let err = from_bytes::<u64>(&[1, 2, 3]).unwrap_err();
        match err {
            CodecError::InsufficientData {
                required,
                remaining,
            } => {
                assert_eq!(required, 8);
                assert_eq!(remaining, 3);
            }
            e => panic!("Unexpected error {}", e),
        }
    }

    #[test]
    fn test_strings_and_sequences() {
        assert_eq!(to_bytes(""), vec![0]);
        assert_eq!(to_bytes("abc"), vec![3, b'a', b'b', b'c']);
        assert_eq!(from_bytes::<String>(&[0]).unwrap(), "");
        assert_eq!(to_bytes(&Vec::<u32>::new()), vec![0]);
        assert_eq!(to_bytes(&[1u8, 2, 3]), vec![1, 2, 3], "Fixed arrays have no length.");
        let v = vec![1u16, 2];
        assert_eq!(to_bytes(&v), vec![2, 1, 0, 2, 0]);
        assert_eq!(from_bytes::<Vec<u16>>(&[2, 1, 0, 2, 0]).unwrap(), v);
        assert!(from_bytes::<String>(&[2, 0xff, 0xfe]).is_err(), "Invalid UTF-8 must fail.");
    }

    #[test]
    fn test_option_presence_byte() {
        assert_eq!(to_bytes(&Option::<u32>::None), vec![0]);
        assert_eq!(to_bytes(&Some(7u32)), vec![1, 7, 0, 0, 0]);
        assert!(matches!(
            from_bytes::<Option<u8>>(&[2, 1]).unwrap_err().root(),
            CodecError::InvalidValue(_)
        ));
        assert!(
            matches!(from_bytes::<Option<u8>>(&[]).unwrap_err().root(), CodecError::InsufficientData {
                required:  1,
                remaining: 0,
            }),
            "A missing presence byte is truncated input."
        );
    }

    #[test]
    fn test_binary_extension() {
        let absent: BinaryExtension<u32> = BinaryExtension(None);
        assert!(to_bytes(&absent).is_empty());
        assert_eq!(from_bytes::<BinaryExtension<u32>>(&[]).unwrap(), absent);
        assert_eq!(
            from_bytes::<BinaryExtension<u32>>(&[5, 0, 0, 0]).unwrap(),
            BinaryExtension(Some(5))
        );
    }

    #[test]
    fn test_map_is_ordered() {
        let mut map = BTreeMap::new();
        map.insert(3u8, 30u8);
        map.insert(1u8, 10u8);
        assert_eq!(to_bytes(&map), vec![2, 1, 10, 3, 30]);
        assert!(
            from_bytes::<BTreeMap<u8, u8>>(&[2, 1, 10, 1, 11]).is_err(),
            "Duplicate keys must be rejected."
        );
    }

    #[test]
    fn test_unpack_requires_all_bytes() {
        assert!(matches!(
            unpack::<u16>(&[1, 0, 0]).unwrap_err(),
            CodecError::SizeMismatch { .. }
        ));
        assert_eq!(unpack_partial::<u16>(&[1, 0, 0]).unwrap(), (1, 2));
    }

    #[test]
    fn test_varuint_roundtrip_prop() {
        let prop = |v: u64| -> TestResult {
            let bytes = varuint_bytes(v);
            let mut cursor = Cursor::new(&bytes);
            match cursor.read_varuint64() {
                Ok(w) => TestResult::from_bool(w == v && !cursor.has_remaining()),
                Err(_) => TestResult::failed(),
            }
        };
        QuickCheck::new().tests(1000).quickcheck(prop as fn(u64) -> TestResult);
    }

    #[test]
    fn test_integer_roundtrip_prop() {
        let prop = |a: i64, b: u32, c: i16, d: u8| -> bool {
            let bytes = to_bytes(&((a, b), (c, d)));
            from_bytes::<((i64, u32), (i16, u8))>(&bytes).ok() == Some(((a, b), (c, d)))
        };
        QuickCheck::new().tests(500).quickcheck(prop as fn(i64, u32, i16, u8) -> bool);
    }
}
