//! Binary encoding and decoding traits for the XCVM wire format.
//!
//! All encoded data uses little-endian byte order so that every chain and
//! interpreter reads the same bytes the same way.
//!
//! # Binary Format
//!
//! - Integers: little-endian, fixed-width
//! - `usize`: encoded as `u64` for portability
//! - `bool`: single byte (0 = false, 1 = true)
//! - `Vec<T>`: 8-byte length prefix followed by elements
//! - `Option<T>`: 1-byte tag (0 = None, 1 = Some) followed by value if present
//! - Arrays `[T; N]`: elements serialized sequentially without length prefix
//! - Enums: 1-byte discriminant followed by the variant's fields
//!
//! # Example
//!
//! ```ignore
//! use xcvm::types::encoding::{Decode, Encode};
//!
//! let value: u32 = 42;
//! let bytes = value.to_bytes();
//! let decoded = u32::from_bytes(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

use crate::types::bytes::Bytes;
use crate::xcvm::errors::XcvmError;
use xcvm_derive::Error;

/// Sink for writing encoded bytes.
///
/// Implemented by byte buffers and hashers so that a program can be hashed
/// without first materialising its encoding.
pub trait EncodeSink {
    /// Writes the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

/// Counter for computing encoded size without allocating memory.
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self { len: 0 }
    }

    /// Returns the total number of bytes counted.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl Default for SizeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for SizeCounter {
    fn write(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Trait for types that can be serialized to the wire format.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Returns the number of bytes `encode` writes.
    fn encoded_len(&self) -> usize {
        let mut counter = SizeCounter::new();
        self.encode(&mut counter);
        counter.len()
    }

    /// Serializes to a new byte buffer with exact capacity.
    fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        Bytes::from_vec(out)
    }
}

/// Decoding failures.
///
/// Most variants say the bytes do not match the wire layout. Values that
/// carry invariants are validated as they are read, and a violation is
/// reported through [`DecodeError::Invariant`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before expected data was read.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A tagged union carried a discriminant with no matching variant.
    #[error("invalid {ty} tag {tag}")]
    InvalidTag { ty: &'static str, tag: u8 },
    /// Data does not represent a valid value for the target type.
    #[error("invalid value")]
    InvalidValue,
    /// Length prefix exceeds maximum allowed size.
    #[error("length prefix too large")]
    LengthOverflow,
    /// Input remained after the top-level value was decoded.
    #[error("{remaining} trailing bytes")]
    TrailingBytes { remaining: usize },
    /// The envelope did not start with the program magic.
    #[error("bad magic")]
    BadMagic,
    /// The envelope was written by an incompatible format version.
    #[error("unsupported version {major}.{minor}.{patch}")]
    UnsupportedVersion { major: u8, minor: u8, patch: u8 },
    /// Encoded program is larger than the configured limit.
    #[error("program of {len} bytes exceeds limit of {limit}")]
    ProgramTooLarge { len: usize, limit: usize },
    /// Spawned programs are nested deeper than the configured limit.
    #[error("spawn nesting exceeds depth limit {limit}")]
    DepthExceeded { limit: usize },
    /// The bytes decode to a value its constructor would refuse.
    #[error("{0}")]
    Invariant(Box<XcvmError>),
}

/// Trait for types that can be deserialized from the wire format.
pub trait Decode: Sized {
    /// Reads and decodes a value from the input buffer.
    ///
    /// Advances the input slice past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value from a byte slice, requiring all bytes to be consumed.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;

        if !input.is_empty() {
            return Err(DecodeError::TrailingBytes {
                remaining: input.len(),
            });
        }

        Ok(value)
    }
}

/// Reads exactly `n` bytes from the input, advancing the slice.
pub(crate) fn read_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Decode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = read_bytes(input, 1)?;
        Ok(bytes[0])
    }
}

macro_rules! impl_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode<S: EncodeSink>(&self, out: &mut S) {
                    out.write(&self.to_le_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(read_bytes(input, std::mem::size_of::<$t>())?);
                    Ok(<$t>::from_le_bytes(buf))
                }
            }
        )*
    };
}

impl_int!(u16, u32, u64, u128);

// usize as u64
impl Encode for usize {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u64).encode(out);
    }
}

impl Decode for usize {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let v = u64::decode(input)?;
        usize::try_from(v).map_err(|_| DecodeError::LengthOverflow)
    }
}

impl Encode for bool {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self as u8]);
    }
}

impl Decode for bool {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

/// Maximum allowed length for decoded vectors to prevent memory exhaustion.
pub(crate) const MAX_VEC_LEN: usize = 1_000_000;

/// Reads a length prefix and checks it against [`MAX_VEC_LEN`].
pub(crate) fn decode_len(input: &mut &[u8]) -> Result<usize, DecodeError> {
    let len = usize::decode(input)?;
    if len > MAX_VEC_LEN {
        return Err(DecodeError::LengthOverflow);
    }
    Ok(len)
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = decode_len(input)?;

        // Every element takes at least one byte, so never reserve past the input.
        let mut vec = Vec::with_capacity(len.min(input.len()));
        for _ in 0..len {
            vec.push(T::decode(input)?);
        }
        Ok(vec)
    }
}

impl<T: Encode> Encode for Box<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.as_ref().encode(out);
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        match self {
            None => 0u8.encode(out),
            Some(v) => {
                1u8.encode(out);
                v.encode(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(input)?)),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(self);
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(read_bytes(input, N)?);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_counter_accumulates() {
        let mut counter = SizeCounter::new();
        assert_eq!(counter.len(), 0);

        counter.write(&[1, 2, 3]);
        assert_eq!(counter.len(), 3);

        counter.write(&[4, 5]);
        assert_eq!(counter.len(), 5);
    }

    #[test]
    fn to_bytes_matches_encoded_len() {
        let data: Vec<u32> = vec![1, 2, 3];
        assert_eq!(data.encoded_len(), 8 + 3 * 4);
        assert_eq!(data.to_bytes().len(), data.encoded_len());
    }

    #[test]
    fn u32_little_endian() {
        let val: u32 = 0x12345678;
        let bytes = val.to_bytes();
        assert_eq!(bytes.as_slice(), &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(u32::from_bytes(&bytes).unwrap(), val);
    }

    #[test]
    fn u128_roundtrip() {
        let val: u128 = 0x0123456789ABCDEF_FEDCBA9876543210;
        let bytes = val.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(u128::from_bytes(&bytes).unwrap(), val);
    }

    #[test]
    fn usize_encoded_as_u64() {
        let bytes = 42usize.to_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(usize::from_bytes(&bytes).unwrap(), 42);
    }

    #[test]
    fn bool_invalid_value() {
        for invalid in [2u8, 128, 255] {
            assert_eq!(bool::from_bytes(&[invalid]), Err(DecodeError::InvalidValue));
        }
    }

    #[test]
    fn vec_encoding_format() {
        let vec: Vec<u8> = vec![0xAA, 0xBB, 0xCC];
        let bytes = vec.to_bytes();

        assert_eq!(&bytes[0..8], &3u64.to_le_bytes());
        assert_eq!(&bytes[8..], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn vec_length_overflow() {
        let huge_len: u64 = (MAX_VEC_LEN as u64) + 1;
        let bytes = huge_len.to_bytes();
        assert_eq!(Vec::<u8>::from_bytes(&bytes), Err(DecodeError::LengthOverflow));
    }

    #[test]
    fn vec_length_beyond_input_is_eof_not_allocation() {
        let mut bytes = Vec::new();
        (MAX_VEC_LEN as u64).encode(&mut bytes);
        bytes.push(1);
        assert_eq!(Vec::<u32>::from_bytes(&bytes), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn option_invalid_tag() {
        let invalid = &[2u8, 0, 0, 0, 0];
        assert_eq!(Option::<u32>::from_bytes(invalid), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn byte_array_has_no_length_prefix() {
        let arr: [u8; 4] = *b"XCVM";
        assert_eq!(arr.to_bytes().as_slice(), b"XCVM");
        assert_eq!(<[u8; 4]>::from_bytes(b"XCVM").unwrap(), arr);
    }

    #[test]
    fn unexpected_eof_partial_input() {
        assert_eq!(u32::from_bytes(&[0x12, 0x34]), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn trailing_bytes_error() {
        let result = u8::from_bytes(&[42u8, 0xFF, 0xFF]);
        assert_eq!(result, Err(DecodeError::TrailingBytes { remaining: 2 }));
    }

    #[test]
    fn decode_advances_input() {
        let mut input: &[u8] = &[0x01, 0x02, 0x03, 0x04, 0x05];

        assert_eq!(u8::decode(&mut input).unwrap(), 0x01);
        assert_eq!(input.len(), 4);

        assert_eq!(u16::decode(&mut input).unwrap(), 0x0302);
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn decode_error_display() {
        let err = DecodeError::InvalidTag {
            ty: "Balance",
            tag: 9,
        };
        assert_eq!(err.to_string(), "invalid Balance tag 9");
        assert_eq!(
            DecodeError::TrailingBytes { remaining: 3 }.to_string(),
            "3 trailing bytes"
        );
    }
}
