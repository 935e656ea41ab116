//! Leaf and composite values: quantities, assets and accounts.
//!
//! `Display` renders each value in assembler operand syntax, so a
//! disassembled program reads back to the same tree.

use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError};
use crate::xcvm::errors::XcvmError;
use crate::xcvm::validate::Validate;
use std::fmt;
use xcvm_derive::BinaryCodec;

/// A fraction `numerator / denominator`. The denominator is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Ratio {
    pub(crate) numerator: u64,
    pub(crate) denominator: u64,
}

impl Ratio {
    /// Creates a ratio, rejecting a zero denominator.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, XcvmError> {
        let ratio = Self {
            numerator,
            denominator,
        };
        ratio.validate()?;
        Ok(ratio)
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }
}

impl Decode for Ratio {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let numerator = u64::decode(input)?;
        let denominator = u64::decode(input)?;
        Ok(Self::new(numerator, denominator)?)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A mixed number: a whole part plus a fractional ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Unit {
    pub integer: u128,
    pub ratio: Ratio,
}

impl Unit {
    pub fn new(integer: u128, ratio: Ratio) -> Self {
        Self { integer, ratio }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.integer, self.ratio)
    }
}

/// A literal quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Absolute {
    pub value: u128,
}

impl Absolute {
    pub fn new(value: u128) -> Self {
        Self { value }
    }
}

impl fmt::Display for Absolute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// How much of an asset an instruction moves.
///
/// `Unit` and `Ratio` are resolved by the interpreter against the balance
/// held at execution time; `Absolute` is taken literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub enum Balance {
    Absolute(Absolute),
    Unit(Unit),
    Ratio(Ratio),
}

impl From<Absolute> for Balance {
    fn from(value: Absolute) -> Self {
        Balance::Absolute(value)
    }
}

impl From<Unit> for Balance {
    fn from(value: Unit) -> Self {
        Balance::Unit(value)
    }
}

impl From<Ratio> for Balance {
    fn from(value: Ratio) -> Self {
        Balance::Ratio(value)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Absolute(v) => v.fmt(f),
            Balance::Unit(v) => v.fmt(f),
            Balance::Ratio(v) => v.fmt(f),
        }
    }
}

/// Opaque cross-chain asset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BinaryCodec)]
pub struct AssetId {
    pub id: u128,
}

impl AssetId {
    pub fn new(id: u128) -> Self {
        Self { id }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// An asset together with the amount to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Asset {
    pub asset_id: AssetId,
    pub balance: Balance,
}

impl Asset {
    pub fn new(asset_id: AssetId, balance: impl Into<Balance>) -> Self {
        Self {
            asset_id,
            balance: balance.into(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}={}", self.asset_id, self.balance)
    }
}

/// Opaque destination identity. Its encoding is chain-specific.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Account {
    pub address: Bytes,
}

impl Account {
    pub fn new(address: impl Into<Bytes>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account:{}", self.address)
    }
}
