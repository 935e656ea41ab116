//! Deferred values spliced into a call payload at execution time.
//!
//! A [`Binding`] says "before running this call, overwrite
//! `payload[position..]` with the runtime encoding of `value`". The
//! interpreter performs the substitution; this module only describes it and
//! enforces that positions are unique and fall inside the payload.

use crate::types::encoding::{Decode, DecodeError};
use crate::xcvm::errors::{BindingFault, XcvmError};
use crate::xcvm::validate::Validate;
use crate::xcvm::value::{AssetId, Ratio};
use std::collections::HashSet;
use std::fmt;
use xcvm_derive::BinaryCodec;

/// A share of the interpreter's holding of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub struct AssetAmount {
    pub asset_id: AssetId,
    pub ratio: Ratio,
}

impl AssetAmount {
    pub fn new(asset_id: AssetId, ratio: Ratio) -> Self {
        Self { asset_id, ratio }
    }
}

/// A value resolved by the interpreter, not by the program author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub enum BindingValue {
    /// The interpreter's own account on the executing chain.
    SelfAccount,
    /// The account relaying the cross-chain message.
    Relayer,
    /// A share of an asset held by the interpreter.
    AssetAmount(AssetAmount),
    /// The chain-local identifier of an asset.
    AssetId(AssetId),
    /// Output of the instruction at this index in the same instruction list.
    Result(u32),
}

impl fmt::Display for BindingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingValue::SelfAccount => f.write_str("self"),
            BindingValue::Relayer => f.write_str("relayer"),
            BindingValue::AssetAmount(amount) => {
                write!(f, "amount:{}={}", amount.asset_id, amount.ratio)
            }
            BindingValue::AssetId(id) => write!(f, "asset-id:{}", id),
            BindingValue::Result(index) => write!(f, "result:{}", index),
        }
    }
}

/// One substitution: `value` is written at byte offset `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Binding {
    pub position: u32,
    pub value: BindingValue,
}

impl Binding {
    pub fn new(position: u32, value: BindingValue) -> Self {
        Self { position, value }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}={}", self.position, self.value)
    }
}

/// Ordered bindings of a single call. No two share a position.
///
/// Positions need not be sorted; order is preserved as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Bindings {
    bindings: Vec<Binding>,
}

impl Bindings {
    /// Creates a binding list, rejecting duplicate positions.
    pub fn new(bindings: Vec<Binding>) -> Result<Self, XcvmError> {
        let bindings = Self { bindings };
        bindings.validate()?;
        Ok(bindings)
    }

    /// A call without substitutions.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Checks every position lies inside a payload of `len` bytes.
    pub(crate) fn check_within(&self, len: usize) -> Result<(), XcvmError> {
        match self.iter().find(|b| b.position as usize >= len) {
            Some(binding) => Err(XcvmError::InvalidBindingPosition {
                position: binding.position,
                reason: BindingFault::OutsidePayload { len },
            }),
            None => Ok(()),
        }
    }

    /// Checks every `result(i)` refers to an instruction before `index`.
    pub(crate) fn check_results_precede(&self, index: usize) -> Result<(), XcvmError> {
        for binding in self.iter() {
            if let BindingValue::Result(result) = binding.value
                && result as usize >= index
            {
                return Err(XcvmError::InvalidBindingPosition {
                    position: binding.position,
                    reason: BindingFault::ForwardResult { result, index },
                });
            }
        }
        Ok(())
    }

    /// First position that occurs twice, if any.
    pub(crate) fn first_duplicate(&self) -> Option<u32> {
        let mut seen = HashSet::with_capacity(self.bindings.len());
        self.iter()
            .map(|b| b.position)
            .find(|position| !seen.insert(*position))
    }
}

impl Decode for Bindings {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::new(Vec::<Binding>::decode(input)?)?)
    }
}
