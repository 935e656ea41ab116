//! Semantic checks shared by typed constructors and decoding.
//!
//! Constructors validate the node they build, and decoding builds nodes
//! through those constructors, so both paths enforce the same rules.

use crate::xcvm::binding::{BindingValue, Bindings};
use crate::xcvm::errors::{BindingFault, XcvmError};
use crate::xcvm::instruction::{Call, Instruction, Instructions, Query, Spawn, Transfer};
use crate::xcvm::program::Program;
use crate::xcvm::value::{Asset, Balance, Ratio};

/// A node that can check its own invariants, including those of its children.
pub trait Validate {
    fn validate(&self) -> Result<(), XcvmError>;
}

impl<T: Validate> Validate for [T] {
    fn validate(&self) -> Result<(), XcvmError> {
        self.iter().try_for_each(|item| item.validate())
    }
}

impl Validate for Ratio {
    fn validate(&self) -> Result<(), XcvmError> {
        if self.denominator() == 0 {
            return Err(XcvmError::InvalidRatio { denominator: 0 });
        }
        Ok(())
    }
}

impl Validate for Balance {
    fn validate(&self) -> Result<(), XcvmError> {
        match self {
            Balance::Absolute(_) => Ok(()),
            Balance::Unit(unit) => unit.ratio.validate(),
            Balance::Ratio(ratio) => ratio.validate(),
        }
    }
}

impl Validate for Asset {
    fn validate(&self) -> Result<(), XcvmError> {
        self.balance.validate()
    }
}

impl Validate for BindingValue {
    fn validate(&self) -> Result<(), XcvmError> {
        match self {
            BindingValue::AssetAmount(amount) => amount.ratio.validate(),
            _ => Ok(()),
        }
    }
}

impl Validate for Bindings {
    fn validate(&self) -> Result<(), XcvmError> {
        for binding in self.iter() {
            binding.value.validate()?;
        }
        if let Some(position) = self.first_duplicate() {
            return Err(XcvmError::InvalidBindingPosition {
                position,
                reason: BindingFault::Duplicate,
            });
        }
        Ok(())
    }
}

impl Validate for Transfer {
    fn validate(&self) -> Result<(), XcvmError> {
        if self.assets().is_empty() {
            return Err(XcvmError::EmptyAssetList {
                instruction: "Transfer",
            });
        }
        self.assets().validate()
    }
}

impl Validate for Call {
    fn validate(&self) -> Result<(), XcvmError> {
        self.bindings().validate()?;
        self.bindings().check_within(self.payload().len())
    }
}

impl Validate for Query {
    fn validate(&self) -> Result<(), XcvmError> {
        Ok(())
    }
}

impl Validate for Spawn {
    fn validate(&self) -> Result<(), XcvmError> {
        self.assets().validate()?;
        self.program().validate()
    }
}

impl Validate for Instruction {
    fn validate(&self) -> Result<(), XcvmError> {
        match self {
            Instruction::Transfer(transfer) => transfer.validate(),
            Instruction::Spawn(spawn) => spawn.validate(),
            Instruction::Call(call) => call.validate(),
            Instruction::Query(query) => query.validate(),
        }
    }
}

impl Validate for Instructions {
    fn validate(&self) -> Result<(), XcvmError> {
        for (index, instruction) in self.iter().enumerate() {
            instruction.validate()?;
            if let Instruction::Call(call) = instruction {
                call.bindings().check_results_precede(index)?;
            }
        }
        Ok(())
    }
}

impl Validate for Program {
    fn validate(&self) -> Result<(), XcvmError> {
        self.instructions().validate()
    }
}
