//! Fluent construction of whole programs.
//!
//! ```ignore
//! let program = ProgramBuilder::new()
//!     .call(payload, vec![Binding::new(4, BindingValue::Relayer)])
//!     .spawn(Network::ETHEREUM, b"salt", BridgeSecurity::Deterministic, vec![], |inner| {
//!         inner.transfer(Destination::Relayer, vec![asset])
//!     })
//!     .build()?;
//! ```

use crate::types::bytes::Bytes;
use crate::xcvm::binding::{Binding, Bindings};
use crate::xcvm::errors::XcvmError;
use crate::xcvm::instruction::{Call, Destination, Instruction, Instructions, Query, Spawn, Transfer};
use crate::xcvm::network::{BridgeSecurity, Network, Salt};
use crate::xcvm::program::Program;
use crate::xcvm::value::Asset;

/// Accumulates instructions in order. The first failure is kept and
/// returned by [`ProgramBuilder::build`]; later steps are skipped.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    error: Option<XcvmError>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next instruction will occupy, for `result(i)` bindings.
    ///
    /// Saturates at `u32::MAX`, the largest index a binding can name.
    pub fn next_index(&self) -> u32 {
        index_of(self.instructions.len())
    }

    pub fn transfer(self, destination: impl Into<Destination>, assets: Vec<Asset>) -> Self {
        self.push_with(|| Transfer::new(destination, assets).map(Instruction::from))
    }

    pub fn call(self, payload: impl Into<Bytes>, bindings: Vec<Binding>) -> Self {
        self.push_with(|| {
            let bindings = Bindings::new(bindings)?;
            Call::new(payload, bindings).map(Instruction::from)
        })
    }

    pub fn query(self, payload: impl Into<Bytes>) -> Self {
        self.push_with(|| Ok(Query::new(payload).into()))
    }

    /// Spawns the program built by `body` on `network`.
    pub fn spawn<F>(
        self,
        network: Network,
        salt: impl Into<Bytes>,
        security: BridgeSecurity,
        assets: Vec<Asset>,
        body: F,
    ) -> Self
    where
        F: FnOnce(ProgramBuilder) -> ProgramBuilder,
    {
        self.push_with(|| {
            let program = body(ProgramBuilder::new()).build()?;
            Spawn::new(network, Salt::new(salt), security, program, assets).map(Instruction::from)
        })
    }

    /// Appends an already constructed instruction.
    pub fn instruction(self, instruction: impl Into<Instruction>) -> Self {
        self.push_with(|| Ok(instruction.into()))
    }

    /// Finishes the program, checking `result(i)` references across the
    /// whole instruction list.
    pub fn build(self) -> Result<Program, XcvmError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Program::new(Instructions::new(self.instructions)?))
    }

    fn push_with(mut self, make: impl FnOnce() -> Result<Instruction, XcvmError>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match make() {
            Ok(instruction) => self.instructions.push(instruction),
            Err(error) => self.error = Some(error),
        }
        self
    }
}

fn index_of(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
