//! The four instruction kinds and their ordered aggregation.

use crate::config::CodecLimits;
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError};
use crate::xcvm::binding::Bindings;
use crate::xcvm::errors::XcvmError;
use crate::xcvm::network::{BridgeSecurity, Network, Salt};
use crate::xcvm::program::Program;
use crate::xcvm::validate::Validate;
use crate::xcvm::value::{Account, Asset};
use xcvm_derive::BinaryCodec;

/// Recipient of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
pub enum Destination {
    Account(Account),
    /// Whoever relays the message that carries this program.
    Relayer,
}

impl From<Account> for Destination {
    fn from(account: Account) -> Self {
        Destination::Account(account)
    }
}

/// Moves assets held by the interpreter to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Transfer {
    destination: Destination,
    assets: Vec<Asset>,
}

impl Transfer {
    /// Creates a transfer. An empty asset list is rejected.
    pub fn new(destination: impl Into<Destination>, assets: Vec<Asset>) -> Result<Self, XcvmError> {
        let transfer = Self {
            destination: destination.into(),
            assets,
        };
        transfer.validate()?;
        Ok(transfer)
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

impl Decode for Transfer {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let destination = Destination::decode(input)?;
        let assets = Vec::<Asset>::decode(input)?;
        Ok(Self::new(destination, assets)?)
    }
}

/// Opaque call on the executing chain, with runtime substitutions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Call {
    payload: Bytes,
    bindings: Bindings,
}

impl Call {
    /// Creates a call. Every binding position must fall inside `payload`.
    pub fn new(payload: impl Into<Bytes>, bindings: Bindings) -> Result<Self, XcvmError> {
        let call = Self {
            payload: payload.into(),
            bindings,
        };
        call.validate()?;
        Ok(call)
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

impl Decode for Call {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let payload = Bytes::decode(input)?;
        let bindings = Bindings::decode(input)?;
        Ok(Self::new(payload, bindings)?)
    }
}

/// Opaque read-only request on the executing chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Query {
    pub payload: Bytes,
}

impl Query {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Dispatches a nested program, with assets, to another network.
///
/// Decoding is depth-bounded and lives in [`crate::xcvm::program`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Spawn {
    pub(crate) network: Network,
    pub(crate) salt: Salt,
    pub(crate) security: BridgeSecurity,
    pub(crate) program: Box<Program>,
    pub(crate) assets: Vec<Asset>,
}

impl Spawn {
    /// Creates a spawn. The asset list may be empty, but the nesting it
    /// produces must stay within the configured spawn depth so the result
    /// can always be decoded again.
    pub fn new(
        network: Network,
        salt: Salt,
        security: BridgeSecurity,
        program: Program,
        assets: Vec<Asset>,
    ) -> Result<Self, XcvmError> {
        let limit = CodecLimits::global().max_spawn_depth;
        let depth = program.depth() + 1;
        if depth > limit {
            return Err(XcvmError::DepthExceeded { depth, limit });
        }
        let spawn = Self {
            network,
            salt,
            security,
            program: Box::new(program),
            assets,
        };
        spawn.assets().validate()?;
        Ok(spawn)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn security(&self) -> BridgeSecurity {
        self.security
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

/// One step of a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub enum Instruction {
    Transfer(Transfer),
    Spawn(Spawn),
    Call(Call),
    Query(Query),
}

impl Instruction {
    /// Kind name, as used in error messages and assembly.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Transfer(_) => "Transfer",
            Instruction::Spawn(_) => "Spawn",
            Instruction::Call(_) => "Call",
            Instruction::Query(_) => "Query",
        }
    }
}

impl From<Transfer> for Instruction {
    fn from(value: Transfer) -> Self {
        Instruction::Transfer(value)
    }
}

impl From<Spawn> for Instruction {
    fn from(value: Spawn) -> Self {
        Instruction::Spawn(value)
    }
}

impl From<Call> for Instruction {
    fn from(value: Call) -> Self {
        Instruction::Call(value)
    }
}

impl From<Query> for Instruction {
    fn from(value: Query) -> Self {
        Instruction::Query(value)
    }
}

/// Instructions in execution order.
///
/// A call's `result(i)` bindings may only name instructions that come
/// before it in this list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Instructions {
    pub(crate) instructions: Vec<Instruction>,
}

impl Instructions {
    /// Creates an instruction list, rejecting forward `result` references.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, XcvmError> {
        let instructions = Self { instructions };
        instructions.validate()?;
        Ok(instructions)
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};
    use crate::utils::test_utils::utils::{nested_program, sample_asset, sample_call, sample_transfer};
    use crate::xcvm::binding::{Binding, BindingValue};
    use crate::xcvm::errors::BindingFault;
    use crate::xcvm::value::{AssetId, Ratio};

    #[test]
    fn transfer_requires_assets() {
        let err = Transfer::new(Destination::Relayer, vec![]).unwrap_err();
        assert_eq!(
            err,
            XcvmError::EmptyAssetList {
                instruction: "Transfer"
            }
        );
    }

    #[test]
    fn empty_transfer_always_rejected() {
        let account = Account::new([1u8; 20]);
        for destination in [Destination::Relayer, account.into()] {
            assert!(matches!(
                Transfer::new(destination, Vec::new()),
                Err(XcvmError::EmptyAssetList { .. })
            ));
        }
    }

    #[test]
    fn transfer_roundtrip() {
        let transfer = sample_transfer();
        assert_eq!(Transfer::from_bytes(&transfer.to_bytes()).unwrap(), transfer);
    }

    #[test]
    fn call_rejects_binding_past_payload() {
        let bindings = Bindings::new(vec![Binding::new(4, BindingValue::SelfAccount)]).unwrap();
        let err = Call::new([0u8; 4], bindings).unwrap_err();
        assert_eq!(
            err,
            XcvmError::InvalidBindingPosition {
                position: 4,
                reason: BindingFault::OutsidePayload { len: 4 }
            }
        );
    }

    #[test]
    fn result_reference_must_point_backwards() {
        let call = |result| {
            let bindings = Bindings::new(vec![Binding::new(0, BindingValue::Result(result))]).unwrap();
            Instruction::from(Call::new([0u8; 8], bindings).unwrap())
        };

        let with_result = |result| {
            Instructions::new(vec![
                sample_transfer().into(),
                sample_transfer().into(),
                call(result),
            ])
        };

        assert!(with_result(1).is_ok());
        assert!(matches!(
            with_result(3),
            Err(XcvmError::InvalidBindingPosition {
                reason: BindingFault::ForwardResult { result: 3, index: 2 },
                ..
            })
        ));
        // An instruction cannot consume its own output.
        assert!(with_result(2).is_err());
    }

    #[test]
    fn spawn_accepts_empty_assets() {
        let spawn = Spawn::new(
            Network::ETHEREUM,
            Salt::new([7u8]),
            BridgeSecurity::Deterministic,
            Program::default(),
            vec![],
        )
        .unwrap();
        assert!(spawn.assets().is_empty());
        assert_eq!(spawn.program(), &Program::default());
    }

    #[test]
    fn spawn_rejects_invalid_asset() {
        let bad = Asset::new(AssetId::new(1), Ratio { numerator: 1, denominator: 0 });
        let err = Spawn::new(
            Network::PICASSO,
            Salt::default(),
            BridgeSecurity::Optimistic,
            Program::default(),
            vec![sample_asset(), bad],
        )
        .unwrap_err();
        assert_eq!(err, XcvmError::InvalidRatio { denominator: 0 });
    }

    #[test]
    fn spawn_nesting_bounded_by_depth_limit() {
        let limit = CodecLimits::global().max_spawn_depth;
        let deepest = nested_program(limit);
        assert_eq!(deepest.depth(), limit);
        let err = Spawn::new(
            Network::ETHEREUM,
            Salt::default(),
            BridgeSecurity::Deterministic,
            deepest,
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            XcvmError::DepthExceeded {
                depth: limit + 1,
                limit
            }
        );
    }

    #[test]
    fn empty_transfer_refused_by_decode() {
        let mut bytes = Vec::new();
        Destination::Relayer.encode(&mut bytes);
        Vec::<Asset>::new().encode(&mut bytes);
        assert_eq!(
            XcvmError::from(Transfer::from_bytes(&bytes).unwrap_err()),
            XcvmError::EmptyAssetList {
                instruction: "Transfer"
            }
        );
    }

    #[test]
    fn instruction_tags_follow_schema_order() {
        let spawn = Spawn::new(
            Network::PICASSO,
            Salt::default(),
            BridgeSecurity::Insecure,
            Program::default(),
            vec![sample_asset()],
        )
        .unwrap();
        let tags: Vec<u8> = [
            Instruction::from(sample_transfer()),
            Instruction::from(spawn),
            Instruction::from(sample_call()),
            Instruction::from(Query::new([1u8])),
        ]
        .iter()
        .map(|i| i.to_bytes()[0])
        .collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);
    }

    #[test]
    fn instruction_kind_names() {
        assert_eq!(Instruction::from(sample_call()).kind(), "Call");
        assert_eq!(Instruction::from(Query::new([0u8])).kind(), "Query");
    }
}
