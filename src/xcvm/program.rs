//! Top-level program and its wire envelope.
//!
//! An encoded program is `MAGIC || Version || Program`. Decoding untrusted
//! bytes is depth-bounded, and every node is put through the same invariant
//! checks its typed constructor applies as it is read. A decoded program is
//! therefore always one the constructors could have built.

use crate::config::CodecLimits;
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink, decode_len};
use crate::types::hash::Hash;
use crate::xcvm::errors::XcvmError;
use crate::xcvm::instruction::{Call, Instruction, Instructions, Query, Spawn, Transfer};
use crate::xcvm::network::{BridgeSecurity, Network, Salt};
use crate::xcvm::value::Asset;
use xcvm_derive::BinaryCodec;

/// Magic bytes identifying a serialized XCVM program.
const MAGIC: &[u8; 4] = b"XCVM";

/// Current wire format version.
const CURRENT_VERSION: Version = Version::new(0, 1, 0);

/// Semantic version for wire format compatibility.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, BinaryCodec)]
struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// The unit submitted for execution. May be nested inside a [`Spawn`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, BinaryCodec)]
#[binary_codec(encode_only)]
pub struct Program {
    pub(crate) instructions: Instructions,
}

impl Program {
    pub fn new(instructions: Instructions) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.instructions
    }

    /// Deepest `Spawn` nesting. A program without spawns has depth 0.
    pub fn depth(&self) -> usize {
        self.instructions
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Spawn(spawn) => Some(1 + spawn.program().depth()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of instructions, counting those of spawned programs.
    pub fn instruction_count(&self) -> usize {
        self.instructions
            .iter()
            .map(|instruction| match instruction {
                Instruction::Spawn(spawn) => 1 + spawn.program().instruction_count(),
                _ => 1,
            })
            .sum()
    }

    /// Serializes the program inside its versioned envelope.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(MAGIC.len() + 3 + self.encoded_len());
        self.encode_envelope(&mut out);
        Bytes::from_vec(out)
    }

    /// SHA3-256 of the envelope, streamed straight into the hasher.
    pub fn hash(&self) -> Hash {
        let mut hasher = Hash::sha3();
        self.encode_envelope(&mut hasher);
        hasher.finalize()
    }

    /// Decodes and validates an envelope using the process-wide limits.
    pub fn from_bytes(input: &[u8]) -> Result<Self, XcvmError> {
        Self::from_bytes_with(input, CodecLimits::global())
    }

    /// Decodes and validates an envelope using explicit limits.
    pub fn from_bytes_with(input: &[u8], limits: &CodecLimits) -> Result<Self, XcvmError> {
        Ok(Self::decode_envelope(input, limits)?)
    }

    fn encode_envelope<S: EncodeSink>(&self, out: &mut S) {
        MAGIC.encode(out);
        CURRENT_VERSION.encode(out);
        self.encode(out);
    }

    fn decode_envelope(mut input: &[u8], limits: &CodecLimits) -> Result<Self, DecodeError> {
        if input.len() > limits.max_program_len {
            return Err(DecodeError::ProgramTooLarge {
                len: input.len(),
                limit: limits.max_program_len,
            });
        }

        if &<[u8; 4]>::decode(&mut input)? != MAGIC {
            return Err(DecodeError::BadMagic);
        }

        let version = Version::decode(&mut input)?;
        if version != CURRENT_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
                patch: version.patch,
            });
        }

        let decoder = NestedDecoder {
            max_depth: limits.max_spawn_depth,
        };
        let program = decoder.program(&mut input, 0)?;
        if !input.is_empty() {
            return Err(DecodeError::TrailingBytes {
                remaining: input.len(),
            });
        }
        Ok(program)
    }
}

/// Bare program body, without envelope, bounded by the global depth limit
/// and validated like an envelope.
impl Decode for Program {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        NestedDecoder {
            max_depth: CodecLimits::global().max_spawn_depth,
        }
        .program(input, 0)
    }
}

/// Decoder for the recursive `Program -> Instruction -> Spawn` cycle.
///
/// `depth` is the nesting level of the program being decoded; the root is 0.
struct NestedDecoder {
    max_depth: usize,
}

impl NestedDecoder {
    fn program(&self, input: &mut &[u8], depth: usize) -> Result<Program, DecodeError> {
        Ok(Program {
            instructions: self.instructions(input, depth)?,
        })
    }

    fn instructions(&self, input: &mut &[u8], depth: usize) -> Result<Instructions, DecodeError> {
        let len = decode_len(input)?;
        let mut instructions = Vec::with_capacity(len.min(input.len()));
        for index in 0..len {
            let instruction = self.instruction(input, depth)?;
            if let Instruction::Call(call) = &instruction {
                call.bindings().check_results_precede(index)?;
            }
            instructions.push(instruction);
        }
        Ok(Instructions { instructions })
    }

    // Tags mirror the declaration order of `Instruction`. Leaf instructions
    // validate themselves in their own `Decode` impls.
    fn instruction(&self, input: &mut &[u8], depth: usize) -> Result<Instruction, DecodeError> {
        let tag = u8::decode(input)?;
        match tag {
            0 => Ok(Instruction::Transfer(Transfer::decode(input)?)),
            1 => Ok(Instruction::Spawn(self.spawn(input, depth + 1)?)),
            2 => Ok(Instruction::Call(Call::decode(input)?)),
            3 => Ok(Instruction::Query(Query::decode(input)?)),
            _ => Err(DecodeError::InvalidTag {
                ty: "Instruction",
                tag,
            }),
        }
    }

    fn spawn(&self, input: &mut &[u8], depth: usize) -> Result<Spawn, DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(Spawn {
            network: Network::decode(input)?,
            salt: Salt::decode(input)?,
            security: BridgeSecurity::decode(input)?,
            program: Box::new(self.program(input, depth)?),
            assets: Vec::<Asset>::decode(input)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::{nested_program, sample_asset, sample_call, sample_transfer};
    use crate::xcvm::binding::{AssetAmount, Binding, BindingValue, Bindings};
    use crate::xcvm::errors::BindingFault;
    use crate::xcvm::instruction::Destination;
    use crate::xcvm::value::{Account, AssetId, Ratio, Unit};

    fn single(instruction: impl Into<Instruction>) -> Program {
        Program::new(Instructions::new(vec![instruction.into()]).unwrap())
    }

    /// Offset of the body's first instruction tag inside an envelope.
    const FIRST_INSTRUCTION: usize = 4 + 3 + 8;

    #[test]
    fn roundtrip_empty_program() {
        let program = Program::default();
        let bytes = program.to_bytes();
        assert_eq!(bytes.len(), FIRST_INSTRUCTION);
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
    }

    #[test]
    fn roundtrip_transfer_program() {
        let account = Account::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let asset = Asset::new(AssetId::new(1), Unit::new(3, Ratio::new(1, 2).unwrap()));
        let transfer = Transfer::new(account, vec![asset]).unwrap();
        let program = single(transfer);

        let decoded = Program::from_bytes(&program.to_bytes()).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn roundtrip_spawn_with_bound_call() {
        let amount = BindingValue::AssetAmount(AssetAmount::new(
            AssetId::new(1),
            Ratio::new(1, 2).unwrap(),
        ));
        let bindings = Bindings::new(vec![Binding::new(4, amount)]).unwrap();
        let inner = single(Call::new(vec![0u8; 36], bindings).unwrap());
        let spawn = Spawn::new(
            Network::ETHEREUM,
            Salt::new(b"salt"),
            BridgeSecurity::Deterministic,
            inner,
            vec![sample_asset()],
        )
        .unwrap();
        let program = single(spawn);

        let decoded = Program::from_bytes(&program.to_bytes()).unwrap();
        assert_eq!(decoded, program);
        assert_eq!(decoded.depth(), 1);
    }

    #[test]
    fn roundtrip_nested_programs() {
        for depth in 0..5 {
            let program = nested_program(depth);
            assert_eq!(program.depth(), depth);
            let decoded = Program::from_bytes(&program.to_bytes()).unwrap();
            assert_eq!(decoded, program);
        }
    }

    #[test]
    fn corrupted_binding_position_rejected() {
        let bindings = Bindings::new(vec![Binding::new(4, BindingValue::Relayer)]).unwrap();
        let program = single(Call::new(vec![0u8; 8], bindings).unwrap());
        let mut bytes = program.to_bytes().to_vec();

        // tag(1) + payload len(8) + payload(8) + bindings len(8)
        let position_at = FIRST_INSTRUCTION + 1 + 8 + 8 + 8;
        assert_eq!(&bytes[position_at..position_at + 4], &4u32.to_le_bytes());
        bytes[position_at..position_at + 4].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = Program::from_bytes(&bytes).unwrap_err();
        assert_eq!(
            err,
            XcvmError::InvalidBindingPosition {
                position: u32::MAX,
                reason: BindingFault::OutsidePayload { len: 8 }
            }
        );
    }

    #[test]
    fn zero_denominator_rejected_after_decode() {
        let ratio = Ratio::new(1, 2).unwrap();
        let asset = Asset::new(AssetId::new(9), ratio);
        let program = single(Transfer::new(Destination::Relayer, vec![asset]).unwrap());
        let mut bytes = program.to_bytes().to_vec();

        // The denominator is the last field of the last asset.
        let len = bytes.len();
        bytes[len - 8..].copy_from_slice(&0u64.to_le_bytes());

        assert_eq!(
            Program::from_bytes(&bytes),
            Err(XcvmError::InvalidRatio { denominator: 0 })
        );
    }

    #[test]
    fn empty_transfer_rejected_after_decode() {
        let mut bytes = Vec::new();
        MAGIC.encode(&mut bytes);
        CURRENT_VERSION.encode(&mut bytes);
        1usize.encode(&mut bytes);
        0u8.encode(&mut bytes);
        Destination::Relayer.encode(&mut bytes);
        0usize.encode(&mut bytes);

        assert_eq!(
            Program::from_bytes(&bytes),
            Err(XcvmError::EmptyAssetList {
                instruction: "Transfer"
            })
        );
    }

    #[test]
    fn bare_body_decode_validates() {
        let mut body = Vec::new();
        1usize.encode(&mut body);
        0u8.encode(&mut body);
        Destination::Relayer.encode(&mut body);
        0usize.encode(&mut body);

        assert_eq!(
            XcvmError::from(<Program as Decode>::from_bytes(&body).unwrap_err()),
            XcvmError::EmptyAssetList {
                instruction: "Transfer"
            }
        );
    }

    #[test]
    fn forward_result_refused_by_decode() {
        let bindings = Bindings::new(vec![Binding::new(0, BindingValue::Result(0))]).unwrap();
        let mut body = Vec::new();
        1usize.encode(&mut body);
        2u8.encode(&mut body);
        Call::new(vec![0u8; 8], bindings).unwrap().encode(&mut body);

        assert!(matches!(
            XcvmError::from(<Program as Decode>::from_bytes(&body).unwrap_err()),
            XcvmError::InvalidBindingPosition {
                reason: BindingFault::ForwardResult { result: 0, index: 0 },
                ..
            }
        ));
    }

    #[test]
    fn depth_limit_matches_construction() {
        let limit = CodecLimits::global().max_spawn_depth;
        let deepest = nested_program(limit);
        assert_eq!(Program::from_bytes(&deepest.to_bytes()).unwrap(), deepest);

        // One level more than any constructor will build.
        let mut bytes = Vec::new();
        MAGIC.encode(&mut bytes);
        CURRENT_VERSION.encode(&mut bytes);
        1usize.encode(&mut bytes);
        1u8.encode(&mut bytes);
        Network::ETHEREUM.encode(&mut bytes);
        Salt::default().encode(&mut bytes);
        BridgeSecurity::Deterministic.encode(&mut bytes);
        deepest.encode(&mut bytes);
        Vec::<Asset>::new().encode(&mut bytes);

        assert_eq!(
            Program::from_bytes(&bytes),
            Err(XcvmError::Decode(DecodeError::DepthExceeded { limit }))
        );
        assert!(matches!(
            Spawn::new(
                Network::ETHEREUM,
                Salt::default(),
                BridgeSecurity::Deterministic,
                deepest,
                vec![],
            ),
            Err(XcvmError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn depth_limit_enforced() {
        let limits = CodecLimits {
            max_spawn_depth: 2,
            ..CodecLimits::default()
        };
        assert!(Program::from_bytes_with(&nested_program(2).to_bytes(), &limits).is_ok());
        assert_eq!(
            Program::from_bytes_with(&nested_program(3).to_bytes(), &limits),
            Err(XcvmError::Decode(DecodeError::DepthExceeded { limit: 2 }))
        );
    }

    #[test]
    fn size_limit_enforced() {
        let program = single(sample_call());
        let bytes = program.to_bytes();
        let limits = CodecLimits {
            max_program_len: bytes.len() - 1,
            ..CodecLimits::default()
        };
        assert!(matches!(
            Program::from_bytes_with(&bytes, &limits),
            Err(XcvmError::Decode(DecodeError::ProgramTooLarge { .. }))
        ));
    }

    #[test]
    fn from_bytes_truncated() {
        let bytes = single(sample_transfer()).to_bytes();
        let err = Program::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err, XcvmError::Decode(DecodeError::UnexpectedEof));
    }

    #[test]
    fn from_bytes_bad_magic() {
        let err = Program::from_bytes(b"EVM0\x00\x01\x00").unwrap_err();
        assert_eq!(err, XcvmError::Decode(DecodeError::BadMagic));
    }

    #[test]
    fn from_bytes_unsupported_version() {
        let mut bytes = Vec::new();
        MAGIC.encode(&mut bytes);
        Version::new(255, 0, 0).encode(&mut bytes);
        0usize.encode(&mut bytes);
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(XcvmError::Decode(DecodeError::UnsupportedVersion {
                major: 255,
                minor: 0,
                patch: 0
            }))
        );
    }

    #[test]
    fn from_bytes_trailing_bytes() {
        let mut bytes = Program::default().to_bytes().to_vec();
        bytes.push(0xFF);
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(XcvmError::Decode(DecodeError::TrailingBytes { remaining: 1 }))
        );
    }

    #[test]
    fn unknown_instruction_tag() {
        let mut bytes = Program::default().to_bytes().to_vec();
        bytes[FIRST_INSTRUCTION - 8..FIRST_INSTRUCTION].copy_from_slice(&1u64.to_le_bytes());
        bytes.push(7);
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(XcvmError::Decode(DecodeError::InvalidTag {
                ty: "Instruction",
                tag: 7
            }))
        );
    }

    #[test]
    fn hash_matches_envelope_hash() {
        let program = nested_program(2);
        let mut hasher = Hash::sha3();
        hasher.update(&program.to_bytes());
        assert_eq!(program.hash(), hasher.finalize());
        assert_ne!(program.hash(), Program::default().hash());
    }

    #[test]
    fn instruction_count_includes_nested() {
        // Each level holds a transfer plus the spawn of the next level.
        assert_eq!(nested_program(0).instruction_count(), 1);
        assert_eq!(nested_program(3).instruction_count(), 7);
    }
}
