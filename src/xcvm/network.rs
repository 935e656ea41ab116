//! Addressing of remote execution: target network, salt and trust level.

use crate::types::bytes::Bytes;
use std::fmt;
use xcvm_derive::BinaryCodec;

/// Identifier of a network the interpreter is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BinaryCodec)]
pub struct Network {
    pub id: u32,
}

impl Network {
    pub const PICASSO: Network = Network { id: 1 };
    pub const ETHEREUM: Network = Network { id: 2 };

    pub const fn new(id: u32) -> Self {
        Self { id }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network:{}", self.id)
    }
}

/// Seed from which the destination derives the spawned program's address.
///
/// The same salt on the same network always yields the same interpreter
/// instance; the derivation itself belongs to the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, BinaryCodec)]
pub struct Salt(pub Bytes);

impl Salt {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "salt:{}", self.0)
    }
}

/// Trust the destination must place in the bridge that carried a spawn
/// before executing it. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BinaryCodec)]
pub enum BridgeSecurity {
    /// No guarantee about message authenticity.
    Insecure = 0,
    /// Accepted unless challenged within a dispute window.
    Optimistic = 1,
    /// Accepted after enough confirmations to make reversal unlikely.
    Probabilistic = 2,
    /// Accepted only after the source chain finalized it.
    Deterministic = 3,
}

impl BridgeSecurity {
    pub const ALL: [BridgeSecurity; 4] = [
        BridgeSecurity::Insecure,
        BridgeSecurity::Optimistic,
        BridgeSecurity::Probabilistic,
        BridgeSecurity::Deterministic,
    ];

    /// Name used by the assembler.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeSecurity::Insecure => "insecure",
            BridgeSecurity::Optimistic => "optimistic",
            BridgeSecurity::Probabilistic => "probabilistic",
            BridgeSecurity::Deterministic => "deterministic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for BridgeSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "security:{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, DecodeError, Encode};

    #[test]
    fn security_wire_values() {
        for (expected, security) in BridgeSecurity::ALL.iter().enumerate() {
            assert_eq!(security.to_bytes().as_slice(), &[expected as u8]);
            assert_eq!(*security as u8, expected as u8);
        }
    }

    #[test]
    fn security_unknown_value() {
        assert_eq!(
            BridgeSecurity::from_bytes(&[4]),
            Err(DecodeError::InvalidTag {
                ty: "BridgeSecurity",
                tag: 4
            })
        );
    }

    #[test]
    fn security_names_roundtrip() {
        for security in BridgeSecurity::ALL {
            assert_eq!(BridgeSecurity::from_name(security.name()), Some(security));
        }
        assert_eq!(BridgeSecurity::from_name("trusted"), None);
    }

    #[test]
    fn security_ordering() {
        assert!(BridgeSecurity::Insecure < BridgeSecurity::Deterministic);
    }

    #[test]
    fn well_known_networks() {
        assert_eq!(Network::PICASSO.id, 1);
        assert_eq!(Network::ETHEREUM.id, 2);
        assert_eq!(Network::from_bytes(&Network::ETHEREUM.to_bytes()).unwrap(), Network::ETHEREUM);
    }
}
