//! Tag-checked composition of IR nodes.
//!
//! The typed constructors on each IR type are the primary API. This module
//! serves callers that hold values whose kind is only known at runtime
//! (the assembler, or anything driven by external input): every `compose_*`
//! function first checks the tag of each argument against what it accepts,
//! failing with [`XcvmError::TypeMismatch`], and only then builds the node
//! through the typed constructor. A mistagged argument therefore never
//! leaves a partially built value behind.

use crate::types::bytes::Bytes;
use crate::xcvm::binding::{AssetAmount, Binding, BindingValue, Bindings};
use crate::xcvm::errors::XcvmError;
use crate::xcvm::instruction::{Call, Destination, Instruction, Instructions, Query, Spawn, Transfer};
use crate::xcvm::network::{BridgeSecurity, Network, Salt};
use crate::xcvm::program::Program;
use crate::xcvm::value::{Absolute, Account, Asset, AssetId, Balance, Ratio, Unit};

/// Any IR value, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Ratio(Ratio),
    Unit(Unit),
    Absolute(Absolute),
    Balance(Balance),
    AssetId(AssetId),
    Asset(Asset),
    Account(Account),
    Relayer,
    SelfAccount,
    AssetAmount(AssetAmount),
    Result(u32),
    BindingValue(BindingValue),
    Binding(Binding),
    Bindings(Bindings),
    Transfer(Transfer),
    Spawn(Spawn),
    Call(Call),
    Query(Query),
    Instruction(Instruction),
    Instructions(Instructions),
    Program(Program),
    Network(Network),
    Salt(Salt),
    BridgeSecurity(BridgeSecurity),
    Bytes(Bytes),
}

impl Node {
    /// Kind name reported in `TypeMismatch`.
    pub fn tag(&self) -> &'static str {
        match self {
            Node::Ratio(_) => "Ratio",
            Node::Unit(_) => "Unit",
            Node::Absolute(_) => "Absolute",
            Node::Balance(_) => "Balance",
            Node::AssetId(_) => "AssetId",
            Node::Asset(_) => "Asset",
            Node::Account(_) => "Account",
            Node::Relayer => "Relayer",
            Node::SelfAccount => "Self",
            Node::AssetAmount(_) => "AssetAmount",
            Node::Result(_) => "Result",
            Node::BindingValue(_) => "BindingValue",
            Node::Binding(_) => "Binding",
            Node::Bindings(_) => "Bindings",
            Node::Transfer(_) => "Transfer",
            Node::Spawn(_) => "Spawn",
            Node::Call(_) => "Call",
            Node::Query(_) => "Query",
            Node::Instruction(_) => "Instruction",
            Node::Instructions(_) => "Instructions",
            Node::Program(_) => "Program",
            Node::Network(_) => "Network",
            Node::Salt(_) => "Salt",
            Node::BridgeSecurity(_) => "BridgeSecurity",
            Node::Bytes(_) => "Bytes",
        }
    }

    fn mismatch(&self, expected: &'static str) -> XcvmError {
        XcvmError::TypeMismatch {
            expected,
            actual: self.tag(),
        }
    }
}

macro_rules! node_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Node {
                fn from(value: $variant) -> Self {
                    Node::$variant(value)
                }
            }
        )*
    };
}

node_from!(
    Ratio,
    Unit,
    Absolute,
    Balance,
    AssetId,
    Asset,
    Account,
    AssetAmount,
    BindingValue,
    Binding,
    Bindings,
    Transfer,
    Spawn,
    Call,
    Query,
    Instruction,
    Instructions,
    Program,
    Network,
    Salt,
    BridgeSecurity,
    Bytes,
);

/// Moves the payload out of a single-kind node or reports the mismatch.
macro_rules! take {
    ($node:expr, $variant:ident) => {
        match $node {
            Node::$variant(value) => Ok(value),
            other => Err(other.mismatch(stringify!($variant))),
        }
    };
}

/// Checks every element of a list before anything is built from it.
macro_rules! take_all {
    ($nodes:expr, $variant:ident) => {
        $nodes
            .into_iter()
            .map(|node| take!(node, $variant))
            .collect::<Result<Vec<_>, XcvmError>>()
    };
}

pub fn compose_unit(integer: u128, ratio: Node) -> Result<Unit, XcvmError> {
    Ok(Unit::new(integer, take!(ratio, Ratio)?))
}

/// Wraps an `Absolute`, `Unit` or `Ratio` node as a `Balance`.
pub fn compose_balance(candidate: Node) -> Result<Balance, XcvmError> {
    match candidate {
        Node::Absolute(absolute) => Ok(Balance::Absolute(absolute)),
        Node::Unit(unit) => Ok(Balance::Unit(unit)),
        Node::Ratio(ratio) => Ok(Balance::Ratio(ratio)),
        other => Err(other.mismatch("Absolute|Unit|Ratio")),
    }
}

pub fn compose_asset(asset_id: Node, balance: Node) -> Result<Asset, XcvmError> {
    let asset_id = take!(asset_id, AssetId)?;
    let balance = take!(balance, Balance)?;
    Ok(Asset::new(asset_id, balance))
}

/// Builds a transfer to an `Account` or the `Relayer`.
pub fn compose_transfer(destination: Node, assets: Vec<Node>) -> Result<Transfer, XcvmError> {
    let destination = match destination {
        Node::Account(account) => Destination::Account(account),
        Node::Relayer => Destination::Relayer,
        other => return Err(other.mismatch("Account|Relayer")),
    };
    let assets = take_all!(assets, Asset)?;
    Transfer::new(destination, assets)
}

pub fn compose_asset_amount(asset_id: Node, ratio: Node) -> Result<AssetAmount, XcvmError> {
    let asset_id = take!(asset_id, AssetId)?;
    let ratio = take!(ratio, Ratio)?;
    Ok(AssetAmount::new(asset_id, ratio))
}

pub fn compose_binding_value(candidate: Node) -> Result<BindingValue, XcvmError> {
    match candidate {
        Node::SelfAccount => Ok(BindingValue::SelfAccount),
        Node::Relayer => Ok(BindingValue::Relayer),
        Node::AssetAmount(amount) => Ok(BindingValue::AssetAmount(amount)),
        Node::AssetId(id) => Ok(BindingValue::AssetId(id)),
        Node::Result(index) => Ok(BindingValue::Result(index)),
        other => Err(other.mismatch("Self|Relayer|AssetAmount|AssetId|Result")),
    }
}

pub fn compose_binding(position: u32, value: Node) -> Result<Binding, XcvmError> {
    Ok(Binding::new(position, take!(value, BindingValue)?))
}

pub fn compose_bindings(bindings: Vec<Node>) -> Result<Bindings, XcvmError> {
    Bindings::new(take_all!(bindings, Binding)?)
}

pub fn compose_call(payload: Node, bindings: Node) -> Result<Call, XcvmError> {
    let payload = take!(payload, Bytes)?;
    let bindings = take!(bindings, Bindings)?;
    Call::new(payload, bindings)
}

pub fn compose_query(payload: Node) -> Result<Query, XcvmError> {
    Ok(Query::new(take!(payload, Bytes)?))
}

/// Wraps exactly one of the four instruction kinds.
pub fn compose_instruction(candidate: Node) -> Result<Instruction, XcvmError> {
    match candidate {
        Node::Transfer(transfer) => Ok(Instruction::Transfer(transfer)),
        Node::Spawn(spawn) => Ok(Instruction::Spawn(spawn)),
        Node::Call(call) => Ok(Instruction::Call(call)),
        Node::Query(query) => Ok(Instruction::Query(query)),
        other => Err(other.mismatch("Transfer|Spawn|Call|Query")),
    }
}

pub fn compose_instructions(instructions: Vec<Node>) -> Result<Instructions, XcvmError> {
    Instructions::new(take_all!(instructions, Instruction)?)
}

pub fn compose_program(instructions: Node) -> Result<Program, XcvmError> {
    Ok(Program::new(take!(instructions, Instructions)?))
}

/// Builds a spawn of an already validated `program`, checking its assets
/// and the resulting nesting depth.
pub fn compose_spawn(
    network: Node,
    salt: Node,
    security: Node,
    program: Node,
    assets: Vec<Node>,
) -> Result<Spawn, XcvmError> {
    let network = take!(network, Network)?;
    let salt = take!(salt, Salt)?;
    let security = take!(security, BridgeSecurity)?;
    let program = take!(program, Program)?;
    let assets = take_all!(assets, Asset)?;
    Spawn::new(network, salt, security, program, assets)
}
