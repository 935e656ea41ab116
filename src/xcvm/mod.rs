//! XCVM program intermediate representation.
//!
//! A program is a tree: `Program -> Instructions -> Instruction`, where a
//! `Spawn` instruction carries another whole `Program` for a different
//! network. Every node is immutable once built and checked on construction.
//!
//! - `value`, `binding`, `network`: leaves and small composites
//! - `instruction`, `program`: the tree itself and its wire envelope
//! - `validate`: invariant checks shared by constructors and decoding
//! - `compose`: tag-checked composition of dynamically typed nodes
//! - `builder`: fluent construction of whole programs
//! - `assembler`: text form of programs

pub mod assembler;
pub mod binding;
pub mod builder;
pub mod compose;
pub mod errors;
pub mod instruction;
pub mod network;
pub mod program;
pub mod validate;
pub mod value;
