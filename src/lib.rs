//! Cross-chain virtual machine program library.
//!
//! Provides the XCVM program IR with typed construction and validation, its
//! binary wire format, a text assembler and a gateway seam for submitting
//! encoded programs to chains.

pub mod config;
pub mod gateway;
pub mod types;
pub mod utils;
pub mod xcvm;
