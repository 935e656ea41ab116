//! Wire-level primitives shared by the IR and the gateway.
//!
//! - `encoding`: `Encode`/`Decode` traits and the structural `DecodeError`
//! - `bytes`: immutable, cheaply clonable byte buffer
//! - `hash`: SHA3-256 program identity
//! - `wrapper_types`: `BoxFuture` alias for the gateway seam

pub mod bytes;
pub mod encoding;
pub mod hash;
pub mod wrapper_types;
