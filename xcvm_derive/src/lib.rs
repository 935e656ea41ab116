//! Derive macros for the xcvm crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - wire encoding for IR nodes
//! - `#[derive(Error)]` - `Display` and `Error` for error enums

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements `Encode` and `Decode` for a struct or enum.
///
/// `#[binary_codec(encode_only)]` on the type skips the `Decode` impl, for
/// types whose decoding needs extra context (e.g. a nesting depth).
#[proc_macro_derive(BinaryCodec, attributes(binary_codec))]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` and `Error` for error types.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
