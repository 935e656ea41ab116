//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! ```ignore
//! use xcvm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum XcvmError {
//!     #[error("type mismatch: expected {expected}, got {actual}")]
//!     TypeMismatch { expected: &'static str, actual: &'static str },
//!
//!     #[error("decoding error: {0}")]
//!     Decode(DecodeError),
//! }
//! ```
//!
//! Only the fields named in the message are passed to `write!`, so a variant
//! may carry context that is not printed.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let display_body = match &input.data {
        Data::Enum(data_enum) => {
            let mut arms = Vec::with_capacity(data_enum.variants.len());

            for variant in &data_enum.variants {
                let variant_name = &variant.ident;
                let error_msg = extract_error_message_from_attrs(
                    &variant.attrs,
                    &variant.ident,
                    &format!("variant `{}`", variant.ident),
                )?;

                let arm = match &variant.fields {
                    Fields::Unit => quote! {
                        Self::#variant_name => write!(f, #error_msg),
                    },
                    Fields::Unnamed(fields) => {
                        let count = fields.unnamed.len();
                        let format_str = convert_positional_to_named(&error_msg, count);
                        let (patterns, args) = positional_bindings(&format_str, count);
                        quote! {
                            Self::#variant_name(#(#patterns),*) => write!(f, #format_str #(, #args = #args)*),
                        }
                    }
                    Fields::Named(fields) => {
                        let used: Vec<_> = fields
                            .named
                            .iter()
                            .filter_map(|field| field.ident.as_ref())
                            .filter(|ident| mentions(&error_msg, &ident.to_string()))
                            .collect();
                        quote! {
                            Self::#variant_name { #(#used,)* .. } => write!(f, #error_msg #(, #used = #used)*),
                        }
                    }
                };
                arms.push(arm);
            }

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data_struct) => {
            let error_msg = extract_error_message_from_attrs(
                &input.attrs,
                &input.ident,
                &format!("type `{}`", input.ident),
            )?;

            let body = match &data_struct.fields {
                Fields::Unit => quote! { write!(f, #error_msg) },
                Fields::Named(fields) => {
                    let used: Vec<_> = fields
                        .named
                        .iter()
                        .filter_map(|field| field.ident.as_ref())
                        .filter(|ident| mentions(&error_msg, &ident.to_string()))
                        .collect();
                    quote! { write!(f, #error_msg #(, #used = self.#used)*) }
                }
                Fields::Unnamed(fields) => {
                    let count = fields.unnamed.len();
                    let format_str = convert_positional_to_named(&error_msg, count);
                    let (idents, indices): (Vec<_>, Vec<_>) = (0..count)
                        .filter(|i| mentions(&format_str, &format!("f{i}")))
                        .map(|i| (format_ident!("f{}", i), syn::Index::from(i)))
                        .unzip();
                    quote! { write!(f, #format_str #(, #idents = self.#indices)*) }
                }
            };
            body
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds match patterns for a tuple variant, binding only printed fields.
fn positional_bindings(format_str: &str, count: usize) -> (Vec<TokenStream2>, Vec<syn::Ident>) {
    let mut patterns = Vec::with_capacity(count);
    let mut args = Vec::new();
    for i in 0..count {
        let ident = format_ident!("f{}", i);
        if mentions(format_str, &ident.to_string()) {
            patterns.push(ident.to_token_stream());
            args.push(ident);
        } else {
            patterns.push(quote! { _ });
        }
    }
    (patterns, args)
}

/// Whether `{name}` or `{name:...}` occurs in the format string.
fn mentions(format_str: &str, name: &str) -> bool {
    format_str.contains(&format!("{{{name}}}")) || format_str.contains(&format!("{{{name}:"))
}

fn extract_error_message_from_attrs<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("error") {
            if let Meta::List(meta_list) = &attr.meta {
                let lit = syn::parse2::<Lit>(meta_list.tokens.clone()).map_err(|_| {
                    syn::Error::new_spanned(
                        &attr.meta,
                        "failed to parse #[error] attribute; expected a string literal like #[error(\"decoding error: {0}\")]",
                    )
                })?;

                if let Lit::Str(lit_str) = lit {
                    return Ok(lit_str.value());
                }

                return Err(syn::Error::new_spanned(
                    &attr.meta,
                    "invalid #[error] attribute: message must be a string literal",
                ));
            }

            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
            ));
        }
    }

    Err(syn::Error::new_spanned(
        target,
        format!(
            "missing #[error(\"...\")] attribute on {}; every error variant must declare a display message",
            target_desc
        ),
    ))
}

/// Converts positional format args `{0}`, `{1}` to named args `{f0}`, `{f1}`.
fn convert_positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result.replace(&format!("{{{i}}}"), &format!("{{f{i}}}"));
        result = result.replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
