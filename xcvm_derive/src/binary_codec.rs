//! Derive macro for the wire codec.
//!
//! Fields are written in declaration order using the rules of
//! `crate::types::encoding`:
//! - integers: little-endian, fixed width
//! - `Vec<T>` and byte buffers: 8-byte length prefix followed by elements
//! - enums: a `u8` discriminant followed by the variant's fields
//!
//! Discriminants follow declaration order unless a variant carries an
//! explicit literal (`Deterministic = 3`). They are part of the wire contract,
//! so reordering variants is a breaking change.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Fields, parse_macro_input};

struct Impls {
    encode: TokenStream2,
    decode: TokenStream2,
}

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let encode_only = match is_encode_only(&input.attrs) {
        Ok(flag) => flag,
        Err(err) => return err.to_compile_error().into(),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let impls = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => named_struct_bodies(fields),
            Fields::Unnamed(fields) => tuple_struct_bodies(fields),
            Fields::Unit => Impls {
                encode: quote! { let _ = out; },
                decode: quote! { let _ = input; Ok(Self) },
            },
        },
        Data::Enum(data_enum) => match enum_bodies(name, data_enum) {
            Ok(impls) => impls,
            Err(err) => return err.to_compile_error().into(),
        },
        Data::Union(_) => {
            return syn::Error::new_spanned(&input, "BinaryCodec derive does not support unions")
                .to_compile_error()
                .into();
        }
    };

    let encode_body = impls.encode;
    let encode_impl = quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }
    };

    let decode_impl = if encode_only {
        quote! {}
    } else {
        let decode_body = impls.decode;
        quote! {
            impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
                fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                    #decode_body
                }
            }
        }
    };

    TokenStream::from(quote! {
        #encode_impl
        #decode_impl
    })
}

/// Reads `#[binary_codec(...)]` container options.
fn is_encode_only(attrs: &[syn::Attribute]) -> syn::Result<bool> {
    let mut encode_only = false;
    for attr in attrs {
        if !attr.path().is_ident("binary_codec") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("encode_only") {
                encode_only = true;
                Ok(())
            } else {
                Err(meta.error("unsupported binary_codec option; expected `encode_only`"))
            }
        })?;
    }
    Ok(encode_only)
}

fn named_struct_bodies(fields: &syn::FieldsNamed) -> Impls {
    let field_names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();

    let encode_fields = field_names.iter().map(|name| {
        quote! { crate::types::encoding::Encode::encode(&self.#name, out); }
    });
    let decode_fields = field_names.iter().map(|name| {
        quote! { #name: crate::types::encoding::Decode::decode(input)?, }
    });

    Impls {
        encode: quote! { #(#encode_fields)* },
        decode: quote! { Ok(Self { #(#decode_fields)* }) },
    }
}

fn tuple_struct_bodies(fields: &syn::FieldsUnnamed) -> Impls {
    let field_indices: Vec<_> = (0..fields.unnamed.len()).map(syn::Index::from).collect();

    let encode_fields = field_indices.iter().map(|idx| {
        quote! { crate::types::encoding::Encode::encode(&self.#idx, out); }
    });
    let decode_fields = field_indices.iter().map(|_| {
        quote! { crate::types::encoding::Decode::decode(input)?, }
    });

    Impls {
        encode: quote! { #(#encode_fields)* },
        decode: quote! { Ok(Self( #(#decode_fields)* )) },
    }
}

fn enum_bodies(name: &syn::Ident, data_enum: &DataEnum) -> syn::Result<Impls> {
    let discriminants = compute_discriminants(data_enum)?;

    let encode_arms = data_enum.variants.iter().zip(discriminants.iter()).map(|(variant, &idx)| {
        let variant_name = &variant.ident;
        match &variant.fields {
            Fields::Unit => quote! {
                Self::#variant_name => {
                    crate::types::encoding::Encode::encode(&#idx, out);
                }
            },
            Fields::Unnamed(fields) => {
                let bindings: Vec<_> = (0..fields.unnamed.len())
                    .map(|i| quote::format_ident!("f{}", i))
                    .collect();
                quote! {
                    Self::#variant_name(#(#bindings),*) => {
                        crate::types::encoding::Encode::encode(&#idx, out);
                        #( crate::types::encoding::Encode::encode(#bindings, out); )*
                    }
                }
            }
            Fields::Named(fields) => {
                let bindings: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                quote! {
                    Self::#variant_name { #(#bindings),* } => {
                        crate::types::encoding::Encode::encode(&#idx, out);
                        #( crate::types::encoding::Encode::encode(#bindings, out); )*
                    }
                }
            }
        }
    });

    let decode_arms = data_enum.variants.iter().zip(discriminants.iter()).map(|(variant, &idx)| {
        let variant_name = &variant.ident;
        match &variant.fields {
            Fields::Unit => quote! {
                #idx => Ok(Self::#variant_name),
            },
            Fields::Unnamed(fields) => {
                let decode_fields = (0..fields.unnamed.len())
                    .map(|_| quote! { crate::types::encoding::Decode::decode(input)?, });
                quote! {
                    #idx => Ok(Self::#variant_name(#(#decode_fields)*)),
                }
            }
            Fields::Named(fields) => {
                let decode_fields = fields.named.iter().map(|f| {
                    let field_name = &f.ident;
                    quote! { #field_name: crate::types::encoding::Decode::decode(input)?, }
                });
                quote! {
                    #idx => Ok(Self::#variant_name { #(#decode_fields)* }),
                }
            }
        }
    });

    let type_name = name.to_string();

    Ok(Impls {
        encode: quote! {
            match self {
                #(#encode_arms)*
            }
        },
        decode: quote! {
            let tag: u8 = crate::types::encoding::Decode::decode(input)?;
            match tag {
                #(#decode_arms)*
                _ => Err(crate::types::encoding::DecodeError::InvalidTag { ty: #type_name, tag }),
            }
        },
    })
}

/// Computes the `u8` tag of each variant, honouring explicit literals.
fn compute_discriminants(data_enum: &DataEnum) -> syn::Result<Vec<u8>> {
    let mut discriminants = Vec::with_capacity(data_enum.variants.len());
    let mut next: u16 = 0;

    for variant in &data_enum.variants {
        let discriminant = match &variant.discriminant {
            Some((_, expr)) => parse_discriminant_expr(expr)?,
            None => u8::try_from(next).map_err(|_| {
                syn::Error::new_spanned(variant, "BinaryCodec enums are limited to 256 variants")
            })?,
        };
        if discriminants.contains(&discriminant) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate wire discriminant {discriminant}"),
            ));
        }
        discriminants.push(discriminant);
        next = discriminant as u16 + 1;
    }

    Ok(discriminants)
}

fn parse_discriminant_expr(expr: &syn::Expr) -> syn::Result<u8> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(lit_int),
            ..
        }) => lit_int.base10_parse::<u8>(),
        _ => Err(syn::Error::new_spanned(
            expr,
            "discriminant must be an integer literal that fits in u8",
        )),
    }
}
