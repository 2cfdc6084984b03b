use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Index, LitInt};

/// Wire ids below this value are reserved for system-registered types.
/// Must stay in sync with `tagwire_core_rs::id::USER_DEFINED_START`.
const USER_DEFINED_START: u64 = 101;

/// Derives `WireValue` and `Portable` for a struct, taking the numeric wire id
/// from the mandatory `#[portable(id = <u32>)]` attribute.
///
/// The generated impls reference `WireValue`, `Portable`, `WireId`,
/// `EncodeContext`, `DecodeContext` and `CodecError` by name, so the core
/// prelude must be in scope at the derive site:
///
/// ```ignore
/// use tagwire_core_rs::{CodecError, DecodeContext, EncodeContext, Portable, WireId, WireValue};
///
/// #[derive(Debug, PartialEq, Portable)]
/// #[portable(id = 2001)]
/// struct Point {
///   x: i32,
///   y: i32,
/// }
/// ```
///
/// Fields are encoded in declaration order, each through its own `WireValue`
/// impl. A missing `#[portable(id = ...)]` attribute or an id inside the
/// reserved system range (`0..=100`) is rejected at compile time.
#[proc_macro_derive(Portable, attributes(portable))]
pub fn derive_portable(input: TokenStream) -> TokenStream {
  let input = parse_macro_input!(input as DeriveInput);
  let name = &input.ident;

  let mut id: Option<u64> = None;
  for attr in &input.attrs {
    if !attr.path().is_ident("portable") {
      continue;
    }
    let parsed = attr.parse_nested_meta(|meta| {
      if meta.path.is_ident("id") {
        let lit: LitInt = meta.value()?.parse()?;
        id = Some(lit.base10_parse()?);
        Ok(())
      } else {
        Err(meta.error("unsupported portable attribute, expected `id = <u32>`"))
      }
    });
    if let Err(err) = parsed {
      return err.to_compile_error().into();
    }
  }

  let Some(id) = id else {
    return syn::Error::new_spanned(name, "Portable requires a #[portable(id = <u32>)] attribute")
      .to_compile_error()
      .into();
  };
  if id < USER_DEFINED_START {
    return syn::Error::new_spanned(
      name,
      format!("wire id {id} falls inside the reserved system range, user ids start at {USER_DEFINED_START}"),
    )
    .to_compile_error()
    .into();
  }
  if u32::try_from(id).is_err() {
    return syn::Error::new_spanned(name, format!("wire id {id} does not fit the u32 wire id width"))
      .to_compile_error()
      .into();
  }
  let id = id as u32;

  let Data::Struct(data) = &input.data else {
    return syn::Error::new_spanned(name, "Portable can only be derived for structs")
      .to_compile_error()
      .into();
  };

  let (encode_body, decode_body) = match &data.fields {
    Fields::Named(fields) => {
      let encodes = fields.named.iter().map(|field| {
        let ident = &field.ident;
        quote! { self.#ident.encode(ctx)?; }
      });
      let decodes = fields.named.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        quote! { #ident: <#ty as WireValue>::decode(ctx)?, }
      });
      (
        quote! {
          #(#encodes)*
          Ok(())
        },
        quote! {
          Ok(Self {
            #(#decodes)*
          })
        },
      )
    }
    Fields::Unnamed(fields) => {
      let encodes = fields.unnamed.iter().enumerate().map(|(position, _)| {
        let index = Index::from(position);
        quote! { self.#index.encode(ctx)?; }
      });
      let decodes = fields.unnamed.iter().map(|field| {
        let ty = &field.ty;
        quote! { <#ty as WireValue>::decode(ctx)?, }
      });
      (
        quote! {
          #(#encodes)*
          Ok(())
        },
        quote! {
          Ok(Self(#(#decodes)*))
        },
      )
    }
    Fields::Unit => (
      quote! {
        let _ = ctx;
        Ok(())
      },
      quote! {
        let _ = ctx;
        Ok(Self)
      },
    ),
  };

  let expanded = quote! {
    impl WireValue for #name {
      fn encode(&self, ctx: &mut EncodeContext<'_>) -> Result<(), CodecError> {
        #encode_body
      }

      fn decode(ctx: &mut DecodeContext<'_>) -> Result<Self, CodecError> {
        #decode_body
      }
    }

    impl Portable for #name {
      const WIRE_ID: WireId = WireId::new(#id);
    }
  };

  TokenStream::from(expanded)
}
