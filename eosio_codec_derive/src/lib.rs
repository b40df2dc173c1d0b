extern crate proc_macro;
extern crate syn;
#[macro_use]
extern crate quote;

use proc_macro::TokenStream;
use proc_macro2::Span;
use syn::{parse_macro_input, spanned::Spanned, Ident};

/// The prefix used in field attributes: `#[eosio(attr)]`
const EOSIO_ATTRIBUTE: &str = "eosio";

/// A list of valid eosio field attributes
const VALID_EOSIO_FIELD_ATTRIBUTES: [&str; 3] = ["skip", "optional", "binary_extension"];

fn get_root() -> proc_macro2::TokenStream { quote!(::eosio_codec) }

/// A helper to report meaningful compilation errors
/// - If applied to an Ok value they simply return the underlying value.
/// - If applied to `Err(e)` then `e` is turned into a compiler error.
fn unwrap_or_report(v: syn::Result<TokenStream>) -> TokenStream {
    match v {
        Ok(ts) => ts,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Layout of a single field, as selected by its attributes.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldMode {
    Include,
    Skip,
    Optional,
    BinaryExtension,
}

/// Finds the eosio field attributes and checks that they are valid.
fn get_eosio_field_attributes(attributes: &[syn::Attribute]) -> syn::Result<Vec<Ident>> {
    let mut out = Vec::new();
    for attr in attributes.iter().filter(|attr| attr.path().is_ident(EOSIO_ATTRIBUTE)) {
        attr.parse_nested_meta(|meta| {
            match meta.path.get_ident() {
                Some(ident) if VALID_EOSIO_FIELD_ATTRIBUTES.iter().any(|a| ident == a) => {
                    out.push(ident.clone());
                    Ok(())
                }
                _ => {
                    let path = &meta.path;
                    Err(meta.error(format!(
                        "The attribute '{}' is not supported as an eosio field attribute.",
                        quote!(#path)
                    )))
                }
            }
        })?;
    }
    Ok(out)
}

/// Whether the type is syntactically an `Option<..>`.
fn is_option(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(p) => p.path.segments.last().map_or(false, |s| s.ident == "Option"),
        _ => false,
    }
}

fn field_mode(f: &syn::Field) -> syn::Result<FieldMode> {
    let attributes = get_eosio_field_attributes(&f.attrs)?;
    let mode = match attributes.as_slice() {
        [] => FieldMode::Include,
        [a] if a == "skip" => FieldMode::Skip,
        [a] if a == "optional" => FieldMode::Optional,
        [a] if a == "binary_extension" => FieldMode::BinaryExtension,
        _ => {
            return Err(syn::Error::new(
                f.span(),
                "At most one eosio attribute can be applied to a field.",
            ))
        }
    };
    if matches!(mode, FieldMode::Optional | FieldMode::BinaryExtension) && !is_option(&f.ty) {
        return Err(syn::Error::new(
            f.ty.span(),
            "The optional and binary_extension attributes require a field of type Option<T>.",
        ));
    }
    Ok(mode)
}

/// The layout of every field, checking that binary extensions are only
/// followed by binary extensions or skipped fields.
fn field_modes<'a, I: IntoIterator<Item = &'a syn::Field>>(fields: I) -> syn::Result<Vec<FieldMode>> {
    let mut modes = Vec::new();
    let mut seen_extension = false;
    for f in fields {
        let mode = field_mode(f)?;
        match mode {
            FieldMode::BinaryExtension => seen_extension = true,
            FieldMode::Skip => (),
            _ if seen_extension => {
                return Err(syn::Error::new(
                    f.span(),
                    "Only binary_extension fields can follow a binary_extension field.",
                ))
            }
            _ => (),
        }
        modes.push(mode);
    }
    Ok(modes)
}

fn impl_deserial_field(
    f: &syn::Field,
    mode: FieldMode,
    ident: &syn::Ident,
    label: &str,
    source: &syn::Ident,
) -> proc_macro2::TokenStream {
    let ty = &f.ty;
    let root = get_root();
    let type_name = quote!(#ty).to_string().replace(' ', "");
    let read = match mode {
        FieldMode::Skip => return quote!(let #ident: #ty = Default::default();),
        FieldMode::Include | FieldMode::Optional => {
            quote!(<#ty as #root::Deserial>::deserial(#source))
        }
        FieldMode::BinaryExtension => quote! {
            <#root::BinaryExtension<_> as #root::Deserial>::deserial(#source).map(|x| x.0)
        },
    };
    quote! {
        let #ident: #ty = #root::ResultExt::context_with(#read, || {
            format!("decode field [{}] of type [{}]", #label, #type_name)
        })?;
    }
}

/// Derive the Deserial trait. See the documentation of
/// [`derive(Serial)`](./derive.Serial.html) for details and limitations.
///
/// Decoding failures of a field are wrapped with the breadcrumb
/// `decode field [<name>] of type [<type>]`.
#[proc_macro_derive(Deserial, attributes(eosio))]
pub fn deserial_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input);
    unwrap_or_report(impl_deserial(&ast))
}

fn impl_deserial(ast: &syn::DeriveInput) -> syn::Result<TokenStream> {
    let data_name = &ast.ident;

    let (impl_generics, ty_generics, where_clauses) = ast.generics.split_for_impl();

    let source_ident = Ident::new("________________source", Span::call_site());
    let root = get_root();

    let body_tokens = match ast.data {
        syn::Data::Struct(ref data) => {
            let modes = field_modes(data.fields.iter())?;
            let mut names = proc_macro2::TokenStream::new();
            let mut field_tokens = proc_macro2::TokenStream::new();
            let return_tokens = match data.fields {
                syn::Fields::Named(_) => {
                    for (field, mode) in data.fields.iter().zip(modes) {
                        let Some(field_ident) = field.ident.clone() else {
                            continue;
                        };
                        let label = field_ident.to_string();
                        field_tokens.extend(impl_deserial_field(
                            field,
                            mode,
                            &field_ident,
                            &label,
                            &source_ident,
                        ));
                        names.extend(quote!(#field_ident,))
                    }
                    quote!(Ok(#data_name{#names}))
                }
                syn::Fields::Unnamed(_) => {
                    for (i, (f, mode)) in data.fields.iter().zip(modes).enumerate() {
                        let field_ident = format_ident!("x_{}", i);
                        field_tokens.extend(impl_deserial_field(
                            f,
                            mode,
                            &field_ident,
                            &i.to_string(),
                            &source_ident,
                        ));
                        names.extend(quote!(#field_ident,))
                    }
                    quote!(Ok(#data_name(#names)))
                }
                _ => quote!(Ok(#data_name{})),
            };
            quote! {
                #field_tokens
                #return_tokens
            }
        }
        syn::Data::Enum(ref data) => {
            let mut matches_tokens = proc_macro2::TokenStream::new();
            for (i, variant) in data.variants.iter().enumerate() {
                let modes = field_modes(variant.fields.iter())?;
                let (field_names, pattern) = variant_pattern(variant);
                let field_tokens: proc_macro2::TokenStream = field_names
                    .iter()
                    .zip(variant.fields.iter().zip(modes))
                    .map(|(name, (field, mode))| {
                        let label = format!("{}.{}", variant.ident, name);
                        impl_deserial_field(field, mode, name, &label, &source_ident)
                    })
                    .collect();
                let idx_lit = syn::LitInt::new(&format!("{}u32", i), Span::call_site());
                let variant_ident = &variant.ident;
                matches_tokens.extend(quote! {
                    #idx_lit => {
                        #field_tokens
                        Ok(#data_name::#variant_ident #pattern)
                    },
                })
            }
            let type_label = data_name.to_string();
            quote! {
                let idx = #source_ident.read_varuint32()?;
                match idx {
                    #matches_tokens
                    _ => Err(#root::CodecError::invalid(format!(
                        "unknown variant index {} for {}", idx, #type_label
                    )))
                }
            }
        }
        _ => {
            return Err(syn::Error::new(
                ast.span(),
                "#[derive(Deserial)] is not implemented for union.",
            ))
        }
    };
    let gen = quote! {
        #[automatically_derived]
        impl #impl_generics #root::Deserial for #data_name #ty_generics #where_clauses {
            fn deserial(#source_ident: &mut #root::Cursor<'_>) -> #root::ParseResult<Self> {
                #body_tokens
            }
        }
    };
    Ok(gen.into())
}

/// Names bound to the fields of an enum variant, and the pattern binding them.
fn variant_pattern(variant: &syn::Variant) -> (Vec<Ident>, proc_macro2::TokenStream) {
    match variant.fields {
        syn::Fields::Named(_) => {
            let field_names: Vec<_> = variant.fields.iter().filter_map(|field| field.ident.clone()).collect();
            (field_names.clone(), quote! { {#(#field_names),*} })
        }
        syn::Fields::Unnamed(_) => {
            let field_names: Vec<_> =
                variant.fields.iter().enumerate().map(|(i, _)| format_ident!("x_{}", i)).collect();
            (field_names.clone(), quote! { (#(#field_names),*) })
        }
        syn::Fields::Unit => (Vec::new(), proc_macro2::TokenStream::new()),
    }
}

/// Derive the Serial trait for the type.
///
/// If the type is a struct all fields must implement the Serial trait, and
/// are written in the order they appear in the code. If the type is an enum
/// then all fields of each of the variants must implement the Serial trait.
///
/// Enums are written with a varuint32 tag indicating the variant, enumerating
/// them in the order they are written in source code, followed by the fields
/// of the variant. This matches the encoding of ABI variants.
///
/// Fields can be annotated with
/// - `#[eosio(skip)]`: the field is not written, and is `Default::default()`
///   when read.
/// - `#[eosio(optional)]`: on an `Option<T>` field, written with a presence
///   byte. This is how `Option<T>` is always written.
/// - `#[eosio(binary_extension)]`: on an `Option<T>` field, written only if
///   present and read only if there is remaining input. Such fields must come
///   last.
///
/// # Example
/// ```ignore
/// #[derive(Serial, Deserial)]
/// struct Foo {
///     bar: Vec<u8>,
///     #[eosio(binary_extension)]
///     baz: Option<u32>,
/// }
/// ```
#[proc_macro_derive(Serial, attributes(eosio))]
pub fn serial_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input);
    unwrap_or_report(impl_serial(&ast))
}

fn impl_serial_field(
    mode: FieldMode,
    ident: &proc_macro2::TokenStream,
    out: &syn::Ident,
) -> proc_macro2::TokenStream {
    let root = get_root();
    match mode {
        FieldMode::Skip => proc_macro2::TokenStream::new(),
        FieldMode::Include | FieldMode::Optional => quote! {
            #root::Serial::serial(#ident, #out);
        },
        FieldMode::BinaryExtension => quote! {
            if let Some(x) = #ident {
                #root::Serial::serial(x, #out);
            }
        },
    }
}

fn impl_serial(ast: &syn::DeriveInput) -> syn::Result<TokenStream> {
    let data_name = &ast.ident;

    let span = ast.span();

    let write_ident = format_ident!("W", span = span);

    let (impl_generics, ty_generics, where_clauses) = ast.generics.split_for_impl();

    let out_ident = format_ident!("out");
    let root = get_root();

    let body = match ast.data {
        syn::Data::Struct(ref data) => {
            let modes = field_modes(data.fields.iter())?;
            match data.fields {
                syn::Fields::Named(_) => data
                    .fields
                    .iter()
                    .zip(modes)
                    .filter_map(|(field, mode)| {
                        let field_ident = field.ident.clone()?;
                        Some(impl_serial_field(mode, &quote!(&self.#field_ident), &out_ident))
                    })
                    .collect(),
                syn::Fields::Unnamed(_) => modes
                    .into_iter()
                    .enumerate()
                    .map(|(i, mode)| {
                        let i = syn::Index::from(i);
                        impl_serial_field(mode, &quote!(&self.#i), &out_ident)
                    })
                    .collect(),
                syn::Fields::Unit => proc_macro2::TokenStream::new(),
            }
        }
        syn::Data::Enum(ref data) => {
            let mut matches_tokens = proc_macro2::TokenStream::new();

            for (i, variant) in data.variants.iter().enumerate() {
                let modes = field_modes(variant.fields.iter())?;
                let (field_names, pattern) = variant_pattern(variant);
                let field_tokens: proc_macro2::TokenStream = field_names
                    .iter()
                    .zip(modes)
                    .map(|(name, mode)| impl_serial_field(mode, &quote!(#name), &out_ident))
                    .collect();

                let idx_lit = syn::LitInt::new(&format!("{}u64", i), Span::call_site());
                let variant_ident = &variant.ident;

                matches_tokens.extend(quote! {
                    #data_name::#variant_ident #pattern => {
                        #root::write_varuint64(#out_ident, #idx_lit);
                        #field_tokens
                    },
                })
            }
            quote! {
                match self {
                    #matches_tokens
                }
            }
        }
        _ => {
            return Err(syn::Error::new(
                ast.span(),
                "#[derive(Serial)] is not implemented for union.",
            ))
        }
    };

    let gen = quote! {
        #[automatically_derived]
        impl #impl_generics #root::Serial for #data_name #ty_generics #where_clauses {
            fn serial<#write_ident: #root::Buffer>(&self, #out_ident: &mut #write_ident) {
                #body
            }
        }
    };
    Ok(gen.into())
}

/// A helper macro to derive both the Serial and Deserial traits.
/// `[derive(Serialize)]` is equivalent to `[derive(Serial, Deserial)]`, see
/// documentation of the latter two for details and options:
/// [`derive(Serial)`](./derive.Serial.html),
/// [`derive(Deserial)`](./derive.Deserial.html).
#[proc_macro_derive(Serialize, attributes(eosio))]
pub fn serialize_derive(input: TokenStream) -> TokenStream {
    unwrap_or_report(serialize_derive_worker(input))
}

fn serialize_derive_worker(input: TokenStream) -> syn::Result<TokenStream> {
    let ast = syn::parse(input)?;
    let mut tokens = impl_deserial(&ast)?;
    tokens.extend(impl_serial(&ast)?);
    Ok(tokens)
}
