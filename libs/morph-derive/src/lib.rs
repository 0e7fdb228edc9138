use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Visibility};

/// Derive macro for reflective record access.
///
/// Generates `morph::Record` and `morph::Reflect` implementations for a
/// struct with named fields. Only `pub` fields are visible to the mapper;
/// private fields are listed in the field table as not exported.
///
/// The struct must implement `Clone`, `Default` and `Debug`.
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Clone, Default, Debug)]
/// #[record(scanner)]
/// pub struct Account {
///     #[tag(db = "account_id", json = "id,omitempty")]
///     pub id: i64,
///
///     #[tag(json = "-")]
///     pub secret: String,
///
///     cache: Vec<u8>,
/// }
/// ```
///
/// Capabilities listed in `#[record(...)]` must be implemented by hand:
/// `scanner`, `valuer`, `fallible_valuer`, `driver_valuer`, `textual`,
/// `to_text`, `deep_copier`.
#[proc_macro_derive(Record, attributes(tag, record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Record only supports structs")),
    };

    let mut field_defs = Vec::new();
    let mut value_arms = Vec::new();
    let mut slot_arms = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name_str = field_name.to_string();
        let exported = matches!(field.vis, Visibility::Public(_));

        // Parse #[tag(namespace = "...")] attributes.
        let mut tags: Vec<(String, String)> = Vec::new();
        for attr in &field.attrs {
            if !attr.path().is_ident("tag") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                let namespace = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a tag namespace identifier"))?
                    .to_string();
                let value: LitStr = meta.value()?.parse()?;
                tags.push((namespace, value.value()));
                Ok(())
            })?;
        }

        let tag_tokens = tags.iter().map(|(namespace, raw)| quote! { (#namespace, #raw) });
        field_defs.push(quote! {
            ::morph::FieldDef {
                name: #field_name_str,
                exported: #exported,
                tags: &[#(#tag_tokens),*],
            }
        });

        if exported {
            value_arms.push(quote! {
                #index => ::core::option::Option::Some(::morph::Reflect::to_value(&self.#field_name)),
            });
            slot_arms.push(quote! {
                #index => ::core::option::Option::Some(::morph::Reflect::slot(&mut self.#field_name)),
            });
        }
    }

    let capabilities = parse_capabilities(input)?;

    let expanded = quote! {
        impl #impl_generics ::morph::Record for #name #ty_generics #where_clause {
            fn record_name(&self) -> &'static str {
                #name_str
            }

            fn field_defs(&self) -> &'static [::morph::FieldDef] {
                const FIELDS: &[::morph::FieldDef] = &[#(#field_defs),*];
                FIELDS
            }

            fn field_value(&self, index: usize) -> ::core::option::Option<::morph::Value> {
                match index {
                    #(#value_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_slot(&mut self, index: usize) -> ::core::option::Option<::morph::Slot<'_>> {
                match index {
                    #(#slot_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn boxed_clone(&self) -> ::std::boxed::Box<dyn ::morph::Record> {
                ::std::boxed::Box::new(::core::clone::Clone::clone(self))
            }

            fn new_empty(&self) -> ::std::boxed::Box<dyn ::morph::Record> {
                ::std::boxed::Box::new(<Self as ::core::default::Default>::default())
            }

            fn assign_from(&mut self, src: &dyn ::morph::Record) -> bool {
                match src.as_any().downcast_ref::<Self>() {
                    ::core::option::Option::Some(src) => {
                        *self = ::core::clone::Clone::clone(src);
                        true
                    }
                    ::core::option::Option::None => false,
                }
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            #(#capabilities)*
        }

        impl #impl_generics ::morph::Reflect for #name #ty_generics #where_clause {
            fn to_value(&self) -> ::morph::Value {
                ::morph::Value::Record(::std::boxed::Box::new(::core::clone::Clone::clone(self)))
            }

            fn slot(&mut self) -> ::morph::Slot<'_> {
                ::morph::Slot::Record(self)
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

/// Parse `#[record(...)]` into capability hook overrides.
fn parse_capabilities(input: &DeriveInput) -> Result<Vec<TokenStream2>, syn::Error> {
    let mut hooks = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let hook = if meta.path.is_ident("scanner") {
                quote! {
                    fn as_scanner(&mut self) -> ::core::option::Option<&mut dyn ::morph::capability::Scanner> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else if meta.path.is_ident("valuer") {
                quote! {
                    fn as_valuer(&self) -> ::core::option::Option<&dyn ::morph::capability::Valuer> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else if meta.path.is_ident("fallible_valuer") {
                quote! {
                    fn as_fallible_valuer(&self) -> ::core::option::Option<&dyn ::morph::capability::FallibleValuer> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else if meta.path.is_ident("driver_valuer") {
                quote! {
                    fn as_driver_valuer(&self) -> ::core::option::Option<&dyn ::morph::capability::DriverValuer> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else if meta.path.is_ident("textual") {
                quote! {
                    fn as_textual(&self) -> ::core::option::Option<&dyn ::morph::capability::Textual> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else if meta.path.is_ident("to_text") {
                quote! {
                    fn as_to_text(&self) -> ::core::option::Option<&dyn ::morph::capability::ToText> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else if meta.path.is_ident("deep_copier") {
                quote! {
                    fn as_deep_copier(&self) -> ::core::option::Option<&dyn ::morph::capability::DeepCopier> {
                        ::core::option::Option::Some(self)
                    }
                }
            } else {
                return Err(meta.error(
                    "unknown capability (expected scanner, valuer, fallible_valuer, driver_valuer, textual, to_text or deep_copier)",
                ));
            };
            hooks.push(hook);
            Ok(())
        })?;
    }
    Ok(hooks)
}
