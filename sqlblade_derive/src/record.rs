use darling::{FromDeriveInput, FromField, ast};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(db), supports(struct_named))]
struct RecordInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: ast::Data<(), RecordField>,
    #[darling(default)]
    table: Option<String>,
}

#[derive(Debug, FromField)]
#[darling(attributes(db))]
struct RecordField {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    vis: syn::Visibility,
    #[darling(default)]
    column: Option<String>,
    #[darling(default)]
    skip: bool,
}

impl RecordField {
    fn tag(&self) -> Option<String> {
        if self.skip {
            return Some("-".to_owned());
        }
        self.column.clone()
    }

    fn is_visible(&self) -> bool {
        matches!(self.vis, syn::Visibility::Public(_))
    }

    /// Same rule the metadata cache applies to the emitted tag.
    fn is_mapped(&self) -> bool {
        if !self.is_visible() {
            return false;
        }
        self.tag().is_some_and(|tag| {
            let column = tag.split(',').next().unwrap_or_default().trim();
            !column.is_empty() && column != "-"
        })
    }
}

pub fn record_derive_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let record = match RecordInput::from_derive_input(&input) {
        Ok(v) => v,
        Err(e) => return e.write_errors().into(),
    };

    if !record.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &record.generics,
            "`#[derive(Record)]` does not support generic structs",
        )
        .to_compile_error()
        .into();
    }

    let name = &record.ident;
    let bare_name = name.to_string();
    let fields = match record.data.take_struct() {
        Some(fields) => fields.fields,
        None => {
            return syn::Error::new_spanned(name, "`#[derive(Record)]` only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let table_name = match &record.table {
        Some(table) => quote! {
            {
                fn table_name() -> ::std::string::String {
                    ::std::string::String::from(#table)
                }
                ::std::option::Option::Some(table_name as fn() -> ::std::string::String)
            }
        },
        None => quote! { ::std::option::Option::None },
    };

    let shapes = fields.iter().map(|field| {
        let field_name = field
            .ident
            .as_ref()
            .map(|ident| ident.to_string())
            .unwrap_or_default();
        let tag = match field.tag() {
            Some(tag) => quote! { ::std::option::Option::Some(#tag) },
            None => quote! { ::std::option::Option::None },
        };
        let visible = field.is_visible();
        let ty = &field.ty;
        let (optional, kind) = if field.is_mapped() {
            (
                quote! { <#ty as ::sqlblade::FieldValue>::OPTIONAL },
                quote! { <#ty as ::sqlblade::FieldValue>::KIND },
            )
        } else {
            (
                quote! { false },
                quote! { ::sqlblade::ScalarKind::Other("unmapped") },
            )
        };
        quote! {
            ::sqlblade::FieldShape {
                name: #field_name,
                tag: #tag,
                visible: #visible,
                optional: #optional,
                kind: #kind,
            }
        }
    });

    let mapped: Vec<_> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_mapped())
        .filter_map(|(position, field)| field.ident.as_ref().map(|ident| (position, ident)))
        .collect();

    let assign_arms = mapped.iter().map(|(position, ident)| {
        quote! {
            #position => ::sqlblade::coerce::assign(&mut self.#ident, value, mode),
        }
    });

    let value_arms = mapped.iter().map(|(position, ident)| {
        quote! {
            #position => ::sqlblade::FieldValue::to_value(&self.#ident),
        }
    });

    quote! {
        impl ::sqlblade::Model for #name {
            fn shape() -> ::sqlblade::Shape {
                const FIELDS: &[::sqlblade::FieldShape] = &[#(#shapes),*];
                ::sqlblade::Shape::Record(::sqlblade::RecordShape {
                    type_name: ::std::any::type_name::<#name>(),
                    name: #bare_name,
                    table_name: #table_name,
                    fields: FIELDS,
                })
            }
        }

        impl ::sqlblade::Record for #name {
            fn assign(
                &mut self,
                position: usize,
                value: ::sqlblade::Value,
                mode: ::sqlblade::Coercion,
            ) -> ::std::result::Result<(), ::sqlblade::CoerceError> {
                match position {
                    #(#assign_arms)*
                    _ => {
                        let _ = (value, mode);
                        ::std::result::Result::Err(
                            ::sqlblade::CoerceError::UnknownPosition(position),
                        )
                    }
                }
            }

            fn value_at(
                &self,
                position: usize,
            ) -> ::std::result::Result<::sqlblade::Value, ::sqlblade::CoerceError> {
                match position {
                    #(#value_arms)*
                    _ => ::std::result::Result::Err(
                        ::sqlblade::CoerceError::UnknownPosition(position),
                    ),
                }
            }
        }
    }
    .into()
}
