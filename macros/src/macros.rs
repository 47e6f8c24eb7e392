//! Procedural macros for the lookout monitoring engine.
//!
//! - `#[derive(Reflect)]`: implements `lookout::Reflect`, recording the type's
//!   name, module path, visibility and storage kind. With
//!   `#[reflect(display)]` or `#[reflect(debug)]` it also implements
//!   `lookout::Inspect` through the corresponding formatting trait.
//! - `#[derive(Monitored)]`: implements `lookout::Monitored`, registering every
//!   field that carries a `#[monitor]` attribute.
//!
//! Usage:
//! ```rust,ignore
//! use lookout::{Monitored, Reflect};
//!
//! #[derive(Reflect, Monitored)]
//! pub struct Player {
//!     #[monitor(label = "HP", format = "N0")]
//!     health: i32,
//!     #[monitor(position = "upper_right")]
//!     inventory: Vec<String>,
//! }
//!
//! #[derive(Clone, Copy, Debug, Reflect)]
//! #[reflect(debug)]
//! pub enum Stance { Idle, Running }
//! ```
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Fields, Generics, Ident, Index, LitBool, LitInt, LitStr, Path,
    Visibility, parse_macro_input, parse_quote,
};

#[derive(Default)]
struct ReflectOptions {
    display: bool,
    debug: bool,
    reference: bool,
    disable_monitoring: bool,
    static_type: bool,
}

fn reflect_options(attrs: &[Attribute]) -> syn::Result<ReflectOptions> {
    let mut options = ReflectOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            let flag = match meta.path.get_ident().map(Ident::to_string).as_deref() {
                Some("display") => &mut options.display,
                Some("debug") => &mut options.debug,
                Some("reference") => &mut options.reference,
                Some("disable_monitoring") => &mut options.disable_monitoring,
                Some("static_type") => &mut options.static_type,
                _ => return Err(meta.error("unsupported reflect option")),
            };
            *flag = true;
            Ok(())
        })?;
    }
    if options.display && options.debug {
        return Err(syn::Error::new_spanned(
            &attrs[0],
            "`display` and `debug` are mutually exclusive",
        ));
    }
    Ok(options)
}

/// Add `lookout::Reflect` to every type parameter.
fn with_reflect_bounds(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(lookout::Reflect));
    }
    generics
}

fn visibility_tokens(vis: &Visibility) -> TokenStream2 {
    match vis {
        Visibility::Public(_) => quote!(lookout::Visibility::Public),
        Visibility::Restricted(_) => quote!(lookout::Visibility::Restricted),
        Visibility::Inherited => quote!(lookout::Visibility::Private),
    }
}

#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_reflect(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_reflect(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let options = reflect_options(&input.attrs)?;
    let ident = &input.ident;
    let name = ident.to_string();
    let generics = with_reflect_bounds(&input.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fieldless_enum = match &input.data {
        Data::Enum(data) => data.variants.iter().all(|v| matches!(v.fields, Fields::Unit)),
        _ => false,
    };
    let path = quote!(concat!(module_path!(), "::", #name));
    let constructor = if options.reference {
        quote!(lookout::TypeInfo::reference(#name, #path))
    } else if fieldless_enum {
        quote!(lookout::TypeInfo::enumeration(#name, #path, ::std::mem::size_of::<Self>()))
    } else {
        quote!(lookout::TypeInfo::value(#name, #path))
    };

    let visibility = visibility_tokens(&input.vis);
    let params = input.generics.type_params().map(|p| &p.ident);
    let disabled = options.disable_monitoring;
    let static_type = options.static_type;

    let inspect = if options.display || options.debug {
        let pattern = if options.display { "{}" } else { "{:?}" };
        quote! {
            impl #impl_generics lookout::Inspect for #ident #ty_generics #where_clause {
                fn inspect(&self, _spec: &lookout::RenderSpec, out: &mut ::std::string::String) {
                    use ::std::fmt::Write as _;
                    let _ = write!(out, #pattern, self);
                }
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics lookout::Reflect for #ident #ty_generics #where_clause {
            fn type_info() -> lookout::TypeInfo {
                #constructor
                    .with_visibility(#visibility)
                    .with_generics(::std::vec![#(<#params as lookout::Reflect>::type_info()),*])
                    .with_monitoring_disabled(#disabled)
                    .with_static(#static_type)
            }
        }

        #inspect
    })
}

#[derive(Default)]
struct MonitoredOptions {
    disable: bool,
    describe: Option<Path>,
}

fn monitored_options(attrs: &[Attribute]) -> syn::Result<MonitoredOptions> {
    let mut options = MonitoredOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("monitor")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("disable") {
                options.disable = true;
                Ok(())
            } else if meta.path.is_ident("describe") {
                let path: LitStr = meta.value()?.parse()?;
                options.describe = Some(path.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported monitor option"))
            }
        })?;
    }
    Ok(options)
}

/// `MonitorAttribute` field initializers of one `#[monitor(..)]` field.
fn field_overrides(attr: &Attribute) -> syn::Result<Vec<TokenStream2>> {
    let mut overrides = Vec::new();
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(overrides);
    }
    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .map(Ident::to_string)
            .unwrap_or_default();
        let value = meta.value()?;
        let tokens = match key.as_str() {
            "label" | "format" | "group" => {
                let lit: LitStr = value.parse()?;
                let field = format_ident!("{}", key);
                quote!(#field: ::std::option::Option::Some(::std::string::String::from(#lit)))
            }
            "show_indexer" | "allow_grouping" => {
                let lit: LitBool = value.parse()?;
                let field = format_ident!("{}", key);
                quote!(#field: ::std::option::Option::Some(#lit))
            }
            "font_size" | "element_indent" => {
                let lit: LitInt = value.parse()?;
                let field = format_ident!("{}", key);
                quote!(#field: ::std::option::Option::Some(#lit))
            }
            "position" => {
                let lit: LitStr = value.parse()?;
                let variant = match lit.value().replace('-', "_").as_str() {
                    "upper_left" => quote!(UpperLeft),
                    "upper_right" => quote!(UpperRight),
                    "lower_left" => quote!(LowerLeft),
                    "lower_right" => quote!(LowerRight),
                    _ => return Err(syn::Error::new_spanned(lit, "unknown position")),
                };
                quote!(position: ::std::option::Option::Some(lookout::UiPosition::#variant))
            }
            _ => return Err(meta.error("unsupported monitor option")),
        };
        overrides.push(tokens);
        Ok(())
    })?;
    Ok(overrides)
}

#[proc_macro_derive(Monitored, attributes(monitor))]
pub fn derive_monitored(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_monitored(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_monitored(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let options = monitored_options(&input.attrs)?;
    let ident = &input.ident;
    let generics = with_reflect_bounds(&input.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut registrations = Vec::new();
    if let Data::Struct(data) = &input.data {
        for (index, field) in data.fields.iter().enumerate() {
            let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("monitor")) else {
                continue;
            };
            let (name, access) = match &field.ident {
                Some(field_ident) => (field_ident.to_string(), quote!(#field_ident)),
                None => {
                    let position = Index::from(index);
                    (index.to_string(), quote!(#position))
                }
            };
            let overrides = field_overrides(attr)?;
            registrations.push(quote! {
                members
                    .field(#name, |this: &Self| &this.#access)
                    .set_attribute(lookout::MonitorAttribute {
                        #(#overrides,)*
                        ..::std::default::Default::default()
                    });
            });
        }
    } else if !options.disable && options.describe.is_none() {
        return Err(syn::Error::new_spanned(
            ident,
            "`#[derive(Monitored)]` on enums and unions needs `#[monitor(describe = \"..\")]`",
        ));
    }

    let describe = options
        .describe
        .as_ref()
        .map(|path| quote!(#path(members);));
    let disabled = options.disable.then(|| {
        quote! {
            fn monitoring_disabled() -> bool {
                true
            }
        }
    });

    Ok(quote! {
        impl #impl_generics lookout::Monitored for #ident #ty_generics #where_clause {
            #[allow(unused_variables, unused_imports)]
            fn describe(members: &mut lookout::Members<Self>) {
                use lookout::Annotate as _;
                #(#registrations)*
                #describe
            }

            #disabled
        }
    })
}
