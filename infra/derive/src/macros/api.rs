use fxhash::FxHashSet;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token};

#[derive(Default)]
struct ModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

/// Serde settings already written by hand on the struct.
#[derive(Default)]
struct ExistingSerde {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

pub fn expand_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    match model(args, &input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn model(args: TokenStream, input: &ItemStruct) -> syn::Result<TokenStream> {
    let args = parse_model_args(args)?;
    let derived = derived_names(&input.attrs);
    let existing = existing_serde(&input.attrs)?;

    let mut derives = Vec::new();
    if !derived.contains("Debug") {
        derives.push(quote!(Debug));
    }
    if !derived.contains("Serialize") {
        derives.push(quote!(::serde::Serialize));
    }
    if !derived.contains("Deserialize") {
        derives.push(quote!(::serde::Deserialize));
    }
    let derive = if derives.is_empty() {
        TokenStream::new()
    } else {
        quote!(#[derive(#(#derives),*)])
    };

    let schema = if derived.contains("ToSchema") {
        TokenStream::new()
    } else {
        quote!(#[cfg_attr(feature = "server", derive(::utoipa::ToSchema))])
    };

    let policy = args
        .rename_all
        .unwrap_or_else(|| LitStr::new("camelCase", Span::call_site()));
    let rename = match &existing.rename_all {
        Some(found) if found.value() != policy.value() => {
            return Err(syn::Error::new_spanned(
                found,
                "serde(rename_all) disagrees with api_model(rename_all)",
            ));
        }
        Some(_) => TokenStream::new(),
        None => quote!(#[serde(rename_all = #policy)]),
    };

    let deny = match (args.deny_unknown_fields.unwrap_or(false), existing.deny_unknown_fields) {
        (_, true) => TokenStream::new(),
        (true, false) => quote!(#[serde(deny_unknown_fields)]),
        (false, false) => TokenStream::new(),
    };

    Ok(quote! {
        #derive
        #schema
        #rename
        #deny
        #input
    })
}

pub fn expand_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn parse_model_args(args: TokenStream) -> syn::Result<ModelArgs> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        let Meta::NameValue(pair) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `key = value` arguments"));
        };

        if pair.path.is_ident("rename_all") {
            let Lit::Str(value) = literal(&pair)? else {
                return Err(syn::Error::new_spanned(&pair.value, "rename_all takes a string"));
            };
            replace_once(&mut parsed.rename_all, value.clone(), &pair)?;
        } else if pair.path.is_ident("deny_unknown_fields") {
            let Lit::Bool(value) = literal(&pair)? else {
                return Err(syn::Error::new_spanned(
                    &pair.value,
                    "deny_unknown_fields takes a boolean",
                ));
            };
            replace_once(&mut parsed.deny_unknown_fields, value.value, &pair)?;
        } else {
            return Err(syn::Error::new_spanned(
                &pair.path,
                "unknown argument, expected rename_all or deny_unknown_fields",
            ));
        }
    }

    Ok(parsed)
}

fn literal(pair: &MetaNameValue) -> syn::Result<&Lit> {
    match &pair.value {
        Expr::Lit(expr) => Ok(&expr.lit),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

fn replace_once<T>(slot: &mut Option<T>, value: T, pair: &MetaNameValue) -> syn::Result<()> {
    if slot.replace(value).is_some() {
        return Err(syn::Error::new_spanned(pair, "argument given twice"));
    }
    Ok(())
}

fn existing_serde(attrs: &[Attribute]) -> syn::Result<ExistingSerde> {
    let mut found = ExistingSerde::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                found.rename_all = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("deny_unknown_fields") {
                found.deny_unknown_fields = true;
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }

    Ok(found)
}

fn derived_names(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                names.insert(last.ident.to_string());
            }
            Ok(())
        });
    }
    names
}
