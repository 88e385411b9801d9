use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Fields, ItemStruct};

pub fn expand(input: ItemStruct) -> TokenStream {
    let ItemStruct { attrs, vis, ident, fields, .. } = input;

    let Fields::Named(fields) = fields else {
        return syn::Error::new_spanned(&ident, "fauna_slice needs a struct with named fields")
            .to_compile_error();
    };
    let inner = format_ident!("{ident}Inner");

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #vis struct #inner #fields

        #[derive(Debug, Clone)]
        #vis struct #ident(::std::sync::Arc<#inner>);

        impl #ident {
            #[must_use]
            pub fn new(inner: #inner) -> Self {
                Self(::std::sync::Arc::new(inner))
            }
        }

        impl ::std::ops::Deref for #ident {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::fauna_kernel::domain::registry::FeatureSlice for #ident {
            fn name(&self) -> &'static str {
                stringify!(#ident)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    }
}
