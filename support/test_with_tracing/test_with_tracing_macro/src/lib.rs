// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test attribute macro for `test_with_tracing` crate.

use quote::quote;
use syn::parse_macro_input;
use syn::spanned::Spanned;
use syn::Error;
use syn::ItemFn;

/// Attribute macro on tests that have tracing output.
///
/// This acts like `#[test]`, except that `test_with_tracing::init()` runs
/// before the test body. Other attributes (`#[should_panic]`, `#[ignore]`)
/// are forwarded to the generated test.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attr = proc_macro2::TokenStream::from(attr);
    if !attr.is_empty() {
        return Error::new(attr.span(), "test_with_tracing::test takes no arguments")
            .to_compile_error()
            .into();
    }

    let item = parse_macro_input!(item as ItemFn);
    wrap_test(item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn wrap_test(item: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    let sig = &item.sig;
    if sig.asyncness.is_some() {
        return Err(Error::new(
            sig.fn_token.span(),
            "test function must not be async",
        ));
    }
    if !sig.inputs.is_empty() {
        return Err(Error::new(sig.inputs.span(), "expected 0 arguments"));
    }

    let name = &sig.ident;
    let output = &sig.output;
    let attrs = &item.attrs;
    let body = &item.block;

    Ok(quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        fn #name() #output {
            ::test_with_tracing::init();
            #body
        }
    })
}
