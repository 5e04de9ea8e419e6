//! `#[method]` expansion
//!
//! Input:
//! ```ignore
//! #[method]
//! async fn sub(a: i64, b: i64) -> Result<i64> {
//!     Ok(a - b)
//! }
//! ```
//!
//! Generated output:
//! ```ignore
//! fn sub() -> Box<dyn ::objrpc_server::Method> {
//!     async fn __objrpc_inner(a: i64, b: i64) -> Result<i64> {
//!         Ok(a - b)
//!     }
//!     ::objrpc_server::from_typed_fn(|(__arg0, __arg1): (i64, i64)| __objrpc_inner(__arg0, __arg1))
//! }
//! ```
//!
//! The argument list decides how params bind: none binds `()`, one binds
//! that type directly (a struct takes named params), several bind a tuple
//! (positional params in order).

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{parse_macro_input, FnArg, ItemFn};

pub fn method_impl(input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    match expand(input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input_fn: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new(
            input_fn.sig.fn_token.span(),
            "#[method] requires an async fn",
        ));
    }
    if !input_fn.sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            input_fn.sig.generics.span(),
            "#[method] does not support generic functions",
        ));
    }

    let mut types = Vec::new();
    for arg in &input_fn.sig.inputs {
        match arg {
            FnArg::Typed(pat_type) => types.push(pat_type.ty.clone()),
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new(
                    receiver.span(),
                    "#[method] works on free functions; register object state through a closure instead",
                ))
            }
        }
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let fn_block = &input_fn.block;
    let inputs = &input_fn.sig.inputs;
    let output = &input_fn.sig.output;
    let inner = format_ident!("__objrpc_inner");
    let args: Vec<_> = (0..types.len())
        .map(|i| syn::Ident::new(&format!("__arg{}", i), Span::call_site()))
        .collect();

    let binder = match types.len() {
        0 => quote! { |(): ()| #inner() },
        1 => {
            let ty = &types[0];
            let arg = &args[0];
            quote! { |#arg: #ty| #inner(#arg) }
        }
        _ => quote! { |(#(#args),*): (#(#types),*)| #inner(#(#args),*) },
    };

    Ok(quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() -> ::std::boxed::Box<dyn ::objrpc_server::Method> {
            async fn #inner(#inputs) #output #fn_block

            ::objrpc_server::from_typed_fn(#binder)
        }
    })
}
