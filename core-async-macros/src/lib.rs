use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Runs an `async fn` test on a current-thread runtime.
///
/// Accepts an optional `start_paused` flag that freezes the runtime clock so
/// sleeps resolve instantly and deterministically.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Test)
}

/// Runs an `async fn main` on a multi-threaded runtime.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Main)
}

enum MacroKind {
    Test,
    Main,
}

fn parse_start_paused(attr: TokenStream2, kind: &MacroKind) -> syn::Result<bool> {
    if attr.is_empty() {
        return Ok(false);
    }

    let ident: syn::Ident = syn::parse2(attr.clone())
        .map_err(|_| syn::Error::new_spanned(&attr, "expected `start_paused`"))?;

    match (kind, ident.to_string().as_str()) {
        (MacroKind::Test, "start_paused") => Ok(true),
        (MacroKind::Main, _) => Err(syn::Error::new_spanned(
            ident,
            "core_async::main does not accept arguments",
        )),
        _ => Err(syn::Error::new_spanned(ident, "expected `start_paused`")),
    }
}

fn expand(attr: TokenStream, item: TokenStream, kind: MacroKind) -> TokenStream {
    let start_paused = match parse_start_paused(TokenStream2::from(attr), &kind) {
        Ok(flag) => flag,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let mut sync_sig = input.sig.clone();
    sync_sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let expanded = match kind {
        MacroKind::Test => quote! {
            #(#attrs)*
            #[test]
            #vis #sync_sig {
                core_async::runtime::block_on_test(#start_paused, async move #block)
            }
        },
        MacroKind::Main => quote! {
            #(#attrs)*
            #vis #sync_sig {
                core_async::runtime::block_on(async move #block)
            }
        },
    };

    expanded.into()
}
