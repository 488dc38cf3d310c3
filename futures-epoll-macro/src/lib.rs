//! Entry point attributes for futures-epoll.
//!
//! Both attributes turn an `async fn` into a plain function whose body runs on
//! `futures_epoll::runtime::default()`, the cooperative loop that ticks the
//! process-wide epoll table.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::ItemFn;

/// Runs an async `main` on the futures-epoll runtime.
///
/// # Examples
///
/// ```ignore
/// #[futures_epoll::main]
/// async fn main() -> std::io::Result<()> {
///     let epfd = futures_epoll::global::epoll_create1(0)?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
#[cfg(not(test))] // Work around for rust-lang/rust#62127
pub fn main(_: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemFn);
    expand(input, false)
}

/// Runs an async test on the futures-epoll runtime.
///
/// ```no_run
/// #[futures_epoll::test]
/// async fn ready_after_raise() {
///     assert!(true);
/// }
/// ```
#[proc_macro_attribute]
pub fn test(_: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemFn);
    expand(input, true)
}

fn expand(mut input: ItemFn, is_test: bool) -> TokenStream {
    if input.sig.asyncness.is_none() {
        let msg = format!("only async fn is supported, {}", input.sig.ident);
        return syn::Error::new_spanned(input.sig.fn_token, msg)
            .to_compile_error()
            .into();
    }
    input.sig.asyncness = None;

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;

    let test_attr = if is_test && !attrs.iter().any(|a| a.path.is_ident("test")) {
        quote!(#[test])
    } else {
        quote!()
    };

    (quote! {
        #test_attr
        #(#attrs)*
        #vis #sig {
            let mut rt = futures_epoll::runtime::default();
            futures_epoll::runtime::Runtime::exec(&mut rt, async move #body)
        }
    })
    .into()
}
