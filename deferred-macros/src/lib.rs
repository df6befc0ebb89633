mod args;
use args::TestArgs;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Error, FnArg, ItemFn, ReturnType, parse_macro_input};

/// Turns a function into a test driven by a fresh `deferred::Runtime`.
///
/// The function may take no argument, or a single `&Runtime` argument bound
/// to the runtime. After the body returns, the job queue is drained; the
/// test fails if it does not go idle within the optional `job_limit`.
///
/// ```rust,ignore
/// #[deferred::test]
/// fn fulfills(rt: &deferred::Runtime) {
///     let d = deferred::Deferred::<i32, String>::reject(rt.handle(), "x".into());
///     d.mark_handled();
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as TestArgs);
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let ident = &sig.ident;

    if sig.asyncness.is_some() {
        return Error::new_spanned(
            sig.asyncness,
            "#[deferred::test] cannot be used on an async function",
        )
        .to_compile_error()
        .into();
    }

    if !matches!(sig.output, ReturnType::Default) {
        return Error::new_spanned(&sig.output, "#[deferred::test] functions must return ()")
            .to_compile_error()
            .into();
    }

    let body = match sig.inputs.len() {
        0 => quote! { (|| #block)() },
        1 => match &sig.inputs[0] {
            FnArg::Typed(arg) => {
                let pat = &arg.pat;
                let ty = &arg.ty;
                quote! { (|#pat: #ty| #block)(&__runtime) }
            }
            FnArg::Receiver(receiver) => {
                return Error::new_spanned(receiver, "#[deferred::test] cannot take self")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return Error::new_spanned(
                &sig.inputs,
                "#[deferred::test] takes at most one `&Runtime` argument",
            )
            .to_compile_error()
            .into();
        }
    };

    let builder_calls = args.builder_calls();

    quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis fn #ident() {
            let __runtime = ::deferred::Runtime::builder()
                #builder_calls
                .build();

            #body;

            if let ::core::result::Result::Err(error) = __runtime.run_until_idle() {
                panic!("{}", error);
            }
        }
    }
    .into()
}
