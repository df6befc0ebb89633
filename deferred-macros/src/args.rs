use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Error, Ident, LitInt, Token};

/// Arguments accepted by `#[deferred::test(...)]`.
///
/// ```rust,ignore
/// #[deferred::test(job_limit = 1000)]
/// fn adoption(rt: &deferred::Runtime) { /* ... */ }
/// ```
pub(crate) struct TestArgs {
    /// Optional bound on the jobs run while draining the queue.
    pub(crate) job_limit: Option<LitInt>,
}

impl TestArgs {
    /// Returns the builder calls configuring the runtime.
    pub(crate) fn builder_calls(&self) -> TokenStream {
        match &self.job_limit {
            Some(limit) => quote! { .job_limit(#limit) },
            None => TokenStream::new(),
        }
    }
}

impl Parse for TestArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut job_limit = None;

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            if key == "job_limit" {
                let value: LitInt = input.parse()?;
                if value.base10_parse::<usize>()? == 0 {
                    return Err(Error::new_spanned(value, "job_limit must be > 0"));
                }
                job_limit = Some(value);
            } else {
                return Err(Error::new_spanned(
                    key,
                    "unknown argument, expected `job_limit`",
                ));
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(Self { job_limit })
    }
}
