//! Procedural macro implementations for `membuf-macros`.
//!
//! Use the re-exports in `membuf-macros` rather than depending on this crate directly: the
//! generated code refers to `::membuf_macros::tracing` and `::membuf_macros::tracing_subscriber`.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, AttributeArgs, Ident, ItemFn, Lit, Meta, NestedMeta};

/// Log levels accepted by `level = "..."`.
const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// Run a test with a [tracing] subscriber that writes to the test harness' captured output.
///
/// The default level is `DEBUG`. Use `#[test_traced("INFO")]` (or `#[test_traced(level = "INFO")]`)
/// to raise it.
///
/// # Example
///
/// ```rust,ignore
/// use membuf_macros::test_traced;
/// use tracing::debug;
///
/// #[test_traced]
/// fn test_rollover() {
///     debug!("visible with --nocapture");
/// }
/// ```
#[proc_macro_attribute]
pub fn test_traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttributeArgs);
    let input = parse_macro_input!(item as ItemFn);

    // Parse arguments
    let mut level = String::from("DEBUG");
    for arg in args {
        let lit = match arg {
            NestedMeta::Lit(lit) => lit,
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("level") => nv.lit,
            other => {
                return syn::Error::new_spanned(other, "unsupported argument, expected a level")
                    .to_compile_error()
                    .into();
            }
        };
        match parse_level(&lit) {
            Ok(value) => level = value,
            Err(err) => return err.to_compile_error().into(),
        }
    }
    let level = Ident::new(&level, Span::call_site());

    // Rebuild the function as a test wrapped in a scoped subscriber
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let subscriber = ::membuf_macros::tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(::membuf_macros::tracing::Level::#level)
                .finish();
            let dispatch = ::membuf_macros::tracing::Dispatch::new(subscriber);
            ::membuf_macros::tracing::dispatcher::with_default(&dispatch, || #block)
        }
    };
    TokenStream::from(expanded)
}

/// Validates a level literal, returning it in upper case.
fn parse_level(lit: &Lit) -> Result<String, syn::Error> {
    let Lit::Str(value) = lit else {
        return Err(syn::Error::new_spanned(lit, "level must be a string literal"));
    };
    let value = value.value().to_uppercase();
    if !LEVELS.contains(&value.as_str()) {
        return Err(syn::Error::new_spanned(
            lit,
            format!("unknown level, expected one of {LEVELS:?}"),
        ));
    }
    Ok(value)
}
