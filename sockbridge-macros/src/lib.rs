//! Entry-point macros for the `sockbridge` runtime.
//!
//! Both macros turn an `async fn` into a synchronous one that builds a
//! runtime and blocks on the original body. Accepted options:
//!
//! - `worker_threads = N`
//! - `thread_name = "name"`

mod utils;

use proc_macro::{TokenStream, TokenTree};

/// Runs an `async fn main` on a fresh runtime.
///
/// ```rust,ignore
/// #[sockbridge::main(worker_threads = 2)]
/// async fn main() {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match utils::parse_options(attr) {
        Ok(options) => options,
        Err(e) => return utils::compile_error(&e),
    };

    let runtime = utils::runtime_expr(&options);

    let rewritten = utils::rewrite_body(item, |body| {
        format!(
            "{{
                let runtime = {runtime};
                runtime.block_on(async move {{ {body} }})
            }}"
        )
    });

    match rewritten {
        Ok(tokens) => tokens.into_iter().collect(),
        Err(e) => utils::compile_error(&e),
    }
}

/// Runs an `async` test on a fresh runtime.
///
/// Panics inside the test body fail the test as usual.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match utils::parse_options(attr) {
        Ok(options) => options,
        Err(e) => return utils::compile_error(&e),
    };

    let runtime = utils::runtime_expr(&options);

    let rewritten = utils::rewrite_body(item, |body| {
        format!(
            "{{
                let runtime = {runtime};
                runtime.block_on(async move {{ {body} }});
            }}"
        )
    });

    let tokens = match rewritten {
        Ok(tokens) => tokens,
        Err(e) => return utils::compile_error(&e),
    };

    let mut result: Vec<TokenTree> = "#[::core::prelude::v1::test]"
        .parse::<TokenStream>()
        .unwrap_or_default()
        .into_iter()
        .collect();

    result.extend(tokens);
    result.into_iter().collect()
}
