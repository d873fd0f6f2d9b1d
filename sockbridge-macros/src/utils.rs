use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Options accepted by `#[main(...)]` and `#[test(...)]`.
#[derive(Default)]
pub(crate) struct Options {
    pub(crate) worker_threads: Option<usize>,
    pub(crate) thread_name: Option<String>,
}

/// Parses `key = value` pairs separated by commas.
pub(crate) fn parse_options(attr: TokenStream) -> Result<Options, String> {
    let mut options = Options::default();
    let attr = attr.to_string();

    for part in attr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            return Err(format!("expected `key = value`, found `{part}`"));
        };

        match key.trim() {
            "worker_threads" => {
                let n = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("`worker_threads` must be an integer, found `{}`", value.trim()))?;

                if n == 0 {
                    return Err("`worker_threads` must be > 0".to_string());
                }

                options.worker_threads = Some(n);
            }
            "thread_name" => {
                let value = value.trim();
                let name = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .ok_or_else(|| format!("`thread_name` must be a string literal, found `{value}`"))?;

                options.thread_name = Some(name.to_string());
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    Ok(options)
}

/// Builder expression for the configured runtime.
pub(crate) fn runtime_expr(options: &Options) -> String {
    let mut builder = String::from("::sockbridge::RuntimeBuilder::new()");

    if let Some(n) = options.worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    if let Some(name) = &options.thread_name {
        builder.push_str(&format!(".thread_name({name:?})"));
    }

    builder.push_str(".build()");
    builder
}

/// Drops `async` from a function item and replaces its body with
/// `wrap(body)`.
pub(crate) fn rewrite_body(
    item: TokenStream,
    wrap: impl FnOnce(String) -> String,
) -> Result<Vec<TokenTree>, String> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return Err("the function must be `async`".to_string());
    };

    tokens.remove(async_pos);

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return Err("expected a function body".to_string());
    };

    let body = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let stream = wrap(body)
        .parse::<TokenStream>()
        .map_err(|e| format!("generated body does not parse: {e}"))?;

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));
    Ok(tokens)
}

pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}
