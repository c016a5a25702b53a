/// Expand `${NAME}` and `${NAME:-fallback}` placeholders from the process
/// environment.
///
/// A variable with no value and no fallback is left in place so the parse
/// error (if any) points at it. `$${` produces a literal `${`.
pub fn substitute_env(input: &str) -> String {
    expand(input, |name| std::env::var(name).ok())
}

fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        if rest[..start].ends_with('$') {
            out.push_str(&rest[..start - 1]);
            out.push_str("${");
            rest = &rest[start + 2..];
            continue;
        }
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &body[..end];
        let (name, fallback) = match placeholder.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (placeholder, None),
        };
        match lookup(name).filter(|v| !v.is_empty() || fallback.is_none()) {
            Some(value) => out.push_str(&value),
            None => match fallback {
                Some(fallback) => out.push_str(fallback),
                None => {
                    out.push_str("${");
                    out.push_str(placeholder);
                    out.push('}');
                },
            },
        }
        rest = &body[end + 1..];
    }
    out.push_str(rest);
    out
}
