/// Escapes a value for use inside a single-quoted Drive query string.
pub fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Query matching a non-trashed file called `name` directly under `parent`.
pub fn lookup_query(parent: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and trashed = false",
        escape_query_value(parent),
        escape_query_value(name)
    )
}
