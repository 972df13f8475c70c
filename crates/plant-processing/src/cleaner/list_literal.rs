//! Parser for textual list literals such as `['Full sun', "part shade"]`.

/// Parse a bracketed, comma-separated list of quoted strings.
///
/// Both quote styles are accepted, backslash escapes the next character, and a
/// trailing comma is allowed. An empty literal `[]` yields an empty list.
pub fn parse_list_literal(text: &str) -> Result<Vec<String>, String> {
    let body = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| format!("expected '[...]', found '{}'", text))?;

    let mut items = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(other) => return Err(format!("expected a quoted string, found '{}'", other)),
        };

        let mut item = String::new();
        loop {
            match chars.next() {
                None => return Err("unterminated string".to_string()),
                Some('\\') => match chars.next() {
                    Some(escaped) => item.push(escaped),
                    None => return Err("dangling escape".to_string()),
                },
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
            }
        }
        items.push(item);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => return Err(format!("expected ',' or ']', found '{}'", other)),
        }
    }

    Ok(items)
}
