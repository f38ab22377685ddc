//! Bracket-aware helpers for rendered TypeScript type text.
//!
//! Type values travel through the engine as rendered strings (`"string | null"`,
//! `"{ a: \"x\" | \"y\" }[]"`). These helpers split, dedupe, wrap, and rename
//! inside such strings without touching nested scopes or string literals.

/// Split `text` on `sep` occurring at nesting depth zero.
///
/// Brackets `()[]{}<>` open nested scopes, quoted strings (`"`, `'`, `` ` ``)
/// are skipped, and the `>` of an arrow (`=>`) is not treated as a closer.
/// Each part is trimmed; empty parts are dropped.
pub fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = None;
    let mut current = String::new();

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = Some(c);
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' | '<' => depth += 1,
            '>' if prev == Some('=') => {}
            ')' | ']' | '}' | '>' => depth -= 1,
            _ => {}
        }

        if c == sep && depth == 0 {
            let part = current.trim();
            if !part.is_empty() {
                parts.push(part.to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
        prev = Some(c);
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// True when `text` contains a `|` at nesting depth zero.
pub fn has_top_level_union(text: &str) -> bool {
    split_top_level(text, '|').len() > 1
}

/// Parenthesize `text` when it is a top-level union, so it can be used as an
/// operand of `&` or as an array element type.
pub fn wrap_union(text: &str) -> String {
    if has_top_level_union(text) {
        format!("({text})")
    } else {
        text.to_string()
    }
}

/// Remove duplicate top-level members from a union type string.
///
/// The first occurrence of each member wins and member order is otherwise
/// preserved. Applying it twice gives the same result as applying it once.
pub fn dedupe_union(text: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    for member in split_top_level(text, '|') {
        if !seen.contains(&member) {
            seen.push(member);
        }
    }
    seen.join(" | ")
}

/// Replace every standalone occurrence of identifier `from` with `to`.
///
/// An occurrence is standalone when it is not part of a longer identifier,
/// not inside a string literal, not preceded by `.` (member access), and not
/// directly followed by `:` or `?:` (a property key).
pub fn replace_identifier(text: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = from.chars().collect();
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';

    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if matches!(c, '"' | '\'' | '`') {
            quote = Some(c);
            out.push(c);
            i += 1;
            continue;
        }

        let end = i + needle.len();
        if end <= chars.len() && chars[i..end] == needle[..] {
            let before_ok = i == 0 || (!is_ident(chars[i - 1]) && chars[i - 1] != '.');
            let after_ok = end == chars.len() || !is_ident(chars[end]);
            let rest: String = chars[end..].iter().collect();
            let rest = rest.trim_start();
            let is_key = rest.starts_with(':') || rest.starts_with("?:");
            if before_ok && after_ok && !is_key {
                out.push_str(to);
                i = end;
                continue;
            }
        }

        // Copy a whole identifier so a match is never found in its middle
        if is_ident(c) {
            while i < chars.len() && is_ident(chars[i]) {
                out.push(chars[i]);
                i += 1;
            }
            continue;
        }

        out.push(c);
        i += 1;
    }
    out
}
