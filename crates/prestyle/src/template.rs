//! Template Literal Scanner
//!
//! Byte-level scanning of backtick template bodies and their `${ … }`
//! interpolations. Every delimiter is ASCII, so scanning bytes never splits a
//! multi-byte character.

use std::ops::Range;

/// One `${ … }` interpolation inside a template body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation<'a> {
    /// Byte range of the whole `${ … }` span within the body
    pub span: Range<usize>,
    /// Text between the braces, untrimmed
    pub expression: &'a str,
}

/// Find the closing backtick of a template literal.
///
/// `start` is the byte index just past the opening backtick. Only a backtick
/// outside every interpolation terminates the template; quoted strings and
/// nested templates inside an interpolation are skipped as units.
pub fn find_template_end(text: &str, start: usize) -> Option<usize> {
    template_end(text.as_bytes(), start)
}

/// All top-level interpolations of a template body, in source order.
///
/// Scanning stops at the first unterminated interpolation.
pub fn interpolations(body: &str) -> Vec<Interpolation<'_>> {
    let bytes = body.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let Some(end) = skip_expression(bytes, i + 2) else {
                    break;
                };
                found.push(Interpolation {
                    span: i..end,
                    expression: &body[i + 2..end - 1],
                });
                i = end;
            }
            _ => i += 1,
        }
    }

    found
}

/// Rebuild a body, replacing each interpolation for which `f` returns a value.
///
/// Interpolations mapped to `None` are kept verbatim.
pub fn replace_interpolations<F>(body: &str, mut f: F) -> String
where
    F: FnMut(&Interpolation<'_>) -> Option<String>,
{
    let mut out = String::with_capacity(body.len());
    let mut last = 0;

    for interp in interpolations(body) {
        out.push_str(&body[last..interp.span.start]);
        match f(&interp) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&body[interp.span.clone()]),
        }
        last = interp.span.end;
    }

    out.push_str(&body[last..]);
    out
}

fn template_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = skip_expression(bytes, i + 2)?;
            }
            _ => i += 1,
        }
    }
    None
}

/// Skip an interpolation whose `${` ends just before `start`.
/// Returns the index just past the matching `}`.
fn skip_expression(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'\'' | b'"' => i = skip_string(bytes, i)?,
            b'`' => i = template_end(bytes, i + 1)?,
            _ => {}
        }
        i += 1;
    }

    None
}

/// Returns the index of the quote closing the string opened at `start`.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_end_simple() {
        let src = "`color: red;` rest";
        assert_eq!(find_template_end(src, 1), Some(12));
    }

    #[test]
    fn test_find_end_skips_nested_backticks() {
        let src = "`a: ${p => `${p.x}px`};` tail";
        let end = find_template_end(src, 1).unwrap();
        assert_eq!(&src[end..], "` tail");
    }

    #[test]
    fn test_find_end_skips_braces_in_strings() {
        let src = "`a: ${p => p.x ? '}' : \"`\"};`";
        let end = find_template_end(src, 1).unwrap();
        assert_eq!(end, src.len() - 1);
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(find_template_end("`color: red;", 1), None);
        assert_eq!(find_template_end("`color: ${p => p.x;`", 1), None);
    }

    #[test]
    fn test_interpolations() {
        let body = "color: ${p => p.color}; margin: ${m}px;";
        let found = interpolations(body);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].expression, "p => p.color");
        assert_eq!(found[1].expression, "m");
        assert_eq!(&body[found[1].span.clone()], "${m}");
    }

    #[test]
    fn test_interpolation_with_block_body() {
        let found = interpolations("color: ${x => { throw }}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].expression, "x => { throw }");
    }

    #[test]
    fn test_replace_interpolations() {
        let out = replace_interpolations("a: ${x}; b: ${y};", |i| {
            (i.expression == "x").then(|| "1".to_string())
        });
        assert_eq!(out, "a: 1; b: ${y};");
    }
}
