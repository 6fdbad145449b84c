//! Recursive-descent JSON parser.
//!
//! Whitespace outside strings is removed first. Every nested structure and
//! every string is then delimited with [`find_corresponding_bracket`], so the
//! member loop only ever has to look at one level.

use super::{JsonError, JsonNode, JsonValue, is_float_text, is_int_text};

/// Position of the bracket (or quote) matching the one at `pos`.
///
/// Opening brackets search forward, closing brackets backward. Two-character
/// escape sequences are skipped. Nesting is tracked for the bracket type at
/// `pos` only.
pub fn find_corresponding_bracket(content: &[u8], pos: usize) -> Result<usize, JsonError> {
    let bracket = *content
        .get(pos)
        .ok_or(JsonError::IndexOutOfBounds(pos))?;

    let (closer, step, is_quote): (u8, isize, bool) = match bracket {
        b'(' => (b')', 1, false),
        b'[' => (b']', 1, false),
        b'{' => (b'}', 1, false),
        b'"' => (b'"', 1, true),
        b'\'' => (b'\'', 1, true),
        b')' => (b'(', -1, false),
        b']' => (b'[', -1, false),
        b'}' => (b'{', -1, false),
        other => {
            return Err(JsonError::NotABracket {
                pos,
                found: other as char,
            });
        }
    };

    let len = content.len() as isize;
    let mut level: usize = 0;
    let mut position = pos as isize + step;

    while position >= 0 && position < len {
        let c = content[position as usize];

        if c == b'\\' {
            position += 2 * step;
            continue;
        }

        if c == bracket && !is_quote {
            level += 1;
        }

        if c == closer {
            if level == 0 {
                return Ok(position as usize);
            }
            level -= 1;
        }

        position += step;
    }

    Err(JsonError::NoCorrespondingBracket { pos })
}

/// Parse a document. The top level must be an object.
///
/// An empty (or all-whitespace) text yields an empty root.
pub fn parse(text: &str) -> Result<JsonNode, JsonError> {
    let content = strip_whitespace(text.as_bytes())?;
    let mut root = JsonNode::new();

    if content.is_empty() {
        return Ok(root);
    }

    if content[0] != b'{' {
        return Err(JsonError::CurlyExpected);
    }

    let stop = find_corresponding_bracket(&content, 0)?;
    parse_members(&mut root, &content, 1, stop, true)?;
    Ok(root)
}

fn strip_whitespace(text: &[u8]) -> Result<Vec<u8>, JsonError> {
    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;

    while pos < text.len() {
        match text[pos] {
            b'\\' => {
                let end = (pos + 2).min(text.len());
                out.extend_from_slice(&text[pos..end]);
                pos = end;
            }
            b'"' => {
                let end = find_corresponding_bracket(text, pos)?;
                out.extend_from_slice(&text[pos..=end]);
                pos = end + 1;
            }
            b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }

    Ok(out)
}

fn text_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse the members of an object (`named`) or the elements of an array
/// between `start` (inclusive) and `stop` (the closing bracket).
fn parse_members(
    node: &mut JsonNode,
    content: &[u8],
    mut start: usize,
    stop: usize,
    named: bool,
) -> Result<(), JsonError> {
    node.is_array = !named;
    node.is_object = named;

    if stop > content.len() {
        return Err(JsonError::IndexOutOfBounds(stop));
    }

    while start < stop {
        let mut child = JsonNode::default();

        let value_start = if named {
            if content[start] != b'"' {
                return Err(JsonError::NameExpected { pos: start });
            }
            let name_end = find_corresponding_bracket(content, start)?;
            if name_end + 1 >= stop || content[name_end + 1] != b':' {
                return Err(JsonError::ColonExpected { pos: name_end + 1 });
            }
            child.name = text_of(&content[start + 1..name_end]);
            name_end + 2
        } else {
            start
        };

        if value_start >= stop {
            return Err(JsonError::ValueExpected { pos: value_start });
        }

        let value_stop = match content[value_start] {
            open @ (b'{' | b'[') => {
                let close = find_corresponding_bracket(content, value_start)?;
                if close >= stop {
                    return Err(JsonError::BracketExpected { pos: value_start });
                }
                parse_members(&mut child, content, value_start + 1, close, open == b'{')?;
                close + 1
            }
            _ => {
                let end = scalar_end(content, value_start, stop)?;
                child.value = parse_scalar(&content[value_start..end], value_start)?;
                end
            }
        };

        node.children.push(child);

        if value_stop == stop {
            break;
        }
        if value_stop < stop && content[value_stop] == b',' {
            start = value_stop + 1;
            continue;
        }
        return Err(JsonError::CommaOrEndExpected { pos: value_stop });
    }

    Ok(())
}

/// End of a scalar run: the next `,`, `}` or `]` outside a string.
fn scalar_end(content: &[u8], start: usize, stop: usize) -> Result<usize, JsonError> {
    let mut pos = start;
    while pos < stop {
        match content[pos] {
            b'"' => pos = find_corresponding_bracket(content, pos)? + 1,
            b',' | b'}' | b']' => break,
            _ => pos += 1,
        }
    }
    Ok(pos)
}

/// Classify a scalar literal: null, true, false, string, integer, float.
///
/// A run that is none of these, or a float outside the `f64` range, stays
/// untyped (null).
fn parse_scalar(raw: &[u8], pos: usize) -> Result<JsonValue, JsonError> {
    match raw {
        [] => Err(JsonError::ValueExpected { pos }),
        b"null" => Ok(JsonValue::Null),
        b"true" => Ok(JsonValue::Bool(true)),
        b"false" => Ok(JsonValue::Bool(false)),
        [b'"', ..] if raw.len() > 2 => Ok(JsonValue::String(text_of(&raw[1..raw.len() - 1]))),
        [b'"', ..] => Ok(JsonValue::String(String::new())),
        _ => {
            let text = text_of(raw);
            if is_int_text(&text) {
                if let Ok(v) = text.parse::<i64>() {
                    return Ok(JsonValue::Int(v));
                }
            }
            if is_float_text(&text) {
                if let Some(v) = text.parse::<f64>().ok().filter(|v| v.is_finite()) {
                    return Ok(JsonValue::Float(v));
                }
            }
            Ok(JsonValue::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_matching_forward_and_backward() {
        let s = b"{a[b]{c}}";
        assert_eq!(find_corresponding_bracket(s, 0), Ok(8));
        assert_eq!(find_corresponding_bracket(s, 2), Ok(4));
        assert_eq!(find_corresponding_bracket(s, 8), Ok(0));
        assert_eq!(find_corresponding_bracket(s, 7), Ok(5));
    }

    #[test]
    fn bracket_matching_skips_escapes() {
        let s = br#""a\"b""#;
        assert_eq!(find_corresponding_bracket(s, 0), Ok(5));
    }

    #[test]
    fn bracket_matching_nested_same_type() {
        let s = b"((x)(y))";
        assert_eq!(find_corresponding_bracket(s, 0), Ok(7));
        assert_eq!(find_corresponding_bracket(s, 7), Ok(0));
    }

    #[test]
    fn bracket_matching_errors() {
        assert_eq!(
            find_corresponding_bracket(b"abc", 1),
            Err(JsonError::NotABracket { pos: 1, found: 'b' })
        );
        assert_eq!(
            find_corresponding_bracket(b"{{}", 0),
            Err(JsonError::NoCorrespondingBracket { pos: 0 })
        );
        assert_eq!(
            find_corresponding_bracket(b"]", 0),
            Err(JsonError::NoCorrespondingBracket { pos: 0 })
        );
        assert_eq!(
            find_corresponding_bracket(b"", 0),
            Err(JsonError::IndexOutOfBounds(0))
        );
    }

    #[test]
    fn parses_scalars() {
        let root = parse(r#"{"n": null, "t": true, "f": false, "i": -12, "x": 2.5e1, "s": "hi", "e": ""}"#)
            .expect("parse");
        assert_eq!(root.element("n").expect("n").value(), &JsonValue::Null);
        assert_eq!(root.element("t").expect("t").value(), &JsonValue::Bool(true));
        assert_eq!(root.element("f").expect("f").value(), &JsonValue::Bool(false));
        assert_eq!(root.element("i").expect("i").value(), &JsonValue::Int(-12));
        assert_eq!(root.element("x").expect("x").value(), &JsonValue::Float(25.0));
        assert_eq!(
            root.element("s").expect("s").value(),
            &JsonValue::String("hi".into())
        );
        assert_eq!(
            root.element("e").expect("e").value(),
            &JsonValue::String(String::new())
        );
    }

    #[test]
    fn unclassified_literal_stays_untyped() {
        let root = parse(r#"{"v": abc}"#).expect("parse");
        assert!(root.element("v").expect("v").is_null());
    }

    #[test]
    fn overflowing_float_stays_untyped() {
        let first = parse(r#"{"a": 1e400, "b": -1e400}"#).expect("parse");
        assert_eq!(first.element("a").expect("a").value(), &JsonValue::Null);
        assert_eq!(first.element("b").expect("b").value(), &JsonValue::Null);
        let second = parse(&first.print(0)).expect("reparse");
        assert_eq!(first, second);
    }

    #[test]
    fn whitespace_inside_strings_is_kept() {
        let root = parse("{ \"a key\" :\n\t\"two  words\" }").expect("parse");
        assert_eq!(
            root.element("a key").expect("key").value(),
            &JsonValue::String("two  words".into())
        );
    }

    #[test]
    fn escaped_quotes_stay_verbatim() {
        let root = parse(r#"{"q": "say \"hi\", ok"}"#).expect("parse");
        assert_eq!(
            root.element("q").expect("q").value(),
            &JsonValue::String(r#"say \"hi\", ok"#.into())
        );
    }

    #[test]
    fn nested_objects_and_arrays() {
        let root = parse(r#"{"a": {"b": [1, {"c": 3}, [4, 5]]}, "d": 6}"#).expect("parse");
        let b = root.element("a").expect("a").element("b").expect("b");
        assert!(b.is_array());
        assert_eq!(b.len(), 3);
        assert_eq!(
            b.element_at(1).expect("1").element("c").expect("c").value(),
            &JsonValue::Int(3)
        );
        assert_eq!(b.element_at(2).expect("2").len(), 2);
        assert_eq!(root.element("d").expect("d").value(), &JsonValue::Int(6));
    }

    #[test]
    fn empty_document_and_empty_containers() {
        assert!(parse("  ").expect("parse").is_empty());
        let root = parse(r#"{"o": {}, "l": []}"#).expect("parse");
        assert!(root.element("o").expect("o").is_null());
        assert!(root.element("l").expect("l").is_array());
    }

    #[test]
    fn empty_objects_print_back_as_objects() {
        for text in ["{}", "  ", r#"{"o": {}, "l": [{}]}"#] {
            let first = parse(text).expect("parse");
            let printed = first.print(0);
            let second = parse(&printed).expect("reparse");
            assert_eq!(first, second, "{printed}");
        }
        assert_eq!(parse("{}").expect("parse").print(0), "{}");
    }

    #[test]
    fn missing_colon() {
        assert!(matches!(
            parse(r#"{"a" 1}"#),
            Err(JsonError::ColonExpected { .. })
        ));
    }

    #[test]
    fn missing_name() {
        assert!(matches!(
            parse(r#"{1: 2}"#),
            Err(JsonError::NameExpected { .. })
        ));
    }

    #[test]
    fn missing_comma() {
        assert!(matches!(
            parse(r#"{"a": {"b": 1}"c": 2}"#),
            Err(JsonError::CommaOrEndExpected { .. })
        ));
    }

    #[test]
    fn unmatched_bracket() {
        assert!(matches!(
            parse(r#"{"a": [1, 2}"#),
            Err(JsonError::NoCorrespondingBracket { .. } | JsonError::BracketExpected { .. })
        ));
        assert!(matches!(
            parse(r#"{"a": "open}"#),
            Err(JsonError::NoCorrespondingBracket { .. })
        ));
    }

    #[test]
    fn missing_value() {
        assert!(matches!(
            parse(r#"{"a":}"#),
            Err(JsonError::ValueExpected { .. })
        ));
        assert!(matches!(
            parse(r#"{"a":,"b":1}"#),
            Err(JsonError::ValueExpected { .. })
        ));
    }

    #[test]
    fn top_level_must_be_object() {
        assert_eq!(parse("[1, 2]"), Err(JsonError::CurlyExpected));
    }

    #[test]
    fn printed_document_parses_back() {
        let text = r#"{"a": 1.0, "b": [true, null, "s"], "c": {"d": -3}}"#;
        let first = parse(text).expect("parse");
        let second = parse(&first.print(0)).expect("reparse");
        assert_eq!(first, second);
    }
}
