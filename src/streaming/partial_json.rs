//! Tolerant parsing of truncated JSON documents
//!
//! Models stream structured output token by token, so at any point the text
//! received so far is usually an unfinished JSON object. [`parse_partial_json`]
//! recovers everything that is already certain: closed containers, finished
//! strings, and numbers or literals followed by a delimiter. Values still being
//! written are left out entirely, so each successive snapshot only adds fields.

use serde_json::{Map, Value};

/// Parse the (possibly truncated) JSON object contained in `text`.
///
/// Leading prose or a markdown code fence before the first `{` is skipped.
/// Returns `None` when no object has started yet or the text is not JSON.
pub fn parse_partial_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut parser = Parser {
        input: &text.as_bytes()[start..],
        pos: 0,
    };

    match parser.parse_value() {
        Ok(Parsed::Complete(value)) | Ok(Parsed::Truncated(Some(value))) => Some(value),
        Ok(Parsed::Truncated(None)) | Err(Invalid) => None,
    }
}

enum Parsed {
    Complete(Value),
    /// Input ended inside the value; carries whatever is already certain
    Truncated(Option<Value>),
}

struct Invalid;

type ParseResult = std::result::Result<Parsed, Invalid>;

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\n' | b'\r' | b'\t')) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> ParseResult {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(Parsed::Truncated(None)),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => Ok(match self.parse_string()? {
                Some(s) => Parsed::Complete(Value::String(s)),
                None => Parsed::Truncated(None),
            }),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(_) => Err(Invalid),
        }
    }

    fn parse_object(&mut self) -> ParseResult {
        self.pos += 1;
        let mut map = Map::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Object(map)));
                }
                Some(b'"') => {}
                Some(_) => return Err(Invalid),
            }

            let key = match self.parse_string()? {
                Some(key) => key,
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
            };

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
                Some(b':') => self.pos += 1,
                Some(_) => return Err(Invalid),
            }

            match self.parse_value()? {
                Parsed::Complete(value) => {
                    map.insert(key, value);
                }
                Parsed::Truncated(partial) => {
                    if let Some(value) = partial {
                        map.insert(key, value);
                    }
                    return Ok(Parsed::Truncated(Some(Value::Object(map))));
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                Some(_) => return Err(Invalid),
            }
        }
    }

    fn parse_array(&mut self) -> ParseResult {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Array(items)))),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Array(items)));
                }
                Some(_) => {}
            }

            match self.parse_value()? {
                Parsed::Complete(value) => items.push(value),
                Parsed::Truncated(partial) => {
                    if let Some(value) = partial {
                        items.push(value);
                    }
                    return Ok(Parsed::Truncated(Some(Value::Array(items))));
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Array(items)))),
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                Some(_) => return Err(Invalid),
            }
        }
    }

    /// `Ok(None)` when the input ends before the closing quote.
    fn parse_string(&mut self) -> std::result::Result<Option<String>, Invalid> {
        self.pos += 1;
        let mut bytes = Vec::new();

        loop {
            let byte = match self.peek() {
                None => return Ok(None),
                Some(byte) => byte,
            };
            self.pos += 1;

            match byte {
                b'"' => return String::from_utf8(bytes).map(Some).map_err(|_| Invalid),
                b'\\' => {
                    let escaped = match self.peek() {
                        None => return Ok(None),
                        Some(escaped) => escaped,
                    };
                    self.pos += 1;
                    match escaped {
                        b'"' => bytes.push(b'"'),
                        b'\\' => bytes.push(b'\\'),
                        b'/' => bytes.push(b'/'),
                        b'b' => bytes.push(0x08),
                        b'f' => bytes.push(0x0c),
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'u' => {
                            let ch = match self.parse_unicode_escape()? {
                                Some(ch) => ch,
                                None => return Ok(None),
                            };
                            let mut buf = [0u8; 4];
                            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        }
                        _ => return Err(Invalid),
                    }
                }
                _ => bytes.push(byte),
            }
        }
    }

    /// Decodes the digits after `\u`, joining surrogate pairs.
    fn parse_unicode_escape(&mut self) -> std::result::Result<Option<char>, Invalid> {
        let high = match self.read_hex4()? {
            Some(code) => code,
            None => return Ok(None),
        };

        if !(0xD800..0xDC00).contains(&high) {
            return Ok(Some(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)));
        }

        // high surrogate: a `\uXXXX` low surrogate must follow
        match (self.peek(), self.input.get(self.pos + 1).copied()) {
            (None, _) | (Some(b'\\'), None) => return Ok(None),
            (Some(b'\\'), Some(b'u')) => self.pos += 2,
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        }

        let low = match self.read_hex4()? {
            Some(code) => code,
            None => return Ok(None),
        };
        if !(0xDC00..0xE000).contains(&low) {
            return Ok(Some(char::REPLACEMENT_CHARACTER));
        }

        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        Ok(Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)))
    }

    fn read_hex4(&mut self) -> std::result::Result<Option<u32>, Invalid> {
        let end = self.pos + 4;
        if end > self.input.len() {
            return if self.input[self.pos..].iter().all(u8::is_ascii_hexdigit) {
                Ok(None)
            } else {
                Err(Invalid)
            };
        }

        let digits = std::str::from_utf8(&self.input[self.pos..end]).map_err(|_| Invalid)?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| Invalid)?;
        self.pos = end;
        Ok(Some(code))
    }

    fn parse_literal(&mut self, literal: &str, value: Value) -> ParseResult {
        let rest = &self.input[self.pos..];
        let expected = literal.as_bytes();

        if rest.len() < expected.len() {
            return if expected.starts_with(rest) {
                Ok(Parsed::Truncated(None))
            } else {
                Err(Invalid)
            };
        }
        if !rest.starts_with(expected) {
            return Err(Invalid);
        }

        self.pos += expected.len();
        Ok(Parsed::Complete(value))
    }

    fn parse_number(&mut self) -> ParseResult {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.pos += 1;
        }

        // more digits may still be on their way
        if self.peek().is_none() {
            return Ok(Parsed::Truncated(None));
        }

        let digits = std::str::from_utf8(&self.input[start..self.pos]).map_err(|_| Invalid)?;
        serde_json::from_str::<serde_json::Number>(digits)
            .map(|n| Parsed::Complete(Value::Number(n)))
            .map_err(|_| Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", None)]
    #[case("Sure, here it is", None)]
    #[case("{", Some(json!({})))]
    #[case(r#"{"title": "Qua"#, Some(json!({})))]
    #[case(r#"{"title": "Quantum"#, Some(json!({})))]
    #[case(r#"{"title": "Quantum""#, Some(json!({"title": "Quantum"})))]
    #[case(r#"{"title": "Quantum", "sections": [{"title": "A", "content": "par"#, Some(json!({"title": "Quantum", "sections": [{"title": "A"}]})))]
    #[case(r#"{"n": 12"#, Some(json!({})))]
    #[case(r#"{"n": 12,"#, Some(json!({"n": 12})))]
    #[case(r#"{"ok": tr"#, Some(json!({})))]
    #[case(r#"{"ok": true}"#, Some(json!({"ok": true})))]
    #[case(r#"{"list": ["a", "b"#, Some(json!({"list": ["a"]})))]
    #[case(r#"{"k": nope}"#, None)]
    fn test_parse_partial(#[case] input: &str, #[case] expected: Option<Value>) {
        assert_eq!(parse_partial_json(input), expected);
    }

    #[test]
    fn test_skips_code_fence() {
        let input = "```json\n{\"title\": \"Report\", \"executive_summary\": \"Short\"}\n```";
        assert_eq!(
            parse_partial_json(input),
            Some(json!({"title": "Report", "executive_summary": "Short"}))
        );
    }

    #[test]
    fn test_escapes() {
        let input = r#"{"a": "line\nbreak \"quoted\" café 😀"}"#;
        assert_eq!(
            parse_partial_json(input),
            Some(json!({"a": "line\nbreak \"quoted\" café 😀"}))
        );
    }

    #[test]
    fn test_truncated_escape_drops_string() {
        assert_eq!(parse_partial_json(r#"{"a": "x\u00"#), Some(json!({})));
        assert_eq!(parse_partial_json(r#"{"a": "x\"#), Some(json!({})));
    }

    #[test]
    fn test_snapshots_only_grow() {
        let full = r#"{"title": "T", "executive_summary": "E", "key_takeaways": ["one", "two"]}"#;
        let mut previous_keys = 0;
        for end in 1..=full.len() {
            if let Some(Value::Object(map)) = parse_partial_json(&full[..end]) {
                assert!(map.len() >= previous_keys, "shrank at {}", end);
                previous_keys = map.len();
            }
        }
        assert_eq!(previous_keys, 3);
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            parse_partial_json(r#"{"t": "日本語", "u": "ü"#),
            Some(json!({"t": "日本語"}))
        );
    }
}
