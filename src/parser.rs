use crate::error::ParserError;
use crate::json::{JsonMap, JsonValue};
use crate::lexer::{Lexer, Token, TokenType};
use miette::NamedSource;
use std::sync::Arc;

/// Arrays and objects nested deeper than this are rejected instead of
/// recursing further.
pub const MAX_DEPTH: usize = 512;

/// A recursive descent parser for JSON text.
#[derive(Debug)]
pub struct Parser<'a> {
    source: Arc<NamedSource<String>>,
    tokens: Vec<Token>,
    position: usize,
    source_text: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::new_with_name(source_text, "input.json".to_string())
    }

    pub fn new_with_name(source_text: &'a str, name: String) -> Self {
        let source = Arc::new(NamedSource::new(name, source_text.to_string()));
        let mut lexer = Lexer::new(source_text);
        let tokens: Vec<Token> = lexer
            .lex()
            .into_iter()
            .filter(|t| !matches!(t.ttype, TokenType::Whitespace))
            .collect();

        Self {
            source,
            tokens,
            position: 0,
            source_text,
            depth: 0,
        }
    }

    // === Main Parsing Methods ===

    ///    Document ::= Value EOF
    pub fn parse_document(&mut self) -> Result<JsonValue, ParserError> {
        let root = self.parse_value()?;
        self.expect(TokenType::Eof)?;
        Ok(root)
    }

    /// Value ::= Object | Array | String | Number | "true" | "false" | "null"
    fn parse_value(&mut self) -> Result<JsonValue, ParserError> {
        let token = self.current_token()?.clone();
        let value = match &token.ttype {
            TokenType::LBrace => return self.parse_object(),
            TokenType::LBracket => return self.parse_array(),
            TokenType::String(s) => JsonValue::String(s.clone()),
            TokenType::Integer(n) => JsonValue::Int64(*n),
            TokenType::Float(n) => JsonValue::Double(*n),
            TokenType::True => JsonValue::Boolean(true),
            TokenType::False => JsonValue::Boolean(false),
            TokenType::Null => JsonValue::Null,
            TokenType::Invalid(reason) => return self.err_invalid(&token, reason.clone()),
            _ => return self.err_unexpected("a value"),
        };
        self.advance();
        Ok(value)
    }

    /// Object ::= "{" [ Member { "," Member } ] "}"
    /// Member ::= String ":" Value
    fn parse_object(&mut self) -> Result<JsonValue, ParserError> {
        self.descend()?;
        self.expect(TokenType::LBrace)?;
        let mut map = JsonMap::new();
        if !self.check(TokenType::RBrace) {
            loop {
                let key = self.parse_key()?;
                self.expect(TokenType::Colon)?;
                let value = self.parse_value()?;
                map.insert(key, value);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RBrace)?;
        self.depth -= 1;
        Ok(JsonValue::Object(map))
    }

    /// Array ::= "[" [ Value { "," Value } ] "]"
    fn parse_array(&mut self) -> Result<JsonValue, ParserError> {
        self.descend()?;
        self.expect(TokenType::LBracket)?;
        let mut values = Vec::new();
        if !self.check(TokenType::RBracket) {
            loop {
                values.push(self.parse_value()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RBracket)?;
        self.depth -= 1;
        Ok(JsonValue::Array(values))
    }

    fn parse_key(&mut self) -> Result<String, ParserError> {
        let token = self.current_token()?.clone();
        match &token.ttype {
            TokenType::String(s) => {
                self.advance();
                Ok(s.clone())
            }
            TokenType::Invalid(reason) => self.err_invalid(&token, reason.clone()),
            _ => self.err_unexpected("a string key"),
        }
    }

    fn descend(&mut self) -> Result<(), ParserError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let token = self.current_token()?;
            return Err(ParserError::NestingTooDeep {
                src: (*self.source).clone(),
                span: (token.pos_start, token.pos_end - token.pos_start).into(),
                limit: MAX_DEPTH,
            });
        }
        Ok(())
    }

    // === Tokenizer Helper Methods ===

    fn current_token(&self) -> Result<&Token, ParserError> {
        self.tokens.get(self.position).ok_or_else(|| {
            let pos = self.source_text.len().saturating_sub(1);
            ParserError::UnexpectedEof {
                src: (*self.source).clone(),
                span: (pos, 0).into(),
            }
        })
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: TokenType) -> Result<(), ParserError> {
        let token = self.current_token()?.clone();
        if std::mem::discriminant(&token.ttype) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(())
        } else {
            match &token.ttype {
                TokenType::Invalid(reason) => self.err_invalid(&token, reason.clone()),
                _ => self.err_unexpected(&describe(&expected)),
            }
        }
    }

    fn match_token(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, ttype: TokenType) -> bool {
        if let Ok(token) = self.current_token() {
            std::mem::discriminant(&token.ttype) == std::mem::discriminant(&ttype)
        } else {
            false
        }
    }

    fn err_unexpected<T>(&self, expected: &str) -> Result<T, ParserError> {
        let token = self.current_token()?;
        if token.ttype == TokenType::Eof {
            return Err(ParserError::UnexpectedEof {
                src: (*self.source).clone(),
                span: (token.pos_start, 0).into(),
            });
        }
        Err(ParserError::UnexpectedToken {
            src: (*self.source).clone(),
            span: (token.pos_start, token.pos_end - token.pos_start).into(),
            expected: expected.to_string(),
        })
    }

    fn err_invalid<T>(&self, token: &Token, reason: String) -> Result<T, ParserError> {
        Err(ParserError::InvalidLiteral {
            src: (*self.source).clone(),
            span: (token.pos_start, token.pos_end - token.pos_start).into(),
            reason,
        })
    }
}

fn describe(ttype: &TokenType) -> String {
    match ttype {
        TokenType::Eof => "end of input".to_string(),
        TokenType::LBrace => "'{'".to_string(),
        TokenType::RBrace => "'}' or ','".to_string(),
        TokenType::LBracket => "'['".to_string(),
        TokenType::RBracket => "']' or ','".to_string(),
        TokenType::Colon => "':'".to_string(),
        TokenType::Comma => "','".to_string(),
        other => format!("{other:?}"),
    }
}

/// Parses JSON text into a [`JsonValue`].
///
/// # Errors
/// Returns a `ParserError` describing the first syntax problem.
pub fn parse(source: &str) -> Result<JsonValue, ParserError> {
    Parser::new(source).parse_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    fn parse_ok(source: &str) -> JsonValue {
        let mut parser = Parser::new_with_name(source, "test.json".to_string());
        match parser.parse_document() {
            Ok(doc) => doc,
            Err(err) => {
                let report = Report::from(err);
                panic!("{:#}", report);
            }
        }
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(parse_ok("{}"), JsonValue::object());
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse_ok("42"), JsonValue::Int64(42));
        assert_eq!(parse_ok("4.0"), JsonValue::Double(4.0));
        assert_eq!(parse_ok(r#""hi""#), JsonValue::from("hi"));
        assert_eq!(parse_ok(" true "), JsonValue::Boolean(true));
        assert_eq!(parse_ok("null"), JsonValue::Null);
    }

    #[test]
    fn test_nested_document_keeps_order() {
        let doc = parse_ok(r#"{ "b": [1, 2.5, {"c": null}], "a": false }"#);
        let map = doc.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        let list = map["b"].as_array().unwrap();
        assert_eq!(list[0], JsonValue::Int64(1));
        assert_eq!(list[1], JsonValue::Double(2.5));
        assert!(list[2].get("c").unwrap().is_null());
    }

    #[test]
    fn test_duplicate_key_last_value_wins() {
        let doc = parse_ok(r#"{"a": 1, "b": 2, "a": 3}"#);
        let map = doc.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map["a"], JsonValue::Int64(3));
    }

    #[test]
    fn test_compact_render_is_inverted_by_parse() {
        let source = r#"{"name":"Ada","tags":["x","y\u0001"],"ratio":0.25,"count":7,"nested":{"empty":[],"none":{}}}"#;
        let doc = parse_ok(source);
        assert_eq!(parse_ok(&doc.to_compact_string()), doc);
        assert_eq!(parse_ok(&doc.to_pretty_string()), doc);
    }

    #[test]
    fn test_trailing_comma_rejected() {
        assert!(matches!(
            parse("[1, 2,]"),
            Err(ParserError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse(r#"{"a": 1,}"#),
            Err(ParserError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_trailing_content_rejected() {
        assert!(matches!(
            parse("{} {}"),
            Err(ParserError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(
            parse(r#"{"a": "#),
            Err(ParserError::UnexpectedEof { .. })
        ));
        assert!(matches!(parse(""), Err(ParserError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_invalid_literal_reported() {
        match parse(r#"{"a": 01}"#) {
            Err(ParserError::InvalidLiteral { reason, .. }) => {
                assert!(reason.contains("leading zeros"))
            }
            other => panic!("Expected InvalidLiteral, got {other:?}"),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(MAX_DEPTH + 1) + &"]".repeat(MAX_DEPTH + 1);
        assert!(matches!(
            parse(&deep),
            Err(ParserError::NestingTooDeep { .. })
        ));
        let ok = "[".repeat(MAX_DEPTH) + &"]".repeat(MAX_DEPTH);
        assert!(parse(&ok).is_ok());
    }
}
