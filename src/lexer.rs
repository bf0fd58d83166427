/// Represents the different kinds of tokens that the lexer can produce.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // == Special Tokens ==
    /// Represents the end of the input.
    Eof,
    /// Represents a sequence of one or more JSON whitespace characters.
    Whitespace,
    /// A malformed literal; the associated text says what is wrong with it.
    Invalid(String),
    /// Represents a character that cannot start any token.
    Unknown,

    // == Literals ==
    /// A string literal with its escapes already decoded.
    String(String),
    /// A number literal without fraction or exponent that fits in `i64`.
    Integer(i64),
    /// Any other number literal.
    Float(f64),

    // == Keywords ==
    True,
    False,
    Null,

    // == Punctuation ==
    /// Left Brace: `{`
    LBrace,
    /// Right Brace: `}`
    RBrace,
    /// Left Bracket: `[`
    LBracket,
    /// Right Bracket: `]`
    RBracket,
    /// Comma: `,`
    Comma,
    /// Colon: `:`
    Colon,
}

/// A token with its type and position
#[derive(Debug, Clone)]
pub struct Token {
    pub ttype: TokenType,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Token {
    pub fn new(ttype: TokenType, pos_start: usize, pos_end: usize) -> Token {
        Token {
            ttype,
            pos_start,
            pos_end,
        }
    }
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    pub fn lex(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if token.ttype == TokenType::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        let start_pos = self.position;

        let ttype = if let Some(char) = self.advance() {
            match char {
                '{' => TokenType::LBrace,
                '}' => TokenType::RBrace,
                '[' => TokenType::LBracket,
                ']' => TokenType::RBracket,
                ',' => TokenType::Comma,
                ':' => TokenType::Colon,
                '"' => self.read_string(),
                ' ' | '\t' | '\n' | '\r' => self.read_whitespace(),
                c if c.is_ascii_alphabetic() => self.read_keyword(c),
                c if c.is_ascii_digit() || c == '-' => self.read_number(c),
                _ => TokenType::Unknown,
            }
        } else {
            TokenType::Eof
        };

        Token::new(ttype, start_pos, self.position)
    }

    fn advance(&mut self) -> Option<char> {
        let char = self.chars.next();
        if let Some(c) = char {
            self.position += c.len_utf8();
        }
        char
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn read_whitespace(&mut self) -> TokenType {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
        TokenType::Whitespace
    }

    fn read_string(&mut self) -> TokenType {
        let mut value = String::new();
        while let Some(c) = self.advance() {
            match c {
                '"' => return TokenType::String(value),
                '\\' => match self.read_escape() {
                    Ok(decoded) => value.push(decoded),
                    Err(reason) => return TokenType::Invalid(reason),
                },
                c if (c as u32) < 0x20 => {
                    return TokenType::Invalid("control character in string".to_string())
                }
                c => value.push(c),
            }
        }
        TokenType::Invalid("unterminated string".to_string())
    }

    fn read_escape(&mut self) -> Result<char, String> {
        let escaped = self
            .advance()
            .ok_or_else(|| "unterminated escape sequence".to_string())?;
        match escaped {
            '"' => Ok('"'),
            '\\' => Ok('\\'),
            '/' => Ok('/'),
            'b' => Ok('\u{08}'),
            'f' => Ok('\u{0C}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'u' => {
                let high = self.read_hex4()?;
                if (0xD800..0xDC00).contains(&high) {
                    // A high surrogate must be followed by an escaped low surrogate.
                    if self.advance() != Some('\\') || self.advance() != Some('u') {
                        return Err("unpaired surrogate in \\u escape".to_string());
                    }
                    let low = self.read_hex4()?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err("unpaired surrogate in \\u escape".to_string());
                    }
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code).ok_or_else(|| "invalid \\u escape".to_string())
                } else {
                    char::from_u32(high).ok_or_else(|| "unpaired surrogate in \\u escape".to_string())
                }
            }
            other => Err(format!("invalid escape `\\{other}`")),
        }
    }

    fn read_hex4(&mut self) -> Result<u32, String> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .advance()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| "invalid \\u escape".to_string())?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn read_keyword(&mut self, first_char: char) -> TokenType {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || *c == '_' {
                let c = *c;
                self.advance();
                ident.push(c);
            } else {
                break;
            }
        }

        match ident.as_str() {
            "true" => TokenType::True,
            "false" => TokenType::False,
            "null" => TokenType::Null,
            _ => TokenType::Invalid(format!("unexpected identifier `{ident}`")),
        }
    }

    /// Follows the JSON grammar: `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
    fn read_number(&mut self, first_char: char) -> TokenType {
        let mut number_str = String::new();
        number_str.push(first_char);

        let first_digit = if first_char == '-' {
            match self.advance() {
                Some(c) if c.is_ascii_digit() => {
                    number_str.push(c);
                    c
                }
                _ => return TokenType::Invalid("expected a digit after `-`".to_string()),
            }
        } else {
            first_char
        };

        if first_digit != '0' {
            self.take_digits(&mut number_str);
        } else if self.peek().is_some_and(char::is_ascii_digit) {
            return TokenType::Invalid("leading zeros are not allowed".to_string());
        }

        let mut is_float = false;
        if self.peek() == Some(&'.') {
            is_float = true;
            self.advance();
            number_str.push('.');
            if self.take_digits(&mut number_str) == 0 {
                return TokenType::Invalid("expected a digit after the decimal point".to_string());
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.advance();
            number_str.push('e');
            if let Some(sign) = self.peek().copied() {
                if sign == '+' || sign == '-' {
                    self.advance();
                    number_str.push(sign);
                }
            }
            if self.take_digits(&mut number_str) == 0 {
                return TokenType::Invalid("expected a digit in the exponent".to_string());
            }
        }

        if !is_float {
            if let Ok(n) = number_str.parse::<i64>() {
                return TokenType::Integer(n);
            }
        }
        match number_str.parse::<f64>() {
            Ok(n) => TokenType::Float(n),
            Err(_) => TokenType::Invalid(format!("invalid number `{number_str}`")),
        }
    }

    fn take_digits(&mut self, buffer: &mut String) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek().copied() {
            if c.is_ascii_digit() {
                self.advance();
                buffer.push(c);
                count += 1;
            } else {
                break;
            }
        }
        count
    }
}
