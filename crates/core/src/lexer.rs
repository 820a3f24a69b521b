//! Tokenizer.
//!
//! The lexer always scans `/` as a punctuator and `}` as a brace; the parser
//! knows when it is in operand position and asks for a rescan as a regular
//! expression or as a template continuation.

use jscloak_utils::errors::{ParseError, SyntaxError, UnsupportedSyntaxError};

/// Punctuators, longest first so the scanner can take the first match.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Name(String),
    Num(String),
    Str { value: String, raw: String },
    Regex { pattern: String, flags: String },
    /// Template chunk. `head` is true when it starts with a backtick, `tail`
    /// when it ends with one.
    Template { raw: String, head: bool, tail: bool },
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Char offset of the first character.
    pub start: usize,
    pub line: usize,
    pub column: usize,
    /// A line terminator precedes this token.
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    pub fn is_name(&self, n: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(m) if m == n)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Short human readable description for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Name(n) => format!("'{n}'"),
            TokenKind::Num(n) => format!("number {n}"),
            TokenKind::Str { raw, .. } => format!("string {raw}"),
            TokenKind::Regex { .. } => "regular expression".to_string(),
            TokenKind::Template { .. } => "template literal".to_string(),
            TokenKind::Punct(p) => format!("'{p}'"),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

pub const fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

pub fn is_id_part(c: char) -> bool {
    is_id_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    line_start: usize,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        let mut lexer = Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
        };
        // hashbang
        if lexer.peek_char(0) == Some('#') && lexer.peek_char(1) == Some('!') {
            while let Some(c) = lexer.peek_char(0) {
                if is_line_terminator(c) {
                    break;
                }
                lexer.pos += 1;
            }
        }
        lexer
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    const fn column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    fn parse_error(&self, message: impl Into<String>) -> SyntaxError {
        ParseError::new(message, self.line, self.column()).into()
    }

    fn unsupported(&self, construct: impl Into<String>) -> SyntaxError {
        UnsupportedSyntaxError::new(construct, self.line, self.column()).into()
    }

    /// Consumes a line terminator at the cursor, treating `\r\n` as one.
    fn eat_newline(&mut self) {
        if self.peek_char(0) == Some('\r') && self.peek_char(1) == Some('\n') {
            self.pos += 1;
        }
        self.pos += 1;
        self.line += 1;
        self.line_start = self.pos;
    }

    /// Skips whitespace and comments; returns whether a line break was seen.
    fn skip_trivia(&mut self) -> Result<bool, SyntaxError> {
        let mut newline = false;
        let at_line_start = self.pos == 0;
        loop {
            let Some(c) = self.peek_char(0) else {
                break;
            };
            if is_line_terminator(c) {
                self.eat_newline();
                newline = true;
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.pos += 1;
            } else if c == '/' && self.peek_char(1) == Some('/') {
                self.skip_line();
            } else if c == '/' && self.peek_char(1) == Some('*') {
                let (line, column) = (self.line, self.column());
                self.pos += 2;
                loop {
                    match self.peek_char(0) {
                        None => {
                            return Err(ParseError::new("unterminated comment", line, column).into())
                        }
                        Some('*') if self.peek_char(1) == Some('/') => {
                            self.pos += 2;
                            break;
                        }
                        Some(c) if is_line_terminator(c) => {
                            self.eat_newline();
                            newline = true;
                        }
                        Some(_) => self.pos += 1,
                    }
                }
            } else if c == '<' && self.starts_with("<!--") {
                self.skip_line();
            } else if c == '-' && (newline || at_line_start) && self.starts_with("-->") {
                self.skip_line();
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek_char(0) {
            if is_line_terminator(c) {
                break;
            }
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_char(i) == Some(c))
    }

    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let line = self.line;
        let column = self.column();
        let kind = match self.peek_char(0) {
            None => TokenKind::Eof,
            Some(c) if is_id_start(c) => self.scan_name(),
            Some('\\') => return Err(self.unsupported("unicode escape in identifier")),
            Some(c) if c.is_ascii_digit() => self.scan_number()?,
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number()?
            }
            Some(q @ ('"' | '\'')) => self.scan_string(q)?,
            Some('`') => {
                self.pos += 1;
                self.scan_template(true)?
            }
            Some(_) => self.scan_punct()?,
        };
        Ok(Token {
            kind,
            start,
            line,
            column,
            newline_before,
        })
    }

    fn scan_name(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek_char(0).is_some_and(is_id_part) {
            self.pos += 1;
        }
        TokenKind::Name(self.chars[start..self.pos].iter().collect())
    }

    fn scan_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        let radix_prefix = self.peek_char(0) == Some('0')
            && matches!(
                self.peek_char(1),
                Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')
            );
        if radix_prefix {
            let radix = match self.peek_char(1) {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                _ => 2,
            };
            self.pos += 2;
            let digits_start = self.pos;
            while self
                .peek_char(0)
                .is_some_and(|c| c.is_digit(radix) || c == '_')
            {
                self.pos += 1;
            }
            if self.pos == digits_start {
                return Err(self.parse_error("missing digits after radix prefix"));
            }
            if self.peek_char(0) == Some('n') {
                self.pos += 1;
            }
        } else {
            self.eat_digits();
            let mut legacy_octal = false;
            if self.chars[start] == '0' && self.pos - start > 1 {
                legacy_octal = true;
            }
            if !legacy_octal && self.peek_char(0) == Some('n') {
                self.pos += 1;
            } else {
                if !legacy_octal && self.peek_char(0) == Some('.') {
                    self.pos += 1;
                    self.eat_digits();
                }
                if matches!(self.peek_char(0), Some('e' | 'E')) {
                    let save = self.pos;
                    self.pos += 1;
                    if matches!(self.peek_char(0), Some('+' | '-')) {
                        self.pos += 1;
                    }
                    if self.peek_char(0).is_some_and(|c| c.is_ascii_digit()) {
                        self.eat_digits();
                    } else {
                        self.pos = save;
                        return Err(self.parse_error("missing exponent digits"));
                    }
                }
            }
        }
        if self.peek_char(0).is_some_and(is_id_start) {
            return Err(self.parse_error("identifier starts immediately after numeric literal"));
        }
        Ok(TokenKind::Num(self.chars[start..self.pos].iter().collect()))
    }

    fn eat_digits(&mut self) {
        while self
            .peek_char(0)
            .is_some_and(|c| c.is_ascii_digit() || c == '_')
        {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut pending_high: Option<u32> = None;
        loop {
            let Some(c) = self.peek_char(0) else {
                return Err(self.parse_error("unterminated string literal"));
            };
            if c == quote {
                self.pos += 1;
                break;
            }
            if c == '\n' || c == '\r' {
                return Err(self.parse_error("unterminated string literal"));
            }
            if c != '\\' {
                if pending_high.take().is_some() {
                    return Err(self.unsupported("lone surrogate in string literal"));
                }
                value.push(c);
                self.pos += 1;
                continue;
            }
            self.pos += 1;
            let Some(e) = self.peek_char(0) else {
                return Err(self.parse_error("unterminated string literal"));
            };
            if is_line_terminator(e) {
                self.eat_newline();
                continue;
            }
            self.pos += 1;
            let code = match e {
                'n' => '\n' as u32,
                't' => '\t' as u32,
                'r' => '\r' as u32,
                'b' => 0x08,
                'f' => 0x0c,
                'v' => 0x0b,
                '0'..='7' => {
                    let mut n = e.to_digit(8).unwrap_or(0);
                    let max_len = if e <= '3' { 3 } else { 2 };
                    let mut len = 1;
                    while len < max_len {
                        match self.peek_char(0).and_then(|c| c.to_digit(8)) {
                            Some(d) => {
                                n = n * 8 + d;
                                self.pos += 1;
                                len += 1;
                            }
                            None => break,
                        }
                    }
                    n
                }
                'x' => self.read_hex(2)?,
                'u' => {
                    if self.peek_char(0) == Some('{') {
                        self.pos += 1;
                        let mut n: u32 = 0;
                        let mut digits = 0;
                        while let Some(d) = self.peek_char(0).and_then(|c| c.to_digit(16)) {
                            n = n.saturating_mul(16).saturating_add(d);
                            self.pos += 1;
                            digits += 1;
                        }
                        if digits == 0 || self.peek_char(0) != Some('}') || n > 0x10ffff {
                            return Err(self.parse_error("invalid unicode escape"));
                        }
                        self.pos += 1;
                        n
                    } else {
                        self.read_hex(4)?
                    }
                }
                other => other as u32,
            };
            match (pending_high.take(), code) {
                (Some(high), 0xdc00..=0xdfff) => {
                    let combined = 0x10000 + ((high - 0xd800) << 10) + (code - 0xdc00);
                    value.push(char::from_u32(combined).unwrap_or('\u{fffd}'));
                }
                (Some(_), _) => return Err(self.unsupported("lone surrogate in string literal")),
                (None, 0xd800..=0xdbff) => pending_high = Some(code),
                (None, 0xdc00..=0xdfff) => {
                    return Err(self.unsupported("lone surrogate in string literal"))
                }
                (None, code) => match char::from_u32(code) {
                    Some(ch) => value.push(ch),
                    None => return Err(self.parse_error("invalid escape sequence")),
                },
            }
        }
        if pending_high.is_some() {
            return Err(self.unsupported("lone surrogate in string literal"));
        }
        Ok(TokenKind::Str {
            value,
            raw: self.chars[start..self.pos].iter().collect(),
        })
    }

    fn read_hex(&mut self, len: usize) -> Result<u32, SyntaxError> {
        let mut n = 0;
        for _ in 0..len {
            match self.peek_char(0).and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    n = n * 16 + d;
                    self.pos += 1;
                }
                None => return Err(self.parse_error("invalid hexadecimal escape")),
            }
        }
        Ok(n)
    }

    /// Scans template characters up to and including '`' or `${`.
    fn scan_template(&mut self, head: bool) -> Result<TokenKind, SyntaxError> {
        let mut raw = String::new();
        loop {
            match self.peek_char(0) {
                None => return Err(self.parse_error("unterminated template literal")),
                Some('`') => {
                    self.pos += 1;
                    return Ok(TokenKind::Template {
                        raw,
                        head,
                        tail: true,
                    });
                }
                Some('$') if self.peek_char(1) == Some('{') => {
                    self.pos += 2;
                    return Ok(TokenKind::Template {
                        raw,
                        head,
                        tail: false,
                    });
                }
                Some('\\') => {
                    raw.push('\\');
                    self.pos += 1;
                    match self.peek_char(0) {
                        None => return Err(self.parse_error("unterminated template literal")),
                        Some(c) if is_line_terminator(c) => {
                            raw.push(c);
                            if c == '\r' && self.peek_char(1) == Some('\n') {
                                raw.push('\n');
                            }
                            self.eat_newline();
                        }
                        Some(c) => {
                            raw.push(c);
                            self.pos += 1;
                        }
                    }
                }
                Some(c) if is_line_terminator(c) => {
                    raw.push(c);
                    if c == '\r' && self.peek_char(1) == Some('\n') {
                        raw.push('\n');
                    }
                    self.eat_newline();
                }
                Some(c) => {
                    raw.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn scan_punct(&mut self) -> Result<TokenKind, SyntaxError> {
        for p in PUNCTUATORS {
            if self.starts_with(p) {
                // `a?.5:b` is a conditional, not optional chaining
                if *p == "?." && self.peek_char(2).is_some_and(|c| c.is_ascii_digit()) {
                    continue;
                }
                self.pos += p.chars().count();
                return Ok(TokenKind::Punct(p));
            }
        }
        let c = self.peek_char(0).unwrap_or(' ');
        Err(self.parse_error(format!("unexpected character '{c}'")))
    }

    fn reset_to(&mut self, tok: &Token) {
        self.pos = tok.start;
        self.line = tok.line;
        self.line_start = tok.start + 1 - tok.column;
    }

    /// Re-reads a `/` or `/=` token as a regular expression literal.
    pub fn rescan_regex(&mut self, tok: &Token) -> Result<Token, SyntaxError> {
        self.reset_to(tok);
        self.pos += 1;
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.peek_char(0) {
                None => return Err(self.parse_error("unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.parse_error("unterminated regular expression"))
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    pattern.push('\\');
                    self.pos += 1;
                    match self.peek_char(0) {
                        Some(c) if !is_line_terminator(c) => {
                            pattern.push(c);
                            self.pos += 1;
                        }
                        _ => return Err(self.parse_error("unterminated regular expression")),
                    }
                }
                Some(c) => {
                    if c == '[' {
                        in_class = true;
                    } else if c == ']' {
                        in_class = false;
                    }
                    pattern.push(c);
                    self.pos += 1;
                }
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek_char(0).filter(|c| is_id_part(*c)) {
            flags.push(c);
            self.pos += 1;
        }
        Ok(Token {
            kind: TokenKind::Regex { pattern, flags },
            start: tok.start,
            line: tok.line,
            column: tok.column,
            newline_before: tok.newline_before,
        })
    }

    /// Re-reads a `}` token that closes a template substitution.
    pub fn rescan_template(&mut self, tok: &Token) -> Result<Token, SyntaxError> {
        self.reset_to(tok);
        self.pos += 1;
        let kind = self.scan_template(false)?;
        Ok(Token {
            kind,
            start: tok.start,
            line: tok.line,
            column: tok.column,
            newline_before: tok.newline_before,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn test_punctuators_take_longest_match() {
        assert_eq!(
            kinds("a>>>=b"),
            vec![
                TokenKind::Name("a".into()),
                TokenKind::Punct(">>>="),
                TokenKind::Name("b".into())
            ]
        );
        assert_eq!(kinds("x?.5:1")[1], TokenKind::Punct("?"));
    }

    #[test]
    fn test_string_escapes_are_cooked() {
        let toks = kinds(r#"'a\n\x41B\u{1F600}\101'"#);
        match &toks[0] {
            TokenKind::Str { value, .. } => assert_eq!(value, "a\nAB\u{1F600}A"),
            other => panic!("unexpected token {other:?}"),
        }
        let toks = kinds(r#""😀""#);
        assert_eq!(
            toks[0],
            TokenKind::Str {
                value: "\u{1F600}".into(),
                raw: r#""😀""#.into()
            }
        );
    }

    #[test]
    fn test_lone_surrogate_is_unsupported() {
        let err = Lexer::new(r#"'\uD800'"#).next_token().unwrap_err();
        assert!(matches!(err, SyntaxError::Unsupported(_)));
    }

    #[test]
    fn test_newline_and_comments() {
        let mut lexer = Lexer::new("a /* x\n */ b // c\n c");
        assert!(!lexer.next_token().unwrap().newline_before);
        let b = lexer.next_token().unwrap();
        assert!(b.newline_before);
        assert_eq!(b.line, 2);
        let c = lexer.next_token().unwrap();
        assert!(c.newline_before);
        assert_eq!((c.line, c.column), (3, 2));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0x1F 1.5e3 .5 10n 0755"),
            vec![
                TokenKind::Num("0x1F".into()),
                TokenKind::Num("1.5e3".into()),
                TokenKind::Num(".5".into()),
                TokenKind::Num("10n".into()),
                TokenKind::Num("0755".into()),
            ]
        );
        assert!(Lexer::new("3in").next_token().is_err());
    }

    #[test]
    fn test_regex_rescan() {
        let mut lexer = Lexer::new("/a[/]b/gi.x");
        let slash = lexer.next_token().unwrap();
        assert!(slash.is_punct("/"));
        let re = lexer.rescan_regex(&slash).unwrap();
        assert_eq!(
            re.kind,
            TokenKind::Regex {
                pattern: "a[/]b".into(),
                flags: "gi".into()
            }
        );
        assert!(lexer.next_token().unwrap().is_punct("."));
    }

    #[test]
    fn test_unterminated_string_reports_position() {
        let err = Lexer::new("\n  'abc").next_token().unwrap_err();
        match err {
            SyntaxError::Parse(e) => assert_eq!(e.line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
