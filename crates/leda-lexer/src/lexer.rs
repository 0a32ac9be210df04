//! Scans Leda source text into a stream of [`Token`]s.
//!
//! Pull-based: callers repeatedly call [`Lexer::read_token`]; once the text
//! is exhausted every further call returns `Eof` at the final position and
//! [`Lexer::reached_end`] becomes `true`. The token stream is total and
//! ends in exactly one `Eof`.

use crate::token::{Keyword, Punct, Token, TokenKind};
use leda_common::{DiagnosticKind, RawDiagnostic, Span};

pub struct Lexer<'a> {
    source: &'a str,
    /// Byte index of the next unconsumed character.
    index: usize,
    /// Byte index of the character consumed just before `index`; used as
    /// the range end for length-1 errors raised after advancing once.
    prev_char_end: usize,
    reached_end: bool,
    diagnostics: Vec<RawDiagnostic>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source, index: 0, prev_char_end: 0, reached_end: false, diagnostics: Vec::new() }
    }

    #[must_use]
    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn take_diagnostics(&mut self) -> Vec<RawDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_at(&self, skip: usize) -> Option<char> {
        self.source[self.index..].chars().nth(skip)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.prev_char_end = self.index;
        self.index += ch.len_utf8();
        Some(ch)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn push_error(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(RawDiagnostic::error(span, kind, message));
    }

    fn push_warning(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(RawDiagnostic::warning(span, kind, message));
    }

    /// Produces the next token, or `Eof` once the source is exhausted.
    pub fn read_token(&mut self) -> Token {
        self.skip_trivia();
        let start = self.index;
        let Some(ch) = self.peek() else {
            self.reached_end = true;
            return Token::new(TokenKind::Eof, Span::at(start as u32));
        };

        if ch == '_' || ch.is_alphabetic() {
            return self.read_name(start);
        }
        if ch.is_ascii_digit() {
            return self.read_number(start);
        }
        if ch == '"' || ch == '\'' {
            return self.read_quoted_string(start, ch);
        }
        if ch == '[' {
            if let Some(level) = self.peek_long_bracket_level(0) {
                return self.read_long_string(start, level);
            }
            if let Some(equals_run) = self.malformed_long_bracket_equals_run() {
                self.push_error(
                    Span::new(start as u32, start as u32 + 1 + equals_run as u32),
                    DiagnosticKind::InvalidLongStringDelimiter,
                    "malformed long string delimiter",
                );
            }
        }
        self.read_punct(start)
    }

    /// If `[` is followed by one or more `=` that isn't in turn followed by
    /// `[`, this names the malformed-opener case: e.g. `[=x` is not a valid
    /// long-bracket opener, so it's treated as two ordinary tokens plus an
    /// `InvalidLongStringDelimiter` diagnostic. Returns the length of the
    /// `=` run.
    /// Does not consume anything; the `[` and each `=` are still re-lexed
    /// as ordinary punctuation by the caller.
    fn malformed_long_bracket_equals_run(&self) -> Option<usize> {
        let mut chars = self.source[self.index..].chars().skip(1);
        let mut run = 0usize;
        loop {
            match chars.next() {
                Some('=') => run += 1,
                Some('[') => return None,
                _ => break,
            }
        }
        (run > 0).then_some(run)
    }

    /// Skips whitespace and comments; does not produce tokens for them.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    self.advance();
                    self.advance();
                    self.skip_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('[') {
            if let Some(level) = self.peek_long_bracket_level(0) {
                let start = self.index;
                self.consume_long_bracket_open(level);
                if !self.consume_until_long_bracket_close(level) {
                    self.push_error(
                        Span::new(start as u32, self.index as u32),
                        DiagnosticKind::UnfinishedLongComment,
                        "unfinished long comment",
                    );
                }
                return;
            }
        }
        // Single-line comment: runs to the next newline.
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// If the text at `self.index + skip` opens a long bracket (`[`,
    /// optional `=`s, `[`), returns its level. Does not consume anything.
    fn peek_long_bracket_level(&self, skip: usize) -> Option<u32> {
        let rest = &self.source[self.index..];
        let mut chars = rest.chars().skip(skip);
        if chars.next() != Some('[') {
            return None;
        }
        let mut level = 0u32;
        let mut iter = chars;
        loop {
            match iter.next() {
                Some('=') => level += 1,
                Some('[') => return Some(level),
                _ => return None,
            }
        }
    }

    fn consume_long_bracket_open(&mut self, level: u32) {
        self.advance(); // '['
        for _ in 0..level {
            self.advance(); // '='
        }
        self.advance(); // '['
        // A newline immediately after the opening bracket is skipped, but
        // only the first one (common Lua convention for long strings).
        if self.peek() == Some('\r') {
            self.advance();
        }
        if self.peek() == Some('\n') {
            self.advance();
        }
    }

    /// Consumes raw characters until the matching `]=*]` closer. Returns
    /// `false` (without consuming anything further) if end-of-file is hit
    /// first.
    fn consume_until_long_bracket_close(&mut self, level: u32) -> bool {
        loop {
            match self.peek() {
                None => return false,
                Some(']') => {
                    let save = self.index;
                    self.advance();
                    let mut seen = 0u32;
                    while self.peek() == Some('=') {
                        self.advance();
                        seen += 1;
                    }
                    if seen == level && self.peek() == Some(']') {
                        self.advance();
                        return true;
                    }
                    self.index = save;
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn read_long_string(&mut self, start: usize, level: u32) -> Token {
        self.consume_long_bracket_open(level);
        let content_start = self.index;
        let closed = self.consume_until_long_bracket_close(level);
        let content_end = if closed {
            // Strip the trailing `]=*]`.
            self.index - (level as usize) - 2
        } else {
            self.index
        };
        if !closed {
            self.push_error(
                Span::new(start as u32, self.index as u32),
                DiagnosticKind::UnfinishedLongString,
                "unfinished long string",
            );
        }
        let raw = &self.source[content_start..content_end.max(content_start)];
        let value = normalize_newlines(raw);
        Token::new(TokenKind::LongStr { value, level }, Span::new(start as u32, self.index as u32))
    }

    fn read_name(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.index];
        let span = Span::new(start as u32, self.index as u32);
        match Keyword::lookup(text) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), span),
            None => Token::new(TokenKind::Name(text.to_string()), span),
        }
    }

    fn read_number(&mut self, start: usize) -> Token {
        let is_hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X'));
        if is_hex {
            self.advance();
            self.advance();
            return self.read_hex_number(start);
        }
        self.read_decimal_number(start)
    }

    fn read_decimal_number(&mut self, start: usize) -> Token {
        let mut malformed = false;
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    self.advance();
                }
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.advance();
                }
                '.' => {
                    malformed = true;
                    self.advance();
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    self.advance();
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.advance();
                    }
                    if !matches!(self.peek(), Some('0'..='9')) {
                        malformed = true;
                    }
                }
                'e' | 'E' => {
                    malformed = true;
                    self.advance();
                }
                c if c.is_alphabetic() => {
                    malformed = true;
                    self.advance();
                }
                _ => break,
            }
        }
        let lexeme = self.source[start..self.index].to_string();
        let span = Span::new(start as u32, self.index as u32);
        let value = if malformed { f64::NAN } else { lexeme.parse().unwrap_or(f64::NAN) };
        if malformed {
            self.push_error(span, DiagnosticKind::MalformedNumber, "malformed number");
        }
        Token::new(TokenKind::Number { lexeme, value }, span)
    }

    fn read_hex_number(&mut self, start: usize) -> Token {
        let mantissa_start = self.index;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.advance();
        }
        let mantissa_end = self.index;
        let mut has_frac_or_exp = false;
        if self.peek() == Some('.') {
            has_frac_or_exp = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('p') | Some('P')) {
            has_frac_or_exp = true;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let malformed = mantissa_end == mantissa_start;
        let lexeme = self.source[start..self.index].to_string();
        let span = Span::new(start as u32, self.index as u32);
        if malformed {
            self.push_error(span, DiagnosticKind::MalformedNumber, "malformed number");
            return Token::new(TokenKind::Number { lexeme, value: f64::NAN }, span);
        }
        if has_frac_or_exp {
            self.push_warning(span, DiagnosticKind::HexNumbersNotSupported, "hex floats are not supported");
            return Token::new(TokenKind::Number { lexeme, value: f64::NAN }, span);
        }
        let digits = &self.source[mantissa_start..mantissa_end];
        let value = u64::from_str_radix(digits, 16).map(|v| v as f64).unwrap_or(f64::NAN);
        Token::new(TokenKind::Number { lexeme, value }, span)
    }

    fn read_quoted_string(&mut self, start: usize, quote: char) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    self.push_error(
                        Span::new(start as u32, self.index as u32),
                        DiagnosticKind::UnfinishedString,
                        "unfinished string",
                    );
                    break;
                }
                Some('\n') => {
                    self.push_error(
                        Span::new(start as u32, self.index as u32),
                        DiagnosticKind::UnfinishedString,
                        "unfinished string",
                    );
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    self.read_escape(start, &mut value);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        let span = Span::new(start as u32, self.index as u32);
        Token::new(TokenKind::Str(value), span)
    }

    fn read_escape(&mut self, string_start: usize, value: &mut String) {
        let Some(c) = self.peek() else {
            self.push_error(
                Span::new(string_start as u32, self.index as u32),
                DiagnosticKind::UnfinishedString,
                "unfinished string",
            );
            return;
        };
        match c {
            'a' => {
                value.push('\u{7}');
                self.advance();
            }
            'b' => {
                value.push('\u{8}');
                self.advance();
            }
            'f' => {
                value.push('\u{C}');
                self.advance();
            }
            'n' => {
                value.push('\n');
                self.advance();
            }
            'r' => {
                value.push('\r');
                self.advance();
            }
            't' => {
                value.push('\t');
                self.advance();
            }
            'v' => {
                value.push('\u{B}');
                self.advance();
            }
            '\\' => {
                value.push('\\');
                self.advance();
            }
            '"' => {
                value.push('"');
                self.advance();
            }
            '\'' => {
                value.push('\'');
                self.advance();
            }
            '\r' => {
                self.advance();
                self.bump_if('\n');
                value.push('\n');
            }
            '\n' => {
                value.push('\n');
                self.advance();
            }
            '0'..='9' => {
                let mut digits = String::new();
                for _ in 0..3 {
                    match self.peek() {
                        Some(d) if d.is_ascii_digit() => {
                            digits.push(d);
                            self.advance();
                        }
                        _ => break,
                    }
                }
                let code: u32 = digits.parse().unwrap_or(0);
                value.push(char::from_u32(code.min(255)).unwrap_or('\0'));
            }
            other => {
                self.push_error(
                    Span::new(self.prev_char_end as u32, self.index as u32 + other.len_utf8() as u32),
                    DiagnosticKind::InvalidEscapeSequence,
                    format!("invalid escape sequence '\\{other}'"),
                );
                value.push(other);
                self.advance();
            }
        }
    }

    fn read_punct(&mut self, start: usize) -> Token {
        let first = self.advance().expect("checked by caller");
        // `~` has no meaning on its own; the only punctuation it can start
        // is `~=`, so it's handled ahead of the single/extend table those
        // share a uniform shape for.
        if first == '~' {
            if self.bump_if('=') {
                return Token::new(TokenKind::Punct(Punct::NotEq), Span::new(start as u32, self.index as u32));
            }
            self.push_error(Span::new(start as u32, self.index as u32), DiagnosticKind::InvalidCharacter, "invalid character '~'");
            return Token::new(TokenKind::Invalid('~'), Span::new(start as u32, self.index as u32));
        }
        let Some(mut punct) = Punct::single(first) else {
            self.push_error(
                Span::new(start as u32, self.index as u32),
                DiagnosticKind::InvalidCharacter,
                format!("invalid character '{first}'"),
            );
            return Token::new(TokenKind::Invalid(first), Span::new(start as u32, self.index as u32));
        };
        while let Some(next) = self.peek() {
            match Punct::extend(punct, next) {
                Some(extended) => {
                    punct = extended;
                    self.advance();
                }
                None => break,
            }
        }
        Token::new(TokenKind::Punct(punct), Span::new(start as u32, self.index as u32))
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.read_token();
            let is_eof = tok.is_eof();
            out.push(tok.kind);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn every_input_ends_in_exactly_one_eof() {
        for src in ["", "local x = 1", "--[[ unfinished", "'oops"] {
            let toks = tokens(src);
            assert_eq!(toks.iter().filter(|t| matches!(t, TokenKind::Eof)).count(), 1);
            assert!(matches!(toks.last(), Some(TokenKind::Eof)));
        }
    }

    #[test]
    fn identifier_lexeme_round_trips() {
        let mut lexer = Lexer::new("foo_1");
        let tok = lexer.read_token();
        assert_eq!(tok.kind.text(), "foo_1");
    }

    #[test]
    fn hex_literal_lexeme_and_value() {
        let mut lexer = Lexer::new("0x1F");
        let tok = lexer.read_token();
        assert_eq!(tok.kind.text(), "0x1F");
        match tok.kind {
            TokenKind::Number { value, .. } => assert_eq!(value, 31.0),
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn hex_float_is_a_warning_with_nan_value() {
        let mut lexer = Lexer::new("0x1.8p0");
        let tok = lexer.read_token();
        match tok.kind {
            TokenKind::Number { value, .. } => assert!(value.is_nan()),
            other => panic!("expected number, got {other:?}"),
        }
        let diags = lexer.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::HexNumbersNotSupported);
        assert_eq!(diags[0].severity, leda_common::DiagnosticSeverity::Warning);
    }

    #[test]
    fn malformed_decimal_number_is_an_error_with_nan_value() {
        let mut lexer = Lexer::new("1.2.3");
        let tok = lexer.read_token();
        match tok.kind {
            TokenKind::Number { value, .. } => assert!(value.is_nan()),
            other => panic!("expected number, got {other:?}"),
        }
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::MalformedNumber);
    }

    #[test]
    fn single_line_string_decodes_escapes() {
        let mut lexer = Lexer::new(r#""a\nb\065c""#);
        let tok = lexer.read_token();
        assert_eq!(tok.kind, TokenKind::Str("a\nbAc".to_string()));
    }

    #[test]
    fn unterminated_string_emits_diagnostic() {
        let mut lexer = Lexer::new("\"abc\ndef\"");
        let _ = lexer.read_token();
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::UnfinishedString);
    }

    #[test]
    fn invalid_escape_sequence_keeps_the_literal_character() {
        let mut lexer = Lexer::new(r#""a\qb""#);
        let tok = lexer.read_token();
        assert_eq!(tok.kind, TokenKind::Str("aqb".to_string()));
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidEscapeSequence);
    }

    #[test]
    fn long_string_level_and_crlf_normalization() {
        let mut lexer = Lexer::new("[==[a\r\nb]==]");
        let tok = lexer.read_token();
        assert_eq!(tok.kind, TokenKind::LongStr { value: "a\nb".to_string(), level: 2 });
    }

    #[test]
    fn unfinished_long_string_emits_diagnostic_and_consumes_to_eof() {
        let mut lexer = Lexer::new("[[abc");
        let tok = lexer.read_token();
        assert!(matches!(tok.kind, TokenKind::LongStr { .. }));
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::UnfinishedLongString);
        assert!(lexer.reached_end());
    }

    #[test]
    fn long_comment_is_skipped_entirely() {
        let toks = tokens("--[[ a comment\nspanning lines ]] local");
        assert_eq!(toks, vec![TokenKind::Keyword(Keyword::Local), TokenKind::Eof]);
    }

    #[test]
    fn unfinished_long_comment_emits_diagnostic() {
        let mut lexer = Lexer::new("--[[ never closes");
        let tok = lexer.read_token();
        assert!(tok.is_eof());
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::UnfinishedLongComment);
    }

    #[test]
    fn single_line_comment_stops_at_newline() {
        let toks = tokens("-- hello\nlocal");
        assert_eq!(toks, vec![TokenKind::Keyword(Keyword::Local), TokenKind::Eof]);
    }

    #[test]
    fn keyword_lookup_takes_priority_over_name() {
        let toks = tokens("while");
        assert_eq!(toks, vec![TokenKind::Keyword(Keyword::While), TokenKind::Eof]);
    }

    #[test]
    fn punctuation_maximal_munch() {
        let toks = tokens("= == .. ... ~=");
        assert_eq!(
            toks,
            vec![
                TokenKind::Punct(Punct::Eq),
                TokenKind::Punct(Punct::EqEq),
                TokenKind::Punct(Punct::DotDot),
                TokenKind::Punct(Punct::Ellipsis),
                TokenKind::Punct(Punct::NotEq),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn invalid_character_is_reported_and_skipped_as_its_own_token() {
        let mut lexer = Lexer::new("@");
        let tok = lexer.read_token();
        assert_eq!(tok.kind, TokenKind::Invalid('@'));
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidCharacter);
    }

    #[test]
    fn malformed_long_bracket_opener_is_two_tokens_with_diagnostic() {
        // `[=x` is not a valid long-bracket opener: `[` is punctuation and
        // the rest lexes normally, as two separate tokens.
        let mut lexer = Lexer::new("[=x");
        let first = lexer.read_token();
        assert_eq!(first.kind, TokenKind::Punct(Punct::LBracket));
        let diags = lexer.take_diagnostics();
        assert_eq!(diags[0].kind, DiagnosticKind::InvalidLongStringDelimiter);
        let second = lexer.read_token();
        assert_eq!(second.kind, TokenKind::Punct(Punct::Eq));
        let third = lexer.read_token();
        assert_eq!(third.kind, TokenKind::Name("x".to_string()));
    }
}
