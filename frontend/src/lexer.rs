use std::collections::HashMap;
use std::fmt;

use crate::token::{Location, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    UnterminatedStringLiteral,
    UnterminatedCharLiteral,
    MalformedFloatLiteral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: Location,
}

impl LexError {
    fn new(kind: LexErrorKind, location: Location) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match &self.kind {
            LexErrorKind::UnexpectedCharacter(c) => {
                format!("Unexpected character '{}'", c)
            }
            LexErrorKind::UnterminatedStringLiteral => "Unterminated string literal.".to_string(),
            LexErrorKind::UnterminatedCharLiteral => "Unterminated char literal.".to_string(),
            LexErrorKind::MalformedFloatLiteral => {
                "Float literal is expected to have at least one decimal.".to_string()
            }
        };
        write!(f, "{}: LEX_ERROR: {}", self.location, message)
    }
}

impl std::error::Error for LexError {}

/// Single-pass scanner over the raw source bytes. Escape sequences inside
/// string and char literals are left undecoded; the quotes are kept in the
/// lexeme and decoding happens in the code generator.
pub struct Lexer {
    source: Vec<u8>,
    current_location: Location,
    source_pointer: usize,
    keyword_table: HashMap<&'static str, TokenKind>,
}

fn keyword_table() -> HashMap<&'static str, TokenKind> {
    HashMap::from([
        ("true", TokenKind::TrueKeyword),
        ("false", TokenKind::FalseKeyword),
        ("var", TokenKind::VarKeyword),
        ("if", TokenKind::IfKeyword),
        ("else", TokenKind::ElseKeyword),
        ("while", TokenKind::WhileKeyword),
        ("break", TokenKind::BreakKeyword),
        ("continue", TokenKind::ContinueKeyword),
        ("return", TokenKind::ReturnKeyword),
        ("fn", TokenKind::FnKeyword),
        ("int", TokenKind::IntKeyword),
        ("float", TokenKind::FloatKeyword),
        ("bool", TokenKind::BoolKeyword),
        ("string", TokenKind::StringKeyword),
        ("char", TokenKind::CharKeyword),
        ("void", TokenKind::VoidKeyword),
    ])
}

fn is_name_character(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl Lexer {
    pub fn new(source: &str, file_name: &str) -> Self {
        Self {
            source: source.as_bytes().to_vec(),
            current_location: Location::start_of(file_name),
            source_pointer: 0,
            keyword_table: keyword_table(),
        }
    }

    fn current_char(&self) -> u8 {
        if self.source_pointer >= self.source.len() {
            return 0;
        }
        self.source[self.source_pointer]
    }

    fn advance_char(&mut self) {
        if self.current_char() == b'\n' {
            self.current_location.advance_line();
        } else {
            self.current_location.advance_col();
        }
        self.source_pointer += 1;
    }

    fn lexeme(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }

    /// A single-character token; the second character of `two` upgrades it.
    fn one_or_two(
        &mut self,
        second: u8,
        one: TokenKind,
        two: TokenKind,
    ) -> Token {
        let location = self.current_location.clone();
        self.advance_char();
        if self.current_char() == second {
            self.advance_char();
            Token::new(two, two.fixed_lexeme().unwrap(), location)
        } else {
            Token::new(one, one.fixed_lexeme().unwrap(), location)
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let token = Token::new(kind, kind.fixed_lexeme().unwrap(), self.current_location.clone());
        self.advance_char();
        token
    }

    fn quoted_literal(
        &mut self,
        delimiter: u8,
        kind: TokenKind,
        error: LexErrorKind,
    ) -> Result<Token, LexError> {
        let start_location = self.current_location.clone();
        let start_pointer = self.source_pointer;
        let mut escaped = false;
        self.advance_char();
        while (self.current_char() != delimiter || escaped)
            && self.current_char() != 0
            && self.current_char() != b'\n'
        {
            escaped = !escaped && self.current_char() == b'\\';
            self.advance_char();
        }

        if self.current_char() != delimiter {
            return Err(LexError::new(error, start_location));
        }

        self.advance_char();
        let end_pointer = self.source_pointer;
        Ok(Token::new(
            kind,
            self.lexeme(start_pointer, end_pointer),
            start_location,
        ))
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        while self.current_char().is_ascii_whitespace() {
            self.advance_char();
        }

        match self.current_char() {
            b'+' => Ok(self.single(TokenKind::Plus)),
            b'-' => Ok(self.single(TokenKind::Minus)),
            b'*' => Ok(self.single(TokenKind::Star)),
            b'/' => Ok(self.single(TokenKind::Slash)),
            b'~' => Ok(self.single(TokenKind::Tilde)),
            b'%' => Ok(self.single(TokenKind::Percent)),
            b'^' => Ok(self.single(TokenKind::Hat)),
            b',' => Ok(self.single(TokenKind::Comma)),
            b';' => Ok(self.single(TokenKind::SemiColon)),
            b':' => Ok(self.single(TokenKind::Colon)),
            b'.' => Ok(self.single(TokenKind::Dot)),
            b'(' => Ok(self.single(TokenKind::OpenParenthesis)),
            b')' => Ok(self.single(TokenKind::CloseParenthesis)),
            b'{' => Ok(self.single(TokenKind::OpenCurlyBrace)),
            b'}' => Ok(self.single(TokenKind::CloseCurlyBrace)),
            b'[' => Ok(self.single(TokenKind::OpenSquareBracket)),
            b']' => Ok(self.single(TokenKind::CloseSquareBracket)),

            b'!' => Ok(self.one_or_two(b'=', TokenKind::Bang, TokenKind::BangEqual)),
            b'=' => Ok(self.one_or_two(b'=', TokenKind::Equal, TokenKind::EqualEqual)),
            b'&' => Ok(self.one_or_two(b'&', TokenKind::And, TokenKind::AndAnd)),
            b'|' => Ok(self.one_or_two(b'|', TokenKind::Pipe, TokenKind::PipePipe)),

            b'<' => {
                let location = self.current_location.clone();
                self.advance_char();
                match self.current_char() {
                    b'<' => {
                        self.advance_char();
                        Ok(Token::new(TokenKind::LessLess, "<<", location))
                    }
                    b'=' => {
                        self.advance_char();
                        Ok(Token::new(TokenKind::LessEqual, "<=", location))
                    }
                    _ => Ok(Token::new(TokenKind::Less, "<", location)),
                }
            }

            b'>' => {
                let location = self.current_location.clone();
                self.advance_char();
                match self.current_char() {
                    b'>' => {
                        self.advance_char();
                        Ok(Token::new(TokenKind::GreaterGreater, ">>", location))
                    }
                    b'=' => {
                        self.advance_char();
                        Ok(Token::new(TokenKind::GreaterEqual, ">=", location))
                    }
                    _ => Ok(Token::new(TokenKind::Greater, ">", location)),
                }
            }

            b'"' => self.quoted_literal(
                b'"',
                TokenKind::StringLiteral,
                LexErrorKind::UnterminatedStringLiteral,
            ),
            b'\'' => self.quoted_literal(
                b'\'',
                TokenKind::CharLiteral,
                LexErrorKind::UnterminatedCharLiteral,
            ),

            0 => Ok(Token::new(
                TokenKind::EndOfFile,
                "",
                self.current_location.clone(),
            )),

            c if c.is_ascii_digit() => {
                let start_pointer = self.source_pointer;
                let start_location = self.current_location.clone();

                while self.current_char().is_ascii_digit() {
                    self.advance_char();
                }

                if self.current_char() == b'.' {
                    self.advance_char();
                    let mut decimal_count = 0usize;
                    while self.current_char().is_ascii_digit() {
                        self.advance_char();
                        decimal_count += 1;
                    }

                    if decimal_count == 0 {
                        return Err(LexError::new(
                            LexErrorKind::MalformedFloatLiteral,
                            start_location,
                        ));
                    }

                    let end_pointer = self.source_pointer;
                    Ok(Token::new(
                        TokenKind::FloatLiteral,
                        self.lexeme(start_pointer, end_pointer),
                        start_location,
                    ))
                } else {
                    let end_pointer = self.source_pointer;
                    Ok(Token::new(
                        TokenKind::IntLiteral,
                        self.lexeme(start_pointer, end_pointer),
                        start_location,
                    ))
                }
            }

            c if is_name_character(c) => {
                let start_pointer = self.source_pointer;
                let start_location = self.current_location.clone();

                while is_name_character(self.current_char()) {
                    self.advance_char();
                }

                let name = self.lexeme(start_pointer, self.source_pointer);
                match self.keyword_table.get(name.as_str()) {
                    Some(&kind) => Ok(Token::new(kind, name, start_location)),
                    None => Ok(Token::new(TokenKind::Name, name, start_location)),
                }
            }

            c => Err(LexError::new(
                LexErrorKind::UnexpectedCharacter(c as char),
                self.current_location.clone(),
            )),
        }
    }

    /// Tokenizes the whole source. The returned sequence always ends with a
    /// single END_OF_FILE token.
    pub fn collect_tokens(mut self) -> Result<Vec<Token>, LexError> {
        let mut token_vector = Vec::new();
        loop {
            let next = self.next_token()?;
            let done = next.kind == TokenKind::EndOfFile;
            token_vector.push(next);
            if done {
                return Ok(token_vector);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source, "test.ni").collect_tokens().expect("lex failure")
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_yields_end_of_file() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfFile]);
    }

    #[test]
    fn two_character_operators_win_over_single() {
        assert_eq!(
            kinds("<< >> <= >= == != && || = < >"),
            vec![
                TokenKind::LessLess,
                TokenKind::GreaterGreater,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::AndAnd,
                TokenKind::PipePipe,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(
            kinds("fn var if else while break continue return true false int float bool string char void"),
            vec![
                TokenKind::FnKeyword,
                TokenKind::VarKeyword,
                TokenKind::IfKeyword,
                TokenKind::ElseKeyword,
                TokenKind::WhileKeyword,
                TokenKind::BreakKeyword,
                TokenKind::ContinueKeyword,
                TokenKind::ReturnKeyword,
                TokenKind::TrueKeyword,
                TokenKind::FalseKeyword,
                TokenKind::IntKeyword,
                TokenKind::FloatKeyword,
                TokenKind::BoolKeyword,
                TokenKind::StringKeyword,
                TokenKind::CharKeyword,
                TokenKind::VoidKeyword,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_a_name() {
        let tokens = tokenize("iffy variable fnord");
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "iffy");
        assert_eq!(tokens[1].kind, TokenKind::Name);
        assert_eq!(tokens[2].kind, TokenKind::Name);
    }

    #[test]
    fn numeric_literals() {
        let tokens = tokenize("0 42 3.25");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].text, "42");
        assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[2].text, "3.25");
    }

    #[test]
    fn float_without_decimals_is_an_error() {
        let err = Lexer::new("12.", "test.ni").collect_tokens().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::MalformedFloatLiteral);
    }

    #[test]
    fn string_literal_keeps_quotes_and_escapes() {
        let tokens = tokenize(r#""hello \"world\"""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, r#""hello \"world\"""#);
    }

    #[test]
    fn char_literal_keeps_quotes() {
        let tokens = tokenize(r"'\n'");
        assert_eq!(tokens[0].kind, TokenKind::CharLiteral);
        assert_eq!(tokens[0].text, r"'\n'");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("\"abc\ndef\"", "test.ni")
            .collect_tokens()
            .unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedStringLiteral);
    }

    #[test]
    fn unterminated_char_is_an_error() {
        let err = Lexer::new("'a", "test.ni").collect_tokens().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedCharLiteral);
    }

    #[test]
    fn unexpected_character_reports_location() {
        let err = Lexer::new("var x = @;", "test.ni").collect_tokens().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('@'));
        assert_eq!(err.location.row, 1);
        assert_eq!(err.location.col, 9);
        assert_eq!(format!("{}", err), "test.ni:1:9: LEX_ERROR: Unexpected character '@'");
    }

    #[test]
    fn locations_advance_across_lines() {
        let tokens = tokenize("a\n  b");
        assert_eq!((tokens[0].location.row, tokens[0].location.col), (1, 1));
        assert_eq!((tokens[1].location.row, tokens[1].location.col), (2, 3));
    }

    #[test]
    fn fixed_lexeme_round_trip() {
        use TokenKind::*;
        let all = [
            Plus, Minus, Star, Slash, Bang, Tilde, Percent, LessLess, GreaterGreater, Less,
            LessEqual, Greater, GreaterEqual, EqualEqual, BangEqual, And, Hat, Pipe, AndAnd,
            PipePipe, Equal, OpenParenthesis, CloseParenthesis, OpenCurlyBrace, CloseCurlyBrace,
            OpenSquareBracket, CloseSquareBracket, Comma, SemiColon, Colon, Dot, TrueKeyword,
            FalseKeyword, VarKeyword, IfKeyword, ElseKeyword, WhileKeyword, BreakKeyword,
            ContinueKeyword, ReturnKeyword, FnKeyword, IntKeyword, FloatKeyword, BoolKeyword,
            StringKeyword, CharKeyword, VoidKeyword,
        ];
        let source = all
            .iter()
            .map(|kind| kind.fixed_lexeme().unwrap())
            .collect::<Vec<_>>()
            .join(" ");
        let tokens = tokenize(&source);
        assert_eq!(tokens.len(), all.len() + 1);
        for (kind, token) in all.iter().zip(tokens.iter()) {
            assert_eq!(*kind, token.kind);
            assert_eq!(kind.fixed_lexeme().unwrap(), token.text);
        }
    }
}
