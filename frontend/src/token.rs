use std::fmt;
use std::rc::Rc;

/// Source position of a token or AST node. Rows and columns are 1-based;
/// a newline resets the column and advances the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub row: u32,
    pub col: u32,
    pub file: Rc<str>,
}

impl Location {
    pub fn new(row: u32, col: u32, file: Rc<str>) -> Self {
        Self { row, col, file }
    }

    pub fn start_of(file: &str) -> Self {
        Self::new(1, 1, Rc::from(file))
    }

    pub fn advance_line(&mut self) {
        self.col = 1;
        self.row += 1;
    }

    pub fn advance_col(&mut self) {
        self.col += 1;
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,
    Name,

    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Tilde,
    Percent,
    LessLess,
    GreaterGreater,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    And,
    Hat,
    Pipe,
    AndAnd,
    PipePipe,
    Equal,

    OpenParenthesis,
    CloseParenthesis,
    OpenCurlyBrace,
    CloseCurlyBrace,
    OpenSquareBracket,
    CloseSquareBracket,

    Comma,
    SemiColon,
    Colon,
    Dot,

    TrueKeyword,
    FalseKeyword,
    VarKeyword,
    IfKeyword,
    ElseKeyword,
    WhileKeyword,
    BreakKeyword,
    ContinueKeyword,
    ReturnKeyword,
    FnKeyword,
    IntKeyword,
    FloatKeyword,
    BoolKeyword,
    StringKeyword,
    CharKeyword,
    VoidKeyword,

    EndOfFile,
}

impl TokenKind {
    /// The constant spelling of this token kind, for every kind whose lexeme
    /// is fixed (operators, punctuation and keywords). Literals, names and
    /// end-of-file have no fixed lexeme.
    pub fn fixed_lexeme(&self) -> Option<&'static str> {
        use TokenKind::*;
        let text = match self {
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Bang => "!",
            Tilde => "~",
            Percent => "%",
            LessLess => "<<",
            GreaterGreater => ">>",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            EqualEqual => "==",
            BangEqual => "!=",
            And => "&",
            Hat => "^",
            Pipe => "|",
            AndAnd => "&&",
            PipePipe => "||",
            Equal => "=",
            OpenParenthesis => "(",
            CloseParenthesis => ")",
            OpenCurlyBrace => "{",
            CloseCurlyBrace => "}",
            OpenSquareBracket => "[",
            CloseSquareBracket => "]",
            Comma => ",",
            SemiColon => ";",
            Colon => ":",
            Dot => ".",
            TrueKeyword => "true",
            FalseKeyword => "false",
            VarKeyword => "var",
            IfKeyword => "if",
            ElseKeyword => "else",
            WhileKeyword => "while",
            BreakKeyword => "break",
            ContinueKeyword => "continue",
            ReturnKeyword => "return",
            FnKeyword => "fn",
            IntKeyword => "int",
            FloatKeyword => "float",
            BoolKeyword => "bool",
            StringKeyword => "string",
            CharKeyword => "char",
            VoidKeyword => "void",
            IntLiteral | FloatLiteral | StringLiteral | CharLiteral | Name | EndOfFile => {
                return None
            }
        };
        Some(text)
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::IntKeyword
                | TokenKind::FloatKeyword
                | TokenKind::BoolKeyword
                | TokenKind::StringKeyword
                | TokenKind::CharKeyword
                | TokenKind::VoidKeyword
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind::*;
        let name = match self {
            IntLiteral => "INT_LITERAL",
            FloatLiteral => "FLOAT_LITERAL",
            StringLiteral => "STRING_LITERAL",
            CharLiteral => "CHAR_LITERAL",
            Name => "NAME",
            Plus => "PLUS",
            Minus => "MINUS",
            Star => "STAR",
            Slash => "SLASH",
            Bang => "BANG",
            Tilde => "TILDE",
            Percent => "PERCENT",
            LessLess => "LESS_LESS",
            GreaterGreater => "GREATER_GREATER",
            Less => "LESS",
            LessEqual => "LESS_EQUAL",
            Greater => "GREATER",
            GreaterEqual => "GREATER_EQUAL",
            EqualEqual => "EQUAL_EQUAL",
            BangEqual => "BANG_EQUAL",
            And => "AND",
            Hat => "HAT",
            Pipe => "PIPE",
            AndAnd => "AND_AND",
            PipePipe => "PIPE_PIPE",
            Equal => "EQUAL",
            OpenParenthesis => "OPEN_PARENTHESIS",
            CloseParenthesis => "CLOSE_PARENTHESIS",
            OpenCurlyBrace => "OPEN_CURLY_BRACE",
            CloseCurlyBrace => "CLOSE_CURLY_BRACE",
            OpenSquareBracket => "OPEN_SQUARE_BRACKET",
            CloseSquareBracket => "CLOSE_SQUARE_BRACKET",
            Comma => "COMMA",
            SemiColon => "SEMI_COLON",
            Colon => "COLON",
            Dot => "DOT",
            TrueKeyword => "TRUE_KEYWORD",
            FalseKeyword => "FALSE_KEYWORD",
            VarKeyword => "VAR_KEYWORD",
            IfKeyword => "IF_KEYWORD",
            ElseKeyword => "ELSE_KEYWORD",
            WhileKeyword => "WHILE_KEYWORD",
            BreakKeyword => "BREAK_KEYWORD",
            ContinueKeyword => "CONTINUE_KEYWORD",
            ReturnKeyword => "RETURN_KEYWORD",
            FnKeyword => "FN_KEYWORD",
            IntKeyword => "INT_KEYWORD",
            FloatKeyword => "FLOAT_KEYWORD",
            BoolKeyword => "BOOL_KEYWORD",
            StringKeyword => "STRING_KEYWORD",
            CharKeyword => "CHAR_KEYWORD",
            VoidKeyword => "VOID_KEYWORD",
            EndOfFile => "END_OF_FILE",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Token {{ type: {}, text: '{}', location: {} }}",
            self.kind, self.text, self.location
        )
    }
}
