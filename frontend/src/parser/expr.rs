use crate::ast::{Expr, ExprRef};
use crate::parser::core::Parser;
use crate::parser::error::{ParserError, ParserResult};
use crate::token::TokenKind;

/// Binary operator precedence; smaller binds tighter, 0 means the token is
/// not a binary operator.
pub fn binary_precedence(kind: TokenKind) -> i32 {
    match kind {
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 3,
        TokenKind::Plus | TokenKind::Minus => 4,
        TokenKind::LessLess | TokenKind::GreaterGreater => 5,
        TokenKind::Less
        | TokenKind::Greater
        | TokenKind::LessEqual
        | TokenKind::GreaterEqual => 6,
        TokenKind::EqualEqual | TokenKind::BangEqual => 7,
        TokenKind::And => 8,
        TokenKind::Hat => 9,
        TokenKind::Pipe => 10,
        TokenKind::AndAnd => 11,
        TokenKind::PipePipe => 12,
        TokenKind::Equal => 13,
        _ => 0,
    }
}

impl Parser {
    pub fn parse_expression(&mut self) -> ParserResult<ExprRef> {
        self.parse_binary_expression(-1)
    }

    /// Precedence climbing. The top-level call passes −1, meaning any
    /// operator is accepted; recursive calls pass the current operator's
    /// precedence and only consume strictly tighter operators, which makes
    /// everything left-associative. Assignment passes its own precedence
    /// plus one so that `a = b = c` associates to the right.
    fn parse_binary_expression(&mut self, parent_precedence: i32) -> ParserResult<ExprRef> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let next_operator = self.current_token().clone();
            let operator_precedence = binary_precedence(next_operator.kind);
            let accepted = (parent_precedence == -1 && operator_precedence != 0)
                || (0 < operator_precedence && operator_precedence < parent_precedence);
            if !accepted {
                return Ok(left);
            }

            self.consume_token();
            let right_parent = if next_operator.kind == TokenKind::Equal {
                operator_precedence + 1
            } else {
                operator_precedence
            };
            let right = self.parse_binary_expression(right_parent)?;
            left = self.ast_builder.add_expr(
                Expr::Binary(next_operator.kind, left, right),
                next_operator.location,
            );
        }
    }

    fn parse_unary_expression(&mut self) -> ParserResult<ExprRef> {
        match self.peek_kind() {
            TokenKind::Tilde | TokenKind::Bang | TokenKind::Minus | TokenKind::Plus => {
                let operator_token = self.consume_token();
                let operand = self.parse_unary_expression()?;
                Ok(self.ast_builder.add_expr(
                    Expr::Unary(operator_token.kind, operand),
                    operator_token.location,
                ))
            }
            _ => self.parse_primary_expression(),
        }
    }

    /// True when the `[` run at the cursor begins a type annotation rather
    /// than a list literal, i.e. the brackets are followed by a primitive
    /// type keyword.
    fn square_brackets_start_type(&self) -> bool {
        let mut offset = 0;
        while self.peek_kind_n(offset) == TokenKind::OpenSquareBracket {
            offset += 1;
        }
        self.peek_kind_n(offset).is_type_keyword()
    }

    fn parse_cast_expression(&mut self) -> ParserResult<ExprRef> {
        let start = self.current_token().location.clone();
        let target_type = self.parse_type_annotation()?;
        self.expect_token(TokenKind::OpenParenthesis)?;
        let inner = self.parse_expression()?;
        self.expect_token(TokenKind::CloseParenthesis)?;
        Ok(self
            .ast_builder
            .add_expr(Expr::Cast(target_type, inner), start))
    }

    fn parse_primary_expression(&mut self) -> ParserResult<ExprRef> {
        let current = self.current_token().clone();
        let mut left = match current.kind {
            TokenKind::TrueKeyword => {
                self.consume_token();
                self.ast_builder.add_expr(Expr::True, current.location)
            }
            TokenKind::FalseKeyword => {
                self.consume_token();
                self.ast_builder.add_expr(Expr::False, current.location)
            }
            TokenKind::IntLiteral => {
                self.consume_token();
                let text = self.intern(&current.text);
                self.ast_builder
                    .add_expr(Expr::IntLiteral(text), current.location)
            }
            TokenKind::FloatLiteral => {
                self.consume_token();
                let text = self.intern(&current.text);
                self.ast_builder
                    .add_expr(Expr::FloatLiteral(text), current.location)
            }
            TokenKind::StringLiteral => {
                self.consume_token();
                let text = self.intern(&current.text);
                self.ast_builder
                    .add_expr(Expr::StringLiteral(text), current.location)
            }
            TokenKind::CharLiteral => {
                self.consume_token();
                let text = self.intern(&current.text);
                self.ast_builder
                    .add_expr(Expr::CharLiteral(text), current.location)
            }
            TokenKind::OpenParenthesis => {
                self.consume_token();
                let inner = self.parse_expression()?;
                self.expect_token(TokenKind::CloseParenthesis)?;
                inner
            }
            TokenKind::OpenSquareBracket => {
                if self.square_brackets_start_type() {
                    self.parse_cast_expression()?
                } else {
                    self.consume_token();
                    let mut element_initializers = Vec::new();
                    if self.peek_kind() != TokenKind::CloseSquareBracket {
                        loop {
                            element_initializers.push(self.parse_expression()?);
                            if self.peek_kind() == TokenKind::Comma {
                                self.consume_token();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect_token(TokenKind::CloseSquareBracket)?;
                    self.ast_builder
                        .add_expr(Expr::ListLiteral(element_initializers), current.location)
                }
            }
            kind if kind.is_type_keyword() => self.parse_cast_expression()?,
            TokenKind::Name => {
                self.consume_token();
                let name = self.intern(&current.text);
                self.ast_builder
                    .add_expr(Expr::Identifier(name), current.location)
            }
            found => {
                return Err(ParserError::unexpected_primary(found, current.location));
            }
        };

        // Attach postfix suffixes: call, indexing, member access.
        loop {
            let current = self.current_token().clone();
            match current.kind {
                TokenKind::OpenParenthesis => {
                    self.consume_token();
                    let mut arguments = Vec::new();
                    if self.peek_kind() != TokenKind::CloseParenthesis {
                        loop {
                            arguments.push(self.parse_expression()?);
                            if self.peek_kind() == TokenKind::Comma {
                                self.consume_token();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect_token(TokenKind::CloseParenthesis)?;
                    left = self
                        .ast_builder
                        .add_expr(Expr::Call(left, arguments), current.location);
                }

                TokenKind::OpenSquareBracket => {
                    self.consume_token();
                    let index = self.parse_expression()?;
                    self.expect_token(TokenKind::CloseSquareBracket)?;
                    left = self
                        .ast_builder
                        .add_expr(Expr::Indexing(left, index), current.location);
                }

                TokenKind::Dot => {
                    self.consume_token();
                    let member_token = self.expect_token(TokenKind::Name)?;
                    let member_name = self.intern(&member_token.text);
                    left = self.ast_builder.add_expr(
                        Expr::MemberAccess(left, member_name),
                        member_token.location,
                    );
                }

                _ => return Ok(left),
            }
        }
    }
}
