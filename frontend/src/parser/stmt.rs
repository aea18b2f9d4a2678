use crate::ast::{Stmt, StmtRef};
use crate::parser::core::Parser;
use crate::parser::error::ParserResult;
use crate::token::TokenKind;

impl Parser {
    pub fn parse_statement(&mut self) -> ParserResult<StmtRef> {
        match self.peek_kind() {
            TokenKind::VarKeyword => {
                let var_token = self.consume_token();
                let name_token = self.expect_token(TokenKind::Name)?;
                let name = self.intern(&name_token.text);

                let annotation = if self.peek_kind() == TokenKind::Colon {
                    self.consume_token();
                    Some(self.parse_type_annotation()?)
                } else {
                    None
                };

                self.expect_token(TokenKind::Equal)?;
                let initializer = self.parse_expression()?;
                self.expect_token(TokenKind::SemiColon)?;
                Ok(self.ast_builder.add_stmt(
                    Stmt::VarDef {
                        name,
                        annotation,
                        initializer,
                    },
                    var_token.location,
                ))
            }

            TokenKind::OpenCurlyBrace => {
                let open_token = self.consume_token();
                let mut sub_statements = Vec::new();
                while self.peek_kind() != TokenKind::CloseCurlyBrace {
                    if self.peek_kind() == TokenKind::EndOfFile {
                        break;
                    }
                    sub_statements.push(self.parse_statement()?);
                }
                self.expect_token(TokenKind::CloseCurlyBrace)?;
                Ok(self
                    .ast_builder
                    .add_stmt(Stmt::Block(sub_statements), open_token.location))
            }

            TokenKind::IfKeyword => {
                let if_token = self.consume_token();
                self.expect_token(TokenKind::OpenParenthesis)?;
                let condition = self.parse_expression()?;
                self.expect_token(TokenKind::CloseParenthesis)?;
                let then_body = self.parse_statement()?;
                if self.peek_kind() == TokenKind::ElseKeyword {
                    self.consume_token();
                    let else_body = self.parse_statement()?;
                    Ok(self.ast_builder.add_stmt(
                        Stmt::IfElse {
                            condition,
                            then_body,
                            else_body,
                        },
                        if_token.location,
                    ))
                } else {
                    Ok(self.ast_builder.add_stmt(
                        Stmt::If {
                            condition,
                            then_body,
                        },
                        if_token.location,
                    ))
                }
            }

            TokenKind::WhileKeyword => {
                let while_token = self.consume_token();
                self.expect_token(TokenKind::OpenParenthesis)?;
                let condition = self.parse_expression()?;
                self.expect_token(TokenKind::CloseParenthesis)?;
                let body = self.parse_statement()?;
                Ok(self
                    .ast_builder
                    .add_stmt(Stmt::While { condition, body }, while_token.location))
            }

            TokenKind::BreakKeyword => {
                let break_token = self.consume_token();
                self.expect_token(TokenKind::SemiColon)?;
                Ok(self.ast_builder.add_stmt(Stmt::Break, break_token.location))
            }

            TokenKind::ContinueKeyword => {
                let continue_token = self.consume_token();
                self.expect_token(TokenKind::SemiColon)?;
                Ok(self
                    .ast_builder
                    .add_stmt(Stmt::Continue, continue_token.location))
            }

            TokenKind::ReturnKeyword => {
                let return_token = self.consume_token();
                if self.peek_kind() == TokenKind::SemiColon {
                    self.consume_token();
                    Ok(self
                        .ast_builder
                        .add_stmt(Stmt::Return(None), return_token.location))
                } else {
                    let value = self.parse_expression()?;
                    self.expect_token(TokenKind::SemiColon)?;
                    Ok(self
                        .ast_builder
                        .add_stmt(Stmt::Return(Some(value)), return_token.location))
                }
            }

            _ => {
                let location = self.current_token().location.clone();
                let expression = self.parse_expression()?;
                self.expect_token(TokenKind::SemiColon)?;
                Ok(self
                    .ast_builder
                    .add_stmt(Stmt::Expression(expression), location))
            }
        }
    }
}
