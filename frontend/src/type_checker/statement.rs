use crate::ast::{ExprRef, Stmt, StmtRef};
use crate::type_checker::{TypeCheckError, TypeCheckErrorKind, TypeChecker};
use crate::types::Ty;

impl<'a> TypeChecker<'a> {
    pub(crate) fn check_stmt(&mut self, stmt: StmtRef) -> Result<(), TypeCheckError> {
        match self.program.stmt(stmt).clone() {
            Stmt::Expression(expression) => {
                self.check_expr(expression)?;
                Ok(())
            }

            Stmt::VarDef {
                name,
                annotation,
                initializer,
            } => {
                let initializer_ty = self.check_expr(initializer)?;
                let variable_ty = match annotation {
                    Some(annotated) => {
                        if !initializer_ty.fits(&annotated) {
                            return Err(self.error_at(
                                initializer,
                                TypeCheckErrorKind::TypeMismatch {
                                    expected: annotated,
                                    actual: initializer_ty,
                                },
                            ));
                        }
                        annotated
                    }
                    None => initializer_ty,
                };
                if variable_ty == Ty::Void {
                    return Err(self.stmt_error_at(
                        stmt,
                        TypeCheckErrorKind::VoidVariable {
                            name: self.resolve(name),
                        },
                    ));
                }
                let id = self.context.add_variable(name, variable_ty);
                self.var_def_ids.insert(stmt, id);
                Ok(())
            }

            Stmt::Block(sub_statements) => {
                self.context.push_scope();
                for sub_statement in sub_statements {
                    self.check_stmt(sub_statement)?;
                }
                self.context.pop_scope();
                Ok(())
            }

            Stmt::If {
                condition,
                then_body,
            } => {
                self.check_condition(condition)?;
                self.check_stmt(then_body)
            }

            Stmt::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                self.check_condition(condition)?;
                self.check_stmt(then_body)?;
                self.check_stmt(else_body)
            }

            Stmt::While { condition, body } => {
                self.check_condition(condition)?;
                self.context.push_while_statement();
                let result = self.check_stmt(body);
                self.context.pop_while_statement();
                result
            }

            Stmt::Break => {
                if !self.context.is_in_while_statement() {
                    return Err(self.stmt_error_at(stmt, TypeCheckErrorKind::BreakOutsideLoop));
                }
                Ok(())
            }

            Stmt::Continue => {
                if !self.context.is_in_while_statement() {
                    return Err(self.stmt_error_at(stmt, TypeCheckErrorKind::ContinueOutsideLoop));
                }
                Ok(())
            }

            Stmt::Return(Some(value)) => {
                let value_ty = self.check_expr(value)?;
                let return_type = self.context.current_return_type().clone();
                if !value_ty.fits(&return_type) {
                    return Err(self.error_at(
                        value,
                        TypeCheckErrorKind::TypeMismatch {
                            expected: return_type,
                            actual: value_ty,
                        },
                    ));
                }
                Ok(())
            }

            Stmt::Return(None) => {
                let return_type = self.context.current_return_type().clone();
                if return_type != Ty::Void {
                    return Err(self.stmt_error_at(
                        stmt,
                        TypeCheckErrorKind::TypeMismatch {
                            expected: return_type,
                            actual: Ty::Void,
                        },
                    ));
                }
                Ok(())
            }
        }
    }

    fn check_condition(&mut self, condition: ExprRef) -> Result<(), TypeCheckError> {
        let condition_ty = self.check_expr(condition)?;
        if condition_ty != Ty::Bool {
            return Err(self.error_at(
                condition,
                TypeCheckErrorKind::TypeMismatch {
                    expected: Ty::Bool,
                    actual: condition_ty,
                },
            ));
        }
        Ok(())
    }

    /// Definite return is purely structural: a return statement is definite,
    /// a block is definite when any statement in it is, an if/else when both
    /// branches are. Everything else may fall through.
    pub(crate) fn is_definite_return(&self, stmt: StmtRef) -> bool {
        match self.program.stmt(stmt) {
            Stmt::Return(_) => true,
            Stmt::Block(sub_statements) => sub_statements
                .iter()
                .any(|sub| self.is_definite_return(*sub)),
            Stmt::IfElse {
                then_body,
                else_body,
                ..
            } => self.is_definite_return(*then_body) && self.is_definite_return(*else_body),
            _ => false,
        }
    }

    fn stmt_error_at(&self, stmt: StmtRef, kind: TypeCheckErrorKind) -> TypeCheckError {
        TypeCheckError::new(kind, self.program.stmt_location(stmt).clone())
    }
}
