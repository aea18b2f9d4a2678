use crate::ast::{Expr, ExprRef};
use crate::token::TokenKind;
use crate::type_checker::{CallTarget, Symbol, TypeCheckError, TypeCheckErrorKind, TypeChecker};
use crate::types::{cast_allowed, lookup_binary_operator, lookup_unary_operator, FieldAccess, Ty};

impl<'a> TypeChecker<'a> {
    /// Assigns a resolved type to every node under `expr` and returns the
    /// type of `expr` itself.
    pub(crate) fn check_expr(&mut self, expr: ExprRef) -> Result<Ty, TypeCheckError> {
        let node = self.program.expr(expr).clone();
        let ty = match node {
            Expr::IntLiteral(_) => Ty::Int,
            Expr::FloatLiteral(_) => Ty::Float,
            Expr::StringLiteral(_) => Ty::String,
            Expr::CharLiteral(_) => Ty::Char,
            Expr::True | Expr::False => Ty::Bool,

            Expr::Identifier(name) => match self.context.lookup(name).cloned() {
                Some(Symbol::Variable { ty, id }) => {
                    self.variable_ids.insert(expr, id);
                    ty
                }
                Some(Symbol::Function { .. }) => {
                    return Err(self.error_at(
                        expr,
                        TypeCheckErrorKind::NotAVariable {
                            name: self.resolve(name),
                        },
                    ));
                }
                None => {
                    return Err(self.error_at(
                        expr,
                        TypeCheckErrorKind::UndefinedSymbol {
                            name: self.resolve(name),
                        },
                    ));
                }
            },

            Expr::Unary(operator, operand) => {
                let operand_ty = self.check_expr(operand)?;
                match lookup_unary_operator(operator, &operand_ty) {
                    Some(entry) => entry.result.clone(),
                    None => {
                        return Err(self.error_at(
                            expr,
                            TypeCheckErrorKind::UnaryOperatorNotDefined {
                                operator: operator.fixed_lexeme().unwrap_or("?").to_string(),
                                operand: operand_ty,
                            },
                        ));
                    }
                }
            }

            Expr::Binary(TokenKind::Equal, left, right) => {
                let left_ty = self.check_expr(left)?;
                if !self.is_lvalue(left) {
                    return Err(self.error_at(expr, TypeCheckErrorKind::AssignmentToNonLvalue));
                }
                let right_ty = self.check_expr(right)?;
                if !right_ty.fits(&left_ty) {
                    return Err(self.error_at(
                        right,
                        TypeCheckErrorKind::TypeMismatch {
                            expected: left_ty,
                            actual: right_ty,
                        },
                    ));
                }
                left_ty
            }

            Expr::Binary(operator, left, right) => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                match lookup_binary_operator(operator, &left_ty, &right_ty) {
                    Some(entry) => entry.result.clone(),
                    None => {
                        return Err(self.error_at(
                            expr,
                            TypeCheckErrorKind::BinaryOperatorNotDefined {
                                operator: operator.fixed_lexeme().unwrap_or("?").to_string(),
                                left: left_ty,
                                right: right_ty,
                            },
                        ));
                    }
                }
            }

            Expr::MemberAccess(receiver, member) => {
                let receiver_ty = self.check_expr(receiver)?;
                let member_name = self.resolve(member);
                match receiver_ty.field(&member_name) {
                    Some(field) if field.access != FieldAccess::Internal => field.ty,
                    _ => {
                        return Err(self.error_at(
                            expr,
                            TypeCheckErrorKind::MemberNotFound {
                                ty: receiver_ty,
                                name: member_name,
                            },
                        ));
                    }
                }
            }

            Expr::Indexing(receiver, index) => {
                let receiver_ty = self.check_expr(receiver)?;
                let field = match receiver_ty.index_field() {
                    Some(field) => field,
                    None => {
                        return Err(self.error_at(
                            expr,
                            TypeCheckErrorKind::NotIndexable { ty: receiver_ty },
                        ));
                    }
                };
                let index_ty = self.check_expr(index)?;
                if !index_ty.fits(&Ty::Int) {
                    return Err(self.error_at(
                        index,
                        TypeCheckErrorKind::TypeMismatch {
                            expected: Ty::Int,
                            actual: index_ty,
                        },
                    ));
                }
                field.ty
            }

            Expr::Call(callee, arguments) => self.check_call(expr, callee, &arguments)?,

            Expr::ListLiteral(elements) => {
                if elements.is_empty() {
                    Ty::List(Box::new(Ty::Generic))
                } else {
                    let element_ty = self.check_expr(elements[0])?;
                    if element_ty == Ty::Void {
                        return Err(
                            self.error_at(elements[0], TypeCheckErrorKind::VoidListElement)
                        );
                    }
                    for element in &elements[1..] {
                        let ty = self.check_expr(*element)?;
                        if ty == Ty::Void {
                            return Err(
                                self.error_at(*element, TypeCheckErrorKind::VoidListElement)
                            );
                        }
                        if !ty.fits(&element_ty) {
                            return Err(self.error_at(
                                *element,
                                TypeCheckErrorKind::TypeMismatch {
                                    expected: element_ty,
                                    actual: ty,
                                },
                            ));
                        }
                    }
                    Ty::List(Box::new(element_ty))
                }
            }

            Expr::Cast(target, inner) => {
                let inner_ty = self.check_expr(inner)?;
                if inner_ty.fits(&target) {
                    // An inferred Generic takes its concrete shape from the
                    // cast target, so the emitter sees a real element type.
                    if inner_ty.contains_generic() {
                        self.expr_types[inner.to_index()] = target.clone();
                    }
                    target
                } else if cast_allowed(&inner_ty, &target) {
                    target
                } else {
                    return Err(self.error_at(
                        expr,
                        TypeCheckErrorKind::UnsupportedCast {
                            from: inner_ty,
                            to: target,
                        },
                    ));
                }
            }
        };

        self.expr_types[expr.to_index()] = ty.clone();
        Ok(ty)
    }

    fn check_call(
        &mut self,
        call: ExprRef,
        callee: ExprRef,
        arguments: &[ExprRef],
    ) -> Result<Ty, TypeCheckError> {
        match self.program.expr(callee).clone() {
            Expr::Identifier(name) => {
                let mut given_types = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    given_types.push(self.check_expr(*argument)?);
                }
                let return_type =
                    self.resolve_call_target(call, callee, name, &given_types, false)?;
                Ok(return_type)
            }

            // Method-call convention: `recv.m(args)` resolves `m` with the
            // receiver's type prepended to the argument list.
            Expr::MemberAccess(receiver, method_name) => {
                let receiver_ty = self.check_expr(receiver)?;
                let mut given_types = Vec::with_capacity(arguments.len() + 1);
                given_types.push(receiver_ty);
                for argument in arguments {
                    given_types.push(self.check_expr(*argument)?);
                }
                let return_type =
                    self.resolve_call_target(call, callee, method_name, &given_types, true)?;
                Ok(return_type)
            }

            _ => Err(self.error_at(callee, TypeCheckErrorKind::NotCallable)),
        }
    }

    fn resolve_call_target(
        &mut self,
        call: ExprRef,
        callee: ExprRef,
        name: string_interner::DefaultSymbol,
        given_types: &[Ty],
        method: bool,
    ) -> Result<Ty, TypeCheckError> {
        let symbol = self.context.lookup(name).cloned();
        let (return_type, argument_types, id, native) = match symbol {
            Some(Symbol::Function {
                return_type,
                argument_types,
                id,
                native,
            }) => (return_type, argument_types, id, native),
            Some(Symbol::Variable { .. }) => {
                return Err(self.error_at(
                    callee,
                    TypeCheckErrorKind::NotAFunction {
                        name: self.resolve(name),
                    },
                ));
            }
            None => {
                return Err(self.error_at(
                    callee,
                    TypeCheckErrorKind::UndefinedSymbol {
                        name: self.resolve(name),
                    },
                ));
            }
        };

        if given_types.len() != argument_types.len() {
            return Err(self.error_at(
                call,
                TypeCheckErrorKind::ArgumentCountMismatch {
                    name: self.resolve(name),
                    expected: argument_types.len(),
                    found: given_types.len(),
                },
            ));
        }
        for (position, (given, expected)) in
            given_types.iter().zip(argument_types.iter()).enumerate()
        {
            if !given.fits(expected) {
                return Err(self.error_at(
                    call,
                    TypeCheckErrorKind::ArgumentTypeMismatch {
                        name: self.resolve(name),
                        position: position + 1,
                        expected: expected.clone(),
                        actual: given.clone(),
                    },
                ));
            }
        }

        self.call_targets.insert(
            call,
            CallTarget {
                function_id: id,
                native,
                method,
            },
        );
        self.expr_types[callee.to_index()] = return_type.clone();
        Ok(return_type)
    }

    /// The lvalue rule: variable references, members with READ_WRITE access,
    /// and indexing through a READ_WRITE `@index`. Callers must have checked
    /// the receiver already so its type is available.
    pub(crate) fn is_lvalue(&self, expr: ExprRef) -> bool {
        match self.program.expr(expr) {
            Expr::Identifier(_) => true,
            Expr::Indexing(receiver, _) => {
                let receiver_ty = &self.expr_types[receiver.to_index()];
                receiver_ty
                    .index_field()
                    .map(|field| field.access == FieldAccess::ReadWrite)
                    .unwrap_or(false)
            }
            Expr::MemberAccess(receiver, member) => {
                let receiver_ty = &self.expr_types[receiver.to_index()];
                let member_name = self.resolve(*member);
                receiver_ty
                    .field(&member_name)
                    .map(|field| field.access == FieldAccess::ReadWrite)
                    .unwrap_or(false)
            }
            _ => false,
        }
    }

    pub(crate) fn error_at(&self, expr: ExprRef, kind: TypeCheckErrorKind) -> TypeCheckError {
        TypeCheckError::new(kind, self.program.expr_location(expr).clone())
    }
}
