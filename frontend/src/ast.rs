use string_interner::DefaultSymbol;

use crate::token::{Location, TokenKind};
use crate::types::Ty;

/// Index of an expression in the expression pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprRef(pub u32);

impl ExprRef {
    pub fn to_index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a statement in the statement pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtRef(pub u32);

impl StmtRef {
    pub fn to_index(self) -> usize {
        self.0 as usize
    }
}

/// Untyped expression node. Literal nodes keep their interned lexeme; the
/// code generator parses it. Binary and unary nodes keep the operator token
/// kind so the checker can consult the operator tables directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(DefaultSymbol),
    FloatLiteral(DefaultSymbol),
    StringLiteral(DefaultSymbol),
    CharLiteral(DefaultSymbol),
    True,
    False,
    Identifier(DefaultSymbol),
    Unary(TokenKind, ExprRef),
    Binary(TokenKind, ExprRef, ExprRef),
    Call(ExprRef, Vec<ExprRef>),
    MemberAccess(ExprRef, DefaultSymbol),
    Indexing(ExprRef, ExprRef),
    ListLiteral(Vec<ExprRef>),
    Cast(Ty, ExprRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(ExprRef),
    VarDef {
        name: DefaultSymbol,
        annotation: Option<Ty>,
        initializer: ExprRef,
    },
    Block(Vec<StmtRef>),
    If {
        condition: ExprRef,
        then_body: StmtRef,
    },
    IfElse {
        condition: ExprRef,
        then_body: StmtRef,
        else_body: StmtRef,
    },
    While {
        condition: ExprRef,
        body: StmtRef,
    },
    Break,
    Continue,
    Return(Option<ExprRef>),
}

#[derive(Debug, Default)]
pub struct ExprPool(pub Vec<Expr>);

impl ExprPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn get(&self, index: usize) -> Option<&Expr> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct StmtPool(pub Vec<Stmt>);

impl StmtPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn get(&self, index: usize) -> Option<&Stmt> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub type Parameter = (DefaultSymbol, Ty);

#[derive(Debug)]
pub struct FunctionDefinition {
    pub name: DefaultSymbol,
    pub parameters: Vec<Parameter>,
    pub return_type: Ty,
    pub body: StmtRef,
    pub location: Location,
}

/// Parse result: the top-level definitions plus the node pools and the
/// per-node location pools they index into.
#[derive(Debug)]
pub struct Program {
    pub functions: Vec<FunctionDefinition>,
    pub expressions: ExprPool,
    pub statements: StmtPool,
    pub expr_locations: Vec<Location>,
    pub stmt_locations: Vec<Location>,
}

impl Program {
    pub fn expr(&self, e: ExprRef) -> &Expr {
        &self.expressions.0[e.to_index()]
    }

    pub fn stmt(&self, s: StmtRef) -> &Stmt {
        &self.statements.0[s.to_index()]
    }

    pub fn expr_location(&self, e: ExprRef) -> &Location {
        &self.expr_locations[e.to_index()]
    }

    pub fn stmt_location(&self, s: StmtRef) -> &Location {
        &self.stmt_locations[s.to_index()]
    }
}

/// Allocates AST nodes into the pools, keeping the location pools in sync.
#[derive(Debug, Default)]
pub struct AstBuilder {
    expr_pool: ExprPool,
    stmt_pool: StmtPool,
    expr_locations: Vec<Location>,
    stmt_locations: Vec<Location>,
}

impl AstBuilder {
    pub fn with_capacity(expr_capacity: usize, stmt_capacity: usize) -> Self {
        Self {
            expr_pool: ExprPool::with_capacity(expr_capacity),
            stmt_pool: StmtPool::with_capacity(stmt_capacity),
            expr_locations: Vec::with_capacity(expr_capacity),
            stmt_locations: Vec::with_capacity(stmt_capacity),
        }
    }

    pub fn add_expr(&mut self, expr: Expr, location: Location) -> ExprRef {
        let index = self.expr_pool.len() as u32;
        self.expr_pool.0.push(expr);
        self.expr_locations.push(location);
        ExprRef(index)
    }

    pub fn add_stmt(&mut self, stmt: Stmt, location: Location) -> StmtRef {
        let index = self.stmt_pool.len() as u32;
        self.stmt_pool.0.push(stmt);
        self.stmt_locations.push(location);
        StmtRef(index)
    }

    pub fn expr_pool(&self) -> &ExprPool {
        &self.expr_pool
    }

    pub fn stmt_pool(&self) -> &StmtPool {
        &self.stmt_pool
    }

    pub fn extract_pools(self) -> (ExprPool, StmtPool, Vec<Location>, Vec<Location>) {
        (
            self.expr_pool,
            self.stmt_pool,
            self.expr_locations,
            self.stmt_locations,
        )
    }
}
