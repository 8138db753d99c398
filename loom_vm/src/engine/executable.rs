// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Owned, lowered form of module and function bodies.
//!
//! Lowering happens once, when a module record is parsed. The parser's arena
//! is dropped afterwards, so everything here owns its data and can be shared
//! between every agent that evaluates the module.

use std::rc::Rc;

use oxc_syntax::operator::{
    AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};

use crate::ecmascript::types::{JsString, Value};

/// The lowered `ModuleItem`s of a source text module.
#[derive(Debug)]
pub(crate) struct ModuleBody {
    /// VarDeclaredNames of the module body, deduplicated.
    pub(crate) var_names: Box<[JsString]>,
    /// LexicallyScopedDeclarations that are not functions.
    pub(crate) lexical_declarations: Box<[LexicalDeclaration]>,
    /// Hoisted function declarations, instantiated by InitializeEnvironment.
    pub(crate) functions: Box<[HoistedFunction]>,
    pub(crate) statements: Box<[Statement]>,
}

/// A `let` or `const` binding created in TDZ on scope entry.
#[derive(Debug, Clone)]
pub(crate) struct LexicalDeclaration {
    pub(crate) name: JsString,
    pub(crate) is_const: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct HoistedFunction {
    /// Name of the binding the function object is stored in. This is
    /// `*default*` for anonymous default exports.
    pub(crate) binding_name: JsString,
    pub(crate) definition: Rc<FunctionDefinition>,
}

#[derive(Debug)]
pub(crate) struct FunctionDefinition {
    pub(crate) name: JsString,
    pub(crate) is_arrow: bool,
    pub(crate) parameters: Box<[Parameter]>,
    /// VarDeclaredNames of the body that are not also parameters.
    pub(crate) var_names: Box<[JsString]>,
    pub(crate) body: Block,
}

#[derive(Debug)]
pub(crate) struct Parameter {
    pub(crate) name: JsString,
    pub(crate) initializer: Option<Expression>,
}

/// A statement list with its own lexical scope.
#[derive(Debug, Default)]
pub(crate) struct Block {
    pub(crate) lexical_declarations: Box<[LexicalDeclaration]>,
    pub(crate) functions: Box<[HoistedFunction]>,
    pub(crate) statements: Box<[Statement]>,
}

impl Block {
    /// Whether entering the block needs a new declarative environment.
    pub(crate) fn has_declarations(&self) -> bool {
        !self.lexical_declarations.is_empty() || !self.functions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Debug)]
pub(crate) struct VariableDeclarator {
    pub(crate) name: JsString,
    pub(crate) initializer: Option<Expression>,
}

#[derive(Debug)]
pub(crate) enum Statement {
    Expression(Expression),
    Declaration {
        kind: DeclarationKind,
        declarations: Box<[VariableDeclarator]>,
    },
    Block(Block),
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },
    While {
        test: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        test: Expression,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },
    Break,
    Continue,
    Return(Option<Expression>),
    Throw(Expression),
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
    },
    Empty,
    /// A module top-level statement whose value is awaited before the
    /// statement completes. Module evaluation suspends here.
    Await {
        target: AwaitTarget,
        argument: Expression,
    },
}

#[derive(Debug)]
pub(crate) enum ForInit {
    Declaration {
        kind: DeclarationKind,
        declarations: Box<[VariableDeclarator]>,
    },
    Expression(Expression),
}

#[derive(Debug)]
pub(crate) struct CatchClause {
    pub(crate) parameter: Option<JsString>,
    pub(crate) body: Block,
}

/// What happens with the settled value of a top-level `await`.
#[derive(Debug, Clone)]
pub(crate) enum AwaitTarget {
    /// `await e;`
    Discard,
    /// `let x = await e;`, `const x = await e;` or `var x = await e;`
    Declaration { kind: DeclarationKind, name: JsString },
    /// `x = await e;`
    Assignment(JsString),
}

#[derive(Debug)]
pub(crate) enum PropertyKey {
    Static(JsString),
    Computed(Expression),
}

#[derive(Debug)]
pub(crate) enum MemberProperty {
    Static(JsString),
    Computed(Box<Expression>),
}

#[derive(Debug)]
pub(crate) enum AssignmentTarget {
    Identifier(JsString),
    Member {
        object: Box<Expression>,
        property: MemberProperty,
    },
}

#[derive(Debug)]
pub(crate) enum Expression {
    /// A primitive literal.
    Literal(Value),
    Identifier(JsString),
    This,
    Template {
        quasis: Box<[JsString]>,
        expressions: Box<[Expression]>,
    },
    Array(Box<[Expression]>),
    Object(Box<[(PropertyKey, Expression)]>),
    Function(Rc<FunctionDefinition>),
    Unary {
        operator: UnaryOperator,
        argument: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    Assignment {
        operator: AssignmentOperator,
        target: AssignmentTarget,
        value: Box<Expression>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        target: AssignmentTarget,
    },
    Sequence(Box<[Expression]>),
    Call {
        callee: Box<Expression>,
        arguments: Box<[Expression]>,
    },
    New {
        callee: Box<Expression>,
        arguments: Box<[Expression]>,
    },
    Member {
        object: Box<Expression>,
        property: MemberProperty,
    },
    /// `import(specifier)`
    ImportCall(Box<Expression>),
    /// `import.meta`
    ImportMeta,
}
