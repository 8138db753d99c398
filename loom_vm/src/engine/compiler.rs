// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lowering of the oxc AST into the owned [executable](super::executable)
//! form.
//!
//! Syntax outside of the supported subset is reported as an early error
//! naming the construct, so that unsupported code never reaches evaluation.

use std::rc::Rc;

use ahash::AHashSet;
use oxc_ast::ast;
use oxc_diagnostics::OxcDiagnostic;
use oxc_span::{GetSpan, Span};
use oxc_syntax::operator::{AssignmentOperator, UnaryOperator};

use super::executable::{
    AssignmentTarget, AwaitTarget, Block, CatchClause, DeclarationKind, Expression, ForInit,
    FunctionDefinition, HoistedFunction, LexicalDeclaration, MemberProperty, ModuleBody,
    Parameter, PropertyKey, Statement, VariableDeclarator,
};
use crate::ecmascript::types::{JsString, Value, number_to_string};

/// The local name of `export default` expressions and anonymous function
/// declarations.
pub(crate) const DEFAULT_BINDING_NAME: &str = "*default*";

pub(crate) struct CompileContext {
    errors: Vec<OxcDiagnostic>,
    /// VarDeclaredNames of the function or module currently being lowered.
    var_names: Vec<JsString>,
}

pub(crate) trait CompileEvaluation {
    type Output;

    fn compile(&self, ctx: &mut CompileContext) -> Self::Output;
}

impl CompileContext {
    fn new() -> Self {
        Self {
            errors: Vec::new(),
            var_names: Vec::new(),
        }
    }

    fn unsupported(&mut self, span: Span, construct: &str) {
        self.errors.push(
            OxcDiagnostic::error(format!("Unsupported syntax: {construct}")).with_label(span),
        );
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors
            .push(OxcDiagnostic::error(message.into()).with_label(span));
    }

    fn declare_var(&mut self, name: &JsString) {
        if !self.var_names.contains(name) {
            self.var_names.push(name.clone());
        }
    }

    fn binding_name(&mut self, pattern: &ast::BindingPattern) -> JsString {
        match &pattern.kind {
            ast::BindingPatternKind::BindingIdentifier(identifier) => {
                identifier.name.as_str().into()
            }
            _ => {
                self.unsupported(pattern.span(), "destructuring patterns");
                "".into()
            }
        }
    }

    /// ### [8.4.5 Runtime Semantics: NamedEvaluation](https://tc39.es/ecma262/#sec-runtime-semantics-namedevaluation)
    ///
    /// Anonymous function definitions take the name of the binding they are
    /// assigned to.
    fn compile_named(&mut self, expression: &ast::Expression, name: &str) -> Expression {
        match expression.without_parentheses() {
            ast::Expression::FunctionExpression(function) if function.id.is_none() => {
                Expression::Function(compile_function(self, function, Some(name)))
            }
            ast::Expression::ArrowFunctionExpression(arrow) => {
                Expression::Function(compile_arrow_function(self, arrow, name))
            }
            _ => expression.compile(self),
        }
    }

    fn compile_declarators(
        &mut self,
        declaration: &ast::VariableDeclaration,
    ) -> (DeclarationKind, Box<[VariableDeclarator]>) {
        let kind = declaration_kind(self, declaration);
        let declarations = declaration
            .declarations
            .iter()
            .map(|declarator| {
                let name = self.binding_name(&declarator.id);
                if kind == DeclarationKind::Var {
                    self.declare_var(&name);
                }
                let initializer = declarator
                    .init
                    .as_ref()
                    .map(|init| self.compile_named(init, &name));
                if kind == DeclarationKind::Const && initializer.is_none() {
                    self.error(declarator.span, "Missing initializer in const declaration");
                }
                VariableDeclarator { name, initializer }
            })
            .collect();
        (kind, declarations)
    }
}

fn declaration_kind(ctx: &mut CompileContext, declaration: &ast::VariableDeclaration) -> DeclarationKind {
    match declaration.kind {
        ast::VariableDeclarationKind::Var => DeclarationKind::Var,
        ast::VariableDeclarationKind::Let => DeclarationKind::Let,
        ast::VariableDeclarationKind::Const => DeclarationKind::Const,
        ast::VariableDeclarationKind::Using | ast::VariableDeclarationKind::AwaitUsing => {
            ctx.unsupported(declaration.span, "using declarations");
            DeclarationKind::Const
        }
    }
}

/// Lexically scoped declarations of one statement list.
#[derive(Default)]
struct ScopeDeclarations {
    lexical_declarations: Vec<LexicalDeclaration>,
    functions: Vec<HoistedFunction>,
    names: AHashSet<JsString>,
}

impl ScopeDeclarations {
    fn declare(&mut self, ctx: &mut CompileContext, name: JsString, span: Span) -> bool {
        if !self.names.insert(name.clone()) {
            ctx.error(span, format!("Identifier '{name}' has already been declared"));
            return false;
        }
        true
    }

    fn add_lexical(&mut self, ctx: &mut CompileContext, declaration: &ast::VariableDeclaration) {
        if declaration.kind == ast::VariableDeclarationKind::Var {
            return;
        }
        let is_const = declaration.kind != ast::VariableDeclarationKind::Let;
        for declarator in &declaration.declarations {
            // Patterns are reported when the declaration itself is lowered.
            let ast::BindingPatternKind::BindingIdentifier(identifier) = &declarator.id.kind else {
                continue;
            };
            let name: JsString = identifier.name.as_str().into();
            if self.declare(ctx, name.clone(), declarator.span) {
                self.lexical_declarations
                    .push(LexicalDeclaration { name, is_const });
            }
        }
    }

    fn add_function(&mut self, ctx: &mut CompileContext, binding_name: JsString, function: &ast::Function, name: Option<&str>) {
        if !self.declare(ctx, binding_name.clone(), function.span) {
            return;
        }
        let definition = compile_function(ctx, function, name);
        self.functions.push(HoistedFunction {
            binding_name,
            definition,
        });
    }

    /// Collects the declarations of a statement that belong to the
    /// enclosing statement list.
    fn collect(&mut self, ctx: &mut CompileContext, statement: &ast::Statement) {
        match statement {
            ast::Statement::VariableDeclaration(declaration) => self.add_lexical(ctx, declaration),
            ast::Statement::FunctionDeclaration(function) => {
                let Some(id) = &function.id else {
                    return;
                };
                self.add_function(ctx, id.name.as_str().into(), function, None);
            }
            _ => {}
        }
    }

    fn into_block(self, statements: Vec<Statement>) -> Block {
        Block {
            lexical_declarations: self.lexical_declarations.into_boxed_slice(),
            functions: self.functions.into_boxed_slice(),
            statements: statements.into_boxed_slice(),
        }
    }
}

fn compile_statement_list(ctx: &mut CompileContext, statements: &[ast::Statement]) -> Block {
    let mut scope = ScopeDeclarations::default();
    for statement in statements {
        scope.collect(ctx, statement);
    }
    let statements = statements
        .iter()
        .map(|statement| statement.compile(ctx))
        .collect();
    scope.into_block(statements)
}

fn compile_parameters(ctx: &mut CompileContext, parameters: &ast::FormalParameters) -> Box<[Parameter]> {
    if let Some(rest) = &parameters.rest {
        ctx.unsupported(rest.span, "rest parameters");
    }
    parameters
        .items
        .iter()
        .map(|parameter| match &parameter.pattern.kind {
            ast::BindingPatternKind::AssignmentPattern(pattern) => {
                let name = ctx.binding_name(&pattern.left);
                let initializer = Some(ctx.compile_named(&pattern.right, &name));
                Parameter { name, initializer }
            }
            _ => Parameter {
                name: ctx.binding_name(&parameter.pattern),
                initializer: None,
            },
        })
        .collect()
}

/// Lowers a function body in a fresh var scope.
fn compile_function_body(
    ctx: &mut CompileContext,
    name: JsString,
    is_arrow: bool,
    parameters: &ast::FormalParameters,
    body: impl FnOnce(&mut CompileContext) -> Block,
) -> Rc<FunctionDefinition> {
    let outer_var_names = std::mem::take(&mut ctx.var_names);
    let parameters = compile_parameters(ctx, parameters);
    let body = body(ctx);
    let var_names = std::mem::replace(&mut ctx.var_names, outer_var_names)
        .into_iter()
        .filter(|name| !parameters.iter().any(|parameter| &parameter.name == name))
        .collect();
    Rc::new(FunctionDefinition {
        name,
        is_arrow,
        parameters,
        var_names,
        body,
    })
}

fn compile_function(
    ctx: &mut CompileContext,
    function: &ast::Function,
    name: Option<&str>,
) -> Rc<FunctionDefinition> {
    if function.r#async {
        ctx.unsupported(function.span, "async functions");
    }
    if function.generator {
        ctx.unsupported(function.span, "generator functions");
    }
    let name: JsString = match (name, &function.id) {
        (Some(name), _) => name.into(),
        (None, Some(id)) => id.name.as_str().into(),
        (None, None) => "".into(),
    };
    compile_function_body(ctx, name, false, &function.params, |ctx| {
        match &function.body {
            Some(body) => compile_statement_list(ctx, &body.statements),
            None => Block::default(),
        }
    })
}

fn compile_arrow_function(
    ctx: &mut CompileContext,
    arrow: &ast::ArrowFunctionExpression,
    name: &str,
) -> Rc<FunctionDefinition> {
    if arrow.r#async {
        ctx.unsupported(arrow.span, "async functions");
    }
    compile_function_body(ctx, name.into(), true, &arrow.params, |ctx| {
        if arrow.expression {
            // The body of a concise arrow function is a single expression
            // statement.
            let statements = match arrow.body.statements.first() {
                Some(ast::Statement::ExpressionStatement(statement)) => {
                    vec![Statement::Return(Some(statement.expression.compile(ctx)))]
                }
                _ => Vec::new(),
            };
            Block {
                statements: statements.into_boxed_slice(),
                ..Block::default()
            }
        } else {
            compile_statement_list(ctx, &arrow.body.statements)
        }
    })
}

fn compile_block(ctx: &mut CompileContext, block: &ast::BlockStatement) -> Block {
    compile_statement_list(ctx, &block.body)
}

impl CompileEvaluation for ast::Statement<'_> {
    type Output = Statement;

    fn compile(&self, ctx: &mut CompileContext) -> Statement {
        match self {
            ast::Statement::ExpressionStatement(statement) => {
                if let ast::Expression::AwaitExpression(expression) =
                    statement.expression.without_parentheses()
                {
                    await_outside_top_level(ctx, expression.span);
                }
                Statement::Expression(statement.expression.compile(ctx))
            }
            ast::Statement::VariableDeclaration(declaration) => {
                let (kind, declarations) = ctx.compile_declarators(declaration);
                Statement::Declaration { kind, declarations }
            }
            // Function declarations are hoisted to their scope.
            ast::Statement::FunctionDeclaration(_) | ast::Statement::EmptyStatement(_) => {
                Statement::Empty
            }
            ast::Statement::BlockStatement(block) => Statement::Block(compile_block(ctx, block)),
            ast::Statement::IfStatement(statement) => Statement::If {
                test: statement.test.compile(ctx),
                consequent: Box::new(statement.consequent.compile(ctx)),
                alternate: statement
                    .alternate
                    .as_ref()
                    .map(|alternate| Box::new(alternate.compile(ctx))),
            },
            ast::Statement::WhileStatement(statement) => Statement::While {
                test: statement.test.compile(ctx),
                body: Box::new(statement.body.compile(ctx)),
            },
            ast::Statement::DoWhileStatement(statement) => Statement::DoWhile {
                body: Box::new(statement.body.compile(ctx)),
                test: statement.test.compile(ctx),
            },
            ast::Statement::ForStatement(statement) => {
                let init = statement.init.as_ref().map(|init| match init {
                    ast::ForStatementInit::VariableDeclaration(declaration) => {
                        let (kind, declarations) = ctx.compile_declarators(declaration);
                        ForInit::Declaration { kind, declarations }
                    }
                    init => match init.as_expression() {
                        Some(expression) => ForInit::Expression(expression.compile(ctx)),
                        None => {
                            ctx.unsupported(init.span(), "for statement initializer");
                            ForInit::Expression(Expression::Literal(Value::Undefined))
                        }
                    },
                });
                Statement::For {
                    init,
                    test: statement.test.as_ref().map(|test| test.compile(ctx)),
                    update: statement.update.as_ref().map(|update| update.compile(ctx)),
                    body: Box::new(statement.body.compile(ctx)),
                }
            }
            ast::Statement::BreakStatement(statement) => {
                if statement.label.is_some() {
                    ctx.unsupported(statement.span, "labelled break");
                }
                Statement::Break
            }
            ast::Statement::ContinueStatement(statement) => {
                if statement.label.is_some() {
                    ctx.unsupported(statement.span, "labelled continue");
                }
                Statement::Continue
            }
            ast::Statement::ReturnStatement(statement) => Statement::Return(
                statement
                    .argument
                    .as_ref()
                    .map(|argument| argument.compile(ctx)),
            ),
            ast::Statement::ThrowStatement(statement) => {
                Statement::Throw(statement.argument.compile(ctx))
            }
            ast::Statement::TryStatement(statement) => Statement::Try {
                block: compile_block(ctx, &statement.block),
                handler: statement.handler.as_ref().map(|handler| CatchClause {
                    parameter: handler
                        .param
                        .as_ref()
                        .map(|parameter| ctx.binding_name(&parameter.pattern)),
                    body: compile_block(ctx, &handler.body),
                }),
                finalizer: statement
                    .finalizer
                    .as_ref()
                    .map(|finalizer| compile_block(ctx, finalizer)),
            },
            ast::Statement::ClassDeclaration(class) => {
                ctx.unsupported(class.span, "class declarations");
                Statement::Empty
            }
            ast::Statement::ForInStatement(statement) => {
                ctx.unsupported(statement.span, "for-in statements");
                Statement::Empty
            }
            ast::Statement::ForOfStatement(statement) => {
                ctx.unsupported(statement.span, "for-of statements");
                Statement::Empty
            }
            ast::Statement::LabeledStatement(statement) => {
                ctx.unsupported(statement.span, "labelled statements");
                Statement::Empty
            }
            ast::Statement::SwitchStatement(statement) => {
                ctx.unsupported(statement.span, "switch statements");
                Statement::Empty
            }
            ast::Statement::ImportDeclaration(declaration) => {
                ctx.error(declaration.span, "Import declarations may only appear at top level of a module");
                Statement::Empty
            }
            ast::Statement::ExportAllDeclaration(_)
            | ast::Statement::ExportDefaultDeclaration(_)
            | ast::Statement::ExportNamedDeclaration(_) => {
                ctx.error(self.span(), "Export declarations may only appear at top level of a module");
                Statement::Empty
            }
            statement => {
                ctx.unsupported(statement.span(), "statement");
                Statement::Empty
            }
        }
    }
}

fn await_outside_top_level(ctx: &mut CompileContext, span: Span) {
    ctx.error(
        span,
        "'await' is only supported in top-level statements of the form `await e;`, `let x = await e;` or `x = await e;`",
    );
}

impl CompileEvaluation for ast::Expression<'_> {
    type Output = Expression;

    fn compile(&self, ctx: &mut CompileContext) -> Expression {
        match self {
            ast::Expression::BooleanLiteral(literal) => Expression::Literal(literal.value.into()),
            ast::Expression::NullLiteral(_) => Expression::Literal(Value::Null),
            ast::Expression::NumericLiteral(literal) => Expression::Literal(literal.value.into()),
            ast::Expression::StringLiteral(literal) => {
                Expression::Literal(literal.value.as_str().into())
            }
            ast::Expression::TemplateLiteral(template) => {
                let quasis = template
                    .quasis
                    .iter()
                    .map(|quasi| match &quasi.value.cooked {
                        Some(cooked) => JsString::from(cooked.as_str()),
                        None => quasi.value.raw.as_str().into(),
                    })
                    .collect();
                let expressions = template
                    .expressions
                    .iter()
                    .map(|expression| expression.compile(ctx))
                    .collect();
                Expression::Template {
                    quasis,
                    expressions,
                }
            }
            ast::Expression::Identifier(identifier) => {
                Expression::Identifier(identifier.name.as_str().into())
            }
            ast::Expression::ThisExpression(_) => Expression::This,
            ast::Expression::ArrayExpression(array) => Expression::Array(
                array
                    .elements
                    .iter()
                    .map(|element| match element {
                        ast::ArrayExpressionElement::Elision(_) => {
                            Expression::Literal(Value::Undefined)
                        }
                        ast::ArrayExpressionElement::SpreadElement(spread) => {
                            ctx.unsupported(spread.span, "spread elements");
                            Expression::Literal(Value::Undefined)
                        }
                        element => match element.as_expression() {
                            Some(expression) => expression.compile(ctx),
                            None => Expression::Literal(Value::Undefined),
                        },
                    })
                    .collect(),
            ),
            ast::Expression::ObjectExpression(object) => {
                let mut properties = Vec::with_capacity(object.properties.len());
                for property in &object.properties {
                    let ast::ObjectPropertyKind::ObjectProperty(property) = property else {
                        ctx.unsupported(property.span(), "object spread");
                        continue;
                    };
                    if !matches!(property.kind, ast::PropertyKind::Init) {
                        ctx.unsupported(property.span, "getters and setters");
                        continue;
                    }
                    let key = compile_property_key(ctx, property);
                    let value = match &key {
                        PropertyKey::Static(name) => ctx.compile_named(&property.value, name),
                        PropertyKey::Computed(_) => property.value.compile(ctx),
                    };
                    properties.push((key, value));
                }
                Expression::Object(properties.into_boxed_slice())
            }
            ast::Expression::FunctionExpression(function) => {
                Expression::Function(compile_function(ctx, function, None))
            }
            ast::Expression::ArrowFunctionExpression(arrow) => {
                Expression::Function(compile_arrow_function(ctx, arrow, ""))
            }
            ast::Expression::UnaryExpression(expression) => {
                if expression.operator == UnaryOperator::Delete {
                    ctx.unsupported(expression.span, "delete operator");
                }
                Expression::Unary {
                    operator: expression.operator,
                    argument: Box::new(expression.argument.compile(ctx)),
                }
            }
            ast::Expression::BinaryExpression(expression) => Expression::Binary {
                operator: expression.operator,
                left: Box::new(expression.left.compile(ctx)),
                right: Box::new(expression.right.compile(ctx)),
            },
            ast::Expression::LogicalExpression(expression) => Expression::Logical {
                operator: expression.operator,
                left: Box::new(expression.left.compile(ctx)),
                right: Box::new(expression.right.compile(ctx)),
            },
            ast::Expression::ConditionalExpression(expression) => Expression::Conditional {
                test: Box::new(expression.test.compile(ctx)),
                consequent: Box::new(expression.consequent.compile(ctx)),
                alternate: Box::new(expression.alternate.compile(ctx)),
            },
            ast::Expression::AssignmentExpression(expression) => {
                let target = compile_assignment_target(ctx, &expression.left);
                let value = match &target {
                    AssignmentTarget::Identifier(name)
                        if matches!(
                            expression.operator,
                            AssignmentOperator::Assign
                                | AssignmentOperator::LogicalAnd
                                | AssignmentOperator::LogicalOr
                                | AssignmentOperator::LogicalNullish
                        ) =>
                    {
                        ctx.compile_named(&expression.right, name)
                    }
                    _ => expression.right.compile(ctx),
                };
                Expression::Assignment {
                    operator: expression.operator,
                    target,
                    value: Box::new(value),
                }
            }
            ast::Expression::UpdateExpression(expression) => Expression::Update {
                operator: expression.operator,
                prefix: expression.prefix,
                target: compile_simple_assignment_target(ctx, &expression.argument),
            },
            ast::Expression::SequenceExpression(expression) => Expression::Sequence(
                expression
                    .expressions
                    .iter()
                    .map(|expression| expression.compile(ctx))
                    .collect(),
            ),
            ast::Expression::CallExpression(call) => {
                if call.optional {
                    ctx.unsupported(call.span, "optional chaining");
                }
                Expression::Call {
                    callee: Box::new(call.callee.compile(ctx)),
                    arguments: compile_arguments(ctx, &call.arguments),
                }
            }
            ast::Expression::NewExpression(new) => Expression::New {
                callee: Box::new(new.callee.compile(ctx)),
                arguments: compile_arguments(ctx, &new.arguments),
            },
            ast::Expression::StaticMemberExpression(member) => {
                if member.optional {
                    ctx.unsupported(member.span, "optional chaining");
                }
                Expression::Member {
                    object: Box::new(member.object.compile(ctx)),
                    property: MemberProperty::Static(member.property.name.as_str().into()),
                }
            }
            ast::Expression::ComputedMemberExpression(member) => {
                if member.optional {
                    ctx.unsupported(member.span, "optional chaining");
                }
                Expression::Member {
                    object: Box::new(member.object.compile(ctx)),
                    property: MemberProperty::Computed(Box::new(member.expression.compile(ctx))),
                }
            }
            ast::Expression::ParenthesizedExpression(expression) => {
                expression.expression.compile(ctx)
            }
            ast::Expression::ImportExpression(import) => {
                Expression::ImportCall(Box::new(import.source.compile(ctx)))
            }
            ast::Expression::MetaProperty(meta)
                if meta.meta.name.as_str() == "import" && meta.property.name.as_str() == "meta" =>
            {
                Expression::ImportMeta
            }
            ast::Expression::AwaitExpression(expression) => {
                await_outside_top_level(ctx, expression.span);
                Expression::Literal(Value::Undefined)
            }
            ast::Expression::ChainExpression(expression) => {
                ctx.unsupported(expression.span, "optional chaining");
                Expression::Literal(Value::Undefined)
            }
            ast::Expression::ClassExpression(class) => {
                ctx.unsupported(class.span, "class expressions");
                Expression::Literal(Value::Undefined)
            }
            ast::Expression::TaggedTemplateExpression(expression) => {
                ctx.unsupported(expression.span, "tagged templates");
                Expression::Literal(Value::Undefined)
            }
            ast::Expression::RegExpLiteral(literal) => {
                ctx.unsupported(literal.span, "regular expressions");
                Expression::Literal(Value::Undefined)
            }
            ast::Expression::BigIntLiteral(literal) => {
                ctx.unsupported(literal.span, "BigInt literals");
                Expression::Literal(Value::Undefined)
            }
            expression => {
                ctx.unsupported(expression.span(), "expression");
                Expression::Literal(Value::Undefined)
            }
        }
    }
}

fn compile_property_key(ctx: &mut CompileContext, property: &ast::ObjectProperty) -> PropertyKey {
    if property.computed {
        if let Some(expression) = property.key.as_expression() {
            return PropertyKey::Computed(expression.compile(ctx));
        }
    }
    match &property.key {
        ast::PropertyKey::StaticIdentifier(identifier) => {
            PropertyKey::Static(identifier.name.as_str().into())
        }
        ast::PropertyKey::StringLiteral(literal) => PropertyKey::Static(literal.value.as_str().into()),
        ast::PropertyKey::NumericLiteral(literal) => {
            PropertyKey::Static(number_to_string(literal.value))
        }
        key => {
            ctx.unsupported(key.span(), "property key");
            PropertyKey::Static("".into())
        }
    }
}

fn compile_arguments(ctx: &mut CompileContext, arguments: &[ast::Argument]) -> Box<[Expression]> {
    arguments
        .iter()
        .map(|argument| match argument.as_expression() {
            Some(expression) => expression.compile(ctx),
            None => {
                ctx.unsupported(argument.span(), "spread arguments");
                Expression::Literal(Value::Undefined)
            }
        })
        .collect()
}

fn compile_assignment_target(ctx: &mut CompileContext, target: &ast::AssignmentTarget) -> AssignmentTarget {
    match target {
        ast::AssignmentTarget::AssignmentTargetIdentifier(identifier) => {
            AssignmentTarget::Identifier(identifier.name.as_str().into())
        }
        ast::AssignmentTarget::StaticMemberExpression(member) => AssignmentTarget::Member {
            object: Box::new(member.object.compile(ctx)),
            property: MemberProperty::Static(member.property.name.as_str().into()),
        },
        ast::AssignmentTarget::ComputedMemberExpression(member) => AssignmentTarget::Member {
            object: Box::new(member.object.compile(ctx)),
            property: MemberProperty::Computed(Box::new(member.expression.compile(ctx))),
        },
        target => {
            ctx.unsupported(target.span(), "assignment target");
            AssignmentTarget::Identifier("".into())
        }
    }
}

fn compile_simple_assignment_target(
    ctx: &mut CompileContext,
    target: &ast::SimpleAssignmentTarget,
) -> AssignmentTarget {
    match target {
        ast::SimpleAssignmentTarget::AssignmentTargetIdentifier(identifier) => {
            AssignmentTarget::Identifier(identifier.name.as_str().into())
        }
        ast::SimpleAssignmentTarget::StaticMemberExpression(member) => AssignmentTarget::Member {
            object: Box::new(member.object.compile(ctx)),
            property: MemberProperty::Static(member.property.name.as_str().into()),
        },
        ast::SimpleAssignmentTarget::ComputedMemberExpression(member) => AssignmentTarget::Member {
            object: Box::new(member.object.compile(ctx)),
            property: MemberProperty::Computed(Box::new(member.expression.compile(ctx))),
        },
        target => {
            ctx.unsupported(target.span(), "update target");
            AssignmentTarget::Identifier("".into())
        }
    }
}

/// Recognises the top-level statement forms that may suspend module
/// evaluation.
fn compile_top_level_await(ctx: &mut CompileContext, statement: &ast::Statement) -> Option<Statement> {
    match statement {
        ast::Statement::ExpressionStatement(statement) => {
            match statement.expression.without_parentheses() {
                ast::Expression::AwaitExpression(expression) => Some(Statement::Await {
                    target: AwaitTarget::Discard,
                    argument: expression.argument.compile(ctx),
                }),
                ast::Expression::AssignmentExpression(assignment)
                    if assignment.operator == AssignmentOperator::Assign =>
                {
                    let ast::AssignmentTarget::AssignmentTargetIdentifier(identifier) =
                        &assignment.left
                    else {
                        return None;
                    };
                    let ast::Expression::AwaitExpression(expression) =
                        assignment.right.without_parentheses()
                    else {
                        return None;
                    };
                    Some(Statement::Await {
                        target: AwaitTarget::Assignment(identifier.name.as_str().into()),
                        argument: expression.argument.compile(ctx),
                    })
                }
                _ => None,
            }
        }
        ast::Statement::VariableDeclaration(declaration) => compile_await_declaration(ctx, declaration),
        _ => None,
    }
}

fn compile_await_declaration(
    ctx: &mut CompileContext,
    declaration: &ast::VariableDeclaration,
) -> Option<Statement> {
    let [declarator] = declaration.declarations.as_slice() else {
        return None;
    };
    let Some(ast::Expression::AwaitExpression(expression)) =
        declarator.init.as_ref().map(|init| init.without_parentheses())
    else {
        return None;
    };
    let kind = declaration_kind(ctx, declaration);
    let name = ctx.binding_name(&declarator.id);
    if kind == DeclarationKind::Var {
        ctx.declare_var(&name);
    }
    Some(Statement::Await {
        target: AwaitTarget::Declaration { kind, name },
        argument: expression.argument.compile(ctx),
    })
}

/// Lowers the body of a module. Import and re-export declarations carry no
/// code and are skipped; their entries are collected by the module record.
pub(crate) fn compile_module(program: &ast::Program) -> Result<ModuleBody, Vec<OxcDiagnostic>> {
    let mut ctx = CompileContext::new();
    let mut scope = ScopeDeclarations::default();
    let mut statements = Vec::with_capacity(program.body.len());
    for statement in &program.body {
        match statement {
            ast::Statement::ImportDeclaration(_) | ast::Statement::ExportAllDeclaration(_) => {}
            ast::Statement::ExportNamedDeclaration(export) => {
                let Some(declaration) = &export.declaration else {
                    continue;
                };
                match declaration {
                    ast::Declaration::VariableDeclaration(declaration) => {
                        scope.add_lexical(&mut ctx, declaration);
                        let statement = compile_await_declaration(&mut ctx, declaration)
                            .unwrap_or_else(|| {
                                let (kind, declarations) = ctx.compile_declarators(declaration);
                                Statement::Declaration { kind, declarations }
                            });
                        statements.push(statement);
                    }
                    ast::Declaration::FunctionDeclaration(function) => {
                        if let Some(id) = &function.id {
                            scope.add_function(&mut ctx, id.name.as_str().into(), function, None);
                        }
                    }
                    declaration => ctx.unsupported(declaration.span(), "exported declaration"),
                }
            }
            ast::Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ast::ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                    match &function.id {
                        Some(id) => {
                            scope.add_function(&mut ctx, id.name.as_str().into(), function, None)
                        }
                        None => scope.add_function(
                            &mut ctx,
                            DEFAULT_BINDING_NAME.into(),
                            function,
                            Some("default"),
                        ),
                    }
                }
                ast::ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    ctx.unsupported(class.span, "class declarations");
                }
                declaration => {
                    let Some(expression) = declaration.as_expression() else {
                        ctx.unsupported(declaration.span(), "default export");
                        continue;
                    };
                    if scope.declare(&mut ctx, DEFAULT_BINDING_NAME.into(), export.span) {
                        scope.lexical_declarations.push(LexicalDeclaration {
                            name: DEFAULT_BINDING_NAME.into(),
                            is_const: false,
                        });
                    }
                    let initializer = ctx.compile_named(expression, "default");
                    statements.push(Statement::Declaration {
                        kind: DeclarationKind::Let,
                        declarations: Box::new([VariableDeclarator {
                            name: DEFAULT_BINDING_NAME.into(),
                            initializer: Some(initializer),
                        }]),
                    });
                }
            },
            statement => {
                scope.collect(&mut ctx, statement);
                let statement = compile_top_level_await(&mut ctx, statement)
                    .unwrap_or_else(|| statement.compile(&mut ctx));
                statements.push(statement);
            }
        }
    }
    for name in &ctx.var_names.clone() {
        if scope.names.contains(name) {
            ctx.error(program.span, format!("Identifier '{name}' has already been declared"));
        }
    }
    if !ctx.errors.is_empty() {
        return Err(ctx.errors);
    }
    Ok(ModuleBody {
        var_names: std::mem::take(&mut ctx.var_names).into_boxed_slice(),
        lexical_declarations: scope.lexical_declarations.into_boxed_slice(),
        functions: scope.functions.into_boxed_slice(),
        statements: statements.into_boxed_slice(),
    })
}

impl ModuleBody {
    /// ### \[\[HasTLA]]
    pub(crate) fn has_tla(&self) -> bool {
        self.statements
            .iter()
            .any(|statement| matches!(statement, Statement::Await { .. }))
    }

    /// Every name declared by the module body itself.
    pub(crate) fn declared_names(&self) -> impl Iterator<Item = &JsString> {
        self.var_names
            .iter()
            .chain(self.lexical_declarations.iter().map(|declaration| &declaration.name))
            .chain(self.functions.iter().map(|function| &function.binding_name))
    }
}

#[cfg(test)]
mod test {
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    use super::*;

    fn compile(source: &str) -> Result<ModuleBody, Vec<OxcDiagnostic>> {
        let allocator = Allocator::default();
        let result = Parser::new(&allocator, source, SourceType::default().with_module(true)).parse();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        compile_module(&result.program)
    }

    fn error_messages(source: &str) -> Vec<String> {
        let errors = compile(source).expect_err("expected early errors");
        errors.iter().map(|error| error.to_string()).collect()
    }

    #[test]
    fn hoisting() {
        let body = compile(
            "var a = 1; let b = 2; const c = 3; function d() { var inner; } if (a) { var e; let f; }",
        )
        .unwrap();
        assert_eq!(&*body.var_names, &["a".into(), "e".into()] as &[JsString]);
        let lexical: Vec<_> = body
            .lexical_declarations
            .iter()
            .map(|declaration| (&*declaration.name, declaration.is_const))
            .collect();
        assert_eq!(lexical, vec![("b", false), ("c", true)]);
        assert_eq!(body.functions.len(), 1);
        assert_eq!(&*body.functions[0].definition.var_names, &["inner".into()] as &[JsString]);
        assert!(!body.has_tla());
    }

    #[test]
    fn default_exports() {
        let body = compile("export default function () {}").unwrap();
        assert_eq!(&*body.functions[0].binding_name, DEFAULT_BINDING_NAME);
        assert_eq!(&*body.functions[0].definition.name, "default");

        let body = compile("export default 1 + 2;").unwrap();
        assert_eq!(&*body.lexical_declarations[0].name, DEFAULT_BINDING_NAME);
    }

    #[test]
    fn top_level_await_forms() {
        let body = compile("await 1; const x = await 2; let y; y = await 3; export var z = await 4;")
            .unwrap();
        assert!(body.has_tla());
        assert_eq!(
            body.statements
                .iter()
                .filter(|statement| matches!(statement, Statement::Await { .. }))
                .count(),
            4
        );
    }

    #[test]
    fn misplaced_await_is_an_early_error() {
        let messages = error_messages("const x = 1 + await 2;");
        assert!(messages[0].contains("'await' is only supported"));
    }

    #[test]
    fn unsupported_syntax_is_named() {
        let messages = error_messages("class A {}");
        assert_eq!(messages, vec!["Unsupported syntax: class declarations".to_string()]);
        let messages = error_messages("for (const x of []) {}");
        assert_eq!(messages, vec!["Unsupported syntax: for-of statements".to_string()]);
    }

    #[test]
    fn redeclaration() {
        let messages = error_messages("let a; const a = 1;");
        assert_eq!(messages, vec!["Identifier 'a' has already been declared".to_string()]);
        let messages = error_messages("let a; var a;");
        assert_eq!(messages, vec!["Identifier 'a' has already been declared".to_string()]);
    }

    #[test]
    fn named_evaluation() {
        let body = compile("const f = () => 1; let g = function () {};").unwrap();
        let names: Vec<_> = body
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Declaration { declarations, .. } => {
                    match &declarations[0].initializer {
                        Some(Expression::Function(definition)) => Some(definition.name.clone()),
                        _ => None,
                    }
                }
                _ => None,
            })
            .collect();
        assert_eq!(names, vec![JsString::from("f"), JsString::from("g")]);
    }
}
