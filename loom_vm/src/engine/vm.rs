// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tree-walking evaluation of lowered bodies.

use std::rc::Rc;

use oxc_syntax::operator::{
    AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};

use super::executable::{
    AssignmentTarget, Block, CatchClause, DeclarationKind, Expression, ForInit, FunctionDefinition,
    HoistedFunction, LexicalDeclaration, MemberProperty, PropertyKey, Statement,
    VariableDeclarator,
};
use crate::ecmascript::{
    builtins::PromiseCapability,
    execution::{
        Agent, Binding, Environment, ExceptionType, JsError, JsResult,
        environments::{get_identifier_value, put_identifier_value, resolve_binding},
    },
    scripts_and_modules::module::{
        get_import_meta, module_semantics::abstract_module_records::Module,
    },
    types::{
        Behaviour, BuiltinFunction, ECMAScriptFunction, FunctionKind, JsString, Object,
        ObjectKind, Value, array_index, to_property_key,
    },
};

/// ### [9.4 Execution Contexts](https://tc39.es/ecma262/#sec-execution-contexts)
#[derive(Debug, Clone)]
pub(crate) struct ExecutionContext {
    /// ### LexicalEnvironment
    pub(crate) environment: Environment,
    pub(crate) this_value: Value,
    /// ### ScriptOrModule
    pub(crate) script_or_module: Option<Module>,
}

impl ExecutionContext {
    fn with_environment(&self, environment: Environment) -> Self {
        Self {
            environment,
            this_value: self.this_value.clone(),
            script_or_module: self.script_or_module.clone(),
        }
    }
}

/// ### [6.2.4 The Completion Record Specification Type](https://tc39.es/ecma262/#sec-completion-record-specification-type)
///
/// Throw completions are carried by `Err`.
#[derive(Debug)]
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// The \[\[Call]] behaviour of a function object.
enum Callee {
    Builtin(Behaviour),
    PromiseResolve(PromiseCapability),
    PromiseReject(PromiseCapability),
    ECMAScript {
        definition: Rc<FunctionDefinition>,
        environment: Environment,
        this_value: Option<Value>,
        script_or_module: Option<Module>,
    },
}

fn callee(agent: &Agent, function: &Value) -> Option<Callee> {
    let object = function.as_object()?;
    let ObjectKind::Function(kind) = &agent[object].kind else {
        return None;
    };
    Some(match kind {
        FunctionKind::Builtin(BuiltinFunction::Behaviour(behaviour)) => Callee::Builtin(*behaviour),
        FunctionKind::Builtin(BuiltinFunction::PromiseResolve(capability)) => {
            Callee::PromiseResolve(*capability)
        }
        FunctionKind::Builtin(BuiltinFunction::PromiseReject(capability)) => {
            Callee::PromiseReject(*capability)
        }
        FunctionKind::ECMAScript(function) => Callee::ECMAScript {
            definition: function.definition.clone(),
            environment: function.environment,
            this_value: function.this_value.clone(),
            script_or_module: function.script_or_module.clone(),
        },
    })
}

fn not_a_function(agent: &mut Agent, what: &str) -> JsError {
    agent.throw_exception(ExceptionType::TypeError, format!("{what} is not a function"))
}

/// ### [7.3.14 Call ( F, V \[ , argumentsList \] )](https://tc39.es/ecma262/#sec-call)
pub(crate) fn call_function(
    agent: &mut Agent,
    function: &Value,
    this_value: Value,
    arguments: &[Value],
) -> JsResult<Value> {
    let Some(callee) = callee(agent, function) else {
        let what = function.string_repr(agent);
        return Err(not_a_function(agent, &what));
    };
    match callee {
        Callee::Builtin(Behaviour::Regular(behaviour)) => behaviour(agent, this_value, arguments),
        Callee::Builtin(Behaviour::Constructor(behaviour)) => {
            behaviour(agent, this_value, arguments, None)
        }
        Callee::PromiseResolve(capability) => {
            capability.resolve(agent, arguments.first().cloned().unwrap_or_default());
            Ok(Value::Undefined)
        }
        Callee::PromiseReject(capability) => {
            capability.reject(agent, arguments.first().cloned().unwrap_or_default());
            Ok(Value::Undefined)
        }
        Callee::ECMAScript {
            definition,
            environment,
            this_value: lexical_this,
            script_or_module,
        } => {
            let this_value = lexical_this.unwrap_or(this_value);
            ordinary_call_evaluate_body(
                agent,
                &definition,
                environment,
                this_value,
                script_or_module,
                arguments,
            )
        }
    }
}

/// ### [7.3.15 Construct ( F \[ , argumentsList \[ , newTarget \] \] )](https://tc39.es/ecma262/#sec-construct)
pub(crate) fn construct(agent: &mut Agent, constructor: &Value, arguments: &[Value]) -> JsResult<Value> {
    let not_a_constructor = |agent: &mut Agent| {
        let what = constructor.string_repr(agent);
        agent.throw_exception(ExceptionType::TypeError, format!("{what} is not a constructor"))
    };
    let Some(object) = constructor.as_object() else {
        return Err(not_a_constructor(agent));
    };
    match callee(agent, constructor) {
        Some(Callee::Builtin(Behaviour::Constructor(behaviour))) => {
            behaviour(agent, Value::Undefined, arguments, Some(object))
        }
        Some(Callee::ECMAScript {
            definition,
            environment,
            this_value: None,
            script_or_module,
        }) => {
            // ### [10.1.13 OrdinaryCreateFromConstructor ( constructor, intrinsicDefaultProto \[ , internalSlotsList \] )](https://tc39.es/ecma262/#sec-ordinarycreatefromconstructor)
            let prototype = match object.get(agent, "prototype")? {
                Value::Object(prototype) => prototype,
                _ => agent.realm.intrinsics.object_prototype,
            };
            let this_object = Object::create(agent, Some(prototype), ObjectKind::Ordinary);
            let result = ordinary_call_evaluate_body(
                agent,
                &definition,
                environment,
                Value::Object(this_object),
                script_or_module,
                arguments,
            )?;
            Ok(match result {
                Value::Object(_) => result,
                _ => Value::Object(this_object),
            })
        }
        _ => Err(not_a_constructor(agent)),
    }
}

/// ### [10.2.1.4 OrdinaryCallEvaluateBody ( F, argumentsList )](https://tc39.es/ecma262/#sec-ordinarycallevaluatebody)
fn ordinary_call_evaluate_body(
    agent: &mut Agent,
    definition: &FunctionDefinition,
    environment: Environment,
    this_value: Value,
    script_or_module: Option<Module>,
    arguments: &[Value],
) -> JsResult<Value> {
    agent.check_interrupt()?;
    if agent.call_depth >= agent.options.max_call_depth {
        return Err(agent.throw_exception(
            ExceptionType::RangeError,
            "Maximum call stack size exceeded",
        ));
    }
    agent.call_depth += 1;
    let result = function_declaration_instantiation_and_body(
        agent,
        definition,
        environment,
        this_value,
        script_or_module,
        arguments,
    );
    agent.call_depth -= 1;
    result
}

fn function_declaration_instantiation_and_body(
    agent: &mut Agent,
    definition: &FunctionDefinition,
    environment: Environment,
    this_value: Value,
    script_or_module: Option<Module>,
    arguments: &[Value],
) -> JsResult<Value> {
    // ### [10.2.11 FunctionDeclarationInstantiation ( func, argumentsList )](https://tc39.es/ecma262/#sec-functiondeclarationinstantiation)
    let env = Environment::new_declarative(agent, Some(environment));
    let ctx = ExecutionContext {
        environment: env,
        this_value,
        script_or_module,
    };
    for (index, parameter) in definition.parameters.iter().enumerate() {
        let mut value = arguments.get(index).cloned().unwrap_or_default();
        if value.is_undefined() {
            if let Some(initializer) = &parameter.initializer {
                value = evaluate_expression(agent, &ctx, initializer)?;
            }
        }
        env.create_binding(agent, parameter.name.clone(), Binding::Mutable(Some(value)));
    }
    for name in definition.var_names.iter() {
        if !env.has_own_binding(agent, name) {
            env.create_binding(agent, name.clone(), Binding::Mutable(Some(Value::Undefined)));
        }
    }
    block_declaration_instantiation(agent, &ctx, env, &definition.body);
    match evaluate_statements(agent, &ctx, &definition.body.statements)? {
        Completion::Return(value) => Ok(value),
        _ => Ok(Value::Undefined),
    }
}

/// ### [10.2.1.1 InstantiateOrdinaryFunctionObject ( functionObject, env, privateEnv )](https://tc39.es/ecma262/#sec-runtime-semantics-instantiateordinaryfunctionobject)
pub(crate) fn instantiate_function_object(
    agent: &mut Agent,
    definition: &Rc<FunctionDefinition>,
    environment: Environment,
    this_value: Option<Value>,
    script_or_module: Option<Module>,
) -> Object {
    let name = definition.name.clone();
    Object::create_ecmascript_function(
        agent,
        ECMAScriptFunction {
            definition: definition.clone(),
            environment,
            this_value,
            script_or_module,
        },
        &name,
    )
}

/// Creates the let and const bindings of a scope in TDZ.
pub(crate) fn create_lexical_bindings(
    agent: &mut Agent,
    env: Environment,
    declarations: &[LexicalDeclaration],
) {
    for declaration in declarations {
        let binding = if declaration.is_const {
            Binding::Immutable(None)
        } else {
            Binding::Mutable(None)
        };
        env.create_binding(agent, declaration.name.clone(), binding);
    }
}

/// Creates and initializes the hoisted functions of a scope.
pub(crate) fn instantiate_hoisted_functions(
    agent: &mut Agent,
    env: Environment,
    script_or_module: Option<&Module>,
    functions: &[HoistedFunction],
) {
    for function in functions {
        let object = instantiate_function_object(
            agent,
            &function.definition,
            env,
            None,
            script_or_module.cloned(),
        );
        env.create_binding(
            agent,
            function.binding_name.clone(),
            Binding::Mutable(Some(Value::Object(object))),
        );
    }
}

/// ### [14.2.3 BlockDeclarationInstantiation ( code, env )](https://tc39.es/ecma262/#sec-blockdeclarationinstantiation)
fn block_declaration_instantiation(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    env: Environment,
    block: &Block,
) {
    create_lexical_bindings(agent, env, &block.lexical_declarations);
    instantiate_hoisted_functions(agent, env, ctx.script_or_module.as_ref(), &block.functions);
}

fn evaluate_block(agent: &mut Agent, ctx: &ExecutionContext, block: &Block) -> JsResult<Completion> {
    if !block.has_declarations() {
        return evaluate_statements(agent, ctx, &block.statements);
    }
    let env = Environment::new_declarative(agent, Some(ctx.environment));
    let block_ctx = ctx.with_environment(env);
    block_declaration_instantiation(agent, &block_ctx, env, block);
    evaluate_statements(agent, &block_ctx, &block.statements)
}

pub(crate) fn evaluate_statements(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    statements: &[Statement],
) -> JsResult<Completion> {
    for statement in statements {
        match evaluate_statement(agent, ctx, statement)? {
            Completion::Normal => {}
            completion => return Ok(completion),
        }
    }
    Ok(Completion::Normal)
}

/// Initializes a `let` or `const` binding in the innermost scope declaring
/// it.
pub(crate) fn initialize_lexical_binding(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    name: &str,
    value: Value,
) {
    let env = resolve_binding(agent, ctx.environment, name)
        .expect("Lexical declaration without a binding");
    env.initialize_binding(agent, name, value);
}

fn evaluate_declarations(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    kind: DeclarationKind,
    declarations: &[VariableDeclarator],
) -> JsResult<()> {
    for declarator in declarations {
        let value = match &declarator.initializer {
            Some(initializer) => Some(evaluate_expression(agent, ctx, initializer)?),
            None => None,
        };
        match (kind, value) {
            // `var x;` does not touch the binding.
            (DeclarationKind::Var, None) => {}
            (DeclarationKind::Var, Some(value)) => {
                put_identifier_value(agent, ctx.environment, &declarator.name, value)?
            }
            (_, value) => {
                initialize_lexical_binding(agent, ctx, &declarator.name, value.unwrap_or_default())
            }
        }
    }
    Ok(())
}

/// Loop bodies consume break and continue completions.
enum LoopControl {
    Next,
    Exit(Completion),
}

fn loop_body(agent: &mut Agent, ctx: &ExecutionContext, body: &Statement) -> JsResult<LoopControl> {
    agent.check_interrupt()?;
    Ok(match evaluate_statement(agent, ctx, body)? {
        Completion::Normal | Completion::Continue => LoopControl::Next,
        Completion::Break => LoopControl::Exit(Completion::Normal),
        completion @ Completion::Return(_) => LoopControl::Exit(completion),
    })
}

/// ### [14.7.4.4 CreatePerIterationEnvironment ( perIterationBindings )](https://tc39.es/ecma262/#sec-createperiterationenvironment)
fn create_per_iteration_environment(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    per_iteration_bindings: &[JsString],
) -> JsResult<ExecutionContext> {
    if per_iteration_bindings.is_empty() {
        return Ok(ctx.clone());
    }
    let last_iteration_env = ctx.environment;
    let outer = last_iteration_env.outer(agent);
    let this_iteration_env = Environment::new_declarative(agent, outer);
    for name in per_iteration_bindings {
        let value = last_iteration_env.get_binding_value(agent, name)?;
        this_iteration_env.create_binding(agent, name.clone(), Binding::Mutable(value));
    }
    Ok(ctx.with_environment(this_iteration_env))
}

/// ### [14.7.4.2 Runtime Semantics: ForLoopEvaluation](https://tc39.es/ecma262/#sec-runtime-semantics-forloopevaluation)
fn evaluate_for_statement(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    init: Option<&ForInit>,
    test: Option<&Expression>,
    update: Option<&Expression>,
    body: &Statement,
) -> JsResult<Completion> {
    let mut ctx = ctx.clone();
    let mut per_iteration_bindings: Vec<JsString> = Vec::new();
    match init {
        Some(ForInit::Declaration { kind, declarations }) if *kind != DeclarationKind::Var => {
            let loop_env = Environment::new_declarative(agent, Some(ctx.environment));
            for declarator in declarations.iter() {
                let binding = if *kind == DeclarationKind::Const {
                    Binding::Immutable(None)
                } else {
                    per_iteration_bindings.push(declarator.name.clone());
                    Binding::Mutable(None)
                };
                loop_env.create_binding(agent, declarator.name.clone(), binding);
            }
            ctx = ctx.with_environment(loop_env);
            evaluate_declarations(agent, &ctx, *kind, declarations)?;
        }
        Some(ForInit::Declaration { kind, declarations }) => {
            evaluate_declarations(agent, &ctx, *kind, declarations)?;
        }
        Some(ForInit::Expression(expression)) => {
            evaluate_expression(agent, &ctx, expression)?;
        }
        None => {}
    }
    // ### [14.7.4.3 ForBodyEvaluation ( test, increment, stmt, perIterationBindings, labelSet )](https://tc39.es/ecma262/#sec-forbodyevaluation)
    ctx = create_per_iteration_environment(agent, &ctx, &per_iteration_bindings)?;
    loop {
        if let Some(test) = test {
            if !evaluate_expression(agent, &ctx, test)?.to_boolean() {
                return Ok(Completion::Normal);
            }
        }
        if let LoopControl::Exit(completion) = loop_body(agent, &ctx, body)? {
            return Ok(completion);
        }
        ctx = create_per_iteration_environment(agent, &ctx, &per_iteration_bindings)?;
        if let Some(update) = update {
            evaluate_expression(agent, &ctx, update)?;
        }
    }
}

/// ### [14.15.3 Runtime Semantics: Evaluation](https://tc39.es/ecma262/#sec-try-statement-runtime-semantics-evaluation)
fn evaluate_try_statement(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    block: &Block,
    handler: Option<&CatchClause>,
    finalizer: Option<&Block>,
) -> JsResult<Completion> {
    let mut result = evaluate_block(agent, ctx, block);
    // Interrupts cannot be caught.
    let thrown = match &result {
        Err(error) if !error.is_interrupt() => Some(error.value().clone()),
        _ => None,
    };
    if let (Some(thrown), Some(handler)) = (thrown, handler) {
        // ### [14.15.2 Runtime Semantics: CatchClauseEvaluation](https://tc39.es/ecma262/#sec-runtime-semantics-catchclauseevaluation)
        let catch_env = Environment::new_declarative(agent, Some(ctx.environment));
        if let Some(parameter) = &handler.parameter {
            catch_env.create_binding(agent, parameter.clone(), Binding::Mutable(Some(thrown)));
        }
        result = evaluate_block(agent, &ctx.with_environment(catch_env), &handler.body);
    }
    if let Some(finalizer) = finalizer {
        if result.as_ref().is_err_and(JsError::is_interrupt) {
            return result;
        }
        match evaluate_block(agent, ctx, finalizer)? {
            Completion::Normal => {}
            completion => return Ok(completion),
        }
    }
    result
}

pub(crate) fn evaluate_statement(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    statement: &Statement,
) -> JsResult<Completion> {
    match statement {
        Statement::Expression(expression) => {
            evaluate_expression(agent, ctx, expression)?;
        }
        Statement::Declaration { kind, declarations } => {
            evaluate_declarations(agent, ctx, *kind, declarations)?;
        }
        Statement::Block(block) => return evaluate_block(agent, ctx, block),
        Statement::If {
            test,
            consequent,
            alternate,
        } => {
            if evaluate_expression(agent, ctx, test)?.to_boolean() {
                return evaluate_statement(agent, ctx, consequent);
            } else if let Some(alternate) = alternate {
                return evaluate_statement(agent, ctx, alternate);
            }
        }
        Statement::While { test, body } => {
            while evaluate_expression(agent, ctx, test)?.to_boolean() {
                if let LoopControl::Exit(completion) = loop_body(agent, ctx, body)? {
                    return Ok(completion);
                }
            }
        }
        Statement::DoWhile { body, test } => loop {
            if let LoopControl::Exit(completion) = loop_body(agent, ctx, body)? {
                return Ok(completion);
            }
            if !evaluate_expression(agent, ctx, test)?.to_boolean() {
                break;
            }
        },
        Statement::For {
            init,
            test,
            update,
            body,
        } => {
            return evaluate_for_statement(
                agent,
                ctx,
                init.as_ref(),
                test.as_ref(),
                update.as_ref(),
                body,
            );
        }
        Statement::Break => return Ok(Completion::Break),
        Statement::Continue => return Ok(Completion::Continue),
        Statement::Return(argument) => {
            let value = match argument {
                Some(argument) => evaluate_expression(agent, ctx, argument)?,
                None => Value::Undefined,
            };
            return Ok(Completion::Return(value));
        }
        Statement::Throw(argument) => {
            let value = evaluate_expression(agent, ctx, argument)?;
            return Err(JsError::new(value));
        }
        Statement::Try {
            block,
            handler,
            finalizer,
        } => return evaluate_try_statement(agent, ctx, block, handler.as_ref(), finalizer.as_ref()),
        Statement::Empty => {}
        Statement::Await { .. } => {
            unreachable!("Top-level await statement outside of module evaluation")
        }
    }
    Ok(Completion::Normal)
}

/// GetValue of a property reference with base `base`.
pub(crate) fn get_property(agent: &mut Agent, base: &Value, key: &str) -> JsResult<Value> {
    match base {
        Value::Object(object) => object.get(agent, key),
        Value::String(string) => Ok(match key {
            "length" => Value::Number(string.encode_utf16().count() as f64),
            _ => match array_index(key) {
                Some(index) => string
                    .encode_utf16()
                    .nth(index)
                    .map_or(Value::Undefined, |unit| {
                        Value::from(String::from_utf16_lossy(&[unit]))
                    }),
                None => Value::Undefined,
            },
        }),
        Value::Undefined | Value::Null => {
            let base = base.string_repr(agent);
            Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot read properties of {base} (reading '{key}')"),
            ))
        }
        Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
    }
}

/// PutValue of a property reference with base `base`.
fn set_property(agent: &mut Agent, base: &Value, key: &str, value: Value) -> JsResult<()> {
    match base {
        Value::Object(object) => object.set(agent, key, value),
        _ => {
            let base = base.string_repr(agent);
            Err(agent.throw_exception(
                ExceptionType::TypeError,
                format!("Cannot set properties of {base} (setting '{key}')"),
            ))
        }
    }
}

/// An evaluated assignment target.
enum Reference {
    Identifier(JsString),
    Property { base: Value, key: JsString },
}

fn evaluate_member_key(agent: &mut Agent, ctx: &ExecutionContext, property: &MemberProperty) -> JsResult<JsString> {
    match property {
        MemberProperty::Static(name) => Ok(name.clone()),
        MemberProperty::Computed(expression) => {
            let key = evaluate_expression(agent, ctx, expression)?;
            to_property_key(agent, &key)
        }
    }
}

fn evaluate_reference(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    target: &AssignmentTarget,
) -> JsResult<Reference> {
    match target {
        AssignmentTarget::Identifier(name) => Ok(Reference::Identifier(name.clone())),
        AssignmentTarget::Member { object, property } => {
            let base = evaluate_expression(agent, ctx, object)?;
            let key = evaluate_member_key(agent, ctx, property)?;
            Ok(Reference::Property { base, key })
        }
    }
}

impl Reference {
    fn get_value(&self, agent: &mut Agent, ctx: &ExecutionContext) -> JsResult<Value> {
        match self {
            Reference::Identifier(name) => get_identifier_value(agent, ctx.environment, name),
            Reference::Property { base, key } => get_property(agent, base, key),
        }
    }

    fn put_value(&self, agent: &mut Agent, ctx: &ExecutionContext, value: Value) -> JsResult<()> {
        match self {
            Reference::Identifier(name) => put_identifier_value(agent, ctx.environment, name, value),
            Reference::Property { base, key } => set_property(agent, base, key, value),
        }
    }
}

/// ### [7.1.6 ToInt32 ( argument )](https://tc39.es/ecma262/#sec-toint32)
fn to_int32(number: f64) -> i32 {
    to_uint32(number) as i32
}

/// ### [7.1.7 ToUint32 ( argument )](https://tc39.es/ecma262/#sec-touint32)
fn to_uint32(number: f64) -> u32 {
    if !number.is_finite() {
        return 0;
    }
    number.trunc().rem_euclid(4294967296.0) as u32
}

/// ### [7.2.13 IsLessThan ( x, y, LeftFirst )](https://tc39.es/ecma262/#sec-islessthan)
///
/// Returns None for undefined, when either operand is NaN.
fn is_less_than(agent: &mut Agent, x: &Value, y: &Value) -> JsResult<Option<bool>> {
    if let (Value::String(x), Value::String(y)) = (x, y) {
        return Ok(Some(x.encode_utf16().lt(y.encode_utf16())));
    }
    let x = x.to_number(agent)?;
    let y = y.to_number(agent)?;
    if x.is_nan() || y.is_nan() {
        return Ok(None);
    }
    Ok(Some(x < y))
}

/// ### [13.15.3 ApplyStringOrNumericBinaryOperator ( lval, opText, rval )](https://tc39.es/ecma262/#sec-applystringornumericbinaryoperator)
///
/// Also covers the relational and equality operators.
pub(crate) fn apply_binary_operator(
    agent: &mut Agent,
    operator: BinaryOperator,
    left: Value,
    right: Value,
) -> JsResult<Value> {
    let numeric = |agent: &mut Agent, f: fn(f64, f64) -> f64| -> JsResult<Value> {
        let left = left.to_number(agent)?;
        let right = right.to_number(agent)?;
        Ok(Value::Number(f(left, right)))
    };
    Ok(match operator {
        BinaryOperator::Addition => {
            // Objects are converted with ToString: there is no valueOf.
            if matches!(left, Value::String(_) | Value::Object(_))
                || matches!(right, Value::String(_) | Value::Object(_))
            {
                let left = left.to_string(agent)?;
                let right = right.to_string(agent)?;
                Value::from(format!("{left}{right}"))
            } else {
                return numeric(agent, |a, b| a + b);
            }
        }
        BinaryOperator::Subtraction => return numeric(agent, |a, b| a - b),
        BinaryOperator::Multiplication => return numeric(agent, |a, b| a * b),
        BinaryOperator::Division => return numeric(agent, |a, b| a / b),
        BinaryOperator::Remainder => return numeric(agent, |a, b| a % b),
        BinaryOperator::Exponential => return numeric(agent, f64::powf),
        BinaryOperator::ShiftLeft => {
            return numeric(agent, |a, b| f64::from(to_int32(a).wrapping_shl(to_uint32(b) & 31)));
        }
        BinaryOperator::ShiftRight => {
            return numeric(agent, |a, b| f64::from(to_int32(a).wrapping_shr(to_uint32(b) & 31)));
        }
        BinaryOperator::ShiftRightZeroFill => {
            return numeric(agent, |a, b| {
                f64::from(to_uint32(a).wrapping_shr(to_uint32(b) & 31))
            });
        }
        BinaryOperator::BitwiseAnd => {
            return numeric(agent, |a, b| f64::from(to_int32(a) & to_int32(b)));
        }
        BinaryOperator::BitwiseOR => {
            return numeric(agent, |a, b| f64::from(to_int32(a) | to_int32(b)));
        }
        BinaryOperator::BitwiseXOR => {
            return numeric(agent, |a, b| f64::from(to_int32(a) ^ to_int32(b)));
        }
        BinaryOperator::LessThan => Value::Boolean(is_less_than(agent, &left, &right)? == Some(true)),
        BinaryOperator::GreaterThan => {
            Value::Boolean(is_less_than(agent, &right, &left)? == Some(true))
        }
        BinaryOperator::LessEqualThan => {
            Value::Boolean(is_less_than(agent, &right, &left)? == Some(false))
        }
        BinaryOperator::GreaterEqualThan => {
            Value::Boolean(is_less_than(agent, &left, &right)? == Some(false))
        }
        BinaryOperator::Equality => Value::Boolean(left.is_loosely_equal(agent, &right)?),
        BinaryOperator::Inequality => Value::Boolean(!left.is_loosely_equal(agent, &right)?),
        BinaryOperator::StrictEquality => Value::Boolean(left.is_strictly_equal(&right)),
        BinaryOperator::StrictInequality => Value::Boolean(!left.is_strictly_equal(&right)),
        BinaryOperator::In => {
            let Some(object) = right.as_object() else {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    "Cannot use 'in' operator to search for a key in a non-object",
                ));
            };
            let key = to_property_key(agent, &left)?;
            Value::Boolean(object.has_property(agent, &key))
        }
        BinaryOperator::Instanceof => {
            let Some(constructor) = right.as_object().filter(|object| object.is_callable(agent))
            else {
                return Err(agent.throw_exception(
                    ExceptionType::TypeError,
                    "Right-hand side of 'instanceof' is not callable",
                ));
            };
            Value::Boolean(constructor.ordinary_has_instance(agent, &left)?)
        }
    })
}

fn evaluate_arguments(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    arguments: &[Expression],
) -> JsResult<Vec<Value>> {
    arguments
        .iter()
        .map(|argument| evaluate_expression(agent, ctx, argument))
        .collect()
}

/// Describes a callee for "is not a function" errors.
fn callee_description(callee: &Expression) -> Option<JsString> {
    match callee {
        Expression::Identifier(name) => Some(name.clone()),
        Expression::Member {
            object,
            property: MemberProperty::Static(name),
        } => Some(match callee_description(object) {
            Some(object) => format!("{object}.{name}").into(),
            None => name.clone(),
        }),
        Expression::This => Some("this".into()),
        _ => None,
    }
}

/// ### [13.3.10.1 Runtime Semantics: Evaluation](https://tc39.es/ecma262/#sec-import-call-runtime-semantics-evaluation)
fn evaluate_import_call(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    specifier: &Expression,
) -> JsResult<Value> {
    // 1. Let referrer be GetActiveScriptOrModule().
    let referrer = ctx.script_or_module.clone();
    // 3. Let specifier be ? Evaluation of specifierExpression.
    // 4. Let specifierString be ? GetValue(specifier).
    let specifier = evaluate_expression(agent, ctx, specifier)?;
    // 5. Let promiseCapability be ! NewPromiseCapability(%Promise%).
    let capability = PromiseCapability::new(agent);
    // 6. Let specifierString be Completion(ToString(specifier)).
    // 7. IfAbruptRejectPromise(specifierString, promiseCapability).
    let specifier = match specifier.to_string(agent) {
        Ok(specifier) => specifier,
        Err(error) if error.is_interrupt() => return Err(error),
        Err(error) => {
            capability.reject(agent, error.into_value());
            return Ok(capability.promise().into());
        }
    };
    // 8. Perform HostLoadImportedModule(referrer, specifierString, empty, promiseCapability).
    let host_hooks = agent.host_hooks;
    host_hooks.import_module_dynamically(agent, referrer, specifier, capability);
    // 9. Return promiseCapability.[[Promise]].
    Ok(capability.promise().into())
}

pub(crate) fn evaluate_expression(
    agent: &mut Agent,
    ctx: &ExecutionContext,
    expression: &Expression,
) -> JsResult<Value> {
    match expression {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Identifier(name) => get_identifier_value(agent, ctx.environment, name),
        Expression::This => Ok(ctx.this_value.clone()),
        Expression::Template {
            quasis,
            expressions,
        } => {
            let mut result = String::new();
            for (index, quasi) in quasis.iter().enumerate() {
                result.push_str(quasi);
                if let Some(expression) = expressions.get(index) {
                    let value = evaluate_expression(agent, ctx, expression)?;
                    result.push_str(&value.to_string(agent)?);
                }
            }
            Ok(Value::from(result))
        }
        Expression::Array(elements) => {
            let elements = evaluate_arguments(agent, ctx, elements)?;
            Ok(Object::create_array(agent, elements).into())
        }
        Expression::Object(properties) => {
            let object = Object::create_ordinary(agent);
            for (key, value) in properties.iter() {
                let key = match key {
                    PropertyKey::Static(key) => key.clone(),
                    PropertyKey::Computed(expression) => {
                        let key = evaluate_expression(agent, ctx, expression)?;
                        to_property_key(agent, &key)?
                    }
                };
                let value = evaluate_expression(agent, ctx, value)?;
                object.define_own(&mut agent.heap, &key, value);
            }
            Ok(object.into())
        }
        Expression::Function(definition) => {
            let this_value = definition.is_arrow.then(|| ctx.this_value.clone());
            Ok(instantiate_function_object(
                agent,
                definition,
                ctx.environment,
                this_value,
                ctx.script_or_module.clone(),
            )
            .into())
        }
        Expression::Unary { operator, argument } => {
            if let (UnaryOperator::Typeof, Expression::Identifier(name)) =
                (operator, argument.as_ref())
            {
                // typeof of an unresolvable reference does not throw.
                if resolve_binding(agent, ctx.environment, name).is_none() {
                    return Ok(Value::from("undefined"));
                }
            }
            let value = evaluate_expression(agent, ctx, argument)?;
            Ok(match operator {
                UnaryOperator::LogicalNot => Value::Boolean(!value.to_boolean()),
                UnaryOperator::UnaryNegation => Value::Number(-value.to_number(agent)?),
                UnaryOperator::UnaryPlus => Value::Number(value.to_number(agent)?),
                UnaryOperator::BitwiseNot => {
                    Value::Number(f64::from(!to_int32(value.to_number(agent)?)))
                }
                UnaryOperator::Typeof => Value::from(value.type_of(agent)),
                UnaryOperator::Void => Value::Undefined,
                UnaryOperator::Delete => unreachable!("delete is rejected by the compiler"),
            })
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => {
            let left = evaluate_expression(agent, ctx, left)?;
            let right = evaluate_expression(agent, ctx, right)?;
            apply_binary_operator(agent, *operator, left, right)
        }
        Expression::Logical {
            operator,
            left,
            right,
        } => {
            let left = evaluate_expression(agent, ctx, left)?;
            let short_circuit = match operator {
                LogicalOperator::And => !left.to_boolean(),
                LogicalOperator::Or => left.to_boolean(),
                LogicalOperator::Coalesce => !left.is_nullish(),
            };
            if short_circuit {
                return Ok(left);
            }
            evaluate_expression(agent, ctx, right)
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate_expression(agent, ctx, test)?.to_boolean() {
                evaluate_expression(agent, ctx, consequent)
            } else {
                evaluate_expression(agent, ctx, alternate)
            }
        }
        Expression::Assignment {
            operator,
            target,
            value,
        } => {
            // ### [13.15.2 Runtime Semantics: Evaluation](https://tc39.es/ecma262/#sec-assignment-operators-runtime-semantics-evaluation)
            let reference = evaluate_reference(agent, ctx, target)?;
            let value = match operator {
                AssignmentOperator::Assign => evaluate_expression(agent, ctx, value)?,
                AssignmentOperator::LogicalAnd
                | AssignmentOperator::LogicalOr
                | AssignmentOperator::LogicalNullish => {
                    let current = reference.get_value(agent, ctx)?;
                    let short_circuit = match operator {
                        AssignmentOperator::LogicalAnd => !current.to_boolean(),
                        AssignmentOperator::LogicalOr => current.to_boolean(),
                        _ => !current.is_nullish(),
                    };
                    if short_circuit {
                        return Ok(current);
                    }
                    evaluate_expression(agent, ctx, value)?
                }
                operator => {
                    let current = reference.get_value(agent, ctx)?;
                    let value = evaluate_expression(agent, ctx, value)?;
                    let binary_operator = operator
                        .to_binary_operator()
                        .expect("Compound assignment without a binary operator");
                    apply_binary_operator(agent, binary_operator, current, value)?
                }
            };
            reference.put_value(agent, ctx, value.clone())?;
            Ok(value)
        }
        Expression::Update {
            operator,
            prefix,
            target,
        } => {
            let reference = evaluate_reference(agent, ctx, target)?;
            let old_value = reference.get_value(agent, ctx)?.to_number(agent)?;
            let new_value = match operator {
                UpdateOperator::Increment => old_value + 1.0,
                UpdateOperator::Decrement => old_value - 1.0,
            };
            reference.put_value(agent, ctx, Value::Number(new_value))?;
            Ok(Value::Number(if *prefix { new_value } else { old_value }))
        }
        Expression::Sequence(expressions) => {
            let mut value = Value::Undefined;
            for expression in expressions.iter() {
                value = evaluate_expression(agent, ctx, expression)?;
            }
            Ok(value)
        }
        Expression::Call { callee, arguments } => {
            let (function, this_value) = match callee.as_ref() {
                Expression::Member { object, property } => {
                    let base = evaluate_expression(agent, ctx, object)?;
                    let key = evaluate_member_key(agent, ctx, property)?;
                    (get_property(agent, &base, &key)?, base)
                }
                callee => (evaluate_expression(agent, ctx, callee)?, Value::Undefined),
            };
            let arguments = evaluate_arguments(agent, ctx, arguments)?;
            if !function.is_callable(agent) {
                let what = match callee_description(callee) {
                    Some(what) => what,
                    None => function.string_repr(agent),
                };
                return Err(not_a_function(agent, &what));
            }
            call_function(agent, &function, this_value, &arguments)
        }
        Expression::New { callee, arguments } => {
            let constructor = evaluate_expression(agent, ctx, callee)?;
            let arguments = evaluate_arguments(agent, ctx, arguments)?;
            construct(agent, &constructor, &arguments)
        }
        Expression::Member { object, property } => {
            let base = evaluate_expression(agent, ctx, object)?;
            let key = evaluate_member_key(agent, ctx, property)?;
            get_property(agent, &base, &key)
        }
        Expression::ImportCall(specifier) => evaluate_import_call(agent, ctx, specifier),
        Expression::ImportMeta => {
            let module = ctx
                .script_or_module
                .clone()
                .expect("import.meta outside of a module");
            Ok(get_import_meta(agent, &module).into())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ecmascript::types::{number_to_string, string_to_number};

    #[test]
    fn int32_conversions() {
        assert_eq!(to_int32(4294967295.0), -1);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_uint32(-1.0), 4294967295);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(2147483648.0), -2147483648);
    }

    #[test]
    fn string_number_parsing_used_by_operators() {
        assert_eq!(string_to_number("3"), 3.0);
        assert_eq!(&*number_to_string(0.1 + 0.2), "0.30000000000000004");
    }
}
