//! Programmatic construction of checked programs.
//!
//! Hosts embedding the evaluator without a front end, and the test suites,
//! build programs through `AstBuilder`. Every node gets a fresh `ExprId` and a
//! distinct synthetic span so errors can be told apart by location.

use std::cell::Cell;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::ast::{
    BinaryOp, Block, CastKind, CompositeDecl, Condition, ConditionKind, Declaration,
    DestroyEventDecl, EnumCase, Expr, ExprId, ExprKind, FieldDecl, FunctionDecl, IfTest,
    ImportDecl, InterfaceDecl, Parameter, Program, Stmt, StmtKind, SwitchCase, Transfer, UnaryOp,
    VariableDecl,
};
use crate::{
    Address, CompositeKind, FixedPointKind, IntegerKind, Location, Name, NominalType, PathDomain,
    SharedInterner, Span, StaticType, TypeId,
};

/// Builds AST nodes for one program location.
pub struct AstBuilder {
    interner: SharedInterner,
    location: Location,
    next_id: Cell<u32>,
}

impl AstBuilder {
    pub fn new(interner: SharedInterner, location: Location) -> Self {
        AstBuilder {
            interner,
            location,
            next_id: Cell::new(1),
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn next(&self) -> (ExprId, Span) {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        (ExprId::new(id), Span::new(id, id.wrapping_add(1)))
    }

    /// A fresh synthetic span.
    pub fn span(&self) -> Span {
        self.next().1
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        let (id, span) = self.next();
        Expr { id, kind, span }
    }

    fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            span: self.span(),
        }
    }

    // Types

    /// Location-qualified identifier of a type declared in this program.
    pub fn type_id(&self, name: &str) -> TypeId {
        TypeId::new(&self.location, name)
    }

    pub fn composite_type(&self, name: &str, kind: CompositeKind) -> StaticType {
        StaticType::Composite(NominalType::new(self.type_id(name), kind))
    }

    pub fn resource_type(&self, name: &str) -> StaticType {
        self.composite_type(name, CompositeKind::Resource)
    }

    pub fn struct_type(&self, name: &str) -> StaticType {
        self.composite_type(name, CompositeKind::Structure)
    }

    pub fn interface_type(&self, name: &str, kind: CompositeKind) -> StaticType {
        StaticType::Interface(NominalType::new(self.type_id(name), kind))
    }

    // Literals

    pub fn boolean(&self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value))
    }

    pub fn nil(&self) -> Expr {
        self.expr(ExprKind::Nil)
    }

    /// An `Int` literal.
    pub fn int(&self, value: i64) -> Expr {
        self.int_of(IntegerKind::Int, value)
    }

    pub fn int_of(&self, kind: IntegerKind, value: i64) -> Expr {
        self.big_int(kind, BigInt::from(value))
    }

    pub fn big_int(&self, kind: IntegerKind, value: BigInt) -> Expr {
        self.expr(ExprKind::Integer { value, kind })
    }

    /// A fixed-point literal given already scaled by 10^8.
    pub fn fixed(&self, kind: FixedPointKind, scaled: i128) -> Expr {
        self.expr(ExprKind::FixedPoint { scaled, kind })
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::String(value.to_owned()))
    }

    pub fn character(&self, value: &str) -> Expr {
        self.expr(ExprKind::Character(value.to_owned()))
    }

    pub fn address(&self, value: u64) -> Expr {
        self.expr(ExprKind::Address(Address::new(value)))
    }

    pub fn path(&self, domain: PathDomain, identifier: &str) -> Expr {
        self.expr(ExprKind::Path {
            domain,
            identifier: self.name(identifier),
        })
    }

    /// Array literal of a variable-sized array with the given element type.
    pub fn array(&self, elements: Vec<Expr>, element_type: StaticType) -> Expr {
        self.expr(ExprKind::Array {
            elements,
            ty: StaticType::array(element_type),
        })
    }

    pub fn dictionary(
        &self,
        entries: Vec<(Expr, Expr)>,
        key_type: StaticType,
        value_type: StaticType,
    ) -> Expr {
        self.expr(ExprKind::Dictionary {
            entries,
            ty: StaticType::dictionary(key_type, value_type),
        })
    }

    pub fn type_value(&self, ty: StaticType) -> Expr {
        self.expr(ExprKind::TypeValue(ty))
    }

    // Operators and access

    pub fn ident(&self, name: &str) -> Expr {
        self.expr(ExprKind::Identifier(self.name(name)))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn negate(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Negate, operand)
    }

    pub fn not(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Not, operand)
    }

    /// `<-operand`
    pub fn mv(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Move, operand)
    }

    pub fn deref(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Deref, operand)
    }

    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn add(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Add, left, right)
    }

    pub fn sub(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Mul, left, right)
    }

    pub fn eq(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Eq, left, right)
    }

    pub fn lt(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Lt, left, right)
    }

    pub fn gt(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Gt, left, right)
    }

    pub fn and(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::Or, left, right)
    }

    pub fn coalesce(&self, left: Expr, right: Expr) -> Expr {
        self.binary(BinaryOp::NilCoalesce, left, right)
    }

    pub fn conditional(&self, test: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        self.expr(ExprKind::Conditional {
            test: Box::new(test),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn member(&self, target: Expr, name: &str) -> Expr {
        self.expr(ExprKind::Member {
            target: Box::new(target),
            name: self.name(name),
            optional: false,
        })
    }

    /// `target?.name`
    pub fn optional_member(&self, target: Expr, name: &str) -> Expr {
        self.expr(ExprKind::Member {
            target: Box::new(target),
            name: self.name(name),
            optional: true,
        })
    }

    pub fn index(&self, target: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Index {
            target: Box::new(target),
            index: Box::new(index),
        })
    }

    pub fn call(&self, callee: Expr, arguments: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Invocation {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// Invoke a function by name.
    pub fn call_named(&self, name: &str, arguments: Vec<Expr>) -> Expr {
        let callee = self.ident(name);
        self.call(callee, arguments)
    }

    /// `receiver.method(arguments)`
    pub fn method(&self, receiver: Expr, method: &str, arguments: Vec<Expr>) -> Expr {
        let callee = self.member(receiver, method);
        self.call(callee, arguments)
    }

    /// `receiver?.method(arguments)`
    pub fn optional_method(&self, receiver: Expr, method: &str, arguments: Vec<Expr>) -> Expr {
        let callee = self.optional_member(receiver, method);
        self.call(callee, arguments)
    }

    /// `create T(arguments)`
    pub fn create(&self, type_name: &str, arguments: Vec<Expr>) -> Expr {
        let invocation = self.call_named(type_name, arguments);
        self.expr(ExprKind::Create(Box::new(invocation)))
    }

    pub fn cast(&self, expr: Expr, ty: StaticType, kind: CastKind) -> Expr {
        self.expr(ExprKind::Cast {
            expr: Box::new(expr),
            ty,
            kind,
        })
    }

    /// `&expr as ty`, where `ty` is a (possibly optional) reference type.
    pub fn reference(&self, expr: Expr, ty: StaticType) -> Expr {
        self.expr(ExprKind::Reference {
            expr: Box::new(expr),
            ty,
        })
    }

    pub fn force_unwrap(&self, expr: Expr) -> Expr {
        self.expr(ExprKind::ForceUnwrap(Box::new(expr)))
    }

    pub fn closure(&self, function: FunctionDecl) -> Expr {
        self.expr(ExprKind::Function(Rc::new(function)))
    }

    pub fn before(&self, expr: Expr) -> Expr {
        self.expr(ExprKind::Before(Box::new(expr)))
    }

    // Statements

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expression(expr))
    }

    fn local(&self, name: &str, is_constant: bool, transfer: Transfer, value: Expr) -> Stmt {
        let decl = self.variable(name, None, is_constant, transfer, value);
        self.stmt(StmtKind::Variable(decl))
    }

    /// `let name: ty = value` / `var name: ty <- value` with an explicit annotation.
    pub fn local_typed(
        &self,
        name: &str,
        ty: StaticType,
        is_constant: bool,
        transfer: Transfer,
        value: Expr,
    ) -> Stmt {
        let decl = self.variable(name, Some(ty), is_constant, transfer, value);
        self.stmt(StmtKind::Variable(decl))
    }

    /// `let name = value`
    pub fn let_(&self, name: &str, value: Expr) -> Stmt {
        self.local(name, true, Transfer::Copy, value)
    }

    /// `var name = value`
    pub fn var(&self, name: &str, value: Expr) -> Stmt {
        self.local(name, false, Transfer::Copy, value)
    }

    /// `let name <- value`
    pub fn let_move(&self, name: &str, value: Expr) -> Stmt {
        self.local(name, true, Transfer::Move, value)
    }

    /// `var name <- value`
    pub fn var_move(&self, name: &str, value: Expr) -> Stmt {
        self.local(name, false, Transfer::Move, value)
    }

    pub fn assign_with(&self, target: Expr, transfer: Transfer, value: Expr) -> Stmt {
        self.stmt(StmtKind::Assignment {
            target,
            transfer,
            value,
        })
    }

    /// `target = value`
    pub fn assign(&self, target: Expr, value: Expr) -> Stmt {
        self.assign_with(target, Transfer::Copy, value)
    }

    /// `target <- value`
    pub fn move_assign(&self, target: Expr, value: Expr) -> Stmt {
        self.assign_with(target, Transfer::Move, value)
    }

    /// `target <-! value`
    pub fn force_assign(&self, target: Expr, value: Expr) -> Stmt {
        self.assign_with(target, Transfer::ForceMove, value)
    }

    /// `left <-> right`
    pub fn swap(&self, left: Expr, right: Expr) -> Stmt {
        self.stmt(StmtKind::Swap { left, right })
    }

    pub fn block(&self, statements: Vec<Stmt>) -> Block {
        Block::new(statements, self.span())
    }

    pub fn block_stmt(&self, statements: Vec<Stmt>) -> Stmt {
        let block = self.block(statements);
        self.stmt(StmtKind::Block(block))
    }

    pub fn if_(&self, test: Expr, then_stmts: Vec<Stmt>, else_stmts: Option<Vec<Stmt>>) -> Stmt {
        let then_block = self.block(then_stmts);
        let else_block = else_stmts.map(|stmts| self.block(stmts));
        self.stmt(StmtKind::If {
            test: IfTest::Expr(test),
            then_block,
            else_block,
        })
    }

    /// `if let name = value { ... } else { ... }`
    pub fn if_let(
        &self,
        name: &str,
        transfer: Transfer,
        value: Expr,
        then_stmts: Vec<Stmt>,
        else_stmts: Option<Vec<Stmt>>,
    ) -> Stmt {
        let then_block = self.block(then_stmts);
        let else_block = else_stmts.map(|stmts| self.block(stmts));
        self.stmt(StmtKind::If {
            test: IfTest::Let {
                name: self.name(name),
                transfer,
                value,
            },
            then_block,
            else_block,
        })
    }

    pub fn while_(&self, test: Expr, body: Vec<Stmt>) -> Stmt {
        let block = self.block(body);
        self.stmt(StmtKind::While { test, block })
    }

    pub fn for_in(&self, element: &str, iterable: Expr, body: Vec<Stmt>) -> Stmt {
        let block = self.block(body);
        self.stmt(StmtKind::For {
            index: None,
            element: self.name(element),
            iterable,
            block,
        })
    }

    pub fn for_in_indexed(
        &self,
        index: &str,
        element: &str,
        iterable: Expr,
        body: Vec<Stmt>,
    ) -> Stmt {
        let block = self.block(body);
        self.stmt(StmtKind::For {
            index: Some(self.name(index)),
            element: self.name(element),
            iterable,
            block,
        })
    }

    /// `switch subject { case v: ... default: ... }`; a `None` value is `default`.
    pub fn switch(&self, subject: Expr, cases: Vec<(Option<Expr>, Vec<Stmt>)>) -> Stmt {
        let cases = cases
            .into_iter()
            .map(|(value, stmts)| SwitchCase {
                value,
                block: self.block(stmts),
            })
            .collect();
        self.stmt(StmtKind::Switch { subject, cases })
    }

    pub fn ret(&self, value: Expr) -> Stmt {
        self.stmt(StmtKind::Return(Some(value)))
    }

    pub fn ret_void(&self) -> Stmt {
        self.stmt(StmtKind::Return(None))
    }

    pub fn break_(&self) -> Stmt {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_(&self) -> Stmt {
        self.stmt(StmtKind::Continue)
    }

    /// `emit Event(arguments)`
    pub fn emit(&self, event: &str, arguments: Vec<Expr>) -> Stmt {
        let invocation = self.call_named(event, arguments);
        self.stmt(StmtKind::Emit(invocation))
    }

    pub fn destroy(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Destroy(expr))
    }

    pub fn function_stmt(&self, function: FunctionDecl) -> Stmt {
        self.stmt(StmtKind::Function(Rc::new(function)))
    }

    // Declarations

    pub fn function(&self, name: &str) -> FunctionBuilder<'_> {
        FunctionBuilder::new(self, self.name(name))
    }

    /// Builder for an initializer (`init`).
    pub fn initializer(&self) -> FunctionBuilder<'_> {
        self.function("init")
    }

    /// Builder for a destructor (`destroy`).
    pub fn destructor(&self) -> FunctionBuilder<'_> {
        self.function("destroy")
    }

    pub fn condition(&self, kind: ConditionKind, test: Expr, message: Option<Expr>) -> Condition {
        Condition {
            kind,
            test,
            message,
            span: self.span(),
        }
    }

    pub fn composite(&self, name: &str, kind: CompositeKind) -> CompositeBuilder<'_> {
        CompositeBuilder::new(self, self.name(name), kind)
    }

    pub fn interface(&self, name: &str, kind: CompositeKind) -> InterfaceBuilder<'_> {
        InterfaceBuilder::new(self, self.name(name), kind)
    }

    pub fn variable(
        &self,
        name: &str,
        ty: Option<StaticType>,
        is_constant: bool,
        transfer: Transfer,
        value: Expr,
    ) -> VariableDecl {
        VariableDecl {
            name: self.name(name),
            ty,
            is_constant,
            transfer,
            value,
            span: self.span(),
        }
    }

    /// Global `let name = value`.
    pub fn global_let(&self, name: &str, value: Expr) -> Declaration {
        Declaration::Variable(Rc::new(self.variable(
            name,
            None,
            true,
            Transfer::Copy,
            value,
        )))
    }

    /// Global `var name = value`.
    pub fn global_var(&self, name: &str, value: Expr) -> Declaration {
        Declaration::Variable(Rc::new(self.variable(
            name,
            None,
            false,
            Transfer::Copy,
            value,
        )))
    }

    /// `import identifiers from location`.
    pub fn import(&self, location: Location, identifiers: &[&str]) -> Declaration {
        Declaration::Import(ImportDecl {
            location,
            identifiers: identifiers.iter().map(|s| self.name(s)).collect(),
            span: self.span(),
        })
    }

    pub fn program(&self, declarations: Vec<Declaration>) -> Program {
        Program::new(self.location.clone(), declarations)
    }
}

/// Builder for function declarations.
pub struct FunctionBuilder<'a> {
    builder: &'a AstBuilder,
    decl: FunctionDecl,
}

impl<'a> FunctionBuilder<'a> {
    fn new(builder: &'a AstBuilder, name: Name) -> Self {
        FunctionBuilder {
            builder,
            decl: FunctionDecl {
                name,
                parameters: Vec::new(),
                return_type: StaticType::Void,
                pre_conditions: Vec::new(),
                post_conditions: Vec::new(),
                body: None,
                span: builder.span(),
            },
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str, ty: StaticType) -> Self {
        self.decl.parameters.push(Parameter {
            label: None,
            name: self.builder.name(name),
            ty,
        });
        self
    }

    #[must_use]
    pub fn returns(mut self, ty: StaticType) -> Self {
        self.decl.return_type = ty;
        self
    }

    #[must_use]
    pub fn pre(mut self, test: Expr, message: Option<Expr>) -> Self {
        let condition = self.builder.condition(ConditionKind::Pre, test, message);
        self.decl.pre_conditions.push(condition);
        self
    }

    #[must_use]
    pub fn post(mut self, test: Expr, message: Option<Expr>) -> Self {
        let condition = self.builder.condition(ConditionKind::Post, test, message);
        self.decl.post_conditions.push(condition);
        self
    }

    #[must_use]
    pub fn body(mut self, statements: Vec<Stmt>) -> Self {
        self.decl.body = Some(self.builder.block(statements));
        self
    }

    pub fn build(self) -> FunctionDecl {
        self.decl
    }

    /// Build as a global declaration.
    pub fn declare(self) -> Declaration {
        Declaration::Function(Rc::new(self.decl))
    }
}

/// Builder for composite declarations.
pub struct CompositeBuilder<'a> {
    builder: &'a AstBuilder,
    decl: CompositeDecl,
}

impl<'a> CompositeBuilder<'a> {
    fn new(builder: &'a AstBuilder, name: Name, kind: CompositeKind) -> Self {
        CompositeBuilder {
            builder,
            decl: CompositeDecl {
                name,
                kind,
                conformances: Vec::new(),
                fields: Vec::new(),
                initializer: None,
                destructor: None,
                functions: Vec::new(),
                enum_raw_type: None,
                enum_cases: Vec::new(),
                destroy_event: None,
                span: builder.span(),
            },
        }
    }

    #[must_use]
    pub fn field(mut self, name: &str, ty: StaticType) -> Self {
        self.decl.fields.push(FieldDecl {
            name: self.builder.name(name),
            ty,
            span: self.builder.span(),
        });
        self
    }

    /// Conform to an interface declared in this program.
    #[must_use]
    pub fn conforms(mut self, interface: &str) -> Self {
        self.decl.conformances.push(self.builder.type_id(interface));
        self
    }

    /// Conform to an interface identified by its full type id.
    #[must_use]
    pub fn conforms_to(mut self, interface: TypeId) -> Self {
        self.decl.conformances.push(interface);
        self
    }

    #[must_use]
    pub fn initializer(mut self, function: FunctionDecl) -> Self {
        self.decl.initializer = Some(Rc::new(function));
        self
    }

    #[must_use]
    pub fn destructor(mut self, function: FunctionDecl) -> Self {
        self.decl.destructor = Some(Rc::new(function));
        self
    }

    #[must_use]
    pub fn function(mut self, function: FunctionDecl) -> Self {
        self.decl.functions.push(Rc::new(function));
        self
    }

    #[must_use]
    pub fn raw_type(mut self, kind: IntegerKind) -> Self {
        self.decl.enum_raw_type = Some(kind);
        self
    }

    #[must_use]
    pub fn case(mut self, name: &str, raw_value: i64) -> Self {
        self.decl.enum_cases.push(EnumCase {
            name: self.builder.name(name),
            raw_value: BigInt::from(raw_value),
        });
        self
    }

    /// Emit `event` with the given arguments when an instance is destroyed.
    #[must_use]
    pub fn destroy_event(mut self, event: &str, arguments: Vec<(&str, Expr)>) -> Self {
        self.decl.destroy_event = Some(DestroyEventDecl {
            event: self.builder.type_id(event),
            arguments: arguments
                .into_iter()
                .map(|(name, expr)| (self.builder.name(name), expr))
                .collect(),
        });
        self
    }

    pub fn build(self) -> CompositeDecl {
        self.decl
    }

    pub fn declare(self) -> Declaration {
        Declaration::Composite(Rc::new(self.decl))
    }
}

/// Builder for interface declarations.
pub struct InterfaceBuilder<'a> {
    builder: &'a AstBuilder,
    decl: InterfaceDecl,
}

impl<'a> InterfaceBuilder<'a> {
    fn new(builder: &'a AstBuilder, name: Name, kind: CompositeKind) -> Self {
        InterfaceBuilder {
            builder,
            decl: InterfaceDecl {
                name,
                kind,
                conformances: Vec::new(),
                fields: Vec::new(),
                initializer: None,
                destructor: None,
                functions: Vec::new(),
                span: builder.span(),
            },
        }
    }

    #[must_use]
    pub fn field(mut self, name: &str, ty: StaticType) -> Self {
        self.decl.fields.push(FieldDecl {
            name: self.builder.name(name),
            ty,
            span: self.builder.span(),
        });
        self
    }

    #[must_use]
    pub fn conforms(mut self, interface: &str) -> Self {
        self.decl.conformances.push(self.builder.type_id(interface));
        self
    }

    #[must_use]
    pub fn initializer(mut self, function: FunctionDecl) -> Self {
        self.decl.initializer = Some(Rc::new(function));
        self
    }

    #[must_use]
    pub fn destructor(mut self, function: FunctionDecl) -> Self {
        self.decl.destructor = Some(Rc::new(function));
        self
    }

    #[must_use]
    pub fn function(mut self, function: FunctionDecl) -> Self {
        self.decl.functions.push(Rc::new(function));
        self
    }

    pub fn build(self) -> InterfaceDecl {
        self.decl
    }

    pub fn declare(self) -> Declaration {
        Declaration::Interface(Rc::new(self.decl))
    }
}

/// Fixed-point helper: scale a decimal given as integer and fractional parts.
///
/// `fixed_point(1, 50_000_000)` is `1.5`.
pub fn fixed_point(integer: i64, fraction: u32) -> i128 {
    let scale = 10i128.pow(FixedPointKind::SCALE);
    let fraction = i128::from(fraction);
    if integer < 0 {
        i128::from(integer) * scale - fraction
    } else {
        i128::from(integer) * scale + fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_and_spans_are_distinct() {
        let b = AstBuilder::new(SharedInterner::new(), Location::script("test"));
        let x = b.int(1);
        let y = b.int(2);
        assert_ne!(x.id, y.id);
        assert_ne!(x.span, y.span);
    }

    #[test]
    fn test_before_expressions_collected_from_post_conditions() {
        let b = AstBuilder::new(SharedInterner::new(), Location::script("test"));
        let before_x = b.before(b.ident("x"));
        let test = b.gt(b.ident("x"), before_x);
        let function = b
            .function("inc")
            .post(test, None)
            .body(vec![])
            .build();
        let found = function.before_expressions();
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0].kind, ExprKind::Identifier(_)));
    }

    #[test]
    fn test_fixed_point_scaling() {
        assert_eq!(fixed_point(1, 50_000_000), 150_000_000);
        assert_eq!(fixed_point(-2, 25_000_000), -225_000_000);
    }
}
