use super::{
    context::{ContextHost, ContextScope, ContextStack, StateLabel},
    CheckError, CheckOptions, TypeError, TypeErrorKind,
};
use crate::language::{
    ast::*,
    clauses::{ClauseKind, ClauseKindDescriptor, ClauseRegistry, MethodSpecKeyword},
    extensions::{state, AttributionHost},
    span::Span,
    types::{Type, TypeName},
};
use log::debug;
use std::collections::{HashMap, HashSet};

pub fn check_unit(
    registry: &ClauseRegistry,
    unit: &CompilationUnit,
    options: CheckOptions,
) -> Result<Vec<TypeError>, CheckError> {
    Checker::new(registry, options).check(unit)
}

#[derive(Clone, Debug, Default)]
struct ClassInfo {
    fields: HashMap<String, Type>,
    methods: HashMap<String, MethodSig>,
}

#[derive(Clone, Debug)]
struct MethodSig {
    params: Vec<Type>,
    ret: Type,
}

#[derive(Clone, Debug)]
struct MethodFrame {
    return_type: Type,
}

/// Names visible at one program point.
#[derive(Clone, Debug)]
pub struct Env {
    class: String,
    method: Option<MethodFrame>,
    locals: Vec<(String, Type)>,
}

impl Env {
    fn for_class(class: &str) -> Self {
        Self {
            class: class.to_string(),
            method: None,
            locals: Vec::new(),
        }
    }

    pub fn local(&self, name: &str) -> Option<&Type> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, ty)| ty)
    }
}

pub struct Checker<'r> {
    registry: &'r ClauseRegistry,
    options: CheckOptions,
    contexts: ContextStack,
    classes: HashMap<String, ClassInfo>,
    errors: Vec<TypeError>,
    internal: Option<CheckError>,
    entry_env: Option<Env>,
    /// Snapshots taken at each label of the method being checked.
    labels: HashMap<String, Env>,
    /// Labels in declaration order; a block drops the ones it declared.
    label_order: Vec<String>,
    /// Every parameter and local declared so far in the current method.
    method_names: HashSet<String>,
}

impl<'r> Checker<'r> {
    pub fn new(registry: &'r ClauseRegistry, options: CheckOptions) -> Self {
        Self {
            registry,
            options,
            contexts: ContextStack::new(),
            classes: HashMap::new(),
            errors: Vec::new(),
            internal: None,
            entry_env: None,
            labels: HashMap::new(),
            label_order: Vec::new(),
            method_names: HashSet::new(),
        }
    }

    /// Checks every class of `unit` and hands back the diagnostics found.
    pub fn check(&mut self, unit: &CompilationUnit) -> Result<Vec<TypeError>, CheckError> {
        self.collect(unit);
        for class in &unit.classes {
            self.check_class(class);
            if let Some(err) = self.internal.take() {
                return Err(err);
            }
            let depth = self.contexts.depth();
            if depth != 0 {
                return Err(CheckError::UnbalancedContext {
                    declaration: class.name.name.clone(),
                    depth,
                });
            }
        }
        debug!(
            "checked {} class(es): {} diagnostic(s), {} context push(es)",
            unit.classes.len(),
            self.errors.len(),
            self.contexts.push_count()
        );
        Ok(std::mem::take(&mut self.errors))
    }

    fn collect(&mut self, unit: &CompilationUnit) {
        for class in &unit.classes {
            if self.classes.contains_key(&class.name.name) {
                self.error(class.name.span, TypeErrorKind::Duplicate(class.name.name.clone()));
                continue;
            }
            self.classes
                .insert(class.name.name.clone(), ClassInfo::default());
        }

        let mut collected = HashSet::new();
        for class in &unit.classes {
            if !collected.insert(class.name.name.as_str()) {
                continue;
            }
            let mut info = ClassInfo::default();
            for field in class.fields() {
                let ty = self.resolve_type(&field.ty);
                if info.fields.insert(field.name.name.clone(), ty).is_some() {
                    self.error(field.name.span, TypeErrorKind::Duplicate(field.name.name.clone()));
                }
            }
            for method in class.methods() {
                let params = method
                    .params
                    .iter()
                    .map(|param| self.resolve_type(&param.ty))
                    .collect();
                let ret = self.resolve_type(&method.return_type);
                let sig = MethodSig { params, ret };
                if info.methods.insert(method.name.name.clone(), sig).is_some() {
                    self.error(
                        method.name.span,
                        TypeErrorKind::Duplicate(method.name.name.clone()),
                    );
                }
            }
            self.classes.insert(class.name.name.clone(), info);
        }
    }

    fn check_class(&mut self, class: &ClassDecl) {
        debug!("checking class `{}`", class.name.name);
        let env = Env::for_class(&class.name.name);
        for member in &class.members {
            match member {
                Member::Field(field) => self.check_field(field, &env),
                Member::Clause(clause) => self.check_type_clause(clause, &env),
                Member::Method(method) => self.check_method(method, &env),
            }
        }
    }

    fn check_field(&mut self, field: &FieldDecl, env: &Env) {
        let Some(init) = &field.init else {
            return;
        };
        let ty = self.lookup_type(&field.ty).unwrap_or(Type::Error);
        match field.ghost {
            Some(descriptor) => {
                if self.is_registered(&descriptor) {
                    let mut scope = ContextScope::with_clause_kind(self, descriptor);
                    scope.attribute_expr(init, env, Some(&ty));
                }
            }
            None => {
                self.attribute_expr(init, env, Some(&ty));
            }
        }
    }

    fn check_type_clause(&mut self, clause: &TypeClause, env: &Env) {
        if !self.is_registered(&clause.descriptor) {
            return;
        }
        self.check_clause_body(clause.descriptor, &clause.expr, env);

        if let Some(ConstraintFrame::Methods(methods)) = &clause.frame {
            let unknown: Vec<_> = methods
                .iter()
                .filter(|method| !self.has_method(&env.class, &method.name))
                .cloned()
                .collect();
            for method in unknown {
                self.error(method.span, TypeErrorKind::UnknownFrameMethod(method.name));
            }
        }
    }

    fn check_clause_body(&mut self, descriptor: ClauseKindDescriptor, expr: &Expr, env: &Env) {
        let expected = self.options.boolean_clauses.then_some(Type::Boolean);
        let mut scope = ContextScope::with_clause_kind(self, descriptor);
        scope.attribute_expr(expr, env, expected.as_ref());
    }

    fn check_method(&mut self, method: &MethodDecl, class_env: &Env) {
        let return_type = self.lookup_type(&method.return_type).unwrap_or(Type::Error);
        let mut entry = class_env.clone();
        entry.method = Some(MethodFrame { return_type });
        self.labels.clear();
        self.label_order.clear();
        self.method_names.clear();
        for param in &method.params {
            let ty = self.lookup_type(&param.ty).unwrap_or(Type::Error);
            self.declare(&mut entry, &param.name, ty);
        }
        self.entry_env = Some(entry.clone());

        for case in &method.spec_cases {
            for clause in &case.clauses {
                if self.is_registered(&clause.descriptor) {
                    self.check_clause_body(clause.descriptor, &clause.expr, &entry);
                }
            }
        }

        let mut env = entry;
        self.check_block(&method.body, &mut env);
        self.entry_env = None;
        self.labels.clear();
    }

    fn check_block(&mut self, block: &Block, env: &mut Env) {
        let mark = env.locals.len();
        let label_mark = self.label_order.len();
        for statement in &block.statements {
            self.check_statement(statement, env);
        }
        env.locals.truncate(mark);
        for label in self.label_order.drain(label_mark..) {
            self.labels.remove(&label);
        }
    }

    fn check_statement(&mut self, statement: &Statement, env: &mut Env) {
        match statement {
            Statement::Local(decl) => self.check_local(decl, env),
            Statement::Ghost { descriptor, decl } => {
                if self.is_registered(descriptor) {
                    let mut scope = ContextScope::with_clause_kind(self, *descriptor);
                    scope.check_local(decl, env);
                }
            }
            Statement::Assign { target, value, .. } => {
                let ty = self.lookup_variable(target, env);
                self.attribute_expr(value, env, Some(&ty));
            }
            Statement::Labeled { label, body, .. } => {
                if self.labels.contains_key(&label.name) {
                    self.error(label.span, TypeErrorKind::Duplicate(label.name.clone()));
                } else {
                    self.labels.insert(label.name.clone(), env.clone());
                    self.label_order.push(label.name.clone());
                }
                self.check_statement(body, env);
            }
            Statement::Clause(clause) => {
                if self.is_registered(&clause.descriptor) {
                    self.check_clause_body(clause.descriptor, &clause.expr, env);
                }
            }
            Statement::Return { value, span } => self.check_return(value.as_ref(), *span, env),
            Statement::Expr(expr) => {
                self.attribute_expr(expr, env, None);
            }
            Statement::Block(block) => self.check_block(block, env),
            Statement::Error(_) => {}
        }
    }

    fn check_local(&mut self, decl: &LocalDecl, env: &mut Env) {
        let ty = self.resolve_type(&decl.ty);
        if let Some(init) = &decl.init {
            self.attribute_expr(init, env, Some(&ty));
        }
        self.declare(env, &decl.name, ty);
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span, env: &Env) {
        let ret = env
            .method
            .as_ref()
            .map(|frame| frame.return_type.clone())
            .unwrap_or(Type::Void);
        match value {
            Some(value) if ret.is_void() => {
                self.attribute_expr(value, env, None);
                self.error(value.span(), TypeErrorKind::ReturnValueInVoid);
            }
            Some(value) => {
                self.attribute_expr(value, env, Some(&ret));
            }
            None if !ret.is_void() && !ret.is_error() => {
                self.error(span, TypeErrorKind::MissingReturnValue);
            }
            None => {}
        }
    }

    /// A method-wide unique name: the same name never denotes two variables
    /// at different points of one method.
    fn declare(&mut self, env: &mut Env, name: &Identifier, ty: Type) {
        if !self.method_names.insert(name.name.clone()) {
            self.error(name.span, TypeErrorKind::Duplicate(name.name.clone()));
            return;
        }
        env.locals.push((name.name.clone(), ty));
    }

    fn attribute(&mut self, expr: &Expr, env: &Env) -> Type {
        match expr {
            Expr::Identifier(ident) => self.lookup_variable(ident, env),
            Expr::Int(..) => Type::Int,
            Expr::Bool(..) => Type::Boolean,
            Expr::Result(span) => self.attribute_result(*span, env),
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left = self.attribute(left, env);
                let right = self.attribute(right, env);
                self.binary_type(*op, left, right, *span)
            }
            Expr::Unary { op, expr, span } => {
                let operand = self.attribute(expr, env);
                self.unary_type(*op, operand, *span)
            }
            Expr::FieldAccess { base, field, .. } => {
                let base = self.attribute(base, env);
                self.field_access(base, field)
            }
            Expr::Call { callee, args, span } => self.attribute_call(callee, args, *span, env),
            Expr::State(node) => {
                if !self.is_registered(&node.descriptor) {
                    return Type::Error;
                }
                state::resolve(self, node, env)
            }
            Expr::Error(_) => Type::Error,
        }
    }

    fn attribute_result(&mut self, span: Span, env: &Env) -> Type {
        let context = self.contexts.current();
        let in_state_expression = context.current_label.is_some();
        let in_ensures = context.current_clause_kind.is_some_and(|descriptor| {
            descriptor.kind == ClauseKind::MethodSpec(MethodSpecKeyword::Ensures)
        });

        if in_state_expression {
            self.error(span, TypeErrorKind::ResultInStateExpression);
            return Type::Error;
        }
        match env.method.as_ref().map(|frame| &frame.return_type) {
            Some(ret) if in_ensures && !ret.is_void() => ret.clone(),
            _ => {
                self.error(span, TypeErrorKind::MisplacedResult);
                Type::Error
            }
        }
    }

    fn binary_type(&mut self, op: BinaryOp, left: Type, right: Type, span: Span) -> Type {
        if left.is_error() || right.is_error() {
            return Type::Error;
        }
        let both = |ty: &Type| &left == ty && &right == ty;
        let (ok, result) = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                (both(&Type::Int), Type::Int)
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                (both(&Type::Int), Type::Boolean)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Implies => {
                (both(&Type::Boolean), Type::Boolean)
            }
            BinaryOp::Eq | BinaryOp::NotEq => (left == right, Type::Boolean),
        };
        if ok {
            return result;
        }
        self.error(
            span,
            TypeErrorKind::BadOperands {
                op: op.symbol(),
                left,
                right,
            },
        );
        Type::Error
    }

    fn unary_type(&mut self, op: UnaryOp, operand: Type, span: Span) -> Type {
        let (symbol, expected) = match op {
            UnaryOp::Neg => ("-", Type::Int),
            UnaryOp::Not => ("!", Type::Boolean),
        };
        if operand.is_error() || operand == expected {
            return operand;
        }
        self.error(
            span,
            TypeErrorKind::BadOperand {
                op: symbol,
                operand,
            },
        );
        Type::Error
    }

    fn field_access(&mut self, base: Type, field: &Identifier) -> Type {
        if base.is_error() {
            return Type::Error;
        }
        let found = match &base {
            Type::Class(class) => self.field_type(class, &field.name),
            _ => None,
        };
        found.unwrap_or_else(|| {
            self.error(
                field.span,
                TypeErrorKind::UnknownField {
                    ty: base,
                    field: field.name.clone(),
                },
            );
            Type::Error
        })
    }

    fn attribute_call(&mut self, callee: &Expr, args: &[Expr], span: Span, env: &Env) -> Type {
        let (owner, method) = match callee {
            Expr::Identifier(ident) => (Type::Class(env.class.clone()), ident),
            Expr::FieldAccess { base, field, .. } => (self.attribute(base, env), field),
            other => {
                let callee_ty = self.attribute(other, env);
                self.attribute_args(args, env);
                if !callee_ty.is_error() {
                    self.error(span, TypeErrorKind::NotCallable);
                }
                return Type::Error;
            }
        };

        let sig = match &owner {
            Type::Class(class) => self
                .classes
                .get(class)
                .and_then(|info| info.methods.get(&method.name))
                .cloned(),
            _ => None,
        };
        let Some(sig) = sig else {
            if !owner.is_error() {
                self.error(
                    method.span,
                    TypeErrorKind::UnknownMethod {
                        ty: owner,
                        method: method.name.clone(),
                    },
                );
            }
            self.attribute_args(args, env);
            return Type::Error;
        };

        if sig.params.len() != args.len() {
            self.error(
                span,
                TypeErrorKind::CallArity {
                    method: method.name.clone(),
                    expected: sig.params.len(),
                    found: args.len(),
                },
            );
            self.attribute_args(args, env);
            return Type::Error;
        }
        for (arg, param) in args.iter().zip(&sig.params) {
            self.attribute_expr(arg, env, Some(param));
        }
        sig.ret
    }

    fn attribute_args(&mut self, args: &[Expr], env: &Env) {
        for arg in args {
            self.attribute(arg, env);
        }
    }

    fn lookup_variable(&mut self, ident: &Identifier, env: &Env) -> Type {
        if let Some(ty) = env.local(&ident.name) {
            return ty.clone();
        }
        if let Some(ty) = self.field_type(&env.class, &ident.name) {
            return ty;
        }
        self.error(ident.span, TypeErrorKind::UnknownSymbol(ident.name.clone()));
        Type::Error
    }

    fn field_type(&self, class: &str, field: &str) -> Option<Type> {
        self.classes.get(class)?.fields.get(field).cloned()
    }

    fn has_method(&self, class: &str, method: &str) -> bool {
        self.classes
            .get(class)
            .is_some_and(|info| info.methods.contains_key(method))
    }

    fn lookup_type(&self, name: &TypeName) -> Option<Type> {
        name.primitive().or_else(|| {
            self.classes
                .contains_key(&name.name)
                .then(|| Type::Class(name.name.clone()))
        })
    }

    fn resolve_type(&mut self, name: &TypeName) -> Type {
        match self.lookup_type(name) {
            Some(ty) => ty,
            None => {
                self.error(name.span, TypeErrorKind::UnknownType(name.name.clone()));
                Type::Error
            }
        }
    }

    /// Nodes must carry the descriptor this checker's registry has for their
    /// keyword; anything else is a front-end bug, not a user error.
    fn is_registered(&mut self, descriptor: &ClauseKindDescriptor) -> bool {
        if self.registry.get(descriptor.keyword) == Some(descriptor) {
            return true;
        }
        if self.internal.is_none() {
            self.internal = Some(CheckError::ForeignDescriptor(descriptor.keyword.to_string()));
        }
        false
    }

    fn error(&mut self, span: Span, kind: TypeErrorKind) {
        self.errors.push(TypeError::new(span, kind));
    }
}

impl ContextHost for Checker<'_> {
    fn contexts(&self) -> &ContextStack {
        &self.contexts
    }

    fn contexts_mut(&mut self) -> &mut ContextStack {
        &mut self.contexts
    }
}

impl AttributionHost for Checker<'_> {
    type Env = Env;

    fn attribute_expr(&mut self, expr: &Expr, env: &Env, expected: Option<&Type>) -> Type {
        let ty = self.attribute(expr, env);
        if let Some(expected) = expected {
            if !ty.is_error() && !expected.is_error() && &ty != expected {
                self.error(
                    expr.span(),
                    TypeErrorKind::IncompatibleTypes {
                        expected: expected.clone(),
                        found: ty.clone(),
                    },
                );
            }
        }
        ty
    }

    fn attribute_type_args(&mut self, args: &[TypeName], _env: &Env) {
        for arg in args {
            self.resolve_type(arg);
        }
    }

    fn resolve_label(&mut self, expr: &Expr, env: &Env) -> Option<Identifier> {
        env.method.as_ref()?;
        expr.as_identifier()
            .filter(|ident| self.labels.contains_key(&ident.name))
            .cloned()
    }

    fn environment_for_label(&mut self, _span: Span, label: &StateLabel, env: &Env) -> Env {
        let snapshot = match label {
            StateLabel::Entry => self.entry_env.as_ref(),
            StateLabel::Named(ident) => self.labels.get(&ident.name),
        };
        snapshot.cloned().unwrap_or_else(|| env.clone())
    }

    fn has_enclosing_method(&self, env: &Env) -> bool {
        env.method.is_some()
    }

    fn report(&mut self, error: TypeError) {
        self.errors.push(error);
    }
}
