//! Expression evaluation.

use cbx_ir::ast::{
    ArrayElement, AssignOp, BinaryOp, Expr, ExprKind, LogicalOp, MemberProp, PropKey, PropertyDef,
    UnaryOp,
};
use cbx_ir::Name;
use cbx_stack::ensure_sufficient_stack;

use super::convert::Hint;
use super::pattern::BindMode;
use super::Interpreter;
use crate::environment::Resolution;
use crate::errors::{self, EvalResult};
use crate::ops;
use crate::value::{ObjRef, Property, Slot, Value};

/// Printable form of a callee for "is not a function" messages.
fn describe_callee(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.to_string(),
        ExprKind::This => "this".to_string(),
        ExprKind::Member {
            object, property, ..
        } => match property {
            MemberProp::Named(name) => format!("{}.{name}", describe_callee(object)),
            MemberProp::Computed(_) => format!("{}[...]", describe_callee(object)),
        },
        ExprKind::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        _ => "expression".to_string(),
    }
}

impl Interpreter {
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| {
            let value = match &expr.kind {
                ExprKind::Call { .. } | ExprKind::Member { .. } => self.eval_chain(expr)?,
                _ => self.taped(expr, |interp| interp.eval_expr_inner(expr).map(Some))?,
            };
            Ok(value.unwrap_or_default())
        })
    }

    /// Evaluate `expr`, naming it `name` if it is an anonymous function.
    pub(crate) fn eval_named(&mut self, expr: &Expr, name: Option<&Name>) -> EvalResult {
        match (&expr.kind, name) {
            (ExprKind::Function(function), Some(name)) if function.name.is_none() => {
                Ok(self.make_closure(function, name.clone()))
            }
            _ => self.eval_expr(expr),
        }
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Template { quasis, exprs } => {
                let mut out = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(index) {
                        let value = self.eval_expr(expr)?;
                        out.push_str(&self.to_string(&value)?);
                    }
                }
                Ok(Value::Str(Name::from(out)))
            }
            ExprKind::Ident(name) => self.lookup(name),
            ExprKind::This => Ok(self.this.clone()),
            ExprKind::Array(elements) => {
                let items = self.eval_elements(elements)?;
                Ok(Value::Object(self.new_array(items)))
            }
            ExprKind::Object(defs) => self.eval_object_literal(defs),
            ExprKind::Function(function) => {
                let name = function.name.clone().unwrap_or_else(|| Name::from(""));
                Ok(self.make_closure(function, name))
            }
            ExprKind::Unary(op, operand) => self.eval_unary(*op, operand),
            ExprKind::Update {
                increment,
                prefix,
                target,
            } => {
                let old = self.eval_expr(target)?;
                let old = self.to_number(&old)?;
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.assign_to(target, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Binary(op, left, right) => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                self.binary(*op, &left, &right)
            }
            ExprKind::Logical(op, left, right) => {
                let left = self.eval_expr(left)?;
                if self.short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval_expr(right)
                }
            }
            ExprKind::Assign { op, target, value } => self.eval_assign(*op, target, value),
            ExprKind::AssignPattern { target, value } => {
                let value = self.eval_expr(value)?;
                self.bind_pattern(target, value.clone(), BindMode::Assign)?;
                Ok(value)
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
            ExprKind::Call { .. } | ExprKind::Member { .. } => {
                Ok(self.eval_chain(expr)?.unwrap_or_default())
            }
            ExprKind::New { callee, args } => {
                let callee_value = self.eval_expr(callee)?;
                let args = self.eval_elements(args)?;
                if !callee_value.as_object().is_some_and(ObjRef::is_callable) {
                    return Err(self.throw(errors::not_a_constructor(&describe_callee(callee))));
                }
                self.construct(&callee_value, &args)
            }
            ExprKind::DynamicImport {
                specifier,
                strategy,
            } => {
                let specifier = self.eval_expr(specifier)?;
                let specifier = self.to_string(&specifier)?;
                self.dynamic_import(&specifier, *strategy)
            }
            ExprKind::ImportMeta => {
                let script = self.script.clone();
                match script.as_ref().and_then(|s| s.host().map(|h| (s, h))) {
                    Some((script, host)) => host.import_meta(self, script),
                    None => Ok(Value::Object(self.new_object())),
                }
            }
            ExprKind::Await(operand) => {
                let value = self.eval_expr(operand)?;
                self.await_value(value)
            }
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval_expr(expr)?;
                }
                Ok(last)
            }
        }
    }

    /// Identifier reference.
    pub(crate) fn lookup(&mut self, name: &str) -> EvalResult {
        let resolution = self.scope.borrow().resolve(name);
        self.resolve_identifier(name, resolution)
    }

    pub(crate) fn resolve_identifier(&mut self, name: &str, resolution: Resolution) -> EvalResult {
        match resolution {
            Resolution::Value(value) => Ok(value),
            Resolution::Uninitialized => Err(self.throw(errors::before_initialization(name))),
            Resolution::Import(source, export) => {
                Ok(source.get_export(self, &export)?.unwrap_or_default())
            }
            Resolution::Global(global) => {
                let receiver = Value::Object(global.clone());
                self.get_property(&global, name, &receiver)
            }
            Resolution::NotFound => Err(self.throw(errors::not_defined(name))),
        }
    }

    pub(crate) fn eval_elements(&mut self, elements: &[ArrayElement]) -> EvalResult<Vec<Value>> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Expr(expr) => items.push(self.eval_expr(expr)?),
                ArrayElement::Spread(expr) => {
                    let value = self.eval_expr(expr)?;
                    items.extend(self.iterate(&value)?);
                }
                ArrayElement::Hole => items.push(Value::Undefined),
            }
        }
        Ok(items)
    }

    fn eval_prop_key(&mut self, key: &PropKey) -> EvalResult<Name> {
        match key {
            PropKey::Named(name) => Ok(name.clone()),
            PropKey::Computed(expr) => {
                let value = self.eval_expr(expr)?;
                self.to_property_key(&value)
            }
        }
    }

    fn eval_object_literal(&mut self, defs: &[PropertyDef]) -> EvalResult {
        let object = self.new_object();
        for def in defs {
            match def {
                PropertyDef::KeyValue(key, value) => {
                    let is_proto = matches!(key, PropKey::Named(name) if &**name == "__proto__");
                    let key = self.eval_prop_key(key)?;
                    let value = self.eval_named(value, Some(&key))?;
                    if is_proto {
                        match value {
                            Value::Object(proto) => object.borrow_mut().prototype = Some(proto),
                            Value::Null => object.borrow_mut().prototype = None,
                            _ => {}
                        }
                    } else {
                        object.borrow_mut().set_data(&key, value);
                    }
                }
                PropertyDef::Shorthand(name) => {
                    let value = self.lookup(name)?;
                    object.borrow_mut().set_data(name, value);
                }
                PropertyDef::Getter(key, function) | PropertyDef::Setter(key, function) => {
                    let key = self.eval_prop_key(key)?;
                    let func = self.make_closure(function, key.clone());
                    let is_getter = matches!(def, PropertyDef::Getter(..));
                    let mut obj = object.borrow_mut();
                    let (mut get, mut set) = match obj.own_property(&key) {
                        Some(Property {
                            slot: Slot::Accessor { get, set },
                            ..
                        }) => (get.clone(), set.clone()),
                        _ => (None, None),
                    };
                    if is_getter {
                        get = Some(func);
                    } else {
                        set = Some(func);
                    }
                    obj.define(
                        key,
                        Property {
                            slot: Slot::Accessor { get, set },
                            enumerable: true,
                            writable: true,
                        },
                    );
                }
                PropertyDef::Spread(expr) => {
                    let value = self.eval_expr(expr)?;
                    self.copy_data_properties(&object, &value)?;
                }
            }
        }
        Ok(Value::Object(object))
    }

    /// Copy own enumerable properties of `source` onto `target`
    /// (object spread, `Object.assign`).
    pub(crate) fn copy_data_properties(&mut self, target: &ObjRef, source: &Value) -> EvalResult<()> {
        match source {
            Value::Object(source) => {
                for (key, value) in self.own_entries(source)? {
                    self.define_data(target, &key, value);
                }
            }
            Value::Str(s) => {
                for (index, c) in s.chars().enumerate() {
                    self.define_data(target, &index.to_string(), Value::Str(Name::from(c.to_string())));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult {
        match op {
            UnaryOp::Typeof => {
                if let ExprKind::Ident(name) = &operand.kind {
                    let resolution = self.scope.borrow().resolve(name);
                    if let Resolution::NotFound = resolution {
                        return Ok(Value::str("undefined"));
                    }
                    let value = self.resolve_identifier(name, resolution)?;
                    return Ok(Value::str(value.type_of()));
                }
                let value = self.eval_expr(operand)?;
                Ok(Value::str(value.type_of()))
            }
            UnaryOp::Delete => match &operand.kind {
                ExprKind::Member {
                    object, property, ..
                } => {
                    let base = self.eval_expr(object)?;
                    let key = self.member_key(property)?;
                    Ok(Value::Bool(self.delete_property(&base, &key)?))
                }
                _ => {
                    self.eval_expr(operand)?;
                    Ok(Value::Bool(true))
                }
            },
            UnaryOp::Void => {
                self.eval_expr(operand)?;
                Ok(Value::Undefined)
            }
            UnaryOp::Not => Ok(Value::Bool(!self.eval_expr(operand)?.is_truthy())),
            UnaryOp::Neg => {
                let value = self.eval_expr(operand)?;
                Ok(Value::Number(-self.to_number(&value)?))
            }
            UnaryOp::Plus => {
                let value = self.eval_expr(operand)?;
                Ok(Value::Number(self.to_number(&value)?))
            }
            UnaryOp::BitNot => {
                let value = self.eval_expr(operand)?;
                let n = self.to_number(&value)?;
                Ok(Value::Number(f64::from(!ops::to_int32(n))))
            }
        }
    }

    fn short_circuits(&self, op: LogicalOp, left: &Value) -> bool {
        match op {
            LogicalOp::And => !left.is_truthy(),
            LogicalOp::Or => left.is_truthy(),
            LogicalOp::Nullish => !left.is_nullish(),
        }
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> EvalResult {
        match op {
            AssignOp::Assign => match &target.kind {
                ExprKind::Ident(name) => {
                    let value = self.eval_named(value, Some(name))?;
                    self.assign_identifier(name, value.clone())?;
                    Ok(value)
                }
                ExprKind::Member {
                    object, property, ..
                } => {
                    let base = self.eval_expr(object)?;
                    let key = self.member_key(property)?;
                    let value = self.eval_expr(value)?;
                    self.set(&base, &key, value.clone())?;
                    Ok(value)
                }
                _ => Err(self.throw((
                    errors::ErrorKind::Syntax,
                    "Invalid left-hand side in assignment".to_string(),
                ))),
            },
            AssignOp::Arith(binary) => {
                let current = self.eval_expr(target)?;
                let rhs = self.eval_expr(value)?;
                let result = self.binary(binary, &current, &rhs)?;
                self.assign_to(target, result.clone())?;
                Ok(result)
            }
            AssignOp::Logical(logical) => {
                let current = self.eval_expr(target)?;
                if self.short_circuits(logical, &current) {
                    return Ok(current);
                }
                let name = match &target.kind {
                    ExprKind::Ident(name) => Some(name),
                    _ => None,
                };
                let result = self.eval_named(value, name)?;
                self.assign_to(target, result.clone())?;
                Ok(result)
            }
        }
    }

    /// Store `value` into an assignment target expression.
    pub(crate) fn assign_to(&mut self, target: &Expr, value: Value) -> EvalResult<()> {
        match &target.kind {
            ExprKind::Ident(name) => self.assign_identifier(name, value),
            ExprKind::Member {
                object, property, ..
            } => {
                let base = self.eval_expr(object)?;
                let key = self.member_key(property)?;
                self.set(&base, &key, value)
            }
            _ => Err(self.throw((
                errors::ErrorKind::Syntax,
                "Invalid left-hand side in assignment".to_string(),
            ))),
        }
    }

    fn member_key(&mut self, property: &MemberProp) -> EvalResult<Name> {
        match property {
            MemberProp::Named(name) => Ok(name.clone()),
            MemberProp::Computed(expr) => {
                let key = self.eval_expr(expr)?;
                self.to_property_key(&key)
            }
        }
    }

    /// Member access and calls; `None` when an optional link short-circuits
    /// the rest of the chain.
    fn eval_chain(&mut self, expr: &Expr) -> EvalResult<Option<Value>> {
        self.taped(expr, |interp| interp.eval_chain_step(expr))
    }

    fn eval_chain_step(&mut self, expr: &Expr) -> EvalResult<Option<Value>> {
        match &expr.kind {
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let Some(base) = self.eval_chain_link(object)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property)?;
                self.get(&base, &key).map(Some)
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                let Some((func, this)) = self.eval_callee(callee)? else {
                    return Ok(None);
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_elements(args)?;
                if !func.is_callable() {
                    return Err(self.throw(errors::not_a_function(&describe_callee(callee))));
                }
                self.call(&func, this, &args).map(Some)
            }
            _ => self.eval_expr(expr).map(Some),
        }
    }

    fn eval_chain_link(&mut self, expr: &Expr) -> EvalResult<Option<Value>> {
        match &expr.kind {
            ExprKind::Member { .. } | ExprKind::Call { .. } => self.eval_chain(expr),
            _ => self.eval_expr(expr).map(Some),
        }
    }

    /// Callee plus the `this` a call through it receives.
    fn eval_callee(&mut self, callee: &Expr) -> EvalResult<Option<(Value, Value)>> {
        match &callee.kind {
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let Some(base) = self.eval_chain_link(object)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let func = self
                    .taped(callee, |interp| {
                        let key = interp.member_key(property)?;
                        interp.get(&base, &key).map(Some)
                    })?
                    .unwrap_or_default();
                Ok(Some((func, base)))
            }
            _ => Ok(self
                .eval_chain_link(callee)?
                .map(|func| (func, Value::Undefined))),
        }
    }

    /// Apply a binary operator to two evaluated operands.
    pub fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
        use BinaryOp::*;
        Ok(match op {
            Add => {
                let l = self.to_primitive(left, Hint::Default)?;
                let r = self.to_primitive(right, Hint::Default)?;
                if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                    let mut s = ops::primitive_to_string(&l);
                    s.push_str(&ops::primitive_to_string(&r));
                    Value::Str(Name::from(s))
                } else {
                    Value::Number(ops::primitive_to_number(&l) + ops::primitive_to_number(&r))
                }
            }
            Sub | Mul | Div | Rem | Exp => {
                let l = self.to_number(left)?;
                let r = self.to_number(right)?;
                Value::Number(match op {
                    Sub => l - r,
                    Mul => l * r,
                    Div => l / r,
                    Rem => l % r,
                    _ => {
                        if r.is_nan() || (l.abs() == 1.0 && r.is_infinite()) {
                            f64::NAN
                        } else {
                            l.powf(r)
                        }
                    }
                })
            }
            StrictEq => Value::Bool(left.strict_equals(right)),
            StrictNotEq => Value::Bool(!left.strict_equals(right)),
            LooseEq => Value::Bool(self.loose_equals(left, right)?),
            LooseNotEq => Value::Bool(!self.loose_equals(left, right)?),
            Lt | LtEq | Gt | GtEq => {
                let l = self.to_primitive(left, Hint::Number)?;
                let r = self.to_primitive(right, Hint::Number)?;
                let ordering = match (&l, &r) {
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => ops::primitive_to_number(&l).partial_cmp(&ops::primitive_to_number(&r)),
                };
                Value::Bool(match ordering {
                    None => false,
                    Some(ordering) => match op {
                        Lt => ordering.is_lt(),
                        LtEq => ordering.is_le(),
                        Gt => ordering.is_gt(),
                        _ => ordering.is_ge(),
                    },
                })
            }
            BitAnd | BitOr | BitXor | Shl | Shr => {
                let l = ops::to_int32(self.to_number(left)?);
                let r = ops::to_uint32(self.to_number(right)?);
                let shift = r & 31;
                let r = r as i32;
                Value::Number(f64::from(match op {
                    BitAnd => l & r,
                    BitOr => l | r,
                    BitXor => l ^ r,
                    Shl => l.wrapping_shl(shift),
                    _ => l >> shift,
                }))
            }
            UShr => {
                let l = ops::to_uint32(self.to_number(left)?);
                let r = ops::to_uint32(self.to_number(right)?) & 31;
                Value::Number(f64::from(l >> r))
            }
            In => {
                let Value::Object(object) = right else {
                    let key = self.to_string(left)?;
                    let described = self.inspect(right);
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{key}' in {described}"
                    )));
                };
                let key = self.to_property_key(left)?;
                Value::Bool(super::has_property(object, &key))
            }
            InstanceOf => Value::Bool(self.instance_of(left, right)?),
        })
    }

    pub(crate) fn instance_of(&mut self, value: &Value, constructor: &Value) -> EvalResult<bool> {
        let Some(callable) = constructor.as_object().and_then(ObjRef::callable) else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        if let crate::value::Callable::Bound(bound) = callable {
            return self.instance_of(value, &bound.target);
        }
        let Value::Object(object) = value else {
            return Ok(false);
        };
        let Value::Object(proto) = self.get(constructor, "prototype")? else {
            return Ok(false);
        };
        let mut current = object.borrow().prototype.clone();
        while let Some(candidate) = current {
            if candidate.ptr_eq(&proto) {
                return Ok(true);
            }
            current = candidate.borrow().prototype.clone();
        }
        Ok(false)
    }

    /// `==`.
    pub fn loose_equals(&mut self, left: &Value, right: &Value) -> EvalResult<bool> {
        match (left, right) {
            (Value::Object(a), Value::Object(b)) => Ok(a.ptr_eq(b)),
            (Value::Object(_), other) | (other, Value::Object(_)) if other.is_nullish() => Ok(false),
            (Value::Object(_), _) => {
                let l = self.to_primitive(left, Hint::Default)?;
                Ok(ops::primitive_loose_equals(&l, right))
            }
            (_, Value::Object(_)) => {
                let r = self.to_primitive(right, Hint::Default)?;
                Ok(ops::primitive_loose_equals(left, &r))
            }
            _ => Ok(ops::primitive_loose_equals(left, right)),
        }
    }

    fn dynamic_import(
        &mut self,
        specifier: &str,
        strategy: cbx_ir::ast::LoadingStrategy,
    ) -> EvalResult {
        let script = self.script.clone();
        let host = script.as_ref().and_then(|s| s.host().map(|h| (s, h)));
        match host {
            Some((script, host)) => host.import_dynamic(self, specifier, script, strategy),
            None => {
                let promise = self.new_promise();
                let error = self.create_error(
                    errors::ErrorKind::Type,
                    &format!("Cannot import '{specifier}': dynamic import is not available here"),
                );
                self.reject_promise(&promise, Value::Object(error));
                Ok(Value::Object(promise))
            }
        }
    }
}
