//! Destructuring.

use cbx_ir::ast::{Pattern, PropKey};
use cbx_ir::Name;

use super::call::pattern_name;
use super::Interpreter;
use crate::environment::{AssignError, Mutability};
use crate::errors::{self, EvalResult};
use crate::value::Value;

/// Where the names of a pattern end up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindMode {
    /// `let`/`const`, parameters and catch bindings: the current scope.
    Declare(Mutability),
    /// `var`: the hoisted binding of the enclosing function.
    Var,
    /// Destructuring assignment: ordinary assignment semantics.
    Assign,
}

impl Interpreter {
    pub(crate) fn bind_pattern(&mut self, pattern: &Pattern, value: Value, mode: BindMode) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(name) => self.bind_name(name, value, mode),
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(self.type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        self.inspect(&value),
                        value.type_of()
                    )));
                }
                let mut used: Vec<Name> = Vec::with_capacity(props.len());
                for prop in props {
                    let key = match &prop.key {
                        PropKey::Named(name) => name.clone(),
                        PropKey::Computed(expr) => {
                            let key = self.eval_expr(expr)?;
                            self.to_property_key(&key)?
                        }
                    };
                    let mut item = self.get(&value, &key)?;
                    if let (Value::Undefined, Some(default)) = (&item, &prop.default) {
                        item = self.eval_named(default, pattern_name(&prop.value))?;
                    }
                    self.bind_pattern(&prop.value, item, mode)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let remaining = self.new_object();
                    if let Value::Object(source) = &value {
                        for (key, item) in self.own_entries(source)? {
                            if !used.contains(&key) {
                                remaining.borrow_mut().set_data(&key, item);
                            }
                        }
                    }
                    self.bind_name(rest, Value::Object(remaining), mode)?;
                }
                Ok(())
            }
            Pattern::Array { elements, rest } => {
                let items = self.iterate(&value)?;
                for (index, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let mut item = items.get(index).cloned().unwrap_or_default();
                    if let (Value::Undefined, Some(default)) = (&item, &element.default) {
                        item = self.eval_named(default, pattern_name(&element.pattern))?;
                    }
                    self.bind_pattern(&element.pattern, item, mode)?;
                }
                if let Some(rest) = rest {
                    let remaining = items.get(elements.len()..).map(<[Value]>::to_vec).unwrap_or_default();
                    let array = Value::Object(self.new_array(remaining));
                    self.bind_pattern(rest, array, mode)?;
                }
                Ok(())
            }
        }
    }

    fn bind_name(&mut self, name: &Name, value: Value, mode: BindMode) -> EvalResult<()> {
        match mode {
            BindMode::Declare(mutability) => {
                let mut scope = self.scope.borrow_mut();
                if scope.has_own(name) {
                    scope.initialize(name, value);
                } else {
                    scope.define(name.clone(), value, mutability);
                }
                Ok(())
            }
            BindMode::Var => {
                let outcome = self.scope.borrow_mut().assign(name, value.clone(), false);
                if let Err(AssignError::Undefined) = outcome {
                    self.scope
                        .borrow_mut()
                        .define(name.clone(), value, Mutability::Mutable);
                    return Ok(());
                }
                self.map_assign_error(name, outcome)
            }
            BindMode::Assign => self.assign_identifier(name, value),
        }
    }

    /// Assign to an identifier reference, creating an implicit global when
    /// nothing is bound.
    pub(crate) fn assign_identifier(&mut self, name: &str, value: Value) -> EvalResult<()> {
        let outcome = self.scope.borrow_mut().assign(name, value, true);
        self.map_assign_error(name, outcome)
    }

    fn map_assign_error(&self, name: &str, outcome: Result<(), AssignError>) -> EvalResult<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(AssignError::Immutable) => Err(self.throw(errors::assignment_to_constant())),
            Err(AssignError::Uninitialized) => Err(self.throw(errors::before_initialization(name))),
            Err(AssignError::Undefined) => Err(self.throw(errors::not_defined(name))),
        }
    }
}
