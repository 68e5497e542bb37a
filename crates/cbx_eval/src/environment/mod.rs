//! Lexical environments.
//!
//! Scopes form a parent chain of shared [`LocalScope`] cells: closures keep
//! the chain alive, the interpreter swaps the current scope on calls and
//! blocks. The outermost scope of a realm may be backed by the global object,
//! so unresolved names fall through to its properties.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use cbx_ir::Name;
use rustc_hash::FxHashMap;

use crate::host::NamespaceSource;
use crate::value::{ObjRef, Value};

/// Whether a binding can be reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    /// `var`, `let`, parameters, functions.
    Mutable,
    /// `const` and import bindings.
    Immutable,
}

impl Mutability {
    #[inline]
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

/// Why [`Scope::assign`] refused a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignError {
    Immutable,
    /// Binding is still in its temporal dead zone.
    Uninitialized,
    /// No binding and no global object to fall back to.
    Undefined,
}

/// A single-threaded scope wrapper for reference-counted interior mutability.
///
/// All scope allocations go through [`LocalScope::new`]; the wrapper is
/// `#[repr(transparent)]` over `Rc<RefCell<T>>`.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &LocalScope<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope").field(&self.0).finish()
    }
}

impl<T: Default> Default for LocalScope<T> {
    fn default() -> Self {
        LocalScope::new(T::default())
    }
}

impl<T> Deref for LocalScope<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Contents of a binding.
#[derive(Clone)]
enum Slot {
    Value(Value),
    /// `let`/`const` before its declaration ran.
    Uninitialized,
    /// Live view of another module's export.
    Import(Rc<dyn NamespaceSource>, Name),
}

#[derive(Clone)]
struct Binding {
    slot: Slot,
    mutability: Mutability,
}

/// What a name resolves to.
pub enum Resolution {
    Value(Value),
    Uninitialized,
    Import(Rc<dyn NamespaceSource>, Name),
    /// Not bound lexically, but a property of this global object.
    Global(ObjRef),
    NotFound,
}

/// A single scope containing variable bindings.
#[derive(Default)]
pub struct Scope {
    bindings: FxHashMap<Name, Binding>,
    parent: Option<LocalScope<Scope>>,
    global_object: Option<ObjRef>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn with_parent(parent: LocalScope<Scope>) -> Self {
        Scope {
            parent: Some(parent),
            ..Scope::default()
        }
    }

    /// Outermost scope of a realm, falling back to `global` properties.
    pub fn global(global: ObjRef) -> Self {
        Scope {
            global_object: Some(global),
            ..Scope::default()
        }
    }

    pub fn parent(&self) -> Option<&LocalScope<Scope>> {
        self.parent.as_ref()
    }

    /// Define (or redefine) an initialized binding in this scope.
    #[inline]
    pub fn define(&mut self, name: Name, value: Value, mutability: Mutability) {
        self.bindings.insert(
            name,
            Binding {
                slot: Slot::Value(value),
                mutability,
            },
        );
    }

    /// Define a `let`/`const` binding that is not yet initialized.
    pub fn declare_uninitialized(&mut self, name: Name, mutability: Mutability) {
        self.bindings.insert(
            name,
            Binding {
                slot: Slot::Uninitialized,
                mutability,
            },
        );
    }

    /// Define a live import binding reading `export` from `source`.
    pub fn define_import(&mut self, name: Name, source: Rc<dyn NamespaceSource>, export: Name) {
        self.bindings.insert(
            name,
            Binding {
                slot: Slot::Import(source, export),
                mutability: Mutability::Immutable,
            },
        );
    }

    /// Initialize a binding declared with [`Scope::declare_uninitialized`],
    /// or define it when absent.
    pub fn initialize(&mut self, name: &Name, value: Value) {
        match self.bindings.get_mut(name) {
            Some(binding) => binding.slot = Slot::Value(value),
            None => self.define(name.clone(), value, Mutability::Mutable),
        }
    }

    /// Whether `name` is bound directly in this scope.
    pub fn has_own(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Names bound directly in this scope.
    pub fn own_names(&self) -> Vec<Name> {
        self.bindings.keys().cloned().collect()
    }

    /// Look `name` up through the scope chain.
    pub fn resolve(&self, name: &str) -> Resolution {
        if let Some(binding) = self.bindings.get(name) {
            return match &binding.slot {
                Slot::Value(value) => Resolution::Value(value.clone()),
                Slot::Uninitialized => Resolution::Uninitialized,
                Slot::Import(source, export) => {
                    Resolution::Import(Rc::clone(source), export.clone())
                }
            };
        }
        if let Some(global) = &self.global_object {
            if crate::interpreter::has_property(global, name) {
                return Resolution::Global(global.clone());
            }
        }
        match &self.parent {
            Some(parent) => parent.borrow().resolve(name),
            None => Resolution::NotFound,
        }
    }

    /// Assign through the scope chain.
    ///
    /// With `create_global`, an unresolved name becomes a property of the
    /// nearest global object (sloppy-mode implicit global).
    pub fn assign(&mut self, name: &str, value: Value, create_global: bool) -> Result<(), AssignError> {
        if let Some(binding) = self.bindings.get_mut(name) {
            if !binding.mutability.is_mutable() {
                return Err(AssignError::Immutable);
            }
            if matches!(binding.slot, Slot::Uninitialized) {
                return Err(AssignError::Uninitialized);
            }
            binding.slot = Slot::Value(value);
            return Ok(());
        }
        if let Some(global) = &self.global_object {
            let exists = crate::interpreter::has_property(global, name);
            if exists || (create_global && self.parent.is_none()) {
                global.borrow_mut().set_data(name, value);
                return Ok(());
            }
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value, create_global),
            None => Err(AssignError::Undefined),
        }
    }

    /// Copy of this scope's own bindings with the same parent.
    ///
    /// Used to give each `for (let …)` iteration a fresh binding.
    pub fn snapshot(&self) -> Scope {
        Scope {
            bindings: self.bindings.clone(),
            parent: self.parent.clone(),
            global_object: self.global_object.clone(),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.bindings.keys().map(|n| &**n).collect();
        names.sort_unstable();
        f.debug_struct("Scope")
            .field("bindings", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests;
