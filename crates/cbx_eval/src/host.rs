//! Seams between the interpreter and whoever loads modules.
//!
//! The interpreter knows nothing about files or module graphs. Dynamic
//! `import()` and `import.meta` are forwarded to the [`ModuleHost`] recorded
//! in the running script's [`ScriptInfo`]; namespace objects read their
//! exports through a [`NamespaceSource`].

use std::path::PathBuf;
use std::rc::{Rc, Weak};

use cbx_ir::ast::LoadingStrategy;
use cbx_ir::Name;

use crate::errors::EvalResult;
use crate::realm::Realm;
use crate::value::Value;
use crate::Interpreter;

/// Loads modules on behalf of running scripts.
pub trait ModuleHost {
    /// Start a dynamic import and return the promise for its result.
    fn import_dynamic(
        &self,
        interp: &mut Interpreter,
        specifier: &str,
        referrer: &ScriptInfo,
        strategy: LoadingStrategy,
    ) -> EvalResult;

    /// The `import.meta` object for `referrer`.
    fn import_meta(&self, interp: &mut Interpreter, referrer: &ScriptInfo) -> EvalResult;
}

/// Read access to a module's exports.
pub trait NamespaceSource {
    /// Exported names; namespace objects enumerate them sorted.
    fn export_names(&self) -> Vec<Name>;

    /// Current value of `name`, or `None` when it is not exported.
    ///
    /// Reading a binding still in its temporal dead zone throws.
    fn get_export(&self, interp: &mut Interpreter, name: &str) -> EvalResult<Option<Value>>;
}

/// Identity of the script a piece of code came from.
pub struct ScriptInfo {
    /// Module identity (absolute path plus suffix) or a synthetic name.
    pub id: Name,
    /// Directory relative requests resolve against.
    pub dir: PathBuf,
    /// Realm the script's functions run in.
    pub realm: Rc<Realm>,
    pub host: Option<Weak<dyn ModuleHost>>,
}

impl ScriptInfo {
    pub fn new(id: Name, dir: PathBuf, realm: Rc<Realm>) -> Self {
        ScriptInfo {
            id,
            dir,
            realm,
            host: None,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: Weak<dyn ModuleHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn host(&self) -> Option<Rc<dyn ModuleHost>> {
        self.host.as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for ScriptInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptInfo")
            .field("id", &self.id)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}
