//! Abrupt completions and error constructors.
//!
//! Script-level exceptions and control flow share one channel:
//! [`Interrupt`] travels through `Err` so `?` unwinds loops, calls and
//! `try` blocks uniformly. Only [`Interrupt::Throw`] is catchable by script
//! code; [`Interrupt::Terminate`] always reaches the host.
//! [`Interrupt::Suspend`] unwinds a coroutine body at an `await` and never
//! leaves the body it suspended.

use std::fmt;

use crate::value::Value;

pub type EvalResult<T = Value> = Result<T, Interrupt>;

#[derive(Clone, Debug)]
pub enum Interrupt {
    Throw(Value),
    Return(Value),
    Break,
    Continue,
    /// An `await` is waiting; the awaited promise is held by the coroutine.
    Suspend,
    Terminate(Termination),
}

/// Why execution was aborted from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The wall-clock deadline passed.
    Timeout,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Timeout => f.write_str("execution timed out"),
        }
    }
}

impl Interrupt {
    /// Whether script code may observe this interrupt with `catch`.
    #[inline]
    pub fn is_catchable(&self) -> bool {
        matches!(self, Interrupt::Throw(_))
    }
}

/// Built-in error constructors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    Type,
    Reference,
    Syntax,
    Range,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::Type,
        ErrorKind::Reference,
        ErrorKind::Syntax,
        ErrorKind::Range,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Type => "TypeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Range => "RangeError",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[cold]
pub fn not_defined(name: &str) -> (ErrorKind, String) {
    (ErrorKind::Reference, format!("{name} is not defined"))
}

#[cold]
pub fn before_initialization(name: &str) -> (ErrorKind, String) {
    (
        ErrorKind::Reference,
        format!("Cannot access '{name}' before initialization"),
    )
}

#[cold]
pub fn assignment_to_constant() -> (ErrorKind, String) {
    (ErrorKind::Type, "Assignment to constant variable.".to_string())
}

#[cold]
pub fn not_a_function(what: &str) -> (ErrorKind, String) {
    (ErrorKind::Type, format!("{what} is not a function"))
}

#[cold]
pub fn not_a_constructor(what: &str) -> (ErrorKind, String) {
    (ErrorKind::Type, format!("{what} is not a constructor"))
}

#[cold]
pub fn cannot_read(key: &str, base: &str) -> (ErrorKind, String) {
    (
        ErrorKind::Type,
        format!("Cannot read properties of {base} (reading '{key}')"),
    )
}

#[cold]
pub fn cannot_set(key: &str, base: &str) -> (ErrorKind, String) {
    (
        ErrorKind::Type,
        format!("Cannot set properties of {base} (setting '{key}')"),
    )
}

#[cold]
pub fn not_iterable(what: &str) -> (ErrorKind, String) {
    (ErrorKind::Type, format!("{what} is not iterable"))
}

#[cold]
pub fn read_only_property(key: &str) -> (ErrorKind, String) {
    (
        ErrorKind::Type,
        format!("Cannot assign to read only property '{key}' of object"),
    )
}

#[cold]
pub fn call_stack_exceeded() -> (ErrorKind, String) {
    (
        ErrorKind::Range,
        "Maximum call stack size exceeded".to_string(),
    )
}

#[cold]
pub fn await_outside_async() -> (ErrorKind, String) {
    (
        ErrorKind::Syntax,
        "await is only valid in async functions and the top level bodies of modules".to_string(),
    )
}
