use std::{
    fmt,
    hash::{Hash, Hasher},
    path::PathBuf,
    rc::Rc,
};

use crate::{
    ast::Block,
    diagnostics::ProtolexError,
    environment::EnvironmentRef,
    table::{Table, TableRef},
};

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// Marks an absent key. Never storable in a table or a binding.
    Undefined,
    String(Rc<str>),
    Table(TableRef),
    Function(Rc<Function>),
}

impl Value {
    pub fn string(value: impl AsRef<str>) -> Self {
        Value::String(Rc::from(value.as_ref()))
    }

    pub fn table(table: Table) -> Self {
        Value::Table(Table::into_ref(table))
    }

    pub fn native(
        name: &'static str,
        callback: impl Fn(&[Value]) -> NativeResult + 'static,
    ) -> Self {
        Value::Function(Rc::new(Function::Native(NativeFunction {
            name,
            callback: Rc::new(callback),
        })))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
            _ => true,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
        }
    }
}

/// Language equality: by value for primitives, by identity for tables and
/// functions, numeric across int and float.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) if n.is_nan() => write!(f, "nan"),
            Value::Float(n) if n.is_infinite() => {
                write!(f, "{}", if *n > 0.0 { "inf" } else { "-inf" })
            }
            Value::Float(n) => write!(f, "{n:.6}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::String(s) => write!(f, "{s}"),
            Value::Table(_) => write!(f, "<table>"),
            Value::Function(_) => write!(f, "<function>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Table(table) => write!(f, "<table {:p}>", Rc::as_ptr(table)),
            Value::Function(fun) => write!(f, "<fn {}>", fun.name()),
            other => write!(f, "{other}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

/// Hashable projection of a [`Value`] used as a table key.
///
/// Floats holding an exact integer collapse onto the integer key so that
/// keys agree with `==`. Tables and functions hash by identity.
#[derive(Clone)]
pub enum TableKey {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    String(Rc<str>),
    Table(TableRef),
    Function(Rc<Function>),
}

impl TableKey {
    /// Returns `None` for `Undefined`, which can never address a slot.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Int(n) => TableKey::Int(*n),
            Value::Float(n) => {
                let truncated = *n as i64;
                if n.fract() == 0.0 && (truncated as f64) == *n {
                    TableKey::Int(truncated)
                } else {
                    TableKey::Float(*n)
                }
            }
            Value::Bool(b) => TableKey::Bool(*b),
            Value::Null => TableKey::Null,
            Value::Undefined => return None,
            Value::String(s) => TableKey::String(Rc::clone(s)),
            Value::Table(t) => TableKey::Table(Rc::clone(t)),
            Value::Function(fun) => TableKey::Function(Rc::clone(fun)),
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Int(n) => Value::Int(*n),
            TableKey::Float(n) => Value::Float(*n),
            TableKey::Bool(b) => Value::Bool(*b),
            TableKey::Null => Value::Null,
            TableKey::String(s) => Value::String(Rc::clone(s)),
            TableKey::Table(t) => Value::Table(Rc::clone(t)),
            TableKey::Function(fun) => Value::Function(Rc::clone(fun)),
        }
    }
}

impl From<&str> for TableKey {
    fn from(value: &str) -> Self {
        TableKey::String(Rc::from(value))
    }
}

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TableKey::Int(a), TableKey::Int(b)) => a == b,
            (TableKey::Float(a), TableKey::Float(b)) => a.to_bits() == b.to_bits(),
            (TableKey::Bool(a), TableKey::Bool(b)) => a == b,
            (TableKey::Null, TableKey::Null) => true,
            (TableKey::String(a), TableKey::String(b)) => a == b,
            (TableKey::Table(a), TableKey::Table(b)) => Rc::ptr_eq(a, b),
            (TableKey::Function(a), TableKey::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for TableKey {}

impl Hash for TableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TableKey::Int(n) => n.hash(state),
            TableKey::Float(n) => n.to_bits().hash(state),
            TableKey::Bool(b) => b.hash(state),
            TableKey::Null => {}
            TableKey::String(s) => s.hash(state),
            TableKey::Table(t) => (Rc::as_ptr(t) as *const () as usize).hash(state),
            TableKey::Function(fun) => (Rc::as_ptr(fun) as *const () as usize).hash(state),
        }
    }
}

impl fmt::Debug for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_value())
    }
}

pub enum Function {
    Native(NativeFunction),
    User(UserFunction),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Native(native) => native.name,
            Function::User(_) => "anonymous",
        }
    }
}

/// Failure channel of a native function.
#[derive(Debug)]
pub enum NativeError {
    /// Raised as a language-level exception at the call site.
    Thrown(Value),
    Fatal(ProtolexError),
}

impl NativeError {
    pub fn message(message: impl AsRef<str>) -> Self {
        NativeError::Thrown(Value::string(message))
    }
}

impl From<ProtolexError> for NativeError {
    fn from(err: ProtolexError) -> Self {
        NativeError::Fatal(err)
    }
}

pub type NativeResult = Result<Value, NativeError>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub callback: Rc<dyn Fn(&[Value]) -> NativeResult>,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value]) -> NativeResult {
        (self.callback)(args)
    }
}

#[derive(Clone)]
pub struct UserFunction {
    pub params: Rc<[String]>,
    pub body: Rc<Block>,
    pub env: EnvironmentRef,
    /// Directory of the module that defined the function; relative imports
    /// inside the body resolve against it.
    pub module_dir: Option<PathBuf>,
}
