use std::{
    env, fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::{debug, trace, warn};

use crate::{
    ast::{BinaryOp, Block, CatchBinding, CatchClause, ElseBranch, Literal, Node, NodeKind, TableField, UnaryOp},
    config::{self, ExecutionContext},
    diagnostics::{Diagnostic, ProtolexError, Result, SourcePos},
    environment::{Environment, EnvironmentRef},
    parser,
    stack::ensure_sufficient_stack,
    stdlib::{self, ModuleRegistry},
    table::{self, Table, TableError, TableRef, PROTO_KEY},
    value::{Function, NativeError, UserFunction, Value},
};

/// Result of evaluating a node: a value, or an exception in flight.
#[derive(Debug, Clone)]
pub enum Outcome {
    Normal(Value),
    Thrown(Value),
}

impl Outcome {
    /// A thrown string message.
    pub fn error(message: impl AsRef<str>) -> Self {
        Outcome::Thrown(Value::string(message))
    }

    pub fn is_thrown(&self) -> bool {
        matches!(self, Outcome::Thrown(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Outcome::Normal(value) | Outcome::Thrown(value) => value,
        }
    }
}

/// Unwraps a normal outcome, returning early with a thrown one.
macro_rules! normal {
    ($outcome:expr) => {
        match $outcome {
            Outcome::Normal(value) => value,
            thrown @ Outcome::Thrown(_) => return Ok(thrown),
        }
    };
}

fn throw(message: impl AsRef<str>) -> Result<Outcome> {
    Ok(Outcome::error(message))
}

pub struct Interpreter {
    globals: EnvironmentRef,
    context: ExecutionContext,
    modules: ModuleRegistry,
    call_depth: usize,
    /// File whose code is currently running, attached to fatal diagnostics.
    current_file: Option<PathBuf>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        let globals = Environment::new();
        stdlib::install_prelude(&globals);
        let modules = ModuleRegistry::new(&context);
        Self {
            globals,
            current_file: context.script_path.clone(),
            context,
            modules,
            call_depth: 0,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Root scope holding the prelude and every top-level binding.
    pub fn globals(&self) -> &EnvironmentRef {
        &self.globals
    }

    /// Evaluates `source` in the root scope; bindings persist across calls.
    pub fn eval_source(&mut self, source: &str) -> Result<Outcome> {
        let program = parser::parse_program(source)?;
        self.eval_program(&program)
    }

    pub fn eval_program(&mut self, program: &Block) -> Result<Outcome> {
        let globals = Rc::clone(&self.globals);
        let module_dir = self.context.module_dir.clone();
        self.eval_block(program, &globals, module_dir.as_deref(), false)
    }

    /// Reads, parses and evaluates a script file. Relative imports resolve
    /// against the script's directory.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<Outcome> {
        let path = path.as_ref();
        let source = read_source(path)?;
        let program = parser::parse_program(&source).map_err(|diag| diag.with_file(path))?;
        let module_dir = config::module_dir_of(path);
        let globals = Rc::clone(&self.globals);
        let previous = self.current_file.replace(path.to_path_buf());
        let result = self.eval_block(&program, &globals, module_dir.as_deref(), false);
        self.current_file = previous;
        result
    }

    /// Invokes a function value from the host.
    pub fn call_function(&mut self, callee: &Value, args: Vec<Value>) -> Result<Outcome> {
        self.call_value(callee, args)
    }

    fn fatal(&self, message: impl Into<String>, pos: SourcePos) -> ProtolexError {
        let diag = Diagnostic::runtime(message, pos);
        match &self.current_file {
            Some(file) => diag.with_file(file).into(),
            None => diag.into(),
        }
    }

    fn table_failure(&self, err: TableError, pos: SourcePos) -> Result<Outcome> {
        match err {
            TableError::PrototypeCycle => Err(self.fatal(err.to_string(), pos)),
            other => throw(other.to_string()),
        }
    }

    fn eval_block(
        &mut self,
        block: &Block,
        env: &EnvironmentRef,
        dir: Option<&Path>,
        new_scope: bool,
    ) -> Result<Outcome> {
        let scope = if new_scope {
            Environment::with_parent(Rc::clone(env))
        } else {
            Rc::clone(env)
        };
        let mut last = Value::Null;
        for statement in &block.statements {
            last = normal!(self.eval(statement, &scope, dir)?);
        }
        Ok(Outcome::Normal(last))
    }

    fn eval(&mut self, node: &Node, env: &EnvironmentRef, dir: Option<&Path>) -> Result<Outcome> {
        ensure_sufficient_stack(|| self.eval_node(node, env, dir))
    }

    fn eval_node(&mut self, node: &Node, env: &EnvironmentRef, dir: Option<&Path>) -> Result<Outcome> {
        match &node.kind {
            NodeKind::Block(block) => self.eval_block(block, env, dir, false),
            NodeKind::Literal(literal) => Ok(Outcome::Normal(literal_value(literal))),
            NodeKind::Variable(name) => match Environment::get(env, name) {
                Some(value) => Ok(Outcome::Normal(value)),
                None => throw("undefined variable"),
            },
            NodeKind::Assign { target, value } => self.eval_assign(target, value, env, dir, node.pos),
            NodeKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => {
                let left = normal!(self.eval(left, env, dir)?);
                match (op, left.is_truthy()) {
                    (BinaryOp::And, false) => Ok(Outcome::Normal(Value::Bool(false))),
                    (BinaryOp::Or, true) => Ok(Outcome::Normal(Value::Bool(true))),
                    _ => {
                        let right = normal!(self.eval(right, env, dir)?);
                        Ok(Outcome::Normal(Value::Bool(right.is_truthy())))
                    }
                }
            }
            NodeKind::Binary { op, left, right } => {
                let left = normal!(self.eval(left, env, dir)?);
                let right = normal!(self.eval(right, env, dir)?);
                Ok(binary(*op, left, right))
            }
            NodeKind::Unary { op, expr } => {
                let value = normal!(self.eval(expr, env, dir)?);
                Ok(unary(*op, value))
            }
            NodeKind::Call { callee, args } => {
                let callee = normal!(self.eval(callee, env, dir)?);
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(normal!(self.eval(arg, env, dir)?));
                }
                self.call_value(&callee, values)
            }
            NodeKind::Dot { object, name } => {
                let object = normal!(self.eval(object, env, dir)?);
                match object {
                    Value::Table(table) => {
                        Ok(Outcome::Normal(table::lookup(&table, &Value::string(name))))
                    }
                    _ => throw("lookup on non-table"),
                }
            }
            NodeKind::Index { object, index } => {
                let object = normal!(self.eval(object, env, dir)?);
                let key = normal!(self.eval(index, env, dir)?);
                match object {
                    Value::Table(table) => Ok(Outcome::Normal(table::lookup(&table, &key))),
                    _ => throw("index on non-table"),
                }
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = normal!(self.eval(condition, env, dir)?);
                if condition.is_truthy() {
                    return self.eval_block(then_branch, env, dir, true);
                }
                match else_branch {
                    Some(ElseBranch::If(nested)) => self.eval(nested, env, dir),
                    Some(ElseBranch::Block(block)) => self.eval_block(block, env, dir, true),
                    None => Ok(Outcome::Normal(Value::Null)),
                }
            }
            NodeKind::Function { params, body } => {
                let function = UserFunction {
                    params: Rc::clone(params),
                    body: Rc::clone(body),
                    env: Rc::clone(env),
                    module_dir: dir.map(Path::to_path_buf),
                };
                Ok(Outcome::Normal(Value::Function(Rc::new(Function::User(function)))))
            }
            NodeKind::Import { name, path } => self.eval_import(name, path, env, dir),
            NodeKind::Mutate { target, body } => {
                let target = normal!(self.eval(target, env, dir)?);
                let Value::Table(table) = target else {
                    return throw("mutate on non-table");
                };
                let thawed = table::thaw(&table);
                let result = self.eval_block(body, env, dir, true);
                table::refreeze(&thawed);
                result
            }
            NodeKind::Undefine { target } => self.eval_undefine(target, env, dir, node.pos),
            NodeKind::Try {
                body,
                catch,
                finally,
            } => self.eval_try(body, catch.as_ref(), finally.as_ref(), env, dir, node.pos),
            NodeKind::Throw(expr) => {
                let value = normal!(self.eval(expr, env, dir)?);
                Ok(Outcome::Thrown(value))
            }
            NodeKind::Table(fields) => self.eval_table(fields, env, dir, node.pos),
        }
    }

    fn eval_assign(
        &mut self,
        target: &Node,
        value: &Node,
        env: &EnvironmentRef,
        dir: Option<&Path>,
        pos: SourcePos,
    ) -> Result<Outcome> {
        let value = normal!(self.eval(value, env, dir)?);
        if matches!(value, Value::Undefined) {
            return throw("cannot assign undefined");
        }
        match &target.kind {
            NodeKind::Variable(name) => {
                Environment::assign(env, name, value.clone());
                Ok(Outcome::Normal(value))
            }
            NodeKind::Dot { object, name } => {
                let object = normal!(self.eval(object, env, dir)?);
                let Value::Table(table) = object else {
                    return throw("assignment on non-table");
                };
                self.store(&table, &Value::string(name), value, pos)
            }
            NodeKind::Index { object, index } => {
                let object = normal!(self.eval(object, env, dir)?);
                let key = normal!(self.eval(index, env, dir)?);
                let Value::Table(table) = object else {
                    return throw("assignment on non-table");
                };
                self.store(&table, &key, value, pos)
            }
            _ => throw("invalid assignment"),
        }
    }

    /// Writes one slot; the `proto` key reassigns the prototype instead.
    fn store(&self, table: &TableRef, key: &Value, value: Value, pos: SourcePos) -> Result<Outcome> {
        let result = if key.as_str() == Some(PROTO_KEY) {
            table::set_proto(table, &value)
        } else {
            table.borrow_mut().set(key, value.clone())
        };
        match result {
            Ok(()) => Ok(Outcome::Normal(value)),
            Err(err) => self.table_failure(err, pos),
        }
    }

    fn eval_undefine(
        &mut self,
        target: &Node,
        env: &EnvironmentRef,
        dir: Option<&Path>,
        pos: SourcePos,
    ) -> Result<Outcome> {
        let (object, key) = match &target.kind {
            NodeKind::Dot { object, name } => {
                let object = normal!(self.eval(object, env, dir)?);
                (object, Value::string(name))
            }
            NodeKind::Index { object, index } => {
                let object = normal!(self.eval(object, env, dir)?);
                let key = normal!(self.eval(index, env, dir)?);
                (object, key)
            }
            _ => return throw("undefine target must be slot"),
        };
        let Value::Table(table) = object else {
            return throw("undefine on non-table");
        };
        let result = table.borrow_mut().delete(&key);
        match result {
            Ok(()) => Ok(Outcome::Normal(Value::Null)),
            Err(err) => self.table_failure(err, pos),
        }
    }

    fn eval_try(
        &mut self,
        body: &Block,
        catch: Option<&CatchClause>,
        finally: Option<&Block>,
        env: &EnvironmentRef,
        dir: Option<&Path>,
        pos: SourcePos,
    ) -> Result<Outcome> {
        let attempt = self.eval_block(body, env, dir, true)?;
        let handled = match (attempt, catch) {
            (Outcome::Thrown(exception), Some(clause)) => match &clause.binding {
                CatchBinding::Any => self.eval_block(&clause.body, env, dir, true)?,
                CatchBinding::Named(name) => {
                    let catch_env = Environment::with_parent(Rc::clone(env));
                    catch_env.borrow_mut().define(name.clone(), exception);
                    self.eval_block(&clause.body, &catch_env, dir, true)?
                }
            },
            (attempt, _) => attempt,
        };
        if let Some(finally) = finally {
            if self.eval_block(finally, env, dir, true)?.is_thrown() {
                return Err(self.fatal("finally cannot throw", pos));
            }
        }
        Ok(handled)
    }

    fn eval_table(
        &mut self,
        fields: &[TableField],
        env: &EnvironmentRef,
        dir: Option<&Path>,
        pos: SourcePos,
    ) -> Result<Outcome> {
        let table = Table::new_ref();
        for field in fields {
            let value = normal!(self.eval(&field.value, env, dir)?);
            if matches!(value, Value::Undefined) {
                return throw("cannot assign undefined");
            }
            normal!(self.store(&table, &Value::string(&field.key), value, pos)?);
        }
        Ok(Outcome::Normal(Value::Table(table)))
    }

    fn eval_import(
        &mut self,
        name: &str,
        path: &str,
        env: &EnvironmentRef,
        dir: Option<&Path>,
    ) -> Result<Outcome> {
        if let Some(module) = self.modules.resolve(path) {
            debug!(module = path, "imported built-in module");
            let value = Value::Table(module);
            env.borrow_mut().define(name, value.clone());
            return Ok(Outcome::Normal(value));
        }

        let Some(file) = resolve_module_path(path, dir) else {
            debug!(module = path, dir = ?dir, "module not found");
            return throw("cannot open module");
        };
        if self.call_depth >= self.context.max_call_depth {
            warn!(depth = self.call_depth, module = path, "import depth limit reached");
            return throw("stack overflow");
        }
        let source = match read_source(&file) {
            Ok(source) => source,
            Err(err) => {
                debug!(file = %file.display(), error = %err, "module unreadable");
                return throw("cannot open module");
            }
        };
        debug!(module = path, file = %file.display(), "importing module");
        let program = parser::parse_program(&source).map_err(|diag| diag.with_file(&file))?;

        let module_dir = config::module_dir_of(&file);
        let module_env = Environment::with_parent(Rc::clone(env));
        let previous = self.current_file.replace(file);
        self.call_depth += 1;
        let result = self.eval_block(&program, &module_env, module_dir.as_deref(), false);
        self.call_depth -= 1;
        self.current_file = previous;

        let value = normal!(result?);
        env.borrow_mut().define(name, value.clone());
        Ok(Outcome::Normal(value))
    }

    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Outcome> {
        let Value::Function(function) = callee else {
            return throw("call on non-function");
        };
        match &**function {
            Function::Native(native) => {
                trace!(name = native.name, argc = args.len(), "native call");
                match native.call(&args) {
                    Ok(value) => Ok(Outcome::Normal(value)),
                    Err(NativeError::Thrown(value)) => Ok(Outcome::Thrown(value)),
                    Err(NativeError::Fatal(err)) => Err(err),
                }
            }
            Function::User(user) => self.call_user(user, args),
        }
    }

    fn call_user(&mut self, function: &UserFunction, args: Vec<Value>) -> Result<Outcome> {
        if args.len() != function.params.len() {
            return throw("arity mismatch");
        }
        if self.call_depth >= self.context.max_call_depth {
            warn!(depth = self.call_depth, "call depth limit reached");
            return throw("stack overflow");
        }
        let call_env = Environment::with_parent(Rc::clone(&function.env));
        {
            let mut scope = call_env.borrow_mut();
            for (name, value) in function.params.iter().zip(args) {
                scope.define(name.as_str(), value);
            }
        }
        trace!(arity = function.params.len(), depth = self.call_depth, "call");
        self.call_depth += 1;
        let result = self.eval_block(&function.body, &call_env, function.module_dir.as_deref(), true);
        self.call_depth -= 1;
        result
    }
}

fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Finds the file behind a non-builtin import path. Tried in order: an
/// absolute path as is, the importing module's directory, its parent, the
/// working directory, then the raw path.
fn resolve_module_path(raw: &str, module_dir: Option<&Path>) -> Option<PathBuf> {
    let path = Path::new(raw);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    let mut candidates = Vec::new();
    if let Some(dir) = module_dir {
        candidates.push(dir.join(path));
        let parent = dir
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        candidates.push(parent.join(path));
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join(path));
    }
    candidates.push(path.to_path_buf());
    candidates.into_iter().find(|candidate| candidate.is_file())
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::String(s) => Value::String(Rc::clone(s)),
        Literal::Null => Value::Null,
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Outcome {
    use BinaryOp::*;
    match op {
        Add | Sub | Mul | Div => arithmetic(op, &left, &right),
        Equal => Outcome::Normal(Value::Bool(left == right)),
        NotEqual => Outcome::Normal(Value::Bool(left != right)),
        Less => compare(op, &left, &right, |a, b| a < b),
        LessEqual => compare(op, &left, &right, |a, b| a <= b),
        Greater => compare(op, &left, &right, |a, b| a > b),
        GreaterEqual => compare(op, &left, &right, |a, b| a >= b),
        And => Outcome::Normal(Value::Bool(left.is_truthy() && right.is_truthy())),
        Or => Outcome::Normal(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Outcome {
    if op == BinaryOp::Add && (left.as_str().is_some() || right.as_str().is_some()) {
        return Outcome::error("string concatenation not implemented");
    }
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let result = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            _ if *b == 0 => return Outcome::error("division by zero"),
            _ => a.checked_div(*b),
        };
        return match result {
            Some(n) => Outcome::Normal(Value::Int(n)),
            None => Outcome::error("integer overflow"),
        };
    }
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Outcome::error(format!("non-numeric '{}'", op.symbol()));
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => a / b,
    };
    Outcome::Normal(Value::Float(result))
}

fn compare(op: BinaryOp, left: &Value, right: &Value, cmp: impl Fn(f64, f64) -> bool) -> Outcome {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Outcome::Normal(Value::Bool(cmp(a, b))),
        _ => Outcome::error(format!("non-numeric '{}'", op.symbol())),
    }
}

fn unary(op: UnaryOp, value: Value) -> Outcome {
    match (op, value) {
        (UnaryOp::Not, value) => Outcome::Normal(Value::Bool(!value.is_truthy())),
        (UnaryOp::Negate, Value::Int(n)) => match n.checked_neg() {
            Some(n) => Outcome::Normal(Value::Int(n)),
            None => Outcome::error("integer overflow"),
        },
        (UnaryOp::Negate, Value::Float(n)) => Outcome::Normal(Value::Float(-n)),
        (UnaryOp::Negate, _) => Outcome::error("non-numeric unary '-'"),
    }
}
