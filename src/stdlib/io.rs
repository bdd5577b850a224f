use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    rc::Rc,
};

use super::{expects, ModuleBuilder};
use crate::{
    table::{Table, TableRef},
    value::{NativeError, NativeResult, Value},
};

enum Stream {
    Stdin,
    Stdout,
    Stderr,
    File(File),
}

/// Open streams keyed by the identity of their handle table. Closing a
/// handle drops its entry.
#[derive(Default)]
struct FileRegistry {
    entries: Vec<(TableRef, Stream)>,
}

impl FileRegistry {
    fn register(&mut self, stream: Stream) -> Value {
        let mut handle = Table::new();
        handle.freeze();
        let handle = handle.into_ref();
        self.entries.push((Rc::clone(&handle), stream));
        Value::Table(handle)
    }

    fn stream(&mut self, handle: &TableRef) -> Result<&mut Stream, NativeError> {
        self.entries
            .iter_mut()
            .find(|(table, _)| Rc::ptr_eq(table, handle))
            .map(|(_, stream)| stream)
            .ok_or_else(|| NativeError::message("invalid file"))
    }

    fn close(&mut self, handle: &TableRef) -> Result<(), NativeError> {
        let index = self
            .entries
            .iter()
            .position(|(table, _)| Rc::ptr_eq(table, handle))
            .ok_or_else(|| NativeError::message("invalid file"))?;
        self.entries.swap_remove(index);
        Ok(())
    }
}

type SharedRegistry = Rc<RefCell<FileRegistry>>;

pub(super) fn build() -> TableRef {
    let registry: SharedRegistry = Rc::default();
    let (stdin, stdout, stderr) = {
        let mut files = registry.borrow_mut();
        (
            files.register(Stream::Stdin),
            files.register(Stream::Stdout),
            files.register(Stream::Stderr),
        )
    };
    ModuleBuilder::new()
        .function("open", with_registry(&registry, open))
        .function("read", with_registry(&registry, read))
        .function("write", with_registry(&registry, write))
        .function("close", with_registry(&registry, close))
        .value("stdin", stdin)
        .value("stdout", stdout)
        .value("stderr", stderr)
        .finish()
}

fn with_registry(
    registry: &SharedRegistry,
    native: fn(&mut FileRegistry, &[Value]) -> NativeResult,
) -> impl Fn(&[Value]) -> NativeResult + 'static {
    let registry = Rc::clone(registry);
    move |args| native(&mut registry.borrow_mut(), args)
}

fn open(files: &mut FileRegistry, args: &[Value]) -> NativeResult {
    let [Value::String(path), Value::String(mode)] = args else {
        return Err(expects("io.open", "string, string"));
    };
    let options = open_options(mode).ok_or_else(|| NativeError::message("io.open invalid mode"))?;
    let file = options
        .open(&**path)
        .map_err(|err| NativeError::message(os_message(&err)))?;
    Ok(files.register(Stream::File(file)))
}

/// Translates a C `fopen` mode string.
fn open_options(mode: &str) -> Option<OpenOptions> {
    let mode: String = mode.chars().filter(|ch| *ch != 'b').collect();
    let mut options = OpenOptions::new();
    match mode.as_str() {
        "r" => options.read(true),
        "w" => options.write(true).create(true).truncate(true),
        "a" => options.append(true).create(true),
        "r+" => options.read(true).write(true),
        "w+" => options.read(true).write(true).create(true).truncate(true),
        "a+" => options.read(true).append(true).create(true),
        _ => return None,
    };
    Some(options)
}

fn os_message(err: &io::Error) -> String {
    let message = err.to_string();
    match message.find(" (os error") {
        Some(end) => message[..end].to_string(),
        None => message,
    }
}

fn read(files: &mut FileRegistry, args: &[Value]) -> NativeResult {
    let [Value::Table(handle)] = args else {
        return Err(expects("io.read", "file"));
    };
    let mut buf = Vec::new();
    let result = match files.stream(handle)? {
        Stream::Stdin => io::stdin().read_to_end(&mut buf),
        Stream::File(file) => file.read_to_end(&mut buf),
        Stream::Stdout | Stream::Stderr => Err(io::Error::from(io::ErrorKind::Unsupported)),
    };
    result.map_err(|_| NativeError::message("io.read failed"))?;
    Ok(Value::string(String::from_utf8_lossy(&buf)))
}

fn write(files: &mut FileRegistry, args: &[Value]) -> NativeResult {
    let [Value::Table(handle), Value::String(text)] = args else {
        return Err(expects("io.write", "file, string"));
    };
    let bytes = text.as_bytes();
    let result = match files.stream(handle)? {
        Stream::Stdout => {
            let mut out = io::stdout().lock();
            out.write_all(bytes).and_then(|()| out.flush())
        }
        Stream::Stderr => io::stderr().write_all(bytes),
        Stream::File(file) => file.write_all(bytes),
        Stream::Stdin => Err(io::Error::from(io::ErrorKind::Unsupported)),
    };
    result.map_err(|_| NativeError::message("io.write failed"))?;
    Ok(Value::Null)
}

fn close(files: &mut FileRegistry, args: &[Value]) -> NativeResult {
    let [Value::Table(handle)] = args else {
        return Err(expects("io.close", "file"));
    };
    files.close(handle)?;
    Ok(Value::Null)
}
