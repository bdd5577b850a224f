use std::path::{Path, PathBuf};

/// Interpreted call depth after which calls throw `"stack overflow"`.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Host-provided settings for one interpreter instance.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Directory used to resolve relative imports of the entry program.
    pub module_dir: Option<PathBuf>,
    /// Entry script, exposed as the head of `sys.args`.
    pub script_path: Option<PathBuf>,
    /// Arguments following the script on the command line.
    pub args: Vec<String>,
    pub max_call_depth: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            module_dir: None,
            script_path: None,
            args: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl ExecutionContext {
    /// Context for running `script`: relative imports resolve next to it.
    pub fn for_script(script: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let script = script.into();
        Self {
            module_dir: module_dir_of(&script),
            script_path: Some(script),
            args,
            ..Self::default()
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

/// Directory containing `file`, or `None` for a bare file name.
pub fn module_dir_of(file: &Path) -> Option<PathBuf> {
    file.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
