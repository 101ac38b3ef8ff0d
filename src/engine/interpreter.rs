//! In-process interpreter stand-in

use super::Interpreter;
use crate::config::InterpreterConfiguration;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Interpreter model backed purely by configuration
#[derive(Debug, Clone)]
pub struct BuiltinInterpreter {
    configuration: InterpreterConfiguration,
    root_path: PathBuf,
    builtins: HashSet<String>,
}

impl BuiltinInterpreter {
    /// Create an interpreter for `root_path`
    pub fn new(configuration: InterpreterConfiguration, root_path: &Path) -> Self {
        let builtins = configuration.builtins.iter().cloned().collect();
        Self {
            configuration,
            root_path: root_path.to_path_buf(),
            builtins,
        }
    }
}

impl Interpreter for BuiltinInterpreter {
    fn configuration(&self) -> &InterpreterConfiguration {
        &self.configuration
    }

    fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains(name)
    }
}
