// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for harness runs and the interpreter collaborator

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Names an in-process interpreter resolves without a definition
const DEFAULT_BUILTINS: &[&str] = &[
    "print", "len", "range", "str", "int", "float", "bool", "list", "dict", "abs", "min", "max",
    "sum", "True", "False", "None",
];

/// Classification of a module under analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Code written by the user of the analysis engine
    #[default]
    User,
    /// Third-party library code
    Library,
    /// Type stub declarations
    Stub,
}

/// Interpreter/runtime configuration consumed by the interpreter collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterpreterConfiguration {
    /// Language version as `major.minor`
    pub version: String,
    /// Interpreter executable; `None` selects the in-process interpreter
    pub executable: Option<PathBuf>,
    /// Location for module and type caches
    pub cache_path: Option<PathBuf>,
    /// Module search paths, in lookup order
    pub search_paths: Vec<PathBuf>,
    /// Location of type stubs
    pub type_stub_path: Option<PathBuf>,
    /// Names the interpreter provides without a definition
    pub builtins: Vec<String>,
}

impl Default for InterpreterConfiguration {
    fn default() -> Self {
        Self {
            version: "3.12".to_string(),
            executable: None,
            cache_path: None,
            search_paths: Vec::new(),
            type_stub_path: None,
            builtins: DEFAULT_BUILTINS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl InterpreterConfiguration {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interpreter executable
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Set the language version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Append a module search path
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Replace the builtin name set
    pub fn with_builtins<I, S>(mut self, builtins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtins = builtins.into_iter().map(Into::into).collect();
        self
    }

    /// Parsed `(major, minor)` version
    pub fn version_tuple(&self) -> Result<(u32, u32)> {
        let invalid = || {
            HarnessError::invalid_configuration(format!(
                "interpreter version '{}' is not of the form major.minor",
                self.version
            ))
        };
        let (major, minor) = self.version.split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok((major, minor))
    }

    /// Fail fast unless the configured interpreter is usable
    pub fn ensure_installed(&self) -> Result<()> {
        self.version_tuple()?;

        let Some(executable) = &self.executable else {
            return Ok(());
        };

        match std::fs::metadata(executable) {
            Ok(metadata) if metadata.is_file() => Ok(()),
            Ok(_) => Err(HarnessError::InterpreterUnavailable {
                path: executable.clone(),
                reason: "not a file".to_string(),
            }),
            Err(err) => Err(HarnessError::InterpreterUnavailable {
                path: executable.clone(),
                reason: err.to_string(),
            }),
        }
    }

    /// Boolean form of [`InterpreterConfiguration::ensure_installed`]
    pub fn is_installed(&self) -> bool {
        self.ensure_installed().is_ok()
    }

    /// Fill cache, stub and search locations relative to `root`
    pub fn normalized(mut self, root: &Path) -> Self {
        if self.cache_path.is_none() {
            self.cache_path = Some(root.join(".cache"));
        }
        if self.type_stub_path.is_none() {
            self.type_stub_path = Some(root.join("typings"));
        }

        let mut search_paths = vec![root.to_path_buf()];
        for path in self.search_paths.drain(..) {
            if !search_paths.contains(&path) {
                search_paths.push(path);
            }
        }
        self.search_paths = search_paths;
        self
    }
}

/// Configuration for one harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarnessConfig {
    /// Interpreter collaborator configuration
    pub interpreter: InterpreterConfiguration,
    /// Absolute root directory of the analysed workspace
    pub root_path: PathBuf,
    /// Module name of the document under analysis
    pub module_name: String,
    /// Classification of the document under analysis
    pub module_kind: ModuleKind,
    /// File suffix appended to the module name to form the document path
    pub source_suffix: String,
    /// Diagnostics publishing delay in milliseconds
    pub publishing_delay_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            interpreter: InterpreterConfiguration::default(),
            root_path: std::env::temp_dir().join("analysis-harness"),
            module_name: "module".to_string(),
            module_kind: ModuleKind::User,
            source_suffix: "py".to_string(),
            publishing_delay_ms: 0,
        }
    }
}

impl HarnessConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the interpreter configuration
    pub fn with_interpreter(mut self, interpreter: InterpreterConfiguration) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set the workspace root
    pub fn with_root_path(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Set the module name
    pub fn with_module_name(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    /// Set the module classification
    pub fn with_module_kind(mut self, module_kind: ModuleKind) -> Self {
        self.module_kind = module_kind;
        self
    }

    /// Set the diagnostics publishing delay
    pub fn with_publishing_delay(mut self, delay: Duration) -> Self {
        self.publishing_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Diagnostics publishing delay
    pub fn publishing_delay(&self) -> Duration {
        Duration::from_millis(self.publishing_delay_ms)
    }

    /// Path of the document under analysis
    pub fn document_path(&self) -> PathBuf {
        if self.source_suffix.is_empty() {
            self.root_path.join(&self.module_name)
        } else {
            self.root_path
                .join(format!("{}.{}", self.module_name, self.source_suffix))
        }
    }

    /// Check invariants the driver relies on
    pub fn validate(&self) -> Result<()> {
        if !self.root_path.is_absolute() {
            return Err(HarnessError::invalid_configuration(format!(
                "root path '{}' must be absolute",
                self.root_path.display()
            )));
        }

        let mut chars = self.module_name.chars();
        let valid_name = chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.');
        if !valid_name {
            return Err(HarnessError::invalid_configuration(format!(
                "module name '{}' is not a valid identifier",
                self.module_name
            )));
        }

        Ok(())
    }
}
