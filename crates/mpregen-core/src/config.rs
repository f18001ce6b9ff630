//! Extracted build configuration
//!
//! Compiler settings pulled out of the IDE project descriptor, plus the
//! target architecture profile passed to the external preprocessor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Keil's RTE environment defines this; conditional code in the vendored
/// runtime relies on it being present.
pub const SENTINEL_DEFINE: &str = "_RTE_";

/// Defined during the first preprocessing pass so conditional code can
/// suppress inclusion of not-yet-generated headers.
pub const SUPPRESS_DEFINE: &str = "NO_QSTR";

/// Recognized C-family source extensions (lowercase)
pub const SOURCE_EXTENSIONS: [&str; 4] = ["c", "cc", "cpp", "cxx"];

/// Check whether a path has a recognized C-family extension
pub fn is_c_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A macro definition (-D flag)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    pub value: Option<String>,
}

impl MacroDefinition {
    /// Create a macro that is simply defined (no explicit value)
    pub fn defined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }

    /// Create a macro with a specific value
    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Parse a descriptor token of the form `NAME` or `NAME=VALUE`
    pub fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((name, value)) => Self::with_value(name.trim(), value.trim()),
            None => Self::defined(token.trim()),
        }
    }

    /// Convert to a -D argument for the preprocessor
    pub fn to_flag(&self) -> String {
        match &self.value {
            Some(v) => format!("-D{}={}", self.name, v),
            None => format!("-D{}", self.name),
        }
    }
}

/// Target architecture profile for the external preprocessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchProfile {
    /// Target triple (--target=)
    pub target: String,
    /// CPU name (-mcpu=)
    pub cpu: String,
    /// Generate Thumb code (-mthumb)
    pub thumb: bool,
    /// FPU variant (-mfpu=)
    pub fpu: String,
    /// Float calling convention (-mfloat-abi=)
    pub float_abi: String,
}

impl Default for ArchProfile {
    fn default() -> Self {
        Self {
            target: "arm-arm-none-eabi".to_string(),
            cpu: "cortex-m4".to_string(),
            thumb: true,
            fpu: "fpv4-sp-d16".to_string(),
            float_abi: "hard".to_string(),
        }
    }
}

impl ArchProfile {
    /// Base preprocessor flags: preprocess-only, keep macro-definition
    /// comments, plus the architecture selection.
    pub fn base_flags(&self) -> Vec<String> {
        let mut flags = vec![
            "-E".to_string(),
            "-dD".to_string(),
            format!("--target={}", self.target),
            format!("-mcpu={}", self.cpu),
        ];
        if self.thumb {
            flags.push("-mthumb".to_string());
        }
        flags.push(format!("-mfpu={}", self.fpu));
        flags.push(format!("-mfloat-abi={}", self.float_abi));
        flags
    }
}

/// Compiler settings extracted from the project descriptor.
///
/// Built once per run and immutable thereafter. Ordering is significant:
/// include paths keep descriptor order for search precedence, and sources
/// keep descriptor order so the aggregate preprocessed output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Include search directories, in descriptor order (not deduplicated)
    pub include_paths: Vec<PathBuf>,
    /// Macro definitions, with the RTE sentinel always present
    pub defines: Vec<MacroDefinition>,
    /// Misc compiler flags, already filtered to `-`-prefixed tokens
    pub misc_flags: Vec<String>,
    /// Subsystem source files, in descriptor order
    pub sources: Vec<PathBuf>,
}

impl BuildConfig {
    /// -I flags, one per include path
    pub fn include_flags(&self) -> Vec<String> {
        self.include_paths
            .iter()
            .map(|p| format!("-I{}", p.display()))
            .collect()
    }
}
