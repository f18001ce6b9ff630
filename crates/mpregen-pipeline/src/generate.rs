//! Generator Invocations
//!
//! The three table generators shipped with the runtime (qstr data, root
//! pointers, module defs) are black boxes: collected-table text in,
//! generated-header text out. Their failures pass through verbatim.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use mpregen_core::{Category, GenhdrLayout};

/// Errors from a downstream generator tool
#[derive(Debug, Error)]
pub enum GeneratorError {
    // code -1 stands for termination by signal
    #[error("generator failed with status {code}: {command}\n{output}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A black-box generator turning a finalized table into header text
pub trait ArtifactGenerator {
    fn generate(&self, category: Category, table: &Path) -> Result<String, GeneratorError>;
}

/// Runs the runtime's Python generator tools
pub struct PyToolGenerator {
    python: PathBuf,
    tools_dir: PathBuf,
}

impl PyToolGenerator {
    pub fn new(python: &Path, layout: &GenhdrLayout) -> Self {
        Self {
            python: python.to_path_buf(),
            tools_dir: layout.tools_dir(),
        }
    }
}

impl ArtifactGenerator for PyToolGenerator {
    fn generate(&self, category: Category, table: &Path) -> Result<String, GeneratorError> {
        let script = self.tools_dir.join(category.generator_script());
        debug!(category = %category, "running generator {}", script.display());

        let output = Command::new(&self.python)
            .arg(&script)
            .arg(table)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let command = format!(
                "{} {} {}",
                self.python.display(),
                script.display(),
                table.display()
            );
            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(GeneratorError::CommandFailed {
                command,
                code: output.status.code().unwrap_or(-1),
                output: captured,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // The system shell stands in for the Python tools; the contract under
    // test is exit-code and stdout handling, not Python.
    fn workspace_with_tool(script_body: &str) -> (TempDir, PyToolGenerator) {
        let temp = TempDir::new().unwrap();
        let layout = GenhdrLayout::new(temp.path());
        fs::create_dir_all(layout.tools_dir()).unwrap();
        fs::write(
            layout.tools_dir().join(Category::Qstr.generator_script()),
            script_body,
        )
        .unwrap();
        let gen = PyToolGenerator::new(Path::new("sh"), &layout);
        (temp, gen)
    }

    #[test]
    fn test_generator_captures_stdout() {
        let (temp, gen) = workspace_with_tool("echo \"// generated\"\ncat \"$1\"\n");
        let table = temp.path().join("qstrdefs.preprocessed.h");
        fs::write(&table, "Q(foo)\n").unwrap();

        let text = gen.generate(Category::Qstr, &table).unwrap();
        assert_eq!(text, "// generated\nQ(foo)\n");
    }

    #[test]
    fn test_generator_failure_carries_exit_code_and_output() {
        let (temp, gen) = workspace_with_tool("echo boom >&2\nexit 42\n");
        let table = temp.path().join("qstrdefs.preprocessed.h");
        fs::write(&table, "Q(foo)\n").unwrap();

        let err = gen.generate(Category::Qstr, &table).unwrap_err();
        match &err {
            GeneratorError::CommandFailed { code, output, .. } => {
                assert_eq!(*code, 42);
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("42"));
    }
}
