//! Preprocess Orchestration
//!
//! Wraps the external C preprocessor (armclang or any clang-compatible
//! driver in `-E` mode) and builds the aggregate preprocessed output of
//! every subsystem source, in source order, into one file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use mpregen_core::config::{ArchProfile, BuildConfig, MacroDefinition, SUPPRESS_DEFINE};

/// Errors that can occur while preprocessing
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("preprocessor not found: {0}")]
    ToolNotFound(String),

    // The failing translation unit is a plain payload field; `source`
    // would collide with thiserror's error-source convention.
    #[error("preprocessing failed for {unit}\ncommand: {command}\n{output}")]
    CommandFailed {
        unit: PathBuf,
        command: String,
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The text-transform port of the pipeline. Production code talks to a
/// real preprocessor binary; tests substitute a fake.
pub trait Preprocess {
    /// Preprocess one C input with the given macro definitions, returning
    /// the raw output bytes.
    fn preprocess(
        &self,
        input: &Path,
        defines: &[MacroDefinition],
    ) -> Result<Vec<u8>, PreprocessError>;
}

/// External C preprocessor invocation
pub struct CPreprocessor {
    tool: PathBuf,
    /// Architecture and preprocess-mode flags, fixed per run
    base_flags: Vec<String>,
    /// Misc flags from the descriptor, already filtered to `-` tokens
    misc_flags: Vec<String>,
    /// One -I flag per include path, in search-precedence order
    include_flags: Vec<String>,
}

impl CPreprocessor {
    pub fn new(tool: &Path, profile: &ArchProfile, config: &BuildConfig) -> Self {
        Self {
            tool: tool.to_path_buf(),
            base_flags: profile.base_flags(),
            misc_flags: config.misc_flags.clone(),
            include_flags: config.include_flags(),
        }
    }

    /// Verify the preprocessor binary runs at all. Called before any other
    /// work so a missing toolchain fails fast.
    pub fn probe_tool(tool: &Path) -> Result<(), PreprocessError> {
        let ok = Command::new(tool)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if ok {
            Ok(())
        } else {
            Err(PreprocessError::ToolNotFound(tool.display().to_string()))
        }
    }

    fn build_args(&self, defines: &[MacroDefinition], input: &Path) -> Vec<String> {
        let mut args = self.base_flags.clone();
        args.extend(self.misc_flags.iter().cloned());
        args.extend(self.include_flags.iter().cloned());
        args.extend(defines.iter().map(MacroDefinition::to_flag));
        args.push("-x".to_string());
        args.push("c".to_string());
        args.push(input.display().to_string());
        args
    }
}

impl Preprocess for CPreprocessor {
    fn preprocess(
        &self,
        input: &Path,
        defines: &[MacroDefinition],
    ) -> Result<Vec<u8>, PreprocessError> {
        let args = self.build_args(defines, input);
        debug!("preprocessing {}", input.display());

        let output = Command::new(&self.tool)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let rendered = render_command(&self.tool, &args);
        if !output.status.success() {
            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(PreprocessError::CommandFailed {
                unit: input.to_path_buf(),
                command: rendered,
                output: captured,
            });
        }

        // Diagnostics on a successful exit are warnings; they never enter
        // the aggregate and never abort the run.
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if line.contains("warning:") {
                warn!("{}", line);
            } else if !line.trim().is_empty() {
                debug!("{}", line);
            }
        }

        Ok(output.stdout)
    }
}

/// Preprocess every source in order and append the output bytes to one
/// aggregate file, truncating any previous aggregate first. The synthetic
/// suppression define is added so conditional code does not pull in
/// not-yet-regenerated headers.
pub fn build_aggregate(
    preprocessor: &dyn Preprocess,
    config: &BuildConfig,
    out_path: &Path,
) -> Result<(), PreprocessError> {
    let mut defines = config.defines.clone();
    defines.insert(0, MacroDefinition::defined(SUPPRESS_DEFINE));

    let mut out = File::create(out_path)?;
    for source in &config.sources {
        let bytes = preprocessor.preprocess(source, &defines)?;
        out.write_all(&bytes)?;
    }
    debug!(
        sources = config.sources.len(),
        "wrote aggregate preprocessed output to {}",
        out_path.display()
    );
    Ok(())
}

fn render_command(tool: &Path, args: &[String]) -> String {
    let mut parts = vec![tool.display().to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}
