//! Project Descriptor Extraction
//!
//! Pulls the compiler settings and the runtime's source list out of a Keil
//! `.uvprojx` project file. Only four fields are consumed: the first
//! `Cads/VariousControls` node carrying an `IncludePath`, its sibling
//! `Define` and `MiscControls` values, and every `File/FilePath` entry.
//! The rest of the schema is opaque to this tool.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

use mpregen_core::config::{is_c_source, BuildConfig, MacroDefinition, SENTINEL_DEFINE};
use mpregen_core::layout::SUBSYSTEM_SEGMENT;

/// Errors that can occur during descriptor extraction
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read project descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed project descriptor: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("no compiler settings (Cads/VariousControls/IncludePath) in project descriptor")]
    MissingCompilerSettings,
}

/// A source of build configuration. The Keil descriptor is the only
/// implementation today; the pipeline only sees this trait.
pub trait ConfigSource {
    fn load(&self) -> Result<BuildConfig, ConfigError>;
}

/// Build configuration extracted from a `.uvprojx` file
pub struct UvprojxSource {
    path: PathBuf,
}

/// Compiler controls of one `Cads/VariousControls` node
#[derive(Debug, Default, Clone)]
struct CompilerControls {
    include_path: String,
    define: String,
    misc_controls: String,
}

impl UvprojxSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Descriptor paths are relative to the directory holding the project file
    fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn extract(&self, xml: &str) -> Result<BuildConfig, ConfigError> {
        let mut reader = Reader::from_str(xml);

        // Element-name stack; text events are interpreted by their ancestry.
        let mut stack: Vec<String> = Vec::new();
        let mut pending: Option<CompilerControls> = None;
        let mut chosen: Option<CompilerControls> = None;
        let mut file_paths: Vec<String> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name == "VariousControls" && stack.last().map(String::as_str) == Some("Cads")
                    {
                        pending = Some(CompilerControls::default());
                    }
                    stack.push(name);
                }
                Event::End(_) => {
                    let name = stack.pop().unwrap_or_default();
                    if name == "VariousControls" {
                        if let Some(controls) = pending.take() {
                            if chosen.is_none() && !controls.include_path.trim().is_empty() {
                                chosen = Some(controls);
                            }
                        }
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    match stack.last().map(String::as_str) {
                        Some("IncludePath") => {
                            if let Some(controls) = pending.as_mut() {
                                controls.include_path = text;
                            }
                        }
                        Some("Define") => {
                            if let Some(controls) = pending.as_mut() {
                                controls.define = text;
                            }
                        }
                        Some("MiscControls") => {
                            if let Some(controls) = pending.as_mut() {
                                controls.misc_controls = text;
                            }
                        }
                        Some("FilePath") => {
                            if stack.len() >= 2 && stack[stack.len() - 2] == "File" {
                                file_paths.push(text);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let controls = chosen.ok_or(ConfigError::MissingCompilerSettings)?;
        let base_dir = self.base_dir();

        let include_paths: Vec<PathBuf> = controls
            .include_path
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| base_dir.join(normalize_separators(p)))
            .collect();

        // Keil mixes `;` and `,` as define separators.
        let mut defines: Vec<MacroDefinition> = controls
            .define
            .replace(';', ",")
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(MacroDefinition::parse)
            .collect();
        if !defines.iter().any(|d| d.name == SENTINEL_DEFINE) {
            defines.push(MacroDefinition::defined(SENTINEL_DEFINE));
        }

        let misc_flags: Vec<String> = controls
            .misc_controls
            .split_whitespace()
            .filter(|tok| tok.starts_with('-'))
            .map(str::to_string)
            .collect();

        let sources: Vec<PathBuf> = file_paths
            .iter()
            .map(|p| normalize_separators(p.trim()))
            .filter(|p| p.contains(SUBSYSTEM_SEGMENT))
            .filter(|p| is_c_source(Path::new(p)))
            .map(|p| base_dir.join(p))
            .collect();

        debug!(
            includes = include_paths.len(),
            defines = defines.len(),
            sources = sources.len(),
            "extracted build configuration from {}",
            self.path.display()
        );

        Ok(BuildConfig {
            include_paths,
            defines,
            misc_flags,
            sources,
        })
    }
}

impl ConfigSource for UvprojxSource {
    fn load(&self) -> Result<BuildConfig, ConfigError> {
        let xml = fs::read_to_string(&self.path)?;
        self.extract(&xml)
    }
}

/// Normalize Keil's backslash separators to the platform-neutral form
fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
