//! Quoting Shield
//!
//! The collected `Q(...)` table has to survive a second preprocessing
//! pass so macro-guarded definitions in the base and port files resolve,
//! yet the marker calls themselves must reach the generator untouched.
//! Wrapping each marker line in string-literal quotes makes it inert to
//! the preprocessor; stripping the quotes afterwards restores it.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use mpregen_core::Category;

/// Concatenate the base definitions, the optional port overrides and the
/// collected table, in that precedence order, separated by blank lines.
pub fn concat_definitions(
    base: &Path,
    port: Option<&Path>,
    collected: &Path,
    out: &Path,
) -> io::Result<()> {
    let mut parts = vec![base];
    if let Some(port) = port {
        if port.exists() {
            parts.push(port);
        } else {
            debug!("no port definitions at {}", port.display());
        }
    }
    parts.push(collected);

    let mut buf = Vec::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            buf.push(b'\n');
        }
        buf.extend_from_slice(&fs::read(part)?);
        buf.push(b'\n');
    }
    fs::write(out, buf)
}

/// Wrap each standalone marker line in quotes; all other lines pass
/// through unchanged, line endings included.
pub fn shield(text: &str) -> String {
    let category = Category::Qstr;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if category.matches_line(trimmed) {
            out.push('"');
            out.push_str(trimmed);
            out.push('"');
            out.push('\n');
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Strip the quotes from shielded marker lines in preprocessor output.
/// Output lines are normalized to `\n` endings.
pub fn restore(text: &str) -> String {
    let category = Category::Qstr;
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .filter(|inner| category.matches_line(inner));
        match unquoted {
            Some(inner) => out.push_str(inner),
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

/// Shield a concatenated definitions file into a quoted sibling
pub fn shield_file(input: &Path, output: &Path) -> io::Result<()> {
    let text = fs::read_to_string(input)?;
    fs::write(output, shield(&text))
}

/// Restore preprocessor output into the final generator input
pub fn restore_to_file(preprocessed: &str, output: &Path) -> io::Result<()> {
    fs::write(output, restore(preprocessed))
}
