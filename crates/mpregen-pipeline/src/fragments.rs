//! Fragment Splitting and Collection
//!
//! Splits the aggregate preprocessed output into one fragment file per
//! originating translation unit and category, then collects a category's
//! fragments into a single table file. The staging directory is cleared
//! before every split so a source that stops contributing marker lines
//! cannot leave a stale fragment behind.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use mpregen_core::config::is_c_source;
use mpregen_core::Category;

/// Splits the aggregate buffer into per-source fragment files
pub struct FragmentSplitter {
    category: Category,
    marker: Regex,
    line_marker: Regex,
}

impl FragmentSplitter {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            marker: Regex::new(&category.marker_pattern()).unwrap(),
            // GNU line-marker directive: # <line> "<file>" [flags]
            line_marker: Regex::new(r#"^#\s+\d+\s+"([^"]+)""#).unwrap(),
        }
    }

    /// Clear the staging directory and write one fragment file per
    /// translation unit that contributes marker lines. Returns the number
    /// of contributing translation units.
    pub fn split(&self, aggregate: &str, staging_dir: &Path) -> io::Result<usize> {
        fs::create_dir_all(staging_dir)?;
        clear_dir(staging_dir)?;

        // Fragment lines keyed by sanitized translation-unit name, in
        // buffer order within each fragment.
        let mut fragments: BTreeMap<String, String> = BTreeMap::new();
        let mut current_unit: Option<String> = None;

        for line in aggregate.lines() {
            if let Some(caps) = self.line_marker.captures(line) {
                let file = caps[1].replace('\\', "/");
                // Only whole translation units reset attribution; line
                // markers for included headers keep the enclosing unit.
                if is_c_source(Path::new(&file)) {
                    current_unit = Some(sanitize_name(&file));
                }
                continue;
            }
            if self.marker.is_match(line.trim()) {
                if let Some(unit) = &current_unit {
                    let fragment = fragments.entry(unit.clone()).or_default();
                    fragment.push_str(line.trim());
                    fragment.push('\n');
                }
            }
        }

        for (unit, content) in &fragments {
            let path = staging_dir.join(format!("{}.{}", unit, self.category.fragment_extension()));
            fs::write(path, content)?;
        }

        debug!(
            category = %self.category,
            units = fragments.len(),
            "split fragments into {}",
            staging_dir.display()
        );
        Ok(fragments.len())
    }
}

/// Concatenates a staging directory's fragment files into one table
pub struct FragmentCollector;

impl FragmentCollector {
    /// Read fragment files in lexical name order and write the collected
    /// table, overwriting any previous one. Returns the number of
    /// fragments collected.
    pub fn collect(staging_dir: &Path, table_path: &Path) -> io::Result<usize> {
        let mut entries: Vec<PathBuf> = fs::read_dir(staging_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut table = Vec::new();
        for entry in &entries {
            let bytes = fs::read(entry)?;
            let ends_with_newline = bytes.last() == Some(&b'\n');
            table.extend_from_slice(&bytes);
            if !ends_with_newline && !bytes.is_empty() {
                table.push(b'\n');
            }
        }
        fs::write(table_path, table)?;

        debug!(
            fragments = entries.len(),
            "collected table {}",
            table_path.display()
        );
        Ok(entries.len())
    }
}

/// Remove everything inside a directory, files before directories.
/// Entries vanishing mid-walk are tolerated; the run owns the tree but
/// prior interrupted runs can leave surprises.
pub fn clear_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        if let Err(e) = result {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Map a source path to a flat fragment file stem
fn sanitize_name(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const AGGREGATE: &str = r#"# 1 "py/obj.c"
# 1 "py/mpconfig.h" 1
typedef int mp_int_t;
# 5 "py/obj.c" 2
Q(foo)
Q(bar)
MP_REGISTER_ROOT_POINTER(mp_obj_t cur_exc)
# 1 "py_port/uart_core.c"
Q(uart)
"#;

    #[test]
    fn test_split_by_translation_unit() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("qstr");

        let splitter = FragmentSplitter::new(Category::Qstr);
        let units = splitter.split(AGGREGATE, &staging).unwrap();
        assert_eq!(units, 2);

        let obj = fs::read_to_string(staging.join("py_obj_c.qstr")).unwrap();
        assert_eq!(obj, "Q(foo)\nQ(bar)\n");
        let uart = fs::read_to_string(staging.join("py_port_uart_core_c.qstr")).unwrap();
        assert_eq!(uart, "Q(uart)\n");
    }

    #[test]
    fn test_split_ignores_header_line_markers() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("qstr");

        // The marker line appears textually after a header's line marker
        // but still belongs to obj.c.
        let aggregate = "# 1 \"py/obj.c\"\n# 3 \"py/obj.h\" 1\nQ(from_header_region)\n";
        FragmentSplitter::new(Category::Qstr)
            .split(aggregate, &staging)
            .unwrap();

        let obj = fs::read_to_string(staging.join("py_obj_c.qstr")).unwrap();
        assert_eq!(obj, "Q(from_header_region)\n");
    }

    #[test]
    fn test_split_clears_stale_fragments() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("root_pointer");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("gone_c.root_pointer"), "MP_REGISTER_ROOT_POINTER(old)\n").unwrap();

        let splitter = FragmentSplitter::new(Category::RootPointer);
        splitter.split("# 1 \"py/obj.c\"\n", &staging).unwrap();

        assert!(!staging.join("gone_c.root_pointer").exists());
    }

    #[test]
    fn test_split_without_line_markers_drops_orphans() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("qstr");

        let units = FragmentSplitter::new(Category::Qstr)
            .split("Q(orphan)\n", &staging)
            .unwrap();
        assert_eq!(units, 0);
        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn test_collect_is_lexical_and_newline_bounded() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("module");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("b_c.module"), "MP_REGISTER_MODULE(b, m_b)").unwrap();
        fs::write(staging.join("a_c.module"), "MP_REGISTER_MODULE(a, m_a)\n").unwrap();

        let table = temp.path().join("moduledefs.collected.h");
        let count = FragmentCollector::collect(&staging, &table).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(&table).unwrap(),
            "MP_REGISTER_MODULE(a, m_a)\nMP_REGISTER_MODULE(b, m_b)\n"
        );
    }

    #[test]
    fn test_clear_dir_recursive() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("staging");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("a.qstr"), "Q(a)\n").unwrap();
        fs::write(dir.join("nested/b.qstr"), "Q(b)\n").unwrap();

        clear_dir(&dir).unwrap();
        assert!(dir.exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_dir_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        clear_dir(&temp.path().join("never_created")).unwrap();
    }
}
