//! Marker categories
//!
//! The three kinds of marker declarations the runtime's sources emit:
//! symbolic string constants (`Q(...)`), GC root pointers
//! (`MP_REGISTER_ROOT_POINTER(...)`) and module registrations
//! (`MP_REGISTER_MODULE(...)`). Markers are recognized lexically, one per
//! line, never by parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A marker category processed by the split/collect stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Symbolic string constants (qstrs)
    Qstr,
    /// GC root pointer registrations
    RootPointer,
    /// Module registrations
    Module,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Qstr, Category::RootPointer, Category::Module];

    /// The marker call tag as it appears in preprocessed source
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Qstr => "Q",
            Category::RootPointer => "MP_REGISTER_ROOT_POINTER",
            Category::Module => "MP_REGISTER_MODULE",
        }
    }

    /// Regex source matching a whole trimmed marker line, e.g. `Q(...)`
    pub fn marker_pattern(&self) -> String {
        format!(r"^{}\(.*\)$", regex::escape(self.tag()))
    }

    /// Check whether a line's trimmed form is a marker call of this category
    pub fn matches_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed
            .strip_prefix(self.tag())
            .and_then(|rest| rest.strip_prefix('('))
            .map(|rest| rest.ends_with(')'))
            .unwrap_or(false)
    }

    /// Staging directory name under the genhdr root
    pub fn staging_dir_name(&self) -> &'static str {
        match self {
            Category::Qstr => "qstr",
            Category::RootPointer => "root_pointer",
            Category::Module => "module",
        }
    }

    /// Collected-table file name under the genhdr root
    pub fn collected_name(&self) -> &'static str {
        match self {
            Category::Qstr => "qstrdefs.collected.h",
            Category::RootPointer => "root_pointers.collected.h",
            Category::Module => "moduledefs.collected.h",
        }
    }

    /// Generated-header file name under the genhdr root
    pub fn generated_name(&self) -> &'static str {
        match self {
            Category::Qstr => "qstrdefs.generated.h",
            Category::RootPointer => "root_pointers.h",
            Category::Module => "moduledefs.h",
        }
    }

    /// Name of the runtime's generator tool for this category
    pub fn generator_script(&self) -> &'static str {
        match self {
            Category::Qstr => "makeqstrdata.py",
            Category::RootPointer => "make_root_pointers.py",
            Category::Module => "makemoduledefs.py",
        }
    }

    /// Extension for per-source fragment files in the staging directory
    pub fn fragment_extension(&self) -> &'static str {
        self.staging_dir_name()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.staging_dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_line() {
        assert!(Category::Qstr.matches_line("Q(foo)"));
        assert!(Category::Qstr.matches_line("  Q(foo_bar)  "));
        assert!(!Category::Qstr.matches_line("QCFG(BYTES_IN_LEN, 1)"));
        assert!(!Category::Qstr.matches_line("\"Q(foo)\""));
        assert!(!Category::Qstr.matches_line("int Q(foo)"));
        assert!(Category::Module.matches_line(
            "MP_REGISTER_MODULE(MP_QSTR_machine, mp_module_machine)"
        ));
        assert!(!Category::Module.matches_line("MP_REGISTER_ROOT_POINTER(void *x)"));
    }

    #[test]
    fn test_marker_pattern_is_anchored() {
        assert_eq!(Category::Qstr.marker_pattern(), r"^Q\(.*\)$");
        assert_eq!(
            Category::RootPointer.marker_pattern(),
            r"^MP_REGISTER_ROOT_POINTER\(.*\)$"
        );
    }

    #[test]
    fn test_names_are_distinct() {
        for a in Category::ALL {
            for b in Category::ALL {
                if a != b {
                    assert_ne!(a.staging_dir_name(), b.staging_dir_name());
                    assert_ne!(a.collected_name(), b.collected_name());
                    assert_ne!(a.generated_name(), b.generated_name());
                }
            }
        }
    }
}
