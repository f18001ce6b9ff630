//! Genhdr file layout
//!
//! Fixed relative layout of every artifact the pipeline reads and writes,
//! rooted at the IDE project's workspace directory.

use std::path::{Path, PathBuf};

use crate::category::Category;

/// Directory segment under which the runtime is vendored. Source selection
/// and artifact placement both key off this.
pub const SUBSYSTEM_SEGMENT: &str = "/Middlewares/micropython/";

/// Resolved paths for one regeneration run
#[derive(Debug, Clone)]
pub struct GenhdrLayout {
    mp_root: PathBuf,
    genhdr_dir: PathBuf,
}

impl GenhdrLayout {
    pub fn new(workspace_root: &Path) -> Self {
        let mp_root = workspace_root.join("Middlewares").join("micropython");
        let genhdr_dir = mp_root.join("genhdr");
        Self { mp_root, genhdr_dir }
    }

    /// Directory holding every generated artifact
    pub fn genhdr_dir(&self) -> &Path {
        &self.genhdr_dir
    }

    /// Directory holding the runtime's generator tools
    pub fn tools_dir(&self) -> PathBuf {
        self.mp_root.join("py")
    }

    /// Generator tool for a category
    pub fn generator_script(&self, category: Category) -> PathBuf {
        self.tools_dir().join(category.generator_script())
    }

    /// Aggregate preprocessed output of all subsystem sources
    pub fn aggregate(&self) -> PathBuf {
        self.genhdr_dir.join("qstr.i.last")
    }

    /// Per-category staging directory of fragment files
    pub fn staging_dir(&self, category: Category) -> PathBuf {
        self.genhdr_dir.join(category.staging_dir_name())
    }

    /// Per-category collected fragment table
    pub fn collected(&self, category: Category) -> PathBuf {
        self.genhdr_dir.join(category.collected_name())
    }

    /// Per-category final generated header
    pub fn generated(&self, category: Category) -> PathBuf {
        self.genhdr_dir.join(category.generated_name())
    }

    /// Base qstr definitions shipped with the runtime
    pub fn base_qstrdefs(&self) -> PathBuf {
        self.tools_dir().join("qstrdefs.h")
    }

    /// Optional port-specific qstr overrides
    pub fn port_qstrdefs(&self) -> PathBuf {
        self.mp_root.join("py_port").join("qstrdefsport.h")
    }

    /// base + port + collected concatenation (qstr category)
    pub fn qstr_concat(&self) -> PathBuf {
        self.genhdr_dir.join("qstrdefs.concat.h")
    }

    /// Concatenation with marker lines quoted for the second pass
    pub fn qstr_concat_quoted(&self) -> PathBuf {
        self.genhdr_dir.join("qstrdefs.concat.quoted.h")
    }

    /// Second-pass output with marker lines restored
    pub fn qstr_preprocessed(&self) -> PathBuf {
        self.genhdr_dir.join("qstrdefs.preprocessed.h")
    }
}
