//! End-to-end pipeline tests over a fake preprocessor and fake generators.
//!
//! The fakes keep the contract of the real tools: the preprocessor emits a
//! line-marker directive naming its input and passes the text through; the
//! generators turn a table file into header text on stdout-equivalent
//! terms. No external binaries are involved.

use std::fs;
use std::path::{Path, PathBuf};

use mpregen_core::config::{BuildConfig, MacroDefinition};
use mpregen_core::{Category, GenhdrLayout};
use mpregen_pipeline::generate::{ArtifactGenerator, GeneratorError};
use mpregen_pipeline::pipeline::Pipeline;
use mpregen_pipeline::preprocess::{Preprocess, PreprocessError};

/// Emits a translation-unit line marker and the file's text, the way a
/// real `-E` pass would (sans header expansion).
struct FakePreprocessor;

impl Preprocess for FakePreprocessor {
    fn preprocess(
        &self,
        input: &Path,
        _defines: &[MacroDefinition],
    ) -> Result<Vec<u8>, PreprocessError> {
        let text = fs::read_to_string(input)?;
        Ok(format!("# 1 \"{}\"\n{}", input.display(), text).into_bytes())
    }
}

/// Emits one header line per table line, tagged with the category.
struct FakeGenerator;

impl ArtifactGenerator for FakeGenerator {
    fn generate(&self, category: Category, table: &Path) -> Result<String, GeneratorError> {
        let text = fs::read_to_string(table)?;
        let mut out = format!("// generated {}\n", category);
        for line in text.lines() {
            if category.matches_line(line) {
                out.push_str("ENTRY ");
                out.push_str(line.trim());
                out.push('\n');
            }
        }
        Ok(out)
    }
}

struct Workspace {
    _temp: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let py = root.join("Middlewares/micropython/py");
        let port = root.join("Middlewares/micropython/py_port");
        fs::create_dir_all(&py).unwrap();
        fs::create_dir_all(&port).unwrap();
        fs::write(py.join("qstrdefs.h"), "QCFG(BYTES_IN_LEN, 1)\n").unwrap();
        Workspace { _temp: temp, root }
    }

    fn add_source(&self, name: &str, content: &str) -> PathBuf {
        let path = self
            .root
            .join("Middlewares/micropython/py_port")
            .join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn config(&self, sources: Vec<PathBuf>) -> BuildConfig {
        BuildConfig {
            include_paths: vec![],
            defines: vec![MacroDefinition::defined("_RTE_")],
            misc_flags: vec![],
            sources,
        }
    }

    fn layout(&self) -> GenhdrLayout {
        GenhdrLayout::new(&self.root)
    }

    fn run(&self, sources: Vec<PathBuf>) -> Vec<PathBuf> {
        let preprocessor = FakePreprocessor;
        let generator = FakeGenerator;
        let pipeline = Pipeline::new(
            self.layout(),
            self.config(sources),
            &preprocessor,
            &generator,
        );
        pipeline.run().unwrap().generated
    }
}

#[test]
fn single_qstr_source_populates_only_the_qstr_artifact() {
    let ws = Workspace::new();
    let src = ws.add_source("mod_a.c", "Q(foo)\nint unrelated;\n");

    let generated = ws.run(vec![src]);
    assert_eq!(generated.len(), 3);

    let qstr = fs::read_to_string(ws.layout().generated(Category::Qstr)).unwrap();
    assert!(qstr.contains("ENTRY Q(foo)"));

    // The other two artifacts exist but carry no subsystem entries.
    for category in [Category::RootPointer, Category::Module] {
        let text = fs::read_to_string(ws.layout().generated(category)).unwrap();
        assert!(text.starts_with("// generated"));
        assert!(!text.contains("ENTRY"));
    }
}

#[test]
fn rerun_with_unchanged_inputs_is_byte_identical() {
    let ws = Workspace::new();
    let a = ws.add_source("mod_a.c", "Q(bar)\n");
    let b = ws.add_source("mod_b.c", "MP_REGISTER_MODULE(MP_QSTR_b, mp_module_b)\n");

    ws.run(vec![a.clone(), b.clone()]);
    let first: Vec<Vec<u8>> = Category::ALL
        .iter()
        .map(|c| fs::read(ws.layout().generated(*c)).unwrap())
        .collect();

    ws.run(vec![a, b]);
    let second: Vec<Vec<u8>> = Category::ALL
        .iter()
        .map(|c| fs::read(ws.layout().generated(*c)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn removing_a_non_contributing_source_leaves_artifacts_unchanged() {
    let ws = Workspace::new();
    let a = ws.add_source("mod_a.c", "Q(bar)\n");
    let b = ws.add_source("mod_b.c", "static int silent;\n");

    ws.run(vec![a.clone(), b]);
    let with_b = fs::read(ws.layout().generated(Category::Qstr)).unwrap();

    ws.run(vec![a]);
    let without_b = fs::read(ws.layout().generated(Category::Qstr)).unwrap();
    assert_eq!(with_b, without_b);
}

#[test]
fn removing_a_contributing_source_drops_its_entries() {
    let ws = Workspace::new();
    let a = ws.add_source("mod_a.c", "Q(bar)\n");
    let b = ws.add_source("mod_b.c", "static int silent;\n");

    ws.run(vec![a, b.clone()]);
    assert!(fs::read_to_string(ws.layout().generated(Category::Qstr))
        .unwrap()
        .contains("ENTRY Q(bar)"));

    ws.run(vec![b]);
    let qstr = fs::read_to_string(ws.layout().generated(Category::Qstr)).unwrap();
    assert!(!qstr.contains("bar"));

    // The stale fragment is gone from the collected table too.
    let collected = fs::read_to_string(ws.layout().collected(Category::Qstr)).unwrap();
    assert!(!collected.contains("bar"));
}

#[test]
fn aggregate_matches_per_file_concatenation() {
    let ws = Workspace::new();
    let a = ws.add_source("mod_a.c", "Q(one)\n");
    let b = ws.add_source("mod_b.c", "Q(two)\n");

    ws.run(vec![a.clone(), b.clone()]);
    let aggregate = fs::read(ws.layout().aggregate()).unwrap();

    let mut expected = Vec::new();
    for src in [&a, &b] {
        expected.extend(
            FakePreprocessor
                .preprocess(src, &[])
                .unwrap(),
        );
    }
    assert_eq!(aggregate, expected);
}

#[test]
fn port_overrides_precede_collected_entries() {
    let ws = Workspace::new();
    fs::write(
        ws.root.join("Middlewares/micropython/py_port/qstrdefsport.h"),
        "Q(port_name)\n",
    )
    .unwrap();
    let src = ws.add_source("mod_a.c", "Q(foo)\n");

    ws.run(vec![src]);
    let table = fs::read_to_string(ws.layout().qstr_preprocessed()).unwrap();
    let port_at = table.find("Q(port_name)").unwrap();
    let collected_at = table.find("Q(foo)").unwrap();
    assert!(port_at < collected_at);
}
