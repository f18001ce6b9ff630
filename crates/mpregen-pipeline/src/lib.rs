//! mpregen Pipeline
//!
//! The regeneration pipeline: extract compiler settings from the IDE
//! project descriptor, preprocess the runtime's sources with an external
//! C preprocessor, split the aggregate output into per-source marker
//! fragments, collect them into category tables, and feed the tables to
//! the runtime's generator tools.

pub mod descriptor;
pub mod fragments;
pub mod generate;
pub mod pipeline;
pub mod preprocess;
pub mod shield;

pub use descriptor::{ConfigError, ConfigSource, UvprojxSource};
pub use fragments::{FragmentCollector, FragmentSplitter};
pub use generate::{ArtifactGenerator, GeneratorError, PyToolGenerator};
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use preprocess::{CPreprocessor, Preprocess, PreprocessError};
