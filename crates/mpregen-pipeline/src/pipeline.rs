//! Pipeline Driver
//!
//! Runs the regeneration stages strictly in sequence; every stage reads
//! files the previous stage fully materialized. The first failure aborts
//! the run. Files written by completed stages are left behind on purpose:
//! every stage overwrites its outputs, so re-running is the recovery
//! mechanism.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use mpregen_core::{BuildConfig, Category, GenhdrLayout};

use crate::fragments::{FragmentCollector, FragmentSplitter};
use crate::generate::{ArtifactGenerator, GeneratorError};
use crate::preprocess::{build_aggregate, Preprocess, PreprocessError};
use crate::shield;

/// Errors aborting a regeneration run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct RunReport {
    /// The three generated header paths, in category order
    pub generated: Vec<PathBuf>,
}

/// One full regeneration run over a fixed layout
pub struct Pipeline<'a> {
    layout: GenhdrLayout,
    config: BuildConfig,
    preprocessor: &'a dyn Preprocess,
    generator: &'a dyn ArtifactGenerator,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        layout: GenhdrLayout,
        config: BuildConfig,
        preprocessor: &'a dyn Preprocess,
        generator: &'a dyn ArtifactGenerator,
    ) -> Self {
        Self {
            layout,
            config,
            preprocessor,
            generator,
        }
    }

    pub fn run(&self) -> Result<RunReport, PipelineError> {
        fs::create_dir_all(self.layout.genhdr_dir())?;

        info!(
            sources = self.config.sources.len(),
            "preprocessing subsystem sources"
        );
        let aggregate_path = self.layout.aggregate();
        build_aggregate(self.preprocessor, &self.config, &aggregate_path)?;
        let aggregate = String::from_utf8_lossy(&fs::read(&aggregate_path)?).into_owned();

        for category in Category::ALL {
            let staging = self.layout.staging_dir(category);
            FragmentSplitter::new(category).split(&aggregate, &staging)?;
            FragmentCollector::collect(&staging, &self.layout.collected(category))?;
        }

        self.prepare_qstr_table()?;

        let mut generated = Vec::new();
        for category in Category::ALL {
            let table = match category {
                Category::Qstr => self.layout.qstr_preprocessed(),
                _ => self.layout.collected(category),
            };
            let text = self.generator.generate(category, &table)?;
            let out = self.layout.generated(category);
            fs::write(&out, text)?;
            info!(category = %category, "wrote {}", out.display());
            generated.push(out);
        }

        Ok(RunReport { generated })
    }

    /// The qstr table needs the base and port definitions folded in and a
    /// second preprocessing pass with the ordinary defines (generated
    /// headers may be referenced now, so no suppression macro).
    fn prepare_qstr_table(&self) -> Result<(), PipelineError> {
        let concat = self.layout.qstr_concat();
        shield::concat_definitions(
            &self.layout.base_qstrdefs(),
            Some(&self.layout.port_qstrdefs()),
            &self.layout.collected(Category::Qstr),
            &concat,
        )?;

        let quoted = self.layout.qstr_concat_quoted();
        shield::shield_file(&concat, &quoted)?;

        let output = self.preprocessor.preprocess(&quoted, &self.config.defines)?;
        let output = String::from_utf8_lossy(&output).into_owned();
        shield::restore_to_file(&output, &self.layout.qstr_preprocessed())?;
        Ok(())
    }
}
