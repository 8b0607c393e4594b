use std::fs;
use std::path::PathBuf;

use xbench_core::{BenchError, ErrorInfo};
use xbench_engine::{Pick, SourceKeyword, SourceSelector};
use xbench_run::{Artifact, RunRecord};

/// A place a quantity can be read from.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    /// Captured standard output.
    Stdout(&'a str),
    /// A collected artifact.
    File(&'a Artifact),
}

impl Source<'_> {
    /// `stdout` or the run-relative artifact path.
    pub fn label(&self) -> String {
        match self {
            Source::Stdout(_) => "stdout".to_string(),
            Source::File(artifact) => artifact.relative.clone(),
        }
    }

    /// Filesystem path of file sources.
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            Source::Stdout(_) => None,
            Source::File(artifact) => Some(artifact.path.clone()),
        }
    }

    /// Text content of the source.
    pub fn text(&self) -> Result<String, BenchError> {
        match self {
            Source::Stdout(text) => Ok(text.to_string()),
            Source::File(artifact) => fs::read(&artifact.path)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|err| {
                    BenchError::Extraction(
                        ErrorInfo::new("extract.read", err.to_string())
                            .with_context("path", artifact.path.display().to_string()),
                    )
                }),
        }
    }
}

/// Sources for an explicit selector.
pub fn selected<'a>(record: &'a RunRecord, selector: &SourceSelector) -> Vec<Source<'a>> {
    match selector {
        SourceSelector::Keyword(SourceKeyword::Stdout) => vec![Source::Stdout(&record.stdout)],
        SourceSelector::Path { path } => record
            .artifacts_for(path)
            .into_iter()
            .map(Source::File)
            .collect(),
        SourceSelector::Glob { glob, pick } => {
            let mut matches = record.artifacts_for(glob);
            if *pick == Pick::First {
                matches.sort_by(|a, b| a.relative.cmp(&b.relative));
            }
            matches.into_iter().take(1).map(Source::File).collect()
        }
    }
}

/// Default lookup order: stdout, then each extra-file pattern, most recent first.
pub fn lookup_order<'a>(record: &'a RunRecord, extra_files: &[String]) -> Vec<Source<'a>> {
    let mut sources = vec![Source::Stdout(&record.stdout)];
    for pattern in extra_files {
        sources.extend(record.artifacts_for(pattern).into_iter().map(Source::File));
    }
    sources
}
