use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("problem occurred while reading dependency file {}.", absolute(path))]
    SidecarRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// File the failure refers to.
    pub fn path(&self) -> &Path {
        match self {
            AnalysisError::SidecarRead { path, .. } => path,
        }
    }
}

fn absolute(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
