use std::path::Path;

use crate::engine::EngineContext;
use crate::error::AnalysisError;
use crate::models::Dependency;

pub mod manual;

/// Ordered stages of an engine run. Analyzers in an earlier phase finish on
/// every dependency before any analyzer of a later phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnalysisPhase {
    Initial,
    PreInformationCollection,
    InformationCollection,
    PostInformationCollection,
    PreIdentifierAnalysis,
    IdentifierAnalysis,
    PostIdentifierAnalysis,
    Finding,
    FinalPhase,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisPhase::Initial => write!(f, "initial"),
            AnalysisPhase::PreInformationCollection => write!(f, "pre information collection"),
            AnalysisPhase::InformationCollection => write!(f, "information collection"),
            AnalysisPhase::PostInformationCollection => write!(f, "post information collection"),
            AnalysisPhase::PreIdentifierAnalysis => write!(f, "pre identifier analysis"),
            AnalysisPhase::IdentifierAnalysis => write!(f, "identifier analysis"),
            AnalysisPhase::PostIdentifierAnalysis => write!(f, "post identifier analysis"),
            AnalysisPhase::Finding => write!(f, "finding"),
            AnalysisPhase::FinalPhase => write!(f, "final"),
        }
    }
}

/// Plug-in contract between the engine and a single kind of analyzer.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    fn phase(&self) -> AnalysisPhase;

    /// File filter: whether a file on disk should be handed to this analyzer.
    fn accepts(&self, path: &Path) -> bool;

    /// Called once before the first `analyze`.
    fn prepare(&self, _context: &EngineContext) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }

    /// Experimental analyzers only run when the engine allows them.
    fn is_experimental(&self) -> bool {
        false
    }

    fn analyze(&self, dependency: &mut Dependency, context: &EngineContext)
        -> Result<(), AnalysisError>;
}
