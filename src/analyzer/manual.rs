use std::path::Path;

use log::debug;

use crate::config::{keys, Settings};
use crate::engine::EngineContext;
use crate::error::AnalysisError;
use crate::models::{Confidence, Dependency, EvidenceType};
use crate::properties::{self, Properties};

/// Ecosystem tag set on every dependency this analyzer handles.
pub const DEPENDENCY_ECOSYSTEM: &str = "Manual";

/// Marker extension of the sidecar files, also used as the evidence source.
pub const FILE_EXTENSION: &str = ".dependencyproperties";

/// Analyzer for hand-written `.dependencyproperties` sidecar files.
///
/// Native libraries and other artifacts without embedded metadata can be
/// identified by placing a file next to them, named like the artifact:
///
/// ```text
/// curl-7.20.1/curl-7.20.1.dependencyproperties:
/// VENDOR=haxx
/// PRODUCT=curl
/// VERSION=7.20.1
/// ```
///
/// Each of the three keys found becomes one piece of evidence at
/// [`Confidence::Highest`].
pub struct ManualAnalyzer {
    enabled: bool,
}

impl ManualAnalyzer {
    /// Create a `ManualAnalyzer`, reading its enablement flag from `settings`.
    pub fn new(settings: &Settings) -> Self {
        Self {
            enabled: settings.get_bool(keys::ANALYZER_MANUAL_ENABLED, true),
        }
    }
}

impl super::Analyzer for ManualAnalyzer {
    fn name(&self) -> &str {
        "Manual Analyzer"
    }

    fn phase(&self) -> super::AnalysisPhase {
        super::AnalysisPhase::InformationCollection
    }

    /// Suffix match on the file name. Case-sensitive, like the display-name
    /// cleanup below.
    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(FILE_EXTENSION))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_experimental(&self) -> bool {
        true
    }

    /// Tags the dependency, cleans its display name, then loads the sidecar.
    /// A read failure leaves the first two changes in place and adds no evidence.
    fn analyze(
        &self,
        dependency: &mut Dependency,
        _context: &EngineContext,
    ) -> Result<(), AnalysisError> {
        dependency.ecosystem = Some(DEPENDENCY_ECOSYSTEM.to_string());
        dependency.display_file_name = normalize_display_name(&dependency.display_file_name);

        debug!(
            "Analyzing dependency properties: {} ...",
            dependency.actual_file.display()
        );

        let props = properties::load(&dependency.actual_file)?;
        if props.is_empty() {
            debug!("{} holds no properties", dependency.actual_file.display());
        } else {
            debug!("Read {} properties", props.len());
        }
        add_evidence(dependency, &props);

        debug!(
            "Finished analyzing dependency properties: {}.",
            dependency.actual_file.display()
        );
        Ok(())
    }
}

/// Remove the marker extension from a display name.
///
/// Every occurrence is removed, not only a trailing one, so
/// `a.dependencyproperties.dependencyproperties` becomes `a`.
pub fn normalize_display_name(name: &str) -> String {
    name.replace(FILE_EXTENSION, "")
}

/// Append VENDOR, PRODUCT and VERSION evidence, in that order, for each key
/// present with a non-empty value.
pub fn add_evidence(dependency: &mut Dependency, props: &Properties) {
    for evidence_type in EvidenceType::ALL {
        let key = evidence_type.as_str();
        let Some(value) = props.get(key).filter(|v| !v.is_empty()) else {
            continue;
        };
        dependency.add_evidence(evidence_type, FILE_EXTENSION, key, value, Confidence::Highest);
        debug!("Found {} evidence: {}", key, value);
    }
}
