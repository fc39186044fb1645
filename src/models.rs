use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A discovered artifact and the evidence collected for it so far.
///
/// The scanner creates dependencies; analyzers only mutate `display_file_name`,
/// `ecosystem` and append to `evidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub actual_file: PathBuf,
    pub file_name: String,
    pub display_file_name: String,
    pub ecosystem: Option<String>,
    evidence: Vec<Evidence>,
}

impl Dependency {
    pub fn new(actual_file: impl Into<PathBuf>) -> Self {
        let actual_file = actual_file.into();
        let file_name = file_name_of(&actual_file);
        Self {
            display_file_name: file_name.clone(),
            file_name,
            actual_file,
            ecosystem: None,
            evidence: Vec::new(),
        }
    }

    /// Append one evidence entry. Existing entries are never replaced.
    pub fn add_evidence(
        &mut self,
        evidence_type: EvidenceType,
        source: &str,
        name: &str,
        value: &str,
        confidence: Confidence,
    ) {
        self.evidence.push(Evidence {
            evidence_type,
            source: source.to_string(),
            name: name.to_string(),
            value: value.to_string(),
            confidence,
        });
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    pub fn evidence_of(&self, evidence_type: EvidenceType) -> impl Iterator<Item = &Evidence> {
        self.evidence
            .iter()
            .filter(move |e| e.evidence_type == evidence_type)
    }

    /// Highest-confidence value for the given type, first one on ties.
    pub fn best_evidence(&self, evidence_type: EvidenceType) -> Option<&Evidence> {
        self.evidence_of(evidence_type)
            .fold(None, |best: Option<&Evidence>, e| match best {
                Some(b) if b.confidence >= e.confidence => Some(b),
                _ => Some(e),
            })
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A single labeled fact contributed by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub evidence_type: EvidenceType,
    pub source: String,
    pub name: String,
    pub value: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvidenceType {
    Vendor,
    Product,
    Version,
}

impl EvidenceType {
    pub const ALL: [EvidenceType; 3] = [
        EvidenceType::Vendor,
        EvidenceType::Product,
        EvidenceType::Version,
    ];

    /// Canonical name, also used as the sidecar property key.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Vendor => "VENDOR",
            EvidenceType::Product => "PRODUCT",
            EvidenceType::Version => "VERSION",
        }
    }
}

impl std::fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Certainty of a piece of evidence. Variants are declared lowest first so the
/// derived ordering matches the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
    Highest,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "Low"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::High => write!(f, "High"),
            Confidence::Highest => write!(f, "Highest"),
        }
    }
}
