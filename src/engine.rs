use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::Serialize;

use crate::analyzer::{AnalysisPhase, Analyzer};
use crate::config::{keys, Settings};
use crate::models::Dependency;

/// Dependencies analyzed concurrently per batch.
const BATCH_SIZE: usize = 64;

/// Shared, read-only state handed to every analyzer call.
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    pub settings: Settings,
}

impl EngineContext {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

/// A failed analyzer call. The dependency itself stays in the result set.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisFailure {
    pub analyzer: String,
    pub file: PathBuf,
    pub message: String,
}

/// Runs registered analyzers over dependencies, phase by phase.
pub struct Engine {
    context: Arc<EngineContext>,
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self {
            context: Arc::new(EngineContext::new(settings)),
            analyzers: Vec::new(),
        }
    }

    fn allow_experimental(&self) -> bool {
        self.context
            .settings
            .get_bool(keys::ANALYZER_EXPERIMENTAL_ENABLED, false)
    }

    pub fn register(&mut self, analyzer: impl Analyzer + 'static) {
        self.analyzers.push(Arc::new(analyzer));
    }

    /// Analyzers that will actually run: enabled, and not experimental unless
    /// experimental analyzers are allowed.
    pub fn active_analyzers(&self) -> impl Iterator<Item = &Arc<dyn Analyzer>> + '_ {
        self.analyzers.iter().filter(|a| self.is_active(a.as_ref()))
    }

    fn is_active(&self, analyzer: &dyn Analyzer) -> bool {
        analyzer.is_enabled() && (self.allow_experimental() || !analyzer.is_experimental())
    }

    /// Whether any active analyzer wants this file.
    pub fn accepts(&self, path: &Path) -> bool {
        self.active_analyzers().any(|a| a.accepts(path))
    }

    /// Prepare every active analyzer and log the skipped ones.
    pub fn prepare(&self) -> Result<()> {
        for analyzer in &self.analyzers {
            if !analyzer.is_enabled() {
                info!("{} is disabled", analyzer.name());
                continue;
            }
            if analyzer.is_experimental() && !self.allow_experimental() {
                info!(
                    "{} is experimental and was skipped; set {} to run it",
                    analyzer.name(),
                    keys::ANALYZER_EXPERIMENTAL_ENABLED
                );
                continue;
            }
            analyzer
                .prepare(&self.context)
                .with_context(|| format!("failed to prepare {}", analyzer.name()))?;
            debug!("Prepared {} ({} phase)", analyzer.name(), analyzer.phase());
        }
        Ok(())
    }

    /// Analyze all dependencies.
    ///
    /// Phases run in ascending order; inside a phase each dependency is
    /// handled on its own blocking task, visiting the phase's analyzers in
    /// registration order. A failing or panicking call is recorded and the
    /// run continues; every dependency is handed back.
    pub async fn run(
        &self,
        deps: &mut Vec<Dependency>,
        progress: &ProgressBar,
    ) -> Result<Vec<AnalysisFailure>> {
        let mut phases: Vec<AnalysisPhase> = self.active_analyzers().map(|a| a.phase()).collect();
        phases.sort();
        phases.dedup();

        progress.set_length((deps.len() * phases.len()) as u64);

        let mut failures = Vec::new();

        for phase in phases {
            let phase_analyzers: Arc<Vec<Arc<dyn Analyzer>>> = Arc::new(
                self.active_analyzers()
                    .filter(|a| a.phase() == phase)
                    .cloned()
                    .collect(),
            );
            debug!(
                "Starting {} phase with {} analyzer(s)",
                phase,
                phase_analyzers.len()
            );
            progress.set_message(phase.to_string());

            let pending = std::mem::take(deps);
            let mut pending = pending.into_iter().peekable();

            while pending.peek().is_some() {
                let tasks: Vec<_> = pending
                    .by_ref()
                    .take(BATCH_SIZE)
                    .map(|dep| {
                        // Kept so the dependency survives a task that never returns it.
                        let fallback = dep.clone();
                        let analyzers = Arc::clone(&phase_analyzers);
                        let context = Arc::clone(&self.context);
                        let handle = tokio::task::spawn_blocking(move || {
                            analyze_one(dep, &analyzers, &context)
                        });
                        (fallback, handle)
                    })
                    .collect();

                let (fallbacks, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
                for (fallback, joined) in fallbacks.into_iter().zip(join_all(handles).await) {
                    match joined {
                        Ok((dep, dep_failures)) => {
                            deps.push(dep);
                            failures.extend(dep_failures);
                        }
                        Err(e) => {
                            warn!("{}: analysis task failed: {}", fallback.actual_file.display(), e);
                            failures.push(AnalysisFailure {
                                analyzer: phase.to_string(),
                                file: fallback.actual_file.clone(),
                                message: format!("analysis task failed: {e}"),
                            });
                            deps.push(fallback);
                        }
                    }
                    progress.inc(1);
                }
            }
        }

        Ok(failures)
    }
}

fn analyze_one(
    mut dep: Dependency,
    analyzers: &[Arc<dyn Analyzer>],
    context: &EngineContext,
) -> (Dependency, Vec<AnalysisFailure>) {
    let mut failures = Vec::new();

    for analyzer in analyzers {
        if !analyzer.accepts(&dep.actual_file) {
            continue;
        }
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&mut dep, context)));
        let (file, message) = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => (e.path().to_path_buf(), error_chain(&e)),
            Err(payload) => (
                dep.actual_file.clone(),
                format!("analyzer panicked: {}", panic_message(payload.as_ref())),
            ),
        };
        warn!("{}: {}", analyzer.name(), message);
        failures.push(AnalysisFailure {
            analyzer: analyzer.name().to_string(),
            file,
            message,
        });
    }

    (dep, failures)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// `error: cause: cause` rendering of an error and its sources.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::manual::{ManualAnalyzer, DEPENDENCY_ECOSYSTEM};
    use crate::error::AnalysisError;
    use crate::models::{Confidence, EvidenceType};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records the ecosystem each dependency had when it was visited.
    struct EcosystemProbe {
        seen: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl Analyzer for EcosystemProbe {
        fn name(&self) -> &str {
            "Ecosystem Probe"
        }

        fn phase(&self) -> AnalysisPhase {
            AnalysisPhase::IdentifierAnalysis
        }

        fn accepts(&self, _path: &Path) -> bool {
            true
        }

        fn analyze(
            &self,
            dependency: &mut Dependency,
            _context: &EngineContext,
        ) -> Result<(), AnalysisError> {
            self.seen.lock().unwrap().push(dependency.ecosystem.clone());
            dependency.add_evidence(
                EvidenceType::Product,
                "probe",
                "product",
                "probed",
                Confidence::Low,
            );
            Ok(())
        }
    }

    /// Panics on one specific file and ignores the rest.
    struct PanicsOnBadLib;

    impl Analyzer for PanicsOnBadLib {
        fn name(&self) -> &str {
            "Panicking Analyzer"
        }

        fn phase(&self) -> AnalysisPhase {
            AnalysisPhase::InformationCollection
        }

        fn accepts(&self, path: &Path) -> bool {
            path.file_name().is_some_and(|n| n == "bad.so")
        }

        fn analyze(
            &self,
            _dependency: &mut Dependency,
            _context: &EngineContext,
        ) -> Result<(), AnalysisError> {
            panic!("corrupt archive");
        }
    }

    fn experimental_settings() -> Settings {
        let mut settings = Settings::default();
        settings.set_bool(keys::ANALYZER_EXPERIMENTAL_ENABLED, true);
        settings
    }

    fn manual_engine(settings: Settings) -> Engine {
        let manual = ManualAnalyzer::new(&settings);
        let mut engine = Engine::new(settings);
        engine.register(manual);
        engine
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_dependency() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("curl.dependencyproperties");
        std::fs::write(&good, "VENDOR=haxx\nPRODUCT=curl\nVERSION=7.20.1\n").unwrap();
        let missing = dir.path().join("missing.dependencyproperties");

        let engine = manual_engine(experimental_settings());
        engine.prepare().unwrap();

        let mut deps = vec![Dependency::new(&missing), Dependency::new(&good)];
        let failures = engine.run(&mut deps, &ProgressBar::hidden()).await.unwrap();

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].analyzer, "Manual Analyzer");
        assert_eq!(failures[0].file, missing);
        assert!(failures[0].message.contains("missing.dependencyproperties"));

        assert_eq!(deps.len(), 2);
        assert!(deps[0].evidence().is_empty());
        assert_eq!(deps[0].display_file_name, "missing");
        assert_eq!(deps[1].evidence().len(), 3);
        assert_eq!(deps[1].display_file_name, "curl");
    }

    #[tokio::test]
    async fn test_panicking_analyzer_keeps_every_dependency() {
        let mut engine = Engine::new(Settings::default());
        engine.register(PanicsOnBadLib);

        let mut deps = vec![
            Dependency::new("/libs/a.so"),
            Dependency::new("/libs/bad.so"),
            Dependency::new("/libs/c.so"),
        ];
        let failures = engine.run(&mut deps, &ProgressBar::hidden()).await.unwrap();

        let names: Vec<&str> = deps.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.so", "bad.so", "c.so"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].analyzer, "Panicking Analyzer");
        assert_eq!(failures[0].file, PathBuf::from("/libs/bad.so"));
        assert!(failures[0].message.contains("corrupt archive"));
    }

    #[tokio::test]
    async fn test_experimental_analyzer_skipped_by_default() {
        let dir = TempDir::new().unwrap();
        let sidecar = dir.path().join("curl.dependencyproperties");
        std::fs::write(&sidecar, "PRODUCT=curl\n").unwrap();

        let engine = manual_engine(Settings::default());
        engine.prepare().unwrap();
        assert_eq!(engine.active_analyzers().count(), 0);
        assert!(!engine.accepts(&sidecar));

        let mut deps = vec![Dependency::new(&sidecar)];
        let failures = engine.run(&mut deps, &ProgressBar::hidden()).await.unwrap();

        assert!(failures.is_empty());
        assert!(deps[0].evidence().is_empty());
        assert!(deps[0].ecosystem.is_none());
    }

    #[test]
    fn test_disabled_analyzer_skipped() {
        let mut settings = experimental_settings();
        settings.set_bool(keys::ANALYZER_MANUAL_ENABLED, false);
        let engine = manual_engine(settings);

        assert_eq!(engine.active_analyzers().count(), 0);
        assert!(!engine.accepts(Path::new("curl.dependencyproperties")));
    }

    #[tokio::test]
    async fn test_phases_run_in_order() {
        let dir = TempDir::new().unwrap();
        let sidecar = dir.path().join("curl.dependencyproperties");
        std::fs::write(&sidecar, "VENDOR=haxx\n").unwrap();

        let settings = experimental_settings();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let manual = ManualAnalyzer::new(&settings);
        let mut engine = Engine::new(settings);
        // Registered first, but its phase comes later.
        engine.register(EcosystemProbe {
            seen: Arc::clone(&seen),
        });
        engine.register(manual);
        engine.prepare().unwrap();

        let mut deps = vec![Dependency::new(&sidecar)];
        engine.run(&mut deps, &ProgressBar::hidden()).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(DEPENDENCY_ECOSYSTEM.to_string())]
        );
        let types: Vec<EvidenceType> = deps[0].evidence().iter().map(|e| e.evidence_type).collect();
        assert_eq!(types, vec![EvidenceType::Vendor, EvidenceType::Product]);
    }

    #[tokio::test]
    async fn test_order_preserved_across_batches() {
        let dir = TempDir::new().unwrap();
        let mut deps = Vec::new();
        for i in 0..(BATCH_SIZE * 2 + 3) {
            let path = dir.path().join(format!("lib{i:03}.dependencyproperties"));
            std::fs::write(&path, format!("VERSION=1.{i}\n")).unwrap();
            deps.push(Dependency::new(&path));
        }

        let engine = manual_engine(experimental_settings());
        let failures = engine.run(&mut deps, &ProgressBar::hidden()).await.unwrap();

        assert!(failures.is_empty());
        assert_eq!(deps.len(), BATCH_SIZE * 2 + 3);
        for (i, dep) in deps.iter().enumerate() {
            assert_eq!(dep.display_file_name, format!("lib{i:03}"));
            assert_eq!(dep.evidence()[0].value, format!("1.{i}"));
        }
    }
}
