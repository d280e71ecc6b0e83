//! The polling loop: tail → extract → audit → generate → reconcile.
//!
//! Every failure inside a cycle is recovered locally and counted in the
//! returned [`CycleStats`]. Only cancellation stops [`LogMonitor::run`].

use std::ops::AddAssign;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::config::MonitorConfig;
use crate::error::AuditError;
use crate::extract::ErrorBlockExtractor;
use crate::issue::IssueStore;
use crate::llm::create_provider;
use crate::reconcile::{IssueReconciler, ReconcileOutcome};
use crate::tail::{LogTailer, TailCursor};
use crate::ticket::{ModelTicketGenerator, TicketGenerator};

/// Counters for one poll cycle. Sum cycles with `+=`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub lines_read: usize,
    pub errors_found: usize,
    pub line_failures: usize,
    pub issues_created: usize,
    pub issues_updated: usize,
    pub persist_failures: usize,
    pub audit_failures: usize,
    pub generator_fallbacks: usize,
    pub read_failures: usize,
}

impl AddAssign for CycleStats {
    fn add_assign(&mut self, rhs: Self) {
        self.lines_read += rhs.lines_read;
        self.errors_found += rhs.errors_found;
        self.line_failures += rhs.line_failures;
        self.issues_created += rhs.issues_created;
        self.issues_updated += rhs.issues_updated;
        self.persist_failures += rhs.persist_failures;
        self.audit_failures += rhs.audit_failures;
        self.generator_fallbacks += rhs.generator_fallbacks;
        self.read_failures += rhs.read_failures;
    }
}

pub struct LogMonitor {
    tailer: LogTailer,
    extractor: ErrorBlockExtractor,
    generator: TicketGenerator,
    reconciler: IssueReconciler,
    audit: Option<AuditLog>,
    cursor_file: Option<PathBuf>,
}

impl LogMonitor {
    pub fn new(
        tailer: LogTailer,
        extractor: ErrorBlockExtractor,
        generator: TicketGenerator,
        reconciler: IssueReconciler,
    ) -> Self {
        Self {
            tailer,
            extractor,
            generator,
            reconciler,
            audit: None,
            cursor_file: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Save the tail cursor to `path` after every cycle that advanced it.
    pub fn with_cursor_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cursor_file = Some(path.into());
        self
    }

    /// Wire a monitor from configuration around an already-opened store.
    pub async fn from_config(
        config: &MonitorConfig,
        store: Arc<dyn IssueStore>,
    ) -> Result<Self, AuditError> {
        let tailer = match &config.cursor_file {
            Some(checkpoint) => match TailCursor::load(checkpoint, &config.log_file).await {
                Some(cursor) => {
                    info!(path = %cursor.path.display(), offset = cursor.offset, "Resuming from tail checkpoint");
                    LogTailer::from_cursor(cursor)
                }
                None => LogTailer::new(&config.log_file),
            },
            None => LogTailer::new(&config.log_file),
        };

        let audit = AuditLog::open(&config.output_file).await?;
        let extractor = ErrorBlockExtractor::new(config.log_file.display().to_string());
        let reconciler = IssueReconciler::new(store).with_options(config.reconciler_options());

        let mut monitor =
            Self::new(tailer, extractor, build_generator(config), reconciler).with_audit(audit);
        if let Some(checkpoint) = &config.cursor_file {
            monitor = monitor.with_cursor_file(checkpoint.clone());
        }
        Ok(monitor)
    }

    pub fn tailer(&self) -> &LogTailer {
        &self.tailer
    }

    pub fn generator(&self) -> &TicketGenerator {
        &self.generator
    }

    /// Run one cycle against whatever has been appended since the last one.
    pub async fn poll_once(&mut self) -> CycleStats {
        let before = self.tailer.offset();
        let lines = match self.tailer.read_new_lines().await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Failed to read log file");
                return CycleStats {
                    read_failures: 1,
                    ..CycleStats::default()
                };
            }
        };

        let stats = self.process_lines(&lines).await;

        if self.tailer.offset() != before {
            if let Some(checkpoint) = &self.cursor_file {
                if let Err(e) = self.tailer.cursor().save(checkpoint).await {
                    warn!(path = %checkpoint.display(), error = %e, "Failed to save tail checkpoint");
                }
            }
        }
        stats
    }

    /// Extract error blocks from `lines` and reconcile each one.
    pub async fn process_lines(&self, lines: &[String]) -> CycleStats {
        let extraction = self.extractor.extract(lines);
        let mut stats = CycleStats {
            lines_read: lines.len(),
            errors_found: extraction.records.len(),
            line_failures: extraction.failed_lines,
            ..CycleStats::default()
        };

        for record in &extraction.records {
            if let Some(audit) = &self.audit {
                if let Err(e) = audit.append(record).await {
                    warn!(error = %e, "Failed to append audit record");
                    stats.audit_failures += 1;
                }
            }

            let ticket = self.generator.generate_or_fallback(record).await;
            if ticket.fell_back {
                stats.generator_fallbacks += 1;
            }

            match self
                .reconciler
                .reconcile(record, &ticket.content.title, &ticket.content.description)
                .await
            {
                Ok(ReconcileOutcome::Created { .. }) => stats.issues_created += 1,
                Ok(ReconcileOutcome::Updated { .. }) => stats.issues_updated += 1,
                Err(e) => {
                    warn!(title = %ticket.content.title, error = %e, "Failed to persist issue");
                    stats.persist_failures += 1;
                }
            }
        }
        stats
    }

    /// Poll every `interval` until `cancel` fires. Returns the summed stats.
    ///
    /// Cancellation is checked between cycles and during the sleep; a cycle
    /// already in progress always completes.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) -> CycleStats {
        info!(
            path = %self.tailer.path().display(),
            interval_secs = interval.as_secs_f64(),
            generator = self.generator.name(),
            "Monitoring log file"
        );

        let mut totals = CycleStats::default();
        while !cancel.is_cancelled() {
            let stats = self.poll_once().await;
            if stats.errors_found > 0 || stats.read_failures > 0 {
                info!(
                    lines = stats.lines_read,
                    errors = stats.errors_found,
                    created = stats.issues_created,
                    updated = stats.issues_updated,
                    persist_failures = stats.persist_failures,
                    "Poll cycle complete"
                );
            } else {
                debug!(lines = stats.lines_read, "Poll cycle complete");
            }
            totals += stats;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!(
            lines = totals.lines_read,
            errors = totals.errors_found,
            created = totals.issues_created,
            updated = totals.issues_updated,
            "Monitor stopped"
        );
        totals
    }
}

/// Heuristic unless `use_llm` is set and a provider can be built from the
/// LLM settings. A provider that cannot be built is logged, not fatal.
pub fn build_generator(config: &MonitorConfig) -> TicketGenerator {
    if !config.use_llm {
        return TicketGenerator::Heuristic;
    }
    match create_provider(&config.llm) {
        Ok(provider) => {
            info!(provider = provider.name(), model = provider.model(), "Using model-backed ticket generator");
            TicketGenerator::ModelBacked(ModelTicketGenerator::new(provider))
        }
        Err(e) => {
            warn!(error = %e, "LLM provider unavailable, using heuristic ticket generator");
            TicketGenerator::Heuristic
        }
    }
}
