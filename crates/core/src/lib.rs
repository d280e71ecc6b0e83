// crates/core/src/lib.rs
pub mod audit;
pub mod config;
pub mod error;
pub mod extract;
pub mod issue;
pub mod level;
pub mod llm;
pub mod monitor;
pub mod paths;
pub mod reconcile;
pub mod record;
pub mod sanitize;
pub mod tail;
pub mod ticket;
pub mod timestamp;
pub mod title;

pub use audit::AuditLog;
pub use config::MonitorConfig;
pub use error::*;
pub use extract::{ErrorBlockExtractor, Extraction};
pub use issue::*;
pub use level::{classify_level, Level};
pub use monitor::{build_generator, CycleStats, LogMonitor};
pub use reconcile::{IssueReconciler, ReconcileOutcome, ReconcilerOptions};
pub use record::ErrorRecord;
pub use sanitize::sanitize;
pub use tail::{LogTailer, TailCursor};
pub use ticket::{GeneratedTicket, ModelTicketGenerator, TicketContent, TicketError, TicketGenerator};
pub use timestamp::{detect_timestamp, normalize_timestamp, parse_timestamp};
pub use title::extract_title;
