pub mod discovery;
pub mod pin_checker;
pub mod report;

pub use discovery::ManifestDiscovery;
pub use pin_checker::PinChecker;
pub use report::{AuditReport, Finding, OutputFormat};
