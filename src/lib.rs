pub mod core;
pub mod parsing;
pub mod validation;

pub use crate::core::*;
pub use parsing::RequirementsFileParser;
pub use validation::{AuditReport, Finding, ManifestDiscovery, OutputFormat, PinChecker};
