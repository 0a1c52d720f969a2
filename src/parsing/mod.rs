pub mod requirement;
pub mod requirements_file;

pub use requirement::{parse_editable, parse_requirement};
pub use requirements_file::RequirementsFileParser;
