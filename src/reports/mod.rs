pub mod formatters;
pub mod generator;

pub use formatters::{JsonFormatter, ReportFormatter, TextFormatter};
pub use generator::ReportGenerator;
