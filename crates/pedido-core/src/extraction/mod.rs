//! Field and table extraction for Brazilian sales-order forms.

pub mod confidence;
mod parser;
pub mod rules;

pub use confidence::{ConfidenceAssigner, MatchKind};
pub use parser::OrderParser;
