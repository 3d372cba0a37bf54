//! Receipt text cleanup and rule-based field extraction.

pub mod normalize;
mod parser;
pub mod rules;

pub use normalize::normalize;
pub use parser::{ReceiptParser, RuleBasedParser};
