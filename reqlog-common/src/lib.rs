//! Common types shared across the request log filtering crates
//!
//! - [`RequestLog`] / [`ResponseLog`]: captured traffic, produced by the capture layer
//! - [`Expression`]: parsed search query, produced by the query parser

pub mod expression;
pub mod log;

pub use expression::{Expression, Operator};
pub use log::{Headers, LogId, RequestLog, ResponseLog};

// Re-exported so callers building trees and logs need no direct dependency
pub use regex::Regex;
pub use url::Url;
