//! Error classification for declined and aborted transactions.
//!
//! This crate provides:
//! - `MappingCriteria`, the per-biller key fields read from a declined exchange
//! - `ErrorClassification` and the default bundle used when nothing matches
//! - The `ClassificationLookup` seam and an in-memory table
//! - `ErrorClassifier`, which guards the lookup with a timeout and a breaker

pub mod classification;
pub mod classifier;
pub mod criteria;
pub mod error;
pub mod lookup;

pub use classification::{ClassificationRecord, ErrorClassification};
pub use classifier::{ClassifierSettings, ErrorClassifier};
pub use criteria::MappingCriteria;
pub use error::ClassificationError;
pub use lookup::{ClassificationLookup, InMemoryClassificationTable};
