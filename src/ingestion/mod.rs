pub mod normalizer;

pub use normalizer::{normalize, NormalizeError, NormalizedBatch, ScanContext, SkippedTransfer};
