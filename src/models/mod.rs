//! Data models for shelfscan.

mod book;
mod candidate;

pub use book::{dedup_key, BookRecord, BookUpdate, NewBook, UNKNOWN_AUTHOR};
pub use candidate::{EnrichedCandidate, RawCandidate};

pub use crate::genre::Genre;
