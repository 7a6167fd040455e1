//! Data models for the Whosbook curation backend.
//!
//! Response types serialize with camelCase keys to match the web client.

mod category;
mod curation;
mod member;
mod page;

pub use category::*;
pub use curation::*;
pub use member::*;
pub use page::*;
