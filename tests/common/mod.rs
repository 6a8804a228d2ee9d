//! Common test infrastructure
//!
//! In-memory fakes for the two external services and helpers that build
//! playlist pages and seeded databases.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{FakePlaylistSource, TestDb};
//!
//! #[test]
//! fn test_scrape() {
//!     let db = TestDb::new();
//!     let source = FakePlaylistSource::new().with_table_page(common::DAY_1, &[("A", "B")]);
//!     // ...
//! }
//! ```

#[allow(dead_code)]
mod constants;
#[allow(dead_code)]
mod fakes;
#[allow(dead_code)]
mod fixtures;

#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fakes::{FakePlaylistSource, FakeStreamingService};
#[allow(unused_imports)]
pub use fixtures::{index_page, inline_page, link_for, parse_day, table_page, TestDb};
