//! Prepare-event subscribers
//!
//! - [`ResultMock`]: answers commands from a queue of canned results and failures

pub mod result_mock;

pub use result_mock::{MockEntry, ResultMock};
