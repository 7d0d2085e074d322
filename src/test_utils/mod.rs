//! Helpers for exercising the compiler without a database.
//!
//! Enabled for this crate's unit tests and, for integration tests and
//! downstream users, through the `test-utils` feature.

pub mod log_capture;
pub mod recording;
pub mod test_helpers;

pub use log_capture::{CapturedLogs, CapturedWriter};
pub use recording::{Recorded, RecordingConnection, RecordingDriver, RecordingRequest};
pub use test_helpers::{create_test_row, single_value_set};
