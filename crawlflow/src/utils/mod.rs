//! Small shared utilities.

mod timestamps;

pub use timestamps::{
    format_storage, now_utc, parse_storage, Timestamp, TimestampError, STORAGE_FORMAT,
};
