//! Core result types shared by every component.

mod result;
mod status;

pub use result::{domain_of, fingerprint, FetchResult, FINGERPRINT_LEN};
pub use status::FetchStatus;
