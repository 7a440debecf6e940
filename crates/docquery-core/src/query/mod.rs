//! Query data model
//!
//! Requests, their cache fingerprints, and the results a run returns.

mod fingerprint;
mod request;
mod result;

pub use fingerprint::{normalize_text, QueryFingerprint};
pub use request::{ContextRef, Purpose, QueryRequest};
pub use result::{
    Analysis, AttemptOutcome, AttemptRecord, ComplianceIssue, QueryResult, ResponsePayload,
    RATE_LIMIT_PLACEHOLDER, UNAVAILABLE_PLACEHOLDER,
};
