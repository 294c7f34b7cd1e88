//! Payload transfer under a bounded in-flight window
//!
//! [`TransferScheduler`] splits a payload into writes no larger than the
//! transport's maximum and gates every write on an [`Admission`] credit.

pub mod admission;
pub mod scheduler;

pub use admission::{Admission, CompletionAdmission, Credit, PacedAdmission};
pub use scheduler::{TransferJob, TransferScheduler};
