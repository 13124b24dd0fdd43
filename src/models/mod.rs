pub mod email;
pub mod submission;

pub use email::{is_valid_email, normalize_email, NormalizedEmail};
pub use submission::{DealerType, SendEmailResponse, Submission, SubmissionRequest};
