pub mod job_request;

pub use job_request::{JobRequest, JobStatus, DESCRIPTION_MAX_LEN, DESCRIPTION_MIN_LEN};
