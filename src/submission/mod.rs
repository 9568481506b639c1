//! Client side of a dataset submission: pick a file, validate the form, then
//! request an upload URL, upload, and start the training job.

pub mod file;
pub mod flow;
pub mod status;
pub mod transport;

pub use file::{DatasetFile, FileSelectError};
pub use flow::{SubmissionFlow, SubmissionForm, SubmitError};
pub use status::SubmissionStatus;
pub use transport::{HttpSubmissionTransport, SubmissionTransport, TransportError};
