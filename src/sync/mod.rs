pub mod pipeline;
pub mod upload;

pub use pipeline::run_sync;
pub use upload::{upload_batches, UploadTally};
