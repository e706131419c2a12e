//! Service layer
//!
//! Services contain the orchestration logic of the runners. They sequence
//! repository calls, capture output, enforce timeouts and make sure every
//! created workload is released.

mod cleanup;
mod cluster;
mod local;
mod output_buffer;

pub use cleanup::{CleanupGuard, flatten_timeout, settle};
pub use cluster::ClusterRunner;
pub use local::LocalRunner;
pub use output_buffer::OutputBuffer;
