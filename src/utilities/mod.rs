pub mod bounding_box;
pub mod collections;
pub mod job_handle;
pub mod memory;
pub mod thread_dispatcher;
