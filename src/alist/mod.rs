// AList API模块

pub mod client;
pub mod task;
pub mod types;

pub use client::{AListClient, MetadataCacheScope};
pub use task::{CopyTaskState, CopyTaskStatus};
pub use types::{
    ApiResponse, CopyData, CopyRequest, CopyTaskHandle, FileInfo, MkdirError, MkdirRequest,
};
