// AList FS Rust Library
// AList 文件列表服务 Rust 客户端核心库

// 配置管理模块
pub mod config;

// 日志系统模块
pub mod logging;

// AList API模块
pub mod alist;

// 导出常用类型
pub use alist::{
    AListClient, CopyTaskState, CopyTaskStatus, FileInfo, MetadataCacheScope, MkdirError,
};
pub use config::{AListConfig, AppConfig, LogConfig};
