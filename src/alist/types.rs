//! AList API 数据类型定义
//!
//! 本模块定义了 AList 接口相关的数据结构，包括：
//! - 统一响应信封
//! - 文件元数据快照
//! - 复制/目录创建的请求与响应类型
//! - 目录创建错误类型

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =====================================================
// 响应信封
// =====================================================

/// AList API 统一响应信封
///
/// 所有接口返回 `{code, message, data}`，`code == 200` 表示成功。
/// 注意 `/api/fs/get` 用业务码 500 表示"路径不存在"，不是错误
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    /// 业务状态码（200 表示成功）
    #[serde(default)]
    pub code: i32,
    /// 服务端消息
    #[serde(default)]
    pub message: String,
    /// 业务数据（失败时可能缺失或为 null）
    #[serde(default)]
    pub data: Option<T>,
}

// =====================================================
// 文件元数据
// =====================================================

/// 远端文件（或目录）元数据快照
///
/// 对应 `/api/fs/get` 返回的 data 字段。字段齐全程度取决于
/// 存储驱动，全部按缺省容忍处理
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// 文件名
    #[serde(default)]
    pub name: String,
    /// 文件大小（字节，未知时为 -1）
    #[serde(default = "default_size")]
    pub size: i64,
    /// 是否为目录
    #[serde(default)]
    pub is_dir: bool,
    /// 修改时间（原样保留的时间字符串）
    #[serde(default)]
    pub modified: String,
    /// 创建时间（原样保留的时间字符串）
    #[serde(default)]
    pub created: String,
    /// 签名
    #[serde(default)]
    pub sign: String,
    /// 缩略图地址
    #[serde(default)]
    pub thumb: String,
    /// 类型编码（未知时为 -1）
    #[serde(default = "default_type", rename = "type")]
    pub file_type: i32,
    /// 哈希信息（原始字符串形式）
    #[serde(default)]
    pub hashinfo: Option<String>,
    /// 哈希信息（算法 → 摘要）
    #[serde(default)]
    pub hash_info: Option<HashMap<String, String>>,
    /// 直链下载地址
    #[serde(default)]
    pub raw_url: String,
    /// 目录 readme 内容
    #[serde(default)]
    pub readme: String,
    /// 自定义响应头文本
    #[serde(default)]
    pub header: String,
    /// 存储驱动名称
    #[serde(default)]
    pub provider: String,
    /// 关联条目
    #[serde(default)]
    pub related: Option<Vec<serde_json::Value>>,
}

fn default_size() -> i64 {
    -1
}

fn default_type() -> i32 {
    -1
}

impl Default for FileInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: default_size(),
            is_dir: false,
            modified: String::new(),
            created: String::new(),
            sign: String::new(),
            thumb: String::new(),
            file_type: default_type(),
            hashinfo: None,
            hash_info: None,
            raw_url: String::new(),
            readme: String::new(),
            header: String::new(),
            provider: String::new(),
            related: None,
        }
    }
}

// =====================================================
// 请求类型
// =====================================================

/// 复制请求体
#[derive(Debug, Clone, Serialize)]
pub struct CopyRequest {
    /// 源目录
    pub src_dir: String,
    /// 目标目录
    pub dst_dir: String,
    /// 待复制的文件名列表（按顺序提交）
    pub names: Vec<String>,
}

/// 目录创建请求体
#[derive(Debug, Clone, Serialize)]
pub struct MkdirRequest {
    /// 待创建的目录绝对路径
    pub path: String,
}

// =====================================================
// 响应类型
// =====================================================

/// 复制接口的 data 字段
#[derive(Debug, Deserialize)]
pub struct CopyData {
    /// 服务端为本次复制排队的任务列表
    #[serde(default)]
    pub tasks: Vec<CopyTaskHandle>,
}

/// 已排队复制任务的句柄
#[derive(Debug, Clone, Deserialize)]
pub struct CopyTaskHandle {
    /// 任务唯一标识
    pub id: String,
    /// 任务名称
    #[serde(default)]
    pub name: String,
    /// 任务状态码
    #[serde(default)]
    pub state: i32,
}

// =====================================================
// 目录创建错误
// =====================================================

/// 目录创建错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MkdirError {
    /// 路径中某一段已存在且是文件，无法继续创建
    IsFile,
    /// 传输/服务级失败、根目录无法解析或创建后确认超时
    Unknown,
}

impl std::fmt::Display for MkdirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MkdirError::IsFile => write!(f, "路径段已存在且为文件"),
            MkdirError::Unknown => write!(f, "目录创建失败"),
        }
    }
}

impl std::error::Error for MkdirError {}
