//! 复制任务状态定义
//!
//! 状态码对应 AList 任务管理器返回的 state 字段，十个状态构成任务
//! 生命周期：pending → running → {succeeded | canceling → canceled |
//! errored → waiting retry → before retry → running | failing → failed}。
//! 本客户端只读取远端上报的状态，不做状态转移校验

use serde::{Deserialize, Serialize};

// =====================================================
// 任务状态枚举
// =====================================================

/// 复制任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum CopyTaskState {
    /// 等待执行
    Pending = 0,
    /// 执行中
    Running = 1,
    /// 已成功
    Succeeded = 2,
    /// 取消中
    Canceling = 3,
    /// 已取消
    Canceled = 4,
    /// 出错（将重试）
    Errored = 5,
    /// 失败处理中（执行 OnFailed 钩子）
    Failing = 6,
    /// 已失败（重试次数耗尽）
    Failed = 7,
    /// 等待重试
    WaitingRetry = 8,
    /// 重试前处理（执行 OnBeforeRetry 钩子）
    BeforeRetry = 9,
}

impl CopyTaskState {
    /// 从 i32 状态码转换为枚举
    ///
    /// 未知状态码返回 None
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Pending),
            1 => Some(Self::Running),
            2 => Some(Self::Succeeded),
            3 => Some(Self::Canceling),
            4 => Some(Self::Canceled),
            5 => Some(Self::Errored),
            6 => Some(Self::Failing),
            7 => Some(Self::Failed),
            8 => Some(Self::WaitingRetry),
            9 => Some(Self::BeforeRetry),
            _ => None,
        }
    }

    /// 获取状态描述文本
    pub fn to_text(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Canceling => "canceling",
            Self::Canceled => "canceled",
            Self::Errored => "errored",
            Self::Failing => "failing",
            Self::Failed => "failed",
            Self::WaitingRetry => "waiting for retry",
            Self::BeforeRetry => "executing OnBeforeRetry hook",
        }
    }

    /// 判断任务是否已终结（成功、已取消或已失败）
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled | Self::Failed)
    }

    /// 判断任务是否成功
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

// =====================================================
// 任务状态快照
// =====================================================

/// 复制任务状态快照
///
/// 对应 `/api/admin/task/copy/info` 返回的 data 字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyTaskStatus {
    /// 原始状态码
    pub state: i32,
    /// 错误信息（无错误时为空）
    #[serde(default)]
    pub error: String,
    /// 任务名称
    #[serde(default)]
    pub name: String,
}

impl CopyTaskStatus {
    /// 获取状态枚举
    ///
    /// 未知状态码返回 None
    pub fn get_state(&self) -> Option<CopyTaskState> {
        CopyTaskState::from_i32(self.state)
    }

    /// 获取状态描述文本，未知状态码返回 "unknown"
    pub fn state_text(&self) -> &'static str {
        self.get_state().map(|s| s.to_text()).unwrap_or("unknown")
    }

    /// 判断任务是否已终结
    pub fn is_finished(&self) -> bool {
        self.get_state().map(|s| s.is_terminal()).unwrap_or(false)
    }

    /// 判断任务是否成功
    pub fn is_success(&self) -> bool {
        self.get_state().map(|s| s.is_success()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alist::types::ApiResponse;

    #[test]
    fn test_state_from_i32() {
        assert_eq!(CopyTaskState::from_i32(0), Some(CopyTaskState::Pending));
        assert_eq!(CopyTaskState::from_i32(1), Some(CopyTaskState::Running));
        assert_eq!(CopyTaskState::from_i32(2), Some(CopyTaskState::Succeeded));
        assert_eq!(CopyTaskState::from_i32(3), Some(CopyTaskState::Canceling));
        assert_eq!(CopyTaskState::from_i32(4), Some(CopyTaskState::Canceled));
        assert_eq!(CopyTaskState::from_i32(5), Some(CopyTaskState::Errored));
        assert_eq!(CopyTaskState::from_i32(6), Some(CopyTaskState::Failing));
        assert_eq!(CopyTaskState::from_i32(7), Some(CopyTaskState::Failed));
        assert_eq!(CopyTaskState::from_i32(8), Some(CopyTaskState::WaitingRetry));
        assert_eq!(CopyTaskState::from_i32(9), Some(CopyTaskState::BeforeRetry));
        // 未知状态码
        assert_eq!(CopyTaskState::from_i32(10), None);
        assert_eq!(CopyTaskState::from_i32(-1), None);
    }

    #[test]
    fn test_state_to_text() {
        assert_eq!(CopyTaskState::Pending.to_text(), "pending");
        assert_eq!(CopyTaskState::Running.to_text(), "running");
        assert_eq!(CopyTaskState::Succeeded.to_text(), "succeeded");
        assert_eq!(CopyTaskState::WaitingRetry.to_text(), "waiting for retry");
        assert_eq!(
            CopyTaskState::BeforeRetry.to_text(),
            "executing OnBeforeRetry hook"
        );
    }

    #[test]
    fn test_state_is_terminal() {
        assert!(CopyTaskState::Succeeded.is_terminal());
        assert!(CopyTaskState::Canceled.is_terminal());
        assert!(CopyTaskState::Failed.is_terminal());
        assert!(!CopyTaskState::Pending.is_terminal());
        assert!(!CopyTaskState::Running.is_terminal());
        assert!(!CopyTaskState::Canceling.is_terminal());
        assert!(!CopyTaskState::Errored.is_terminal());
        assert!(!CopyTaskState::WaitingRetry.is_terminal());
    }

    #[test]
    fn test_status_parse_with_defaults() {
        // error 和 name 可能缺失
        let json = r#"{"state": 2}"#;
        let status: CopyTaskStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.state, 2);
        assert_eq!(status.error, "");
        assert_eq!(status.name, "");
        assert!(status.is_finished());
        assert!(status.is_success());
    }

    #[test]
    fn test_status_unknown_state_text() {
        let status = CopyTaskStatus {
            state: 42,
            error: String::new(),
            name: String::new(),
        };
        assert_eq!(status.get_state(), None);
        assert_eq!(status.state_text(), "unknown");
        assert!(!status.is_finished());
    }

    #[test]
    fn test_status_parse_full_envelope() {
        let json = r#"{
            "code": 200,
            "message": "success",
            "data": {
                "state": 5,
                "error": "context deadline exceeded",
                "name": "copy [/src](movie.mkv) to [/dst]"
            }
        }"#;

        let resp: ApiResponse<CopyTaskStatus> = serde_json::from_str(json).unwrap();
        let status = resp.data.unwrap();
        assert_eq!(status.get_state(), Some(CopyTaskState::Errored));
        assert_eq!(status.state_text(), "errored");
        assert_eq!(status.error, "context deadline exceeded");
        assert!(!status.is_finished());
    }
}
