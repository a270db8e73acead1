// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// AList 服务配置
    pub alist: AListConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// AList 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AListConfig {
    /// 服务基础地址（如 http://127.0.0.1:5244）
    pub base_url: String,
    /// 授权令牌（管理后台生成，原样放入 Authorization 头）
    pub token: String,
    /// 离线下载落盘的复制源目录（不带末尾斜杠）
    #[serde(default)]
    pub copy_from_path: String,
    /// 复制目标根目录（不带末尾斜杠）
    #[serde(default)]
    pub copy_to_path: String,
}

impl AListConfig {
    /// 校验必填字段
    ///
    /// # 返回值
    /// - Ok(()): 配置可用
    /// - Err: 缺少必填字段
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("alist.base_url 不能为空");
        }
        if self.token.is_empty() {
            anyhow::bail!("alist.token 不能为空");
        }
        Ok(())
    }
}

impl Default for AListConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5244".to_string(),
            token: String::new(),
            copy_from_path: String::new(),
            copy_to_path: String::new(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            alist: AListConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        // 校验 AList 连接配置
        config
            .alist
            .validate()
            .context("配置文件中的 AList 配置校验失败")?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("配置已保存: {}", path);
        Ok(())
    }

    /// 加载或创建默认配置
    ///
    /// 加载失败时落回默认配置并尝试写出模板，方便用户填写
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {}", e);
                let default_config = Self::default();

                if let Err(e) = default_config.save_to_file(path).await {
                    tracing::error!("保存默认配置失败: {}", e);
                }

                default_config
            }
        }
    }
}
