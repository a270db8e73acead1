//! AList 客户端实现

use crate::alist::task::CopyTaskStatus;
use crate::alist::types::{ApiResponse, CopyData, CopyRequest, FileInfo, MkdirError, MkdirRequest};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 复制接口路径
const COPY_PATH: &str = "/api/fs/copy";
/// 复制任务查询接口路径
const COPY_QUERY_PATH: &str = "/api/admin/task/copy/info";
/// 目录创建接口路径
const MKDIR_PATH: &str = "/api/fs/mkdir";
/// 元数据查询接口路径
const FS_GET_PATH: &str = "/api/fs/get";

/// 业务成功状态码
const CODE_OK: i32 = 200;
/// `/api/fs/get` 的"路径不存在"状态码
const CODE_NOT_FOUND: i32 = 500;

/// 目录创建后的可见性确认轮询间隔
const MKDIR_CONFIRM_INTERVAL: Duration = Duration::from_millis(500);
/// 可见性确认最大轮询次数，超出视为确认超时
const MKDIR_CONFIRM_ATTEMPTS: u32 = 10;

/// 作用域元数据缓存状态
///
/// 仅在显式开启的缓存作用域内生效，按路径记录查询结果（含"不存在"）
#[derive(Debug, Default)]
struct MetadataCache {
    /// 缓存是否处于激活状态
    active: bool,
    /// 路径 → 查询结果（None 表示已确认不存在）
    entries: HashMap<String, Option<FileInfo>>,
}

/// AList 客户端
///
/// 封装复制、目录创建、元数据查询和复制任务状态查询接口。
/// 单个实例按一次一个逻辑操作的方式使用，不支持并发调用，
/// 需要并发时由调用方自行串行化
#[derive(Debug)]
pub struct AListClient {
    /// HTTP客户端
    client: Client,
    /// 服务基础地址（已去除末尾斜杠）
    base_url: String,
    /// 授权令牌（原样放入 Authorization 头，无 scheme 前缀）
    token: String,
    /// 作用域元数据缓存
    cache: Mutex<MetadataCache>,
}

impl AListClient {
    /// 创建新的 AList 客户端
    ///
    /// # 参数
    /// * `base_url` - 服务基础地址（如 `http://127.0.0.1:5244`），末尾斜杠会被去除
    /// * `token` - 授权令牌
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
            cache: Mutex::new(MetadataCache::default()),
        })
    }

    /// 从配置创建客户端
    pub fn from_config(config: &crate::config::AListConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.base_url.clone(), config.token.clone())
    }

    // =====================================================
    // 复制
    // =====================================================

    /// 复制文件
    ///
    /// 先确保目标目录存在，目录创建的结果刻意忽略（创建失败时仍尝试
    /// 提交复制，由远端裁决），然后提交复制请求
    ///
    /// # 参数
    /// * `src_dir` - 源目录
    /// * `dst_dir` - 目标目录
    /// * `names` - 待复制的文件名列表（按顺序提交）
    ///
    /// # 返回
    /// 第一个排队任务的 ID
    pub async fn copy(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> Result<String> {
        if let Err(e) = self.mkdirs(dst_dir).await {
            warn!("目标目录 {} 预创建失败，仍继续提交复制: {}", dst_dir, e);
        }

        let url = format!("{}{}", self.base_url, COPY_PATH);
        let body = CopyRequest {
            src_dir: src_dir.to_string(),
            dst_dir: dst_dir.to_string(),
            names: names.to_vec(),
        };

        debug!(
            "开始复制 {} 个文件: {} -> {}",
            names.len(),
            src_dir,
            dst_dir
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.token)
            .json(&body)
            .send()
            .await
            .context("复制请求发送失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(
                "复制 {} -> {} 失败: status={}, 响应: {}",
                src_dir, dst_dir, status, text
            );
            anyhow::bail!("复制请求失败: {}", status);
        }

        let envelope: ApiResponse<CopyData> =
            response.json().await.context("解析复制响应失败")?;

        if envelope.code != CODE_OK {
            error!(
                "复制 {} -> {} 失败: code={}, message={}",
                src_dir, dst_dir, envelope.code, envelope.message
            );
            anyhow::bail!("复制失败: {} - {}", envelope.code, envelope.message);
        }

        let task = envelope
            .data
            .and_then(|d| d.tasks.into_iter().next())
            .context("复制响应中没有任务信息")?;

        info!(
            "复制 {} 个文件 {} -> {} 已提交, 任务 ID={}",
            names.len(),
            src_dir,
            dst_dir,
            task.id
        );
        Ok(task.id)
    }

    /// 查询复制任务状态
    ///
    /// # 参数
    /// * `tid` - 任务 ID（由 `copy` 返回）
    pub async fn query_copy_task(&self, tid: &str) -> Result<CopyTaskStatus> {
        let url = format!("{}{}", self.base_url, COPY_QUERY_PATH);

        debug!("开始查询任务 {}", tid);

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.token)
            .query(&[("tid", tid)])
            .send()
            .await
            .context("任务查询请求发送失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("查询任务 {} 失败: status={}, 响应: {}", tid, status, text);
            anyhow::bail!("任务查询失败: {}", status);
        }

        let envelope: ApiResponse<CopyTaskStatus> =
            response.json().await.context("解析任务查询响应失败")?;

        if envelope.code != CODE_OK {
            error!(
                "查询任务 {} 失败: code={}, message={}",
                tid, envelope.code, envelope.message
            );
            anyhow::bail!("任务查询失败: {} - {}", envelope.code, envelope.message);
        }

        envelope.data.context("任务查询响应中没有数据")
    }

    // =====================================================
    // 元数据
    // =====================================================

    /// 查询文件元数据
    ///
    /// 缓存作用域激活且 `refresh == false` 时优先返回缓存结果（含已
    /// 确认的"不存在"），不发起网络请求。`refresh == true` 时绕过本地
    /// 缓存读取，并通过表单字段要求远端刷新其内部缓存，查询结果仍会
    /// 写回激活中的缓存
    ///
    /// # 参数
    /// * `path` - 绝对路径
    /// * `refresh` - 是否绕过缓存强制刷新
    ///
    /// # 返回
    /// - `Ok(Some(info))` - 路径存在
    /// - `Ok(None)` - 路径不存在，或存在但远端未返回数据
    /// - `Err` - 传输失败或服务端返回意外状态码（与"不存在"严格区分）
    pub async fn fs_get(&self, path: &str, refresh: bool) -> Result<Option<FileInfo>> {
        if !refresh {
            if let Some(cached) = self.cache_lookup(path) {
                debug!("元数据缓存命中: {}", path);
                return Ok(cached);
            }
        }

        let url = format!("{}{}", self.base_url, FS_GET_PATH);
        let form = [
            ("path", path),
            ("password", ""),
            ("refresh", if refresh { "true" } else { "false" }),
        ];

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.token)
            .form(&form)
            .send()
            .await
            .context("元数据请求发送失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(
                "查询 {} 元数据失败: status={}, 响应: {}",
                path, status, text
            );
            anyhow::bail!("元数据请求失败: {}", status);
        }

        let envelope: ApiResponse<serde_json::Value> =
            response.json().await.context("解析元数据响应失败")?;

        let result = match envelope.code {
            CODE_OK => {
                let data = envelope.data.unwrap_or(serde_json::Value::Null);
                if is_empty_payload(&data) {
                    // code 200 但没有数据，按"无法取得元数据"处理
                    None
                } else {
                    let info: FileInfo =
                        serde_json::from_value(data).context("解析文件元数据失败")?;
                    Some(info)
                }
            }
            // AList 用业务码 500 表示路径不存在，不是错误
            CODE_NOT_FOUND => None,
            code => {
                error!(
                    "查询 {} 元数据失败: code={}, message={}",
                    path, code, envelope.message
                );
                anyhow::bail!("元数据查询失败: {} - {}", code, envelope.message);
            }
        };

        self.cache_store(path, result.clone());
        Ok(result)
    }

    // =====================================================
    // 目录创建
    // =====================================================

    /// 递归创建目录
    ///
    /// 从完整路径开始逐层向上探测，找到最深的已存在祖先后，自上而下
    /// 补齐缺失的目录段（远端要求父目录先于子目录存在），每创建一段
    /// 都轮询确认远端可见后才继续下一段
    ///
    /// # 返回
    /// - `Ok(())` - 目录已存在或创建完成
    /// - `Err(MkdirError::IsFile)` - 路径中某一段已存在且是文件
    /// - `Err(MkdirError::Unknown)` - 传输/服务失败、根目录无法解析或确认超时
    pub async fn mkdirs(&self, path: &str) -> Result<(), MkdirError> {
        let segments = path_segments(path);
        let n = segments.len();

        // 单次创建过程内共享元数据缓存，避免重复探测
        let _cache = self.cache_scope();

        // 自深向浅探测，定位最深的已存在祖先
        for depth in (0..=n).rev() {
            let subpath = join_segments(&segments[..depth]);
            let fileinfo = match self.fs_get(&subpath, false).await {
                Ok(info) => info,
                Err(e) => {
                    error!("探测 {} 失败: {}", subpath, e);
                    return Err(MkdirError::Unknown);
                }
            };

            let Some(fileinfo) = fileinfo else {
                continue;
            };

            if !fileinfo.is_dir {
                warn!("{} 已存在且是文件，无法创建目录", subpath);
                return Err(MkdirError::IsFile);
            }
            if depth == n {
                // 完整路径已经是目录，无需创建
                return Ok(());
            }

            // 从最深祖先的下一层开始逐段创建
            for create_depth in depth + 1..=n {
                let subpath = join_segments(&segments[..create_depth]);
                self.mkdir_confirmed(&subpath).await?;
            }
            return Ok(());
        }

        // 连根目录都探测不到，服务端状态异常
        error!("{} 的所有祖先均不存在（包括根目录）", path);
        Err(MkdirError::Unknown)
    }

    /// 创建单个目录并确认其可见
    ///
    /// 远端自身的元数据缓存存在更新延迟，创建成功后需以 refresh 方式
    /// 轮询，直到该目录可见；超出轮询预算视为创建失败
    async fn mkdir_confirmed(&self, path: &str) -> Result<(), MkdirError> {
        let url = format!("{}{}", self.base_url, MKDIR_PATH);
        let body = MkdirRequest {
            path: path.to_string(),
        };

        debug!("开始创建目录 {}", path);

        let response = match self
            .client
            .post(&url)
            .header("Authorization", &self.token)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("创建目录 {} 请求发送失败: {}", path, e);
                return Err(MkdirError::Unknown);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("创建目录 {} 失败: status={}, 响应: {}", path, status, text);
            return Err(MkdirError::Unknown);
        }

        let envelope: ApiResponse<serde_json::Value> = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("解析创建目录 {} 响应失败: {}", path, e);
                return Err(MkdirError::Unknown);
            }
        };

        if envelope.code != CODE_OK {
            error!(
                "创建目录 {} 失败: code={}, message={}",
                path, envelope.code, envelope.message
            );
            return Err(MkdirError::Unknown);
        }

        // 轮询确认目录已可见
        for attempt in 1..=MKDIR_CONFIRM_ATTEMPTS {
            match self.fs_get(path, true).await {
                Ok(Some(_)) => {
                    debug!("目录 {} 已确认可见（第 {} 次探测）", path, attempt);
                    return Ok(());
                }
                Ok(None) => {
                    tokio::time::sleep(MKDIR_CONFIRM_INTERVAL).await;
                }
                Err(e) => {
                    error!("确认目录 {} 可见性失败: {}", path, e);
                    return Err(MkdirError::Unknown);
                }
            }
        }

        error!(
            "目录 {} 创建后在 {} 次探测内未变为可见",
            path, MKDIR_CONFIRM_ATTEMPTS
        );
        Err(MkdirError::Unknown)
    }

    // =====================================================
    // 缓存作用域
    // =====================================================

    /// 开启元数据缓存作用域
    ///
    /// 激活时清空缓存；作用域守卫释放时（包括错误提前返回的路径）
    /// 再次清空并停用。不支持嵌套作用域
    pub fn cache_scope(&self) -> MetadataCacheScope<'_> {
        let mut cache = self.cache.lock();
        cache.entries.clear();
        cache.active = true;
        MetadataCacheScope { client: self }
    }

    /// 查询作用域缓存，外层 None 表示未命中
    fn cache_lookup(&self, path: &str) -> Option<Option<FileInfo>> {
        let cache = self.cache.lock();
        if !cache.active {
            return None;
        }
        cache.entries.get(path).cloned()
    }

    /// 将查询结果写入作用域缓存（含"不存在"）
    fn cache_store(&self, path: &str, value: Option<FileInfo>) {
        let mut cache = self.cache.lock();
        if cache.active {
            cache.entries.insert(path.to_string(), value);
        }
    }
}

/// 元数据缓存作用域守卫
///
/// 存活期间 `fs_get` 对同一路径最多发起一次网络请求；守卫释放时
/// 缓存被清空并停用
pub struct MetadataCacheScope<'a> {
    client: &'a AListClient,
}

impl Drop for MetadataCacheScope<'_> {
    fn drop(&mut self) {
        let mut cache = self.client.cache.lock();
        cache.entries.clear();
        cache.active = false;
    }
}

/// 将路径拆分为斜杠分隔的路径段，空段（连续斜杠、首尾斜杠）被丢弃
fn path_segments(path: &str) -> Vec<String> {
    path.trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// 将前若干路径段拼接为绝对路径，零段时为根目录 "/"
fn join_segments(segments: &[String]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// 判断 data 字段是否为空载荷（null 或空对象）
fn is_empty_payload(data: &serde_json::Value) -> bool {
    match data {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_client() -> AListClient {
        AListClient::new("http://127.0.0.1:5244/", "alist-test-token").unwrap()
    }

    fn dir_info(name: &str) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            is_dir: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = test_client();
        assert_eq!(client.base_url, "http://127.0.0.1:5244");

        let client = AListClient::new("http://example.com", "t").unwrap();
        assert_eq!(client.base_url, "http://example.com");
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(path_segments("a/b/c/"), vec!["a", "b", "c"]);
        assert_eq!(path_segments("//a//b"), vec!["a", "b"]);
        assert_eq!(path_segments(" /a/b "), vec!["a", "b"]);
        assert!(path_segments("/").is_empty());
        assert!(path_segments("").is_empty());
    }

    #[test]
    fn test_join_segments() {
        let segments = path_segments("/a/b/c");
        assert_eq!(join_segments(&segments[..0]), "/");
        assert_eq!(join_segments(&segments[..1]), "/a");
        assert_eq!(join_segments(&segments[..2]), "/a/b");
        assert_eq!(join_segments(&segments[..3]), "/a/b/c");
    }

    #[test]
    fn test_is_empty_payload() {
        assert!(is_empty_payload(&serde_json::Value::Null));
        assert!(is_empty_payload(&serde_json::json!({})));
        assert!(!is_empty_payload(&serde_json::json!({"name": "a"})));
        assert!(!is_empty_payload(&serde_json::json!([])));
    }

    #[test]
    fn test_cache_inactive_by_default() {
        let client = test_client();
        client.cache_store("/a", Some(dir_info("a")));
        // 未开启作用域时不缓存也不命中
        assert!(client.cache_lookup("/a").is_none());
    }

    #[test]
    fn test_cache_scope_hit_and_absence() {
        let client = test_client();
        let _scope = client.cache_scope();

        client.cache_store("/a", Some(dir_info("a")));
        client.cache_store("/a/b", None);

        assert_eq!(client.cache_lookup("/a"), Some(Some(dir_info("a"))));
        // "不存在"同样被缓存
        assert_eq!(client.cache_lookup("/a/b"), Some(None));
        assert!(client.cache_lookup("/a/c").is_none());
    }

    #[test]
    fn test_cache_scope_cleared_on_entry_and_exit() {
        let client = test_client();

        {
            let _scope = client.cache_scope();
            client.cache_store("/a", Some(dir_info("a")));
            assert!(client.cache_lookup("/a").is_some());
        }
        // 作用域结束后缓存停用且被清空
        assert!(client.cache_lookup("/a").is_none());

        {
            let _scope = client.cache_scope();
            // 新作用域从空缓存开始
            assert!(client.cache_lookup("/a").is_none());
        }
    }

    #[test]
    fn test_cache_scope_overwrites_stale_entry() {
        let client = test_client();
        let _scope = client.cache_scope();

        client.cache_store("/a", None);
        // refresh 查询写回后，后续命中新值
        client.cache_store("/a", Some(dir_info("a")));
        assert_eq!(client.cache_lookup("/a"), Some(Some(dir_info("a"))));
    }

    proptest! {
        // 任意路径段序列上，前缀深度与段数一致，且逐层嵌套
        #[test]
        fn prop_prefixes_nest(parts in prop::collection::vec("[a-z0-9]{1,8}", 0..6)) {
            let path = format!("/{}", parts.join("/"));
            let segments = path_segments(&path);
            prop_assert_eq!(segments.len(), parts.len());

            for depth in 1..=segments.len() {
                let parent = join_segments(&segments[..depth - 1]);
                let child = join_segments(&segments[..depth]);
                let expected = if parent == "/" {
                    format!("/{}", segments[depth - 1])
                } else {
                    format!("{}/{}", parent, segments[depth - 1])
                };
                prop_assert_eq!(&child, &expected);
            }
        }
    }
}
