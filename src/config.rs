// ws_event_client/src/config.rs

//! 客户端与参考回显服务端的配置信息。
//!
//! 配置可以直接在代码中构造，也可以从 JSON 配置文件加载。
//! 配置文件中缺失的字段使用默认值 (`#[serde(default)]`)。

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::WsError;

/// 参考回显服务端的默认主机地址
pub const DEFAULT_WS_HOST: &str = "127.0.0.1";
/// 参考回显服务端的默认端口号
pub const DEFAULT_WS_PORT: u16 = 8080;

/// 默认拨号超时时间 (秒)
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
/// 默认单帧写入截止时间 (秒)
pub const DEFAULT_WRITE_TIMEOUT_SECONDS: u64 = 10;
/// 默认出站队列容量
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// 覆盖回显服务端主机地址的环境变量
pub const ENV_ECHO_HOST: &str = "WS_ECHO_HOST";
/// 覆盖回显服务端端口号的环境变量
pub const ENV_ECHO_PORT: &str = "WS_ECHO_PORT";

/// `WsClient` 的运行参数。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// 拨号 (TCP + WebSocket 握手) 的超时时间（单位：秒）
    pub connect_timeout_seconds: u64,
    /// 写入任务单帧写入的截止时间（单位：秒）
    pub write_timeout_seconds: u64,
    /// 出站队列容量，队列满时发送方等待
    pub outbound_queue_capacity: usize,
    /// 发送方等待队列空位的最长时间（单位：毫秒）。`None` 表示无限等待。
    pub send_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            write_timeout_seconds: DEFAULT_WRITE_TIMEOUT_SECONDS,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            send_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }

    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_ms.map(Duration::from_millis)
    }

    /// 检查配置取值是否可用。
    ///
    /// 队列容量为 0 时 tokio 的有界通道无法创建，超时为 0 时任何写入或拨号都会立即失败，
    /// 因此这三种情况都视为配置错误。
    pub fn validate(&self) -> Result<(), WsError> {
        if self.outbound_queue_capacity == 0 {
            return Err(WsError::ConfigError("outbound_queue_capacity 必须大于 0".to_string()));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(WsError::ConfigError("connect_timeout_seconds 必须大于 0".to_string()));
        }
        if self.write_timeout_seconds == 0 {
            return Err(WsError::ConfigError("write_timeout_seconds 必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 从 JSON 配置文件加载客户端配置，并校验取值。
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, WsError> {
        let config: ClientConfig = load_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// 加载客户端配置，失败时记录警告并回退到默认配置。
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(config) => {
                info!("[配置模块] 已成功从配置文件 {:?} 加载客户端配置。", path);
                config
            }
            Err(e) => {
                warn!("[配置模块] 从 {:?} 加载客户端配置失败: {}。将使用默认配置。", path, e);
                ClientConfig::default()
            }
        }
    }
}

/// 参考回显服务端配置结构体
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EchoServerConfig {
    /// 回显服务绑定的主机地址
    pub host: String,
    /// 回显服务监听的端口号
    pub port: u16,
}

impl Default for EchoServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WS_HOST.to_string(),
            port: DEFAULT_WS_PORT,
        }
    }
}

impl EchoServerConfig {
    /// 监听地址字符串，例如 `127.0.0.1:8080`。
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 加载回显服务端配置：先读配置文件 (失败则使用默认值)，再应用环境变量覆盖。
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(path) => match load_json::<EchoServerConfig>(path) {
                Ok(config) => {
                    info!("[配置模块] 已成功从配置文件 {:?} 加载回显服务端配置。", path);
                    config
                }
                Err(e) => {
                    warn!("[配置模块] 从 {:?} 加载回显服务端配置失败: {}。将使用默认配置。", path, e);
                    EchoServerConfig::default()
                }
            },
            None => EchoServerConfig::default(),
        };
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = env::var(ENV_ECHO_HOST) {
            self.host = host;
        }
        if let Ok(port) = env::var(ENV_ECHO_PORT) {
            match port.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(e) => warn!("[配置模块] 环境变量 {} 的值 '{}' 不是合法端口: {}", ENV_ECHO_PORT, port, e),
            }
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, WsError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| WsError::ConfigError(format!("解析配置文件 {:?} 失败: {}", path, e)))
}
