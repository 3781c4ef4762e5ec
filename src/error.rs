// ws_event_client/src/error.rs

//! 定义 WebSocket 事件客户端相关的错误类型。

use std::time::Duration;

use thiserror::Error; // 引入 thiserror 来简化错误类型的定义
use tokio_tungstenite::tungstenite::Error as TungsteniteError; // WebSocket 底层库的错误类型

/// WebSocket 事件客户端的统一错误类型。
///
/// 同步调用 (例如 `send_json`、配置加载、服务端绑定) 通过 `Result` 直接返回本类型；
/// 后台任务 (拨号、读取、写入) 中产生的错误则通过错误回调交给上层应用。
#[derive(Error, Debug)]
pub enum WsError {
    /// 目标地址无法解析为合法 URL。
    #[error("无效的 WebSocket URL: {0}")]
    InvalidUrl(String),

    /// 拨号或 WebSocket 握手失败。
    #[error("拨号失败: {0}")]
    DialError(#[source] TungsteniteError),

    /// 拨号在配置的超时时间内没有完成。
    #[error("连接超时 (超过 {0:?})")]
    ConnectionTimeout(Duration),

    /// 调用 `connect` 时当前线程不在 tokio 运行时中。
    #[error("当前上下文没有可用的 tokio 运行时: {0}")]
    RuntimeUnavailable(#[from] tokio::runtime::TryCurrentError),

    /// 载荷无法编码为 JSON。
    #[error("序列化错误: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 向传输层写入帧失败。
    #[error("写入错误: {0}")]
    WriteError(#[source] TungsteniteError),

    /// 单帧写入超过写入截止时间。
    #[error("写入超时 (超过 {0:?})")]
    WriteTimeout(Duration),

    /// 从传输层读取帧时发生非预期错误。
    #[error("读取错误: {0}")]
    ReadError(#[source] TungsteniteError),

    /// 打开回调或消息回调发生 panic，连接随之关停。
    #[error("回调发生 panic: {0}")]
    CallbackPanicked(String),

    /// 客户端已经关闭，出站队列已释放。
    #[error("发送错误: 连接已关闭")]
    Closed,

    /// 出站队列已满 (仅 `try_send` 返回)。
    #[error("发送错误: 出站队列已满")]
    QueueFull,

    /// 等待出站队列空位超过了配置的发送超时。
    #[error("发送超时 (超过 {0:?})")]
    SendTimeout(Duration),

    /// 底层 I/O 错误。
    #[error("I/O错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 配置文件内容不合法。
    #[error("配置错误: {0}")]
    ConfigError(String),
}

impl WsError {
    /// 判断该错误是否表示连接已被关闭 (而不是载荷或网络本身的问题)。
    pub fn is_closed(&self) -> bool {
        matches!(self, WsError::Closed)
    }
}
