// ws_event_client/src/client/ws_client.rs

//! `WsClient`：对单个 WebSocket 连接的事件回调式封装。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::timeout;
use uuid::Uuid;

use super::EventClient;
use super::lifecycle::{ClientInner, ConnectionState, ShutdownReason};
use super::transport::{Connector, TungsteniteConnector};
use crate::config::ClientConfig;
use crate::error::WsError;
use crate::message::OutboundFrame;

/// 一个逻辑 WebSocket 连接。
///
/// 克隆得到的句柄共享同一个连接，因此可以把句柄捕获进回调中，在回调里发送或关闭。
///
/// # 示例
/// ```no_run
/// use ws_event_client::{EventClient, WsClient};
///
/// # async fn demo() {
/// let client = WsClient::new("ws://127.0.0.1:8080");
/// let sender = client.clone();
/// client.on_open(move || {
///     let sender = sender.clone();
///     tokio::spawn(async move {
///         let _ = sender.send_json(&serde_json::json!({ "op": "get-time" })).await;
///     });
/// });
/// client.on_message(|data| println!("收到: {}", String::from_utf8_lossy(&data)));
/// client.on_close(|| println!("连接已关闭"));
/// client.connect();
/// # }
/// ```
#[derive(Clone)]
pub struct WsClient {
    inner: Arc<ClientInner>,
}

impl WsClient {
    /// 使用默认配置创建一个尚未连接的客户端。地址在此处不做校验。
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(url, ClientConfig::default())
    }

    /// 使用给定配置创建客户端。
    ///
    /// 配置在此处经过 `ClientConfig::validate` 检查：不合法时只记录警告，
    /// 队列容量按 1 修正，其余取值原样使用 (例如写入超时为 0 会让每次写入都超时)。
    pub fn with_config(url: impl Into<String>, config: ClientConfig) -> Self {
        Self::with_connector(url, config, TungsteniteConnector)
    }

    /// 使用自定义传输层创建客户端。
    pub fn with_connector(url: impl Into<String>, config: ClientConfig, connector: impl Connector) -> Self {
        Self {
            inner: Arc::new(ClientInner::new(url.into(), config, Arc::new(connector))),
        }
    }

    pub fn client_id(&self) -> Uuid {
        self.inner.id()
    }

    pub fn url(&self) -> &str {
        self.inner.url()
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// 连接打开的时间 (UTC)，从未打开过则为 `None`。
    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.inner.connected_at()
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), WsError> {
        self.send(OutboundFrame::Text(text.into())).await
    }

    pub async fn send_binary(&self, bytes: impl Into<Vec<u8>>) -> Result<(), WsError> {
        self.send(OutboundFrame::Binary(bytes.into())).await
    }

    /// 不等待的入队：队列已满返回 `WsError::QueueFull`，已关闭返回 `WsError::Closed`。
    ///
    /// 可以在同步回调 (例如打开回调) 中直接调用。
    pub fn try_send(&self, frame: impl Into<OutboundFrame>) -> Result<(), WsError> {
        let sender = self.inner.outbound_sender()?;
        sender.try_send(frame.into()).map_err(|e| match e {
            TrySendError::Full(_) => WsError::QueueFull,
            TrySendError::Closed(_) => WsError::Closed,
        })
    }

    /// 等待关停完全结束：传输层已关闭且关闭回调已返回。
    ///
    /// 对从未打开过的客户端，`close()` 之后立即返回。尚未关闭时会一直等待。
    pub async fn wait_closed(&self) {
        self.inner.wait_terminated().await;
    }
}

impl EventClient for WsClient {
    fn on_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.callbacks().set_on_open(Arc::new(callback));
    }

    fn on_message<F>(&self, callback: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        self.inner.callbacks().set_on_message(Arc::new(callback));
    }

    fn on_close<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.callbacks().set_on_close(Arc::new(callback));
    }

    fn on_error<F>(&self, callback: F)
    where
        F: Fn(WsError) + Send + Sync + 'static,
    {
        self.inner.callbacks().set_on_error(Arc::new(callback));
    }

    fn connect(&self) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("{} connect 必须在 tokio 运行时中调用: {}", self.inner.log_tag(), e);
                self.inner.callbacks().emit_error(e.into());
                return;
            }
        };
        if self.inner.try_begin_connect() {
            runtime.spawn(self.inner.clone().dial_and_run());
        }
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), WsError> {
        let sender = self.inner.outbound_sender()?;
        match self.inner.config().send_timeout() {
            Some(limit) => match timeout(limit, sender.send(frame)).await {
                Ok(result) => result.map_err(|_| WsError::Closed),
                Err(_) => Err(WsError::SendTimeout(limit)),
            },
            None => sender.send(frame).await.map_err(|_| WsError::Closed),
        }
    }

    fn close(&self) {
        if !self.inner.begin_shutdown(ShutdownReason::Requested, None) {
            debug!("{} 重复的 close 调用，已忽略。", self.inner.log_tag());
        }
    }
}

impl fmt::Debug for WsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsClient")
            .field("client_id", &self.client_id())
            .field("url", &self.url())
            .field("state", &self.state())
            .finish()
    }
}
