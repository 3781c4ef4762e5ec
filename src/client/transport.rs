// ws_event_client/src/client/transport.rs

//! 客户端 WebSocket 传输层：拨号并产出一对互相独立的发送端 / 接收端。
//!
//! 发送端 (`FrameSink`) 只交给写入任务，接收端 (`FrameStream`) 只交给读取任务，
//! 由此保证同一时刻只有一个任务写传输层、只有一个任务读传输层。
//! `Connector` trait 是传输层的替换点：默认实现基于 `tokio-tungstenite`，
//! 测试中可以换成内存传输。

use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::{Sink, Stream, StreamExt};
use log::{debug, error, info};
use tokio_tungstenite::{
    connect_async, // 异步连接函数
    tungstenite::Error as TungsteniteError, // 底层 tungstenite 库的错误类型
    tungstenite::protocol::Message, // 底层 WebSocket 消息枚举 (Text, Binary, Ping, Pong, Close)
    MaybeTlsStream,
    WebSocketStream,
};
use url::Url; // 用于解析和处理 URL

use crate::error::WsError;

/// 可能经过 TLS 加密的 TCP WebSocket 流，`tokio-tungstenite` 在客户端连接成功后返回的流类型。
pub type ClientWsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 传输层发送端，由写入任务独占。
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = TungsteniteError> + Send>>;

/// 传输层接收端，由读取任务独占。
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, TungsteniteError>> + Send>>;

/// 建立传输连接的能力。
///
/// `dial` 返回的 future 完成即表示握手结束：成功时得到可用的发送端与接收端，
/// 失败时得到描述原因的 `WsError` (由客户端转交给错误回调)。
pub trait Connector: Send + Sync + 'static {
    fn dial<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(FrameSink, FrameStream), WsError>>;
}

/// 基于 `tokio_tungstenite::connect_async` 的默认连接器。
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn dial<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(FrameSink, FrameStream), WsError>> {
        Box::pin(async move {
            let stream = connect_client(url).await?;
            // 将 WebSocket 流分割为独立的发送端和接收端
            let (ws_sender, ws_receiver) = stream.split();
            let sink: FrameSink = Box::pin(ws_sender);
            let frames: FrameStream = Box::pin(ws_receiver);
            Ok((sink, frames))
        })
    }
}

/// 异步连接到指定的 WebSocket 服务器。
///
/// URL 只在这里解析一次，用于给出可读的 `InvalidUrl` 错误；协议、握手等其余校验
/// 全部交给 `tokio-tungstenite`。
///
/// # Arguments
/// * `url_str` - WebSocket 服务器的完整 URL (例如 "ws://127.0.0.1:8080" 或 "wss://example.com/socket")。
///
/// # Returns
/// * `Result<ClientWsStream, WsError>` - 握手成功时返回完整的 WebSocket 流；
///   URL 解析失败返回 `InvalidUrl`，连接或握手失败返回 `DialError`。
pub async fn connect_client(url_str: &str) -> Result<ClientWsStream, WsError> {
    info!("客户端：开始尝试连接到 WebSocket 服务器，URL: {}", url_str);
    let parsed_url = Url::parse(url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;

    match connect_async(parsed_url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!("客户端：已成功连接到 {} (HTTP 状态码: {})", url_str, response.status());
            debug!("客户端：WebSocket 连接响应头: {:?}", response.headers());
            Ok(ws_stream)
        }
        Err(e) => {
            error!("客户端：连接到 {} 失败，错误: {}", url_str, e);
            Err(WsError::DialError(e))
        }
    }
}
