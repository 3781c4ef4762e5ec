// ws_event_client/src/server/transport.rs

//! 参考回显服务端的监听、握手与单连接处理逻辑。

use std::future::Future;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{protocol::Message, Error as TungsteniteError};
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::error::WsError;
use crate::message::OpRequest;

/// 经过 WebSocket 握手后的服务端 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// 负责 WebSocket 服务端的监听和连接接受。
pub struct ServerTransport;

impl ServerTransport {
    /// 绑定 `addr` 并开始接受连接。
    ///
    /// # Arguments
    /// * `addr`: 监听地址 (例如 "127.0.0.1:8080")。
    /// * `on_connect`: 每个握手成功的连接都会在独立的 Tokio 任务中调用一次，
    ///   参数为 `WsStream` 与对端地址。
    ///
    /// # Returns
    /// * `Result<(), WsError>`: 绑定失败时返回 `WsError::IoError`；否则一直运行。
    pub async fn start<F, Fut>(addr: SocketAddr, on_connect: F) -> Result<(), WsError>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&addr).await?;
        Self::start_with_listener(listener, on_connect).await
    }

    /// 在已绑定的监听器上接受连接。测试可以先绑定 `127.0.0.1:0` 取得端口再调用。
    pub async fn start_with_listener<F, Fut>(listener: TcpListener, on_connect: F) -> Result<(), WsError>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!("WebSocket 服务器正在监听地址: {}", listener.local_addr()?);

        loop {
            match listener.accept().await {
                Ok((tcp_stream, peer_addr)) => {
                    debug!("从 {} 接受了新的 TCP 连接", peer_addr);
                    let on_connect = on_connect.clone();
                    tokio::spawn(async move {
                        match accept_async(tcp_stream).await {
                            Ok(ws_stream) => {
                                info!("与 {} 的 WebSocket 握手成功", peer_addr);
                                on_connect(ws_stream, peer_addr).await;
                            }
                            Err(e) => error!("与 {} 的 WebSocket 握手失败: {}", peer_addr, e),
                        }
                    });
                }
                Err(e) => {
                    // 单次 accept 失败不影响监听
                    error!("接受 TCP 连接失败: {}。服务器将继续运行。", e);
                }
            }
        }
    }
}

/// 回显服务的单连接处理函数，可直接作为 `on_connect` 传入。
///
/// 文本帧若是 `{"op":"<name>"}` 请求则回复 `{"op":"<name>-response"}`，
/// 其余文本帧和二进制帧原样回显。对端关闭或读写出错时结束。
pub async fn handle_echo_connection(mut ws_stream: WsStream, peer_addr: SocketAddr) {
    while let Some(next) = ws_stream.next().await {
        let message = match next {
            Ok(message) => message,
            Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed) => break,
            Err(e) => {
                warn!("读取 {} 的消息失败: {}", peer_addr, e);
                break;
            }
        };
        if let Message::Close(frame) = &message {
            // 关闭握手的回复由 tungstenite 在后续读取中自动完成
            debug!("{} 发起关闭: {:?}", peer_addr, frame);
            continue;
        }
        let Some(reply) = echo_reply(message) else {
            continue;
        };
        if let Err(e) = ws_stream.send(reply).await {
            warn!("向 {} 发送回复失败: {}", peer_addr, e);
            break;
        }
    }
    info!("与 {} 的连接已结束", peer_addr);
}

/// 计算一帧入站消息的回复；控制帧不需要回复。
pub fn echo_reply(message: Message) -> Option<Message> {
    match message {
        Message::Text(text) => match serde_json::from_str::<OpRequest>(&text) {
            Ok(request) => match serde_json::to_string(&request.response()) {
                Ok(response) => Some(Message::Text(response)),
                Err(e) => {
                    error!("序列化 {} 的响应失败: {}", request.op, e);
                    None
                }
            },
            Err(_) => Some(Message::Text(text)),
        },
        Message::Binary(bytes) => Some(Message::Binary(bytes)),
        _ => None,
    }
}
