//! `ws_event_client` 是一个基于事件回调的 WebSocket 客户端 Crate。
//!
//! 调用方注册打开、消息、关闭、错误四类回调，然后异步连接、发送 JSON 或原始载荷，
//! 并可以在任意时刻、从任意任务 (包括回调内部) 安全地关闭连接。
//!
//! 主要模块包括：
//! - `client`: `WsClient` 及其生命周期控制、读写任务、回调注册和 `NoopClient` 桩实现。
//! - `config`: 客户端与参考回显服务端的配置。
//! - `error`: 库中统一使用的错误类型 `WsError`。
//! - `message`: 出站帧 `OutboundFrame` 与 `{"op":...}` 请求/响应约定。
//! - `server`: 用于演示和集成测试的参考回显服务端。

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod server;

pub use client::{ConnectionState, Connector, EventClient, NoopClient, TungsteniteConnector, WsClient};
pub use config::{ClientConfig, EchoServerConfig};
pub use error::WsError;
pub use message::{OpRequest, OpResponse, OutboundFrame};
