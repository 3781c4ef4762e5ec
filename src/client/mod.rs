// ws_event_client/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 本模块及其子模块共同构成了基于事件回调的 WebSocket 客户端：
//! - **连接建立** (`transport`): 拨号并拆分出发送端 / 接收端，`Connector` 是传输层替换点。
//! - **生命周期管理** (`lifecycle`): `Idle → Connecting → Open → Closed` 状态机，保证关停只执行一次。
//! - **消息传输** (`io`): 唯一的写入任务与唯一的读取任务。
//! - **回调注册** (`callbacks`): 打开、消息、关闭、错误四类事件各一个处理函数。
//! - **桩实现** (`stub`): 与 `WsClient` 公开形状一致、但不做任何事的 `NoopClient`。

use std::future::Future;

use serde::Serialize;

use crate::error::WsError;
use crate::message::OutboundFrame;

pub mod callbacks;
mod io;
pub mod lifecycle;
pub mod stub;
pub mod transport;
mod ws_client;

#[cfg(test)]
pub(crate) mod mock;

pub use callbacks::{CloseCallback, ErrorCallback, MessageCallback, OpenCallback};
pub use lifecycle::ConnectionState;
pub use stub::NoopClient;
pub use transport::{Connector, TungsteniteConnector};
pub use ws_client::WsClient;

/// 事件回调式客户端的能力集合。
///
/// `WsClient` 是真实实现，`NoopClient` 是形状相同的空实现 (测试替身)。
/// 回调应当在 `connect` 之前注册；之后重新注册是安全的，但对已经发生的事件没有追溯效果。
pub trait EventClient: Send + Sync {
    /// 注册连接打开回调。
    fn on_open<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static;

    /// 注册消息回调。回调在读取任务上同步执行，执行缓慢会阻塞后续读取。
    fn on_message<F>(&self, callback: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static;

    /// 注册连接关闭回调。每个打开过的连接恰好触发一次。
    fn on_close<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static;

    /// 注册错误回调 (拨号失败、非预期读取错误、写入失败)。
    fn on_error<F>(&self, callback: F)
    where
        F: Fn(WsError) + Send + Sync + 'static;

    /// 异步发起连接，立即返回；结果通过打开回调或错误回调通知。
    fn connect(&self);

    /// 将一帧载荷放入出站队列。
    fn send(&self, frame: OutboundFrame) -> impl Future<Output = Result<(), WsError>> + Send;

    /// 将可序列化的值编码为 JSON 文本帧并放入出站队列。
    ///
    /// 编码失败时同步返回 `WsError::SerializationError`，不会入队任何内容。
    fn send_json<T>(&self, value: &T) -> impl Future<Output = Result<(), WsError>> + Send
    where
        T: Serialize + ?Sized,
    {
        let encoded = OutboundFrame::json(value);
        async move { self.send(encoded?).await }
    }

    /// 幂等关闭，立即返回；关闭回调在传输层关闭之后触发。
    fn close(&self);
}
