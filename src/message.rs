// ws_event_client/src/message.rs

//! 出站帧类型以及参考服务端使用的 `op` 请求/响应约定。
//!
//! 客户端核心把消息体视为不透明字节；`OpRequest` / `OpResponse` 只是叠加在其上的
//! 应用层约定：请求 `{"op":"<name>"}`，对应响应 `{"op":"<name>-response"}`。

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::WsError;

/// 响应 `op` 名称的后缀。
pub const RESPONSE_SUFFIX: &str = "-response";

/// 一条等待写入传输层的出站载荷。
///
/// 入队后所有权转移给写入任务；除了在队列中的位置外没有其他标识。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// 文本帧 (JSON 载荷都以文本帧发送)
    Text(String),
    /// 二进制帧
    Binary(Vec<u8>),
}

impl OutboundFrame {
    /// 将任意可序列化的值编码为 JSON 文本帧。
    ///
    /// # Returns
    /// * `Result<OutboundFrame, WsError>` - 无法编码时 (例如映射的键不是字符串) 返回 `WsError::SerializationError`。
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, WsError> {
        Ok(OutboundFrame::Text(serde_json::to_string(value)?))
    }

    /// 载荷字节数
    pub fn len(&self) -> usize {
        match self {
            OutboundFrame::Text(text) => text.len(),
            OutboundFrame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_message(self) -> Message {
        match self {
            OutboundFrame::Text(text) => Message::Text(text),
            OutboundFrame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

impl From<String> for OutboundFrame {
    fn from(text: String) -> Self {
        OutboundFrame::Text(text)
    }
}

impl From<&str> for OutboundFrame {
    fn from(text: &str) -> Self {
        OutboundFrame::Text(text.to_string())
    }
}

impl From<Vec<u8>> for OutboundFrame {
    fn from(bytes: Vec<u8>) -> Self {
        OutboundFrame::Binary(bytes)
    }
}

/// 参考服务端约定的请求体 `{"op":"<name>"}`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpRequest {
    pub op: String,
}

/// 参考服务端约定的响应体 `{"op":"<name>-response"}`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpResponse {
    pub op: String,
}

impl OpRequest {
    pub fn new(op: impl Into<String>) -> Self {
        Self { op: op.into() }
    }

    /// 构造与此请求匹配的响应。
    pub fn response(&self) -> OpResponse {
        OpResponse {
            op: format!("{}{}", self.op, RESPONSE_SUFFIX),
        }
    }
}
