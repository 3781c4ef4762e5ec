// ws_event_client/src/client/stub.rs

//! `NoopClient`：与 `WsClient` 公开形状一致、但不做任何事的桩实现。
//!
//! 用于在不需要真实连接的地方 (例如单元测试) 替换 `WsClient`。
//! 回调会被接收但永远不会被触发；发送总是成功，只记录帧数。

use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use super::EventClient;
use crate::error::WsError;
use crate::message::OutboundFrame;

#[derive(Debug, Default)]
pub struct NoopClient {
    sent_frames: AtomicUsize,
}

impl NoopClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 迄今为止 `send` / `send_json` 接受的帧数。
    pub fn sent_frames(&self) -> usize {
        self.sent_frames.load(Ordering::SeqCst)
    }
}

impl EventClient for NoopClient {
    fn on_open<F>(&self, _callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
    }

    fn on_message<F>(&self, _callback: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
    }

    fn on_close<F>(&self, _callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
    }

    fn on_error<F>(&self, _callback: F)
    where
        F: Fn(WsError) + Send + Sync + 'static,
    {
    }

    fn connect(&self) {
        debug!("[NoopClient] connect 被调用 (无操作)。");
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), WsError> {
        debug!("[NoopClient] 丢弃 {} 字节的载荷。", frame.len());
        self.sent_frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {}
}
