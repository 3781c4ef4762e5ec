// ws_event_client/src/client/mock.rs

//! 测试用内存传输层。
//!
//! `MockConnector` 记录写入的每一帧与关闭次数，并允许测试注入入站帧、读取错误、
//! 写入失败、写入阻塞以及拨号失败。

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{stream, Sink};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{protocol::Message, Error as TungsteniteError};

use super::transport::{Connector, FrameSink, FrameStream};
use crate::error::WsError;

type Inbound = Result<Message, TungsteniteError>;

#[derive(Default)]
struct SharedState {
    written: Mutex<Vec<Message>>,
    close_count: AtomicUsize,
    dial_count: AtomicUsize,
    fail_writes: AtomicBool,
    stall_writes: AtomicBool,
    fail_dial: AtomicBool,
}

#[derive(Clone)]
pub(crate) struct MockConnector {
    state: Arc<SharedState>,
    inbound_tx: Arc<Mutex<Option<mpsc::UnboundedSender<Inbound>>>>,
    inbound_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>>,
    dial_delay: Option<Duration>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(SharedState::default()),
            inbound_tx: Arc::new(Mutex::new(Some(tx))),
            inbound_rx: Arc::new(Mutex::new(Some(rx))),
            dial_delay: None,
        }
    }

    pub(crate) fn failing_dial() -> Self {
        let connector = Self::new();
        connector.state.fail_dial.store(true, Ordering::SeqCst);
        connector
    }

    pub(crate) fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    /// 已写入传输层的文本帧 (二进制帧按 UTF-8 宽松解码)。
    pub(crate) fn written_texts(&self) -> Vec<String> {
        self.state
            .written
            .lock()
            .unwrap()
            .iter()
            .map(|message| match message {
                Message::Text(text) => text.clone(),
                Message::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state.close_count.load(Ordering::SeqCst)
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.state.dial_count.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_writes(&self) {
        self.state.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stall_writes(&self) {
        self.state.stall_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn push_text(&self, text: &str) {
        self.push(Ok(Message::Text(text.to_string())));
    }

    pub(crate) fn push(&self, item: Inbound) {
        if let Some(tx) = self.inbound_tx.lock().unwrap().as_ref() {
            let _ = tx.send(item);
        }
    }

    pub(crate) fn fail_read(&self) {
        self.push(Err(TungsteniteError::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "模拟读取失败",
        ))));
    }

    /// 结束入站流，相当于对端断开。
    pub(crate) fn end_stream(&self) {
        self.inbound_tx.lock().unwrap().take();
    }
}

impl Connector for MockConnector {
    fn dial<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<(FrameSink, FrameStream), WsError>> {
        Box::pin(async move {
            self.state.dial_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.dial_delay {
                tokio::time::sleep(delay).await;
            }
            if self.state.fail_dial.load(Ordering::SeqCst) {
                return Err(WsError::DialError(TungsteniteError::Io(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "模拟拨号失败",
                ))));
            }
            let rx = self
                .inbound_rx
                .lock()
                .unwrap()
                .take()
                .expect("MockConnector 只支持拨号成功一次");
            let frames: FrameStream = Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }));
            let sink: FrameSink = Box::pin(MockSink {
                state: self.state.clone(),
            });
            Ok((sink, frames))
        })
    }
}

struct MockSink {
    state: Arc<SharedState>,
}

impl Sink<Message> for MockSink {
    type Error = TungsteniteError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.state.stall_writes.load(Ordering::SeqCst) {
            // 永不就绪，由写入截止时间打断
            return Poll::Pending;
        }
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(TungsteniteError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "模拟写入失败")));
        }
        self.state.written.lock().unwrap().push(item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}
