// ws_event_client/src/client/io.rs

//! 写入任务与读取任务。
//!
//! 每个打开的连接恰好有一个写入任务和一个读取任务：
//! - 写入任务按 FIFO 顺序消费出站队列，是唯一写传输层的任务；退出时负责关闭传输层，
//!   等读取任务结束后再触发关闭回调。
//! - 读取任务逐帧读取传输层，并在自身任务上同步调用消息回调。
//!
//! 两个任务遇到终止条件时都汇聚到 `ClientInner::begin_shutdown`。

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt}; // Sink / Stream 的扩展方法 (send, close, next)
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout; // 每次写入都有截止时间
use tokio_tungstenite::tungstenite::{protocol::Message, Error as TungsteniteError};

use super::lifecycle::{wait_until, ClientInner, ShutdownReason, StopSignal};
use super::transport::{FrameSink, FrameStream};
use crate::error::WsError;
use crate::message::OutboundFrame;

/// 写入任务的退出原因。
enum WriterExit {
    /// 出站队列已释放并被排空
    Drained,
    /// 因失败关停而中止，不再排空队列
    Aborted,
    /// 写入失败或超时
    Failed(WsError),
}

pub(crate) async fn run_writer(
    inner: Arc<ClientInner>,
    mut sink: FrameSink,
    mut queue: mpsc::Receiver<OutboundFrame>,
    mut stop: watch::Receiver<StopSignal>,
    reader: JoinHandle<()>,
) {
    let write_timeout = inner.config().write_timeout();
    let tag = inner.log_tag();
    debug!("{} 写入任务已启动。", tag);

    let exit = loop {
        tokio::select! {
            biased;
            _ = wait_until(&mut stop, |signal| signal == StopSignal::Abort) => break WriterExit::Aborted,
            next = queue.recv() => {
                let Some(frame) = next else {
                    break WriterExit::Drained;
                };
                let len = frame.len();
                match timeout(write_timeout, sink.send(frame.into_message())).await {
                    Ok(Ok(())) => debug!("{} 已写入 {} 字节。", tag, len),
                    Ok(Err(e)) => break WriterExit::Failed(WsError::WriteError(e)),
                    Err(_) => break WriterExit::Failed(WsError::WriteTimeout(write_timeout)),
                }
            }
        }
    };

    match exit {
        WriterExit::Drained => info!("{} 出站队列已排空，写入任务结束。", tag),
        WriterExit::Aborted => info!("{} 收到中止信号，写入任务结束。", tag),
        WriterExit::Failed(e) => {
            error!("{} 写入传输层失败: {}", tag, e);
            inner.begin_shutdown(ShutdownReason::WriteFailed, Some(e));
        }
    }
    // 剩余尚未写出的载荷随队列一起丢弃
    queue.close();

    // 传输层只在这里关闭一次 (发送 Close 帧)
    match timeout(write_timeout, sink.close()).await {
        Ok(Ok(())) => debug!("{} 传输层已关闭。", tag),
        Ok(Err(e)) => debug!("{} 关闭传输层时返回错误 (可忽略): {}", tag, e),
        Err(_) => warn!("{} 关闭传输层超时。", tag),
    }
    drop(sink);

    // 读取任务可能正在执行消息回调；它在下一次 select 时看到停止信号后退出
    if let Err(e) = reader.await {
        warn!("{} 读取任务异常结束: {}", tag, e);
    }
    inner.finish_shutdown();
}

pub(crate) async fn run_reader(
    inner: Arc<ClientInner>,
    mut frames: FrameStream,
    mut stop: watch::Receiver<StopSignal>,
    mut opened: watch::Receiver<bool>,
) {
    let tag = inner.log_tag();
    debug!("{} 读取任务已启动。", tag);
    wait_until(&mut opened, |opened| opened).await;

    let failure = loop {
        tokio::select! {
            biased;
            _ = wait_until(&mut stop, |signal| signal != StopSignal::Running) => {
                debug!("{} 关停已开始，读取任务停止读取。", tag);
                return;
            }
            next = frames.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = inner.callbacks().emit_message(text.into_bytes()) {
                        break Some((ShutdownReason::CallbackPanicked, e));
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if let Err(e) = inner.callbacks().emit_message(bytes) {
                        break Some((ShutdownReason::CallbackPanicked, e));
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                    // Ping 由 tokio-tungstenite 自动回复 Pong，应用层无需处理
                }
                Some(Ok(Message::Close(close_frame))) => {
                    info!("{} 收到 Close 控制帧: {:?}", tag, close_frame);
                    break None;
                }
                Some(Err(e)) if is_expected_closure(&e) => {
                    debug!("{} 连接已关闭: {}", tag, e);
                    break None;
                }
                Some(Err(e)) => {
                    error!("{} 从传输层读取时发生非预期错误: {}", tag, e);
                    break Some((ShutdownReason::ReadFailed, WsError::ReadError(e)));
                }
                None => {
                    debug!("{} 接收流已结束。", tag);
                    break None;
                }
            }
        }
    };

    match failure {
        None => {
            inner.begin_shutdown(ShutdownReason::PeerClosed, None);
        }
        Some((reason, e)) => {
            inner.begin_shutdown(reason, Some(e));
        }
    }
}

/// 连接正常关闭产生的错误，不进入错误回调。
fn is_expected_closure(error: &TungsteniteError) -> bool {
    matches!(error, TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)
}
