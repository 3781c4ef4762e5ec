// ws_event_client/src/client/lifecycle.rs

//! 连接生命周期控制器。
//!
//! 状态迁移：`Idle → Connecting → Open → Closed`，拨号失败时 `Connecting → Idle`。
//! `Closed` 是终态，只能进入一次：进入 `Closed` 的迁移在写锁内完成，
//! 抢到这次迁移的一方负责释放出站队列、上报错误并通知读写任务停止；
//! 传输层的关闭和关闭回调随后由写入任务完成。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use futures_util::SinkExt;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use uuid::Uuid;

use super::callbacks::CallbackRegistry;
use super::io::{run_reader, run_writer};
use super::transport::{Connector, FrameSink};
use crate::config::ClientConfig;
use crate::error::WsError;
use crate::message::OutboundFrame;

/// 客户端连接状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 尚未连接 (或上一次拨号失败)
    Idle,
    /// 拨号进行中
    Connecting,
    /// 连接已打开，读写任务运行中
    Open,
    /// 已关闭 (终态)
    Closed,
}

/// 发给读写任务的停止信号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopSignal {
    Running,
    /// 主动关闭：读取任务立即停止，写入任务排空已入队的载荷后停止
    Drain,
    /// 失败关停：读写任务都立即停止
    Abort,
}

/// 触发关停的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownReason {
    Requested,
    PeerClosed,
    ReadFailed,
    WriteFailed,
    /// 打开回调或消息回调发生 panic
    CallbackPanicked,
}

struct Lifecycle {
    state: ConnectionState,
    connected_at: Option<DateTime<Utc>>,
}

pub(crate) struct ClientInner {
    id: Uuid,
    tag: String,
    url: String,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    callbacks: CallbackRegistry,
    lifecycle: RwLock<Lifecycle>,
    outbound_tx: Mutex<Option<mpsc::Sender<OutboundFrame>>>,
    outbound_rx: Mutex<Option<mpsc::Receiver<OutboundFrame>>>,
    stop: watch::Sender<StopSignal>,
    terminated: watch::Sender<bool>,
}

impl ClientInner {
    pub(crate) fn new(url: String, config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let id = Uuid::new_v4();
        let tag = format!("[WsClient {}]", &id.simple().to_string()[..8]);
        if let Err(e) = config.validate() {
            // 代码中直接构造的配置不经过 load_from_file，这里只告警并按下限修正
            warn!("{} 客户端配置不合法，将按可用的最小值运行: {}", tag, e);
        }
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity.max(1)); // 容量为 0 时 tokio 会 panic
        let (stop, _) = watch::channel(StopSignal::Running);
        let (terminated, _) = watch::channel(false);
        debug!("{} 已创建，目标地址: {}", tag, url);
        Self {
            id,
            tag,
            url,
            config,
            connector,
            callbacks: CallbackRegistry::default(),
            lifecycle: RwLock::new(Lifecycle {
                state: ConnectionState::Idle,
                connected_at: None,
            }),
            outbound_tx: Mutex::new(Some(outbound_tx)),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            stop,
            terminated,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub(crate) fn log_tag(&self) -> String {
        self.tag.clone()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.read_lifecycle().state
    }

    pub(crate) fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.read_lifecycle().connected_at
    }

    /// `Idle → Connecting`。其他状态下返回 `false`。
    pub(crate) fn try_begin_connect(&self) -> bool {
        let mut lifecycle = self.write_lifecycle();
        if lifecycle.state != ConnectionState::Idle {
            warn!("{} 当前状态 {:?} 不允许发起连接，忽略本次 connect 调用。", self.tag, lifecycle.state);
            return false;
        }
        lifecycle.state = ConnectionState::Connecting;
        true
    }

    /// 取得出站队列发送端的一个克隆；客户端已关闭时返回 `WsError::Closed`。
    pub(crate) fn outbound_sender(&self) -> Result<mpsc::Sender<OutboundFrame>, WsError> {
        if self.state() == ConnectionState::Closed {
            return Err(WsError::Closed);
        }
        lock(&self.outbound_tx).as_ref().cloned().ok_or(WsError::Closed)
    }

    /// 拨号任务主体：拨号、启动读写任务、触发打开回调。
    pub(crate) async fn dial_and_run(self: Arc<Self>) {
        let connect_timeout = self.config.connect_timeout();
        info!("{} 开始拨号: {}", self.tag, self.url);

        let dialed = match timeout(connect_timeout, self.connector.dial(&self.url)).await {
            Ok(result) => result,
            Err(_) => Err(WsError::ConnectionTimeout(connect_timeout)),
        };
        let (sink, frames) = match dialed {
            Ok(halves) => halves,
            Err(e) => {
                self.dial_failed(e);
                return;
            }
        };

        // 拨号期间可能已经调用过 close()
        let queue = {
            let mut lifecycle = self.write_lifecycle();
            if lifecycle.state == ConnectionState::Connecting {
                let queue = lock(&self.outbound_rx).take();
                if queue.is_some() {
                    lifecycle.state = ConnectionState::Open;
                    lifecycle.connected_at = Some(Utc::now());
                }
                queue
            } else {
                None
            }
        };
        let Some(queue) = queue else {
            info!("{} 拨号完成时客户端已关闭，丢弃新建立的连接。", self.tag);
            self.begin_shutdown(ShutdownReason::Requested, None);
            self.discard_transport(sink).await;
            self.mark_terminated();
            return;
        };

        info!("{} 连接已打开。", self.tag);
        // 打开回调返回前，读取任务不分发消息
        let (opened_tx, opened_rx) = watch::channel(false);
        let reader = tokio::spawn(run_reader(self.clone(), frames, self.stop.subscribe(), opened_rx));
        // 写入任务等读取任务结束后才触发关闭回调，保证关闭回调是最后一个事件
        tokio::spawn(run_writer(self.clone(), sink, queue, self.stop.subscribe(), reader));

        if let Err(e) = self.callbacks.emit_open() {
            self.begin_shutdown(ShutdownReason::CallbackPanicked, Some(e));
        }
        opened_tx.send_replace(true); // 放行读取任务
    }

    fn dial_failed(&self, error: WsError) {
        let closed_meanwhile = {
            let mut lifecycle = self.write_lifecycle();
            if lifecycle.state == ConnectionState::Connecting {
                lifecycle.state = ConnectionState::Idle;
                false
            } else {
                true
            }
        };
        if closed_meanwhile {
            // 调用方已经主动关闭，拨号失败不再上报
            debug!("{} 拨号期间客户端已关闭，忽略拨号错误: {}", self.tag, error);
            self.mark_terminated();
            return;
        }
        error!("{} 拨号失败: {}", self.tag, error);
        self.callbacks.emit_error(error);
    }

    async fn discard_transport(&self, mut sink: FrameSink) {
        if let Err(e) = timeout(self.config.write_timeout(), sink.close()).await {
            warn!("{} 关闭被丢弃的连接超时: {}", self.tag, e);
        }
    }

    /// 进入 `Closed` 的唯一入口。
    ///
    /// 只有第一次调用会执行迁移并返回 `true`；之后的调用 (无论来自 `close()`、
    /// 读取失败还是写入失败) 都只记录日志并返回 `false`，携带的错误被丢弃。
    pub(crate) fn begin_shutdown(&self, reason: ShutdownReason, error: Option<WsError>) -> bool {
        let previous = {
            let mut lifecycle = self.write_lifecycle();
            if lifecycle.state == ConnectionState::Closed {
                None
            } else {
                Some(std::mem::replace(&mut lifecycle.state, ConnectionState::Closed))
            }
        };
        let Some(previous) = previous else {
            match error {
                Some(e) => debug!("{} 关停已在进行中，忽略 {:?} 携带的错误: {}", self.tag, reason, e),
                None => debug!("{} 关停已在进行中，忽略 {:?}。", self.tag, reason),
            }
            return false;
        };

        // 释放出站队列：之后的发送都会得到 WsError::Closed
        lock(&self.outbound_tx).take();
        if previous != ConnectionState::Open {
            lock(&self.outbound_rx).take(); // 从未打开过：没有写入任务来排空，直接丢弃
        }
        info!("{} 开始关停 (原因: {:?}，原状态: {:?})。", self.tag, reason, previous);

        if let Some(e) = error {
            self.callbacks.emit_error(e);
        }

        // 主动关闭排空队列，其余原因立即中止
        let signal = match reason {
            ShutdownReason::Requested => StopSignal::Drain,
            _ => StopSignal::Abort,
        };
        self.stop.send_replace(signal); // 通知读写任务

        if previous == ConnectionState::Idle {
            self.mark_terminated(); // 没有任何任务在运行，关停即刻完成
        }
        true
    }

    /// 写入任务关闭传输层之后调用：触发关闭回调并标记关停完成。
    pub(crate) fn finish_shutdown(&self) {
        info!("{} 连接已关闭。", self.tag);
        self.callbacks.emit_close(); // panic 已在分发处记录
        self.mark_terminated();
    }

    fn mark_terminated(&self) {
        self.terminated.send_replace(true);
    }

    pub(crate) async fn wait_terminated(&self) {
        let mut terminated = self.terminated.subscribe();
        wait_until(&mut terminated, |done| done).await;
    }

    fn read_lifecycle(&self) -> RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lifecycle(&self) -> RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 等待 watch 通道的当前值满足条件；发送端被丢弃时直接返回。
pub(crate) async fn wait_until<T: Copy>(receiver: &mut watch::Receiver<T>, condition: impl Fn(T) -> bool) {
    loop {
        let current = *receiver.borrow_and_update();
        if condition(current) {
            return;
        }
        if receiver.changed().await.is_err() {
            return;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
