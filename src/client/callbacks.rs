// ws_event_client/src/client/callbacks.rs

//! 生命周期事件回调注册表。
//!
//! 每种事件 (打开、消息、关闭、错误) 至多一个处理函数，后注册的覆盖先注册的。
//! 分发时先在读锁内克隆出 `Arc`，释放锁之后再调用，因此回调内部可以重新注册回调
//! 或调用客户端的任意方法而不会死锁。
//! 回调中的 panic 在分发处被捕获，不会让读取任务或拨号任务悄无声息地退出。

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use log::error;

use crate::error::WsError;

/// 连接打开回调
pub type OpenCallback = Arc<dyn Fn() + Send + Sync>;
/// 收到数据帧回调，参数为帧的原始字节
pub type MessageCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;
/// 连接关闭回调
pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;
/// 错误回调
pub type ErrorCallback = Arc<dyn Fn(WsError) + Send + Sync>;

#[derive(Default, Clone)]
struct CallbackSet {
    on_open: Option<OpenCallback>,
    on_message: Option<MessageCallback>,
    on_close: Option<CloseCallback>,
    on_error: Option<ErrorCallback>,
}

/// 四个独立的单槽回调。
#[derive(Default)]
pub(crate) struct CallbackRegistry {
    slots: RwLock<CallbackSet>,
}

impl CallbackRegistry {
    pub(crate) fn set_on_open(&self, callback: OpenCallback) {
        self.write(|set| set.on_open = Some(callback));
    }

    pub(crate) fn set_on_message(&self, callback: MessageCallback) {
        self.write(|set| set.on_message = Some(callback));
    }

    pub(crate) fn set_on_close(&self, callback: CloseCallback) {
        self.write(|set| set.on_close = Some(callback));
    }

    pub(crate) fn set_on_error(&self, callback: ErrorCallback) {
        self.write(|set| set.on_error = Some(callback));
    }

    /// 返回 `Ok(true)` 表示确实调用了已注册的回调；回调 panic 时返回 `WsError::CallbackPanicked`。
    pub(crate) fn emit_open(&self) -> Result<bool, WsError> {
        let Some(callback) = self.read(|set| set.on_open.clone()) else {
            return Ok(false);
        };
        dispatch("on_open", || callback())?;
        Ok(true)
    }

    pub(crate) fn emit_message(&self, data: Vec<u8>) -> Result<bool, WsError> {
        let Some(callback) = self.read(|set| set.on_message.clone()) else {
            return Ok(false);
        };
        dispatch("on_message", move || callback(data))?;
        Ok(true)
    }

    /// 关闭回调中的 panic 只记录日志，关停流程照常完成。
    pub(crate) fn emit_close(&self) -> bool {
        match self.read(|set| set.on_close.clone()) {
            Some(callback) => dispatch("on_close", || callback()).is_ok(),
            None => false,
        }
    }

    pub(crate) fn emit_error(&self, error: WsError) -> bool {
        match self.read(|set| set.on_error.clone()) {
            Some(callback) => dispatch("on_error", move || callback(error)).is_ok(),
            None => false,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&CallbackSet) -> T) -> T {
        let guard = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut CallbackSet)) {
        let mut guard = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

/// 调用一次用户回调，把 panic 转换为错误而不是让所在任务退出。
fn dispatch(event: &str, call: impl FnOnce()) -> Result<(), WsError> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!("{} 回调发生 panic: {}", event, message);
        WsError::CallbackPanicked(format!("{event}: {message}"))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}
