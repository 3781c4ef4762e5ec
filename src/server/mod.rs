// ws_event_client/src/server/mod.rs

//! 参考回显服务端模块。
//!
//! 用于演示客户端以及作为集成测试的对端：
//! - **监听与握手** (`transport::ServerTransport`): 接受 TCP 连接并完成 WebSocket 握手，每个连接一个任务。
//! - **回显逻辑** (`transport::handle_echo_connection`): 回答 `{"op":"<name>"}` 请求，其他帧原样回显。

pub mod transport;
