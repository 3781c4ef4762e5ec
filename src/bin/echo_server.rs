// ws_event_client/src/bin/echo_server.rs

//! 参考回显服务端。
//!
//! 用法: `echo_server [配置文件路径]`，监听地址也可以通过 `WS_ECHO_HOST` / `WS_ECHO_PORT` 覆盖。

use std::net::SocketAddr;
use std::path::PathBuf;

use log::{error, info, LevelFilter};
use ws_event_client::config::EchoServerConfig;
use ws_event_client::server::transport::{handle_echo_connection, ServerTransport};

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env()
        .init();
    info!("[主程序] 日志系统已初始化 (env_logger)，默认级别: Info。");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EchoServerConfig::load(config_path.as_deref());

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("[主程序] 监听地址 '{}' 无效: {}", config.bind_addr(), e);
            std::process::exit(1);
        }
    };

    info!("[主程序] 正在启动回显服务: {}", addr);
    if let Err(e) = ServerTransport::start(addr, handle_echo_connection).await {
        error!("[主程序] 致命错误：回显服务启动失败: {}", e);
        std::process::exit(1);
    }
}
