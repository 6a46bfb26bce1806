//! 加油站设备转发服务：订阅室内机/室外机上报，按加油站绑定关系互相转发。

mod relay;

use relay_config::AppConfig;
use relay_telemetry::{init_tracing, metrics};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();
    info!(
        target: "relay.server",
        storage_backend = ?config.storage_backend,
        mqtt_host = %config.mqtt_host,
        mqtt_port = config.mqtt_port,
        device_offline_hours = config.device_offline_hours,
        "relay_server_starting"
    );

    let stores = relay::build_stores(&config).await?;
    let handles = relay::spawn_relay(&config, stores);

    // 事件循环只会在分发 worker 退出后结束
    if let Err(err) = handles.event_loop.await {
        warn!(target: "relay.server", error = %err, "event_loop_task_failed");
    }
    if let Err(err) = handles.worker.await {
        warn!(target: "relay.server", error = %err, "dispatch_worker_task_failed");
    }
    let snapshot = metrics().snapshot();
    info!(
        target: "relay.server",
        messages_received = snapshot.messages_received,
        forwards_published = snapshot.forwards_published,
        alarms_recorded = snapshot.alarms_recorded,
        "relay_server_stopped"
    );
    Ok(())
}
