//! MQTT 传输能力：连接、订阅、发布与入站报文的有序分发。
//!
//! 事件循环任务只负责收包，入站报文经有界通道交给单个分发 worker 顺序处理；
//! 连接断开后下一次 poll 自动重连，收到 ConnAck 时重新订阅。

use async_trait::async_trait;
use domain::InboundMessage;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 传输错误。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("publish error: {0}")]
    Publish(String),
    #[error("subscribe error: {0}")]
    Subscribe(String),
    #[error("handler error: {0}")]
    Handler(String),
}

/// 入站报文处理器。
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> Result<(), TransportError>;
}

/// 出站发布抽象（只入队，不等待确认）。
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// MQTT 传输配置。
#[derive(Debug, Clone)]
pub struct MqttTransportConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id_prefix: String,
    pub keep_alive_seconds: u64,
    pub qos: u8,
    /// 订阅的主题过滤器（每次 ConnAck 后重新订阅）
    pub subscriptions: Vec<String>,
    /// 入站队列与发布请求队列的容量
    pub queue_capacity: usize,
    pub reconnect_delay_ms: u64,
}

/// MQTT 发布器（与事件循环共享同一连接）。
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

#[async_trait]
impl MessagePublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        // try_publish：请求队列满时立即失败，分发 worker 不会反压事件循环
        self.client
            .try_publish(topic, self.qos, false, payload.to_vec())
            .map_err(|err| TransportError::Publish(err.to_string()))
    }
}

/// MQTT 传输（持有事件循环，`run` 之后由后台任务驱动）。
pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    client_id: String,
    config: MqttTransportConfig,
}

/// 传输后台任务句柄。
pub struct TransportHandles {
    pub event_loop: JoinHandle<()>,
    pub worker: JoinHandle<()>,
}

impl MqttTransport {
    /// 创建客户端（不会立即连接，首次 poll 时建立连接）。
    pub fn new(config: MqttTransportConfig) -> (MqttPublisher, Self) {
        let client_id = client_id(&config.client_id_prefix);
        let mut options = MqttOptions::new(client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.max(1)));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            options.set_credentials(username, password);
        }
        let (client, eventloop) = AsyncClient::new(options, config.queue_capacity.max(1));
        let publisher = MqttPublisher {
            client: client.clone(),
            qos: qos_from_u8(config.qos),
        };
        (
            publisher,
            Self {
                client,
                eventloop,
                client_id,
                config,
            },
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// 启动事件循环与分发 worker。
    pub fn run(self, handler: Arc<dyn InboundHandler>) -> TransportHandles {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let worker = spawn_dispatch_worker(rx, handler);
        let Self {
            client,
            mut eventloop,
            client_id,
            config,
        } = self;
        let qos = qos_from_u8(config.qos);
        let reconnect_delay = Duration::from_millis(config.reconnect_delay_ms);
        info!(
            target: "relay.transport",
            client_id = %client_id,
            host = %config.host,
            port = config.port,
            "mqtt_transport_started"
        );
        let event_loop = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code != ConnectReturnCode::Success {
                            warn!(target: "relay.transport", code = ?ack.code, "mqtt_connect_rejected");
                            continue;
                        }
                        info!(target: "relay.transport", client_id = %client_id, "mqtt_connected");
                        if let Err(err) = subscribe_all(&client, &config.subscriptions, qos) {
                            warn!(target: "relay.transport", error = %err, "mqtt_subscribe_failed");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = InboundMessage::new(
                            publish.topic.clone(),
                            publish.payload.to_vec(),
                            domain::now_epoch_ms(),
                        );
                        if tx.send(message).await.is_err() {
                            warn!(target: "relay.transport", "dispatch_worker_gone");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        warn!(target: "relay.transport", "mqtt_disconnected_by_broker");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // 下一次 poll 会自动重连；断线期间的报文不做补发
                        warn!(target: "relay.transport", error = %err, "mqtt_connection_error");
                        tokio::time::sleep(reconnect_delay).await;
                    }
                }
            }
        });
        TransportHandles { event_loop, worker }
    }
}

/// 启动分发 worker：按到达顺序逐条处理，单条失败不影响后续报文。
pub fn spawn_dispatch_worker(
    mut rx: mpsc::Receiver<InboundMessage>,
    handler: Arc<dyn InboundHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let topic = message.topic.clone();
            if let Err(err) = handler.handle(message).await {
                warn!(target: "relay.transport", topic = %topic, error = %err, "inbound_handler_failed");
            }
        }
        info!(target: "relay.transport", "dispatch_worker_stopped");
    })
}

fn subscribe_all(
    client: &AsyncClient,
    filters: &[String],
    qos: QoS,
) -> Result<(), TransportError> {
    for filter in filters {
        client
            .try_subscribe(filter.clone(), qos)
            .map_err(|err| TransportError::Subscribe(err.to_string()))?;
        info!(target: "relay.transport", filter = %filter, "mqtt_subscribed");
    }
    Ok(())
}

/// 生成 client_id：`<prefix>_<8 位随机十六进制>`，避免 broker 端重复连接互踢。
pub fn client_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &suffix[..8])
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}
