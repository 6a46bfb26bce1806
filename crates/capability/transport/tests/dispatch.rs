use async_trait::async_trait;
use domain::InboundMessage;
use relay_transport::{
    InboundHandler, MessagePublisher, MqttTransport, MqttTransportConfig, TransportError,
    spawn_dispatch_worker,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl InboundHandler for RecordingHandler {
    async fn handle(&self, message: InboundMessage) -> Result<(), TransportError> {
        self.seen
            .lock()
            .expect("lock")
            .push(message.topic.clone());
        if message.topic.ends_with("/fail") {
            return Err(TransportError::Handler("boom".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn worker_processes_in_arrival_order_and_survives_errors() {
    let handler = Arc::new(RecordingHandler::default());
    let (tx, rx) = mpsc::channel(4);
    let worker = spawn_dispatch_worker(rx, handler.clone());
    for topic in ["/a/1", "/a/fail", "/a/2", "/a/3"] {
        tx.send(InboundMessage::new(topic, b"{}".to_vec(), 0))
            .await
            .expect("send");
    }
    drop(tx);
    worker.await.expect("worker");
    let seen = handler.seen.lock().expect("lock").clone();
    assert_eq!(seen, vec!["/a/1", "/a/fail", "/a/2", "/a/3"]);
}

fn config(queue_capacity: usize) -> MqttTransportConfig {
    MqttTransportConfig {
        host: "127.0.0.1".to_string(),
        port: 1883,
        username: None,
        password: None,
        client_id_prefix: "relay_test".to_string(),
        keep_alive_seconds: 60,
        qos: 0,
        subscriptions: vec!["/AIR8000/PUB/+".to_string()],
        queue_capacity,
        reconnect_delay_ms: 10,
    }
}

#[tokio::test]
async fn publish_is_fire_and_forget_and_fails_fast_when_queue_full() {
    // 未启动事件循环：请求只入队，不会阻塞等待 broker
    let (publisher, transport) = MqttTransport::new(config(2));
    assert!(transport.client_id().starts_with("relay_test_"));
    publisher
        .publish("/780EHV/SUB/1", b"payload")
        .await
        .expect("first");
    publisher
        .publish("/780EHV/SUB/2", b"payload")
        .await
        .expect("second");
    let err = publisher
        .publish("/780EHV/SUB/3", b"payload")
        .await
        .expect_err("queue full");
    assert!(matches!(err, TransportError::Publish(_)));
}
