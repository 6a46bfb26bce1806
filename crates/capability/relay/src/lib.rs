//! 转发引擎：每条入站报文一次处理。
//!
//! 处理顺序：
//! 1. 解析主题（不匹配直接丢弃，不落库）
//! 2. 登记设备并刷新最后在线时间（室外机同时刷新电池电压）
//! 3. 写入接收记录
//! 4. 查找同站对端设备（室内机 -> 全部室外机，室外机 -> 第一台室内机）
//! 5. 原样转发报文，逐条写入转发记录
//! 6. 室内机报文携带 `bj` 字段时追加报警记录
//!
//! 审计写入失败只记日志和计数，不中断转发。

pub mod payload;

pub use payload::{ALARM_FIELD, BATTERY_FIELD, DevicePayload};

use async_trait::async_trait;
use domain::{AlarmType, CommDirection, DeviceClass, InboundMessage};
use relay_registry::{DeviceRegistry, RegistryError};
use relay_storage::{
    AlarmRecord, AuditLogStore, CommLogRecord, DeviceRecord, DeviceStore, StorageError,
};
use relay_telemetry::{
    new_trace_id, record_alarm_recorded, record_audit_write_failure, record_device_back_online,
    record_forward_published,
    record_forward_publish_failure, record_handle_latency_ms, record_message_received,
    record_message_unbound, record_message_unmatched, record_message_without_targets,
};
use relay_topic::{DeviceTopic, TopicCodec};
use relay_transport::{InboundHandler, MessagePublisher, TransportError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// 转发引擎错误（仅登记/存储读取失败时返回，审计写入失败不算错误）。
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for RelayError {
    fn from(err: StorageError) -> Self {
        RelayError::Storage(err.to_string())
    }
}

/// 一次转发的结果摘要。
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardSummary {
    pub station_id: i64,
    pub source_imei: String,
    /// 发布成功的目标 IMEI（按转发顺序）
    pub delivered: Vec<String>,
    /// 发布失败的目标 IMEI
    pub failed: Vec<String>,
    pub alarm: Option<AlarmType>,
}

/// 单条报文的处理结果。
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// 主题不属于任何已知前缀
    Unmatched,
    /// 源设备未绑定加油站
    Unbound { imei: String },
    /// 同站没有对端设备
    NoTargets { imei: String, station_id: i64 },
    Forwarded(ForwardSummary),
}

pub struct RelayEngine {
    codec: TopicCodec,
    registry: DeviceRegistry,
    device_store: Arc<dyn DeviceStore>,
    audit_store: Arc<dyn AuditLogStore>,
    publisher: Arc<dyn MessagePublisher>,
    offline_after_ms: Option<i64>,
}

impl RelayEngine {
    pub fn new(
        codec: TopicCodec,
        registry: DeviceRegistry,
        audit_store: Arc<dyn AuditLogStore>,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Self {
        let device_store = registry.device_store().clone();
        Self {
            codec,
            registry,
            device_store,
            audit_store,
            publisher,
            offline_after_ms: None,
        }
    }

    /// 设置离线阈值：设备静默超过该时长后再次上报时记录 `device_back_online`。
    pub fn with_offline_after_ms(mut self, offline_after_ms: i64) -> Self {
        self.offline_after_ms = Some(offline_after_ms);
        self
    }

    /// 处理一条入站报文。
    pub async fn relay(&self, message: InboundMessage) -> Result<RelayOutcome, RelayError> {
        record_message_received();
        let Some(source) = self.codec.parse(&message.topic) else {
            record_message_unmatched();
            debug!(target: "relay.engine", topic = %message.topic, "topic_unmatched");
            return Ok(RelayOutcome::Unmatched);
        };

        let payload = DevicePayload::parse(&message.payload);
        let received_at_ms = message.received_at_ms;
        let device = self
            .touch_source(&source, payload.as_ref(), received_at_ms)
            .await?;
        info!(
            target: "relay.engine",
            imei = %source.imei,
            device_class = %source.class,
            payload_size = message.payload.len(),
            structured = payload.is_some(),
            "message_received"
        );

        let receive = CommLogRecord {
            log_id: new_record_id(),
            direction: CommDirection::Receive,
            source_class: source.class,
            source_imei: source.imei.clone(),
            target_class: None,
            target_imei: None,
            topic: message.topic.clone(),
            payload: message.payload.clone(),
            station_id: device.station_id,
            created_at_ms: received_at_ms,
        };
        if let Err(err) = self.audit_store.append_comm_log(receive).await {
            record_audit_write_failure();
            warn!(target: "relay.engine", imei = %source.imei, error = %err, "receive_log_write_failed");
        }

        let Some(station_id) = device.station_id else {
            record_message_unbound();
            info!(target: "relay.engine", imei = %source.imei, "device_unbound_skipped");
            return Ok(RelayOutcome::Unbound { imei: source.imei });
        };

        let targets = self.targets(station_id, source.class).await?;
        if targets.is_empty() {
            record_message_without_targets();
            info!(
                target: "relay.engine",
                imei = %source.imei,
                station_id = station_id,
                "no_forward_targets"
            );
            return Ok(RelayOutcome::NoTargets {
                imei: source.imei,
                station_id,
            });
        }

        let mut forwards = Vec::with_capacity(targets.len());
        let mut delivered = Vec::with_capacity(targets.len());
        let mut failed = Vec::new();
        for target in targets {
            let topic = self.codec.outbound_topic(target.class, &target.imei);
            match self.publisher.publish(&topic, &message.payload).await {
                Ok(()) => {
                    record_forward_published();
                    info!(
                        target: "relay.engine",
                        source_imei = %source.imei,
                        target_imei = %target.imei,
                        topic = %topic,
                        "forward_published"
                    );
                    forwards.push(CommLogRecord {
                        log_id: new_record_id(),
                        direction: CommDirection::Forward,
                        source_class: source.class,
                        source_imei: source.imei.clone(),
                        target_class: Some(target.class),
                        target_imei: Some(target.imei.clone()),
                        topic,
                        payload: message.payload.clone(),
                        station_id: Some(station_id),
                        created_at_ms: domain::now_epoch_ms(),
                    });
                    delivered.push(target.imei);
                }
                Err(err) => {
                    record_forward_publish_failure();
                    warn!(
                        target: "relay.engine",
                        source_imei = %source.imei,
                        target_imei = %target.imei,
                        topic = %topic,
                        error = %err,
                        "forward_publish_failed"
                    );
                    failed.push(target.imei);
                }
            }
        }

        // 报警只由室内机产生
        let alarm_type = match source.class {
            DeviceClass::Indoor => payload.and_then(|payload| payload.alarm),
            DeviceClass::Outdoor => None,
        };
        let alarm = alarm_type.map(|alarm_type| AlarmRecord {
            alarm_id: new_record_id(),
            station_id,
            indoor_imei: source.imei.clone(),
            alarm_type,
            outdoor_imeis: delivered.clone(),
            forward_ok: failed.is_empty(),
            created_at_ms: domain::now_epoch_ms(),
        });

        match self.audit_store.append_forwards(forwards, alarm).await {
            Ok(()) => {
                if let Some(alarm_type) = alarm_type {
                    record_alarm_recorded();
                    info!(
                        target: "relay.engine",
                        station_id = station_id,
                        indoor_imei = %source.imei,
                        alarm_type = alarm_type.as_str(),
                        forward_ok = failed.is_empty(),
                        "alarm_recorded"
                    );
                }
            }
            Err(err) => {
                record_audit_write_failure();
                warn!(
                    target: "relay.engine",
                    imei = %source.imei,
                    station_id = station_id,
                    error = %err,
                    "forward_log_write_failed"
                );
            }
        }

        Ok(RelayOutcome::Forwarded(ForwardSummary {
            station_id,
            source_imei: source.imei,
            delivered,
            failed,
            alarm: alarm_type,
        }))
    }

    async fn touch_source(
        &self,
        source: &DeviceTopic,
        payload: Option<&DevicePayload>,
        seen_at_ms: i64,
    ) -> Result<DeviceRecord, RelayError> {
        let device = self
            .registry
            .resolve_or_register(&source.imei, source.class)
            .await?;
        if device.class != source.class {
            // 库中类型不被覆盖，但路由与电压刷新按主题类型进行：
            // 已登记为室内机的设备在室外机前缀上报时，会以自己为"同站室内机"收到回显，
            // 且 vbat 写入该室内机记录
            warn!(
                target: "relay.engine",
                imei = %source.imei,
                stored_class = %device.class,
                observed_class = %source.class,
                "device_class_mismatch"
            );
        }
        let battery_voltage = match source.class {
            DeviceClass::Outdoor => payload.and_then(|payload| payload.battery_voltage),
            DeviceClass::Indoor => None,
        };
        if let Some(offline_after_ms) = self.offline_after_ms {
            if device.last_seen_at_ms.is_some()
                && !device.online_status(seen_at_ms, offline_after_ms).is_online()
            {
                record_device_back_online();
                info!(
                    target: "relay.engine",
                    imei = %source.imei,
                    last_seen_at_ms = ?device.last_seen_at_ms,
                    "device_back_online"
                );
            }
        }
        let touched = self
            .device_store
            .touch_device(&source.imei, seen_at_ms, battery_voltage)
            .await?;
        Ok(touched.unwrap_or(device))
    }

    async fn targets(
        &self,
        station_id: i64,
        source_class: DeviceClass,
    ) -> Result<Vec<DeviceRecord>, RelayError> {
        let mut targets = self
            .device_store
            .list_station_devices(station_id, source_class.peer())
            .await?;
        if source_class == DeviceClass::Outdoor {
            targets.truncate(1);
        }
        Ok(targets)
    }
}

#[async_trait]
impl InboundHandler for RelayEngine {
    async fn handle(&self, message: InboundMessage) -> Result<(), TransportError> {
        let span = info_span!(
            "relay_message",
            trace_id = %new_trace_id(),
            topic = %message.topic
        );
        let started_at = Instant::now();
        let result = self.relay(message).instrument(span).await;
        record_handle_latency_ms(started_at.elapsed().as_millis() as u64);
        result
            .map(|_| ())
            .map_err(|err| TransportError::Handler(err.to_string()))
    }
}

fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
