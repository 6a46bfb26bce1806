//! 追踪初始化、报文 trace_id 与转发计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 转发指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_unmatched: u64,
    pub devices_registered: u64,
    pub devices_back_online: u64,
    pub messages_unbound: u64,
    pub messages_without_targets: u64,
    pub forwards_published: u64,
    pub forward_publish_failures: u64,
    pub alarms_recorded: u64,
    pub audit_write_failures: u64,
    pub handle_latency_ms_total: u64,
    pub handle_latency_ms_count: u64,
}

/// 转发指标（进程内计数，不做重置）。
pub struct TelemetryMetrics {
    messages_received: AtomicU64,
    messages_unmatched: AtomicU64,
    devices_registered: AtomicU64,
    devices_back_online: AtomicU64,
    messages_unbound: AtomicU64,
    messages_without_targets: AtomicU64,
    forwards_published: AtomicU64,
    forward_publish_failures: AtomicU64,
    alarms_recorded: AtomicU64,
    audit_write_failures: AtomicU64,
    handle_latency_ms_total: AtomicU64,
    handle_latency_ms_count: AtomicU64,
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_unmatched: AtomicU64::new(0),
            devices_registered: AtomicU64::new(0),
            devices_back_online: AtomicU64::new(0),
            messages_unbound: AtomicU64::new(0),
            messages_without_targets: AtomicU64::new(0),
            forwards_published: AtomicU64::new(0),
            forward_publish_failures: AtomicU64::new(0),
            alarms_recorded: AtomicU64::new(0),
            audit_write_failures: AtomicU64::new(0),
            handle_latency_ms_total: AtomicU64::new(0),
            handle_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_unmatched: self.messages_unmatched.load(Ordering::Relaxed),
            devices_registered: self.devices_registered.load(Ordering::Relaxed),
            devices_back_online: self.devices_back_online.load(Ordering::Relaxed),
            messages_unbound: self.messages_unbound.load(Ordering::Relaxed),
            messages_without_targets: self.messages_without_targets.load(Ordering::Relaxed),
            forwards_published: self.forwards_published.load(Ordering::Relaxed),
            forward_publish_failures: self.forward_publish_failures.load(Ordering::Relaxed),
            alarms_recorded: self.alarms_recorded.load(Ordering::Relaxed),
            audit_write_failures: self.audit_write_failures.load(Ordering::Relaxed),
            handle_latency_ms_total: self.handle_latency_ms_total.load(Ordering::Relaxed),
            handle_latency_ms_count: self.handle_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 为单条入站报文生成 trace_id。
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录入站报文次数（含未匹配主题）。
pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录主题未匹配而丢弃的次数。
pub fn record_message_unmatched() {
    metrics().messages_unmatched.fetch_add(1, Ordering::Relaxed);
}

/// 记录自动注册设备次数。
pub fn record_device_registered() {
    metrics().devices_registered.fetch_add(1, Ordering::Relaxed);
}

/// 记录离线设备重新上报次数。
pub fn record_device_back_online() {
    metrics().devices_back_online.fetch_add(1, Ordering::Relaxed);
}

/// 记录未绑定加油站而不转发的次数。
pub fn record_message_unbound() {
    metrics().messages_unbound.fetch_add(1, Ordering::Relaxed);
}

/// 记录同站无目标设备的次数。
pub fn record_message_without_targets() {
    metrics()
        .messages_without_targets
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录转发发布成功次数。
pub fn record_forward_published() {
    metrics().forwards_published.fetch_add(1, Ordering::Relaxed);
}

/// 记录转发发布失败次数。
pub fn record_forward_publish_failure() {
    metrics()
        .forward_publish_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录报警日志写入次数。
pub fn record_alarm_recorded() {
    metrics().alarms_recorded.fetch_add(1, Ordering::Relaxed);
}

/// 记录通讯记录/报警记录写入失败次数。
pub fn record_audit_write_failure() {
    metrics().audit_write_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录单条报文处理耗时（毫秒）。
pub fn record_handle_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .handle_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .handle_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
