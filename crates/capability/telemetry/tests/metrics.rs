use relay_telemetry::{
    TelemetryMetrics, metrics, new_trace_id, record_forward_published, record_handle_latency_ms,
};

#[test]
fn trace_ids_are_unique() {
    let a = new_trace_id();
    let b = new_trace_id();
    assert!(!a.is_empty());
    assert_ne!(a, b);
}

#[test]
fn fresh_metrics_start_at_zero() {
    let snapshot = TelemetryMetrics::new().snapshot();
    assert_eq!(snapshot.messages_received, 0);
    assert_eq!(snapshot.forwards_published, 0);
}

#[test]
fn global_counters_accumulate() {
    // 全局计数可能被同进程内其他测试累加，只比较增量下限。
    let before = metrics().snapshot();
    record_forward_published();
    record_handle_latency_ms(7);
    let after = metrics().snapshot();
    assert!(after.forwards_published >= before.forwards_published + 1);
    assert!(after.handle_latency_ms_total >= before.handle_latency_ms_total + 7);
    assert!(after.handle_latency_ms_count >= before.handle_latency_ms_count + 1);
}
