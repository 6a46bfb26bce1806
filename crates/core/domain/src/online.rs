//! 设备在线状态判定。
//!
//! 转发核心只记录 last_seen；是否在线由管理面按阈值即时计算。

/// 在线状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnlineStatus {
    Online,
    Offline,
}

impl OnlineStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, OnlineStatus::Online)
    }
}

/// 根据最后在线时间判定在线状态。
///
/// last_seen 必须严格晚于 `now_ms - offline_after_ms` 才算在线；从未上报视为离线。
pub fn online_status(
    last_seen_at_ms: Option<i64>,
    now_ms: i64,
    offline_after_ms: i64,
) -> OnlineStatus {
    let threshold = now_ms.saturating_sub(offline_after_ms.max(0));
    match last_seen_at_ms {
        Some(last_seen) if last_seen > threshold => OnlineStatus::Online,
        _ => OnlineStatus::Offline,
    }
}
