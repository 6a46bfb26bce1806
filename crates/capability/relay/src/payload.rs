//! 设备报文的类型化视图。
//!
//! 转发始终使用原始字节；这里只为报警识别与电压刷新提取两个可选字段，
//! 字段缺失与类型不符都落为 `None`，不会产生错误。

use domain::AlarmType;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 报警字段名（室内机上报）。
pub const ALARM_FIELD: &str = "bj";
/// 电池电压字段名（室外机上报）。
pub const BATTERY_FIELD: &str = "vbat";

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default, deserialize_with = "present")]
    bj: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    vbat: Option<Value>,
}

// 与 Option<Value> 默认行为不同：显式的 null 也算"字段存在"
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// 从报文中识别出的字段。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePayload {
    pub alarm: Option<AlarmType>,
    pub battery_voltage: Option<f64>,
}

impl DevicePayload {
    /// 解析报文；不是 JSON 对象时返回 None。
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(raw).ok()?;
        if !value.is_object() {
            return None;
        }
        let raw: RawPayload = serde_json::from_value(value).ok()?;
        Some(Self {
            alarm: raw.bj.as_ref().map(alarm_type),
            battery_voltage: raw.vbat.as_ref().and_then(voltage),
        })
    }
}

/// `1`、`1.0` 或去空白后为整数 1 的字符串视为报警，其余取值视为消警。
fn alarm_type(value: &Value) -> AlarmType {
    let is_alarm = match value {
        Value::Number(number) => number.as_f64() == Some(1.0),
        Value::String(text) => text.trim().parse::<i64>() == Ok(1),
        _ => false,
    };
    if is_alarm {
        AlarmType::Alarm
    } else {
        AlarmType::Cancel
    }
}

fn voltage(value: &Value) -> Option<f64> {
    let voltage = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    voltage.is_finite().then_some(voltage)
}
