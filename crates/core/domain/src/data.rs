use std::fmt;
use std::str::FromStr;

/// 设备类型：室内机（报警控制器）或室外机（声光/传感终端）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Indoor,
    Outdoor,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Indoor => "indoor",
            DeviceClass::Outdoor => "outdoor",
        }
    }

    /// 转发方向上的对端类型（室内 -> 室外，室外 -> 室内）。
    pub fn peer(&self) -> DeviceClass {
        match self {
            DeviceClass::Indoor => DeviceClass::Outdoor,
            DeviceClass::Outdoor => DeviceClass::Indoor,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备类型解析失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDeviceClassError(pub String);

impl fmt::Display for ParseDeviceClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown device class: {}", self.0)
    }
}

impl std::error::Error for ParseDeviceClassError {}

impl FromStr for DeviceClass {
    type Err = ParseDeviceClassError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "indoor" => Ok(DeviceClass::Indoor),
            "outdoor" => Ok(DeviceClass::Outdoor),
            other => Err(ParseDeviceClassError(other.to_string())),
        }
    }
}

/// 通讯记录方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommDirection {
    Receive,
    Forward,
}

impl CommDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommDirection::Receive => "receive",
            CommDirection::Forward => "forward",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "receive" => Some(CommDirection::Receive),
            "forward" => Some(CommDirection::Forward),
            _ => None,
        }
    }
}

/// 报警类型：`bj` 为 1 时报警，其余取值视为消警。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmType {
    Alarm,
    Cancel,
}

impl AlarmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmType::Alarm => "alarm",
            AlarmType::Cancel => "cancel",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "alarm" => Some(AlarmType::Alarm),
            "cancel" => Some(AlarmType::Cancel),
            _ => None,
        }
    }
}

/// 传输层收到的原始报文。
///
/// payload 保持原样，转发时不做任何改写。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at_ms: i64,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, received_at_ms: i64) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at_ms,
        }
    }
}
