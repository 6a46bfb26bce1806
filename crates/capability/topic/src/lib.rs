//! 主题编解码。
//!
//! 入站主题：`<pub_prefix><imei>`（设备发布，转发服务订阅）；
//! 出站主题：`<sub_prefix><imei>`（转发服务发布，设备订阅）。
//! 前缀来自配置，不在此处写死。

use domain::DeviceClass;
use relay_config::TopicPrefixes;

/// 从入站主题解析出的设备身份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTopic {
    pub class: DeviceClass,
    pub imei: String,
}

/// 主题编解码器。
#[derive(Debug, Clone)]
pub struct TopicCodec {
    prefixes: TopicPrefixes,
}

impl TopicCodec {
    pub fn new(prefixes: TopicPrefixes) -> Self {
        Self { prefixes }
    }

    /// 解析入站主题；前缀不匹配、IMEI 为空或含多级路径时返回 None。
    pub fn parse(&self, topic: &str) -> Option<DeviceTopic> {
        [DeviceClass::Indoor, DeviceClass::Outdoor]
            .into_iter()
            .find_map(|class| {
                let imei = topic.strip_prefix(self.pub_prefix(class))?;
                if imei.is_empty() || imei.contains('/') {
                    return None;
                }
                Some(DeviceTopic {
                    class,
                    imei: imei.to_string(),
                })
            })
    }

    /// 设备发布主题（即转发服务的入站主题）。
    pub fn inbound_topic(&self, class: DeviceClass, imei: &str) -> String {
        format!("{}{}", self.pub_prefix(class), imei)
    }

    /// 设备订阅主题（即转发目标主题）。
    pub fn outbound_topic(&self, class: DeviceClass, imei: &str) -> String {
        format!("{}{}", self.sub_prefix(class), imei)
    }

    /// 需要订阅的主题过滤器：每类设备一个单级通配。
    pub fn subscriptions(&self) -> Vec<String> {
        vec![
            format!("{}+", self.prefixes.indoor_pub),
            format!("{}+", self.prefixes.outdoor_pub),
        ]
    }

    fn pub_prefix(&self, class: DeviceClass) -> &str {
        match class {
            DeviceClass::Indoor => &self.prefixes.indoor_pub,
            DeviceClass::Outdoor => &self.prefixes.outdoor_pub,
        }
    }

    fn sub_prefix(&self, class: DeviceClass) -> &str {
        match class {
            DeviceClass::Indoor => &self.prefixes.indoor_sub,
            DeviceClass::Outdoor => &self.prefixes.outdoor_sub,
        }
    }
}

impl Default for TopicCodec {
    fn default() -> Self {
        Self::new(TopicPrefixes::default())
    }
}
