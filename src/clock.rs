use crate::block::Block;
use crate::provider::Provider;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use log::warn;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 默认时间格式
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 时钟，每跨过一个整秒刷新一次
pub struct ClockProvider {
    format: String,
    /// 最近一次渲染的整秒（Unix 时间）
    last_second: Option<u64>,
    block: Block,
}

impl ClockProvider {
    pub const NAME: &'static str = "time";

    /// 使用 strftime 格式创建时钟，格式无效时回退到默认格式
    pub fn new(format: &str, now: SystemTime) -> Self {
        let format = if format.is_empty() {
            DEFAULT_FORMAT
        } else if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            warn!("无效的时间格式 {format:?}，使用默认格式");
            DEFAULT_FORMAT
        } else {
            format
        };

        let mut provider = Self {
            format: format.to_string(),
            last_second: None,
            block: Block::default(),
        };
        provider.maybe_refresh(now);
        provider
    }

    #[cfg(test)]
    fn format(&self) -> &str {
        &self.format
    }
}

impl Provider for ClockProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn maybe_refresh(&mut self, now: SystemTime) -> bool {
        let second = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        if self.last_second == Some(second) {
            return false;
        }
        self.last_second = Some(second);

        let truncated: DateTime<Local> = (UNIX_EPOCH + Duration::from_secs(second)).into();
        let text = truncated.format(&self.format).to_string();
        if text == self.block.full_text {
            return false;
        }

        self.block = Block::new(Self::NAME, text);
        true
    }

    fn current(&self) -> Block {
        self.block.clone()
    }
}
