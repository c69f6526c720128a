use crate::block::Block;
use crate::config::{MemFormat, MemoryModule};
use crate::provider::{Provider, clamp_interval, format_percent, is_due};
use crate::stats::{MemoryUsage, PROC_MEMINFO, ProcFile, StatSource, parse_meminfo};
use crate::theme::Thresholds;
use log::debug;
use std::time::{Duration, SystemTime};

/// 内存占用，基于 `/proc/meminfo`
pub struct MemoryProvider {
    source: Box<dyn StatSource>,
    interval: Duration,
    thresholds: Thresholds,
    precision: u8,
    prefix: String,
    format: MemFormat,
    /// 上次尝试采样的时间，无论成功与否
    last_sample: Option<SystemTime>,
    /// 上一次成功采样的显示文本
    last_text: Option<String>,
    block: Block,
}

impl MemoryProvider {
    pub const NAME: &'static str = "mem";
    pub const ERROR_TEXT: &'static str = "mem err";

    const DEFAULT_INTERVAL_SECS: u64 = 5;
    const MIN_INTERVAL_SECS: u64 = 1;
    const MAX_INTERVAL_SECS: u64 = 60;

    /// 从 `/proc/meminfo` 读取数据
    pub fn new(config: &MemoryModule, now: SystemTime) -> Self {
        Self::with_source(config, Box::new(ProcFile::new(PROC_MEMINFO)), now)
    }

    /// 使用指定数据来源，构建时立即采样一次
    pub fn with_source(
        config: &MemoryModule,
        source: Box<dyn StatSource>,
        now: SystemTime,
    ) -> Self {
        let prefix = if config.prefix.is_empty() {
            "MEM".to_string()
        } else {
            config.prefix.clone()
        };

        let mut provider = Self {
            source,
            interval: clamp_interval(
                config.interval_sec,
                Self::DEFAULT_INTERVAL_SECS,
                Self::MIN_INTERVAL_SECS,
                Self::MAX_INTERVAL_SECS,
            ),
            thresholds: Thresholds::new(config.warn_percent, config.danger_percent),
            precision: config.precision.clamp(0, 1) as u8,
            prefix,
            format: config.format_mode(),
            last_sample: None,
            last_text: None,
            block: Block::default(),
        };
        provider.sample(now);
        provider
    }

    #[cfg(test)]
    fn interval(&self) -> Duration {
        self.interval
    }

    fn sample(&mut self, now: SystemTime) -> bool {
        self.last_sample = Some(now);

        let usage = match self.source.read().and_then(|content| parse_meminfo(&content)) {
            Ok(usage) => usage,
            Err(e) => {
                debug!("内存采样失败: {e}");
                if self.block.full_text.is_empty() {
                    self.block = Block::error(Self::NAME, Self::ERROR_TEXT);
                }
                return false;
            }
        };

        let percent = usage.percent_used();

        let text = self.render_text(&usage, percent);
        if self.last_text.as_deref() == Some(text.as_str()) {
            return false;
        }

        self.block = Block::new(Self::NAME, text.clone())
            .with_severity(self.thresholds.severity(percent));
        self.last_text = Some(text);
        true
    }

    fn render_text(&self, usage: &MemoryUsage, percent: f64) -> String {
        match self.format {
            MemFormat::Percent => {
                format!("{} {}", self.prefix, format_percent(percent, self.precision))
            }
            MemFormat::Available => {
                format!("{} {} free", self.prefix, human_bytes(usage.available))
            }
            MemFormat::Used => format!("{} {} used", self.prefix, human_bytes(usage.used)),
        }
    }
}

impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn maybe_refresh(&mut self, now: SystemTime) -> bool {
        if !is_due(self.last_sample, now, self.interval) {
            return false;
        }
        self.sample(now)
    }

    fn current(&self) -> Block {
        self.block.clone()
    }
}

/// 以 1024 为进制格式化字节数
///
/// 选择使数值不小于 1 的最大单位，数值小于 10 时保留一位小数，例如 `7.3GiB`、`128MiB`。
pub fn human_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 5] = ['K', 'M', 'G', 'T', 'P'];

    if bytes < UNIT {
        return format!("{bytes}B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < PREFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let value = bytes as f64 / div as f64;
    if value < 10.0 {
        format!("{value:.1}{}iB", PREFIXES[exp])
    } else {
        format!("{value:.0}{}iB", PREFIXES[exp])
    }
}
