use crate::block::Block;
use crate::config::CpuModule;
use crate::provider::{Provider, clamp_interval, format_percent, is_due};
use crate::stats::{CpuTimes, PROC_STAT, ProcFile, StatSource, parse_cpu_times};
use crate::theme::Thresholds;
use log::{debug, warn};
use std::time::{Duration, SystemTime};

/// 汇总 CPU 使用率，基于 `/proc/stat` 的增量计算
pub struct CpuProvider {
    source: Box<dyn StatSource>,
    interval: Duration,
    thresholds: Thresholds,
    precision: u8,
    prefix: String,
    /// 上次尝试采样的时间，无论成功与否
    last_sample: Option<SystemTime>,
    /// 上一次成功采样的计数器
    prev: Option<CpuTimes>,
    last_percent: f64,
    /// 上一次成功采样格式化后的百分比
    last_formatted: Option<String>,
    block: Block,
}

impl CpuProvider {
    pub const NAME: &'static str = "cpu";
    pub const ERROR_TEXT: &'static str = "cpu err";

    const DEFAULT_INTERVAL_SECS: u64 = 2;
    const MIN_INTERVAL_SECS: u64 = 2;
    const MAX_INTERVAL_SECS: u64 = 30;

    /// 从 `/proc/stat` 读取数据
    pub fn new(config: &CpuModule, now: SystemTime) -> Self {
        Self::with_source(config, Box::new(ProcFile::new(PROC_STAT)), now)
    }

    /// 使用指定数据来源，构建时立即采样一次作为基线（显示 0%）
    pub fn with_source(config: &CpuModule, source: Box<dyn StatSource>, now: SystemTime) -> Self {
        let prefix = if config.prefix.is_empty() {
            "CPU".to_string()
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
            last_sample: None,
            prev: None,
            last_percent: 0.0,
            last_formatted: None,
            block: Block::default(),
        };
        provider.sample(now);
        provider
    }

    #[cfg(test)]
    fn interval(&self) -> Duration {
        self.interval
    }

    /// 最近一次计算出的使用率
    #[cfg(test)]
    fn last_percent(&self) -> f64 {
        self.last_percent
    }

    fn sample(&mut self, now: SystemTime) -> bool {
        self.last_sample = Some(now);

        let times = match self.source.read().and_then(|content| parse_cpu_times(&content)) {
            Ok(times) => times,
            Err(e) => {
                debug!("CPU 采样失败: {e}");
                // 保留上一次的显示块，从未成功过则显示错误占位
                if self.block.full_text.is_empty() {
                    self.block = Block::error(Self::NAME, Self::ERROR_TEXT);
                }
                return false;
            }
        };

        let percent = match self.prev.replace(times) {
            // 第一次采样没有增量可用
            None => 0.0,
            Some(prev) => usage_between(&prev, &times).unwrap_or(self.last_percent),
        };
        self.last_percent = percent;

        let formatted = format_percent(percent, self.precision);
        if self.last_formatted.as_deref() == Some(formatted.as_str()) {
            return false;
        }

        self.block = Block::new(Self::NAME, format!("{} {}", self.prefix, formatted))
            .with_severity(self.thresholds.severity(percent));
        self.last_formatted = Some(formatted);
        true
    }
}

impl Provider for CpuProvider {
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

/// 两次快照之间的 CPU 使用率 (0-100)
///
/// 总时间增量为 0 时返回 `None`。计数器回退（重启或溢出）时增量按 0 处理。
pub fn usage_between(prev: &CpuTimes, current: &CpuTimes) -> Option<f64> {
    if current.total() < prev.total() || current.idle_all() < prev.idle_all() {
        warn!("CPU 计数器回退，增量按 0 处理");
    }

    let total_diff = current.total().saturating_sub(prev.total());
    let idle_diff = current.idle_all().saturating_sub(prev.idle_all());
    if total_diff == 0 {
        return None;
    }

    // 先乘后除，恰好为 .5 的比例才能按四舍五入向上取整
    let busy = total_diff.saturating_sub(idle_diff) as f64;
    Some((busy * 100.0 / total_diff as f64).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ScriptedSource;

    fn stat_line(busy: u64, idle: u64) -> String {
        // user nice system idle iowait irq softirq steal
        format!("cpu  {busy} 0 0 {idle} 0 0 0 0 0 0\n")
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn provider(config: &CpuModule, reads: Vec<Option<String>>) -> CpuProvider {
        CpuProvider::with_source(config, Box::new(ScriptedSource::new(reads)), at(0))
    }

    #[test]
    fn test_first_sample_is_zero() {
        let p = provider(&CpuModule::default(), vec![Some(stat_line(900, 100))]);
        assert_eq!(p.current().full_text, "CPU 0%");
        assert_eq!(p.current().name, "cpu");
        assert!(p.current().color.is_none());
    }

    #[test]
    fn test_delta_percentage() {
        let p = &mut provider(
            &CpuModule::default(),
            vec![Some(stat_line(100, 100)), Some(stat_line(125, 175))],
        );
        // Δtotal = 100, Δidle = 75
        assert!(p.maybe_refresh(at(2)));
        assert_eq!(p.current().full_text, "CPU 25%");
        assert!((p.last_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_delta_uses_all_counter_fields() {
        let prev = CpuTimes {
            user: 10,
            nice: 10,
            system: 10,
            idle: 50,
            iowait: 10,
            irq: 0,
            softirq: 5,
            steal: 5,
        };
        let current = CpuTimes {
            user: 30,
            nice: 10,
            system: 30,
            idle: 90,
            iowait: 20,
            irq: 5,
            softirq: 10,
            steal: 5,
        };
        // Δtotal = 100, ΔidleAll = 50
        let percent = usage_between(&prev, &current).unwrap();
        assert!((percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_half_rounds_up() {
        // Δbusy = 23, Δtotal = 40 -> 57.5%
        let p = &mut provider(
            &CpuModule::default(),
            vec![Some(stat_line(0, 0)), Some(stat_line(23, 17))],
        );
        assert!(p.maybe_refresh(at(2)));
        assert_eq!(p.last_percent(), 57.5);
        assert_eq!(p.current().full_text, "CPU 58%");

        // Δbusy = 23, Δtotal = 80 -> 28.75%
        let precise = CpuModule {
            precision: 1,
            ..Default::default()
        };
        let p = &mut provider(&precise, vec![Some(stat_line(0, 0)), Some(stat_line(23, 57))]);
        assert!(p.maybe_refresh(at(2)));
        assert_eq!(p.current().full_text, "CPU 28.8%");
    }

    #[test]
    fn test_refresh_within_interval_is_noop() {
        let p = &mut provider(
            &CpuModule::default(),
            vec![Some(stat_line(100, 100)), Some(stat_line(150, 150))],
        );
        assert!(p.maybe_refresh(at(2)));
        assert!(!p.maybe_refresh(at(3)));
        assert_eq!(p.current().full_text, "CPU 50%");
    }

    #[test]
    fn test_unchanged_formatted_value_reports_no_change() {
        let p = &mut provider(
            &CpuModule::default(),
            vec![
                Some(stat_line(100, 100)),
                Some(stat_line(200, 200)),
                Some(stat_line(300, 300)),
            ],
        );
        assert!(p.maybe_refresh(at(2)));
        assert!(!p.maybe_refresh(at(4)));
        assert_eq!(p.current().full_text, "CPU 50%");
    }

    #[test]
    fn test_zero_total_delta_reuses_last_percent() {
        let p = &mut provider(
            &CpuModule::default(),
            vec![
                Some(stat_line(100, 100)),
                Some(stat_line(140, 160)),
                Some(stat_line(140, 160)),
            ],
        );
        assert!(p.maybe_refresh(at(2)));
        assert_eq!(p.current().full_text, "CPU 40%");
        assert!(!p.maybe_refresh(at(4)));
        assert!((p.last_percent() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_counter_wraparound_is_clamped() {
        let prev = CpuTimes {
            user: 500,
            idle: 500,
            ..Default::default()
        };
        let current = CpuTimes {
            user: 10,
            idle: 10,
            ..Default::default()
        };
        assert_eq!(usage_between(&prev, &current), None);

        // 只有空闲计数器回退
        let current = CpuTimes {
            user: 1_000,
            idle: 400,
            ..Default::default()
        };
        assert_eq!(usage_between(&prev, &current), Some(100.0));
    }

    #[test]
    fn test_precision_and_severity() {
        let config = CpuModule {
            precision: 1,
            warn_percent: 20,
            danger_percent: 30,
            prefix: "".to_string(),
            ..Default::default()
        };
        let p = &mut provider(
            &config,
            vec![Some(stat_line(0, 0)), Some(stat_line(1, 3)), Some(stat_line(4, 3))],
        );
        assert!(p.maybe_refresh(at(2)));
        assert_eq!(p.current().full_text, "CPU 25.0%");
        assert_eq!(p.current().color.as_deref(), Some("#d08770"));

        assert!(p.maybe_refresh(at(4)));
        assert_eq!(p.current().full_text, "CPU 100.0%");
        assert_eq!(p.current().color.as_deref(), Some("#bf616a"));
    }

    #[test]
    fn test_first_failure_shows_error_block() {
        let p = &mut provider(&CpuModule::default(), vec![None]);
        let block = p.current();
        assert_eq!(block.full_text, CpuProvider::ERROR_TEXT);
        assert_eq!(block.color.as_deref(), Some("#bf616a"));

        // 失败也会推进采样时间
        assert!(!p.maybe_refresh(at(1)));
    }

    #[test]
    fn test_failure_keeps_last_good_block() {
        let p = &mut provider(
            &CpuModule::default(),
            vec![Some(stat_line(100, 100)), Some(stat_line(130, 170)), None],
        );
        assert!(p.maybe_refresh(at(2)));
        assert!(!p.maybe_refresh(at(4)));
        assert_eq!(p.current().full_text, "CPU 30%");
    }

    #[test]
    fn test_recovery_after_initial_failure() {
        let p = &mut provider(
            &CpuModule::default(),
            vec![None, Some(stat_line(100, 100)), Some(stat_line(110, 190))],
        );
        assert_eq!(p.current().full_text, "cpu err");
        // 第一次成功采样显示 0%
        assert!(p.maybe_refresh(at(2)));
        assert_eq!(p.current().full_text, "CPU 0%");
        assert!(p.current().color.is_none());
        assert!(p.maybe_refresh(at(4)));
        assert_eq!(p.current().full_text, "CPU 10%");
    }

    #[test]
    fn test_interval_is_clamped() {
        let short = CpuModule {
            interval_sec: 1,
            ..Default::default()
        };
        assert_eq!(provider(&short, vec![]).interval(), Duration::from_secs(2));

        let long = CpuModule {
            interval_sec: 120,
            ..Default::default()
        };
        assert_eq!(provider(&long, vec![]).interval(), Duration::from_secs(30));
    }
}
