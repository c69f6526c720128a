//! 数据提供者与注册表
//!
//! 每个提供者负责一个显示块：自行决定何时采样，并保留最近一次的显示结果。
//! 注册表按名称保存提供者的构建方式，根据配置生成有序的提供者列表。

use crate::block::Block;
use crate::clock::ClockProvider;
use crate::config::Config;
use crate::cpu::CpuProvider;
use crate::memory::MemoryProvider;
use std::time::{Duration, SystemTime};

/// 数据提供者
pub trait Provider: Send {
    /// 提供者名称，即显示块的 name
    fn name(&self) -> &str;

    /// 到达采样时间时刷新数据，显示内容发生变化时返回 true
    fn maybe_refresh(&mut self, now: SystemTime) -> bool;

    /// 当前显示块
    fn current(&self) -> Block;
}

pub type BoxedProvider = Box<dyn Provider>;

/// 有序的提供者列表
pub type ProviderList = Vec<BoxedProvider>;

/// 提供者的启用条件与构建方式
#[derive(Clone, Copy)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub enabled: fn(&Config) -> bool,
    pub build: fn(&Config, SystemTime) -> BoxedProvider,
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// 提供者注册表，保留首次注册的顺序
#[derive(Debug, Default, Clone)]
pub struct Registry {
    specs: Vec<ProviderSpec>,
}

impl Registry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册提供者；同名重复注册会替换构建方式，但保留原来的位置
    pub fn register(&mut self, spec: ProviderSpec) {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    /// 已注册的名称，按注册顺序
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|s| s.name)
    }

    #[inline]
    fn get(&self, name: &str) -> Option<&ProviderSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// 根据配置构建提供者列表
    ///
    /// 配置声明了模块顺序时，只构建其中已启用且已注册的模块，按声明顺序排列，
    /// 未知名称直接跳过；未声明顺序时按注册顺序构建全部已启用的模块。
    pub fn build(&self, config: &Config, now: SystemTime) -> ProviderList {
        let order = config.module_order();
        let specs: Vec<&ProviderSpec> = if order.is_empty() {
            self.specs.iter().collect()
        } else {
            order
                .iter()
                .filter_map(|name| {
                    let spec = self.get(name);
                    if spec.is_none() {
                        log::debug!("配置中的模块 {name} 未注册，已跳过");
                    }
                    spec
                })
                .collect()
        };

        specs
            .into_iter()
            .filter(|spec| (spec.enabled)(config))
            .map(|spec| (spec.build)(config, now))
            .collect()
    }
}

/// 内置提供者注册表：cpu、mem、time
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(ProviderSpec {
        name: CpuProvider::NAME,
        enabled: |config| config.modules.cpu.enabled,
        build: build_cpu,
    });
    registry.register(ProviderSpec {
        name: MemoryProvider::NAME,
        enabled: |config| config.modules.mem.enabled,
        build: build_memory,
    });
    registry.register(ProviderSpec {
        name: ClockProvider::NAME,
        enabled: |config| config.modules.time.enabled,
        build: build_clock,
    });
    registry
}

fn build_cpu(config: &Config, now: SystemTime) -> BoxedProvider {
    Box::new(CpuProvider::new(&config.modules.cpu, now))
}

fn build_memory(config: &Config, now: SystemTime) -> BoxedProvider {
    Box::new(MemoryProvider::new(&config.modules.mem, now))
}

fn build_clock(config: &Config, now: SystemTime) -> BoxedProvider {
    Box::new(ClockProvider::new(&config.modules.time.format, now))
}

/// 秒数配置转换为采样间隔，并钳制到 [min, max] 秒
///
/// 非正数使用默认值。
pub fn clamp_interval(seconds: i64, default: u64, min: u64, max: u64) -> Duration {
    let seconds = if seconds <= 0 { default } else { seconds as u64 };
    Duration::from_secs(seconds.clamp(min, max))
}

/// 距上次尝试采样是否已经过了一个采样间隔
///
/// 从未采样过，或系统时钟回拨时视为已到期。
pub fn is_due(last: Option<SystemTime>, now: SystemTime, interval: Duration) -> bool {
    match last {
        None => true,
        Some(last) => match now.duration_since(last) {
            Ok(elapsed) => elapsed >= interval,
            Err(_) => true,
        },
    }
}

/// 按精度格式化百分比，四舍五入（0.5 向上）
///
/// 精度只支持 0 或 1 位小数。
pub fn format_percent(percent: f64, precision: u8) -> String {
    if precision == 0 {
        format!("{}%", (percent + 0.5).floor() as i64)
    } else {
        let rounded = (percent * 10.0 + 0.5).floor() / 10.0;
        format!("{rounded:.1}%")
    }
}
