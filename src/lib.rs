//! swaybar/i3bar 状态栏数据生成器库
//!
//! 按各自的采样间隔读取时钟、CPU 和内存数据，在单个渲染循环中把它们按固定顺序
//! 组合成 i3bar 协议的 JSON 行输出到标准输出。

pub mod bar;
pub mod block;
pub mod clicks;
pub mod clock;
pub mod config;
pub mod cpu;
pub mod memory;
pub mod protocol;
pub mod provider;
pub mod slot;
pub mod stats;
pub mod theme;
pub mod watch;

// 重新导出主要的公共类型
pub use bar::{StatusBar, tick_interval};
pub use block::Block;
pub use clicks::{ClickEvent, ClickHandler};
pub use config::Config;
pub use provider::{Provider, ProviderList, Registry, default_registry};
pub use slot::{ProviderSlot, create_slot};
pub use theme::{Severity, color_for, severity_for};
