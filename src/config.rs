//! 配置加载
//!
//! 配置文件为 TOML 格式，文件中的值覆盖内置默认值。`[modules.*]` 表在文件中
//! 出现的顺序决定模块的显示顺序。

use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 应用目录名
const APP_DIR: &str = "swaystats";
/// 配置文件名
const CONFIG_FILE: &str = "config.toml";

/// 配置快照
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每秒刷新次数 (1-20)
    pub tick_hz: i64,
    pub modules: Modules,
    /// `[modules.*]` 表在配置文件中出现的顺序
    #[serde(skip)]
    module_order: Vec<String>,
    /// 加载配置的文件路径，使用默认值时为空
    #[serde(skip)]
    source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Modules {
    pub time: TimeModule,
    pub cpu: CpuModule,
    pub mem: MemoryModule,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeModule {
    pub enabled: bool,
    /// strftime 格式
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CpuModule {
    pub enabled: bool,
    /// 采样间隔秒数（默认 2）
    pub interval_sec: i64,
    /// 警告阈值（默认 70）
    pub warn_percent: i64,
    /// 危险阈值（默认 90）
    pub danger_percent: i64,
    /// 小数位数 (0 或 1)
    pub precision: i64,
    /// 百分比前的文本或图标（默认 "CPU"）
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryModule {
    pub enabled: bool,
    /// 采样间隔秒数（默认 5）
    pub interval_sec: i64,
    pub warn_percent: i64,
    pub danger_percent: i64,
    /// 百分比格式的小数位数 (0 或 1)
    pub precision: i64,
    /// 默认 "MEM"
    pub prefix: String,
    /// percent、available 或 used
    pub format: String,
}

/// 内存模块显示格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemFormat {
    #[default]
    Percent,
    Available,
    Used,
}

impl MemFormat {
    /// 解析格式名（忽略大小写），未知格式返回 `None`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "percent" => Some(MemFormat::Percent),
            "available" => Some(MemFormat::Available),
            "used" => Some(MemFormat::Used),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemFormat::Percent => "percent",
            MemFormat::Available => "available",
            MemFormat::Used => "used",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: 1,
            modules: Modules::default(),
            module_order: Vec::new(),
            source_path: None,
        }
    }
}

impl Default for TimeModule {
    fn default() -> Self {
        Self {
            enabled: true,
            format: crate::clock::DEFAULT_FORMAT.to_string(),
        }
    }
}

impl Default for CpuModule {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_sec: 2,
            warn_percent: 70,
            danger_percent: 90,
            precision: 0,
            prefix: "CPU".to_string(),
        }
    }
}

impl Default for MemoryModule {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_sec: 5,
            warn_percent: 70,
            danger_percent: 90,
            precision: 0,
            prefix: "MEM".to_string(),
            format: MemFormat::Percent.as_str().to_string(),
        }
    }
}

impl MemoryModule {
    /// 规范化后的显示格式
    #[inline]
    pub fn format_mode(&self) -> MemFormat {
        MemFormat::from_name(&self.format).unwrap_or_default()
    }
}

/// 配置加载错误类型
#[derive(Debug)]
pub enum ConfigError {
    NotFound,
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound => write!(f, "未找到配置文件，使用默认配置"),
            ConfigError::IoError { path, source } => {
                write!(f, "读取配置 {} 失败: {source}", path.display())
            }
            ConfigError::ParseError(e) => write!(f, "解析配置失败: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NotFound => None,
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError(e) => Some(e),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    #[inline]
    fn from(error: toml::de::Error) -> Self {
        ConfigError::ParseError(error)
    }
}

impl Config {
    /// 加载配置
    ///
    /// 优先使用给定路径，否则依次查找搜索路径中第一个存在的文件。
    /// 找不到文件或解析失败时返回错误，由调用方决定是否回退到默认值。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let chosen = Self::locate(path).ok_or(ConfigError::NotFound)?;

        let content = std::fs::read_to_string(&chosen).map_err(|source| ConfigError::IoError {
            path: chosen.clone(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.source_path = Some(chosen);
        Ok(config)
    }

    /// 加载配置，失败时回退到默认值
    ///
    /// 找到了配置文件但读取或解析失败时仍然记录该路径，修正文件后可以热重载。
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(chosen) = Self::locate(path) else {
            info!("{}", ConfigError::NotFound);
            return Self::default();
        };

        match Self::load(Some(&chosen)) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}，使用默认配置");
                Self {
                    source_path: Some(chosen),
                    ..Self::default()
                }
            }
        }
    }

    /// 配置文件位置：给定路径优先，否则为搜索路径中第一个存在的文件
    pub fn locate(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(path) => Some(path.to_path_buf()),
            None => search_paths().into_iter().find(|p| p.exists()),
        }
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;

        // 启用 preserve_order 后表的键保持文件中的顺序
        let table: toml::Table = toml::from_str(content)?;
        if let Some(modules) = table.get("modules").and_then(toml::Value::as_table) {
            config.module_order = modules.keys().cloned().collect();
        }

        config.normalize();
        Ok(config)
    }

    /// 配置文件声明的模块顺序，可能为空
    #[inline]
    pub fn module_order(&self) -> &[String] {
        &self.module_order
    }

    /// 配置来源文件
    #[inline]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// 设置模块顺序
    pub fn with_module_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_order = order.into_iter().map(Into::into).collect();
        self
    }

    /// 解码后校验并钳制配置值
    fn normalize(&mut self) {
        self.tick_hz = clamp_or(self.tick_hz, 1, 20, 1);

        let cpu = &mut self.modules.cpu;
        if cpu.interval_sec <= 0 {
            cpu.interval_sec = 2;
        }
        cpu.precision = clamp_or(cpu.precision, 0, 1, 0);

        let mem = &mut self.modules.mem;
        if mem.interval_sec <= 0 {
            mem.interval_sec = 5;
        }
        mem.precision = clamp_or(mem.precision, 0, 1, 0);
        mem.format = mem.format_mode().as_str().to_string();
    }
}

/// 零值使用回退值，然后钳制到 [min, max]
fn clamp_or(value: i64, min: i64, max: i64, fallback: i64) -> i64 {
    let value = if value == 0 { fallback } else { value };
    value.clamp(min, max)
}

/// 配置文件搜索路径
fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(xdg).join(APP_DIR).join(CONFIG_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join(APP_DIR).join(CONFIG_FILE));
    }
    paths
}
