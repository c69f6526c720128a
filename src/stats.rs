use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

/// 内核 CPU 统计文件
pub const PROC_STAT: &str = "/proc/stat";
/// 内核内存统计文件
pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// `/proc/stat` 第一行的累计 CPU 时间
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// 空闲时间（包含 iowait）
    #[inline]
    pub fn idle_all(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// 非空闲时间
    #[inline]
    pub fn non_idle(&self) -> u64 {
        [self.user, self.nice, self.system, self.irq, self.softirq, self.steal]
            .into_iter()
            .fold(0, u64::saturating_add)
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.idle_all().saturating_add(self.non_idle())
    }
}

/// 内存占用（单位：字节）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: u64,
    pub used: u64,
}

impl MemoryUsage {
    /// 已用内存百分比 (0-100)
    #[inline]
    pub fn percent_used(&self) -> f64 {
        // 先乘后除，恰好为 .5 的比例不会落到 .5 以下
        self.used as f64 * 100.0 / self.total as f64
    }
}

/// 系统资源获取错误类型
#[derive(Debug)]
pub enum StatsError {
    IoError(std::io::Error),
    ParseError(String),
}

impl From<std::io::Error> for StatsError {
    #[inline]
    fn from(error: std::io::Error) -> Self {
        StatsError::IoError(error)
    }
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::IoError(e) => write!(f, "IO 错误: {e}"),
            StatsError::ParseError(s) => write!(f, "解析错误: {s}"),
        }
    }
}

impl std::error::Error for StatsError {}

pub type Result<T> = std::result::Result<T, StatsError>;

/// 统计数据来源
///
/// 采样器只关心文本内容，来源可以是伪文件，也可以是测试中预先准备好的数据。
pub trait StatSource: Send {
    fn read(&self) -> Result<String>;
}

/// 基于文件的数据来源，例如 `/proc/stat`
#[derive(Debug, Clone)]
pub struct ProcFile {
    path: PathBuf,
}

impl ProcFile {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatSource for ProcFile {
    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(From::from)
    }
}

/// 按顺序返回预设内容的数据来源，`None` 表示一次读取失败
///
/// 数据耗尽后每次读取都会失败。
#[derive(Debug, Default)]
pub struct ScriptedSource {
    reads: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedSource {
    pub fn new<I, S>(reads: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            reads: Mutex::new(reads.into_iter().map(|r| r.map(Into::into)).collect()),
        }
    }
}

impl StatSource for ScriptedSource {
    fn read(&self) -> Result<String> {
        let next = match self.reads.lock() {
            Ok(mut reads) => reads.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        match next {
            Some(Some(content)) => Ok(content),
            Some(None) => Err(StatsError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "预设读取失败",
            ))),
            None => Err(StatsError::ParseError("预设数据已耗尽".to_string())),
        }
    }
}

/// 解析 `/proc/stat` 第一行的汇总 CPU 时间
///
/// 需要至少 8 个数值字段：user nice system idle iowait irq softirq steal。
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes> {
    let first_line = content
        .lines()
        .next()
        .ok_or_else(|| StatsError::ParseError("无法解析 /proc/stat: 内容为空".to_string()))?;

    let mut parts = first_line.split_whitespace();
    match parts.next() {
        Some(label) if label.starts_with("cpu") => {}
        _ => {
            return Err(StatsError::ParseError(
                "无法解析 /proc/stat: 缺少 cpu 前缀".to_string(),
            ));
        }
    }

    let mut fields = [0u64; 8];
    for (i, slot) in fields.iter_mut().enumerate() {
        let raw = parts
            .next()
            .ok_or_else(|| StatsError::ParseError(format!("cpu 行字段不足: 仅有 {i} 个")))?;
        *slot = raw
            .parse()
            .map_err(|e| StatsError::ParseError(format!("cpu 字段 {raw:?} 无效: {e}")))?;
    }

    // 总和必须能用 u64 表示，增量计算依赖这一点
    if fields.iter().try_fold(0u64, |acc, &v| acc.checked_add(v)).is_none() {
        return Err(StatsError::ParseError("cpu 计数器总和溢出".to_string()));
    }

    let [user, nice, system, idle, iowait, irq, softirq, steal] = fields;
    Ok(CpuTimes {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
        steal,
    })
}

/// 解析 `/proc/meminfo`
///
/// 优先使用内核提供的 MemAvailable；旧内核上退化为 MemFree + Buffers + Cached。
pub fn parse_meminfo(content: &str) -> Result<MemoryUsage> {
    let mut total = 0u64;
    let mut available = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            let Ok(value) = value.parse::<u64>() else {
                continue;
            };

            match key {
                "MemTotal:" => total = value,
                "MemAvailable:" => available = Some(value),
                "MemFree:" => free = value,
                "Buffers:" => buffers = value,
                "Cached:" => cached = value,
                _ => {}
            }
        }
    }

    if total == 0 {
        return Err(StatsError::ParseError(
            "/proc/meminfo 缺少 MemTotal".to_string(),
        ));
    }

    let available = match available {
        Some(available) => available,
        None => free
            .checked_add(buffers)
            .and_then(|v| v.checked_add(cached))
            .ok_or_else(|| overflow("MemFree + Buffers + Cached"))?,
    };
    let used = total.saturating_sub(available);

    // 转换为字节
    Ok(MemoryUsage {
        total: kib_to_bytes(total, "MemTotal")?,
        available: kib_to_bytes(available, "MemAvailable")?,
        used: kib_to_bytes(used, "已用内存")?,
    })
}

#[inline]
fn kib_to_bytes(kib: u64, field: &str) -> Result<u64> {
    kib.checked_mul(1024).ok_or_else(|| overflow(field))
}

fn overflow(field: &str) -> StatsError {
    StatsError::ParseError(format!("/proc/meminfo 中 {field} 数值溢出"))
}
