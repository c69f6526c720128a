use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use swaystats::clicks::{CLICK_QUEUE_CAPACITY, log_click, spawn_stdin_reader};
use swaystats::config::Config;
use swaystats::protocol::write_header;
use swaystats::watch::spawn_config_watcher;
use swaystats::{ProviderSlot, Registry, StatusBar, create_slot, default_registry, tick_interval};

/// swaybar/i3bar 状态栏数据生成器
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径 (默认: $XDG_CONFIG_HOME/swaystats/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别 (trace, debug, info, warn, error)，日志输出到标准错误
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志系统
    init_logger(&args.log_level);

    info!("swaystats 启动中...");

    let config = Config::load_or_default(args.config.as_deref());

    info!(
        "配置信息 - 刷新频率: {} 次/秒, 模块顺序: {:?}",
        config.tick_hz,
        config.module_order()
    );

    // 构建提供者
    let registry = Arc::new(default_registry());
    let providers = registry.build(&config, SystemTime::now());
    info!("已启用 {} 个模块", providers.len());

    let slot = create_slot();

    // 协议头
    let mut out = BufWriter::new(io::stdout());
    write_header(&mut out)?;

    let (clicks, _reader) = spawn_stdin_reader(CLICK_QUEUE_CAPACITY);

    // 找到配置文件时监视其变化，包括解析失败的文件
    if let Some(path) = config.source_path() {
        let reload_path = path.to_path_buf();
        let registry = registry.clone();
        let reload_slot = slot.clone();
        match spawn_config_watcher(path.to_path_buf(), move || {
            reload(&reload_path, &registry, &reload_slot)
        }) {
            Ok(_) => info!("已启用配置热重载: {}", path.display()),
            Err(e) => warn!("配置监视启动失败: {e:#}，继续使用当前配置"),
        }
    }

    let interval = tick_interval(config.tick_hz);
    StatusBar::new(out, providers, slot)
        .run(clicks, log_click, interval)
        .await
}

/// 重新加载配置并发布新的提供者列表
fn reload(path: &Path, registry: &Registry, slot: &ProviderSlot) {
    match Config::load(Some(path)) {
        Ok(config) => {
            slot.publish(registry.build(&config, SystemTime::now()));
            info!("配置已重新加载 ({})", path.display());
        }
        Err(e) => warn!("配置重新加载失败: {e}"),
    }
}

/// 初始化日志系统
///
/// 标准输出只用于协议数据，日志固定写到标准错误。
fn init_logger(level: &str) {
    match env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .try_init()
    {
        Ok(_) => info!("日志系统初始化成功，级别: {level}"),
        Err(e) => eprintln!("日志系统初始化失败: {e}"),
    }
}
