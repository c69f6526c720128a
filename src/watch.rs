//! 配置文件监视
//!
//! 监视配置文件所在目录，只转发目标文件的事件，并在短时间窗口内合并连续事件，
//! 避免编辑器保存时的多次写入触发多次重新加载。

use anyhow::{Context, Result};
use log::{debug, warn};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// 合并事件的时间窗口
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

/// 启动配置文件监视，文件变化时（合并后）调用 `on_change`
///
/// 监视器初始化失败时返回错误，调用方可以继续使用已加载的配置运行。
pub fn spawn_config_watcher<F>(path: PathBuf, on_change: F) -> Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    // 事件中的路径是绝对路径
    let path = path.canonicalize().unwrap_or(path);
    let (tx, rx) = mpsc::unbounded_channel();
    let target = path.clone();

    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if targets_file(&event, &target) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!("配置监视错误: {e}"),
        })
        .context("初始化配置监视器失败")?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    watcher
        .watch(parent, RecursiveMode::NonRecursive)
        .with_context(|| format!("监视目录 {} 失败", parent.display()))?;

    debug!("开始监视配置文件 {}", path.display());

    Ok(tokio::spawn(async move {
        // 监视器需要与任务同生命周期
        let _watcher = watcher;
        debounce(rx, DEBOUNCE_WINDOW, on_change).await;
    }))
}

/// 事件是否与目标文件相关
fn targets_file(event: &Event, target: &Path) -> bool {
    event.paths.iter().any(|p| p == target)
}

/// 合并连续事件：收到事件后等待窗口内不再有新事件，再调用一次 `on_fire`
///
/// 发送端全部关闭后返回。
pub async fn debounce<T, F>(mut rx: UnboundedReceiver<T>, window: Duration, mut on_fire: F)
where
    F: FnMut(),
{
    while rx.recv().await.is_some() {
        loop {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    on_fire();
                    return;
                }
                Err(_) => break,
            }
        }
        on_fire();
    }
}
