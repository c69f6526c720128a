//! 点击事件读取
//!
//! 状态栏把点击事件以 JSON 行的形式写入标准输入。读取任务只负责解析并放入
//! 有界队列，队列已满时丢弃最新的事件，不阻塞读取。

use log::{debug, info, warn};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinHandle;

/// 点击事件队列容量
pub const CLICK_QUEUE_CAPACITY: usize = 16;

/// 一次点击事件
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickEvent {
    pub name: String,
    #[serde(default)]
    pub instance: Option<String>,
    pub button: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// 读取结束时的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    /// 成功放入队列的事件数
    pub delivered: usize,
    /// 无法解析的行数
    pub malformed: usize,
    /// 队列已满被丢弃的事件数
    pub dropped: usize,
}

/// 点击事件处理回调
pub trait ClickHandler {
    fn handle(&mut self, click: &ClickEvent) -> anyhow::Result<()>;
}

impl<F> ClickHandler for F
where
    F: FnMut(&ClickEvent) -> anyhow::Result<()>,
{
    fn handle(&mut self, click: &ClickEvent) -> anyhow::Result<()> {
        self(click)
    }
}

/// 默认处理方式：只记录日志
pub fn log_click(click: &ClickEvent) -> anyhow::Result<()> {
    info!(
        "点击: {} 按键 {} 位置 ({}, {})",
        click.name, click.button, click.x, click.y
    );
    Ok(())
}

/// 解析一行输入
///
/// 无限数组的开头 `[`、行首的逗号和空行不算事件，返回 `Ok(None)`。
pub fn parse_line(line: &str) -> serde_json::Result<Option<ClickEvent>> {
    let line = line.trim();
    let line = line.strip_prefix(',').unwrap_or(line).trim_start();
    if line.is_empty() || line == "[" || line == "]" {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// 逐行读取点击事件直到输入结束
pub async fn read_clicks<R>(reader: R, tx: Sender<ClickEvent>) -> ReadSummary
where
    R: AsyncRead + Unpin,
{
    let mut summary = ReadSummary::default();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("读取点击事件失败: {e}");
                break;
            }
        };

        let click = match parse_line(&line) {
            Ok(Some(click)) => click,
            Ok(None) => continue,
            Err(e) => {
                warn!("无法解析点击事件 {line:?}: {e}");
                summary.malformed += 1;
                continue;
            }
        };

        match tx.try_send(click) {
            Ok(()) => summary.delivered += 1,
            Err(TrySendError::Full(click)) => {
                debug!("点击队列已满，丢弃事件: {}", click.name);
                summary.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }

    debug!("点击事件读取结束: {summary:?}");
    summary
}

/// 在后台读取标准输入
pub fn spawn_stdin_reader(capacity: usize) -> (Receiver<ClickEvent>, JoinHandle<ReadSummary>) {
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(read_clicks(tokio::io::stdin(), tx));
    (rx, handle)
}
