//! 调度与渲染循环
//!
//! 单个循环按固定节拍轮询全部提供者：任何提供者内容变化或首次输出时写出整行，
//! 否则跳过本次输出。节拍之间处理排队的点击事件。

use crate::block::Block;
use crate::clicks::{ClickEvent, ClickHandler};
use crate::protocol::{encode_blocks, write_row};
use crate::provider::ProviderList;
use crate::slot::SlotRef;
use anyhow::Result;
use log::{debug, error, info, warn};
use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::Receiver;

/// 等待下一节拍时的最长单次休眠，保证点击响应延迟
pub const MAX_WAKE_INTERVAL: Duration = Duration::from_millis(100);

/// 状态栏渲染器
pub struct StatusBar<W: Write> {
    out: W,
    providers: ProviderList,
    slot: SlotRef,
    /// 是否已经输出过数据行
    emitted: bool,
}

impl<W: Write> StatusBar<W> {
    /// 创建渲染器
    #[inline]
    pub fn new(out: W, providers: ProviderList, slot: SlotRef) -> Self {
        Self {
            out,
            providers,
            slot,
            emitted: false,
        }
    }

    /// 当前提供者名称，按输出顺序
    #[cfg(test)]
    fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }

    /// 执行一次刷新，输出了数据行时返回 true
    ///
    /// 只有写出失败会返回错误，意味着状态栏已经关闭。
    pub fn render_once(&mut self, now: SystemTime) -> std::io::Result<bool> {
        // 配置重新加载后整体替换列表，并强制输出一次
        if let Some(providers) = self.slot.take() {
            info!("提供者列表已更新，共 {} 个模块", providers.len());
            self.providers = providers;
            self.emitted = false;
        }

        let mut changed = false;
        let mut blocks: Vec<Block> = Vec::with_capacity(self.providers.len());
        for provider in self.providers.iter_mut() {
            if provider.maybe_refresh(now) {
                changed = true;
            }
            blocks.push(provider.current());
        }

        if !changed && self.emitted {
            return Ok(false);
        }

        let encoded = match encode_blocks(&blocks) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("序列化显示块失败: {e}");
                return Ok(false);
            }
        };
        write_row(&mut self.out, &encoded)?;
        self.emitted = true;
        Ok(true)
    }

    /// 运行渲染循环，直到输出失败
    pub async fn run<H: ClickHandler>(
        mut self,
        mut clicks: Receiver<ClickEvent>,
        mut handler: H,
        interval: Duration,
    ) -> Result<()> {
        info!("渲染循环启动，刷新间隔 {interval:?}");

        // 先对齐到下一个节拍边界
        wait_until_next_tick(interval, &mut clicks, &mut handler).await;

        loop {
            drain_clicks(&mut clicks, &mut handler);
            self.render_once(SystemTime::now())?;
            wait_until_next_tick(interval, &mut clicks, &mut handler).await;
        }
    }
}

/// 每秒刷新次数转换为节拍间隔，次数钳制到 [1, 20]
pub fn tick_interval(tick_hz: i64) -> Duration {
    let hz = tick_hz.clamp(1, 20) as u32;
    Duration::from_secs(1) / hz
}

/// 下一个节拍边界：把当前时间向下取整到节拍网格，再加一个间隔
pub fn next_tick_boundary(now: SystemTime, interval: Duration) -> SystemTime {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let step = interval.as_nanos().max(1);
    let next = (since_epoch / step + 1) * step;
    UNIX_EPOCH + Duration::from_nanos(next as u64)
}

/// 不阻塞地处理所有排队的点击事件
pub fn drain_clicks(clicks: &mut Receiver<ClickEvent>, handler: &mut impl ClickHandler) -> usize {
    let mut handled = 0;
    while let Ok(click) = clicks.try_recv() {
        dispatch_click(handler, &click);
        handled += 1;
    }
    handled
}

/// 调用点击回调，回调失败只记录日志
fn dispatch_click(handler: &mut impl ClickHandler, click: &ClickEvent) {
    if let Err(e) = handler.handle(click) {
        warn!("处理点击事件 {} 失败: {e:#}", click.name);
    }
}

/// 休眠到下一个节拍边界
///
/// 每次最多休眠 [`MAX_WAKE_INTERVAL`]，醒来时处理一个排队的点击事件。
pub async fn wait_until_next_tick(
    interval: Duration,
    clicks: &mut Receiver<ClickEvent>,
    handler: &mut impl ClickHandler,
) {
    let next = next_tick_boundary(SystemTime::now(), interval);
    loop {
        let remaining = match next.duration_since(SystemTime::now()) {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => return,
        };

        tokio::time::sleep(remaining.min(MAX_WAKE_INTERVAL)).await;

        if let Ok(click) = clicks.try_recv() {
            debug!("节拍间处理点击事件: {}", click.name);
            dispatch_click(handler, &click);
        }
    }
}
