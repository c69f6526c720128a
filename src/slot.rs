use crate::provider::ProviderList;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

/// 无锁的提供者列表交接槽
///
/// 配置监视任务发布重建好的完整列表，渲染循环在下一次刷新开始时整体取走。
/// 槽中最多保存一个待取列表，新发布的列表会替换尚未取走的旧列表。
pub struct ProviderSlot {
    pending: AtomicPtr<ProviderList>,
}

impl ProviderSlot {
    /// 创建空槽
    #[inline]
    pub fn new() -> Self {
        Self {
            pending: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// 原子发布新的提供者列表
    pub fn publish(&self, providers: ProviderList) {
        let boxed = Box::into_raw(Box::new(providers));

        // 原子替换数据指针
        let old_ptr = self.pending.swap(boxed, Ordering::AcqRel);

        // 释放未被取走的旧列表
        if !old_ptr.is_null() {
            drop(unsafe { Box::from_raw(old_ptr) });
        }
    }

    /// 取走待处理的列表，没有新列表时返回 `None`
    pub fn take(&self) -> Option<ProviderList> {
        let ptr = self.pending.swap(ptr::null_mut(), Ordering::AcqRel);
        if ptr.is_null() {
            return None;
        }

        // 指针由 publish 中的 Box 产生，swap 之后只有当前调用方持有它
        Some(*unsafe { Box::from_raw(ptr) })
    }

    #[cfg(test)]
    fn has_pending(&self) -> bool {
        !self.pending.load(Ordering::Acquire).is_null()
    }
}

impl Default for ProviderSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProviderSlot {
    fn drop(&mut self) {
        drop(self.take());
    }
}

/// 交接槽类型别名
pub type SlotRef = Arc<ProviderSlot>;

/// 创建交接槽的便捷函数
#[inline]
pub fn create_slot() -> SlotRef {
    Arc::new(ProviderSlot::new())
}
