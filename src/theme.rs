//! 严重程度与配色策略
//!
//! 只为异常状态（警告、危险）着色，正常状态不设置颜色，由状态栏主题决定外观。

/// 严重程度，按 `Normal < Warn < Danger` 排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Warn,
    Danger,
}

/// 调色板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub warn: &'static str,
    pub danger: &'static str,
}

/// 默认调色板
pub const DEFAULT_PALETTE: Palette = Palette {
    warn: "#d08770",   // 橙色
    danger: "#bf616a", // 红色
};

/// 警告/危险阈值（百分比）
///
/// 保证 `0 <= warn <= danger <= 100`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    warn: f64,
    danger: f64,
}

impl Thresholds {
    pub const DEFAULT_WARN: i64 = 70;

    /// 根据配置值构建阈值
    ///
    /// 警告阈值 <= 0 时使用默认值 70；危险阈值不大于警告阈值时取警告阈值 + 10，
    /// 两者都不超过 100。
    pub fn new(warn: i64, danger: i64) -> Self {
        let warn = if warn <= 0 { Self::DEFAULT_WARN } else { warn.min(100) };
        let danger = if danger <= warn { warn + 10 } else { danger };
        Self {
            warn: warn as f64,
            danger: danger.min(100) as f64,
        }
    }

    #[cfg(test)]
    fn warn(&self) -> f64 {
        self.warn
    }

    #[cfg(test)]
    fn danger(&self) -> f64 {
        self.danger
    }

    #[inline]
    pub fn severity(&self, percent: f64) -> Severity {
        severity_for(percent, self.warn, self.danger)
    }
}

/// 百分比对应的严重程度，两个阈值均为闭区间比较，危险优先
#[inline]
pub fn severity_for(percent: f64, warn: f64, danger: f64) -> Severity {
    if percent >= danger {
        Severity::Danger
    } else if percent >= warn {
        Severity::Warn
    } else {
        Severity::Normal
    }
}

/// 严重程度对应的颜色，正常状态返回 `None`
#[inline]
pub fn color_for(severity: Severity) -> Option<&'static str> {
    match severity {
        Severity::Normal => None,
        Severity::Warn => Some(DEFAULT_PALETTE.warn),
        Severity::Danger => Some(DEFAULT_PALETTE.danger),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_boundaries_are_inclusive() {
        assert_eq!(severity_for(69.9, 70.0, 90.0), Severity::Normal);
        assert_eq!(severity_for(70.0, 70.0, 90.0), Severity::Warn);
        assert_eq!(severity_for(89.9, 70.0, 90.0), Severity::Warn);
        assert_eq!(severity_for(90.0, 70.0, 90.0), Severity::Danger);
        assert_eq!(severity_for(100.0, 70.0, 90.0), Severity::Danger);
    }

    #[test]
    fn test_danger_wins_when_thresholds_equal() {
        assert_eq!(severity_for(50.0, 50.0, 50.0), Severity::Danger);
        assert_eq!(severity_for(49.0, 50.0, 50.0), Severity::Normal);
    }

    #[test]
    fn test_severity_is_monotonic() {
        for (warn, danger) in [(0, 0), (10, 20), (70, 90), (50, 100), (100, 100)] {
            let (w, d) = (warn as f64, danger as f64);
            let mut previous = Severity::Normal;
            for tenth in 0..=1000 {
                let percent = tenth as f64 / 10.0;
                let severity = severity_for(percent, w, d);
                assert!(severity >= previous, "{percent} with {warn}/{danger}");
                match severity {
                    Severity::Danger => assert!(percent >= d),
                    Severity::Warn => assert!(percent >= w && percent < d),
                    Severity::Normal => assert!(percent < w),
                }
                previous = severity;
            }
        }
    }

    #[test]
    fn test_color_for() {
        assert_eq!(color_for(Severity::Normal), None);
        assert_eq!(color_for(Severity::Warn), Some("#d08770"));
        assert_eq!(color_for(Severity::Danger), Some("#bf616a"));
    }

    #[test]
    fn test_thresholds_normalization() {
        let t = Thresholds::new(70, 90);
        assert_eq!((t.warn(), t.danger()), (70.0, 90.0));

        // 警告阈值缺省
        let t = Thresholds::new(0, 90);
        assert_eq!((t.warn(), t.danger()), (70.0, 90.0));

        // 危险阈值不大于警告阈值
        let t = Thresholds::new(80, 50);
        assert_eq!((t.warn(), t.danger()), (80.0, 90.0));

        // 不超过 100
        let t = Thresholds::new(95, 0);
        assert_eq!((t.warn(), t.danger()), (95.0, 100.0));
        let t = Thresholds::new(150, 200);
        assert_eq!((t.warn(), t.danger()), (100.0, 100.0));
    }

    #[test]
    fn test_thresholds_severity() {
        let t = Thresholds::new(70, 90);
        assert_eq!(t.severity(10.0), Severity::Normal);
        assert_eq!(t.severity(75.0), Severity::Warn);
        assert_eq!(t.severity(95.0), Severity::Danger);
    }
}
