use crate::theme::{Severity, color_for};
use serde::Serialize;

/// 内置模块使用的分隔宽度
pub const SEPARATOR_WIDTH: u32 = 12;

/// i3bar 协议中的一个显示块
///
/// 块一旦生成就不再修改，新的采样结果会整体替换旧块。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Block {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance: String,
    pub full_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub short_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub background: String,
    pub separator: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub separator_block_width: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub urgent: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub markup: String,
}

impl Block {
    /// 创建不带分隔线、保留固定分隔宽度的块
    pub fn new(name: impl Into<String>, full_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_text: full_text.into(),
            separator: false,
            separator_block_width: SEPARATOR_WIDTH,
            ..Default::default()
        }
    }

    /// 按严重程度着色，正常状态不设置颜色
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.color = color_for(severity).map(str::to_string);
        self
    }

    /// 数据源不可用时的占位块，使用危险配色
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, message).with_severity(Severity::Danger)
    }
}

#[inline]
fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[inline]
fn is_false(value: &bool) -> bool {
    !*value
}
