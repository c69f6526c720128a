//! i3bar/swaybar 输出协议
//!
//! 启动时输出一次头部和无限数组的开头，之后每行是一个以逗号开头的块数组。

use crate::block::Block;
use std::io::{self, Write};

/// 协议头，启用点击事件
pub const HEADER: &str = r#"{"version":1,"click_events":true}"#;

/// 输出协议头、无限数组开头和一个空数组
pub fn write_header(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    writeln!(out, "[")?;
    writeln!(out, "[]")?;
    out.flush()
}

/// 序列化一批显示块
#[inline]
pub fn encode_blocks(blocks: &[Block]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(blocks)
}

/// 输出一行已序列化的块数组
pub fn write_row(out: &mut impl Write, encoded: &[u8]) -> io::Result<()> {
    out.write_all(b",")?;
    out.write_all(encoded)?;
    out.write_all(b"\n")?;
    out.flush()
}
