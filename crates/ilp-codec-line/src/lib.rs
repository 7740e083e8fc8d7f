#![warn(missing_docs)]

//! `ilp-codec-line` 把带类型的行数据编码为逐字节精确的行协议文本。
//!
//! # 协议回顾
//! ```text
//! table_name[,symbol=value]* [column=value[,column=value]*] [ timestamp]\n
//! ```
//! - 第一个 symbol 前为 `,`，第一个列前为单个空格，其后的列以 `,` 分隔；
//! - 整数列以 `i` 结尾，时间戳列以 `t` 结尾，字符串列加双引号，布尔列为 `t`/`f`；
//! - 指定时间戳（若有）前为单个空格，记录以 `\n` 结束。
//!
//! # 结构（How）
//! - [`escape`]：按字段类别计算转义后长度并写入；
//! - [`name`] 与 [`timestamp`]：在写入前拒绝非法名称与时间戳文本；
//! - [`RowState`]：显式枚举 `Empty → TableSet → HasSymbols → HasColumns` 的合法跃迁；
//! - [`LineEncoder`]：串联以上组件，拥有 [`ilp_buffer::RowBuffer`]。
//!
//! # 契约（What）
//! - 任意一次调用若返回错误，缓冲内容与行状态均保持调用前的样子；
//! - 本 crate 不做任何 I/O，刷出与压缩由上层发送端协调。

mod encoder;
mod error;
pub mod escape;
pub mod name;
mod state;
pub mod timestamp;
mod value;

pub use encoder::LineEncoder;
pub use error::{CodecError, SequenceError, ValidationError};
pub use escape::EscapeMode;
pub use name::{MAX_NAME_LENGTH, NameKind};
pub use state::RowState;
pub use value::{IntegralValue, format_float};
