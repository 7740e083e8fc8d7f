//! `ilp-buffer` 提供行协议发送端使用的单写者字节缓冲。
//!
//! # 模块定位（Why）
//! - 编码器逐字段写入、发送端按“完整行前缀”整体刷出，两者共享同一块连续内存；
//! - 缓冲必须在构造一行的中途扩容而不丢失半成品，刷出后再把未发送的尾部搬回起点。
//!
//! # 设计概要（How）
//! - [`RowBuffer`] 持有 `capacity + 1` 字节的零填充区域，额外一字节仅作边界哨兵；
//! - 写入前必须显式调用 [`RowBuffer::ensure_capacity`]，扩容按容量翻倍进行并复制已有内容；
//! - `end_of_last_row` 记录最后一个完整行的结束偏移，[`RowBuffer::compact`] 以此为界回收已发送字节。
//!
//! # 契约（What）
//! - 始终满足 `0 ≤ end_of_last_row ≤ position ≤ capacity`；
//! - 容量只增不减；分配失败以 [`CapacityError`] 报告，调用方应视为致命错误。

mod error;
mod row_buffer;

pub use error::CapacityError;
pub use row_buffer::{DEFAULT_CAPACITY, RowBuffer};
