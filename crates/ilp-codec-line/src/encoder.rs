use std::fmt;

use bytes::Bytes;
use ilp_buffer::{CapacityError, RowBuffer};

use crate::error::{CodecError, ValidationError};
use crate::escape::{EscapeMode, escaped_len, write_escaped};
use crate::name::{self, NameKind};
use crate::state::RowState;
use crate::timestamp;
use crate::value::{IntegralValue, format_float};

const NEWLINE: u8 = b'\n';

/// 行协议编码器，拥有一块 [`RowBuffer`] 与当前行的 [`RowState`]。
///
/// # 教案级注释
///
/// ## 逻辑（How）
/// 每个写字段的方法都分三步执行：
/// 1. 由 `RowState` 计算下一状态，非法顺序立即返回 [`SequenceError`](crate::SequenceError)；
/// 2. 校验名称与取值，计算本次调用要写入的精确字节数并 `ensure_capacity`；
/// 3. 逐片写入，最后提交新状态。
///
/// 前两步失败时缓冲与状态都未被触碰，因此不会出现写了一半的字段。
///
/// ## 契约（What）
/// - `table` → `symbol`* → `*_column`* → `at`/`at_nanos`/`at_now`；
/// - 行终止后 `end_of_last_row` 前移到新的 `position`，状态回到 [`RowState::Empty`]；
/// - [`LineEncoder::compact`] 只回收完整行，进行中的半行被搬到偏移 0 继续构造。
///
/// ## 示例
/// ```
/// use ilp_codec_line::LineEncoder;
///
/// let mut encoder = LineEncoder::new(64).unwrap();
/// encoder
///     .table("weather").unwrap()
///     .symbol("city", "London").unwrap()
///     .float_column("temp", 23.5).unwrap()
///     .at("1465839830100400000").unwrap();
/// assert_eq!(
///     encoder.completed(),
///     b"weather,city=London temp=23.5 1465839830100400000\n"
/// );
/// ```
#[derive(Debug)]
pub struct LineEncoder {
    buffer: RowBuffer,
    state: RowState,
}

impl LineEncoder {
    /// 以给定初始容量创建编码器。
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        Ok(Self {
            buffer: RowBuffer::with_capacity(capacity)?,
            state: RowState::Empty,
        })
    }

    /// 当前行状态。
    pub fn state(&self) -> RowState {
        self.state
    }

    /// 底层缓冲的只读视图。
    pub fn buffer(&self) -> &RowBuffer {
        &self.buffer
    }

    /// 开始新行并写入表名。
    pub fn table(&mut self, name: &str) -> Result<&mut Self, CodecError> {
        let next = self.state.on_table()?;
        name::validate(NameKind::Table, name)?;
        self.buffer
            .ensure_capacity(escaped_len(name.as_bytes(), EscapeMode::Unquoted))?;
        write_escaped(&mut self.buffer, name.as_bytes(), EscapeMode::Unquoted);
        self.state = next;
        Ok(self)
    }

    /// 写入一个 symbol，取值先按 `Display` 转为文本再做非引号转义。
    pub fn symbol<V>(&mut self, name: &str, value: V) -> Result<&mut Self, CodecError>
    where
        V: fmt::Display,
    {
        let next = self.state.on_symbol()?;
        name::validate(NameKind::Symbol, name)?;
        let text = value.to_string();
        let len = 2
            + escaped_len(name.as_bytes(), EscapeMode::Unquoted)
            + escaped_len(text.as_bytes(), EscapeMode::Unquoted);
        self.buffer.ensure_capacity(len)?;

        self.buffer.write_byte(b',');
        write_escaped(&mut self.buffer, name.as_bytes(), EscapeMode::Unquoted);
        self.buffer.write_byte(b'=');
        write_escaped(&mut self.buffer, text.as_bytes(), EscapeMode::Unquoted);
        self.state = next;
        Ok(self)
    }

    /// 写入字符串列，取值加双引号。
    pub fn str_column(&mut self, name: &str, value: &str) -> Result<&mut Self, CodecError> {
        let next = self.begin_column(name)?;
        self.put_column(next, name, ColumnBody::Quoted(value.as_bytes()))
    }

    /// 写入布尔列，`t` 或 `f`。
    pub fn bool_column(&mut self, name: &str, value: bool) -> Result<&mut Self, CodecError> {
        let next = self.begin_column(name)?;
        let body: &[u8] = if value { b"t" } else { b"f" };
        self.put_column(next, name, ColumnBody::Raw(body, None))
    }

    /// 写入浮点列，不带后缀。
    pub fn float_column(&mut self, name: &str, value: f64) -> Result<&mut Self, CodecError> {
        let next = self.begin_column(name)?;
        let text = format_float(value);
        self.put_column(next, name, ColumnBody::Raw(text.as_bytes(), None))
    }

    /// 写入整数列，以 `i` 结尾。
    pub fn int_column<V>(&mut self, name: &str, value: V) -> Result<&mut Self, CodecError>
    where
        V: IntegralValue,
    {
        let next = self.begin_column(name)?;
        let text = integral_text(name, value)?;
        self.put_column(next, name, ColumnBody::Raw(text.as_bytes(), Some(b'i')))
    }

    /// 写入时间戳列（非指定时间戳），以 `t` 结尾。
    pub fn timestamp_column<V>(&mut self, name: &str, value: V) -> Result<&mut Self, CodecError>
    where
        V: IntegralValue,
    {
        let next = self.begin_column(name)?;
        let text = integral_text(name, value)?;
        self.put_column(next, name, ColumnBody::Raw(text.as_bytes(), Some(b't')))
    }

    /// 以纳秒时间戳文本结束当前行，文本原样写入。
    pub fn at(&mut self, timestamp: &str) -> Result<(), CodecError> {
        let next = self.state.on_close()?;
        timestamp::validate(timestamp)?;
        self.close_with(next, Some(timestamp.as_bytes()))
    }

    /// 以纳秒整数结束当前行。
    pub fn at_nanos(&mut self, epoch_nanos: i64) -> Result<(), CodecError> {
        let next = self.state.on_close()?;
        let text = epoch_nanos.to_string();
        self.close_with(next, Some(text.as_bytes()))
    }

    /// 不带时间戳结束当前行，由服务端分配时间。
    pub fn at_now(&mut self) -> Result<(), CodecError> {
        let next = self.state.on_close()?;
        self.close_with(next, None)
    }

    /// 所有完整行组成的前缀。
    pub fn completed(&self) -> &[u8] {
        self.buffer.completed()
    }

    /// 回收完整行前缀，保留进行中的半行。
    pub fn compact(&mut self) {
        self.buffer.compact();
    }

    /// 复制出完整行前缀并压缩缓冲。
    pub fn take_completed(&mut self) -> Bytes {
        self.buffer.split_completed()
    }

    /// 清空缓冲与行状态，保留容量。
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.state = RowState::Empty;
    }

    fn begin_column(&self, name: &str) -> Result<RowState, CodecError> {
        let next = self.state.on_column()?;
        name::validate(NameKind::Column, name)?;
        Ok(next)
    }

    fn put_column(
        &mut self,
        next: RowState,
        name: &str,
        body: ColumnBody<'_>,
    ) -> Result<&mut Self, CodecError> {
        let len = 2 + escaped_len(name.as_bytes(), EscapeMode::Unquoted) + body.len();
        self.buffer.ensure_capacity(len)?;

        self.buffer.write_byte(self.state.column_separator());
        write_escaped(&mut self.buffer, name.as_bytes(), EscapeMode::Unquoted);
        self.buffer.write_byte(b'=');
        body.write(&mut self.buffer);
        self.state = next;
        Ok(self)
    }

    fn close_with(&mut self, next: RowState, timestamp: Option<&[u8]>) -> Result<(), CodecError> {
        let len = timestamp.map_or(0, |ts| ts.len() + 1) + 1;
        self.buffer.ensure_capacity(len)?;
        if let Some(ts) = timestamp {
            self.buffer.write_byte(b' ');
            self.buffer.write(ts);
        }
        self.buffer.write_byte(NEWLINE);
        self.buffer.mark_row_end();
        self.state = next;
        Ok(())
    }
}

/// 列取值的写入形式。
enum ColumnBody<'a> {
    /// 字符串列：加引号并转义。
    Quoted(&'a [u8]),
    /// 数值与布尔列：原样写入，可选单字节后缀。
    Raw(&'a [u8], Option<u8>),
}

impl ColumnBody<'_> {
    fn len(&self) -> usize {
        match self {
            ColumnBody::Quoted(value) => escaped_len(value, EscapeMode::Quoted),
            ColumnBody::Raw(value, suffix) => value.len() + usize::from(suffix.is_some()),
        }
    }

    fn write(&self, buffer: &mut RowBuffer) {
        match self {
            ColumnBody::Quoted(value) => write_escaped(buffer, value, EscapeMode::Quoted),
            ColumnBody::Raw(value, suffix) => {
                buffer.write(value);
                if let Some(suffix) = suffix {
                    buffer.write_byte(*suffix);
                }
            }
        }
    }
}

fn integral_text<V: IntegralValue>(column: &str, value: V) -> Result<String, ValidationError> {
    value
        .to_i64()
        .map(|v| v.to_string())
        .ok_or_else(|| ValidationError::NotIntegral {
            column: column.to_owned(),
            value: value.to_string(),
        })
}
