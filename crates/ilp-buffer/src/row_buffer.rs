use alloc_region::allocate;
use bytes::Bytes;
use tracing::debug;

use crate::error::CapacityError;

/// 默认初始容量（字节）。
pub const DEFAULT_CAPACITY: usize = 8192;

/// 行协议编码使用的可增长字节缓冲。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 编码器在一次调用内可能写入多个片段（分隔符、转义名称、值），必须先一次性确认容量，
///   再逐片写入，保证校验失败时缓冲不被污染；
/// - 刷出只发送完整行，因此需要额外记录“最后一个完整行”的结束偏移。
///
/// ## 逻辑（How）
/// - `data.len() == capacity + 1`，末尾一字节为哨兵，永远不计入有效负载；
/// - `ensure_capacity` 在空间不足时把容量翻倍直至足够，然后分配新区域并复制 `[0, position)`；
/// - `truncate_from(offset)` 将 `[offset, position)` 搬到起点，`position -= offset` 并清零 `end_of_last_row`。
///
/// ## 契约（What）
/// - 不变式：`end_of_last_row ≤ position ≤ capacity`；
/// - `write`/`write_byte` 的前置条件是已通过 `ensure_capacity` 预留空间，违反即 panic；
/// - `reset` 只归零游标，不重新分配。
#[derive(Debug)]
pub struct RowBuffer {
    data: Vec<u8>,
    capacity: usize,
    position: usize,
    end_of_last_row: usize,
}

impl RowBuffer {
    /// 以给定容量创建缓冲。
    pub fn with_capacity(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::ZeroCapacity);
        }
        Ok(Self {
            data: allocate(capacity)?,
            capacity,
            position: 0,
            end_of_last_row: 0,
        })
    }

    /// 当前容量（不含哨兵字节）。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 下一次写入的偏移。
    pub fn position(&self) -> usize {
        self.position
    }

    /// 最后一个完整行的结束偏移。
    pub fn end_of_last_row(&self) -> usize {
        self.end_of_last_row
    }

    /// 剩余可写字节数。
    pub fn remaining(&self) -> usize {
        self.capacity - self.position
    }

    /// 确保还能再写入 `extra` 字节。
    ///
    /// # 契约说明
    /// - 空间足够时不做任何事；
    /// - 否则容量翻倍直到 `position + extra ≤ capacity`，旧内容 `[0, position)` 原样复制到新区域，
    ///   进行中的半行因此对调用方透明；
    /// - 失败时缓冲保持原状。
    pub fn ensure_capacity(&mut self, extra: usize) -> Result<(), CapacityError> {
        let required = self
            .position
            .checked_add(extra)
            .ok_or(CapacityError::Overflow {
                position: self.position,
                requested: extra,
            })?;
        if required <= self.capacity {
            return Ok(());
        }

        let mut new_capacity = self.capacity;
        while new_capacity < required {
            new_capacity = new_capacity
                .checked_mul(2)
                .ok_or(CapacityError::Overflow {
                    position: self.position,
                    requested: extra,
                })?;
        }

        let mut grown = allocate(new_capacity)?;
        grown[..self.position].copy_from_slice(&self.data[..self.position]);
        debug!(
            old_capacity = self.capacity,
            new_capacity,
            position = self.position,
            "row buffer grown"
        );
        self.data = grown;
        self.capacity = new_capacity;
        Ok(())
    }

    /// 在 `position` 处追加字节。
    ///
    /// 调用前必须已为 `bytes.len()` 预留容量。
    pub fn write(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        assert!(
            end <= self.capacity,
            "row buffer write of {} bytes at {} exceeds capacity {} without ensure_capacity",
            bytes.len(),
            self.position,
            self.capacity
        );
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    /// 追加单个字节，前置条件同 [`RowBuffer::write`]。
    pub fn write_byte(&mut self, byte: u8) {
        assert!(
            self.position < self.capacity,
            "row buffer write at {} exceeds capacity {} without ensure_capacity",
            self.position,
            self.capacity
        );
        self.data[self.position] = byte;
        self.position += 1;
    }

    /// 将当前位置标记为最后一个完整行的结尾。
    pub fn mark_row_end(&mut self) {
        self.end_of_last_row = self.position;
    }

    /// 所有完整行组成的前缀 `[0, end_of_last_row)`。
    pub fn completed(&self) -> &[u8] {
        &self.data[..self.end_of_last_row]
    }

    /// 正在构造、尚未终止的行 `[end_of_last_row, position)`。
    pub fn in_progress(&self) -> &[u8] {
        &self.data[self.end_of_last_row..self.position]
    }

    /// 已写入的全部字节 `[0, position)`。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// 丢弃 `[0, offset)`，把其余字节搬到起点。
    ///
    /// # 契约说明
    /// - **前置条件**：`offset ≤ position`；
    /// - **后置条件**：`position` 减少 `offset`，`end_of_last_row` 归零。
    pub fn truncate_from(&mut self, offset: usize) {
        assert!(
            offset <= self.position,
            "truncate offset {} beyond position {}",
            offset,
            self.position
        );
        self.data.copy_within(offset..self.position, 0);
        self.position -= offset;
        self.end_of_last_row = 0;
    }

    /// 回收已完成行占用的前缀，保留进行中的半行。
    pub fn compact(&mut self) {
        self.truncate_from(self.end_of_last_row);
    }

    /// 复制出完整行前缀并立即压缩。
    ///
    /// 与一次成功刷出后的效果相同，供不经过传输层的离线场景使用。
    pub fn split_completed(&mut self) -> Bytes {
        let completed = Bytes::copy_from_slice(self.completed());
        self.compact();
        completed
    }

    /// 归零游标，保留已分配的容量。
    pub fn reset(&mut self) {
        self.position = 0;
        self.end_of_last_row = 0;
    }
}

mod alloc_region {
    use crate::error::CapacityError;

    /// 分配 `capacity + 1` 字节的零填充区域。
    pub(super) fn allocate(capacity: usize) -> Result<Vec<u8>, CapacityError> {
        let bytes = capacity.checked_add(1).ok_or(CapacityError::Overflow {
            position: 0,
            requested: capacity,
        })?;
        let mut region = Vec::new();
        region
            .try_reserve_exact(bytes)
            .map_err(|_| CapacityError::AllocationFailed { bytes })?;
        region.resize(bytes, 0);
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_guard_byte_beyond_capacity() {
        let buffer = RowBuffer::with_capacity(16).expect("分配缓冲");
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.data.len(), 17);
        assert!(buffer.data.iter().all(|b| *b == 0));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            RowBuffer::with_capacity(0).unwrap_err(),
            CapacityError::ZeroCapacity
        );
    }

    #[test]
    fn growth_doubles_until_request_fits() {
        let mut buffer = RowBuffer::with_capacity(4).expect("分配缓冲");
        buffer.ensure_capacity(3).expect("容量足够");
        buffer.write(b"abc");
        buffer.ensure_capacity(10).expect("扩容成功");
        // 3 + 10 = 13 → 4 翻倍到 16
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.as_bytes(), b"abc");
        assert_eq!(buffer.data.len(), 17);
    }

    #[test]
    fn ensure_capacity_is_noop_when_space_remains() {
        let mut buffer = RowBuffer::with_capacity(8).expect("分配缓冲");
        buffer.ensure_capacity(8).expect("恰好够用");
        assert_eq!(buffer.capacity(), 8);
    }

    #[test]
    fn overflowing_request_is_reported() {
        let mut buffer = RowBuffer::with_capacity(8).expect("分配缓冲");
        buffer.ensure_capacity(1).expect("容量足够");
        buffer.write_byte(b'x');
        let err = buffer.ensure_capacity(usize::MAX).unwrap_err();
        assert_eq!(err.code(), "ilp.buffer.overflow");
        assert_eq!(buffer.as_bytes(), b"x");
    }

    #[test]
    #[should_panic(expected = "without ensure_capacity")]
    fn unchecked_write_past_capacity_panics() {
        let mut buffer = RowBuffer::with_capacity(2).expect("分配缓冲");
        buffer.write(b"abc");
    }

    #[test]
    fn compact_rebases_partial_row() {
        let mut buffer = RowBuffer::with_capacity(32).expect("分配缓冲");
        buffer.ensure_capacity(9).expect("容量足够");
        buffer.write(b"t a=1i\n");
        buffer.mark_row_end();
        buffer.write(b"t2");
        assert_eq!(buffer.completed(), b"t a=1i\n");
        assert_eq!(buffer.in_progress(), b"t2");

        buffer.compact();
        assert_eq!(buffer.position(), 2);
        assert_eq!(buffer.end_of_last_row(), 0);
        assert_eq!(buffer.as_bytes(), b"t2");
    }

    #[test]
    fn split_completed_copies_prefix_and_compacts() {
        let mut buffer = RowBuffer::with_capacity(32).expect("分配缓冲");
        buffer.ensure_capacity(5).expect("容量足够");
        buffer.write(b"r\n");
        buffer.mark_row_end();
        buffer.write(b"pa");
        let taken = buffer.split_completed();
        assert_eq!(&taken[..], b"r\n");
        assert_eq!(buffer.as_bytes(), b"pa");
        assert!(buffer.completed().is_empty());
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut buffer = RowBuffer::with_capacity(2).expect("分配缓冲");
        buffer.ensure_capacity(5).expect("扩容成功");
        buffer.write(b"hello");
        buffer.mark_row_end();
        buffer.reset();
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.end_of_last_row(), 0);
        assert_eq!(buffer.capacity(), 8);
    }
}
