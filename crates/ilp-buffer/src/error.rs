use thiserror::Error;

/// 缓冲分配失败。
///
/// 三个变体都不可恢复：缓冲内容保持原状，但调用方无法再安全写入更多数据。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// 初始容量为零，翻倍扩容无法推进。
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,

    /// 所需容量超出 `usize` 可表示范围。
    #[error("requested {requested} extra bytes at position {position} overflows usize")]
    Overflow { position: usize, requested: usize },

    /// 分配器拒绝了请求的大小。
    #[error("failed to allocate {bytes} bytes for row buffer")]
    AllocationFailed { bytes: usize },
}

impl CapacityError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CapacityError::ZeroCapacity => "ilp.buffer.zero_capacity",
            CapacityError::Overflow { .. } => "ilp.buffer.overflow",
            CapacityError::AllocationFailed { .. } => "ilp.buffer.allocation_failed",
        }
    }
}
