use ilp_buffer::CapacityError;
use thiserror::Error;

use crate::name::NameKind;
use crate::state::RowState;

/// 输入值不合法。
///
/// 总是在修改缓冲之前返回，调用方修正输入后可以原样重试同一调用。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 表名、列名或 symbol 名不符合命名规则。
    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        /// 名称所在的位置。
        kind: NameKind,
        /// 原始名称。
        name: String,
        /// 人类可读的拒绝原因。
        reason: String,
    },

    /// 指定时间戳文本无法解析为纳秒整数。
    #[error("invalid designated timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// 原始文本。
        value: String,
        /// 人类可读的拒绝原因。
        reason: &'static str,
    },

    /// 需要整数的列收到了非整数或越界数值。
    #[error("column {column:?} requires an integral value representable as i64, got {value}")]
    NotIntegral {
        /// 列名。
        column: String,
        /// 原始数值的文本表示。
        value: String,
    },
}

impl ValidationError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidName { .. } => "ilp.codec.invalid_name",
            ValidationError::InvalidTimestamp { .. } => "ilp.codec.invalid_timestamp",
            ValidationError::NotIntegral { .. } => "ilp.codec.not_integral",
        }
    }
}

/// 调用顺序违反行状态机。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// 同一行内第二次设置表名。
    #[error("table already set for the current row (state {state:?})")]
    TableAlreadySet {
        /// 出错时的行状态。
        state: RowState,
    },

    /// 在设置表名之前写入字段或结束行。
    #[error("table must be set before `{operation}`")]
    TableNotSet {
        /// 被拒绝的操作名。
        operation: &'static str,
    },

    /// symbol 出现在列之后。
    #[error("symbols must be written before any column")]
    SymbolAfterColumn,

    /// 只有表名、没有任何字段的行。
    #[error("row has no symbols or columns; a bare table name is not a valid row")]
    EmptyRow,
}

impl SequenceError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            SequenceError::TableAlreadySet { .. } => "ilp.codec.table_already_set",
            SequenceError::TableNotSet { .. } => "ilp.codec.table_not_set",
            SequenceError::SymbolAfterColumn => "ilp.codec.symbol_after_column",
            SequenceError::EmptyRow => "ilp.codec.empty_row",
        }
    }
}

/// 编码器错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// 输入校验失败，可恢复。
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 调用顺序错误，可恢复。
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// 缓冲分配失败，不可恢复。
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

impl CodecError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Validation(err) => err.code(),
            CodecError::Sequence(err) => err.code(),
            CodecError::Capacity(err) => err.code(),
        }
    }
}
