use crate::error::SequenceError;

/// 行构造进度。
///
/// # 合法跃迁
/// ```text
/// Empty --table--> TableSet --symbol--> HasSymbols --symbol--> HasSymbols
///                     |                     |
///                     +------column---------+--column--> HasColumns --column--> HasColumns
///
/// HasSymbols | HasColumns --at--> Empty
/// ```
/// 每个跃迁函数只计算下一状态，不修改 `self`；编码器在字节全部写入之后才提交新状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowState {
    /// 尚未开始新行。
    #[default]
    Empty,
    /// 已写入表名，还没有任何字段。
    TableSet,
    /// 至少写入了一个 symbol，还没有列。
    HasSymbols,
    /// 至少写入了一个列。
    HasColumns,
}

impl RowState {
    pub(crate) fn on_table(self) -> Result<RowState, SequenceError> {
        match self {
            RowState::Empty => Ok(RowState::TableSet),
            state => Err(SequenceError::TableAlreadySet { state }),
        }
    }

    pub(crate) fn on_symbol(self) -> Result<RowState, SequenceError> {
        match self {
            RowState::Empty => Err(SequenceError::TableNotSet {
                operation: "symbol",
            }),
            RowState::TableSet | RowState::HasSymbols => Ok(RowState::HasSymbols),
            RowState::HasColumns => Err(SequenceError::SymbolAfterColumn),
        }
    }

    pub(crate) fn on_column(self) -> Result<RowState, SequenceError> {
        match self {
            RowState::Empty => Err(SequenceError::TableNotSet {
                operation: "column",
            }),
            _ => Ok(RowState::HasColumns),
        }
    }

    pub(crate) fn on_close(self) -> Result<RowState, SequenceError> {
        match self {
            RowState::Empty => Err(SequenceError::TableNotSet { operation: "at" }),
            RowState::TableSet => Err(SequenceError::EmptyRow),
            RowState::HasSymbols | RowState::HasColumns => Ok(RowState::Empty),
        }
    }

    /// 第一个列前为空格，其后为逗号。
    pub(crate) fn column_separator(self) -> u8 {
        match self {
            RowState::HasColumns => b',',
            _ => b' ',
        }
    }

    /// 是否有尚未终止的行。
    pub fn in_row(self) -> bool {
        self != RowState::Empty
    }
}
