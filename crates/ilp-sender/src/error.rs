use ilp_buffer::CapacityError;
use ilp_codec_line::{CodecError, SequenceError, ValidationError};
use ilp_transport::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// 发送端对调用方暴露的唯一错误类型。
///
/// # 分类
/// | 变体 | 可恢复 | 缓冲是否被修改 |
/// |------|--------|----------------|
/// | `Validation` / `Sequence` | 是 | 否 |
/// | `Config` | 是 | 否（发送端尚未创建） |
/// | `Transport` | 是 | 否，刷出失败时完整行仍在缓冲中 |
/// | `AlreadyConnected` / `NotConnected` | 是 | 否 |
/// | `Capacity` | 否 | 否，但之后无法再写入 |
#[derive(Debug, Error)]
pub enum SenderError {
    /// 名称、字符串值或数值未通过校验。
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 行构造调用顺序错误。
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// 缓冲无法继续增长。
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// 建连、认证、发送或关闭失败。
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 配置不合法。
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 同一个发送端上重复建连。
    #[error("sender is already connected")]
    AlreadyConnected,

    /// 需要连接的操作在未连接时被调用。
    #[error("`{operation}` requires an open connection")]
    NotConnected {
        /// 被拒绝的操作名。
        operation: &'static str,
    },
}

impl From<CodecError> for SenderError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Validation(err) => SenderError::Validation(err),
            CodecError::Sequence(err) => SenderError::Sequence(err),
            CodecError::Capacity(err) => SenderError::Capacity(err),
        }
    }
}

impl SenderError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            SenderError::Validation(err) => err.code(),
            SenderError::Sequence(err) => err.code(),
            SenderError::Capacity(err) => err.code(),
            SenderError::Transport(err) => err.code(),
            SenderError::Config(err) => err.code(),
            SenderError::AlreadyConnected => "ilp.sender.already_connected",
            SenderError::NotConnected { .. } => "ilp.sender.not_connected",
        }
    }

    /// 只有缓冲分配失败不可恢复。
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SenderError::Capacity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_keep_their_class() {
        let err = SenderError::from(CodecError::Sequence(SequenceError::EmptyRow));
        assert!(matches!(err, SenderError::Sequence(SequenceError::EmptyRow)));
        assert_eq!(err.code(), "ilp.codec.empty_row");
        assert!(err.is_recoverable());
    }

    #[test]
    fn only_capacity_is_fatal() {
        let fatal = SenderError::from(CodecError::Capacity(CapacityError::AllocationFailed {
            bytes: 1 << 40,
        }));
        assert!(!fatal.is_recoverable());
        assert!(SenderError::AlreadyConnected.is_recoverable());
        assert!(
            SenderError::NotConnected { operation: "flush" }
                .to_string()
                .contains("flush")
        );
    }
}
