use std::fmt;
use std::io;

use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OperationKind {
    /// 稳定错误码，例如 `ilp.transport.write_failed`。
    pub code: &'static str,
    /// 出错操作的简短描述，用作错误文案前缀。
    pub message: &'static str,
}

impl fmt::Debug for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

pub(crate) const CONNECT: OperationKind = OperationKind {
    code: "ilp.transport.connect_failed",
    message: "tcp connect",
};
pub(crate) const CONFIGURE: OperationKind = OperationKind {
    code: "ilp.transport.configure_failed",
    message: "tcp configure",
};
pub(crate) const WRITE: OperationKind = OperationKind {
    code: "ilp.transport.write_failed",
    message: "socket write",
};
pub(crate) const READ: OperationKind = OperationKind {
    code: "ilp.transport.read_failed",
    message: "socket read",
};
pub(crate) const SHUTDOWN: OperationKind = OperationKind {
    code: "ilp.transport.shutdown_failed",
    message: "socket shutdown",
};

/// 传输层错误。
///
/// 除 [`TransportError::Tls`] 外，出错时连接都尚未交给调用方或保持原状；
/// TLS 证书被拒绝时，底层 TCP 套接字在返回错误前已经关闭。
#[derive(Debug, Error)]
pub enum TransportError {
    /// 套接字 I/O 失败。
    #[error("{}: {source}", .kind.message)]
    Io {
        /// 出错的操作。
        kind: OperationKind,
        /// 底层 I/O 错误。
        #[source]
        source: io::Error,
    },

    /// TLS 握手失败，包括证书校验失败。
    #[error("tls handshake with {host:?} failed: {source}")]
    Tls {
        /// 握手时使用的服务端名称。
        host: String,
        /// rustls 报告的握手错误。
        #[source]
        source: io::Error,
    },

    /// TLS 配置无法构建（CA 文件不可读、主机名非法等）。
    #[error("tls configuration error: {reason}")]
    /// 无法构建的原因。
    TlsConfig { reason: String },

    /// 认证凭据无法解析或与 P-256 曲线不匹配。
    #[error("invalid authentication credential: {reason}")]
    /// 凭据被拒绝的原因。
    Credential { reason: String },

    /// 服务端挑战缺失、不完整或超长。
    #[error("authentication challenge error: {reason}")]
    /// 挑战不可用的原因。
    AuthChallenge { reason: String },

    /// 对挑战签名失败。
    #[error("failed to sign authentication challenge")]
    Sign,
}

impl TransportError {
    pub(crate) fn io(kind: OperationKind, source: io::Error) -> Self {
        TransportError::Io { kind, source }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Io { kind, .. } => kind.code,
            TransportError::Tls { .. } => "ilp.transport.tls_handshake_failed",
            TransportError::TlsConfig { .. } => "ilp.transport.tls_config_invalid",
            TransportError::Credential { .. } => "ilp.transport.credential_invalid",
            TransportError::AuthChallenge { .. } => "ilp.transport.auth_challenge_invalid",
            TransportError::Sign => "ilp.transport.sign_failed",
        }
    }
}
