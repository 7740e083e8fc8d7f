#![doc = r#"
# ilp-transport

## 设计动机（Why）
- 为行协议发送端提供单条持久连接：明文 TCP 或基于 `rustls` 的 TLS；
- 服务端要求认证时，在连接可用前完成一次“key id → 挑战 → 签名”的往返。

## 核心契约（What）
- [`LineConnection::connect`]：建立连接，可选执行认证握手，成功返回时连接处于 [`LinkState::Ready`]；
- [`LineConnection::send`]：把一段完整行字节整体写出，失败时调用方的缓冲保持不变；
- [`LineConnection::close`]：关闭写方向并释放套接字；
- [`ChallengeSigner`]：由 [`Credential`] 构造，使用 ECDSA P-256 + SHA-256 对挑战签名。

## 实现策略（How）
- 连接与握手基于 tokio；TLS 使用 `tokio-rustls` 与 `ring` 加密提供者；
- 握手逻辑对任意 `AsyncRead + AsyncWrite` 泛型实现，测试可直接使用内存管道；
- 错误统一映射为 [`TransportError`]，并附带稳定错误码。

## 风险与考量（Trade-offs）
- 内部不设超时；调用方需要有界延迟时应在外层包裹截止时间；
- 握手结束后服务端不应再发送数据，意外到达的字节只记录日志并丢弃。
"#]
#![warn(missing_docs)]

mod connection;
mod credential;
mod error;
mod handshake;
mod tls;

pub use connection::{ConnectOptions, LineConnection, LinkState};
pub use credential::{ChallengeSigner, Credential, SignatureEncoding};
pub use error::{OperationKind, TransportError};
pub use handshake::{MAX_CHALLENGE_LEN, authenticate};
pub use tls::{CertificateAuthority, TlsConfig, build_client_config};
