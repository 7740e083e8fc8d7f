#![doc = r#"
# ilp-sender

## 设计动机（Why）
- 把行编码器、可增长缓冲与单条持久连接组合成调用方直接使用的发送端；
- 刷出只发送已终止的行，正在构造的半行在压缩后被搬到缓冲起点继续构造。

## 核心契约（What）
- [`Sender::new`]：校验 [`SenderConfig`] 并分配缓冲，不建立连接；
- [`Sender::connect`]：建立 TCP/TLS 连接并按需认证，重复调用返回 [`SenderError::AlreadyConnected`]；
- 行构造：`table` → `symbol`* → `*_column`* → `at`/`at_nanos`/`at_now`；
- [`Sender::flush`]：发送 `[0, end_of_last_row)`，成功后压缩；失败时缓冲不变；
- [`Sender::close`]：关闭连接，不清空缓冲。

## 实现策略（How）
- 编码与状态机位于 `ilp-codec-line`，缓冲位于 `ilp-buffer`，连接与认证位于 `ilp-transport`；
- 所有错误汇总为 [`SenderError`]，附带稳定错误码与可恢复性判断。

## 示例
```no_run
use ilp_sender::{Sender, SenderConfig};

# async fn demo() -> Result<(), ilp_sender::SenderError> {
let mut sender = Sender::new(SenderConfig::default().with_host("127.0.0.1"))?;
sender.connect().await?;
sender
    .table("weather")?
    .symbol("city", "London")?
    .float_column("temp", 23.5)?
    .at("1465839830100400000")?;
sender.flush().await?;
sender.close().await?;
# Ok(())
# }
```
"#]
#![warn(missing_docs)]

mod config;
mod error;
mod sender;

pub use config::{ConfigError, DEFAULT_HOST, DEFAULT_PORT, SenderConfig};
pub use error::SenderError;
pub use sender::{Flushed, Sender};

pub use ilp_buffer::{CapacityError, DEFAULT_CAPACITY};
pub use ilp_codec_line::{
    IntegralValue, MAX_NAME_LENGTH, NameKind, RowState, SequenceError, ValidationError,
};
pub use ilp_transport::{
    CertificateAuthority, Credential, LinkState, OperationKind, SignatureEncoding, TlsConfig,
    TransportError,
};
