use std::fmt;

use bytes::Bytes;
use ilp_codec_line::{IntegralValue, LineEncoder, RowState};
use ilp_transport::{ConnectOptions, LineConnection, LinkState};
use tracing::{debug, info, warn};

use crate::config::SenderConfig;
use crate::error::SenderError;

/// 一次刷出的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flushed {
    /// 没有完整行，未触碰连接。
    Nothing,
    /// 发送了这么多字节的完整行。
    Sent {
        /// 写出的字节数。
        bytes: usize,
    },
}

/// 行协议发送端：一块缓冲、一个行游标、至多一条连接。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 行构造全部在内存中完成，只有 [`connect`](Self::connect)、[`flush`](Self::flush)
///   与 [`close`](Self::close) 会挂起调用方；
/// - 刷出只发送已终止的行，正在构造的半行永远不会出现在线上。
///
/// ## 契约（What）
/// - 行构造方法失败时缓冲与行状态保持调用前的样子；
/// - `flush` 成功后压缩缓冲，半行搬到偏移 0；发送失败时缓冲不变，连接被丢弃，
///   调用方可以重新 `connect` 后再次 `flush`；
/// - `close` 不会清空缓冲，未刷出的数据只有 [`reset`](Self::reset) 或丢弃发送端时才会丢失。
///
/// ## 注意事项（Trade-offs）
/// - 不是线程安全的共享对象，所有调用需由调用方串行化；
/// - 内部不设超时，需要有界延迟时在外层包裹截止时间。
pub struct Sender {
    encoder: LineEncoder,
    options: ConnectOptions,
    connection: Option<LineConnection>,
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("host", &self.options.host)
            .field("port", &self.options.port)
            .field("link_state", &self.link_state())
            .field("buffered_bytes", &self.buffered_bytes())
            .field("pending_bytes", &self.pending_bytes())
            .finish()
    }
}

impl Sender {
    /// 校验配置并分配缓冲，不建立连接。
    pub fn new(config: SenderConfig) -> Result<Self, SenderError> {
        config.validate()?;
        let encoder = LineEncoder::new(config.init_buf_size)?;
        Ok(Self {
            encoder,
            options: config.connect_options(),
            connection: None,
        })
    }

    /// 按配置建立连接（含 TLS 与认证）。
    ///
    /// 已连接时返回 [`SenderError::AlreadyConnected`]，现有连接不受影响。
    pub async fn connect(&mut self) -> Result<(), SenderError> {
        if self.connection.is_some() {
            return Err(SenderError::AlreadyConnected);
        }
        let connection = LineConnection::connect(&self.options).await?;
        self.connection = Some(connection);
        Ok(())
    }

    /// 当前连接状态；未连接或连接已被丢弃时为 [`LinkState::Disconnected`]。
    pub fn link_state(&self) -> LinkState {
        self.connection
            .as_ref()
            .map_or(LinkState::Disconnected, LineConnection::state)
    }

    /// 开始一行并写入表名。
    pub fn table(&mut self, name: &str) -> Result<&mut Self, SenderError> {
        self.encoder.table(name)?;
        Ok(self)
    }

    /// 追加一个符号列；必须位于所有普通列之前。
    pub fn symbol<V: fmt::Display>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<&mut Self, SenderError> {
        self.encoder.symbol(name, value)?;
        Ok(self)
    }

    /// 追加一个带引号的字符串列。
    pub fn str_column(&mut self, name: &str, value: &str) -> Result<&mut Self, SenderError> {
        self.encoder.str_column(name, value)?;
        Ok(self)
    }

    /// 追加一个布尔列（`t`/`f`）。
    pub fn bool_column(&mut self, name: &str, value: bool) -> Result<&mut Self, SenderError> {
        self.encoder.bool_column(name, value)?;
        Ok(self)
    }

    /// 追加一个浮点列。
    pub fn float_column(&mut self, name: &str, value: f64) -> Result<&mut Self, SenderError> {
        self.encoder.float_column(name, value)?;
        Ok(self)
    }

    /// 追加一个带 `i` 后缀的整数列；浮点参数必须是整数值。
    pub fn int_column<V: IntegralValue>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<&mut Self, SenderError> {
        self.encoder.int_column(name, value)?;
        Ok(self)
    }

    /// 追加一个带 `t` 后缀的时间戳列。
    pub fn timestamp_column<V: IntegralValue>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<&mut Self, SenderError> {
        self.encoder.timestamp_column(name, value)?;
        Ok(self)
    }

    /// 以十进制纳秒文本结束当前行。
    pub fn at(&mut self, timestamp: &str) -> Result<(), SenderError> {
        Ok(self.encoder.at(timestamp)?)
    }

    /// 以纳秒时间戳结束当前行。
    pub fn at_nanos(&mut self, epoch_nanos: i64) -> Result<(), SenderError> {
        Ok(self.encoder.at_nanos(epoch_nanos)?)
    }

    /// 不带指定时间戳结束当前行。
    pub fn at_now(&mut self) -> Result<(), SenderError> {
        Ok(self.encoder.at_now()?)
    }

    /// 发送全部完整行。
    ///
    /// ## 实现逻辑（How）
    /// - 没有完整行时直接返回 [`Flushed::Nothing`]，即使尚未连接；
    /// - 有完整行但未连接时返回 [`SenderError::NotConnected`]；
    /// - 发送成功才压缩缓冲；失败时缓冲不变并丢弃已损坏的连接。
    pub async fn flush(&mut self) -> Result<Flushed, SenderError> {
        let pending = self.pending_bytes();
        if pending == 0 {
            debug!("flush skipped; no completed rows");
            return Ok(Flushed::Nothing);
        }
        let Some(connection) = self.connection.as_mut() else {
            return Err(SenderError::NotConnected { operation: "flush" });
        };
        if let Err(err) = connection.send(self.encoder.completed()).await {
            warn!(
                code = err.code(),
                pending_bytes = pending,
                "flush failed; buffer kept, connection dropped"
            );
            self.connection = None;
            return Err(err.into());
        }
        self.encoder.compact();
        info!(
            sent_bytes = pending,
            retained_bytes = self.buffered_bytes(),
            "flushed"
        );
        Ok(Flushed::Sent { bytes: pending })
    }

    /// 关闭连接；缓冲内容保留。
    pub async fn close(&mut self) -> Result<(), SenderError> {
        let Some(connection) = self.connection.take() else {
            return Err(SenderError::NotConnected { operation: "close" });
        };
        let unflushed = self.pending_bytes();
        if unflushed > 0 {
            warn!(unflushed_bytes = unflushed, "closing with completed rows not flushed");
        }
        connection.close().await?;
        Ok(())
    }

    /// 取出完整行前缀并压缩，用于不经过连接的离线场景。
    pub fn take_completed(&mut self) -> Bytes {
        self.encoder.take_completed()
    }

    /// 清空缓冲与行状态，保留容量与连接。
    pub fn reset(&mut self) {
        self.encoder.reset();
    }

    /// 已完成、等待刷出的字节数。
    pub fn pending_bytes(&self) -> usize {
        self.encoder.buffer().end_of_last_row()
    }

    /// 缓冲中的全部字节数，包括进行中的半行。
    pub fn buffered_bytes(&self) -> usize {
        self.encoder.buffer().position()
    }

    /// 是否有尚未结束的行。
    pub fn row_in_progress(&self) -> bool {
        self.encoder.state().in_row()
    }

    /// 当前行状态。
    pub fn row_state(&self) -> RowState {
        self.encoder.state()
    }

    /// 当前缓冲容量。
    pub fn capacity(&self) -> usize {
        self.encoder.buffer().capacity()
    }

    /// 缓冲中的全部字节，包括进行中的半行。
    pub fn as_bytes(&self) -> &[u8] {
        self.encoder.buffer().as_bytes()
    }
}
