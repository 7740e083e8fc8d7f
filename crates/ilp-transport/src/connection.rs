use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream};
use tracing::{debug, info, warn};

use crate::credential::{ChallengeSigner, Credential, SignatureEncoding};
use crate::error::{self, TransportError};
use crate::handshake::authenticate;
use crate::tls::{TlsConfig, build_client_config};

/// 连接生命周期。
///
/// `Disconnected → Connecting → (Authenticating) → Ready → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 没有可用连接。
    Disconnected,
    /// TCP 建连或 TLS 握手进行中。
    Connecting,
    /// 认证往返进行中。
    Authenticating,
    /// 可以发送行数据。
    Ready,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Authenticating => "authenticating",
            LinkState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// 建连参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// 服务端主机名或 IP，启用 TLS 时也用作 SNI 与证书校验名。
    pub host: String,
    /// 服务端端口。
    pub port: u16,
    /// TLS 开关与信任来源。
    pub tls: TlsConfig,
    /// 存在时在连接就绪前执行挑战应答认证。
    pub auth: Option<Credential>,
    /// 认证签名的线上编码。
    pub signature_encoding: SignatureEncoding,
}

impl ConnectOptions {
    /// 明文、无认证的连接参数。
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: TlsConfig::default(),
            auth: None,
            signature_encoding: SignatureEncoding::default(),
        }
    }

    /// 替换 TLS 配置。
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// 启用认证。
    pub fn with_auth(mut self, credential: Credential) -> Self {
        self.auth = Some(credential);
        self
    }

    /// 设置签名编码。
    pub fn with_signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.signature_encoding = encoding;
        self
    }
}

/// 明文或 TLS 套接字。
enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// 一条已就绪的行协议连接。
///
/// # 契约（What）
/// - 只能通过 [`LineConnection::connect`] 获得，获得时已完成 TLS 与认证；
/// - [`send`](Self::send) 是唯一的写路径，不缓冲，不重试；
/// - 服务端在就绪后不应再发送数据；每次发送前会检查并丢弃意外到达的字节。
pub struct LineConnection {
    stream: Stream,
    peer: SocketAddr,
    state: LinkState,
    peer_closed: bool,
}

impl fmt::Debug for LineConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineConnection")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("tls", &matches!(self.stream, Stream::Tls(_)))
            .finish()
    }
}

impl LineConnection {
    /// 建立连接，必要时执行 TLS 握手与认证。
    ///
    /// ## 实现逻辑（How）
    /// - 先构造 TLS 配置与签名器，配置错误不会打开任何套接字；
    /// - TCP 建连后设置 `TCP_NODELAY`；
    /// - TLS 证书校验失败时先关闭 TCP 套接字，再返回 [`TransportError::Tls`]；
    /// - 认证失败时同样关闭连接后返回错误。
    pub async fn connect(options: &ConnectOptions) -> Result<Self, TransportError> {
        let tls = if options.tls.enabled {
            let name = ServerName::try_from(options.host.clone()).map_err(|err| {
                TransportError::TlsConfig {
                    reason: format!("invalid server name {:?}: {err}", options.host),
                }
            })?;
            Some((TlsConnector::from(build_client_config(&options.tls)?), name))
        } else {
            None
        };
        let signer = options
            .auth
            .as_ref()
            .map(|credential| ChallengeSigner::new(credential, options.signature_encoding))
            .transpose()?;

        info!(
            host = %options.host,
            port = options.port,
            tls = options.tls.enabled,
            state = %LinkState::Connecting,
            "connecting"
        );
        let tcp = TcpStream::connect((options.host.as_str(), options.port))
            .await
            .map_err(|err| TransportError::io(error::CONNECT, err))?;
        tcp.set_nodelay(true)
            .map_err(|err| TransportError::io(error::CONFIGURE, err))?;
        let peer = tcp
            .peer_addr()
            .map_err(|err| TransportError::io(error::CONNECT, err))?;

        let mut stream = match tls {
            None => Stream::Plain(tcp),
            Some((connector, name)) => match connector.connect(name, tcp).into_fallible().await {
                Ok(stream) => Stream::Tls(Box::new(stream)),
                Err((source, mut tcp)) => {
                    warn!(%peer, error = %source, "tls handshake failed; closing socket");
                    if let Err(err) = tcp.shutdown().await {
                        debug!(%peer, error = %err, "shutdown after tls rejection failed");
                    }
                    drop(tcp);
                    return Err(TransportError::Tls {
                        host: options.host.clone(),
                        source,
                    });
                }
            },
        };

        if let Some(signer) = signer {
            info!(
                %peer,
                key_id = signer.key_id(),
                state = %LinkState::Authenticating,
                "authenticating"
            );
            if let Err(err) = authenticate(&mut stream, &signer).await {
                warn!(%peer, code = err.code(), "authentication failed; closing connection");
                if let Err(err) = stream.shutdown().await {
                    debug!(%peer, error = %err, "shutdown after authentication failure failed");
                }
                return Err(err);
            }
        }

        info!(%peer, state = %LinkState::Ready, "connection ready");
        Ok(Self {
            stream,
            peer,
            state: LinkState::Ready,
            peer_closed: false,
        })
    }

    /// 对端地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// 当前生命周期状态；持有的连接总是 [`LinkState::Ready`]。
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// 是否经由 TLS。
    pub fn is_tls(&self) -> bool {
        matches!(self.stream, Stream::Tls(_))
    }

    /// 整体写出 `bytes` 并刷新。
    ///
    /// 返回 `Ok` 表示全部字节已交给内核（TLS 下为已加密写出）；
    /// 返回错误时写出了多少字节不可知，调用方应保留自己的缓冲。
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.drain_unsolicited();
        if bytes.is_empty() {
            return Ok(());
        }
        self.stream
            .write_all(bytes)
            .await
            .map_err(|err| TransportError::io(error::WRITE, err))?;
        self.stream
            .flush()
            .await
            .map_err(|err| TransportError::io(error::WRITE, err))?;
        debug!(peer = %self.peer, bytes = bytes.len(), "sent");
        Ok(())
    }

    /// 不等待地读取并丢弃服务端在就绪后发送的字节，返回丢弃的字节数。
    pub fn drain_unsolicited(&mut self) -> usize {
        if self.peer_closed {
            return 0;
        }
        let mut scratch = [0u8; 1024];
        let mut dropped = 0;
        loop {
            match self.stream.read(&mut scratch).now_or_never() {
                Some(Ok(0)) => {
                    warn!(peer = %self.peer, "server closed its side of the connection");
                    self.peer_closed = true;
                    break;
                }
                Some(Ok(read)) => dropped += read,
                Some(Err(err)) => {
                    warn!(peer = %self.peer, error = %err, "read error while draining socket");
                    break;
                }
                None => break,
            }
        }
        if dropped > 0 {
            warn!(
                peer = %self.peer,
                bytes = dropped,
                "unsolicited bytes from server after handshake; discarded"
            );
        }
        dropped
    }

    /// 关闭写方向（TLS 下先发送 `close_notify`）并释放套接字。
    pub async fn close(mut self) -> Result<(), TransportError> {
        self.state = LinkState::Disconnected;
        let result = self
            .stream
            .shutdown()
            .await
            .map_err(|err| TransportError::io(error::SHUTDOWN, err));
        info!(peer = %self.peer, state = %self.state, "connection closed");
        result
    }
}
