use std::fs;
use std::path::{Path, PathBuf};

use ilp_buffer::DEFAULT_CAPACITY;
use ilp_transport::{ConnectOptions, Credential, SignatureEncoding, TlsConfig};
use serde::Deserialize;
use thiserror::Error;

/// 默认服务端地址。
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// 默认行协议端口。
pub const DEFAULT_PORT: u16 = 9009;

/// 配置读取或校验失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件不可读。
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        /// 尝试读取的路径。
        path: PathBuf,
        /// 底层 I/O 错误。
        #[source]
        source: std::io::Error,
    },

    /// TOML 语法错误、类型不符或出现未知字段。
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段取值不合法。
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// 出错的字段路径。
        field: &'static str,
        /// 不合法的原因。
        reason: String,
    },
}

impl ConfigError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "ilp.config.read_failed",
            ConfigError::Parse(_) => "ilp.config.parse_failed",
            ConfigError::Invalid { .. } => "ilp.config.invalid",
        }
    }
}

/// 发送端配置。
///
/// # 契约（What）
/// - `init_buf_size`：缓冲初始容量（字节），必须大于 0，默认 8192；
/// - `host`/`port`：服务端地址，默认 `127.0.0.1:9009`；
/// - `tls`：是否启用 TLS 及信任来源；
/// - `auth`：可选认证凭据，存在时建连后执行挑战应答；
/// - `signature_encoding`：签名编码，`der`（默认）或 `fixed`。
///
/// # TOML 示例
/// ```toml
/// init_buf_size = 65536
/// host = "db.internal"
/// port = 9009
/// signature_encoding = "der"
///
/// [tls]
/// enabled = true
/// ca = "webpki-roots"
///
/// [auth]
/// kid = "testUser1"
/// d = "5UjEMuA0Pj5pjK8a-fa24dyIf-Es5mYny3oE_Wmus48"
/// x = "fLKYEaoEb9lrn3nkwLDA-M_xnuFOdSt9y0Z7_vWSHLU"
/// y = "Dt5tbS1dEDMSYfym3fgMv0B99szno-dFc1rYF9t0aac"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    /// 缓冲初始容量（字节）。
    pub init_buf_size: usize,
    /// 服务端地址。
    pub host: String,
    /// 服务端端口。
    pub port: u16,
    /// TLS 配置。
    pub tls: TlsConfig,
    /// 可选认证凭据。
    pub auth: Option<Credential>,
    /// 认证签名编码。
    pub signature_encoding: SignatureEncoding,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            init_buf_size: DEFAULT_CAPACITY,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: TlsConfig::default(),
            auth: None,
            signature_encoding: SignatureEncoding::default(),
        }
    }
}

impl SenderConfig {
    /// 解析 TOML 文本并校验，未知字段会被拒绝。
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: SenderConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 读取并解析 TOML 文件。
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// 设置缓冲初始容量。
    pub fn with_init_buf_size(mut self, bytes: usize) -> Self {
        self.init_buf_size = bytes;
        self
    }

    /// 设置服务端地址。
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// 设置服务端端口。
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 设置 TLS 配置。
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// 启用认证。
    pub fn with_auth(mut self, credential: Credential) -> Self {
        self.auth = Some(credential);
        self
    }

    /// 设置认证签名编码。
    pub fn with_signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.signature_encoding = encoding;
        self
    }

    /// 检查字段取值；密钥本身是否落在曲线上要到建连时才检查。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.init_buf_size == 0 {
            return Err(ConfigError::Invalid {
                field: "init_buf_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: "must not be empty".into(),
            });
        }
        if let Some(credential) = &self.auth {
            credential
                .validate()
                .map_err(|err| ConfigError::Invalid {
                    field: "auth.kid",
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }

    pub(crate) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            port: self.port,
            tls: self.tls.clone(),
            auth: self.auth.clone(),
            signature_encoding: self.signature_encoding,
        }
    }
}
