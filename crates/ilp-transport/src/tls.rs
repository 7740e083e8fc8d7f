use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use serde::Deserialize;
use tracing::debug;

use crate::error::TransportError;

/// 服务端证书的信任来源。
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateAuthority {
    /// 内置的 Mozilla 根证书集合（`webpki-roots`）。
    #[default]
    WebpkiRoots,
    /// PEM 格式的 CA 证书文件，可包含多张证书。
    PemFile(PathBuf),
}

/// TLS 开关与信任来源。
///
/// # 示例
/// ```toml
/// [tls]
/// enabled = true
/// ca = { pem-file = "/etc/ilp/ca.pem" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    /// 是否启用 TLS，默认关闭。
    pub enabled: bool,
    /// 服务端证书的信任来源。
    pub ca: CertificateAuthority,
}

impl TlsConfig {
    /// 启用 TLS 并信任内置根证书。
    pub fn webpki_roots() -> Self {
        Self {
            enabled: true,
            ca: CertificateAuthority::WebpkiRoots,
        }
    }

    /// 启用 TLS 并只信任给定 PEM 文件中的证书。
    pub fn pem_file(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            ca: CertificateAuthority::PemFile(path.into()),
        }
    }
}

/// 根据信任来源构造客户端配置。
///
/// 使用 `ring` 加密提供者显式构建，不依赖进程级默认 provider；
/// 不提供客户端证书。
pub fn build_client_config(config: &TlsConfig) -> Result<Arc<ClientConfig>, TransportError> {
    let roots = load_roots(&config.ca)?;
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let client = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|err| TransportError::TlsConfig {
            reason: err.to_string(),
        })?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(client))
}

fn load_roots(ca: &CertificateAuthority) -> Result<RootCertStore, TransportError> {
    let mut roots = RootCertStore::empty();
    match ca {
        CertificateAuthority::WebpkiRoots => {
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }
        CertificateAuthority::PemFile(path) => {
            let file = File::open(path).map_err(|err| TransportError::TlsConfig {
                reason: format!("cannot open CA file {}: {err}", path.display()),
            })?;
            let mut reader = BufReader::new(file);
            for cert in rustls_pemfile::certs(&mut reader) {
                let cert = cert.map_err(|err| TransportError::TlsConfig {
                    reason: format!("cannot parse CA file {}: {err}", path.display()),
                })?;
                roots.add(cert).map_err(|err| TransportError::TlsConfig {
                    reason: format!("rejected CA certificate in {}: {err}", path.display()),
                })?;
            }
            if roots.is_empty() {
                return Err(TransportError::TlsConfig {
                    reason: format!("no certificates found in {}", path.display()),
                });
            }
            debug!(path = %path.display(), certificates = roots.len(), "loaded CA bundle");
        }
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_roots_are_not_empty() {
        let roots = load_roots(&CertificateAuthority::WebpkiRoots).expect("内置根证书");
        assert!(!roots.is_empty());
        build_client_config(&TlsConfig::webpki_roots()).expect("构造客户端配置");
    }

    #[test]
    fn missing_pem_file_is_a_config_error() {
        let err = build_client_config(&TlsConfig::pem_file("/nonexistent/ilp-ca.pem"))
            .expect_err("文件不存在");
        assert_eq!(err.code(), "ilp.transport.tls_config_invalid");
    }

    #[test]
    fn pem_file_without_certificates_is_rejected() {
        let path = std::env::temp_dir().join(format!("ilp-empty-ca-{}.pem", std::process::id()));
        std::fs::write(&path, "not a certificate\n").expect("写入临时文件");
        let result = build_client_config(&TlsConfig::pem_file(&path));
        std::fs::remove_file(&path).ok();
        let err = result.expect_err("没有证书");
        assert!(err.to_string().contains("no certificates"));
    }

    #[test]
    fn disabled_by_default() {
        let config = TlsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.ca, CertificateAuthority::WebpkiRoots);
    }
}
