//! `connect_contract` 集成测试：在回环地址上验证建连、TLS 与认证握手。
//!
//! # 测试总览
//! - 明文连接上的完整认证往返：服务端读 key id、下发挑战、用公钥验签后接收数据；
//! - 自签名证书 + PEM 信任文件的 TLS 连接可以正常收发；
//! - 只信任内置根证书时，自签名服务端被拒绝并返回 TLS 错误；
//! - 建连被拒时 I/O 错误携带可命名的 `OperationKind`。

use std::sync::Arc;

use anyhow::{Context, Result};
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use ilp_transport::{
    ConnectOptions, Credential, LineConnection, LinkState, OperationKind, SignatureEncoding,
    TlsConfig, TransportError,
};
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P256_SHA256_FIXED,
    EcdsaKeyPair, KeyPair, UnparsedPublicKey,
};
use rustls::ServerConfig;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// 生成一把 P-256 密钥，返回凭据与未压缩公钥点。
fn credential(key_id: &str) -> Result<(Credential, Vec<u8>)> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
        .map_err(|_| anyhow::anyhow!("生成密钥失败"))?;
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
        .map_err(|err| anyhow::anyhow!("解析 pkcs8 失败: {err}"))?;
    let public = key_pair.public_key().as_ref().to_vec();
    let credential = Credential::new(
        key_id,
        Base64UrlUnpadded::encode_string(&pkcs8.as_ref()[36..68]),
        Base64UrlUnpadded::encode_string(&public[1..33]),
        Base64UrlUnpadded::encode_string(&public[33..65]),
    );
    Ok((credential, public))
}

/// 为 `localhost` 签发自签名证书，返回服务端配置与 PEM 文本。
fn self_signed_server() -> Result<(Arc<ServerConfig>, String)> {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .context("签发自签名证书失败")?;
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));
    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .context("协议版本")?
    .with_no_client_auth()
    .with_single_cert(vec![certified.cert.der().clone()], key)
    .context("构建服务端 TLS 配置失败")?;
    Ok((Arc::new(config), certified.cert.pem()))
}

#[tokio::test]
async fn authenticated_plain_connection_delivers_rows() -> Result<()> {
    let (credential, public) = credential("testUser1")?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        let mut socket = BufReader::new(socket);
        let mut kid = String::new();
        socket.read_line(&mut kid).await?;
        socket.get_mut().write_all(b"challenge-abc\n").await?;
        let mut reply = String::new();
        socket.read_line(&mut reply).await?;
        let signature = Base64::decode_vec(reply.trim_end())
            .map_err(|err| anyhow::anyhow!("签名不是 base64: {err}"))?;
        UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, &public)
            .verify(b"challenge-abc", &signature)
            .map_err(|_| anyhow::anyhow!("签名验证失败"))?;
        let mut rows = Vec::new();
        socket.read_to_end(&mut rows).await?;
        anyhow::Ok((kid, rows))
    });

    let options = ConnectOptions::new("127.0.0.1", port)
        .with_auth(credential)
        .with_signature_encoding(SignatureEncoding::Fixed);
    let mut conn = LineConnection::connect(&options).await?;
    assert_eq!(conn.state(), LinkState::Ready);
    conn.send(b"weather,city=London temp=23.5 1465839830100400000\n")
        .await?;
    conn.close().await?;

    let (kid, rows) = server.await??;
    assert_eq!(kid, "testUser1\n");
    assert_eq!(rows, b"weather,city=London temp=23.5 1465839830100400000\n");
    Ok(())
}

#[tokio::test]
async fn server_closing_during_challenge_fails_connect() -> Result<()> {
    let (credential, _) = credential("kid")?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let mut kid = [0u8; 4];
        socket.read_exact(&mut kid).await?;
        socket.write_all(b"no-newline").await?;
        anyhow::Ok(())
    });

    let options = ConnectOptions::new("127.0.0.1", port).with_auth(credential);
    let err = LineConnection::connect(&options)
        .await
        .expect_err("挑战不完整时建连失败");
    assert!(matches!(err, TransportError::AuthChallenge { .. }));
    server.await??;
    Ok(())
}

#[tokio::test]
async fn tls_with_pem_trust_round_trips() -> Result<()> {
    let (server_config, pem) = self_signed_server()?;
    let ca_path = std::env::temp_dir().join(format!("ilp-test-ca-{}.pem", std::process::id()));
    std::fs::write(&ca_path, pem)?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let acceptor = TlsAcceptor::from(server_config);
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        let mut tls = acceptor.accept(socket).await?;
        let mut rows = Vec::new();
        tls.read_to_end(&mut rows).await?;
        anyhow::Ok(rows)
    });

    let options = ConnectOptions::new("localhost", port).with_tls(TlsConfig::pem_file(&ca_path));
    let result = async {
        let mut conn = LineConnection::connect(&options).await?;
        assert!(conn.is_tls());
        conn.send(b"t ok=t\n").await?;
        conn.close().await
    }
    .await;
    std::fs::remove_file(&ca_path).ok();
    result?;

    assert_eq!(server.await??, b"t ok=t\n");
    Ok(())
}

#[tokio::test]
async fn untrusted_certificate_is_rejected() -> Result<()> {
    let (server_config, _) = self_signed_server()?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let acceptor = TlsAcceptor::from(server_config);
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await?;
        // 客户端拒绝证书后关闭连接，服务端握手必然失败
        anyhow::Ok(acceptor.accept(socket).await.is_err())
    });

    let options = ConnectOptions::new("localhost", port).with_tls(TlsConfig::webpki_roots());
    let err = LineConnection::connect(&options)
        .await
        .expect_err("自签名证书不受内置根证书信任");
    assert_eq!(err.code(), "ilp.transport.tls_handshake_failed");
    assert!(server.await??);
    Ok(())
}

#[tokio::test]
async fn refused_connect_exposes_operation_kind() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let err = LineConnection::connect(&ConnectOptions::new("127.0.0.1", port))
        .await
        .err()
        .context("端口已关闭，建连应失败")?;
    let kind: OperationKind = match err {
        TransportError::Io { kind, .. } => kind,
        other => anyhow::bail!("unexpected error {other:?}"),
    };
    assert_eq!(kind.code, "ilp.transport.connect_failed");
    assert_eq!(kind.message, "tcp connect");
    Ok(())
}
