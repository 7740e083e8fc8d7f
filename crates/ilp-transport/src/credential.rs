use std::fmt;

use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair,
    EcdsaSigningAlgorithm,
};
use serde::Deserialize;

use crate::error::TransportError;

/// P-256 坐标与私钥标量的字节长度。
const SCALAR_LEN: usize = 32;

/// 认证凭据：key id 与 P-256 密钥的 JWK 风格字段。
///
/// `d`、`x`、`y` 为 base64url（无填充，容忍结尾 `=`）编码的大端整数。
/// 私钥只用于本地签名，从不发送；`Debug` 输出会隐去 `d`。
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credential {
    #[serde(rename = "kid")]
    key_id: String,
    d: String,
    x: String,
    y: String,
}

impl Credential {
    /// 由 key id 与 base64url 编码的 `d`、`x`、`y` 构造凭据，不做校验。
    pub fn new(
        key_id: impl Into<String>,
        d: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            d: d.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    /// 认证时首先发送的 key id。
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// 检查 key id 能否作为一行发送。
    ///
    /// 密钥本身的合法性在构造 [`ChallengeSigner`] 时检查。
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.key_id.is_empty() {
            return Err(TransportError::Credential {
                reason: "key id must not be empty".into(),
            });
        }
        if self.key_id.contains(['\n', '\r']) {
            return Err(TransportError::Credential {
                reason: "key id must not contain line breaks".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kid", &self.key_id)
            .field("d", &"<redacted>")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

/// 签名的线上编码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    /// ASN.1 DER 编码的 `(r, s)`。
    #[default]
    Der,
    /// 定长 64 字节的 `r || s`。
    Fixed,
}

impl SignatureEncoding {
    fn algorithm(self) -> &'static EcdsaSigningAlgorithm {
        match self {
            SignatureEncoding::Der => &ECDSA_P256_SHA256_ASN1_SIGNING,
            SignatureEncoding::Fixed => &ECDSA_P256_SHA256_FIXED_SIGNING,
        }
    }
}

/// 使用 ECDSA P-256 + SHA-256 对服务端挑战签名。
pub struct ChallengeSigner {
    key_id: String,
    key_pair: EcdsaKeyPair,
    rng: SystemRandom,
}

impl fmt::Debug for ChallengeSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeSigner")
            .field("kid", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl ChallengeSigner {
    /// 解析凭据并校验私钥与公钥点匹配。
    pub fn new(
        credential: &Credential,
        encoding: SignatureEncoding,
    ) -> Result<Self, TransportError> {
        credential.validate()?;
        let private_key = decode_scalar("d", &credential.d)?;
        let x = decode_scalar("x", &credential.x)?;
        let y = decode_scalar("y", &credential.y)?;

        // 未压缩点：0x04 || x || y
        let mut public_key = Vec::with_capacity(1 + 2 * SCALAR_LEN);
        public_key.push(0x04);
        public_key.extend_from_slice(&x);
        public_key.extend_from_slice(&y);

        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_private_key_and_public_key(
            encoding.algorithm(),
            &private_key,
            &public_key,
            &rng,
        )
        .map_err(|rejected| TransportError::Credential {
            reason: format!("key rejected: {rejected}"),
        })?;

        Ok(Self {
            key_id: credential.key_id.clone(),
            key_pair,
            rng,
        })
    }

    /// 签名器对应的 key id。
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// 对挑战字节签名，返回标准 base64（带填充）文本，不含换行。
    pub fn sign(&self, challenge: &[u8]) -> Result<String, TransportError> {
        let signature = self
            .key_pair
            .sign(&self.rng, challenge)
            .map_err(|_| TransportError::Sign)?;
        Ok(Base64::encode_string(signature.as_ref()))
    }
}

/// 解码一个 base64url 大端整数并左侧补零到 32 字节。
fn decode_scalar(field: &'static str, text: &str) -> Result<[u8; SCALAR_LEN], TransportError> {
    let raw = Base64UrlUnpadded::decode_vec(text.trim_end_matches('=')).map_err(|err| {
        TransportError::Credential {
            reason: format!("field `{field}` is not valid base64url: {err}"),
        }
    })?;
    if raw.len() > SCALAR_LEN {
        return Err(TransportError::Credential {
            reason: format!(
                "field `{field}` is {} bytes, expected at most {SCALAR_LEN}",
                raw.len()
            ),
        });
    }
    let mut scalar = [0u8; SCALAR_LEN];
    scalar[SCALAR_LEN - raw.len()..].copy_from_slice(&raw);
    Ok(scalar)
}
