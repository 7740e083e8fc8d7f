use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::credential::ChallengeSigner;
use crate::error::{self, TransportError};

/// 挑战行（不含换行）允许的最大字节数。
pub const MAX_CHALLENGE_LEN: usize = 4096;

/// 执行一次认证往返：发送 key id，读取以 `\n` 结尾的挑战，回写 `base64(签名)\n`。
///
/// # 契约
/// - 挑战在换行之前的全部字节都参与签名，换行本身不参与；
/// - 服务端在给出完整挑战前关闭连接，返回 [`TransportError::AuthChallenge`]；
/// - 挑战之后同一批到达的多余字节不被解释，只记录告警。
pub async fn authenticate<S>(stream: &mut S, signer: &ChallengeSigner) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut announce = Vec::with_capacity(signer.key_id().len() + 1);
    announce.extend_from_slice(signer.key_id().as_bytes());
    announce.push(b'\n');
    stream
        .write_all(&announce)
        .await
        .map_err(|err| TransportError::io(error::WRITE, err))?;
    stream
        .flush()
        .await
        .map_err(|err| TransportError::io(error::WRITE, err))?;

    let challenge = read_challenge(stream).await?;
    debug!(challenge_len = challenge.len(), "received authentication challenge");

    let mut reply = signer.sign(&challenge)?.into_bytes();
    reply.push(b'\n');
    stream
        .write_all(&reply)
        .await
        .map_err(|err| TransportError::io(error::WRITE, err))?;
    stream
        .flush()
        .await
        .map_err(|err| TransportError::io(error::WRITE, err))
}

/// 读取直到第一个 `\n`，返回换行之前的字节。
///
/// 缓冲最多持有 `MAX_CHALLENGE_LEN + 1` 字节：足以容纳最长的挑战及其换行，
/// 超过即判定挑战超长，无论挑战与换行是否在同一次读取中到达。
async fn read_challenge<S>(stream: &mut S) -> Result<BytesMut, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(512);
    let mut scanned = 0;
    loop {
        if let Some(offset) = buf[scanned..].iter().position(|&b| b == b'\n') {
            let end = scanned + offset;
            if end > MAX_CHALLENGE_LEN {
                return Err(oversized_challenge());
            }
            let mut challenge = buf.split_to(end + 1);
            challenge.truncate(end);
            if !buf.is_empty() {
                warn!(
                    extra_bytes = buf.len(),
                    "unexpected bytes after authentication challenge; discarded"
                );
            }
            return Ok(challenge);
        }
        scanned = buf.len();
        if scanned > MAX_CHALLENGE_LEN {
            return Err(oversized_challenge());
        }
        let limit = (MAX_CHALLENGE_LEN + 1 - scanned) as u64;
        buf.reserve(512);
        let read = (&mut *stream)
            .take(limit)
            .read_buf(&mut buf)
            .await
            .map_err(|err| TransportError::io(error::READ, err))?;
        if read == 0 {
            return Err(TransportError::AuthChallenge {
                reason: format!(
                    "connection closed before challenge was complete ({scanned} bytes received)"
                ),
            });
        }
    }
}

fn oversized_challenge() -> TransportError {
    TransportError::AuthChallenge {
        reason: format!("challenge exceeds {MAX_CHALLENGE_LEN} bytes"),
    }
}
