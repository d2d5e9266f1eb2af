//! Length-prefixed framing.
//!
//! ```text
//! [u32 BE: len][bytes of len]
//! ```
//!
//! A call is two frames each way: a small JSON header, then the payload.
//!
//! ```text
//! request:  [header {"serialize", "request_id"}][call envelope]
//! response: [header {"status"}][result envelope]
//! ```

use super::{RequestHeader, ResponseHeader, TransportRequest, TransportResponse};
use crate::config::RpcConfig;
use crate::{Result, RpcError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read one frame. Returns `None` on clean EOF before the length prefix.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > RpcConfig::MAX_FRAME_SIZE {
        return Err(RpcError::malformed(format!(
            "frame size {} exceeds maximum {}",
            len,
            RpcConfig::MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(payload))
}

/// Write one frame without flushing.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > RpcConfig::MAX_FRAME_SIZE {
        return Err(RpcError::malformed(format!(
            "frame size {} exceeds maximum {}",
            payload.len(),
            RpcConfig::MAX_FRAME_SIZE
        )));
    }
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    Ok(())
}

pub async fn write_request<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    request: &TransportRequest,
) -> Result<()> {
    let header = serde_json::to_vec(&RequestHeader {
        serialize: request.serialize,
        request_id: request.request_id.clone(),
    })?;
    write_frame(writer, &header).await?;
    write_frame(writer, &request.payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request. `None` means the peer closed the connection between calls.
pub async fn read_request<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Option<TransportRequest>> {
    let Some(header) = read_frame(reader).await? else {
        return Ok(None);
    };
    let header: RequestHeader = serde_json::from_slice(&header)
        .map_err(|e| RpcError::malformed(format!("request header: {}", e)))?;
    let payload = read_frame(reader)
        .await?
        .ok_or_else(|| RpcError::malformed("connection closed before request payload"))?;

    Ok(Some(TransportRequest {
        payload,
        serialize: header.serialize,
        request_id: header.request_id,
    }))
}

pub async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &TransportResponse,
) -> Result<()> {
    let header = serde_json::to_vec(&ResponseHeader {
        status: response.status,
    })?;
    write_frame(writer, &header).await?;
    write_frame(writer, &response.payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_response<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<TransportResponse> {
    let header = read_frame(reader)
        .await?
        .ok_or_else(|| RpcError::malformed("connection closed before response"))?;
    let header: ResponseHeader = serde_json::from_slice(&header)
        .map_err(|e| RpcError::malformed(format!("response header: {}", e)))?;
    let payload = read_frame(reader)
        .await?
        .ok_or_else(|| RpcError::malformed("connection closed before response payload"))?;

    Ok(TransportResponse {
        payload,
        status: header.status,
    })
}
