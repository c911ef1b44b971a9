//! Bidirectional byte relay with half-close propagation.
//!
//! Each direction is copied until its reader hits end-of-stream or an error;
//! the matching writer is then shut down so the peer sees EOF while the other
//! direction keeps draining. The relay returns once both directions are done.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Copy buffer size per direction.
pub const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Bytes moved in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub client_to_remote: u64,
    pub remote_to_client: u64,
}

/// Relay between `client` and `remote` until both directions finish.
pub async fn relay<A, B>(client: A, remote: B) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_reader, mut client_writer) = tokio::io::split(client);
    let (mut remote_reader, mut remote_writer) = tokio::io::split(remote);

    let (client_to_remote, remote_to_client) = tokio::join!(
        pipe(&mut client_reader, &mut remote_writer),
        pipe(&mut remote_reader, &mut client_writer),
    );

    RelayStats {
        client_to_remote,
        remote_to_client,
    }
}

async fn pipe<R, W>(reader: &mut R, writer: &mut W) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if writer.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                total += n as u64;
            }
        }
    }

    // Half-close: the peer sees EOF, the opposite direction stays open.
    let _ = writer.shutdown().await;
    total
}
