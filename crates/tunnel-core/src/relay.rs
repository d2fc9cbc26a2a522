use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bytes moved per read in either direction.
pub const CHUNK_SIZE: usize = 1024;

/// Relay bytes between a client socket and a forwarding channel until either
/// side half-closes or errors.
///
/// The two directions are raced with `select!`; a zero-length read on either
/// stream terminates the relay. Both endpoints are shut down on the way out,
/// each close wrapped so one failure never prevents the other.
pub async fn relay_streams<C, F>(mut client: C, mut channel: F) -> std::io::Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
    F: AsyncRead + AsyncWrite + Unpin,
{
    let mut client_buf = [0u8; CHUNK_SIZE];
    let mut channel_buf = [0u8; CHUNK_SIZE];

    let outcome = loop {
        tokio::select! {
            read = client.read(&mut client_buf) => match read {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    if let Err(err) = channel.write_all(&client_buf[..n]).await {
                        break Err(err);
                    }
                }
                Err(err) => break Err(err),
            },
            read = channel.read(&mut channel_buf) => match read {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    if let Err(err) = client.write_all(&channel_buf[..n]).await {
                        break Err(err);
                    }
                }
                Err(err) => break Err(err),
            },
        }
    };

    let _ = client.shutdown().await;
    let _ = channel.shutdown().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn moves_bytes_in_both_directions() {
        let (client_near, client_far) = io::duplex(64);
        let (channel_near, channel_far) = io::duplex(64);
        let relay = tokio::spawn(relay_streams(client_far, channel_far));

        let (mut client, mut channel) = (client_near, channel_near);
        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        channel.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        channel.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(client);
        assert!(relay.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn client_half_close_tears_down_channel() {
        let (client_near, client_far) = io::duplex(64);
        let (mut channel_near, channel_far) = io::duplex(64);
        let relay = tokio::spawn(relay_streams(client_far, channel_far));

        drop(client_near);
        let mut buf = [0u8; 1];
        let read = channel_near.read(&mut buf).await.unwrap();
        assert_eq!(read, 0, "channel should see EOF after client close");
        assert!(relay.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn channel_half_close_tears_down_client() {
        let (mut client_near, client_far) = io::duplex(64);
        let (channel_near, channel_far) = io::duplex(64);
        let relay = tokio::spawn(relay_streams(client_far, channel_far));

        drop(channel_near);
        let mut buf = [0u8; 1];
        let read = client_near.read(&mut buf).await.unwrap();
        assert_eq!(read, 0, "client should see EOF after channel close");
        assert!(relay.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn preserves_byte_order_across_chunks() {
        let (client_near, client_far) = io::duplex(8 * 1024);
        let (channel_near, channel_far) = io::duplex(8 * 1024);
        let relay = tokio::spawn(relay_streams(client_far, channel_far));

        let payload: Vec<u8> = (0..(3 * CHUNK_SIZE + 17)).map(|i| (i % 251) as u8).collect();
        let (mut client, mut channel) = (client_near, channel_near);
        let expected = payload.clone();
        let writer = tokio::spawn(async move {
            client.write_all(&payload).await.unwrap();
            drop(client);
        });
        let mut received = Vec::new();
        channel.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, expected);

        writer.await.unwrap();
        assert!(relay.await.unwrap().is_ok());
    }
}
