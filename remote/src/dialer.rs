//! Dialing real upstream addresses (spec §4.8).

use std::time::Duration;

use tokio::net::TcpStream;

/// Why an upstream dial failed — surfaced to the local side as the `msg`
/// field of a `connect` reply with `ok=false` (spec §4.8/§7).
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("connect failed: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn dial(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, DialError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| DialError::Timeout(timeout))??;
    stream.set_nodelay(true).ok();
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn dials_a_listening_port_successfully() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let result = dial("127.0.0.1", addr.port(), Duration::from_secs(5)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn fails_against_a_closed_port() {
        // Port 0 never accepts; connecting to an unbound loopback port
        // should refuse immediately rather than hang.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = dial("127.0.0.1", addr.port(), Duration::from_secs(2)).await;
        assert!(result.is_err());
    }
}
