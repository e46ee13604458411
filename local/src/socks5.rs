//! SOCKS5 greeting and CONNECT request handling (spec §4.1).
//!
//! This is the fixed, well-known handshake spec.md §1 treats as an external
//! collaborator (out of scope for the multiplexing core), so it is parsed
//! by hand against `AsyncRead`/`AsyncWrite` rather than pulled in from a
//! crate — matching the out-of-scope framing and grounded byte-for-byte in
//! `examples/original_source/detour2/local/socks5.py`.

use std::net::{Ipv4Addr, Ipv6Addr};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const SOCKS5_VERSION: u8 = 0x05;
const NO_AUTH: u8 = 0x00;
const NO_ACCEPTABLE_METHOD: u8 = 0xFF;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

const REPLY_OK: u8 = 0x00;
const REPLY_GENERAL_FAILURE: u8 = 0x01;
const REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
const REPLY_ADDR_TYPE_NOT_SUPPORTED: u8 = 0x08;

/// A parsed SOCKS5 CONNECT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Request {
    pub addr: String,
    pub port: u16,
}

/// Errors from the greeting/request parse. All are treated as "close the
/// downstream silently" by callers (spec §4.1/§7); the variant exists so
/// the cause is still visible in logs.
#[derive(Debug, thiserror::Error)]
pub enum Socks5Error {
    #[error("I/O error during SOCKS5 negotiation: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the greeting + request parse. Returns `Ok(None)` for every case the
/// spec says to handle by closing the downstream (malformed greeting,
/// unsupported method, unsupported command, unsupported address type) —
/// the appropriate wire reply, if any, has already been written.
pub async fn accept<S>(stream: &mut S) -> Result<Option<Socks5Request>, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !handshake(stream).await? {
        return Ok(None);
    }
    get_request(stream).await
}

/// Perform version/method negotiation. Returns `Ok(false)` when the
/// connection should be silently closed (no methods offered because the
/// client disconnected immediately, matching spec.md §8 scenario S6) or
/// after writing the "no acceptable method" reply.
async fn handshake<S>(stream: &mut S) -> Result<bool, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; 2];
    let n = stream.read(&mut header).await?;
    if n < 2 {
        // Client connected and disconnected before sending a full greeting.
        return Ok(false);
    }
    let (version, nmethods) = (header[0], header[1]);
    if version != SOCKS5_VERSION || nmethods == 0 {
        let _ = stream.write_all(&[SOCKS5_VERSION, NO_ACCEPTABLE_METHOD]).await;
        return Ok(false);
    }

    let mut methods = vec![0u8; nmethods as usize];
    stream.read_exact(&mut methods).await?;

    if methods.contains(&NO_AUTH) {
        stream.write_all(&[SOCKS5_VERSION, NO_AUTH]).await?;
        Ok(true)
    } else {
        let _ = stream.write_all(&[SOCKS5_VERSION, NO_ACCEPTABLE_METHOD]).await;
        Ok(false)
    }
}

/// Parse the CONNECT request. Writes a rejection reply and returns
/// `Ok(None)` for unsupported commands/address types.
async fn get_request<S>(stream: &mut S) -> Result<Option<Socks5Request>, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    let (_version, cmd, _rsv, atyp) = (head[0], head[1], head[2], head[3]);

    let addr = match atyp {
        ATYP_IPV4 => {
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await?;
            Ipv4Addr::from(buf).to_string()
        }
        ATYP_IPV6 => {
            let mut buf = [0u8; 16];
            stream.read_exact(&mut buf).await?;
            format!("[{}]", Ipv6Addr::from(buf))
        }
        ATYP_DOMAIN => {
            let mut len_buf = [0u8; 1];
            stream.read_exact(&mut len_buf).await?;
            let mut buf = vec![0u8; len_buf[0] as usize];
            stream.read_exact(&mut buf).await?;
            String::from_utf8_lossy(&buf).into_owned()
        }
        _ => {
            write_reply(stream, REPLY_ADDR_TYPE_NOT_SUPPORTED).await.ok();
            return Ok(None);
        }
    };

    let mut port_buf = [0u8; 2];
    stream.read_exact(&mut port_buf).await?;
    let port = u16::from_be_bytes(port_buf);

    if cmd != CMD_CONNECT {
        write_reply(stream, REPLY_COMMAND_NOT_SUPPORTED).await.ok();
        return Ok(None);
    }

    Ok(Some(Socks5Request { addr, port }))
}

/// Write the final CONNECT reply. Per spec.md §6, the bound address is
/// always the fixed `0.0.0.0:0`, regardless of the real upstream address.
pub async fn reply<S>(stream: &mut S, ok: bool) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let code = if ok { REPLY_OK } else { REPLY_GENERAL_FAILURE };
    write_reply(stream, code).await
}

async fn write_reply<S>(stream: &mut S, code: u8) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    // VER REP RSV ATYP BND.ADDR(4) BND.PORT(2)
    let buf = [SOCKS5_VERSION, code, 0x00, ATYP_IPV4, 0, 0, 0, 0, 0, 0];
    stream.write_all(&buf).await
}
