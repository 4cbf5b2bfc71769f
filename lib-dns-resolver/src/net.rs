//! Byte-level framing helpers for sending and receiving DNS messages.

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// Read a DNS message from a TCP stream.
///
/// A DNS TCP message is slightly different to a DNS UDP message: it
/// has a big-endian u16 prefix giving the total length of the
/// message.  This is redundant (since the header is fixed-size and
/// says how many fields there are, and the fields contain length
/// information), but it means the entire message can be read before
/// parsing begins.
pub async fn read_tcp_bytes(stream: &mut TcpStream) -> Result<BytesMut, TcpError> {
    match stream.read_u16().await {
        Ok(size) => {
            let expected = size as usize;
            let mut bytes = BytesMut::with_capacity(expected);
            while bytes.len() < expected {
                match stream.read_buf(&mut bytes).await {
                    Ok(0) if bytes.len() < expected => {
                        return Err(TcpError::TooShort {
                            expected,
                            actual: bytes.len(),
                        });
                    }
                    Err(error) => return Err(TcpError::IO { error }),
                    _ => (),
                }
            }
            Ok(bytes)
        }
        Err(error) => Err(TcpError::IO { error }),
    }
}

/// An error that can occur when reading a DNS TCP message.
#[derive(Debug)]
pub enum TcpError {
    TooShort { expected: usize, actual: usize },
    IO { error: io::Error },
}

/// Write a serialised message to a connected UDP socket, setting or
/// clearing the `TC` flag as appropriate.
pub async fn send_udp_bytes(sock: &UdpSocket, bytes: &mut [u8]) -> Result<(), io::Error> {
    debug_assert!(bytes.len() >= 12, "a serialised message always has a header");

    if bytes.len() > 512 {
        bytes[2] |= 0b0000_0010;
        sock.send(&bytes[..512]).await?;
    } else {
        bytes[2] &= 0b1111_1101;
        sock.send(bytes).await?;
    }

    Ok(())
}

/// Write a serialised message to a TCP channel.  This sends a
/// two-byte length prefix (big-endian u16) and sets or clears the TC
/// flag as appropriate.
pub async fn send_tcp_bytes(stream: &mut TcpStream, bytes: &mut [u8]) -> Result<(), io::Error> {
    debug_assert!(bytes.len() >= 12, "a serialised message always has a header");

    let len = if let Ok(len) = bytes.len().try_into() {
        bytes[2] &= 0b1111_1101;
        len
    } else {
        bytes[2] |= 0b0000_0010;
        u16::MAX
    };

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes[..(len as usize)]).await?;

    Ok(())
}
