//! Sending a query to a single nameserver and getting back a validated
//! response, promoting from UDP to TCP when the reply is (or would be)
//! truncated.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use dns_types::protocol::types::Message;

use crate::config::ResolverConfig;
use crate::error::TransportError;
use crate::net::{read_tcp_bytes, send_tcp_bytes, send_udp_bytes};

pub const DNS_PORT: u16 = 53;

/// A way of exchanging one query for one response with a single
/// nameserver, abstracted so the resolver state machine can be driven
/// by scripted responses in tests instead of real sockets.
pub trait Transport {
    async fn exchange(
        &self,
        addr: SocketAddr,
        request: &Message,
        config: &ResolverConfig,
    ) -> Result<Message, TransportError>;
}

/// The real transport: UDP first, promoting to TCP on truncation or an
/// oversized request.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTcpTransport;

impl Transport for UdpTcpTransport {
    async fn exchange(
        &self,
        addr: SocketAddr,
        request: &Message,
        config: &ResolverConfig,
    ) -> Result<Message, TransportError> {
        exchange(addr, request, config).await
    }
}

/// Send `request` to `addr` and return its validated response.
///
/// Tries UDP first if the request fits in 512 bytes; promotes to TCP if
/// the UDP reply is truncated or the request itself is oversized.  The
/// caller is responsible for retry accounting across hosts and attempts
/// (§4.6): this function makes exactly one logical exchange, which may
/// itself involve two TCP/UDP round trips for the TC-bit promotion.
pub async fn exchange(
    addr: SocketAddr,
    request: &Message,
    config: &ResolverConfig,
) -> Result<Message, TransportError> {
    let serialised = request.to_octets()?;

    tracing::trace!(?addr, message = ?request, "sending query");

    let response = if serialised.len() <= 512 {
        let response = exchange_udp(addr, &serialised, config).await?;
        if response.header.is_truncated {
            exchange_tcp(addr, &serialised, config).await?
        } else {
            response
        }
    } else {
        exchange_tcp(addr, &serialised, config).await?
    };

    if response.header.id != request.header.id || response.questions != request.questions {
        tracing::debug!(?addr, "response did not match request, discarding");
        return Err(TransportError::MalformedResponse);
    }

    Ok(response)
}

async fn exchange_udp(
    addr: SocketAddr,
    serialised: &[u8],
    config: &ResolverConfig,
) -> Result<Message, TransportError> {
    let sock = timeout(config.send_timeout, connect_udp(addr))
        .await
        .map_err(|_| TransportError::Timeout)??;

    let mut bytes = serialised.to_vec();
    timeout(config.send_timeout, send_udp_bytes(&sock, &mut bytes))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(TransportError::ConnectionError)?;

    let mut buf = vec![0u8; 2048];
    let n = timeout(config.recv_timeout, sock.recv(&mut buf))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(TransportError::ConnectionError)?;

    Ok(Message::from_octets(&buf[..n])?)
}

async fn connect_udp(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    let sock = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(TransportError::ConnectionError)?;
    sock.connect(addr)
        .await
        .map_err(TransportError::ConnectionError)?;
    Ok(sock)
}

async fn exchange_tcp(
    addr: SocketAddr,
    serialised: &[u8],
    config: &ResolverConfig,
) -> Result<Message, TransportError> {
    let mut stream = timeout(config.send_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(TransportError::ConnectionError)?;

    let mut bytes = serialised.to_vec();
    let send_result = timeout(config.send_timeout, send_tcp_bytes(&mut stream, &mut bytes))
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(TransportError::ConnectionError);

    // half-close the write side regardless of outcome: every exit path
    // shuts the connection down.
    let _ = stream.shutdown().await;
    send_result?;

    let bytes = timeout(config.recv_timeout, read_tcp_bytes(&mut stream))
        .await
        .map_err(|_| TransportError::Timeout)??;

    Ok(Message::from_octets(bytes.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use dns_types::protocol::types::{
        DomainName, QueryClass, QueryType, Question, RecordClass, RecordType, RecordTypeWithData,
        ResourceRecord,
    };

    #[tokio::test]
    async fn exchange_udp_to_closed_port_times_out_or_errors() {
        // port 0 always refuses; exercises the error path without
        // needing network access.
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1);
        let request = Message::from_question(
            1,
            Question {
                name: DomainName::root_domain(),
                qtype: QueryType::Record(RecordType::A),
                qclass: QueryClass::Record(RecordClass::IN),
            },
            true,
        );
        let bytes = request.to_octets().unwrap();
        let config = ResolverConfig {
            send_timeout: std::time::Duration::from_millis(200),
            recv_timeout: std::time::Duration::from_millis(200),
            ..ResolverConfig::default()
        };
        let result = exchange_udp(addr, &bytes, &config).await;
        assert!(result.is_err());
    }

    /// A loopback-only fake nameserver: replies to the UDP leg with a
    /// truncated, answer-less response, then to the TCP leg (same port)
    /// with the real answer.  Exercises scenario 5 without any external
    /// network access.
    #[tokio::test]
    async fn exchange_promotes_truncated_udp_response_to_tcp_preserving_id() {
        let udp_sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = udp_sock.local_addr().unwrap().port();
        let tcp_listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .unwrap();

        let question = Question {
            name: DomainName::from_dotted_string("www.example.com.").unwrap(),
            qtype: QueryType::Record(RecordType::A),
            qclass: QueryClass::Record(RecordClass::IN),
        };
        let request = Message::from_question(4242, question.clone(), true);

        let server = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            let (n, peer) = udp_sock.recv_from(&mut buf).await.unwrap();
            let incoming = Message::from_octets(&buf[..n]).unwrap();

            let mut truncated = incoming.make_response();
            truncated.header.is_truncated = true;
            udp_sock
                .send_to(&truncated.to_octets().unwrap(), peer)
                .await
                .unwrap();

            let (mut stream, _) = tcp_listener.accept().await.unwrap();
            let bytes = read_tcp_bytes(&mut stream).await.unwrap();
            let incoming = Message::from_octets(bytes.as_ref()).unwrap();

            let mut answered = incoming.make_response();
            answered.answers = vec![ResourceRecord {
                name: DomainName::from_dotted_string("www.example.com.").unwrap(),
                rtype_with_data: RecordTypeWithData::A {
                    address: Ipv4Addr::new(93, 184, 215, 14),
                },
                rclass: RecordClass::IN,
                ttl: 300,
            }];
            let mut out = answered.to_octets().unwrap();
            send_tcp_bytes(&mut stream, &mut out).await.unwrap();
        });

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let config = ResolverConfig {
            send_timeout: std::time::Duration::from_secs(2),
            recv_timeout: std::time::Duration::from_secs(2),
            ..ResolverConfig::default()
        };

        let response = exchange(addr, &request, &config).await.unwrap();

        server.await.unwrap();

        assert_eq!(request.header.id, response.header.id);
        assert_eq!(1, response.answers.len());
    }
}
