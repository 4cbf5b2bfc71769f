//! Resolver configuration: retry budgets, timeouts, and the root server
//! seed list (RFC 1035 §6; addresses from the IANA root server list).

use std::net::Ipv4Addr;
use std::time::Duration;

use dns_types::protocol::types::DomainName;

/// A root (or any other) nameserver's name and address, as used to seed
/// the authority cache.
#[derive(Debug, Clone)]
pub struct RootServer {
    pub nsdname: DomainName,
    pub address: Ipv4Addr,
}

/// Process-wide constants the resolver reads, passed through the
/// constructor rather than held as module-scope mutable state.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Total attempts across hosts before a resolution fails with
    /// `RetryExceeded`.
    pub max_retries: usize,
    /// Attempts against a single authority before rotating to the next.
    pub max_retries_per_host: usize,
    /// Budget for the write-readiness wait on each transport attempt.
    pub send_timeout: Duration,
    /// Budget for the read-readiness wait on each transport attempt.
    pub recv_timeout: Duration,
    /// Maximum depth of nested glue sub-resolutions.
    pub max_depth: usize,
    /// Root servers to seed the authority cache with, preferred root
    /// first.
    pub root_servers: Vec<RootServer>,
    /// Sets the `RD` flag on outgoing queries.
    pub recursion_desired: bool,
    /// If true, non-authoritative answers are not treated as a match.
    pub required_aa: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: 20,
            max_retries_per_host: 3,
            send_timeout: Duration::from_secs(6),
            recv_timeout: Duration::from_secs(20),
            max_depth: 16,
            root_servers: root_servers(b'f'),
            recursion_desired: true,
            required_aa: false,
        }
    }
}

/// The 13 IANA root servers, with `preferred` moved to the front.  The
/// remaining 12 follow in letter order: this ordering is an explicit,
/// deliberate construction rather than incidental hashmap iteration
/// order (see the design notes).
fn root_servers(preferred: u8) -> Vec<RootServer> {
    const ROOTS: [(u8, [u8; 4]); 13] = [
        (b'a', [198, 41, 0, 4]),
        (b'b', [199, 9, 14, 201]),
        (b'c', [192, 33, 4, 12]),
        (b'd', [199, 7, 91, 13]),
        (b'e', [192, 203, 230, 10]),
        (b'f', [192, 5, 5, 241]),
        (b'g', [192, 112, 36, 4]),
        (b'h', [198, 97, 190, 53]),
        (b'i', [192, 36, 148, 17]),
        (b'j', [192, 58, 128, 30]),
        (b'k', [193, 0, 14, 129]),
        (b'l', [199, 7, 83, 42]),
        (b'm', [202, 12, 27, 33]),
    ];

    let root_server = |letter: u8, octets: [u8; 4]| RootServer {
        nsdname: DomainName::from_dotted_string(&format!(
            "{}.root-servers.net.",
            letter as char
        ))
        .expect("root server names are well-formed"),
        address: Ipv4Addr::from(octets),
    };

    let mut ordered = Vec::with_capacity(13);
    if let Some((letter, octets)) = ROOTS.iter().find(|(l, _)| *l == preferred) {
        ordered.push(root_server(*letter, *octets));
    }
    for (letter, octets) in ROOTS {
        if letter != preferred {
            ordered.push(root_server(letter, octets));
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_root_is_first() {
        let roots = root_servers(b'f');
        assert_eq!(roots[0].nsdname.to_dotted_string(), "f.root-servers.net.");
        assert_eq!(roots.len(), 13);
    }

    #[test]
    fn default_config_has_all_roots() {
        let config = ResolverConfig::default();
        assert_eq!(config.root_servers.len(), 13);
    }
}
