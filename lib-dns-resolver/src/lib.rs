#![warn(clippy::pedantic)]
// Sometimes a redundant else is clearer
#![allow(clippy::redundant_else)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

pub mod cache;
pub mod config;
pub mod error;
pub mod net;
pub mod resolve;
pub mod transport;

use tracing::Instrument;

use dns_types::protocol::types::{Message, Question};

use self::cache::AuthorityCache;
use self::config::ResolverConfig;
use self::error::ResolutionError;
use self::transport::UdpTcpTransport;

/// A stub resolver that walks the delegation graph itself, starting
/// from the root, rather than asking an upstream recursive server.
///
/// Owns its authority cache: every `resolve` call mutates it in place,
/// so repeated lookups against the same process benefit from
/// delegations learned by earlier ones.
pub struct Client {
    config: ResolverConfig,
    cache: AuthorityCache,
    transport: UdpTcpTransport,
}

impl Client {
    pub fn new(config: ResolverConfig) -> Self {
        let cache = AuthorityCache::new(&config.root_servers);
        Self {
            config,
            cache,
            transport: UdpTcpTransport,
        }
    }

    /// Resolve `question`, returning the response message whose answer
    /// section begins with any `CNAME`/`DNAME` records followed along
    /// the way.
    ///
    /// # Errors
    ///
    /// See [`ResolutionError`] for the ways a resolution can fail.
    pub async fn resolve(&mut self, question: &Question) -> Result<Message, ResolutionError> {
        resolve::resolve(
            &mut self.cache,
            &self.config,
            &self.transport,
            question,
            Vec::new(),
            0,
        )
        .instrument(tracing::error_span!("resolve", name = %question.name, qtype = %question.qtype))
        .await
    }

    /// The authority cache accumulated so far, for inspection by
    /// callers and tests.
    pub fn cache(&self) -> &AuthorityCache {
        &self.cache
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_starts_with_seeded_root_zone() {
        let client = Client::default();
        assert_eq!(13, client.config.root_servers.len());
    }
}
