//! The iterative resolution state machine: walk the delegation graph
//! from the longest known zone, descending as new delegations are
//! learned, chasing `CNAME`/`DNAME` aliases, and resolving missing glue
//! by recursing (depth-capped) back into this same function.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rand::Rng;

use dns_types::protocol::types::{
    DomainName, Message, QueryClass, QueryType, Question, Rcode, RecordType, RecordTypeWithData,
};

use crate::cache::{Authority, AuthorityCache};
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use crate::transport::{Transport, DNS_PORT};

/// Resolve `question`, starting from the longest zone the cache already
/// knows about and walking the delegation graph from there.
///
/// `prior_answers` accumulates the alias trail (CNAME/DNAME records
/// followed so far) so the final response's answer section begins with
/// them, per §8's alias-following property.
pub async fn resolve<T: Transport>(
    cache: &mut AuthorityCache,
    config: &ResolverConfig,
    transport: &T,
    question: &Question,
    prior_answers: Vec<dns_types::protocol::types::ResourceRecord>,
    depth: usize,
) -> Result<Message, ResolutionError> {
    if depth > config.max_depth {
        return Err(ResolutionError::RetryExceeded);
    }

    let mut zone = cache.longest_known_zone(&question.name);
    let mut frontier: VecDeque<Authority> = cache.authorities_under(&zone).into();

    let mut tries = 0usize;
    // the last non-NAME_ERROR DnsError seen, so that exhausting every
    // authority solely via server-reported failures surfaces that
    // failure instead of the less specific `NoRespondingServers`.
    let mut last_dns_error: Option<(Rcode, bool)> = None;

    loop {
        let auth = loop {
            if let Some(auth) = frontier.pop_front() {
                break auth;
            }

            if zone.is_root() {
                return Err(match last_dns_error {
                    Some((rcode, aa)) => ResolutionError::DnsError { rcode, aa },
                    None => ResolutionError::NoRespondingServers,
                });
            }
            zone = cache.longest_known_zone(&zone.parent());
            frontier = cache.authorities_under(&zone).into();
        };

        let address = match auth.address {
            Some(address) => address,
            None => match resolve_glue(cache, config, transport, &auth, depth).await? {
                Some(address) => {
                    cache.promote(&auth.zone, &auth.nsdname, address);
                    address
                }
                None => {
                    cache.remove_unresolvable(&auth.zone, &auth.nsdname);
                    continue;
                }
            },
        };
        let addr = SocketAddr::new(IpAddr::V4(address), DNS_PORT);

        // retry against this single authority up to MAX_RETRIES_PER_HOST
        // times before rotating to the next one in the frontier.
        let mut response = None;
        let mut host_tries = 0usize;
        while host_tries < config.max_retries_per_host {
            if tries >= config.max_retries {
                return Err(ResolutionError::RetryExceeded);
            }
            tries += 1;
            host_tries += 1;

            let request = Message::from_question(
                rand::thread_rng().gen(),
                question.clone(),
                config.recursion_desired,
            );

            match transport.exchange(addr, &request, config).await {
                Ok(resp) if resp.header.rcode == Rcode::NameError => {
                    return Err(ResolutionError::DnsNameError(question.name.clone()));
                }
                Ok(resp) if resp.header.rcode != Rcode::NoError => {
                    tracing::debug!(rcode = %resp.header.rcode, nsdname = %auth.nsdname, "server reported failure, trying next authority");
                    last_dns_error = Some((resp.header.rcode, resp.header.is_authoritative));
                    break;
                }
                Ok(resp) => {
                    response = Some(resp);
                    break;
                }
                Err(err) => {
                    tracing::debug!(?err, nsdname = %auth.nsdname, "transport attempt failed, retrying");
                }
            }
        }

        let response = match response {
            Some(response) => response,
            None => continue,
        };

        let learned = cache.update(&response.authority, &response.additional);
        for authority in learned.into_iter().rev() {
            frontier.push_front(authority);
        }

        let answer_is_usable = !response.answers.is_empty()
            && (response.header.is_authoritative || !config.required_aa);

        if answer_is_usable {
            if question.qtype == QueryType::Wildcard {
                let mut answers = prior_answers;
                answers.extend(response.answers.clone());
                let mut out = response;
                out.answers = answers;
                return Ok(out);
            }

            if response.matching_answers(question).next().is_some() {
                let mut answers = prior_answers;
                answers.extend(response.answers.clone());
                let mut out = response;
                out.answers = answers;
                return Ok(out);
            }

            if let Some(alias_target) = find_alias(&response, &question.name) {
                let mut trail = prior_answers;
                trail.extend(response.answers.clone());
                let alias_question = Question {
                    name: alias_target,
                    qtype: question.qtype,
                    qclass: question.qclass,
                };
                return Box::pin(resolve(
                    cache,
                    config,
                    transport,
                    &alias_question,
                    trail,
                    depth + 1,
                ))
                .await;
            }
        }

        if response.header.is_authoritative {
            let mut out = response;
            out.answers = {
                let mut answers = prior_answers;
                answers.extend(out.answers);
                answers
            };
            return Ok(out);
        }

        // no match, no alias, not authoritative: if this response
        // carried a delegation, it's already in the frontier (above);
        // loop around to try it.
    }
}

/// Resolve the address of `auth.nsdname` via a nested `A` lookup,
/// returning `None` if the name does not exist or has no address.
async fn resolve_glue<T: Transport>(
    cache: &mut AuthorityCache,
    config: &ResolverConfig,
    transport: &T,
    auth: &Authority,
    depth: usize,
) -> Result<Option<Ipv4Addr>, ResolutionError> {
    let glue_question = Question {
        name: auth.nsdname.clone(),
        qtype: QueryType::Record(RecordType::A),
        qclass: QueryClass::Record(dns_types::protocol::types::RecordClass::IN),
    };

    match Box::pin(resolve(
        cache,
        config,
        transport,
        &glue_question,
        Vec::new(),
        depth + 1,
    ))
    .await
    {
        Ok(response) => Ok(response.answers.iter().find_map(|rr| match &rr.rtype_with_data {
            RecordTypeWithData::A { address } => Some(*address),
            _ => None,
        })),
        Err(ResolutionError::DnsNameError(_)) => Ok(None),
        Err(ResolutionError::NoRespondingServers) => Ok(None),
        Err(err) => Err(err),
    }
}

/// The first answer RR owning `name` that is a `CNAME` or `DNAME`,
/// translated into the name the caller should recurse on next.
fn find_alias(response: &Message, name: &DomainName) -> Option<DomainName> {
    for rr in &response.answers {
        if &rr.name != name {
            continue;
        }
        match &rr.rtype_with_data {
            RecordTypeWithData::CNAME { cname } => return Some(cname.clone()),
            RecordTypeWithData::DNAME { dname } => {
                // rewrite `name` by substituting the DNAME owner's
                // suffix with the target.
                let suffix_len = rr.name.labels.len();
                let mut new_labels = name.labels[..name.labels.len() - suffix_len].to_vec();
                new_labels.extend(dname.labels.clone());
                return DomainName::from_labels(new_labels);
            }
            _ => {}
        }
    }
    None
}
