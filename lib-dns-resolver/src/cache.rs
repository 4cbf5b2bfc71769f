//! The authority cache: the delegation graph discovered so far, keyed by
//! zone name.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use dns_types::protocol::types::{DomainName, RecordTypeWithData, ResourceRecord};

use crate::config::RootServer;

/// A nameserver known (or believed) to be authoritative for `zone`.
///
/// `expiration` is recorded from the owning record's TTL but not
/// consulted: this revision does not evict cache entries on expiry (see
/// the design notes).
#[derive(Debug, Clone)]
pub struct Authority {
    pub zone: DomainName,
    pub nsdname: DomainName,
    pub address: Option<Ipv4Addr>,
    pub expiration: Instant,
}

#[derive(Debug, Default)]
struct ZoneAuthorities {
    known: HashMap<DomainName, Authority>,
    unknown: HashMap<DomainName, Authority>,
}

/// Delegation graph, keyed by zone name: `zone -> (known, unknown)`
/// where `known` authorities have a resolved address and `unknown` ones
/// still need a glue or sub-resolution lookup.
///
/// Owned by the resolver and mutated from a single resolution at a
/// time; nested sub-resolutions for glue reenter the same cache (see
/// `resolve::resolve`).
#[derive(Debug)]
pub struct AuthorityCache {
    zones: HashMap<DomainName, ZoneAuthorities>,
}

impl AuthorityCache {
    /// A cache pre-seeded with the root zone's known authorities.
    pub fn new(root_servers: &[RootServer]) -> Self {
        let mut known = HashMap::with_capacity(root_servers.len());
        for root in root_servers {
            known.insert(
                root.nsdname.clone(),
                Authority {
                    zone: DomainName::root_domain(),
                    nsdname: root.nsdname.clone(),
                    address: Some(root.address),
                    expiration: Instant::now() + Duration::from_secs(86_400),
                },
            );
        }

        let mut zones = HashMap::new();
        zones.insert(
            DomainName::root_domain(),
            ZoneAuthorities {
                known,
                unknown: HashMap::new(),
            },
        );

        Self { zones }
    }

    /// The deepest ancestor of `name` (including `name` itself) whose
    /// cache row has a nonempty `known` sub-map.  Always terminates: the
    /// root row is never empty.
    pub fn longest_known_zone(&self, name: &DomainName) -> DomainName {
        let mut candidate = name.clone();
        loop {
            if self
                .zones
                .get(&candidate)
                .is_some_and(|z| !z.known.is_empty())
            {
                return candidate;
            }
            if candidate.is_root() {
                return candidate;
            }
            candidate = candidate.parent();
        }
    }

    /// Authorities for `zone`, known first (with an address) then
    /// unknown (without one).
    pub fn authorities_under(&self, zone: &DomainName) -> Vec<Authority> {
        match self.zones.get(zone) {
            Some(z) => {
                let mut out = Vec::with_capacity(z.known.len() + z.unknown.len());
                out.extend(z.known.values().cloned());
                out.extend(z.unknown.values().cloned());
                out
            }
            None => Vec::new(),
        }
    }

    /// Drop an authority that conclusively failed glue resolution (its
    /// sub-resolve returned `NAME_ERROR` or no `A` record).
    pub fn remove_unresolvable(&mut self, zone: &DomainName, nsdname: &DomainName) {
        if let Some(z) = self.zones.get_mut(zone) {
            z.unknown.remove(nsdname);
        }
    }

    /// Move an authority from `unknown` to `known` once its address has
    /// been learned via glue sub-resolution.
    pub fn promote(&mut self, zone: &DomainName, nsdname: &DomainName, address: Ipv4Addr) {
        if let Some(z) = self.zones.get_mut(zone) {
            if let Some(mut authority) = z.unknown.remove(nsdname) {
                authority.address = Some(address);
                z.known.insert(nsdname.clone(), authority);
            }
        }
    }

    /// Derive candidate authorities from every `NS`/`SOA` in
    /// `authority_section`, fill in addresses from matching `A` records
    /// in `additional_section`, and merge them into the cache.
    ///
    /// Merge rules, per candidate:
    /// - already `known` → left unchanged (first-writer-wins);
    /// - already `unknown` and the candidate now has an address → moved
    ///   to `known`;
    /// - not present → inserted into `known` or `unknown` depending on
    ///   whether an address was found.
    ///
    /// Returns the authorities that were newly learned or promoted this
    /// call, known-address ones first, for the caller to fold into its
    /// current search frontier.
    pub fn update(
        &mut self,
        authority_section: &[ResourceRecord],
        additional_section: &[ResourceRecord],
    ) -> Vec<Authority> {
        let mut candidates: HashMap<DomainName, Authority> = HashMap::new();

        for rr in authority_section {
            let (zone, nsdname) = match &rr.rtype_with_data {
                RecordTypeWithData::NS { nsdname } => (rr.name.clone(), nsdname.clone()),
                RecordTypeWithData::SOA { mname, .. } => (rr.name.clone(), mname.clone()),
                _ => continue,
            };
            candidates.entry(nsdname.clone()).or_insert(Authority {
                zone,
                nsdname,
                address: None,
                expiration: Instant::now() + Duration::from_secs(u64::from(rr.ttl)),
            });
        }

        for rr in additional_section {
            if let RecordTypeWithData::A { address } = &rr.rtype_with_data {
                if let Some(candidate) = candidates.get_mut(&rr.name) {
                    candidate.address = Some(*address);
                }
            }
        }

        let mut learned = Vec::new();

        for (nsdname, candidate) in candidates {
            let zone_row = self.zones.entry(candidate.zone.clone()).or_default();

            if zone_row.known.contains_key(&nsdname) {
                continue;
            }

            match candidate.address {
                Some(_) => {
                    zone_row.unknown.remove(&nsdname);
                    zone_row.known.insert(nsdname, candidate.clone());
                    learned.push(candidate);
                }
                None => {
                    if !zone_row.unknown.contains_key(&nsdname) {
                        zone_row.unknown.insert(nsdname, candidate.clone());
                        learned.push(candidate);
                    }
                }
            }
        }

        learned.sort_by_key(|a| a.address.is_none());
        learned
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use dns_types::protocol::types::test_util::{domain, ns_record};
    use dns_types::protocol::types::RecordClass;

    use super::*;

    fn test_roots() -> Vec<RootServer> {
        vec![RootServer {
            nsdname: domain("a.root-servers.net."),
            address: Ipv4Addr::new(198, 41, 0, 4),
        }]
    }

    #[test]
    fn longest_known_zone_starts_at_root_on_cold_cache() {
        let cache = AuthorityCache::new(&test_roots());
        assert_eq!(
            DomainName::root_domain(),
            cache.longest_known_zone(&domain("www.example.com."))
        );
    }

    #[test]
    fn update_adds_unknown_without_glue() {
        let mut cache = AuthorityCache::new(&test_roots());
        let authority = ns_record("example.com.", "ns1.example.com.");
        let learned = cache.update(&[authority], &[]);

        assert_eq!(1, learned.len());
        assert_eq!(None, learned[0].address);

        let under = cache.authorities_under(&domain("example.com."));
        assert_eq!(1, under.len());
        assert_eq!(None, under[0].address);
    }

    #[test]
    fn update_with_glue_goes_straight_to_known() {
        let mut cache = AuthorityCache::new(&test_roots());
        let ns = ns_record("example.com.", "ns1.example.com.");
        let glue = ResourceRecord {
            name: domain("ns1.example.com."),
            rtype_with_data: RecordTypeWithData::A {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            rclass: RecordClass::IN,
            ttl: 300,
        };

        let learned = cache.update(&[ns], &[glue]);
        assert_eq!(1, learned.len());
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), learned[0].address);

        let under = cache.authorities_under(&domain("example.com."));
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), under[0].address);
    }

    #[test]
    fn promote_moves_unknown_to_known() {
        let mut cache = AuthorityCache::new(&test_roots());
        cache.update(&[ns_record("example.com.", "ns1.example.com.")], &[]);

        cache.promote(
            &domain("example.com."),
            &domain("ns1.example.com."),
            Ipv4Addr::new(10, 0, 0, 1),
        );

        let under = cache.authorities_under(&domain("example.com."));
        assert_eq!(1, under.len());
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), under[0].address);
    }

    #[test]
    fn known_entry_is_not_overwritten_by_a_later_unknown_candidate() {
        let mut cache = AuthorityCache::new(&test_roots());
        let ns = ns_record("example.com.", "ns1.example.com.");
        let glue = ResourceRecord {
            name: domain("ns1.example.com."),
            rtype_with_data: RecordTypeWithData::A {
                address: Ipv4Addr::new(10, 0, 0, 1),
            },
            rclass: RecordClass::IN,
            ttl: 300,
        };
        cache.update(&[ns.clone()], &[glue]);

        // a second response claims the same nsdname again, without glue
        // this time: first-writer-wins, known entry is untouched.
        let learned = cache.update(&[ns], &[]);
        assert!(learned.is_empty());

        let under = cache.authorities_under(&domain("example.com."));
        assert_eq!(1, under.len());
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), under[0].address);
    }
}
