//! End-to-end tests against live nameservers. These depend on network
//! access and real DNS infrastructure that can change out from under
//! us, so they are excluded from the default `cargo test` run; invoke
//! with `cargo test -- --ignored` to exercise them manually.

use dns_resolver::config::ResolverConfig;
use dns_resolver::Client;
use dns_types::protocol::types::{
    QueryClass, QueryType, Question, Rcode, RecordClass, RecordType, RecordTypeWithData,
};

fn domain(s: &str) -> dns_types::protocol::types::DomainName {
    s.parse().unwrap()
}

#[tokio::test]
#[ignore]
async fn resolves_google_com_a_record() {
    let mut client = Client::new(ResolverConfig::default());
    let question = Question {
        name: domain("google.com."),
        qtype: QueryType::Record(RecordType::A),
        qclass: QueryClass::Record(RecordClass::IN),
    };

    let response = client.resolve(&question).await.unwrap();

    assert_eq!(Rcode::NoError, response.header.rcode);
    assert!(response.answers.iter().any(|rr| {
        rr.name == question.name && matches!(rr.rtype_with_data, RecordTypeWithData::A { .. })
    }));
}

#[tokio::test]
#[ignore]
async fn resolves_mx_records() {
    let mut client = Client::new(ResolverConfig::default());
    let question = Question {
        name: domain("pwr.edu.pl."),
        qtype: QueryType::Record(RecordType::MX),
        qclass: QueryClass::Record(RecordClass::IN),
    };

    let response = client.resolve(&question).await.unwrap();

    let mx = response
        .answers
        .iter()
        .find_map(|rr| match &rr.rtype_with_data {
            RecordTypeWithData::MX {
                preference,
                exchange,
            } => Some((*preference, exchange.clone())),
            _ => None,
        })
        .expect("at least one MX record");
    assert!(!mx.1.labels.is_empty());
}

#[tokio::test]
#[ignore]
async fn resolving_a_root_server_populates_the_root_zones_known_authorities() {
    let mut client = Client::new(ResolverConfig::default());
    let question = Question {
        name: domain("a.root-servers.net."),
        qtype: QueryType::Record(RecordType::A),
        qclass: QueryClass::Record(RecordClass::IN),
    };

    let response = client.resolve(&question).await.unwrap();

    assert!(response
        .answers
        .iter()
        .any(|rr| matches!(rr.rtype_with_data, RecordTypeWithData::A { .. })));

    let root = dns_types::protocol::types::DomainName::root_domain();
    assert!(client
        .cache()
        .authorities_under(&root)
        .iter()
        .any(|auth| auth.nsdname == domain("a.root-servers.net.") && auth.address.is_some()));
}
