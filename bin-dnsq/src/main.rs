use clap::Parser;
use std::process;

use dns_resolver::config::ResolverConfig;
use dns_resolver::Client;
use dns_types::protocol::types::{
    DomainName, QueryClass, QueryType, Question, RecordClass, RecordType, RecordTypeWithData,
    ResourceRecord,
};

fn print_section(heading: &str, rrs: &[ResourceRecord]) {
    if rrs.is_empty() {
        return;
    }

    println!("\n;; {heading}");
    for rr in rrs {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            rr.name,
            rr.ttl,
            rr.rclass,
            rr.rtype_with_data.rtype(),
            format_rdata(&rr.rtype_with_data),
        );
    }
}

/// A human-readable rendering of an RR's data, in presentation format
/// (RFC 1035 section 5) rather than the zone-file master-format this
/// resolver has no need to round-trip.
fn format_rdata(rtype_with_data: &RecordTypeWithData) -> String {
    match rtype_with_data {
        RecordTypeWithData::A { address } => address.to_string(),
        RecordTypeWithData::AAAA { address } => address.to_string(),
        RecordTypeWithData::NS { nsdname } => nsdname.to_string(),
        RecordTypeWithData::CNAME { cname } => cname.to_string(),
        RecordTypeWithData::DNAME { dname } => dname.to_string(),
        RecordTypeWithData::PTR { ptrdname } => ptrdname.to_string(),
        RecordTypeWithData::SOA {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => format!("{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"),
        RecordTypeWithData::MX {
            preference,
            exchange,
        } => format!("{preference} {exchange}"),
        RecordTypeWithData::TXT { octets } => format!("{:?}", String::from_utf8_lossy(octets)),
        RecordTypeWithData::CAA { flags, tag, value } => format!(
            "{flags} {:?} {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(value)
        ),
        RecordTypeWithData::Unknown { octets, .. } => format!("{octets:02x?}"),
    }
}

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// DNS lookup utility
///
/// Resolves a name by walking the delegation graph from the root,
/// rather than asking an upstream recursive resolver.
struct Args {
    /// Domain name to resolve
    #[clap(value_parser)]
    domain: DomainName,

    /// Query type to resolve
    #[clap(default_value_t = QueryType::Record(RecordType::A), value_parser)]
    qtype: QueryType,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let question = Question {
        name: args.domain,
        qtype: args.qtype,
        qclass: QueryClass::Record(RecordClass::IN),
    };

    println!(";; QUESTION");
    println!("{}\t{}\t{}", question.name, question.qclass, question.qtype);

    let mut client = Client::new(ResolverConfig::default());
    match client.resolve(&question).await {
        Ok(response) => {
            print_section("ANSWER", &response.answers);
            print_section("AUTHORITY", &response.authority);
            print_section("ADDITIONAL", &response.additional);
        }
        Err(err) => {
            println!("\n;; ANSWER");
            println!("; {err}");
            process::exit(1);
        }
    }
}
