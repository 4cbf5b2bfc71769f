//! Core types for the DNS wire protocol, shared between the resolver
//! library and the command-line client.

pub mod protocol;
