//! # dnssd
//!
//! Multicast DNS (RFC 6762) and DNS-based service discovery (RFC 6763) for
//! Rust.
//!
//! The crate has three layers:
//!
//! - **Codec**: [`Message`], [`Question`] and [`Resource`] read and write the
//!   DNS wire format, including compressed names. Records decode into a
//!   closed set of typed bodies ([`ResourceBody`]).
//! - **Sans-I/O core**: [`Browser`] implements [`sansio::Protocol`]. It turns
//!   queries into datagrams and folds matching responses into [`Service`]s
//!   without doing any I/O itself.
//! - **Session**: [`Client`] binds one multicast socket per interface address
//!   on tokio and drives the browser with what they receive.
//!
//! ## Browsing
//!
//! ```rust,no_run
//! use dnssd::{Client, MdnsConfig, Query};
//!
//! # async fn browse() -> dnssd::Result<()> {
//! let client = Client::new(MdnsConfig::default());
//! client.start().await?;
//! for service in client.query(Query::new(["_googlecast._tcp"])).await? {
//!     println!("{} -> {:?}:{}", service.name, service.addrs, service.port);
//! }
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Decoding a packet
//!
//! ```rust
//! use dnssd::{DnsType, Message, Question, Resource};
//! use std::net::Ipv4Addr;
//!
//! let mut query = Message::new_request();
//! query.add_question(Question::new("printer.local", DnsType::A))?;
//!
//! let mut response = Message::new_response();
//! response.add_answer(Resource::new_a("printer.local", 120, Ipv4Addr::new(10, 0, 0, 7)))?;
//!
//! let parsed = Message::parse(&response.serialize()?)?;
//! assert!(dnssd::is_query_answer(&query, &parsed));
//! # Ok::<(), dnssd::Error>(())
//! ```
//!
//! ## Protocol Details
//!
//! - **Multicast Address**: 224.0.0.251:5353 (IPv4) and [ff02::fb]:5353 (IPv6)
//! - **Record Types**: A, AAAA, PTR, SRV and TXT decode into typed bodies;
//!   NSEC is recognized but kept opaque
//! - **Compression**: names are decompressed on read and always written
//!   uncompressed

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub(crate) mod client;
pub(crate) mod config;
pub(crate) mod message;
pub(crate) mod proto;
pub(crate) mod query;
pub(crate) mod service;
pub(crate) mod socket;
pub(crate) mod transport;

pub use client::{Client, HandlerId, SessionState};
pub use config::MdnsConfig;
pub use message::{
    AResource, AaaaResource, DNSCLASS_ANY, DNSCLASS_INET, DnsClass, DnsType, Header, Message,
    NsecResource, OpCode, PtrResource, Question, RCode, Resource, ResourceBody, ResourceHeader,
    SrvResource, TxtResource, is_query_answer, names_equal,
};
pub use message::resource::txt::parse_attribute;
pub use proto::{
    Browser, MDNS_DEST_ADDR, MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT, MdnsEvent,
};
pub use query::{DEFAULT_DOMAIN, MessageHandler, Query, SERVICE_TYPE_ENUMERATION};
pub use service::{Service, ServiceSet, services_answering, services_from_message};
pub use shared::error::{Error, Result};

// Re-export socket utilities for convenience
pub use shared::ifaces;
pub use socket::MulticastSocket;
