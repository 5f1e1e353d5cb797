//! Folding response records into discovered services.


use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::message::resource::txt::parse_attribute;
use crate::message::{Message, ResourceBody, names_equal};

/// A service instance assembled from the PTR, SRV, TXT and address records
/// of a response.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Service {
    /// Full instance name, e.g. `Kitchen._googlecast._tcp.local`.
    pub name: String,
    pub domain: String,
    /// SRV target; empty until an SRV record names one.
    pub host: String,
    /// Addresses of `host`, in record order.
    pub addrs: Vec<IpAddr>,
    pub port: u16,
    /// TXT attributes in wire order.
    pub attributes: Vec<(String, String)>,
}

// Attributes stay out of identity: two announcements of the same instance at
// the same addresses are one service.
impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.host == other.host
            && self.port == other.port
            && self.domain == other.domain
            && self.addrs == other.addrs
    }
}

impl Eq for Service {}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.host.is_empty() {
            write!(f, " at {}:{}", self.host, self.port)?;
        }
        if !self.addrs.is_empty() {
            let addrs: Vec<String> = self.addrs.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", addrs.join(", "))?;
        }
        for (key, value) in &self.attributes {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Builds one service per instance named by a PTR target or an SRV owner.
///
/// Only PTR records owned by a service type name (`_type._proto.<domain>`,
/// optionally with subtype labels) point at instances, so reverse-address
/// PTRs and other plain host pointers are ignored. SRV records count when
/// their owner is an instance name. Service types found through
/// `_services._dns-sd._udp` show up as services with only a name and domain.
pub fn services_from_message(msg: &Message) -> Vec<Service> {
    collect_services(msg, is_service_type, is_instance_name)
}

/// Like [`services_from_message`], restricted to what `query` asked for.
///
/// A PTR counts only when its owner is one of the query's question names. An
/// SRV counts when its owner is a question name or lies under one.
pub fn services_answering(query: &Message, msg: &Message) -> Vec<Service> {
    let asked = |owner: &str| query.questions().iter().any(|q| q.is_name(owner));
    let under_asked = |owner: &str| {
        query
            .questions()
            .iter()
            .any(|q| q.is_name(owner) || is_subdomain(owner, &q.name))
    };
    collect_services(msg, asked, under_asked)
}

fn collect_services<P, S>(msg: &Message, ptr_owner: P, srv_owner: S) -> Vec<Service>
where
    P: Fn(&str) -> bool,
    S: Fn(&str) -> bool,
{
    let mut names: Vec<&str> = vec![];
    for record in msg.records() {
        let name = match record.body() {
            ResourceBody::Ptr(ptr) if ptr_owner(record.name()) => ptr.domain_name.as_str(),
            ResourceBody::Srv(_) if srv_owner(record.name()) => record.name(),
            _ => continue,
        };
        if !name.is_empty() && !names.iter().any(|n| names_equal(n, name)) {
            names.push(name);
        }
    }

    names
        .into_iter()
        .map(|name| build_service(msg, name))
        .collect()
}

fn labels(name: &str) -> Vec<&str> {
    name.split('.').filter(|l| !l.is_empty()).collect()
}

fn is_proto_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("_tcp") || label.eq_ignore_ascii_case("_udp")
}

fn is_reverse_name(name: &str) -> bool {
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    lower.ends_with(".in-addr.arpa") || lower.ends_with(".ip6.arpa")
}

// `_ipp._tcp.local`, `_printer._sub._ipp._tcp.local` or
// `_services._dns-sd._udp.local`: underscore labels up to `_tcp`/`_udp`,
// followed by a domain.
fn is_service_type(name: &str) -> bool {
    if is_reverse_name(name) {
        return false;
    }
    let labels = labels(name);
    match labels.iter().position(|l| is_proto_label(l)) {
        Some(i) => i > 0 && i + 1 < labels.len() && labels[..i].iter().all(|l| l.starts_with('_')),
        None => false,
    }
}

// An instance label in front of a service type.
fn is_instance_name(name: &str) -> bool {
    let labels = labels(name);
    match labels.iter().position(|l| is_proto_label(l)) {
        Some(i) => i >= 2 && i + 1 < labels.len() && labels[i - 1].starts_with('_'),
        None => false,
    }
}

fn is_subdomain(name: &str, parent: &str) -> bool {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    let parent = parent.trim_end_matches('.').to_ascii_lowercase();
    name.len() > parent.len() + 1
        && name.ends_with(&parent)
        && name.as_bytes()[name.len() - parent.len() - 1] == b'.'
}

fn build_service(msg: &Message, name: &str) -> Service {
    let mut service = Service {
        name: name.to_owned(),
        domain: domain_of(name),
        ..Default::default()
    };

    for record in msg.records().filter(|r| r.is_name(name)) {
        match record.body() {
            ResourceBody::Srv(srv) if service.host.is_empty() => {
                service.host = srv.target.clone();
                service.port = srv.port;
            }
            ResourceBody::Txt(txt) if service.attributes.is_empty() => {
                for s in &txt.txt {
                    match parse_attribute(s) {
                        Ok(attribute) => service.attributes.push(attribute),
                        Err(err) => log::debug!("{name}: skipping TXT string: {err}"),
                    }
                }
            }
            _ => {}
        }
    }

    if !service.host.is_empty() {
        for record in msg.records().filter(|r| r.is_name(&service.host)) {
            let addr = match record.body() {
                ResourceBody::A(a) => IpAddr::V4(a.a),
                ResourceBody::Aaaa(aaaa) => IpAddr::V6(aaaa.aaaa),
                _ => continue,
            };
            if !service.addrs.contains(&addr) {
                service.addrs.push(addr);
            }
        }
    }

    service
}

// The labels after the `_proto` label; the last label when there is none.
fn domain_of(name: &str) -> String {
    let labels: Vec<&str> = name.split('.').filter(|l| !l.is_empty()).collect();
    let proto = labels
        .iter()
        .position(|l| l.eq_ignore_ascii_case("_tcp") || l.eq_ignore_ascii_case("_udp"));
    match proto {
        Some(i) if i + 1 < labels.len() => labels[i + 1..].join("."),
        _ => labels.last().map(|l| l.to_string()).unwrap_or_default(),
    }
}

/// Services collected during one query, deduplicated by equality.
///
/// An arrival equal to a known service is dropped. One that differs only in
/// its addresses is kept as a separate entry rather than merged.
#[derive(Clone, Debug, Default)]
pub struct ServiceSet {
    services: Vec<Service>,
}

impl ServiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `service` unless an equal one is already present.
    pub fn add(&mut self, service: Service) -> bool {
        if self.services.contains(&service) {
            return false;
        }
        self.services.push(service);
        true
    }

    pub fn clear(&mut self) {
        self.services.clear();
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn to_vec(&self) -> Vec<Service> {
        self.services.clone()
    }
}
