//! Sans-I/O service discovery.
//!
//! [`Browser`] holds the protocol side of a query: it turns request messages
//! into datagrams, filters and folds incoming responses into services, and
//! ends the query when its deadline passes. It never touches a socket; the
//! caller moves datagrams and time in and out through [`sansio::Protocol`].
//!
//! ```rust
//! use dnssd::{Browser, MdnsEvent, Query, MDNS_DEST_ADDR};
//! use sansio::Protocol;
//! use std::time::{Duration, Instant};
//!
//! let mut browser = Browser::default();
//! let request = Query::new(["_http._tcp"]).to_message()?;
//! let now = Instant::now();
//! browser.start_query(request, now, Duration::from_secs(1))?;
//!
//! let packet = browser.poll_write().expect("query datagram");
//! assert_eq!(packet.transport.peer_addr, MDNS_DEST_ADDR);
//!
//! browser.handle_timeout(now + Duration::from_secs(1))?;
//! assert!(matches!(browser.poll_event(), Some(MdnsEvent::QueryFinished(0))));
//! # Ok::<(), dnssd::Error>(())
//! ```

#[cfg(test)]
mod browser_test;

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use shared::{TaggedBytesMut, TransportContext, TransportMessage, TransportProtocol};

use crate::message::{Message, is_query_answer};
use crate::service::{Service, ServiceSet, services_answering};
use shared::error::{Error, Result};

/// The mDNS IPv4 multicast group (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The mDNS IPv6 link-local multicast group (ff02::fb).
pub const MDNS_MULTICAST_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 multicast destination (224.0.0.251:5353).
pub const MDNS_DEST_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

// How many of our own recent datagrams are remembered to spot them coming
// back over multicast loopback.
const MAX_SENT_HISTORY: usize = 16;

/// Events emitted by the [`Browser`].
#[derive(Debug, Clone, PartialEq)]
pub enum MdnsEvent {
    /// A response produced a service not seen before in this query.
    ServiceDiscovered(Service),

    /// The query deadline passed; carries the number of services found.
    QueryFinished(usize),
}

#[derive(Debug)]
struct PendingQuery {
    request: Message,
    deadline: Instant,
}

/// Sans-I/O browsing state machine.
///
/// Reads take parsed [`Message`]s tagged with their sender, writes take
/// request messages and come out as [`TaggedBytesMut`] addressed to the
/// multicast group.
#[derive(Debug)]
pub struct Browser {
    dest: SocketAddr,
    query: Option<PendingQuery>,
    services: ServiceSet,
    sent: VecDeque<Vec<u8>>,
    write_outs: VecDeque<TaggedBytesMut>,
    event_outs: VecDeque<MdnsEvent>,
    closed: bool,
}

impl Default for Browser {
    fn default() -> Self {
        Self::new(MDNS_DEST_ADDR)
    }
}

impl Browser {
    /// A browser whose datagrams are addressed to `dest`.
    pub fn new(dest: SocketAddr) -> Self {
        Self {
            dest,
            query: None,
            services: ServiceSet::new(),
            sent: VecDeque::new(),
            write_outs: VecDeque::new(),
            event_outs: VecDeque::new(),
            closed: false,
        }
    }

    /// Starts a query cycle: forgets earlier services, queues `request` and
    /// arms the deadline at `now + timeout`.
    pub fn start_query(&mut self, request: Message, now: Instant, timeout: Duration) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.services.clear();
        self.query = Some(PendingQuery {
            request: request.clone(),
            deadline: now + timeout,
        });
        self.queue_datagram(&request, now)
    }

    /// Ends the current query and hands back what it found.
    pub fn finish_query(&mut self) -> Vec<Service> {
        self.query = None;
        self.services.to_vec()
    }

    pub fn is_query_pending(&self) -> bool {
        self.query.is_some()
    }

    /// Services collected by the current or last query.
    pub fn services(&self) -> Vec<Service> {
        self.services.to_vec()
    }

    fn queue_datagram(&mut self, msg: &Message, now: Instant) -> Result<()> {
        let raw = msg.serialize()?;
        log::trace!("queuing {} byte datagram for {}", raw.len(), self.dest);

        if self.sent.len() == MAX_SENT_HISTORY {
            self.sent.pop_front();
        }
        self.sent.push_back(raw.clone());

        self.write_outs.push_back(TransportMessage {
            now,
            transport: TransportContext {
                local_addr: SocketAddr::new(unspecified_like(self.dest), self.dest.port()),
                peer_addr: self.dest,
                transport_protocol: TransportProtocol::UDP,
            },
            message: BytesMut::from(&raw[..]),
        });
        Ok(())
    }

    fn is_own_datagram(&self, msg: &Message) -> bool {
        match msg.serialize() {
            Ok(raw) => self.sent.iter().any(|sent| *sent == raw),
            Err(_) => false,
        }
    }

    fn process_message(&mut self, msg: &Message) {
        let from = msg.from();
        if self.is_own_datagram(msg) {
            log::trace!("dropping our own datagram looped back from {from:?}");
            return;
        }
        if !msg.is_response() {
            log::trace!("ignoring non-response from {from:?}");
            return;
        }
        let Some(query) = &self.query else {
            log::trace!("ignoring response from {from:?} outside a query");
            return;
        };
        if !is_query_answer(&query.request, msg) {
            log::trace!("response from {from:?} does not answer the query");
            return;
        }

        for service in services_answering(&query.request, msg) {
            if self.services.add(service.clone()) {
                log::debug!("discovered {service}");
                self.event_outs
                    .push_back(MdnsEvent::ServiceDiscovered(service));
            }
        }
    }
}

fn unspecified_like(addr: SocketAddr) -> IpAddr {
    match addr {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

impl sansio::Protocol<Message, Message, ()> for Browser {
    type Rout = ();
    type Wout = TaggedBytesMut;
    type Eout = MdnsEvent;
    type Error = Error;
    type Time = Instant;

    /// Process a received message.
    ///
    /// Our own looped-back datagrams, non-responses and responses that do not
    /// answer the pending query are dropped. The rest are folded into
    /// services, each new one emitted as [`MdnsEvent::ServiceDiscovered`].
    fn handle_read(&mut self, msg: Message) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.process_message(&msg);
        Ok(())
    }

    /// Services are delivered through `poll_event()`.
    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    /// Queue a message for transmission to the multicast group.
    fn handle_write(&mut self, msg: Message) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.queue_datagram(&msg, Instant::now())
    }

    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.write_outs.pop_front()
    }

    fn handle_event(&mut self, _evt: ()) -> Result<()> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.event_outs.pop_front()
    }

    /// End the pending query once its deadline has passed.
    ///
    /// Collected services stay readable until the next query starts.
    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        if self.query.as_ref().is_some_and(|q| now >= q.deadline) {
            self.query = None;
            log::debug!("query finished with {} services", self.services.len());
            self.event_outs
                .push_back(MdnsEvent::QueryFinished(self.services.len()));
        }
        Ok(())
    }

    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.query.as_ref().map(|q| q.deadline)
    }

    /// Close the browser, dropping queued datagrams, events and the pending
    /// query. Every later call fails with [`Error::ErrConnectionClosed`].
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.query = None;
        self.services.clear();
        self.sent.clear();
        self.write_outs.clear();
        self.event_outs.clear();
        Ok(())
    }
}
