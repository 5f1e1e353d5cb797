//! Integration tests for dnssd
//!
//! These drive the sans-I/O browser the way the tokio session does, moving
//! datagrams between peers by hand instead of over sockets.

use dnssd::{
    Browser, Client, DnsType, Error, MDNS_DEST_ADDR, MdnsConfig, MdnsEvent, Message, Query,
    Question, Resource, Service, SessionState,
};
use sansio::Protocol;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

fn addr(last: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, last)), 5353)
}

/// Moves every queued datagram of `from` into `to`, dropping the ones that
/// do not parse, as a listener would. Returns how many were delivered.
fn deliver(from: &mut Browser, to: &mut Browser, from_addr: SocketAddr) -> usize {
    let mut count = 0;
    while let Some(packet) = from.poll_write() {
        assert_eq!(packet.transport.peer_addr, MDNS_DEST_ADDR);
        if let Ok(msg) = Message::parse_from(&packet.message, from_addr) {
            to.handle_read(msg).expect("browser open");
            count += 1;
        }
    }
    count
}

/// Same, but the datagrams also loop back to the sender.
fn deliver_with_loopback(from: &mut Browser, to: &mut Browser, from_addr: SocketAddr) {
    let mut packets = vec![];
    while let Some(packet) = from.poll_write() {
        packets.push(packet);
    }
    for packet in packets {
        let msg = Message::parse_from(&packet.message, from_addr).expect("valid datagram");
        from.handle_read(msg.clone()).expect("browser open");
        to.handle_read(msg).expect("browser open");
    }
}

fn events(browser: &mut Browser) -> Vec<MdnsEvent> {
    std::iter::from_fn(|| browser.poll_event()).collect()
}

fn discovered(browser: &mut Browser) -> Vec<Service> {
    events(browser)
        .into_iter()
        .filter_map(|e| match e {
            MdnsEvent::ServiceDiscovered(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn announcement(instance: &str, host: &str, ip: Ipv4Addr) -> dnssd::Result<Message> {
    let mut msg = Message::new_response();
    msg.add_answer(Resource::new_ptr("_http._tcp.local", 4500, instance)?)?;
    msg.add_additional(Resource::new_srv(instance, 120, 0, 0, 8080, host)?)?;
    msg.add_additional(Resource::new_txt(instance, 4500, vec!["path=/".to_owned()])?)?;
    msg.add_additional(Resource::new_a(host, 120, ip))?;
    Ok(msg)
}

#[test]
fn test_query_and_answer_exchange() -> dnssd::Result<()> {
    let now = Instant::now();
    let mut client = Browser::default();
    let mut responder = Browser::default();

    client.start_query(
        Query::new(["_http._tcp"]).to_message()?,
        now,
        Duration::from_secs(2),
    )?;

    // The responder sees the question, but a query is never a service.
    assert_eq!(deliver(&mut client, &mut responder, addr(10)), 1);
    assert!(events(&mut responder).is_empty());

    responder.handle_write(announcement(
        "Web._http._tcp.local",
        "web.local",
        Ipv4Addr::new(192, 168, 1, 20),
    )?)?;
    assert_eq!(deliver(&mut responder, &mut client, addr(20)), 1);

    let services = discovered(&mut client);
    assert_eq!(services.len(), 1);
    let web = &services[0];
    assert_eq!(web.name, "Web._http._tcp.local");
    assert_eq!(web.domain, "local");
    assert_eq!(web.host, "web.local");
    assert_eq!(web.port, 8080);
    assert_eq!(web.addrs, vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))]);
    assert_eq!(web.attributes, vec![("path".to_owned(), "/".to_owned())]);

    client.handle_timeout(now + Duration::from_secs(2))?;
    assert_eq!(events(&mut client), vec![MdnsEvent::QueryFinished(1)]);
    assert_eq!(client.finish_query(), services);
    Ok(())
}

#[test]
fn test_repeated_announcements_are_deduplicated() -> dnssd::Result<()> {
    let now = Instant::now();
    let mut client = Browser::default();
    let mut responder = Browser::default();
    client.start_query(
        Query::new(["_http._tcp"]).to_message()?,
        now,
        Duration::from_secs(2),
    )?;
    deliver(&mut client, &mut responder, addr(10));

    let ip = Ipv4Addr::new(192, 168, 1, 20);
    for _ in 0..3 {
        responder.handle_write(announcement("Web._http._tcp.local", "web.local", ip)?)?;
    }
    // A second address for the same host makes a distinct service.
    let mut multihomed = announcement("Web._http._tcp.local", "web.local", ip)?;
    multihomed.add_additional(Resource::new_a("web.local", 120, Ipv4Addr::new(10, 0, 0, 20)))?;
    responder.handle_write(multihomed)?;
    deliver(&mut responder, &mut client, addr(20));

    let services = discovered(&mut client);
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].addrs.len(), 1);
    assert_eq!(services[1].addrs.len(), 2);
    assert_eq!(client.services().len(), 2);
    Ok(())
}

#[test]
fn test_loopback_does_not_feed_own_announcements() -> dnssd::Result<()> {
    let now = Instant::now();
    let mut client = Browser::default();
    let mut peer = Browser::default();
    client.start_query(
        Query::new(["_http._tcp"]).to_message()?,
        now,
        Duration::from_secs(2),
    )?;
    peer.start_query(
        Query::new(["_http._tcp"]).to_message()?,
        now,
        Duration::from_secs(2),
    )?;

    // The client announces something that would answer its own query.
    client.handle_write(announcement(
        "Self._http._tcp.local",
        "self.local",
        Ipv4Addr::new(192, 168, 1, 10),
    )?)?;
    deliver_with_loopback(&mut client, &mut peer, addr(10));

    assert!(discovered(&mut client).is_empty());
    let seen = discovered(&mut peer);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].name, "Self._http._tcp.local");
    Ok(())
}

#[test]
fn test_compressed_captured_response() -> dnssd::Result<()> {
    // _googlecast._tcp.local PTR Den._googlecast._tcp.local with SRV, TXT
    // and A additionals; every repeated name is a pointer.
    let packet: Vec<u8> = [
        &b"\x00\x00\x84\x00\x00\x00\x00\x01\x00\x00\x00\x03"[..],
        // @12
        b"\x0b_googlecast\x04_tcp\x05local\x00",
        b"\x00\x0c\x00\x01\x00\x00\x00\x78\x00\x06",
        // @46 Den.<@12>
        b"\x03Den\xc0\x0c",
        // @52
        b"\xc0\x2e\x00\x21\x80\x01\x00\x00\x00\x78\x00\x0f",
        // @64 0 0 8009, @70 den-tv.<@29>
        b"\x00\x00\x00\x00\x1f\x49\x06den-tv\xc0\x1d",
        // @79
        b"\xc0\x2e\x00\x10\x80\x01\x00\x00\x11\x94\x00\x0b",
        b"\x04id=7\x05rm=Up",
        // @102
        b"\xc0\x46\x00\x01\x80\x01\x00\x00\x00\x78\x00\x04",
        b"\xc0\xa8\x01\x2a",
    ]
    .concat();

    let msg = Message::parse_from(&packet, addr(42))?;
    assert_eq!(msg.serialize()?, packet);

    let mut client = Browser::default();
    client.start_query(
        Query::new(["_googlecast._tcp"]).to_message()?,
        Instant::now(),
        Duration::from_secs(1),
    )?;
    client.handle_read(msg)?;

    let services = discovered(&mut client);
    assert_eq!(services.len(), 1);
    let den = &services[0];
    assert_eq!(den.name, "Den._googlecast._tcp.local");
    assert_eq!(den.host, "den-tv.local");
    assert_eq!(den.port, 8009);
    assert_eq!(den.addrs, vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42))]);
    assert_eq!(
        den.attributes,
        vec![
            ("id".to_owned(), "7".to_owned()),
            ("rm".to_owned(), "Up".to_owned()),
        ]
    );
    Ok(())
}

#[test]
fn test_malformed_packets_are_rejected_whole() -> dnssd::Result<()> {
    let good = announcement(
        "Web._http._tcp.local",
        "web.local",
        Ipv4Addr::new(192, 168, 1, 20),
    )?
    .serialize()?;

    // Every truncation fails to parse, so nothing partial reaches the browser.
    for len in 0..good.len() {
        assert!(
            Message::parse(&good[..len]).is_err(),
            "prefix of {len} bytes parsed"
        );
    }

    let mut pointer_loop = good[..12].to_vec();
    pointer_loop[5] = 1; // one question
    pointer_loop[7] = 0;
    pointer_loop[11] = 0;
    pointer_loop.extend_from_slice(b"\xc0\x0c\x00\x0c\x00\x01");
    assert!(matches!(
        Message::parse(&pointer_loop),
        Err(Error::ErrSectionParse {
            section: "question",
            index: 0,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_unicast_question_round_trip() -> dnssd::Result<()> {
    let mut msg = Message::new_request();
    msg.add_question(Question::new("_http._tcp.local", DnsType::Ptr).with_unicast_response(true))?;
    let bytes = msg.serialize()?;
    // QU is the top bit of the class field.
    assert_eq!(&bytes[bytes.len() - 2..], &[0x80, 0x01]);
    assert!(Message::parse(&bytes)?.questions()[0].unicast_response);
    Ok(())
}

#[tokio::test]
async fn test_client_start_without_interfaces() -> dnssd::Result<()> {
    let client = Client::new(MdnsConfig::default().with_interfaces(vec![]));
    assert_eq!(client.start().await, Err(Error::ErrNoInterface));
    assert_eq!(client.state()?, SessionState::Stopped);

    // Stopping a session that never started is a no-op.
    client.stop().await?;
    assert_eq!(
        client.query(Query::new(["_http._tcp"])).await,
        Err(Error::ErrNotRunning)
    );
    Ok(())
}
