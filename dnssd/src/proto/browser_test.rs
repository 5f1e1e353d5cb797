use super::*;
use crate::message::Resource;
use crate::query::Query;
use sansio::Protocol;
use std::net::SocketAddrV6;

fn peer() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)), MDNS_PORT)
}

fn ipp_response(port: u16) -> Result<Message> {
    let instance = "Office._ipp._tcp.local";
    let mut msg = Message::new_response();
    msg.add_answer(Resource::new_ptr("_ipp._tcp.local", 4500, instance)?)?;
    msg.add_additional(Resource::new_srv(instance, 120, 0, 0, port, "office.local")?)?;
    msg.add_additional(Resource::new_a(
        "office.local",
        120,
        Ipv4Addr::new(192, 168, 1, 20),
    ))?;
    Ok(msg)
}

// What a listener hands over: a message parsed from the wire, tagged with
// its sender.
fn received(msg: &Message) -> Result<Message> {
    Message::parse_from(&msg.serialize()?, peer())
}

fn started(now: Instant) -> Result<Browser> {
    let mut browser = Browser::default();
    let request = Query::new(["_ipp._tcp"]).to_message()?;
    browser.start_query(request, now, Duration::from_secs(3))?;
    Ok(browser)
}

fn discovered(browser: &mut Browser) -> Vec<Service> {
    let mut services = vec![];
    while let Some(event) = browser.poll_event() {
        if let MdnsEvent::ServiceDiscovered(service) = event {
            services.push(service);
        }
    }
    services
}

#[test]
fn test_start_query_queues_datagram() -> Result<()> {
    let now = Instant::now();
    let mut browser = started(now)?;
    assert!(browser.is_query_pending());
    assert_eq!(browser.poll_timeout(), Some(now + Duration::from_secs(3)));

    let packet = browser.poll_write().expect("query datagram");
    assert_eq!(packet.now, now);
    assert_eq!(packet.transport.peer_addr, MDNS_DEST_ADDR);
    assert_eq!(packet.transport.transport_protocol, TransportProtocol::UDP);

    let request = Message::parse(&packet.message)?;
    assert!(request.is_query());
    assert_eq!(request.questions()[0].name, "_ipp._tcp.local");
    assert!(browser.poll_write().is_none());
    Ok(())
}

#[test]
fn test_ipv6_destination() -> Result<()> {
    let dest = SocketAddr::V6(SocketAddrV6::new(MDNS_MULTICAST_IPV6, MDNS_PORT, 0, 3));
    let mut browser = Browser::new(dest);
    browser.handle_write(Message::new_request())?;

    let packet = browser.poll_write().expect("datagram");
    assert_eq!(packet.transport.peer_addr, dest);
    assert!(packet.transport.local_addr.is_ipv6());
    Ok(())
}

#[test]
fn test_answer_emits_service_once() -> Result<()> {
    let mut browser = started(Instant::now())?;

    browser.handle_read(received(&ipp_response(631)?)?)?;
    let services = discovered(&mut browser);
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "Office._ipp._tcp.local");
    assert_eq!(services[0].port, 631);

    // A retransmission of the same answer adds nothing.
    browser.handle_read(received(&ipp_response(631)?)?)?;
    assert!(discovered(&mut browser).is_empty());
    assert_eq!(browser.services().len(), 1);
    Ok(())
}

#[test]
fn test_ignored_messages() -> Result<()> {
    let mut browser = started(Instant::now())?;

    // A query from another host.
    let other_query = Query::new(["_ipp._tcp"]).to_message()?;
    let mut other_query = received(&other_query)?;
    other_query.header_mut().id = 99;
    browser.handle_read(other_query)?;

    // A response for something else entirely.
    let mut unrelated = Message::new_response();
    unrelated.add_answer(Resource::new_ptr(
        "_http._tcp.local",
        4500,
        "web._http._tcp.local",
    )?)?;
    browser.handle_read(received(&unrelated)?)?;

    // Not authoritative.
    let mut not_aa = ipp_response(631)?;
    not_aa.header_mut().authoritative = false;
    browser.handle_read(received(&not_aa)?)?;

    assert!(browser.poll_event().is_none());
    assert!(browser.services().is_empty());
    Ok(())
}

#[test]
fn test_own_datagram_is_dropped() -> Result<()> {
    let mut browser = started(Instant::now())?;

    // Anything we send comes straight back over multicast loopback.
    let response = ipp_response(631)?;
    browser.handle_write(response.clone())?;
    while browser.poll_write().is_some() {}

    browser.handle_read(received(&response)?)?;
    assert!(browser.poll_event().is_none());

    // The same service from a different packet is accepted.
    browser.handle_read(received(&ipp_response(632)?)?)?;
    assert_eq!(discovered(&mut browser).len(), 1);
    Ok(())
}

#[test]
fn test_response_outside_query_is_ignored() -> Result<()> {
    let mut browser = Browser::default();
    browser.handle_read(received(&ipp_response(631)?)?)?;
    assert!(browser.poll_event().is_none());
    assert!(browser.poll_timeout().is_none());
    Ok(())
}

#[test]
fn test_timeout_finishes_query() -> Result<()> {
    let now = Instant::now();
    let mut browser = started(now)?;
    browser.handle_read(received(&ipp_response(631)?)?)?;
    discovered(&mut browser);

    browser.handle_timeout(now + Duration::from_secs(1))?;
    assert!(browser.poll_event().is_none());
    assert!(browser.is_query_pending());

    browser.handle_timeout(now + Duration::from_secs(3))?;
    assert_eq!(browser.poll_event(), Some(MdnsEvent::QueryFinished(1)));
    assert!(!browser.is_query_pending());
    assert!(browser.poll_timeout().is_none());

    // Late answers are not collected, earlier ones stay readable.
    browser.handle_read(received(&ipp_response(632)?)?)?;
    assert!(browser.poll_event().is_none());
    assert_eq!(browser.services().len(), 1);
    Ok(())
}

#[test]
fn test_new_query_replaces_services() -> Result<()> {
    let now = Instant::now();
    let mut browser = started(now)?;
    browser.handle_read(received(&ipp_response(631)?)?)?;
    assert_eq!(browser.finish_query().len(), 1);

    let request = Query::new(["_ipp._tcp"]).to_message()?;
    browser.start_query(request, now, Duration::from_secs(3))?;
    assert!(browser.services().is_empty());
    Ok(())
}

#[test]
fn test_close() -> Result<()> {
    let now = Instant::now();
    let mut browser = started(now)?;

    browser.close()?;
    assert!(browser.poll_write().is_none());
    assert!(browser.poll_timeout().is_none());

    assert_eq!(
        browser.handle_read(received(&ipp_response(631)?)?),
        Err(Error::ErrConnectionClosed)
    );
    assert_eq!(
        browser.handle_write(Message::new_request()),
        Err(Error::ErrConnectionClosed)
    );
    assert_eq!(browser.handle_timeout(now), Err(Error::ErrConnectionClosed));
    assert_eq!(
        browser.start_query(Message::new_request(), now, Duration::from_secs(1)),
        Err(Error::ErrConnectionClosed)
    );

    // Closing again is harmless.
    assert_eq!(browser.close(), Ok(()));
    Ok(())
}

#[test]
fn test_only_asked_instances_are_discovered() -> Result<()> {
    let mut browser = started(Instant::now())?;

    let mut msg = ipp_response(631)?;
    msg.add_additional(Resource::new_ptr(
        "20.1.168.192.in-addr.arpa",
        120,
        "office.local",
    )?)?;
    msg.add_additional(Resource::new_ptr(
        "_http._tcp.local",
        4500,
        "Office._http._tcp.local",
    )?)?;
    browser.handle_read(received(&msg)?)?;

    let services = discovered(&mut browser);
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "Office._ipp._tcp.local");
    assert_eq!(services[0].port, 631);
    Ok(())
}
