use super::*;
use crate::message::Resource;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn responder() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30)), 5353)
}

fn printer_response() -> Result<Message> {
    let instance = "Hall._ipp._tcp.local";
    let mut msg = Message::new_response();
    msg.add_answer(Resource::new_ptr("_ipp._tcp.local", 4500, instance)?)?;
    msg.add_additional(Resource::new_srv(instance, 120, 0, 0, 631, "hall.local")?)?;
    msg.add_additional(Resource::new_a("hall.local", 120, Ipv4Addr::new(192, 168, 1, 30)))?;
    Message::parse_from(&msg.serialize()?, responder())
}

#[tokio::test]
async fn test_new_client_is_stopped() -> Result<()> {
    let client = Client::new(MdnsConfig::default());
    assert_eq!(client.state()?, SessionState::Stopped);
    client.stop().await?;
    client.stop().await?;
    assert_eq!(client.state()?, SessionState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_start_without_interfaces() -> Result<()> {
    let client = Client::new(MdnsConfig::default().with_interfaces(vec![]));
    assert_eq!(client.start().await, Err(Error::ErrNoInterface));
    assert_eq!(client.state()?, SessionState::Stopped);
    assert!(client.interfaces().await.is_empty());
    client.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_start_with_short_buffer() -> Result<()> {
    let client = Client::new(
        MdnsConfig::default()
            .with_read_buffer_size(11)
            .with_interfaces(vec![]),
    );
    assert_eq!(client.start().await, Err(Error::ErrBufferShort));
    assert_eq!(client.state()?, SessionState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_disabled_families_leave_nothing_to_bind() -> Result<()> {
    let iface = Interface::new("eth0", 2, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)));
    let client = Client::new(
        MdnsConfig::default()
            .with_enable_ipv4(false)
            .with_interfaces(vec![iface]),
    );
    assert_eq!(client.start().await, Err(Error::ErrNoInterface));
    Ok(())
}

#[tokio::test]
async fn test_query_requires_running_session() -> Result<()> {
    let client = Client::new(MdnsConfig::default());
    assert_eq!(
        client.query(Query::new(["_http._tcp"])).await,
        Err(Error::ErrNotRunning)
    );
    assert_eq!(
        client.announce_message(&Message::new_request()).await,
        Err(Error::ErrNotRunning)
    );
    Ok(())
}

#[test]
fn test_handler_tokens() -> Result<()> {
    let client = Client::new(MdnsConfig::default());
    let noop: MessageHandler = Arc::new(|_: &Message| {});

    let first = client.add_handler(Arc::clone(&noop))?;
    let second = client.add_handler(Arc::clone(&noop))?;
    assert_ne!(first, second);
    assert_eq!(client.handler_count()?, 2);

    assert!(client.remove_handler(first)?);
    assert!(!client.remove_handler(first)?);
    assert_eq!(client.handler_count()?, 1);
    assert!(client.remove_handler(second)?);
    assert_eq!(client.handler_count()?, 0);
    Ok(())
}

#[test]
fn test_processor_feeds_handlers_and_browser() -> Result<()> {
    let client = Client::new(MdnsConfig::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    client.add_handler(Arc::new(move |_: &Message| {
        counter.fetch_add(1, Ordering::SeqCst);
    }))?;

    let request = Query::new(["_ipp._tcp"]).to_message()?;
    client
        .browser
        .lock()?
        .start_query(request, Instant::now(), Duration::from_secs(3))?;

    let processor = client.processor();
    processor(printer_response()?);
    processor(printer_response()?);

    assert_eq!(seen.load(Ordering::SeqCst), 2);
    let services = client.services()?;
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].host, "hall.local");
    assert_eq!(
        services[0].addrs,
        vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30))]
    );
    Ok(())
}

#[test]
fn test_processor_after_close_is_harmless() -> Result<()> {
    let client = Client::new(MdnsConfig::default());
    client.browser.lock()?.close()?;
    let processor = client.processor();
    processor(printer_response()?);
    assert!(client.services()?.is_empty());
    Ok(())
}

#[test]
fn test_handler_registration_is_removed_on_drop() -> Result<()> {
    let client = Client::new(MdnsConfig::default());
    let noop: MessageHandler = Arc::new(|_: &Message| {});
    let kept = client.add_handler(Arc::clone(&noop))?;

    {
        let registration = HandlerRegistration::new(&client, noop)?;
        assert_ne!(registration.id, kept);
        assert_eq!(client.handler_count()?, 2);
    }
    assert_eq!(client.handler_count()?, 1);
    assert!(client.remove_handler(kept)?);
    Ok(())
}
