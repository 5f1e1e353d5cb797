use super::listener::{DatagramSource, read_loop};
use super::*;
use crate::client::Client;
use crate::config::MdnsConfig;
use crate::message::Resource;
use crate::query::{MessageHandler, Query};
use crate::socket::MulticastSocket;
use shared::error::{Error, Result};
use shared::ifaces::{self, Interface};
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

const SESSION_PORT: u16 = 25353;

fn peer() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 9)), 5353)
}

fn hall_response() -> Result<Vec<u8>> {
    let instance = "Hall._ipp._tcp.local";
    let mut msg = Message::new_response();
    msg.add_answer(Resource::new_ptr("_ipp._tcp.local", 4500, instance)?)?;
    msg.add_additional(Resource::new_srv(instance, 120, 0, 0, 631, "hall.local")?)?;
    msg.add_additional(Resource::new_a("hall.local", 120, Ipv4Addr::new(192, 0, 2, 9)))?;
    msg.serialize()
}

// Replays a fixed list of reads, then blocks forever.
struct ScriptedSource {
    reads: Mutex<VecDeque<io::Result<(Vec<u8>, SocketAddr)>>>,
}

impl ScriptedSource {
    fn new(reads: Vec<io::Result<(Vec<u8>, SocketAddr)>>) -> Self {
        Self {
            reads: Mutex::new(reads.into()),
        }
    }
}

impl DatagramSource for ScriptedSource {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a {
        async move {
            let next = self.reads.lock().unwrap().pop_front();
            match next {
                Some(Ok((data, from))) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok((data.len(), from))
                }
                Some(Err(err)) => Err(err),
                None => std::future::pending().await,
            }
        }
    }
}

#[tokio::test]
async fn test_read_loop_survives_errors_and_malformed_packets() -> Result<()> {
    let source = Arc::new(ScriptedSource::new(vec![
        Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        Ok((b"\x00\x00\x84\x00\x00".to_vec(), peer())),
        Err(io::Error::new(io::ErrorKind::InvalidInput, "message too long")),
        Ok((hall_response()?, peer())),
    ]));

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let processor: MessageProcessor = Arc::new(move |msg: Message| {
        let _ = seen_tx.send(msg);
    });
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let iface = Interface::new("eth0", 2, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
    let handle = tokio::spawn(read_loop(iface, source, 9000, processor, shutdown_rx));

    let msg = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("response delivered")
        .expect("processor alive");
    assert!(msg.is_response());
    assert_eq!(msg.from(), Some(peer()));
    assert!(!handle.is_finished());

    let _ = shutdown_tx.send(true);
    handle.await.expect("read loop exits cleanly");
    // The truncated header never reached the processor.
    assert!(seen_rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_read_loop_exits_when_shutdown_is_dropped() {
    let source = Arc::new(ScriptedSource::new(vec![]));
    let processor: MessageProcessor = Arc::new(|_: Message| {});
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let iface = Interface::new("eth0", 2, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
    let handle = tokio::spawn(read_loop(iface, source, 512, processor, shutdown_rx));

    drop(shutdown_tx);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("read loop exits")
        .expect("no panic");
}

fn first_ipv4_interface() -> Option<Interface> {
    ifaces::list_multicast_interfaces()
        .ok()?
        .into_iter()
        .find(|iface| iface.is_ipv4())
}

// A second socket on the group, standing in for another host on the link.
fn responder_socket(iface: &Interface) -> Result<(tokio::net::UdpSocket, SocketAddr)> {
    let builder = MulticastSocket::new()
        .with_interface(iface.clone())
        .with_multicast_local_port(SESSION_PORT);
    let dest = builder.destination();
    let socket = tokio::net::UdpSocket::from_std(builder.into_std()?)?;
    Ok((socket, dest))
}

#[tokio::test]
async fn test_session_over_multicast() -> Result<()> {
    let Some(iface) = first_ipv4_interface() else {
        log::warn!("no IPv4 multicast interface, skipping");
        return Ok(());
    };
    let client = Client::new(
        MdnsConfig::default()
            .with_multicast_port(SESSION_PORT)
            .with_enable_ipv6(false)
            .with_interfaces(vec![iface.clone()]),
    );
    match client.start().await {
        Err(Error::ErrNoInterface) => {
            log::warn!("{iface} did not bind, skipping");
            return Ok(());
        }
        other => other?,
    }

    let responses = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&responses);
    client.add_handler(Arc::new(move |msg: &Message| {
        if msg.is_response() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }))?;
    let (responder, dest) = responder_socket(&iface)?;

    // Garbage first, then a real answer, both while the query waits.
    let query = client.query(Query::new(["_ipp._tcp"]).with_timeout(Duration::from_millis(800)));
    let respond = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        responder.send_to(b"\x00\x00\x84\x00garbage", dest).await?;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let after_garbage = responses.load(Ordering::SeqCst);
        responder.send_to(&hall_response()?, dest).await?;
        Ok::<usize, Error>(after_garbage)
    };
    let (services, after_garbage) = tokio::join!(query, respond);
    let services = services?;
    assert_eq!(after_garbage?, 0);
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "Hall._ipp._tcp.local");
    assert_eq!(services[0].port, 631);
    assert_eq!(responses.load(Ordering::SeqCst), 1);

    client.announce_message(&Message::new_request()).await?;

    // Dropping a waiting query releases its handler.
    let handlers = client.handler_count()?;
    let noop: MessageHandler = Arc::new(|_: &Message| {});
    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        client.query(
            Query::new(["_ipp._tcp"])
                .with_timeout(Duration::from_secs(5))
                .with_handler(noop),
        ),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(client.handler_count()?, handlers);

    // Overlapping queries take turns.
    let short = || Query::new(["_ipp._tcp"]).with_timeout(Duration::from_millis(200));
    let started = Instant::now();
    let (first, second) = tokio::join!(client.query(short()), client.query(short()));
    first?;
    second?;
    assert!(started.elapsed() >= Duration::from_millis(400));

    client.stop().await?;
    let delivered = responses.load(Ordering::SeqCst);
    responder.send_to(&hall_response()?, dest).await?;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(responses.load(Ordering::SeqCst), delivered);
    Ok(())
}
