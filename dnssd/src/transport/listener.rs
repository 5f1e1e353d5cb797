use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use shared::error::Result;
use shared::ifaces::Interface;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::MessageProcessor;
use crate::config::MdnsConfig;
use crate::message::Message;
use crate::socket::MulticastSocket;

/// One multicast socket bound on one interface address, plus the task
/// reading from it.
pub(crate) struct Listener {
    iface: Interface,
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    handle: JoinHandle<()>,
}

impl Listener {
    /// Binds a socket on `iface` and spawns its read loop.
    ///
    /// The loop ends when `shutdown` changes or its sender is dropped.
    pub(crate) fn bind(
        iface: Interface,
        config: &MdnsConfig,
        processor: MessageProcessor,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let builder = MulticastSocket::new()
            .with_interface(iface.clone())
            .with_multicast_local_port(config.multicast_port)
            .with_loopback(config.multicast_loopback);
        let dest = builder.destination();
        let socket = Arc::new(UdpSocket::from_std(builder.into_std()?)?);

        let handle = tokio::spawn(read_loop(
            iface.clone(),
            Arc::clone(&socket),
            config.read_buffer_size,
            processor,
            shutdown,
        ));

        Ok(Self {
            iface,
            socket,
            dest,
            handle,
        })
    }

    pub(crate) fn interface(&self) -> &Interface {
        &self.iface
    }

    /// Sends `packet` to the mDNS group through this listener's interface.
    pub(crate) async fn send(&self, packet: &[u8]) -> Result<usize> {
        let n = self.socket.send_to(packet, self.dest).await?;
        log::trace!("{}: sent {n} bytes to {}", self.iface, self.dest);
        Ok(n)
    }

    /// Waits for the read loop to exit. The shutdown signal must already be sent.
    pub(crate) async fn join(self) {
        if let Err(err) = self.handle.await {
            log::warn!("{}: listener task failed: {err}", self.iface);
        }
        log::debug!("{}: listener closed", self.iface);
    }
}

/// Where a read loop takes its datagrams from. Implemented by tokio's
/// `UdpSocket`.
pub(crate) trait DatagramSource: Send + Sync + 'static {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a;
}

impl DatagramSource for UdpSocket {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a {
        self.recv_from(buf)
    }
}

// Pause after a failed read so a persistent error cannot spin the task.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(20);

/// Reads until `shutdown` changes or its sender is dropped.
///
/// Read errors are per datagram (a reset reported by ICMP, a datagram larger
/// than the buffer on Windows) and never end the loop.
pub(crate) async fn read_loop<S: DatagramSource>(
    iface: Interface,
    socket: Arc<S>,
    buffer_size: usize,
    processor: MessageProcessor,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; buffer_size];
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                log::trace!("{iface}: read loop exit");
                break;
            }
            res = socket.recv_datagram(&mut buf) => {
                match res {
                    Ok((n, from)) => handle_datagram(&iface, &buf[..n], from, &processor),
                    Err(err) => {
                        log::warn!("{iface}: socket read error {err}");
                        tokio::time::sleep(READ_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }
}

fn handle_datagram(iface: &Interface, packet: &[u8], from: SocketAddr, processor: &MessageProcessor) {
    log::trace!("{iface}: read {} bytes from {from}: {packet:02x?}", packet.len());
    match Message::parse_from(packet, from) {
        Ok(msg) => {
            log::trace!("{iface}: message from {from}\n{msg}");
            processor(msg);
        }
        Err(err) if err.is_malformed_input() => {
            log::debug!("{iface}: dropping malformed packet from {from}: {err}")
        }
        Err(err) => log::warn!("{iface}: dropping packet from {from}: {err}"),
    }
}
