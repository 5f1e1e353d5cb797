use shared::error::{Error, Result};
use shared::ifaces::Interface;
use tokio::sync::watch;

use super::MessageProcessor;
use super::listener::Listener;
use crate::config::MdnsConfig;

/// Fans one send/receive API out over a listener per interface address.
#[derive(Default)]
pub(crate) struct MulticastManager {
    listeners: Vec<Listener>,
    shutdown: Option<watch::Sender<bool>>,
}

impl MulticastManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub(crate) fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.listeners.iter().map(Listener::interface)
    }

    /// Binds a listener on every interface that accepts one.
    ///
    /// Interfaces that fail to bind are logged and skipped; when none bind the
    /// call fails with [`Error::ErrNoInterface`]. Must be called on a tokio
    /// runtime.
    pub(crate) fn start(
        &mut self,
        ifaces: &[Interface],
        config: &MdnsConfig,
        processor: MessageProcessor,
    ) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        for iface in ifaces {
            match Listener::bind(
                iface.clone(),
                config,
                processor.clone(),
                shutdown_rx.clone(),
            ) {
                Ok(listener) => {
                    log::debug!("{iface}: listening on port {}", config.multicast_port);
                    self.listeners.push(listener);
                }
                Err(err) => log::warn!("{iface}: failed to bind: {err}"),
            }
        }

        if self.listeners.is_empty() {
            return Err(Error::ErrNoInterface);
        }
        self.shutdown = Some(shutdown_tx);
        Ok(())
    }

    /// Sends `packet` on every listener.
    ///
    /// A failing interface does not stop the others. The call succeeds when
    /// at least one send went out and otherwise returns the last error.
    pub(crate) async fn announce(&self, packet: &[u8]) -> Result<()> {
        let mut sent = 0;
        let mut last_err = None;
        for listener in &self.listeners {
            match listener.send(packet).await {
                Ok(_) => sent += 1,
                Err(err) => {
                    log::warn!("{}: failed to send: {err}", listener.interface());
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if sent == 0 => Err(err),
            _ if self.listeners.is_empty() => Err(Error::ErrNotRunning),
            _ => Ok(()),
        }
    }

    /// Signals every read loop and waits for all of them to exit.
    ///
    /// No processor call happens after this returns. Stopping an idle manager
    /// does nothing.
    pub(crate) async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        for listener in self.listeners.drain(..) {
            listener.join().await;
        }
    }
}
