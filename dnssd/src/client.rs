//! The tokio browsing session.
//!
//! A [`Client`] owns the multicast listeners and drives a [`Browser`] with
//! the messages they receive. It moves through
//! `Stopped → Starting → Running → Stopping → Stopped`.
//!
//! ```rust,no_run
//! use dnssd::{Client, MdnsConfig, Query};
//! use std::time::Duration;
//!
//! # async fn browse() -> dnssd::Result<()> {
//! let client = Client::new(MdnsConfig::default());
//! client.start().await?;
//! let services = client
//!     .query(Query::new(["_http._tcp"]).with_timeout(Duration::from_secs(2)))
//!     .await?;
//! for service in &services {
//!     println!("{service}");
//! }
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
mod client_test;

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use sansio::Protocol;
use shared::error::{Error, Result};
use shared::ifaces::{self, Interface};

use crate::config::MdnsConfig;
use crate::message::Message;
use crate::proto::{Browser, MDNS_MULTICAST_IPV4};
use crate::query::{MessageHandler, Query};
use crate::service::Service;
use crate::transport::{MessageProcessor, MulticastManager};

/// Token returned by [`Client::add_handler`], used to remove that registration.
pub type HandlerId = u64;

/// Lifecycle of a [`Client`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        };
        write!(f, "{s}")
    }
}

#[derive(Default)]
struct HandlerRegistry {
    next_id: HandlerId,
    handlers: Vec<(HandlerId, MessageHandler)>,
}

impl HandlerRegistry {
    fn add(&mut self, handler: MessageHandler) -> HandlerId {
        self.next_id += 1;
        self.handlers.push((self.next_id, handler));
        self.next_id
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    // Handlers run outside the lock so they may register or remove handlers.
    fn snapshot(&self) -> Vec<MessageHandler> {
        self.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
    }
}

// A handler registered for as long as this value lives, even when the
// future holding it is dropped mid-query.
struct HandlerRegistration<'a> {
    client: &'a Client,
    id: HandlerId,
}

impl<'a> HandlerRegistration<'a> {
    fn new(client: &'a Client, handler: MessageHandler) -> Result<Self> {
        let id = client.add_handler(handler)?;
        Ok(Self { client, id })
    }
}

impl Drop for HandlerRegistration<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.client.remove_handler(self.id) {
            log::warn!("failed to remove query handler {}: {err}", self.id);
        }
    }
}

/// An mDNS browsing session over every usable multicast interface.
///
/// All methods take `&self`; a client can be shared between tasks, for
/// instance to stop it from a signal handler while a query is waiting.
/// Queries on one client run one at a time: a second [`Client::query`]
/// waits until the first has returned.
pub struct Client {
    config: MdnsConfig,
    state: Mutex<SessionState>,
    browser: Arc<Mutex<Browser>>,
    handlers: Arc<Mutex<HandlerRegistry>>,
    manager: tokio::sync::Mutex<MulticastManager>,
    query_lock: tokio::sync::Mutex<()>,
}

impl Client {
    pub fn new(config: MdnsConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState::Stopped),
            browser: Arc::new(Mutex::new(Browser::default())),
            handlers: Arc::new(Mutex::new(HandlerRegistry::default())),
            manager: tokio::sync::Mutex::new(MulticastManager::new()),
            query_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MdnsConfig {
        &self.config
    }

    pub fn state(&self) -> Result<SessionState> {
        Ok(*self.state.lock()?)
    }

    fn set_state(&self, state: SessionState) -> Result<()> {
        let mut current = self.state.lock()?;
        log::trace!("session {} -> {state}", *current);
        *current = state;
        Ok(())
    }

    /// Binds a listener on every usable interface and starts receiving.
    ///
    /// A running session is stopped first. Fails with
    /// [`Error::ErrBufferShort`] when the read buffer cannot hold a DNS header
    /// and with [`Error::ErrNoInterface`] when no interface binds; either way
    /// the session is left stopped.
    pub async fn start(&self) -> Result<()> {
        self.stop().await?;
        self.set_state(SessionState::Starting)?;

        match self.bind().await {
            Ok(()) => self.set_state(SessionState::Running),
            Err(err) => {
                self.set_state(SessionState::Stopped)?;
                Err(err)
            }
        }
    }

    async fn bind(&self) -> Result<()> {
        if self.config.read_buffer_size < crate::message::HEADER_LEN {
            return Err(Error::ErrBufferShort);
        }

        let ifaces: Vec<Interface> = match &self.config.interfaces {
            Some(ifaces) => ifaces.clone(),
            None => ifaces::list_multicast_interfaces()?,
        }
        .into_iter()
        .filter(|iface| self.config.accepts(iface))
        .collect();
        log::debug!("starting on {} interface addresses", ifaces.len());

        *self.browser.lock()? = Browser::new(SocketAddr::new(
            MDNS_MULTICAST_IPV4.into(),
            self.config.multicast_port,
        ));

        let mut manager = self.manager.lock().await;
        manager.start(&ifaces, &self.config, self.processor())
    }

    // Runs on listener tasks: handlers first, then the browser.
    fn processor(&self) -> MessageProcessor {
        let browser = Arc::clone(&self.browser);
        let handlers = Arc::clone(&self.handlers);
        Arc::new(move |msg: Message| {
            let snapshot = match handlers.lock() {
                Ok(handlers) => handlers.snapshot(),
                Err(err) => {
                    log::error!("handler registry poisoned: {err}");
                    return;
                }
            };
            for handler in snapshot {
                handler(&msg);
            }

            let mut browser = match browser.lock() {
                Ok(browser) => browser,
                Err(err) => {
                    log::error!("browser poisoned: {err}");
                    return;
                }
            };
            if let Err(err) = browser.handle_read(msg) {
                log::debug!("browser rejected message: {err}");
            }
            while let Some(event) = browser.poll_event() {
                log::trace!("browser event {event:?}");
            }
        })
    }

    /// Closes every listener and waits for their tasks to exit.
    ///
    /// Stopping a stopped session is a no-op.
    pub async fn stop(&self) -> Result<()> {
        if self.state()? == SessionState::Stopped {
            return Ok(());
        }
        self.set_state(SessionState::Stopping)?;

        self.manager.lock().await.stop().await;
        self.browser.lock()?.close()?;

        self.set_state(SessionState::Stopped)
    }

    /// Browses for `query` until its timeout (or the session default) elapses
    /// and returns the services found.
    pub async fn query(&self, query: Query) -> Result<Vec<Service>> {
        self.query_until(query, std::future::pending::<()>()).await
    }

    /// Like [`Client::query`], but also ends early when `cancel` completes.
    ///
    /// The query's handler is registered only while the call runs, including
    /// when the returned future is dropped before it completes.
    pub async fn query_until<F>(&self, mut query: Query, cancel: F) -> Result<Vec<Service>>
    where
        F: Future<Output = ()>,
    {
        if self.state()? != SessionState::Running {
            return Err(Error::ErrNotRunning);
        }
        if query.domain.is_none() {
            query.domain = Some(self.config.domain.clone());
        }

        let _running = self.query_lock.lock().await;
        let _registration = match &query.handler {
            Some(handler) => Some(HandlerRegistration::new(self, Arc::clone(handler))?),
            None => None,
        };
        self.run_query(&query, cancel).await
    }

    async fn run_query<F>(&self, query: &Query, cancel: F) -> Result<Vec<Service>>
    where
        F: Future<Output = ()>,
    {
        let timeout = query.timeout.unwrap_or(self.config.query_timeout);
        let request = query.to_message()?;
        log::debug!("query {:?} for {timeout:?}", query.service_names());

        let packets = {
            let mut browser = self.browser.lock()?;
            browser.start_query(request, Instant::now(), timeout)?;
            std::iter::from_fn(|| browser.poll_write()).collect::<Vec<_>>()
        };
        if let Err(err) = self.send_packets(packets).await {
            self.browser.lock()?.finish_query();
            return Err(err);
        }

        tokio::select! {
            _ = cancel => log::debug!("query cancelled"),
            _ = tokio::time::sleep(timeout) => {}
        }

        let mut browser = self.browser.lock()?;
        browser.handle_timeout(Instant::now())?;
        while let Some(event) = browser.poll_event() {
            log::trace!("browser event {event:?}");
        }
        Ok(browser.finish_query())
    }

    async fn send_packets(&self, packets: Vec<shared::TaggedBytesMut>) -> Result<()> {
        let manager = self.manager.lock().await;
        if !manager.is_running() {
            return Err(Error::ErrNotRunning);
        }
        for packet in packets {
            manager.announce(&packet.message).await?;
        }
        Ok(())
    }

    /// Sends `msg` on every interface.
    ///
    /// Succeeds when at least one interface sent it.
    pub async fn announce_message(&self, msg: &Message) -> Result<()> {
        if self.state()? != SessionState::Running {
            return Err(Error::ErrNotRunning);
        }
        let packets = {
            let mut browser = self.browser.lock()?;
            browser.handle_write(msg.clone())?;
            std::iter::from_fn(|| browser.poll_write()).collect::<Vec<_>>()
        };
        self.send_packets(packets).await
    }

    /// Services found by the running or most recent query.
    pub fn services(&self) -> Result<Vec<Service>> {
        Ok(self.browser.lock()?.services())
    }

    /// Interfaces with a bound listener.
    pub async fn interfaces(&self) -> Vec<Interface> {
        self.manager.lock().await.interfaces().cloned().collect()
    }

    /// Registers `handler` for every message received from now on.
    pub fn add_handler(&self, handler: MessageHandler) -> Result<HandlerId> {
        Ok(self.handlers.lock()?.add(handler))
    }

    /// Removes the registration behind `id`; false when it was already gone.
    pub fn remove_handler(&self, id: HandlerId) -> Result<bool> {
        Ok(self.handlers.lock()?.remove(id))
    }

    pub fn handler_count(&self) -> Result<usize> {
        Ok(self.handlers.lock()?.handlers.len())
    }
}
