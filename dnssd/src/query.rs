use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::message::{DnsType, Message, Question};
use shared::error::Result;

/// The default domain service names are browsed in.
pub const DEFAULT_DOMAIN: &str = "local";

/// Service type whose PTR answers enumerate every service type on the link
/// (RFC 6763 section 9).
pub const SERVICE_TYPE_ENUMERATION: &str = "_services._dns-sd._udp";

/// Callback receiving every message the session parses while it is registered.
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// What to browse for: one PTR question per service name.
#[derive(Clone, Default)]
pub struct Query {
    /// Service types such as `_http._tcp`, with or without the domain.
    pub services: Vec<String>,
    /// Domain appended to service names; the session's domain when unset.
    pub domain: Option<String>,
    /// How long to collect answers; the session default applies when unset.
    pub timeout: Option<Duration>,
    /// Registered for the duration of the query only.
    pub handler: Option<MessageHandler>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("services", &self.services)
            .field("domain", &self.domain)
            .field("timeout", &self.timeout)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl Query {
    pub fn new<S: Into<String>>(services: impl IntoIterator<Item = S>) -> Self {
        Self {
            services: services.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_handler(mut self, handler: MessageHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn domain(&self) -> &str {
        self.domain.as_deref().unwrap_or(DEFAULT_DOMAIN)
    }

    /// Fully qualified service names, the domain appended where missing.
    pub fn service_names(&self) -> Vec<String> {
        let domain = self.domain().trim_matches('.');
        self.services
            .iter()
            .map(|service| {
                let service = service.trim_end_matches('.');
                let suffix = format!(".{domain}");
                if domain.is_empty()
                    || service
                        .to_ascii_lowercase()
                        .ends_with(&suffix.to_ascii_lowercase())
                {
                    service.to_owned()
                } else {
                    format!("{service}{suffix}")
                }
            })
            .collect()
    }

    /// The request message: one IN PTR question per service name.
    pub fn to_message(&self) -> Result<Message> {
        let mut msg = Message::new_request();
        for name in self.service_names() {
            msg.add_question(Question::new(name, DnsType::Ptr))?;
        }
        Ok(msg)
    }
}
