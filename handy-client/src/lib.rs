//! Handy Client
//!
//! A typed client for the Handy API: [`RestClient`] for the JSON endpoints
//! and [`RealtimeClient`] for topic subscriptions. Both read their bearer
//! token from a shared [`Session`].

pub mod api_client;
pub mod config;
pub mod realtime;
pub mod session;

pub use api_client::{ApiClientError, RestClient};
pub use config::{BackoffConfig, ClientConfig, ConfigError};
pub use realtime::{spawn_realtime, RealtimeClient, RealtimeConnection};
pub use session::{Session, SessionContext};

/// REST and realtime clients sharing one session.
#[derive(Clone)]
pub struct HandyClient {
    rest: RestClient,
    realtime: RealtimeClient,
}

impl HandyClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let session = match &config.token {
            Some(token) => Session::login(token.clone()),
            None => Session::anonymous(),
        };
        Ok(Self {
            rest: RestClient::new(config, session.clone())?,
            realtime: RealtimeClient::new(config, session),
        })
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    pub fn session(&self) -> &Session {
        self.rest.session()
    }
}
