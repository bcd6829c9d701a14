//! Client entry point.

use crate::GuildManager;
use crate::handle::ApiHandle;
use cardinal_api::{ApiConfig, HttpTransport, User};
use cardinal_error::CardinalResult;
use cardinal_interface::Transport;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Root of the entity graph.
///
/// Cloning is cheap; clones share the same transport and caches.
///
/// ```no_run
/// use cardinal_api::ApiConfig;
/// use cardinal_client::Client;
///
/// # async fn run() -> cardinal_error::CardinalResult<()> {
/// let client = Client::new(ApiConfig::load()?);
/// client.login("secret-token").await?;
///
/// if let Some(guild) = client.guilds().resolve("1234").await? {
///     println!("prefix: {}", guild.prefix());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ApiConfig,
    api: ApiHandle,
    guilds: GuildManager,
    token: RwLock<Option<String>>,
}

impl Client {
    /// A client that is not connected yet. Requests fail with
    /// `NotConnected` until [`login`](Self::login) succeeds.
    pub fn new(config: ApiConfig) -> Self {
        Self::from_handle(config, ApiHandle::default())
    }

    /// A client sending every request through `transport`.
    pub fn with_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self::from_handle(config, ApiHandle::with_transport(transport))
    }

    fn from_handle(config: ApiConfig, api: ApiHandle) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                guilds: GuildManager::new(api.clone()),
                api,
                token: RwLock::new(None),
            }),
        }
    }

    /// Run the connect handshake with an HTTP transport authenticated
    /// with `token`. Returns the token.
    ///
    /// The transport and token are installed only once the handshake
    /// succeeds; a failed login leaves the client as it was.
    ///
    /// # Errors
    ///
    /// Fails if the transport cannot be built or every connect attempt
    /// fails.
    #[instrument(skip_all)]
    pub async fn login(&self, token: impl Into<String>) -> CardinalResult<String> {
        let token = token.into();
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&self.inner.config, token.clone())?);

        let user = cardinal_api::connect(transport.as_ref(), &self.inner.config).await?;
        self.inner.api.install(transport);
        *self.inner.token.write() = Some(token.clone());

        info!(username = %user.username(), "Logged in");
        Ok(token)
    }

    /// Check that the API is reachable and accepts the credentials,
    /// retrying up to `max_attempts` times.
    ///
    /// # Errors
    ///
    /// `NotConnected` without a transport; otherwise the error of the
    /// last attempt.
    pub async fn connect(&self) -> CardinalResult<User> {
        let transport = self.inner.api.transport()?;
        cardinal_api::connect(transport.as_ref(), &self.inner.config).await
    }

    /// Whether a transport is installed, either given at construction or
    /// by a successful [`login`](Self::login).
    pub fn is_connected(&self) -> bool {
        self.inner.api.is_connected()
    }

    /// Guilds known to this client.
    pub fn guilds(&self) -> &GuildManager {
        &self.inner.guilds
    }

    /// Token given to [`login`](Self::login), if any.
    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    /// Configuration of this client.
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("connected", &self.is_connected())
            .field("guilds", &self.inner.guilds)
            .finish_non_exhaustive()
    }
}
