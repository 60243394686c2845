//! # Session Cache
//!
//! Maps an organization + user identity onto reusable client and channel
//! handles.
//!
//! Sessions are immutable once built. A refresh builds a new session and
//! swaps the `Arc` in under a short write lock; the lock is never held
//! across an `.await`, so concurrent callers see either the whole old or
//! the whole new session.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LedgerQueryConfig;
use crate::domain::{LedgerQueryError, RequestIdentity, UserContext};
use crate::ports::{LedgerChannel, LedgerClient, LedgerNetwork};

/// A network client acting as one user.
pub struct ClientHandle {
    identity: RequestIdentity,
    user: UserContext,
    client: Arc<dyn LedgerClient>,
}

impl ClientHandle {
    /// Identity the handle was resolved for.
    pub fn identity(&self) -> &RequestIdentity {
        &self.identity
    }

    /// User context loaded into the client.
    pub fn user(&self) -> &UserContext {
        &self.user
    }

    /// Underlying network client.
    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }
}

/// A channel opened through a [`ClientHandle`].
pub struct ChannelHandle {
    client: Arc<ClientHandle>,
    channel: Arc<dyn LedgerChannel>,
}

impl ChannelHandle {
    /// Client the channel belongs to.
    pub fn client(&self) -> &Arc<ClientHandle> {
        &self.client
    }

    /// Underlying channel.
    pub fn channel(&self) -> &Arc<dyn LedgerChannel> {
        &self.channel
    }
}

struct Session {
    client: Arc<ClientHandle>,
    channels: HashMap<String, Arc<ChannelHandle>>,
}

/// Injectable cache of per-identity sessions.
pub struct SessionCache {
    config: Arc<LedgerQueryConfig>,
    network: Arc<dyn LedgerNetwork>,
    sessions: RwLock<HashMap<RequestIdentity, Arc<Session>>>,
}

impl SessionCache {
    /// Create an empty cache.
    pub fn new(config: Arc<LedgerQueryConfig>, network: Arc<dyn LedgerNetwork>) -> Self {
        Self {
            config,
            network,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration the cache builds clients from.
    pub fn config(&self) -> &LedgerQueryConfig {
        &self.config
    }

    /// Number of identities with a cached session.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Client handle for `identity`, built on first use or when
    /// `force_refresh` is set.
    pub async fn resolve_client(
        &self,
        identity: &RequestIdentity,
        force_refresh: bool,
    ) -> Result<Arc<ClientHandle>, LedgerQueryError> {
        if !force_refresh {
            let cached = self.sessions.read().get(identity).map(|s| s.client.clone());
            if let Some(client) = cached {
                return Ok(client);
            }
        }

        let client = Arc::new(self.build_client(identity).await?);

        let mut sessions = self.sessions.write();
        if !force_refresh {
            // A concurrent build or refresh finished first; keep its session.
            if let Some(current) = sessions.get(identity) {
                return Ok(current.client.clone());
            }
        }
        let session = Arc::new(Session {
            client: client.clone(),
            channels: HashMap::new(),
        });
        sessions.insert(identity.clone(), session);
        Ok(client)
    }

    /// Channel handle for `identity`. A refresh rebuilds the whole session.
    ///
    /// # Errors
    /// - `ChannelNotConfigured` if the client does not know the channel
    /// - any error of [`Self::resolve_client`]
    pub async fn resolve_channel(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        force_refresh: bool,
    ) -> Result<Arc<ChannelHandle>, LedgerQueryError> {
        if !force_refresh {
            let cached = self
                .sessions
                .read()
                .get(identity)
                .and_then(|s| s.channels.get(channel).cloned());
            if let Some(handle) = cached {
                return Ok(handle);
            }
        }

        let mut client = self.resolve_client(identity, force_refresh).await?;
        loop {
            let ledger_channel = client
                .client
                .get_channel(channel)
                .ok_or_else(|| LedgerQueryError::ChannelNotConfigured(channel.to_string()))?;
            let handle = Arc::new(ChannelHandle {
                client: client.clone(),
                channel: ledger_channel,
            });

            let mut sessions = self.sessions.write();
            match sessions.get(identity) {
                // The session was replaced meanwhile; bind to the newer client.
                Some(current) if !Arc::ptr_eq(&current.client, &client) => {
                    client = current.client.clone();
                    continue;
                }
                current => {
                    let mut channels = current.map(|s| s.channels.clone()).unwrap_or_default();
                    channels.insert(channel.to_string(), handle.clone());
                    sessions.insert(identity.clone(), Arc::new(Session { client, channels }));
                    return Ok(handle);
                }
            }
        }
    }

    async fn build_client(&self, identity: &RequestIdentity) -> Result<ClientHandle, LedgerQueryError> {
        let org = self.config.org_profile(&identity.org_name)?;
        let client = self.network.new_client(org, &self.config.network).await?;
        client.init_credential_stores().await?;

        let named = match identity.user_name.as_deref() {
            Some(name) => client.load_user_context(name).await?,
            None => None,
        };
        let user = match named {
            Some(user) => user,
            None => {
                if let Some(name) = identity.user_name.as_deref() {
                    tracing::warn!(
                        org = %identity.org_name,
                        user = name,
                        "User context not found, falling back to persisted user"
                    );
                }
                client.load_persisted_user_context().await?.ok_or_else(|| {
                    LedgerQueryError::IdentityNotFound {
                        org: identity.org_name.clone(),
                        user: identity
                            .user_name
                            .clone()
                            .unwrap_or_else(|| "<default>".to_string()),
                    }
                })?
            }
        };

        tracing::info!(
            org = %identity.org_name,
            user = %user.name,
            msp_id = %user.msp_id,
            "Built ledger client session"
        );

        Ok(ClientHandle {
            identity: identity.clone(),
            user,
            client,
        })
    }
}
