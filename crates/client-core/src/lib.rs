//! Session establishment against real SSH endpoints.
//!
//! Resolution order for a hostname: a matching host-alias entry that
//! supplies a user connects directly (key identity when configured);
//! anything else goes through the interactive [`CredentialResolver`] and
//! password authentication.

mod alias;
mod resolver;

pub use alias::{HostAliasConfig, default_alias_path};
pub use resolver::PromptResolver;

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use russh::{
    client,
    keys::{self, PrivateKeyWithHashAlg, PublicKey},
};
use rt_types::HostAlias;
use secrecy::ExposeSecret;
use tracing::{debug, info};
use tunnel_core::{CredentialResolver, SessionEstablisher, SharedSessionHandle, TunnelError};

// Internal Result type alias for convenience
type Result<T> = tunnel_core::TunnelResult<T>;

/// Host keys are accepted unconditionally; there is no known-hosts store.
pub struct AcceptAllKeys;

impl client::Handler for AcceptAllKeys {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> std::result::Result<bool, russh::Error> {
        Ok(true)
    }
}

/// Opens and authenticates russh sessions from host aliases or interactive
/// credentials.
pub struct SshEstablisher {
    aliases: HostAliasConfig,
    resolver: Arc<dyn CredentialResolver>,
}

impl SshEstablisher {
    pub fn new(aliases: HostAliasConfig, resolver: Arc<dyn CredentialResolver>) -> Self {
        Self { aliases, resolver }
    }

    async fn connect(&self, host: &str, port: u16) -> Result<client::Handle<AcceptAllKeys>> {
        let config = Arc::new(client::Config {
            inactivity_timeout: None,
            // Probes are driven by the tunnel's own keep-alive loop.
            keepalive_interval: None,
            ..Default::default()
        });
        let address = format!("{host}:{port}");
        info!(%address, "connecting");
        client::connect(config, (host, port), AcceptAllKeys)
            .await
            .map_err(|source| TunnelError::Connect { address, source })
    }

    async fn establish_with_alias(
        &self,
        hostname: &str,
        alias: &HostAlias,
        username: String,
    ) -> Result<SharedSessionHandle<AcceptAllKeys>> {
        let (host, port) = alias.target(hostname);
        debug!(alias = hostname, target = %format!("{host}:{port}"), user = %username, "resolved host alias");
        let mut session = self.connect(&host, port).await?;

        let auth = if let Some(identity) = &alias.identity_file {
            let key = Arc::new(load_identity(identity).await?);
            let hash = if key.algorithm().is_rsa() {
                session.best_supported_rsa_hash().await.unwrap_or(None).flatten()
            } else {
                None
            };
            session
                .authenticate_publickey(username.clone(), PrivateKeyWithHashAlg::new(key, hash))
                .await?
        } else {
            session.authenticate_none(username.clone()).await?
        };
        if !auth.success() {
            return Err(TunnelError::auth(format!("server rejected {username}@{host}")));
        }
        Ok(Arc::new(session))
    }

    async fn establish_with_credentials(&self, hostname: &str) -> Result<SharedSessionHandle<AcceptAllKeys>> {
        let credentials = self.resolver.resolve(hostname).await?;
        let mut session = self.connect(hostname, credentials.port).await?;
        let auth = session
            .authenticate_password(
                credentials.username.clone(),
                credentials.password.expose_secret().to_string(),
            )
            .await?;
        if !auth.success() {
            return Err(TunnelError::auth(format!(
                "server rejected password for {}@{hostname}",
                credentials.username
            )));
        }
        Ok(Arc::new(session))
    }
}

#[async_trait]
impl SessionEstablisher for SshEstablisher {
    type Session = SharedSessionHandle<AcceptAllKeys>;

    async fn establish(&self, hostname: &str) -> Result<Self::Session> {
        match self.aliases.lookup(hostname) {
            Some(alias) => match alias.user.clone() {
                Some(username) => self.establish_with_alias(hostname, &alias, username).await,
                None => self.establish_with_credentials(hostname).await,
            },
            None => self.establish_with_credentials(hostname).await,
        }
    }
}

async fn load_identity(path: &Path) -> Result<keys::PrivateKey> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| TunnelError::config(format!("failed to read identity {}: {err}", path.display())))?;
    keys::decode_secret_key(&data, None)
        .map_err(|err| TunnelError::auth(format!("unable to decode identity {}: {err}", path.display())))
}
