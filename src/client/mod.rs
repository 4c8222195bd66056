use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    auth::{
        clear_session,
        jwt::{JwtAuthenticator, LoginCredentials, RegisterData},
        load_credential, load_user, store_session, Credential, CredentialStore, FileStore, MemoryStore, User,
        ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY
    },
    client::refresh::{RefreshGate, RefreshLease, Ticket},
    config::ClientConfig,
    web::{ApiError, ApiRequest, Body, Error, Method, RequestOptions, Requester, Transport}
};

pub mod refresh;

macro_rules! verbs_without_body {
    ($($verb: ident => $method: ident),*) => {
        paste::paste! {
            $(
                pub async fn $verb<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
                    self.[<$verb _with>](path, RequestOptions::default()).await
                }

                pub async fn [<$verb _with>]<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, Error> {
                    let value = self.request(Method::$method, path, Body::Empty, options).await?;
                    Ok(serde_json::from_value(value)?)
                }
            )*
        }
    };
}

macro_rules! verbs_with_body {
    ($($verb: ident => $method: ident),*) => {
        paste::paste! {
            $(
                pub async fn $verb<T: DeserializeOwned>(&self, path: &str, body: impl Into<Body>) -> Result<T, Error> {
                    self.[<$verb _with>](path, body, RequestOptions::default()).await
                }

                pub async fn [<$verb _with>]<T: DeserializeOwned>(
                    &self,
                    path: &str,
                    body: impl Into<Body>,
                    options: RequestOptions
                ) -> Result<T, Error> {
                    let value = self.request(Method::$method, path, body.into(), options).await?;
                    Ok(serde_json::from_value(value)?)
                }
            )*
        }
    };
}

/// Authenticated access to the platform backend.
///
/// Every call carries the stored access token. A 401 triggers one shared token
/// refresh; requests rejected while it runs are queued and replayed once with the
/// new token. When the refresh fails, or a replayed request is rejected again, the
/// stored session is cleared and the call fails with [`Error::SessionEnded`].
/// Navigating back to a login screen is up to the caller.
///
/// Build one per application and share it by reference or `Arc`.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    authenticator: JwtAuthenticator,
    gate: RefreshGate
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            authenticator: JwtAuthenticator::new(transport.clone()),
            transport,
            store,
            gate: RefreshGate::new()
        }
    }

    /// Reqwest transport plus a file store when `credentials_path` is set, memory otherwise.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let transport = Arc::new(Requester::new(config.clone())?);
        let store: Arc<dyn CredentialStore> = match &config.credentials_path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new())
        };
        Ok(Self::new(transport, store))
    }

    #[inline]
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    #[inline]
    pub fn authenticator(&self) -> &JwtAuthenticator {
        &self.authenticator
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.get(ACCESS_TOKEN_KEY).is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        load_user(self.store.as_ref())
    }

    pub fn credential(&self) -> Option<Credential> {
        load_credential(self.store.as_ref())
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_refreshing()
    }

    /// Number of requests waiting for the running refresh.
    pub fn pending_requests(&self) -> usize {
        self.gate.pending()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        let (credential, user) = self.authenticator.login(&LoginCredentials::new(email, password)).await?;
        self.gate.exclusive(|| store_session(self.store.as_ref(), &credential, &user))?;
        info!(user_id = user.id, role = %user.role, "Logged in");
        Ok(user)
    }

    pub async fn register(&self, data: &RegisterData) -> Result<User, Error> {
        let (credential, user) = self.authenticator.register(data).await?;
        self.gate.exclusive(|| store_session(self.store.as_ref(), &credential, &user))?;
        info!(user_id = user.id, role = %user.role, "Registered");
        Ok(user)
    }

    /// Drops the stored session. Calling it without a session is a no-op.
    /// A refresh still in flight will not bring the session back.
    pub fn logout(&self) -> Result<(), Error> {
        if self.gate.exclusive(|| clear_session(self.store.as_ref()))? {
            info!("Logged out");
        }
        Ok(())
    }

    /// Checks the stored access token with the backend, refreshing it once when rejected.
    /// A failed refresh ends the session.
    pub async fn verify_auth(&self) -> bool {
        let Some(token) = self.store.get(ACCESS_TOKEN_KEY) else {
            return false;
        };

        match self.authenticator.verify(&token).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(error) => warn!(%error, "Unable to verify access token")
        }

        match self.gate.enter(Some(token.as_str()), || self.store.get(ACCESS_TOKEN_KEY)) {
            Ticket::Replay(current) => matches!(self.authenticator.verify(&current).await, Ok(true)),
            Ticket::Follower(receiver) => matches!(receiver.await, Ok(Ok(_))),
            Ticket::Leader(lease) => self.refresh(lease).await.is_ok()
        }
    }

    pub async fn request(&self, method: Method, path: &str, body: Body, options: RequestOptions) -> Result<Value, Error> {
        self.execute(&ApiRequest::new(method, path).body(body).options(options)).await
    }

    verbs_without_body!(get => GET, delete => DELETE);
    verbs_with_body!(post => POST, put => PUT, patch => PATCH);

    /// Sends `request`, recovering from an expired access token at most once.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, Error> {
        let token = self.store.get(ACCESS_TOKEN_KEY);
        let response = self.transport.send(request, token.as_deref()).await?;
        if !response.is_unauthorized() {
            return response.into_result();
        }

        let fresh = match self.gate.enter(token.as_deref(), || self.store.get(ACCESS_TOKEN_KEY)) {
            Ticket::Replay(current) => {
                warn!(method = %request.method, path = %request.path, "Rejected with an outdated token, replaying");
                current
            }
            Ticket::Follower(receiver) => {
                info!(method = %request.method, path = %request.path, "Queued until the token refresh completes");
                match receiver.await {
                    Ok(Ok(token)) => token,
                    Ok(Err(reason)) => return Err(Error::SessionEnded(reason)),
                    Err(_) => return Err(Error::SessionEnded("Token refresh was abandoned".to_string()))
                }
            }
            Ticket::Leader(lease) => self.refresh(lease).await?
        };

        self.replay(request, &fresh).await
    }

    async fn replay(&self, request: &ApiRequest, token: &str) -> Result<Value, Error> {
        let response = self.transport.send(request, Some(token)).await?;
        if !response.is_unauthorized() {
            return response.into_result();
        }

        let reason = ApiError::from_response(response.status, response.body).message().to_string();
        warn!(method = %request.method, path = %request.path, %reason, "Refreshed token was rejected, ending session");
        self.gate.exclusive(|| self.clear_stored_session());
        Err(Error::SessionEnded(reason))
    }

    async fn refresh(&self, lease: RefreshLease<'_>) -> Result<String, Error> {
        let Some(refresh_token) = self.store.get(REFRESH_TOKEN_KEY) else {
            return Err(self.end_session(lease, "No refresh token available"));
        };

        info!("Refreshing access token");
        let token = match self.authenticator.refresh(&refresh_token).await {
            Ok(token) => token,
            Err(error) => return Err(self.end_session(lease, &format!("Unable to refresh access token => {}", error.message())))
        };

        let waiters = lease.succeed(&token.access_token, || {
            // Logged out, or logged in again, while the refresh was running.
            if self.store.get(REFRESH_TOKEN_KEY).as_deref() != Some(refresh_token.as_str()) {
                warn!("Session changed during token refresh, discarding the new token");
                return Err(Error::SessionEnded("Session ended while the token was being refreshed".to_string()));
            }

            let mut entries = vec![(ACCESS_TOKEN_KEY, token.access_token.as_str())];
            if let Some(rotated) = &token.refresh_token {
                entries.push((REFRESH_TOKEN_KEY, rotated.as_str()));
            }
            self.store.apply(&entries, &[]).map(|_| ())
        })?;

        info!(waiters, "Access token refreshed");
        Ok(token.access_token)
    }

    fn end_session(&self, lease: RefreshLease<'_>, reason: &str) -> Error {
        let waiters = lease.fail(reason, || self.clear_stored_session());
        warn!(waiters, %reason, "Session ended");
        Error::SessionEnded(reason.to_string())
    }

    /// Callers hold the gate lock, either through a settling lease or `exclusive`.
    fn clear_stored_session(&self) {
        if let Err(error) = clear_session(self.store.as_ref()) {
            warn!(%error, "Unable to clear stored session");
        }
    }
}
