use std::{sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    auth::{
        jwt::internals::{RawAccessToken, RawAuthResponse},
        Credential, User
    },
    config::endpoints,
    web::{ApiRequest, Error, Method, Transport}
};

mod internals;

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>
}

/// Result of a token refresh. `refresh_token` is only set when the backend rotates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: Option<String>
}

/// Unauthenticated calls against the token endpoints of the backend.
pub struct JwtAuthenticator {
    transport: Arc<dyn Transport>
}

impl JwtAuthenticator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(Credential, User), Error> {
        let body = serde_json::to_value(credentials)?;
        self.authenticate(endpoints::LOGIN, body).await
    }

    pub async fn register(&self, data: &RegisterData) -> Result<(Credential, User), Error> {
        let body = serde_json::to_value(data)?;
        self.authenticate(endpoints::REGISTER, body).await
    }

    /// Trades a refresh token for a new access token. Any non-2xx answer is an error.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, Error> {
        let value = self.post(endpoints::REFRESH, json!({ "refresh": refresh_token })).await?;
        let token: RawAccessToken = serde_json::from_value(value)?;

        Ok(RefreshedToken { access_token: token.access, refresh_token: token.refresh })
    }

    /// Returns whether the backend still accepts `token`. Rejections (400/401) are `false`.
    pub async fn verify(&self, token: &str) -> Result<bool, Error> {
        let request = ApiRequest::new(Method::POST, endpoints::VERIFY).body(json!({ "token": token }));
        let response = self.transport.send(&request, None).await?;

        match response.status {
            status if (200..300).contains(&status) => Ok(true),
            400 | 401 => Ok(false),
            _ => response.into_result().map(|_| false)
        }
    }

    async fn authenticate(&self, path: &str, body: Value) -> Result<(Credential, User), Error> {
        let value = self.post(path, body).await?;
        let response: RawAuthResponse = serde_json::from_value(value)?;
        debug!(user_id = response.user.id, role = %response.user.role, "Authenticated");

        Ok((
            Credential {
                access_token: response.access,
                refresh_token: response.refresh,
                expires_in: response.expires_in.map(Duration::from_secs)
            },
            User { id: response.user.id, email: response.user.email, role: response.user.role }
        ))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, Error> {
        let request = ApiRequest::new(Method::POST, path).body(body);
        self.transport.send(&request, None).await?.into_result()
    }
}
