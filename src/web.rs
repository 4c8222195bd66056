use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderName, HeaderValue, AUTHORIZATION},
    multipart::{Form, Part},
    Client, RequestBuilder
};
pub use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Normalized shape of a failed API call: server message, HTTP status and the raw body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    message: String,
    status: u16,
    data: Option<Value>
}

impl ApiError {
    #[inline]
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self { message: message.into(), status, data: None }
    }

    /// Picks the message out of a backend error body (`detail`, then `message`, then `error`).
    pub fn from_response(status: u16, body: Value) -> Self {
        let message = ["detail", "message", "error"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status code {}", status));

        Self {
            message,
            status,
            data: if body.is_null() { None } else { Some(body) }
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[inline]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.message, self.status)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request Error => {0}")]
    Request(ApiError),
    #[error("Session Ended => {0}")]
    SessionEnded(String),
    #[error("Network Error => {0}")]
    Network(String),
    #[error("Invalid Request => {0}")]
    InvalidRequest(String),
    #[error("Decode Error => {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Store Error => {0}")]
    Store(String),
    #[error("Config Error => {0}")]
    Config(String)
}

impl Error {
    #[inline]
    pub fn is_session_ended(&self) -> bool {
        matches!(self, Error::SessionEnded(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request(error) => Some(error.status()),
            Error::SessionEnded(_) => Some(401),
            _ => None
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::Request(error) => error.message().to_string(),
            Error::SessionEnded(message)
            | Error::Network(message)
            | Error::InvalidRequest(message)
            | Error::Store(message)
            | Error::Config(message) => message.clone(),
            Error::Decode(error) => error.to_string()
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Error::Request(error) => error.data(),
            _ => None
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Network(format!("Request timed out => {}", error))
        } else {
            Error::Network(error.to_string())
        }
    }
}

/// One part of a multipart upload. Kept as plain data so a request can be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file_name: String, mime: Option<String>, bytes: Vec<u8> }
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Text { name: name.into(), value: value.into() }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        FormPart::File { name: name.into(), file_name: file_name.into(), mime: None, bytes }
    }

    pub fn mime(self, mime: impl Into<String>) -> Self {
        match self {
            FormPart::File { name, file_name, bytes, .. } => FormPart::File { name, file_name, mime: Some(mime.into()), bytes },
            text => text
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>)
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<Vec<FormPart>> for Body {
    fn from(parts: Vec<FormPart>) -> Self {
        Body::Multipart(parts)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>
}

impl RequestOptions {
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Everything needed to (re)issue one call against the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
    pub options: RequestOptions
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: Body::Empty, options: RequestOptions::default() }
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options = self.options.query(key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[inline]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Converts a non-2xx response into the normalized error, passing 2xx bodies through.
    pub fn into_result(self) -> Result<Value, Error> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::Request(ApiError::from_response(self.status, self.body)))
        }
    }
}

/// Sends one request and hands back the status and parsed body. Enables mocking in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, Error>;
}

/// Transport over a shared `reqwest::Client`.
pub struct Requester {
    client: Client,
    config: ClientConfig
}

impl Requester {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| Error::Config(format!("Unable to build http client => {}", error)))?;
        Ok(Self { client, config })
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build(&self, request: &ApiRequest, bearer: Option<&str>, request_id: &Uuid) -> Result<RequestBuilder, Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.config.url(&request.path))
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }

        for (name, value) in &request.options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|error| Error::InvalidRequest(format!("Illegal header name {} => {}", name, error)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|error| Error::InvalidRequest(format!("Illegal header value for {} => {}", name.as_str(), error)))?;
            builder = builder.header(name, value);
        }

        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|error| Error::InvalidRequest(format!("Illegal access token => {}", error)))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        Ok(match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => builder.multipart(multipart_form(parts)?)
        })
    }
}

#[async_trait]
impl Transport for Requester {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, Error> {
        let request_id = Uuid::new_v4();
        debug!(method = %request.method, path = %request.path, %request_id, authenticated = bearer.is_some(), "Sending request");

        let response = self.build(request, bearer, &request_id)?.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        debug!(method = %request.method, path = %request.path, %request_id, status, "Received response");
        Ok(RawResponse::new(status, parse_body(text)))
    }
}

fn multipart_form(parts: &[FormPart]) -> Result<Form, Error> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
            FormPart::File { name, file_name, mime, bytes } => {
                let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file
                        .mime_str(mime)
                        .map_err(|error| Error::InvalidRequest(format!("Illegal mime type {} => {}", mime, error)))?;
                }
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}

/// Empty bodies become `Null`, non-JSON bodies are kept as a string.
pub(crate) fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
