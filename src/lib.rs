#[cfg(test)]
#[path = "../test/mod.rs"]
mod test;

#[cfg(feature = "web")]
pub mod config;

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "auth")]
pub mod client;

#[cfg(feature = "webapi")]
pub mod webapi;

#[cfg(feature = "auth")]
pub use client::ApiClient;
