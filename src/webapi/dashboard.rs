use serde_json::Value;

use crate::{
    client::ApiClient,
    web::{Error, RequestOptions}
};

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 10;

pub async fn dashboard_stats(client: &ApiClient) -> Result<Value, Error> {
    client.get("/dashboard/stats/").await
}

pub async fn dashboard_activity(client: &ApiClient, limit: Option<u32>) -> Result<Value, Error> {
    let options = RequestOptions::default().query("limit", limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT));
    client.get_with("/dashboard/activity/", options).await
}

pub async fn public_stats(client: &ApiClient) -> Result<Value, Error> {
    client.get("/public/dashboard/stats/").await
}

pub async fn settings(client: &ApiClient) -> Result<Value, Error> {
    client.get("/settings/").await
}

pub async fn settings_by_category(client: &ApiClient, category: &str) -> Result<Value, Error> {
    client
        .get_with("/settings/by_category/", RequestOptions::default().query("category", category))
        .await
}
