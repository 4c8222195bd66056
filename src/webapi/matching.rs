use serde_json::{json, Value};

use crate::{
    client::ApiClient,
    web::{Error, RequestOptions}
};

resource!(round, rounds, "/matching/rounds/");
resource!(preference, preferences, "/matching/preferences/");

/// Starts the matching algorithm for a round. Scoring runs on the backend.
pub async fn run_algorithm(client: &ApiClient, round_id: &str) -> Result<Value, Error> {
    client.post(&format!("/matching/rounds/{}/run_algorithm/", round_id), json!({})).await
}

pub async fn round_matches(client: &ApiClient, round_id: &str) -> Result<Value, Error> {
    client.get(&format!("/matching/rounds/{}/matches/", round_id)).await
}

pub async fn round_statistics(client: &ApiClient, round_id: &str) -> Result<Value, Error> {
    client.get(&format!("/matching/rounds/{}/statistics/", round_id)).await
}

pub async fn matching_statistics(client: &ApiClient) -> Result<Value, Error> {
    client.get("/matching/rounds/statistics/").await
}

pub async fn list_matches(client: &ApiClient, options: RequestOptions) -> Result<Value, Error> {
    client.get_with("/matching/matches/", options).await
}

pub async fn get_match(client: &ApiClient, id: &str) -> Result<Value, Error> {
    client.get(&format!("/matching/matches/{}/", id)).await
}

pub async fn update_match_status(client: &ApiClient, id: &str, status: &str, notes: Option<&str>) -> Result<Value, Error> {
    let mut body = json!({ "status": status });
    if let Some(notes) = notes {
        body["notes"] = json!(notes);
    }
    client.post(&format!("/matching/matches/{}/update_status/", id), body).await
}
