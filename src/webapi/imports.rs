use serde_json::{json, Value};

use crate::{client::ApiClient, web::Error};

pub async fn create_import_job(client: &ApiClient, kind: &str) -> Result<Value, Error> {
    client.post("/imports/", json!({ "type": kind })).await
}

pub async fn list_import_jobs(client: &ApiClient) -> Result<Value, Error> {
    client.get("/imports/").await
}
