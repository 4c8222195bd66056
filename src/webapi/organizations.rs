use serde_json::{json, Value};

use crate::{
    client::ApiClient,
    web::{Error, RequestOptions}
};

resource!(organization, organizations, "/organizations/");
resource!(contact, contacts, "/organization-contacts/");

pub async fn organizations_with_available_positions(client: &ApiClient) -> Result<Value, Error> {
    client.get("/organizations/with_available_positions/").await
}

pub async fn organization_statistics(client: &ApiClient) -> Result<Value, Error> {
    client.get("/organizations/statistics/").await
}

pub async fn organization_contacts(client: &ApiClient, organization_id: &str) -> Result<Value, Error> {
    client.get(&format!("/organizations/{}/contacts/", organization_id)).await
}

pub async fn set_primary_contact(client: &ApiClient, contact_id: &str) -> Result<Value, Error> {
    client.post(&format!("/organization-contacts/{}/set_as_primary/", contact_id), json!({})).await
}

pub async fn import_organizations_csv(client: &ApiClient, file_name: &str, bytes: Vec<u8>) -> Result<Value, Error> {
    client.post("/organizations/import_csv/", super::upload(file_name, bytes, "text/csv")).await
}
