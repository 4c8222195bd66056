//! Thin wrappers over the platform endpoints.
//!
//! Entities are passed through as opaque JSON; the backend owns their shape.
//! Every function goes through [`ApiClient`](crate::client::ApiClient), so token
//! refresh and session-end handling apply uniformly.

/// Generates list/get/create/update/delete for a router-registered collection.
macro_rules! resource {
    ($singular: ident, $plural: ident, $base: literal) => {
        paste::paste! {
            pub async fn [<list_ $plural>](client: &ApiClient, options: RequestOptions) -> Result<Value, Error> {
                client.get_with($base, options).await
            }

            pub async fn [<get_ $singular>](client: &ApiClient, id: &str) -> Result<Value, Error> {
                client.get(&format!(concat!($base, "{}/"), id)).await
            }

            pub async fn [<create_ $singular>](client: &ApiClient, data: Value) -> Result<Value, Error> {
                client.post($base, data).await
            }

            pub async fn [<update_ $singular>](client: &ApiClient, id: &str, data: Value) -> Result<Value, Error> {
                client.patch(&format!(concat!($base, "{}/"), id), data).await
            }

            pub async fn [<delete_ $singular>](client: &ApiClient, id: &str) -> Result<(), Error> {
                client.delete::<Value>(&format!(concat!($base, "{}/"), id)).await.map(|_| ())
            }
        }
    };
}

pub mod dashboard;
pub mod imports;
pub mod matching;
pub mod organizations;
pub mod statements;
pub mod students;

use crate::web::FormPart;

/// A single uploaded file in the `file` field, as the import endpoints expect it.
pub fn upload(file_name: impl Into<String>, bytes: Vec<u8>, mime: &str) -> Vec<FormPart> {
    vec![FormPart::file("file", file_name, bytes).mime(mime)]
}
