use serde_json::Value;

use crate::{
    client::ApiClient,
    web::{Error, RequestOptions}
};

resource!(student, students, "/students/");

pub async fn student_profile(client: &ApiClient, id: &str) -> Result<Value, Error> {
    client.get(&format!("/students/{}/profile/", id)).await
}

pub async fn unmatched_students(client: &ApiClient) -> Result<Value, Error> {
    client.get("/students/unmatched/").await
}

/// Students whose profile still waits for an administrator's approval.
pub async fn students_needing_approval(client: &ApiClient) -> Result<Value, Error> {
    client.get("/students/needs_approval/").await
}

/// Uploads a student roster. Parsing happens on the backend; the answer is the import status.
pub async fn import_students_csv(client: &ApiClient, file_name: &str, bytes: Vec<u8>) -> Result<Value, Error> {
    client.post("/students/import_csv/", super::upload(file_name, bytes, "text/csv")).await
}

pub async fn upload_grades_pdf(client: &ApiClient, id: &str, file_name: &str, bytes: Vec<u8>) -> Result<Value, Error> {
    client
        .post(&format!("/students/{}/upload_grades_pdf/", id), super::upload(file_name, bytes, "application/pdf"))
        .await
}
