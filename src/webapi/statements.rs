use serde_json::{json, Map, Value};

use crate::{
    client::ApiClient,
    web::{Error, RequestOptions}
};

resource!(statement, statements, "/statements/");
resource!(area_of_law, areas_of_law, "/areas-of-law/");

pub async fn ungraded_statements(client: &ApiClient) -> Result<Value, Error> {
    client.get("/statements/ungraded/").await
}

pub async fn statement_statistics(client: &ApiClient) -> Result<Value, Error> {
    client.get("/statements/statistics/").await
}

/// Grades one statement. `criteria_scores` maps rubric criterion ids to scores.
pub async fn grade_statement(
    client: &ApiClient,
    id: &str,
    score: f64,
    comments: Option<&str>,
    criteria_scores: Option<Map<String, Value>>
) -> Result<Value, Error> {
    let mut body = json!({ "score": score });
    if let Some(comments) = comments {
        body["comments"] = json!(comments);
    }
    if let Some(criteria_scores) = criteria_scores {
        body["criteria_scores"] = Value::Object(criteria_scores);
    }
    client.post(&format!("/statements/{}/grade/", id), body).await
}

pub async fn areas_of_law_with_counts(client: &ApiClient) -> Result<Value, Error> {
    client.get("/areas-of-law/with_counts/").await
}

pub async fn grading_rubrics(client: &ApiClient) -> Result<Value, Error> {
    client.get("/grading-rubrics/").await
}

pub async fn active_grading_rubrics(client: &ApiClient) -> Result<Value, Error> {
    client.get("/grading-rubrics/active/").await
}

/// The rubric attached to one area of law.
pub async fn grading_rubric_for_area(client: &ApiClient, area_id: &str) -> Result<Value, Error> {
    client
        .get_with("/grading-rubrics/for_area/", RequestOptions::default().query("area_id", area_id))
        .await
}

pub async fn grading_criteria(client: &ApiClient) -> Result<Value, Error> {
    client.get("/grading-criteria/").await
}

pub async fn grading_dashboard(client: &ApiClient) -> Result<Value, Error> {
    client.get("/grades/dashboard/").await
}

pub async fn grade_imports(client: &ApiClient) -> Result<Value, Error> {
    client.get("/grade-imports/").await
}

pub async fn import_grades(client: &ApiClient, file_name: &str, bytes: Vec<u8>, mime: &str) -> Result<Value, Error> {
    client.post("/grade-imports/import_file/", super::upload(file_name, bytes, mime)).await
}
