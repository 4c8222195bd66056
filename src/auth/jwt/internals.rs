use serde::Deserialize;

#[derive(Deserialize)]
pub struct RawUser {
    pub id: i64,
    pub email: String,
    pub role: String
}

#[derive(Deserialize)]
pub struct RawAuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: RawUser,
    #[serde(default)]
    pub expires_in: Option<u64>
}

#[derive(Deserialize)]
pub struct RawAccessToken {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>
}
