use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUpdateUserData {
    pub success: bool,
    pub message: String,
    pub total_users: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<UpdateResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub user_id: String,
    pub login: String,
    /// `success` or `error`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: String,
}
