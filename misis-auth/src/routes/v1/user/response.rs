use serde::Serialize;

#[derive(Serialize)]
pub struct GetUser {
    pub id: String,
    pub email: String,
    pub login: String,
    pub profile: GetUserProfile,
}

/// Profile subset of the user info.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserProfile {
    pub full_name: Option<String>,
    pub record_book_number: Option<String>,
    pub study_form: Option<String>,
    pub preparation_level: Option<String>,
    pub specialization: Option<String>,
    pub specialty: Option<String>,
    pub faculty: Option<String>,
    pub course: Option<String>,
    pub group: Option<String>,
    pub financing_form: Option<String>,
    pub personal_email: Option<String>,
    pub personal_phone: Option<String>,
    pub corporate_email: Option<String>,
}

#[derive(Serialize)]
pub struct GetProfile {
    pub id: String,
    pub email: String,
    pub login: String,
    #[serde(flatten)]
    pub profile: crate::models::user::Profile,
}
