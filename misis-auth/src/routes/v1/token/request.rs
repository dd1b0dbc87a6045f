use serde::Deserialize;

#[derive(Deserialize)]
pub struct PostValidateBody {
    pub access_token: Option<String>,
}
