use serde::Deserialize;
use serde_with;

#[derive(Deserialize)]
pub struct ClientIdPath {
    pub client_id: String,
}

#[derive(Deserialize)]
pub struct PostClientBody {
    pub data: PostClientData,
}

#[derive(Deserialize)]
pub struct PostClientData {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "redirectUris")]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Deserialize)]
pub struct GetClientListQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct PatchClientBody {
    pub data: PatchClientData,
}

#[derive(Deserialize)]
pub struct PatchClientData {
    pub name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(rename = "redirectUris")]
    pub redirect_uris: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}
