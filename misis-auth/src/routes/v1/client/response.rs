use serde::Serialize;

#[derive(Serialize)]
pub struct PostClient {
    pub data: PostClientData,
}

#[derive(Serialize)]
pub struct PostClientData {
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Serialize)]
pub struct GetClientCount {
    pub data: GetCountData,
}

#[derive(Serialize)]
pub struct GetCountData {
    pub count: u64,
}

#[derive(Serialize)]
pub struct GetClientList {
    pub data: Vec<GetClientData>,
}

#[derive(Serialize)]
pub struct GetClient {
    pub data: GetClientData,
}

#[derive(Serialize)]
pub struct GetClientData {
    #[serde(rename = "clientId")]
    pub client_id: String,
    /// Only included for a single client.
    #[serde(rename = "clientSecret", skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "redirectUris")]
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "modifiedAt")]
    pub modified_at: String,
}
