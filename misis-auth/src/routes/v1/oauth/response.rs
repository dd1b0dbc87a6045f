use serde::Serialize;

/// The discovery document.
#[derive(Serialize)]
pub struct GetInfo {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub profile_endpoint: String,
    pub token_validation_endpoint: String,
    pub scopes_supported: Vec<&'static str>,
    pub response_types_supported: Vec<&'static str>,
    pub grant_types_supported: Vec<&'static str>,
    pub token_endpoint_auth_methods_supported: Vec<&'static str>,
    pub code_challenge_methods_supported: Vec<&'static str>,
    pub service_documentation: String,
    pub ui_locales_supported: Vec<&'static str>,
}
