use serde::{Deserialize, Serialize};

/// Restricts a token to one operation. Access tokens carry no purpose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Verify,
    Reset,
    /// Any tag this service never issues; it matches no operation.
    #[serde(other)]
    Other,
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>, // user email
    pub exp: i64,            // expires at (unix timestamp)
    #[serde(default)]
    pub iat: i64,            // issued at (unix timestamp)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<TokenPurpose>,
}
