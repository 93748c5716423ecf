use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}
