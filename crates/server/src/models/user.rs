use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<i64>,
    pub public_key: Option<String>,
    /// Device address for offline pushes; never sent back out.
    #[serde(skip)]
    pub push_token: Option<String>,
    pub created_at: i64,
    #[sqlx(skip)]
    #[serde(default)]
    pub contacts: Vec<String>,
    #[sqlx(skip)]
    #[serde(default)]
    pub blocked_users: Vec<String>,
}

/// What other users get to see.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<i64>,
    pub public_key: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            profile_image: u.profile_image,
            bio: u.bio,
            is_online: u.is_online,
            last_seen: u.last_seen,
            public_key: u.public_key,
        }
    }
}

/// `PUT /api/users/profile`. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub phone: Option<String>,
    pub public_key: Option<String>,
}

/// `PUT /api/users/push-token`. A null token stops pushes to the user.
#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    pub token: Option<String>,
}
