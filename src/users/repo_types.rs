use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Never serialized directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub account_created: OffsetDateTime,
    pub account_updated: OffsetDateTime,
    pub token: Option<String>,
    pub token_expiry: Option<OffsetDateTime>,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub verification_token_expiry: Option<OffsetDateTime>,
}

/// Everything needed to insert a user; ids and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub token: String,
    pub token_expiry: OffsetDateTime,
    pub verification_token: String,
    pub verification_token_expiry: OffsetDateTime,
}

/// Partial profile update. `account_updated` is always written.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}
