/*
 * Responsibility
 * - Users の request DTO
 * - validate() で形式チェック (未知フィールドは serde 側で拒否)
 */
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub user_name: String,
    pub password: String,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.user_name.trim().is_empty() {
            return Err("user_name is required");
        }
        if self.user_name.chars().count() > 255 {
            return Err("user_name must be <= 255 chars");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        if self.password.len() > 1024 {
            return Err("password must be <= 1024 bytes");
        }

        Ok(())
    }
}
