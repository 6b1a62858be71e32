/*
 * Responsibility
 * - Users の request/response DTO
 * - validate() で形式チェック (repo に渡す前に弾く)
 */
use serde::{Deserialize, Serialize};

use crate::repos::User;

const MAX_LEN: usize = 256;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    // explicit key; omitted -> generated
    pub id: Option<i32>,
    pub user_name: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(id) = self.id
            && id <= 0
        {
            return Err("id must be positive");
        }
        validate_user_name(&self.user_name)?;
        validate_email(&self.email)?;
        if let Some(name) = &self.full_name
            && name.len() > MAX_LEN
        {
            return Err("full_name must be <= 256 chars");
        }

        Ok(())
    }

    pub fn into_user(self) -> User {
        User {
            id: self.id,
            user_name: self.user_name.trim().to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name,
        }
    }
}

/// Full replacement of a user (PUT semantics).
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub user_name: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_user_name(&self.user_name)?;
        validate_email(&self.email)?;
        if let Some(name) = &self.full_name
            && name.len() > MAX_LEN
        {
            return Err("full_name must be <= 256 chars");
        }
        Ok(())
    }

    pub fn into_user(self, id: i32) -> User {
        User {
            id: Some(id),
            user_name: self.user_name.trim().to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name,
        }
    }
}

fn validate_user_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("user_name is required");
    }
    if name.len() > MAX_LEN {
        return Err("user_name must be <= 256 chars");
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && email.len() <= MAX_LEN => {
            Ok(())
        }
        _ => Err("email is invalid"),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListUsersQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub user_name: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            // saved rows always carry their key
            id: user.id.unwrap_or_default(),
            user_name: user.user_name,
            email: user.email,
            full_name: user.full_name,
        }
    }
}
