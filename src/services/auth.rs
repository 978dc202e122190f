//! Authentication and account management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        ChangePassword, LoginRequest, RegisterRequest, Role, UpdateProfile, UpdateUser, User,
        UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account with the default USER role.
    pub async fn register(&self, request: &RegisterRequest) -> AppResult<User> {
        if self.repository.users.email_exists(&request.email, None).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let hash = hash_password(&request.password)?;

        let user = self
            .repository
            .users
            .create(&request.name, &request.email, &hash, Role::User)
            .await?;

        tracing::info!(user_id = user.id, "New user registered");

        Ok(user)
    }

    /// Verify credentials and issue a signed token.
    pub async fn login(&self, request: &LoginRequest) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Internal("User has no password hash".to_string()))?;

        if !verify_password(&request.password, hash)? {
            return Err(AppError::Unauthorized("Invalid email or password".to_string()));
        }

        let token = self.issue_token(&user)?;

        Ok((token, user))
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            name: user.name.clone(),
            role: user.role,
            iat: now,
            exp: now + (self.config.jwt_expiration_hours as i64) * 3600,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Current user's profile, password hash excluded
    pub async fn get_profile(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Update the caller's own name and email.
    pub async fn update_profile(&self, user_id: i32, update: &UpdateProfile) -> AppResult<User> {
        if self
            .repository
            .users
            .email_exists(&update.email, Some(user_id))
            .await?
        {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let current = self.repository.users.get_by_id(user_id).await?;

        self.repository
            .users
            .update(user_id, &update.name, &update.email, current.role)
            .await
    }

    /// Change the caller's password after verifying the current one.
    pub async fn change_password(&self, user_id: i32, request: &ChangePassword) -> AppResult<()> {
        let current = self.repository.users.get_by_id(user_id).await?;

        // get_by_id strips the hash, fetch it through the email lookup
        let with_hash = self
            .repository
            .users
            .get_by_email(&current.email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let hash = with_hash
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Internal("User has no password hash".to_string()))?;

        if !verify_password(&request.current_password, hash)? {
            return Err(AppError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let new_hash = hash_password(&request.new_password)?;
        self.repository.users.update_password(user_id, &new_hash).await
    }

    /// List all accounts (admin)
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// Get a single account (admin)
    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Update an account's name, email and role (admin).
    pub async fn update_user(&self, id: i32, update: &UpdateUser) -> AppResult<User> {
        if self.repository.users.email_exists(&update.email, Some(id)).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        self.repository
            .users
            .update(id, &update.name, &update.email, update.role)
            .await
    }

    /// Delete an account (admin). Admins cannot delete themselves.
    pub async fn delete_user(&self, id: i32, actor: &UserClaims) -> AppResult<()> {
        if actor.user_id == id {
            return Err(AppError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        self.repository.users.delete(id).await
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &hash).unwrap());
        assert!(!verify_password("hunter3!", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }
}
