//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::LoanDetails,
        user::{CreateUser, RoleRecord, SessionUser, UpdateUser, User},
    },
    repository::{loans::LoanStore, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check credentials and build the session for the client.
    ///
    /// Unknown email and wrong password fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<SessionUser> {
        let user = self
            .repository
            .users
            .get_by_email(email.trim())
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&user, password)? {
            return Err(invalid_credentials());
        }

        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok(user.into())
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Loans of a user, 404 if the user does not exist
    pub async fn loans(&self, id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(id).await?;
        self.repository.loans.list_for_user(id).await
    }

    /// Create a new user
    pub async fn create(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Duplicate(format!("Email '{}' already exists", user.email)));
        }

        let hash = hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &hash).await?;
        tracing::info!(user_id = created.id, role = %created.role, "User created");
        Ok(created)
    }

    /// Update a user; a new password is re-hashed
    pub async fn update(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        super::check_path_id(id, user.id)?;

        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Duplicate(format!("Email '{}' already exists", email)));
            }
        }

        let hash = user.password.as_deref().map(hash_password).transpose()?;
        self.repository.users.update(id, &user, hash).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn roles(&self) -> AppResult<Vec<RoleRecord>> {
        self.repository.users.list_roles().await
    }
}

fn invalid_credentials() -> AppError {
    AppError::Authentication("Invalid email or password".to_string())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
