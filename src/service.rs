//! Credential hashing and user sign-up / authentication over a [`UserRepo`].

use tracing::{error, info};

use crate::models::{NewUser, NewUserRecord, User};
use crate::repo::{RepoError, UserRepo};

/// bcrypt work factor used for new hashes.
pub const BCRYPT_COST: u32 = 10;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("User with this email already exists")]
    DuplicateEmail,
    #[error("User not found")]
    NotFound,
    #[error("Invalid password")]
    InvalidCredential,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AuthError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AuthError::DuplicateEmail,
            other => AuthError::Repo(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Runs a bcrypt call off the async executor.
async fn blocking<T, F>(f: F) -> AuthResult<T>
where
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub async fn hash_password(password: &str) -> AuthResult<String> {
    let password = password.to_owned();
    blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .inspect_err(|e| error!("Error while hashing password: {e}"))
}

pub async fn compare_password(password: &str, hashed: &str) -> AuthResult<bool> {
    let (password, hashed) = (password.to_owned(), hashed.to_owned());
    blocking(move || bcrypt::verify(password, &hashed))
        .await
        .inspect_err(|e| error!("Error while comparing password: {e}"))
}

/// Inserts a new user after checking the email is free. The returned
/// [`User`] never includes the password hash.
pub async fn create_user(repo: &dyn UserRepo, new: NewUser) -> AuthResult<User> {
    insert_unique(repo, new)
        .await
        .inspect_err(|e| error!("Error while creating user: {e}"))
}

pub async fn authenticate_user(repo: &dyn UserRepo, email: &str, password: &str) -> AuthResult<User> {
    check_credentials(repo, email, password)
        .await
        .inspect_err(|e| error!("Error while authenticating user: {e}"))
}

async fn insert_unique(repo: &dyn UserRepo, new: NewUser) -> AuthResult<User> {
    if repo.find_by_email(&new.email).await?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }
    let password_hash = hash_password(&new.password).await?;
    let user = repo
        .insert(NewUserRecord {
            name: new.name,
            email: new.email,
            password_hash,
            role: new.role,
        })
        .await?;
    info!("User created successfully: {}", user.email);
    Ok(user)
}

async fn check_credentials(repo: &dyn UserRepo, email: &str, password: &str) -> AuthResult<User> {
    let record = repo.find_by_email(email).await?.ok_or(AuthError::NotFound)?;
    if !compare_password(password, &record.password_hash).await? {
        return Err(AuthError::InvalidCredential);
    }
    info!("User authenticated successfully: {email}");
    Ok(User::from(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_and_verifies() {
        let a = hash_password("hunter22").await.unwrap();
        let b = hash_password("hunter22").await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$2"));
        assert!(!a.contains("hunter22"));
        assert!(compare_password("hunter22", &a).await.unwrap());
        assert!(!compare_password("hunter23", &a).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let err = compare_password("x", "not-a-bcrypt-hash").await.unwrap_err();
        assert!(matches!(err, AuthError::Hashing(_)));
    }

    #[test]
    fn repo_conflict_maps_to_duplicate() {
        assert!(matches!(AuthError::from(RepoError::Conflict), AuthError::DuplicateEmail));
        assert!(matches!(
            AuthError::from(RepoError::Internal("boom".into())),
            AuthError::Repo(_)
        ));
    }
}
