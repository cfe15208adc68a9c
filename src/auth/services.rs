use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::{AppError, AppResult},
    store::{AuctionStore, StoreError},
};

const MAX_USERNAME_LEN: usize = 150;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates an account. Password/confirmation mismatch is reported before any
/// other check so the form feedback matches what the user typed last.
pub async fn register(store: &dyn AuctionStore, mut req: RegisterRequest) -> AppResult<User> {
    if req.password != req.confirmation {
        warn!(username = %req.username, "password confirmation mismatch");
        return Err(AppError::PasswordMismatch);
    }

    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    if req.username.is_empty() || req.username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be between 1 and {MAX_USERNAME_LEN} characters."
        )));
    }
    if !req.email.is_empty() && !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(AppError::Validation("Invalid email.".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required.".into()));
    }

    let hash = hash_password(&req.password)?;

    let user = match store.create_user(&req.username, &req.email, &hash).await {
        Ok(u) => u,
        Err(StoreError::Conflict(_)) => {
            warn!(username = %req.username, "username already taken");
            return Err(AppError::DuplicateUser);
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn authenticate(store: &dyn AuctionStore, username: &str, password: &str) -> AppResult<User> {
    let username = username.trim();
    let Some(user) = store.find_user_by_username(username).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub fn issue_tokens(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}
