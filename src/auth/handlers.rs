use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn, error};

use crate::auth::middleware::Identity;
use crate::db::User;
use crate::error::AppError;
use crate::{present, AppState, Result};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (Some(Value::String(email)), Some(password)) = (
        present(req.email.clone()),
        req.password.as_ref().filter(|p| !p.is_null()),
    ) else {
        return Err(AppError::ValidationError("Email and password are required".into()));
    };
    info!("Received login request for email: {}", email);

    let user = state
        .db
        .get_user_by_email(&email)
        .await
        .map_err(|e| {
            error!("User lookup failed for {}: {}", email, e);
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if &user.password != password {
        warn!("Login failed for email: {}: password mismatch", email);
        return Err(AppError::Unauthorized("Invalid password".into()));
    }

    let token = state.tokens.issue(&user.email)?;
    info!("Login successful for email: {}", email);
    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful",
        token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<Value>,
    pub phone: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
    pub address: Option<Value>,
}

impl SignupRequest {
    fn into_user(self) -> Result<User> {
        let missing = || AppError::ValidationError("All fields are required".into());

        // The email doubles as the document key, so it has to be text.
        let email = match present(self.email).ok_or_else(missing)? {
            Value::String(email) => email,
            _ => return Err(AppError::ValidationError("Email must be a string".into())),
        };

        Ok(User {
            name: present(self.name).ok_or_else(missing)?,
            phone: present(self.phone).ok_or_else(missing)?,
            email,
            password: present(self.password).ok_or_else(missing)?,
            address: present(self.address).ok_or_else(missing)?,
        })
    }
}

pub async fn signup(
    req: web::Json<SignupRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = req.into_inner().into_user()?;
    info!("Received signup request for email: {}", user.email);

    // Check-then-set: two concurrent signups for one email can both pass this.
    if state.db.user_exists(&user.email).await? {
        warn!("Signup rejected, user already exists: {}", user.email);
        return Err(AppError::Conflict("User already exists".into()));
    }

    state.db.create_user(&user).await.map_err(|e| {
        error!("Signup failed for email: {}: {}", user.email, e);
        AppError::from(e)
    })?;

    info!("Signup successful for email: {}", user.email);
    Ok(HttpResponse::Created().json(json!({
        "message": "Signup successful!"
    })))
}

/// Returns the stored record of the caller identified by the bearer token.
pub async fn user_details(
    identity: Identity,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = state
        .db
        .get_user_by_email(&identity.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found!".into()))?;

    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
