use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, error};

use crate::db::ContactSubmission;
use crate::error::{AppError, StoreError};
use crate::{present, AppState, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub first_name: Option<Value>,
    pub last_name: Option<Value>,
    pub email: Option<Value>,
    pub phone: Option<Value>,
    pub message: Option<Value>,
}

impl ContactRequest {
    fn into_submission(self) -> Option<ContactSubmission> {
        Some(ContactSubmission {
            first_name: present(self.first_name)?,
            last_name: present(self.last_name)?,
            email: present(self.email)?,
            phone: present(self.phone)?,
            message: present(self.message)?,
        })
    }
}

fn store_failure(context: &str, err: StoreError) -> AppError {
    error!("{} failed: {}", context, err);
    AppError::from(err)
}

pub async fn submit_contact(
    req: web::Json<ContactRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let contact = req
        .into_inner()
        .into_submission()
        .ok_or_else(|| AppError::ValidationError("All fields are required!".into()))?;

    let key = state
        .db
        .create_contact(&contact)
        .await
        .map_err(|e| store_failure("Contact submission", e))?;

    info!("Stored contact submission {} from {}", key, contact.email);
    Ok(HttpResponse::Ok().json(json!({
        "success": "Contact form submitted successfully!"
    })))
}

#[derive(Debug, Deserialize)]
pub struct PlotsQuery {
    pub region: Option<String>,
}

pub async fn get_plots(
    query: web::Query<PlotsQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let region = query
        .into_inner()
        .region
        .filter(|region| !region.is_empty())
        .ok_or_else(|| AppError::ValidationError("Region parameter is required".into()))?;

    let plots = state
        .db
        .get_plots(Some(&region))
        .await
        .map_err(|e| store_failure("Plot query", e))?;

    if plots.is_empty() {
        return Err(AppError::NotFound(format!("No plots found in region: {}", region)));
    }

    info!("Returning {} plots for region {}", plots.len(), region);
    Ok(HttpResponse::Ok().json(plots))
}

pub async fn get_properties(state: web::Data<AppState>) -> Result<HttpResponse> {
    let plots = state
        .db
        .get_plots(None)
        .await
        .map_err(|e| store_failure("Property listing", e))?;

    if plots.is_empty() {
        return Err(AppError::NotFound("No properties found".into()));
    }

    Ok(HttpResponse::Ok().json(plots))
}
