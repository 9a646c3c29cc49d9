//! API handlers for SEGA REST endpoints

pub mod auth;
pub mod categories;
pub mod equipment;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
