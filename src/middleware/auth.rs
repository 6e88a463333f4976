//! # 신원 확인 (JWT)
//!
//! `Authorization: Bearer <jwt>` 헤더에서 현재 사용자(`Contact`)를 꺼냅니다.
//! - 헤더 없음 → 손님(guest)
//! - 서명이 틀리거나 만료된 토큰 → 401

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Contact;
use crate::routes::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // contact id
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub pc: bool,
    #[serde(default)]
    pub chair: bool,
    pub exp: i64,
    pub iat: i64,
}

impl FromRequestParts<AppState> for Contact {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Contact::guest());
        };
        let token = auth_header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::InvalidToken)?;

        let claims = verify_access_token(token, &state.config.jwt_secret)?;
        let id = claims.sub.parse::<i64>().map_err(|_| AuthError::InvalidToken)?;

        Ok(Contact {
            id: Some(id),
            email: claims.email,
            is_pc: claims.pc || claims.chair,
            is_chair: claims.chair,
        })
    }
}

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken => {
                AppError::Unauthorized("Invalid authorization token".to_string())
            }
            AuthError::ExpiredToken => {
                AppError::Unauthorized("Authorization token has expired".to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// 사용자에 대한 신원 토큰을 발급합니다.
pub fn create_access_token(
    contact: &Contact,
    secret: &str,
    lifetime: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: contact.id.unwrap_or_default().to_string(),
        email: contact.email.clone(),
        pc: contact.is_pc,
        chair: contact.is_chair,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
