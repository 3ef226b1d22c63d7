use actix_web::cookie::time::Duration;
use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::session::CookieDirective;
use crate::error::AppError;
use crate::AppState;

pub const REGISTERED_MESSAGE: &str = "User registered successfully.";
pub const LOGGED_IN_MESSAGE: &str = "Login successful.";
pub const LOGGED_OUT_MESSAGE: &str = "Logout successful.";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Renders a directive as an actix cookie. Attribute order in the resulting
/// `Set-Cookie` header is fixed by the cookie crate:
/// `NAME=VALUE; HttpOnly; [Secure; ]Path=/; Max-Age=N`.
pub fn to_cookie(directive: &CookieDirective) -> Cookie<'static> {
    let mut cookie = Cookie::new(directive.name.clone(), directive.value.clone());
    cookie.set_path(directive.path.clone());
    cookie.set_http_only(directive.http_only);
    cookie.set_max_age(Duration::seconds(directive.max_age_secs));
    if directive.secure {
        cookie.set_secure(true);
    }
    cookie
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", req.username);

    match state.auth_service.register(&req.username, &req.password).await {
        Ok(_) => Ok(HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(REGISTERED_MESSAGE)),
        Err(e) => {
            warn!("Registration failed for username: {}: {}", req.username, e);
            Err(e.into())
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for username: {}", req.username);

    let directive = state.auth_service.login(&req.username, &req.password).await?;

    Ok(HttpResponse::Ok()
        .cookie(to_cookie(&directive))
        .content_type("text/plain; charset=utf-8")
        .body(LOGGED_IN_MESSAGE))
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let token = req
        .cookie(state.auth_service.session_cookie_name())
        .map(|cookie| cookie.value().to_string());

    let directive = state.auth_service.logout(token.as_deref());
    info!("Logout processed");

    HttpResponse::Ok()
        .cookie(to_cookie(&directive))
        .content_type("text/plain; charset=utf-8")
        .body(LOGGED_OUT_MESSAGE)
}
