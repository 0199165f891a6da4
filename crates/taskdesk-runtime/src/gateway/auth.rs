use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use taskdesk_core::auth::Claims;
use taskdesk_core::function::AuthContext;
use taskdesk_core::model::User;

/// Clock skew tolerated when checking `exp`.
const LEEWAY_SECS: u64 = 60;

/// Token signing settings for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret shared by issuer and verifier.
    pub jwt_secret: String,
    /// Lifetime of issued session tokens.
    pub session_ttl_secs: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, session_ttl_secs: u64) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            session_ttl_secs,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Could not issue token: {0}")]
    Issue(String),
}

/// Verifies bearer tokens.
#[derive(Clone)]
pub struct AuthMiddleware {
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for AuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddleware").finish_non_exhaustive()
    }
}

impl AuthMiddleware {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Check signature and expiry, and require `sub` and `exp`.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = LEEWAY_SECS;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("Invalid signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                    AuthError::InvalidToken(format!("Missing required claim: {}", claim))
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    /// Auth context for a request. Missing or bad tokens give an
    /// unauthenticated context; the access gate decides what that means.
    pub fn authenticate(&self, req: &Request<Body>) -> AuthContext {
        let Some(token) = bearer_token(req) else {
            return AuthContext::unauthenticated();
        };

        match self.validate_token(token) {
            Ok(claims) => AuthContext::from_claims(claims),
            Err(e) => {
                debug!(error = %e, "Ignoring bearer token");
                AuthContext::unauthenticated()
            }
        }
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A signed session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Signs session tokens for authenticated users.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_secs: i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX / 2),
        }
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let claims = Claims::for_user(user)
            .ttl_secs(self.ttl_secs)
            .build()
            .map_err(AuthError::Issue)?;
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }
}

/// Axum middleware storing an [`AuthContext`] in request extensions.
pub async fn auth_middleware(
    State(middleware): State<Arc<AuthMiddleware>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = middleware.authenticate(&req);
    req.extensions_mut().insert(auth);
    next.run(req).await
}
