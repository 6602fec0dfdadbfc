use actix_web::{dev::Payload, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name of the cookie carrying the session JWT.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parses a stored role column. Unknown values are treated as `user`.
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            "guest" => Role::Guest,
            _ => Role::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// HS256 signer/validator bound to the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create a token valid for one day.
    pub fn sign(&self, user_id: i32, email: &str, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let expiration = (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            exp: expiration,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Validate a JWT and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Token presented by the caller: `Authorization: Bearer` first, then the session cookie.
fn presented_token(req: &HttpRequest) -> Option<String> {
    // BearerAuth's future is `Ready`, so it resolves synchronously.
    let bearer = BearerAuth::from_request(req, &mut Payload::None)
        .into_inner()
        .ok()
        .map(|b| b.token().to_string());
    bearer.or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

/// Role of the caller for quota purposes. Anything unverifiable is a guest.
pub fn caller_role(req: &HttpRequest, keys: &JwtKeys) -> Role {
    presented_token(req)
        .and_then(|token| keys.verify(&token).ok())
        .map(|claims| claims.role)
        .unwrap_or(Role::Guest)
}
