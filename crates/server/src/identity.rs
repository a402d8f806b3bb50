//! Resolution of the calling user.
//!
//! Two modes are supported:
//!
//! - `trusted_header`: the user id is read verbatim from `x-user-id`. Only
//!   safe behind a gateway that authenticates callers and strips the header
//!   from untrusted traffic.
//! - `signed_token`: `x-user-token` carries an HS256 JWT whose `sub` is the
//!   user id. Expired or badly signed tokens are rejected.

use std::{sync::Arc, time::Duration};

use axum::http::HeaderMap;
use engine::{EngineError, RequestContext, ResultEngine};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_HEADER: &str = "x-user-id";
pub const TOKEN_HEADER: &str = "x-user-token";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IdentitySettings {
    #[default]
    TrustedHeader,
    SignedToken {
        secret: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies user tokens with a shared secret.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Signs a token for `user_id` valid for `ttl`.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> ResultEngine<String> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| EngineError::Internal("token ttl out of range".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| EngineError::Internal(format!("failed to sign token: {err}")))
    }

    /// Returns the token subject.
    pub fn verify(&self, token: &str) -> ResultEngine<String> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature
                | ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => EngineError::Unauthenticated,
                other => EngineError::Internal(format!("failed to validate token: {other:?}")),
            })
    }
}

#[derive(Clone, Debug)]
pub enum Identity {
    TrustedHeader,
    SignedToken(Arc<TokenSigner>),
}

impl Identity {
    pub fn from_settings(settings: &IdentitySettings) -> Self {
        match settings {
            IdentitySettings::TrustedHeader => {
                tracing::warn!(
                    "identity mode trusted_header: {USER_HEADER} is trusted as is, run behind an authenticating gateway"
                );
                Self::TrustedHeader
            }
            IdentitySettings::SignedToken { secret } => {
                Self::SignedToken(Arc::new(TokenSigner::new(secret.as_bytes())))
            }
        }
    }

    /// Builds the request context of the caller, without deadline.
    pub fn resolve(&self, headers: &HeaderMap) -> ResultEngine<RequestContext> {
        match self {
            Self::TrustedHeader => RequestContext::from_identity(header(headers, USER_HEADER)),
            Self::SignedToken(signer) => {
                let token = header(headers, TOKEN_HEADER).ok_or(EngineError::Unauthenticated)?;
                let subject = signer.verify(token)?;
                RequestContext::from_identity(Some(&subject))
            }
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
