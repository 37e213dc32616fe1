use std::time::Duration;

use anyhow::{Context, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use gather_types::api::Claims;
use gather_types::models::User;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// Token lifetime; doubles as the blacklist TTL so a revoked token never
    /// outlives what would have been its natural expiry.
    pub token_ttl: Duration,
}

/// Issues a signed bearer token carrying the user's identity and role.
pub fn create_token(cfg: &AuthConfig, user: &User) -> anyhow::Result<String> {
    let exp = chrono::Utc::now() + chrono::Duration::from_std(cfg.token_ttl)?;
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.to_string(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .context("token signing failed")
}

/// Full verification: signature, expiry, issuer and audience.
pub fn decode_token(cfg: &AuthConfig, token: &str) -> anyhow::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&cfg.issuer]);
    validation.set_audience(&[&cfg.audience]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| anyhow!("token rejected: {e}"))?;
    Ok(data.claims)
}

/// Extracts the email claim from an `Authorization: Bearer <token>` header
/// value. Decode-only: the auth middleware has already verified signature and
/// expiry, so this does not re-check them. `None` for a malformed header or
/// token.
pub fn email_from_header(authorization: &str) -> Option<String> {
    let token = authorization.strip_prefix("Bearer ")?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Some(data.claims.email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_types::models::{Credential, Role};

    fn cfg() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".into(),
            issuer: "gather-test".into(),
            audience: "gather-clients".into(),
            token_ttl: Duration::from_secs(3600),
        }
    }

    fn user() -> User {
        User {
            id: 42,
            username: "maria1".into(),
            email: "maria@example.com".into(),
            role: Role::EventOrganizer,
            credential: Credential::Local { password_hash: "h".into() },
            profile_picture_id: None,
        }
    }

    #[test]
    fn token_round_trips_identity_and_role() {
        let cfg = cfg();
        let token = create_token(&cfg, &user()).unwrap();
        let claims = decode_token(&cfg, &token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "maria@example.com");
        assert_eq!(claims.role, "EventOrganizer");
        assert_eq!(claims.iss, "gather-test");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let cfg = cfg();
        let token = create_token(&cfg, &user()).unwrap();

        let mut other = cfg.clone();
        other.secret = "different".into();
        assert!(decode_token(&other, &token).is_err());
    }

    #[test]
    fn email_extraction_is_decode_only() {
        let cfg = cfg();
        let token = create_token(&cfg, &user()).unwrap();

        let header = format!("Bearer {token}");
        assert_eq!(email_from_header(&header).as_deref(), Some("maria@example.com"));

        assert!(email_from_header(&token).is_none()); // missing scheme
        assert!(email_from_header("Bearer not.a.jwt").is_none());
        assert!(email_from_header("").is_none());
    }
}
