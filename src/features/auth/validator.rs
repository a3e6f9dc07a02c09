use super::model::AuthenticatedUser;
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

/// Validates HS256 access tokens minted by the user service
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(rename = "exp")]
    _exp: u64,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.jwt_leeway.as_secs();
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let claims = token_data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            role: claims.role.unwrap_or_else(|| "user".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::time::Duration;

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        role: &'a str,
        exp: u64,
        iss: &'a str,
    }

    fn config(issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: SECRET.to_string(),
            issuer: issuer.map(String::from),
            jwt_leeway: Duration::from_secs(0),
        }
    }

    fn token(sub: &str, role: &str, exp: u64, iss: &str) -> String {
        let claims = TestClaims { sub, role, exp, iss };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    #[test]
    fn test_valid_token_yields_user() {
        let user_id = Uuid::new_v4();
        let validator = JwtValidator::new(&config(None));

        let user = validator
            .validate_token(&token(&user_id.to_string(), "admin", future_exp(), "lapor"))
            .unwrap();

        assert_eq!(user.user_id, user_id);
        assert!(user.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new(&config(None));
        let expired = (chrono::Utc::now().timestamp() - 3600) as u64;

        let result = validator.validate_token(&token(&Uuid::new_v4().to_string(), "user", expired, "lapor"));

        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let validator = JwtValidator::new(&config(Some("lapor")));

        let result = validator.validate_token(&token(
            &Uuid::new_v4().to_string(),
            "user",
            future_exp(),
            "someone-else",
        ));

        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let validator = JwtValidator::new(&config(None));

        let result = validator.validate_token(&token("not-a-uuid", "user", future_exp(), "lapor"));

        assert!(matches!(result, Err(AppError::Auth(_))));
    }
}
