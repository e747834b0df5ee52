use crate::app::ports::AuthPort;
use crate::domain::AuthUser;
use crate::error::{FarmError, Result};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

const AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies Supabase access tokens signed with the project's HS256 JWT secret.
pub struct JwtAuth {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation }
    }
}

#[async_trait]
impl AuthPort for JwtAuth {
    async fn verify(&self, token: &str) -> Result<AuthUser> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| FarmError::Unauthorized(format!("invalid token: {}", e)))?;
        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| FarmError::Unauthorized("token subject is not a user id".into()))?;
        Ok(AuthUser { id, email: data.claims.email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        aud: &'a str,
        exp: i64,
        email: &'a str,
    }

    fn token(secret: &str, sub: &str, aud: &str, exp: i64) -> String {
        let claims = TestClaims { sub, aud, exp, email: "sam@farm.test" };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn accepts_authenticated_tokens() {
        let id = Uuid::new_v4();
        let auth = JwtAuth::new("secret");
        let user = auth
            .verify(&token("secret", &id.to_string(), AUDIENCE, in_an_hour()))
            .await
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("sam@farm.test"));
    }

    #[tokio::test]
    async fn rejects_wrong_secret_audience_and_expiry() {
        let id = Uuid::new_v4().to_string();
        let auth = JwtAuth::new("secret");
        for bad in [
            token("other", &id, AUDIENCE, in_an_hour()),
            token("secret", &id, "anon", in_an_hour()),
            token("secret", &id, AUDIENCE, chrono::Utc::now().timestamp() - 3600),
            token("secret", "not-a-uuid", AUDIENCE, in_an_hour()),
        ] {
            assert!(matches!(auth.verify(&bad).await, Err(FarmError::Unauthorized(_))));
        }
    }
}
