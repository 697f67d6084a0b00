use crate::error::{AppError, AppResult};
use crate::models::{Actor, ActorRole};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// 商城签发的访问令牌
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub name: String,
    pub role: String, // administrator / shop_manager / customer
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

impl Claims {
    pub fn actor(&self) -> AppResult<Actor> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;
        let role = ActorRole::parse(&self.role)
            .ok_or_else(|| AppError::AuthError(format!("Unknown role: {}", self.role)))?;
        Ok(Actor {
            id,
            display_name: self.name.clone(),
            role,
        })
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    /// 生产环境由商城签发，这里用于本地调试与测试
    pub fn generate_access_token(&self, actor: &Actor) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: actor.id.to_string(),
            name: actor.display_name.clone(),
            role: actor.role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: "access".to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Actor> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        claims.actor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Actor {
        Actor {
            id: 42,
            display_name: "Camille".to_string(),
            role: ActorRole::ShopManager,
        }
    }

    #[test]
    fn test_token_roundtrip_yields_actor() {
        let jwt = JwtService::new("secret", 3600);
        let token = jwt.generate_access_token(&manager()).unwrap();
        let actor = jwt.verify_access_token(&token).unwrap();
        assert_eq!(actor, manager());
        assert!(actor.is_operator());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtService::new("secret", 3600)
            .generate_access_token(&manager())
            .unwrap();
        assert!(JwtService::new("other", 3600).verify_access_token(&token).is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let claims = Claims {
            sub: "1".into(),
            name: "x".into(),
            role: "editor".into(),
            exp: 0,
            iat: 0,
            token_type: "access".into(),
        };
        assert!(matches!(claims.actor(), Err(AppError::AuthError(_))));
    }
}
