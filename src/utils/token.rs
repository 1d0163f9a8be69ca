use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn decode_token<T: Into<String>>(
    token: T,
    secret: &[u8],
) -> Result<String, crate::error::HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(crate::error::HttpError::unauthorized(
            crate::error::ErrorMessage::InvalidToken.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn issue(sub: &str, secret: &[u8]) -> String {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: sub.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::seconds(60)).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let secret = b"test-secret";
        let user_id = uuid::Uuid::new_v4().to_string();

        let token = issue(&user_id, secret);
        let decoded = decode_token(token, secret).unwrap();

        assert_eq!(decoded, user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue("someone", b"right-secret");
        assert!(decode_token(token, b"wrong-secret").is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode_token("not-a-jwt", b"secret").is_err());
    }
}
