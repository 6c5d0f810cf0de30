//! Builders for signed test ID tokens.

use crate::crypto_fixtures::{PRIMARY_KID, PRIMARY_PRIVATE_KEY_PEM};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

/// Project id used as the expected audience in tests.
pub const TEST_PROJECT_ID: &str = "courtside-test";

/// Issuer prefix; the full issuer is `{prefix}/{project}`.
pub const TEST_ISSUER_PREFIX: &str = "https://securetoken.google.com";

/// Builder for RS256 ID tokens shaped like the provider's.
///
/// # Example
/// ```rust,ignore
/// let token = IdTokenBuilder::new(now)
///     .subject("uid-42")
///     .email("coach@example.com")
///     .expires_in(600)
///     .build();
/// ```
pub struct IdTokenBuilder {
    sub: String,
    email: String,
    aud: String,
    iss: String,
    iat: i64,
    exp: i64,
    kid: String,
    private_key_pem: String,
}

impl IdTokenBuilder {
    /// A valid token issued at `iat`, expiring an hour later.
    pub fn new(iat: i64) -> Self {
        Self {
            sub: "test-user".to_string(),
            email: "player@example.com".to_string(),
            aud: TEST_PROJECT_ID.to_string(),
            iss: format!("{TEST_ISSUER_PREFIX}/{TEST_PROJECT_ID}"),
            iat,
            exp: iat + 3600,
            kid: PRIMARY_KID.to_string(),
            private_key_pem: PRIMARY_PRIVATE_KEY_PEM.to_string(),
        }
    }

    pub fn subject(mut self, sub: &str) -> Self {
        self.sub = sub.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    pub fn audience(mut self, aud: &str) -> Self {
        self.aud = aud.to_string();
        self
    }

    pub fn issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    /// Expire `seconds` after `iat`.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    pub fn expires_at(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    /// Sign with a different key and advertise `kid` in the header.
    pub fn signing_key(mut self, kid: &str, private_key_pem: &str) -> Self {
        self.kid = kid.to_string();
        self.private_key_pem = private_key_pem.to_string();
        self
    }

    /// The `exp` this token will carry.
    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn build(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid);

        let claims = json!({
            "iss": self.iss,
            "aud": self.aud,
            "auth_time": self.iat,
            "user_id": self.sub,
            "sub": self.sub,
            "iat": self.iat,
            "exp": self.exp,
            "email": self.email,
            "email_verified": false,
            "firebase": {"identities": {}, "sign_in_provider": "password"},
        });

        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .expect("fixture private key should parse");
        encode(&header, &claims, &key).expect("token should encode")
    }
}

/// Flip one bit of the signature, keeping the token well formed.
pub fn tamper_signature(token: &str) -> String {
    let (signed, signature) = token.rsplit_once('.').expect("token has a signature");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature is base64url");
    if let Some(first) = bytes.first_mut() {
        *first ^= 0x01;
    }
    format!("{signed}.{}", URL_SAFE_NO_PAD.encode(bytes))
}
