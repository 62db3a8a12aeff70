//! HS256-signed bearer tokens in compact JWS form.

use crate::config::TokenConfig;
use crate::models::{Account, Role};
use crate::{HospitalError, HospitalResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const INVALID_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Token payload. `sub` is the canonical account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct TokenService {
    cfg: TokenConfig,
}

impl TokenService {
    pub fn new(cfg: TokenConfig) -> Self {
        Self { cfg }
    }

    pub fn issue(&self, account: &Account) -> HospitalResult<IssuedToken> {
        self.issue_at(account, Utc::now())
    }

    fn issue_at(&self, account: &Account, now: DateTime<Utc>) -> HospitalResult<IssuedToken> {
        let expires_at = now + self.cfg.ttl();
        let claims = Claims {
            sub: account.id.to_string(),
            role: account.role(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let header = Header {
            alg: "HS256".into(),
            typ: "JWT".into(),
        };

        let header_json = serde_json::to_vec(&header).map_err(HospitalError::Serialization)?;
        let claims_json = serde_json::to_vec(&claims).map_err(HospitalError::Serialization)?;
        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign(message.as_bytes())?);

        Ok(IssuedToken {
            token: format!("{message}.{signature}"),
            expires_at,
        })
    }

    /// Checks signature and expiry and returns the claims.
    ///
    /// Every failure maps to the same `Unauthorized` error; the reason is only logged.
    pub fn verify(&self, token: &str) -> HospitalResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> HospitalResult<Claims> {
        let reject = |reason: &str| {
            tracing::debug!(reason, "token rejected");
            HospitalError::Unauthorized(INVALID_TOKEN.into())
        };

        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(reject("malformed"));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| reject("signature encoding"))?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| reject("bad signature"))?;

        let header: Header = URL_SAFE_NO_PAD
            .decode(header_b64)
            .ok()
            .and_then(|b| serde_json::from_slice(&b).ok())
            .ok_or_else(|| reject("header"))?;
        if header.alg != "HS256" {
            return Err(reject("algorithm"));
        }

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .ok()
            .and_then(|b| serde_json::from_slice(&b).ok())
            .ok_or_else(|| reject("claims"))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| reject("exp"))?;
        if expires_at <= now {
            return Err(reject("expired"));
        }

        Ok(claims)
    }

    fn sign(&self, message: &[u8]) -> HospitalResult<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> HospitalResult<HmacSha256> {
        HmacSha256::new_from_slice(self.cfg.secret())
            .map_err(|e| HospitalError::InvalidInput(format!("token secret rejected: {e}")))
    }
}
