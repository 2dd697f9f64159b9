//! Google OpenID Connect glue.
//!
//! Builds the consent redirect and turns an authorization code into a
//! verified [`IdentityAssertion`]. The ID token is checked locally against
//! Google's published JWKS; nothing downstream trusts unverified claims.

use anyhow::Context as _;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use crate::domain::repository::IdentityProvider;
use crate::domain::types::IdentityAssertion;
use crate::error::AuthServiceError;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const JWKS_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/certs";
const TRUSTED_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

pub const PROVIDER_NAME: &str = "google";

#[derive(Clone)]
pub struct GoogleIdentityProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<IdentityAssertion, AuthServiceError> {
        let header = decode_header(id_token).map_err(|_| AuthServiceError::Unauthorized)?;
        let kid = header.kid.ok_or(AuthServiceError::Unauthorized)?;

        // TODO: cache the JWKS document for its Cache-Control lifetime
        // instead of refetching per callback.
        let jwks: Jwks = self
            .http
            .get(JWKS_ENDPOINT)
            .send()
            .await
            .context("fetch google jwks")?
            .error_for_status()
            .context("google jwks status")?
            .json()
            .await
            .context("decode google jwks")?;

        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.kid == kid)
            .ok_or(AuthServiceError::Unauthorized)?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|_| AuthServiceError::Unauthorized)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&TRUSTED_ISSUERS);

        let claims = decode::<IdTokenClaims>(id_token, &key, &validation)
            .map_err(|_| AuthServiceError::Unauthorized)?
            .claims;

        Ok(IdentityAssertion {
            provider: PROVIDER_NAME.to_owned(),
            subject: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            name: claims.name,
            picture: claims.picture,
        })
    }
}

impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state)
            .append_pair("access_type", "online")
            .append_pair("prompt", "select_account")
            .finish();
        format!("{AUTH_ENDPOINT}?{query}")
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AuthServiceError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("google token exchange")?;

        // A rejected code is the caller's problem; transport failures above
        // are ours.
        if !response.status().is_success() {
            return Err(AuthServiceError::Unauthorized);
        }
        let token: TokenResponse = response
            .json()
            .await
            .context("decode google token response")?;

        self.verify_id_token(&token.id_token).await
    }
}
