use std::env;

use url::Url;

use crate::services::error::AuthError;
use crate::webauthn::RelyingParty;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub environment: Environment,
    pub app_name: String,
    /// Deployment name, shown to the user as part of the relying-party name.
    pub env_name: String,
    /// Public base URL of the frontend; also the expected ceremony origin.
    pub public_url: String,
    pub jwt_secret: String,
    pub cookie_secret: String,
    pub token_expiry_seconds: i64,
    pub code_expiry_seconds: i64,
    pub mfa_required: bool,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str.parse().map_err(AuthError::Config)?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            environment,
            app_name: get_env("APP_NAME", Some("auth-core"), is_prod)?,
            env_name: get_env("ENV_NAME", Some("dev"), is_prod)?,
            public_url: get_env("ENV_URL", Some("http://localhost:3000"), is_prod)?,
            jwt_secret: get_env("JWT_SECRET", Some("dev-jwt-secret"), is_prod)?,
            cookie_secret: get_env("COOKIE_SECRET", Some("dev-cookie-secret"), is_prod)?,
            token_expiry_seconds: get_env("AUTH_TOKEN_EXPIRATION", Some("3600"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| AuthError::Config(e.to_string()))?,
            code_expiry_seconds: get_env("EMAIL_VERIFICATION_EXPIRATION", Some("600"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| AuthError::Config(e.to_string()))?,
            mfa_required: get_env("MFA_REQUIRED", Some("true"), is_prod)?
                .parse()
                .map_err(|e: std::str::ParseBoolError| AuthError::Config(e.to_string()))?,
            smtp: SmtpConfig {
                host: get_env("EMAIL_HOST", Some("localhost"), is_prod)?,
                port: get_env("EMAIL_PORT", Some("587"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| AuthError::Config(e.to_string()))?,
                username: get_env("EMAIL_USER", Some(""), is_prod)?,
                password: get_env("EMAIL_PASSWORD", Some(""), is_prod)?,
                from_address: get_env("EMAIL_REPLY_TO", Some("no-reply@localhost"), is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.token_expiry_seconds <= 0 {
            return Err(AuthError::Config(
                "AUTH_TOKEN_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.code_expiry_seconds <= 0 {
            return Err(AuthError::Config(
                "EMAIL_VERIFICATION_EXPIRATION must be positive".to_string(),
            ));
        }

        if Url::parse(&self.public_url).is_err() {
            return Err(AuthError::Config(format!(
                "ENV_URL is not a valid URL: {}",
                self.public_url
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt_secret.len() < 16 {
                return Err(AuthError::Config(
                    "JWT_SECRET must be at least 16 characters in production".to_string(),
                ));
            }

            if self.cookie_secret.len() < 16 {
                return Err(AuthError::Config(
                    "COOKIE_SECRET must be at least 16 characters in production".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Relying-party display name shown by authenticators.
    pub fn rp_name(&self) -> String {
        format!("{} - {}", self.app_name, self.env_name)
    }

    /// Relying-party id: the hostname of the public URL.
    pub fn rp_id(&self) -> Result<String, AuthError> {
        let url = Url::parse(&self.public_url)
            .map_err(|e| AuthError::Config(format!("ENV_URL is not a valid URL: {}", e)))?;

        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| AuthError::Config("ENV_URL has no host".to_string()))
    }

    /// The relying-party identity ceremonies are bound to.
    pub fn relying_party(&self) -> Result<RelyingParty, AuthError> {
        Ok(RelyingParty {
            name: self.rp_name(),
            id: self.rp_id()?,
            origin: self.public_url.clone(),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AuthError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AuthError::Config(format!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AuthError::Config(format!("{} is required but not set", key)))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
