use crate::notifier::OnAllFailed;
use crate::tiers::TierCatalog;
use serde::Deserialize;

/// External scheduling links keyed by consultation type.
///
/// The mapping is a closed lookup table: three known consultation types plus
/// a fallback used for anything unmatched.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingLinks {
    pub planning_preparation: String,
    pub document_review: String,
    pub full_support: String,
    pub fallback: String,
}

impl SchedulingLinks {
    /// Deterministic redirect target for a consultation type.
    pub fn for_consultation(&self, consultation_type: &str) -> &str {
        match consultation_type {
            "planning_preparation" => &self.planning_preparation,
            "document_review" => &self.document_review,
            "full_support" => &self.full_support,
            _ => &self.fallback,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Base URL of the payment gateway of record.
    pub gateway_base_url: String,
    pub gateway_public_key: String,
    pub gateway_secret_key: String,
    /// Prefix for merchant-side transaction references.
    pub reference_prefix: String,
    pub payment_currency: String,
    pub checkout_title: String,
    pub email_api_base_url: String,
    pub email_api_key: String,
    pub email_api_secret: String,
    pub email_sender: String,
    pub email_fallback_url: String,
    /// Per-transport attempt timeout, seconds.
    pub email_timeout_secs: u64,
    /// What to do when every email transport has failed.
    pub email_on_all_failed: OnAllFailed,
    pub scheduling: SchedulingLinks,
    /// The consultation tier table; values are configuration, not code.
    pub tiers: TierCatalog,
    pub checklist_download_url: String,
    pub site_base_url: String,
    /// Shared secret for webhook signature validation (optional).
    pub webhook_secret: Option<String>,
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))
        .and_then(|v| {
            if v.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(v)
        })
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn validate_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} must be a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            gateway_base_url: env_or("GATEWAY_BASE_URL", "https://api.flutterwave.com/v3"),
            gateway_public_key: require_env("GATEWAY_PUBLIC_KEY")?,
            gateway_secret_key: require_env("GATEWAY_SECRET_KEY")?,
            reference_prefix: env_or("REFERENCE_PREFIX", "DIASPORA"),
            payment_currency: env_or("PAYMENT_CURRENCY", "USD"),
            checkout_title: env_or("CHECKOUT_TITLE", "DiasporaLink"),
            email_api_base_url: env_or("EMAIL_API_BASE_URL", "https://api.trykit.com"),
            email_api_key: require_env("EMAIL_API_KEY")?,
            email_api_secret: require_env("EMAIL_API_SECRET")?,
            email_sender: env_or("EMAIL_SENDER", "diasporalink@noreplyemail.com"),
            email_fallback_url: env_or(
                "EMAIL_FALLBACK_URL",
                "https://api.emailjs.com/api/v1.0/email/send",
            ),
            email_timeout_secs: std::env::var("EMAIL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("EMAIL_TIMEOUT_SECS must be a number of seconds"))?,
            email_on_all_failed: match env_or("EMAIL_ON_ALL_FAILED", "simulate").as_str() {
                "simulate" => OnAllFailed::Simulate,
                "strict" => OnAllFailed::Throw,
                other => anyhow::bail!(
                    "EMAIL_ON_ALL_FAILED must be 'simulate' or 'strict', got '{}'",
                    other
                ),
            },
            scheduling: SchedulingLinks {
                planning_preparation: env_or(
                    "SCHEDULING_URL_PLANNING",
                    "https://calendly.com/diasporalink/30min",
                ),
                document_review: env_or(
                    "SCHEDULING_URL_DOCUMENT",
                    "https://calendly.com/diasporalink/document-review-consultation",
                ),
                full_support: env_or(
                    "SCHEDULING_URL_FULL",
                    "https://calendly.com/diasporalink/study-abroad-full-support",
                ),
                fallback: env_or(
                    "SCHEDULING_URL_DEFAULT",
                    "https://calendly.com/diasporalink/30min",
                ),
            },
            tiers: TierCatalog::from_env()?,
            checklist_download_url: env_or(
                "CHECKLIST_DOWNLOAD_URL",
                "https://drive.google.com/file/d/1ym2YVYKA1_XGjJRsI60cOZPx3QUQYfoe/view?usp=drive_link",
            ),
            site_base_url: env_or("SITE_BASE_URL", "https://www.diasporalink.net"),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        validate_http_url("GATEWAY_BASE_URL", &config.gateway_base_url)?;
        validate_http_url("EMAIL_API_BASE_URL", &config.email_api_base_url)?;
        validate_http_url("EMAIL_FALLBACK_URL", &config.email_fallback_url)?;
        validate_http_url("SITE_BASE_URL", &config.site_base_url)?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Gateway base URL: {}", config.gateway_base_url);
        tracing::debug!("Email API base URL: {}", config.email_api_base_url);
        tracing::debug!("Reference prefix: {}", config.reference_prefix);
        tracing::debug!("Server port: {}", config.port);
        if config.webhook_secret.is_none() {
            tracing::warn!("WEBHOOK_SECRET not set; webhook signatures will not be validated");
        }

        Ok(config)
    }
}
