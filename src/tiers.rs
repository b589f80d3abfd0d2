//! The consultation tier catalog.
//!
//! Three fixed offerings. Prices, durations and benefit lists are data:
//! they load from configuration (`TIERS_JSON`) with the defaults below, so
//! changing them is a configuration change, not a code change. The id set
//! itself is closed.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};

/// Identifier of a consultation tier. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierId {
    PlanningPreparation,
    DocumentReview,
    FullSupport,
}

impl TierId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierId::PlanningPreparation => "planning_preparation",
            TierId::DocumentReview => "document_review",
            TierId::FullSupport => "full_support",
        }
    }

    /// Parses a tier id; anything outside the three-entry table is a
    /// user-correctable validation error, never a crash.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "planning_preparation" => Ok(TierId::PlanningPreparation),
            "document_review" => Ok(TierId::DocumentReview),
            "full_support" => Ok(TierId::FullSupport),
            _ => Err(AppError::Validation {
                field: "consultationType".to_string(),
                message: format!("Unknown consultation type: {}", raw),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationTier {
    pub id: TierId,
    pub title: String,
    pub price: f64,
    pub original_price: f64,
    pub duration: String,
    pub description: String,
    pub benefits: Vec<String>,
}

/// The three-tier table, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCatalog {
    tiers: Vec<ConsultationTier>,
}

impl Default for TierCatalog {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            tiers: vec![
                ConsultationTier {
                    id: TierId::PlanningPreparation,
                    title: "Planning and Preparation".to_string(),
                    price: 25.0,
                    original_price: 100.0,
                    duration: "45 minutes".to_string(),
                    description: "Complete planning package including university selection and visa review to get you started on your journey.".to_string(),
                    benefits: strings(&[
                        "Personalized study abroad roadmap",
                        "University selection guidance",
                        "Visa application strategy",
                        "Budget planning assistance",
                        "Timeline development",
                    ]),
                },
                ConsultationTier {
                    id: TierId::DocumentReview,
                    title: "Document Review".to_string(),
                    price: 50.0,
                    original_price: 333.0,
                    duration: "60 minutes".to_string(),
                    description: "Review of all application documents including school and visa applications to ensure the best chance of success.".to_string(),
                    benefits: strings(&[
                        "Comprehensive document assessment",
                        "Application form review",
                        "Personal statement feedback",
                        "Supporting documents evaluation",
                        "Recommendation for improvements",
                    ]),
                },
                ConsultationTier {
                    id: TierId::FullSupport,
                    title: "Full Support".to_string(),
                    price: 100.0,
                    original_price: 667.0,
                    duration: "90 minutes".to_string(),
                    description: "End-to-end support for your international education journey. We help you search for schools, get admissions, plus visa support.".to_string(),
                    benefits: strings(&[
                        "School search and selection",
                        "Complete application assistance",
                        "Visa application support",
                        "Interview preparation",
                        "Admission follow-up",
                        "Pre-departure guidance",
                    ]),
                },
            ],
        }
    }
}

impl TierCatalog {
    /// Loads the catalog from the `TIERS_JSON` environment variable, falling
    /// back to the built-in defaults. An override must still cover exactly
    /// the three known tier ids.
    pub fn from_env() -> anyhow::Result<Self> {
        let Ok(raw) = std::env::var("TIERS_JSON") else {
            return Ok(Self::default());
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let tiers: Vec<ConsultationTier> = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("TIERS_JSON is not a valid tier list: {}", e))?;
        let catalog = Self { tiers };
        for id in [
            TierId::PlanningPreparation,
            TierId::DocumentReview,
            TierId::FullSupport,
        ] {
            if !catalog.tiers.iter().any(|t| t.id == id) {
                anyhow::bail!("TIERS_JSON is missing tier '{}'", id.as_str());
            }
        }
        if catalog.tiers.iter().any(|t| t.price <= 0.0) {
            anyhow::bail!("TIERS_JSON contains a non-positive price");
        }
        tracing::info!("Tier catalog loaded from TIERS_JSON override");
        Ok(catalog)
    }

    pub fn get(&self, id: TierId) -> &ConsultationTier {
        // from_env guarantees every id is present; default always is.
        self.tiers
            .iter()
            .find(|t| t.id == id)
            .unwrap_or(&self.tiers[0])
    }

    pub fn all(&self) -> &[ConsultationTier] {
        &self.tiers
    }
}
