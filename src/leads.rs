//! Lead capture and the checklist opt-in funnel.

use crate::analytics::Analytics;
use crate::config::Config;
use crate::errors::AppError;
use crate::funnel::is_valid_email;
use crate::models::{ContactRequest, ConvertLeadResponse, Customer, DownloadRecord, Lead};
use crate::notifier::EmailNotifier;
use crate::store::LeadStore;
use crate::templates::TemplateId;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct DownloadStats {
    pub total_downloads: usize,
    pub source_counts: HashMap<String, usize>,
    pub last_week_downloads: usize,
}

pub struct LeadService {
    store: Arc<dyn LeadStore>,
    notifier: Arc<EmailNotifier>,
    analytics: Arc<Analytics>,
    checklist_download_url: String,
    site_base_url: String,
}

impl LeadService {
    pub fn new(
        config: &Config,
        store: Arc<dyn LeadStore>,
        notifier: Arc<EmailNotifier>,
        analytics: Arc<Analytics>,
    ) -> Self {
        Self {
            store,
            notifier,
            analytics,
            checklist_download_url: config.checklist_download_url.clone(),
            site_base_url: config.site_base_url.clone(),
        }
    }

    /// Creates a lead. Name and email are required; everything else
    /// defaults to empty / "website".
    pub async fn create_lead(
        &self,
        full_name: &str,
        email: &str,
        country: Option<&str>,
        education_level: Option<&str>,
        source: Option<&str>,
    ) -> Result<Lead, AppError> {
        if full_name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "fullName".to_string(),
                message: "Name is required".to_string(),
            });
        }
        if !is_valid_email(email) {
            return Err(AppError::Validation {
                field: "email".to_string(),
                message: "Please enter a valid email address".to_string(),
            });
        }

        let lead = Lead {
            id: format!("lead_{}", Uuid::new_v4()),
            full_name: full_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            country: country.unwrap_or("").to_string(),
            education_level: education_level.unwrap_or("").to_string(),
            source: source.unwrap_or("website").to_string(),
            created_at: Utc::now(),
            is_converted: false,
            has_downloaded_checklist: false,
            last_activity: None,
        };
        self.store.create(lead.clone()).await?;

        tracing::info!("Lead created: {} ({})", lead.id, lead.source);
        Ok(lead)
    }

    pub async fn get_lead(&self, lead_id: &str) -> Result<Lead, AppError> {
        self.store
            .get(lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead_id)))
    }

    pub async fn leads_by_source(&self, source: &str) -> Result<Vec<Lead>, AppError> {
        Ok(self.store.find_by_source(source).await?)
    }

    /// Flips `is_converted` exactly once. Converting an already-converted
    /// lead reports `newly_converted: false` and changes nothing.
    pub async fn convert_lead(&self, lead_id: &str) -> Result<ConvertLeadResponse, AppError> {
        let mut lead = self.get_lead(lead_id).await?;
        if lead.is_converted {
            tracing::debug!("Lead {} was already converted", lead_id);
            return Ok(ConvertLeadResponse {
                lead_id: lead.id,
                converted: true,
                newly_converted: false,
            });
        }

        lead.is_converted = true;
        lead.last_activity = Some(Utc::now());
        self.store.update(lead.clone()).await?;

        self.analytics.track_conversion("lead_converted", None);
        tracing::info!("Lead converted to client: {}", lead_id);
        Ok(ConvertLeadResponse {
            lead_id: lead.id,
            converted: true,
            newly_converted: true,
        })
    }

    /// Checklist opt-in: create the lead, record the download, and schedule
    /// the checklist email. The email is fire-and-forget; the signup
    /// succeeds even if every transport fails.
    pub async fn checklist_signup(
        &self,
        full_name: &str,
        email: &str,
        country: Option<&str>,
        education_level: Option<&str>,
        source: Option<&str>,
    ) -> Result<Lead, AppError> {
        let mut lead = self
            .create_lead(full_name, email, country, education_level, source)
            .await?;

        self.store
            .record_download(DownloadRecord {
                id: format!("download_{}", Uuid::new_v4()),
                lead_id: Some(lead.id.clone()),
                downloaded_at: Utc::now(),
                source: lead.source.clone(),
            })
            .await?;

        lead.has_downloaded_checklist = true;
        lead.last_activity = Some(Utc::now());
        self.store.update(lead.clone()).await?;

        self.analytics
            .track_event("checklist", "download", &lead.source, None);

        let notifier = self.notifier.clone();
        let recipient = Customer {
            email: lead.email.clone(),
            name: lead.full_name.clone(),
        };
        let mut data = Map::new();
        data.insert(
            "download_link".to_string(),
            json!(self.checklist_download_url),
        );
        data.insert(
            "booking_link".to_string(),
            json!(format!("{}/consultation", self.site_base_url)),
        );
        let lead_id = lead.id.clone();
        tokio::spawn(async move {
            match notifier
                .send(TemplateId::Checklist.as_str(), &recipient, &data)
                .await
            {
                Ok(result) if result.success => {
                    tracing::info!("Checklist email sent for {}", lead_id);
                }
                Ok(_) => tracing::warn!("Checklist email for {} not delivered", lead_id),
                Err(e) => tracing::error!("Failed to send checklist email for {}: {}", lead_id, e),
            }
        });

        Ok(lead)
    }

    /// Contact-form intake: capture the inquiry as a lead and acknowledge
    /// it by email (fire-and-forget).
    pub async fn handle_inquiry(&self, request: &ContactRequest) -> Result<Lead, AppError> {
        if request.subject.trim().is_empty() {
            return Err(AppError::Validation {
                field: "subject".to_string(),
                message: "Please select a subject".to_string(),
            });
        }
        if request.message.trim().is_empty() {
            return Err(AppError::Validation {
                field: "message".to_string(),
                message: "Message is required".to_string(),
            });
        }

        let lead = self
            .create_lead(&request.name, &request.email, None, None, Some("contact_form"))
            .await?;

        self.analytics
            .track_event("contact", "form_submit", &request.subject, None);

        let notifier = self.notifier.clone();
        let recipient = Customer {
            email: lead.email.clone(),
            name: lead.full_name.clone(),
        };
        let mut data = Map::new();
        data.insert("message".to_string(), json!(request.message));
        data.insert(
            "checklist_link".to_string(),
            json!(format!("{}/checklist", self.site_base_url)),
        );
        let lead_id = lead.id.clone();
        tokio::spawn(async move {
            match notifier
                .send(TemplateId::InquiryReceived.as_str(), &recipient, &data)
                .await
            {
                Ok(result) if result.success => {
                    tracing::info!("Inquiry acknowledgement sent for {}", lead_id);
                }
                Ok(_) => tracing::warn!("Inquiry acknowledgement for {} not delivered", lead_id),
                Err(e) => {
                    tracing::error!("Failed to acknowledge inquiry for {}: {}", lead_id, e)
                }
            }
        });

        Ok(lead)
    }

    pub async fn download_stats(&self) -> Result<DownloadStats, AppError> {
        let downloads = self.store.downloads().await?;
        let one_week_ago = Utc::now() - Duration::days(7);

        let mut source_counts: HashMap<String, usize> = HashMap::new();
        for download in &downloads {
            *source_counts.entry(download.source.clone()).or_insert(0) += 1;
        }

        Ok(DownloadStats {
            total_downloads: downloads.len(),
            last_week_downloads: downloads
                .iter()
                .filter(|d| d.downloaded_at >= one_week_ago)
                .count(),
            source_counts,
        })
    }
}
