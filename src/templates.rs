//! Transactional email templates.
//!
//! The template set is closed: four kinds, each with a fixed subject and
//! body. Placeholder data arrives as a JSON map; missing placeholders render
//! as empty strings rather than failing a send that is already fire-and-forget.

use crate::errors::AppError;
use crate::models::Customer;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    Checklist,
    BookingConfirmation,
    PaymentReceipt,
    InquiryReceived,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Checklist => "checklist",
            TemplateId::BookingConfirmation => "booking_confirmation",
            TemplateId::PaymentReceipt => "payment_receipt",
            TemplateId::InquiryReceived => "inquiry_received",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "checklist" => Ok(TemplateId::Checklist),
            "booking_confirmation" => Ok(TemplateId::BookingConfirmation),
            "payment_receipt" => Ok(TemplateId::PaymentReceipt),
            "inquiry_received" => Ok(TemplateId::InquiryReceived),
            other => Err(AppError::UnknownTemplate(other.to_string())),
        }
    }
}

fn field<'a>(data: &'a Map<String, Value>, key: &str) -> &'a str {
    data.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn greeting_name(recipient: &Customer) -> &str {
    if recipient.name.is_empty() {
        "there"
    } else {
        &recipient.name
    }
}

/// Resolves the fixed subject/body pair for a template.
pub fn render(
    template: TemplateId,
    recipient: &Customer,
    data: &Map<String, Value>,
) -> (String, String) {
    let name = greeting_name(recipient);
    match template {
        TemplateId::Checklist => {
            let subject = "Your Study Abroad Visa Checklist from DiasporaLink".to_string();
            let body = format!(
                "<h1>Hello {name}!</h1>\
                 <p>Thank you for signing up!</p>\
                 <p>As promised, here is your FREE Study Abroad Visa Checklist — your step-by-step guide to applying successfully without an agent.</p>\
                 <p><a href=\"{download}\">Download your checklist here</a></p>\
                 <p>Want personalized help? Book a 1-on-1 consultation call to discuss your situation and next steps:</p>\
                 <p><a href=\"{booking}\">Book Now</a></p>\
                 <p>You're one step closer to studying abroad. We're excited to support your journey!</p>\
                 <p>Warm regards,<br>The DiasporaLink Team</p>",
                name = name,
                download = field(data, "download_link"),
                booking = field(data, "booking_link"),
            );
            (subject, body)
        }
        TemplateId::BookingConfirmation => {
            let subject = "Your Consultation with DiasporaLink is Confirmed".to_string();
            let body = format!(
                "<h1>Hello {name}!</h1>\
                 <p>Your consultation with DiasporaLink has been confirmed!</p>\
                 <p><strong>Date:</strong> {date}</p>\
                 <p><strong>Time:</strong> {time}</p>\
                 <p><strong>Type:</strong> {kind}</p>\
                 <p>We look forward to speaking with you. Please come prepared with any questions you may have about your study abroad journey.</p>\
                 <p>If you need to reschedule, please contact us at least 24 hours in advance.</p>\
                 <p>Best regards,<br>The DiasporaLink Team</p>",
                name = name,
                date = field(data, "date"),
                time = field(data, "time"),
                kind = field(data, "consultation_type"),
            );
            (subject, body)
        }
        TemplateId::PaymentReceipt => {
            let subject = "Payment Confirmation - DiasporaLink Consultation".to_string();
            let body = format!(
                "<h2>DiasporaLink</h2>\
                 <h3>Payment Receipt</h3>\
                 <p>Hello {name},</p>\
                 <p>Thank you for your payment for a consultation with DiasporaLink. Your transaction was successful!</p>\
                 <table>\
                 <tr><td>Transaction ID:</td><td>{reference}</td></tr>\
                 <tr><td>Date:</td><td>{date}</td></tr>\
                 <tr><td>Service:</td><td>Consultation Service</td></tr>\
                 <tr><td>Amount:</td><td><strong>{currency} {amount}</strong></td></tr>\
                 <tr><td>Payment Status:</td><td>Successful</td></tr>\
                 </table>\
                 <p>Next Step: <a href=\"{scheduling}\">Book Your Consultation Slot</a></p>\
                 <p>Warm regards,<br>The DiasporaLink Team</p>",
                name = name,
                reference = field(data, "reference"),
                date = field(data, "date"),
                currency = field(data, "currency"),
                amount = field(data, "amount"),
                scheduling = field(data, "scheduling_link"),
            );
            (subject, body)
        }
        TemplateId::InquiryReceived => {
            let subject = "We've Received Your Inquiry - DiasporaLink".to_string();
            let body = format!(
                "<h1>Hello {name}!</h1>\
                 <p>Thank you for reaching out to DiasporaLink. We've received your inquiry and will get back to you as soon as possible.</p>\
                 <p>For reference, here's a copy of your message:</p>\
                 <p><em>{message}</em></p>\
                 <p>In the meantime, you might find our Study Abroad Checklist helpful:</p>\
                 <p><a href=\"{checklist}\">Get Your Free Checklist</a></p>\
                 <p>Best regards,<br>The DiasporaLink Team</p>",
                name = name,
                message = field(data, "message"),
                checklist = field(data, "checklist_link"),
            );
            (subject, body)
        }
    }
}
