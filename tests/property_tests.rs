//! Property-based tests using proptest
//! Tests invariants that should hold for all inputs

use proptest::prelude::*;
use rust_funnel_api::config::SchedulingLinks;
use rust_funnel_api::funnel::is_valid_email;
use rust_funnel_api::templates::TemplateId;
use rust_funnel_api::tiers::TierId;

fn links() -> SchedulingLinks {
    SchedulingLinks {
        planning_preparation: "https://scheduling.example.com/planning".to_string(),
        document_review: "https://scheduling.example.com/document".to_string(),
        full_support: "https://scheduling.example.com/full".to_string(),
        fallback: "https://scheduling.example.com/default".to_string(),
    }
}

// Property: Email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn well_formed_emails_are_accepted(
        local in "[a-z0-9]{1,10}",
        domain in "[a-z0-9]{1,10}",
        tld in "[a-z]{2,4}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email));
    }

    #[test]
    fn emails_without_an_at_sign_are_rejected(raw in "[a-z0-9.]{1,20}") {
        prop_assert!(!is_valid_email(&raw));
    }
}

// Property: tier parsing is total and the id set is closed
proptest! {
    #[test]
    fn tier_parse_never_panics(raw in "\\PC*") {
        let _ = TierId::parse(&raw);
    }

    #[test]
    fn tier_parse_accepts_only_the_three_known_ids(raw in "[a-z_]{1,30}") {
        let known = matches!(
            raw.as_str(),
            "planning_preparation" | "document_review" | "full_support"
        );
        prop_assert_eq!(TierId::parse(&raw).is_ok(), known);
    }
}

// Property: template parsing is total and the template set is closed
proptest! {
    #[test]
    fn template_parse_never_panics(raw in "\\PC*") {
        let _ = TemplateId::parse(&raw);
    }

    #[test]
    fn template_parse_accepts_only_the_closed_set(raw in "[a-z_]{1,30}") {
        let known = matches!(
            raw.as_str(),
            "checklist" | "booking_confirmation" | "payment_receipt" | "inquiry_received"
        );
        prop_assert_eq!(TemplateId::parse(&raw).is_ok(), known);
    }
}

// Property: the scheduling redirect is a pure, total lookup
proptest! {
    #[test]
    fn scheduling_lookup_always_yields_a_configured_url(raw in "\\PC*") {
        let links = links();
        let url = links.for_consultation(&raw).to_string();
        let all = [
            links.planning_preparation.clone(),
            links.document_review.clone(),
            links.full_support.clone(),
            links.fallback.clone(),
        ];
        prop_assert!(all.contains(&url));
    }

    #[test]
    fn unknown_consultation_types_fall_back(raw in "[A-Z]{1,10}") {
        let links = links();
        prop_assert_eq!(links.for_consultation(&raw), links.fallback.as_str());
    }
}
