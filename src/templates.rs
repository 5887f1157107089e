//! Reply and prompt templates for the sales agent.
//!
//! Everything here is a pure function of its arguments.

use crate::actions::FollowUpTarget;
use crate::conversation::LeadField;
use crate::directory::{CallerRecord, HIGH_VOLUME_THRESHOLD};

/// Volume from which a pharmacy gets the mid-size pitch.
pub const MEDIUM_VOLUME_THRESHOLD: u32 = 500;

pub const SYSTEM_PROMPT: &str = "\
You are a professional pharmacy sales representative for Pharmesol, a company that provides \
advanced pharmacy management solutions. You handle inbound calls from pharmacies who reach out via phone.

Your role is to:
1. Greet callers professionally and identify if they are existing customers or new leads
2. For existing customers: reference their pharmacy data and discuss how Pharmesol can help optimize their operations
3. For new leads: collect basic information conversationally and explain how Pharmesol can support their pharmacy
4. Highlight how Pharmesol can support high Rx volume pharmacies specifically
5. Offer follow-up actions like email or callback scheduling
6. Be helpful, professional, and focused on understanding their needs

Key information about Pharmesol:
- We specialize in pharmacy management software and automation
- We help pharmacies optimize operations, reduce costs, and improve patient care
- We offer solutions for inventory management, prescription processing, and analytics
- We have special programs for high-volume pharmacies (1000+ prescriptions)
- We provide 24/7 support and custom integrations

Always be conversational, professional, and focus on understanding their specific needs.";

pub const API_ERROR_MESSAGE: &str = "\
I apologize, but I'm having trouble accessing our system right now. Let me collect your \
information manually and we can follow up with you shortly.

Could you tell me about your pharmacy so I can help you get started?";

pub const GENERAL_CLOSING: &str = "\
Thank you for calling Pharmesol today. We appreciate your interest in our pharmacy management solutions.

If you have any questions or would like to follow up, please don't hesitate to call us back at 1-800-PHARMESOL.

Have a great day!";

pub const CALLBACK_OFFER: &str = "\
I'd love to schedule a more detailed consultation to discuss your specific needs. We can go \
through your current processes and show you exactly how Pharmesol can help optimize your operations.

What would be a good time for a follow-up call? I'm available most weekdays between 9 AM and 5 PM.";

// ── Fixed engine replies ────────────────────────────────────────────

pub const SOLUTIONS_NUDGE: &str = "I'd be happy to help you get started. We can send you detailed \
information or schedule a consultation call. What would work best for you?";

pub const FOLLOW_UP_REPEAT: &str =
    "I can send you detailed information via email or schedule a consultation call. Which would you prefer?";

pub const ASK_FOR_EMAIL: &str = "I'd be happy to send you information. What's your email address?";

pub const ANYTHING_ELSE: &str = "Is there anything else I can help you with today?";

pub const GENERAL_HELP: &str =
    "I'm here to help you with pharmacy management solutions. How can I assist you today?";

pub const RECOVERY_MESSAGE: &str = "I'm back online now. Let me help you with your pharmacy \
management needs. Could you tell me about your pharmacy?";

pub const GENERATION_APOLOGY: &str = "I apologize, but I'm having trouble generating a response \
right now. Could you please try again?";

// ── Volume tiers ────────────────────────────────────────────────────

/// Pitch tier derived from monthly prescription volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTier {
    High,
    Medium,
    Standard,
}

impl VolumeTier {
    pub fn from_volume(rx_volume: u32) -> Self {
        if rx_volume >= HIGH_VOLUME_THRESHOLD {
            Self::High
        } else if rx_volume >= MEDIUM_VOLUME_THRESHOLD {
            Self::Medium
        } else {
            Self::Standard
        }
    }
}

// ── Greetings ───────────────────────────────────────────────────────

/// Greeting for a caller the directory recognized, framed by volume tier.
pub fn existing_customer_greeting(record: &CallerRecord) -> String {
    let name = non_empty_or(&record.name, "your pharmacy");
    let location = non_empty_or(&record.location, "your area");

    let framing = match VolumeTier::from_volume(record.rx_volume) {
        VolumeTier::High => format!(
            "I notice you're currently processing {} prescriptions. That's quite a volume! \
             As a high-volume pharmacy you qualify for our dedicated high-volume program. \
             How are things going with your current pharmacy management system?",
            record.rx_volume
        ),
        VolumeTier::Medium => format!(
            "I notice you're currently processing {} prescriptions. That's a solid volume, \
             and a great fit for our streamlined processing tools. How are things going with \
             your current pharmacy management system?",
            record.rx_volume
        ),
        VolumeTier::Standard => format!(
            "I notice you're currently processing {} prescriptions. We have tools that help \
             pharmacies your size grow efficiently. How are things going with your current \
             pharmacy management system?",
            record.rx_volume
        ),
    };

    format!(
        "Hello! Thank you for calling Pharmesol. I can see you're calling from {name} in {location}. \
         How can I help you today?\n\n{framing}"
    )
}

pub fn new_lead_greeting(bot_name: &str) -> String {
    format!(
        "Hello! Thank you for calling Pharmesol. My name is {bot_name}, and I'm here to help you \
         find the right pharmacy management solutions.\n\n\
         I don't have your pharmacy in our system yet. Could you tell me a bit about your pharmacy \
         and what brings you to call us today?"
    )
}

// ── Information collection ──────────────────────────────────────────

/// Question asking the caller for one lead field.
pub fn collection_question(field: LeadField) -> &'static str {
    match field {
        LeadField::PharmacyName => "What's the name of your pharmacy?",
        LeadField::Location => "Where is your pharmacy located?",
        LeadField::RxVolume => "How many prescriptions do you typically process each month?",
        LeadField::ContactPerson => "Who should I speak with about pharmacy management solutions?",
        LeadField::Email => "What's the best email address to send you information?",
    }
}

/// Bulleted request for several missing fields at once.
pub fn missing_info_message(missing: &[LeadField]) -> String {
    let fields = missing
        .iter()
        .map(|field| format!("• {}", field.label()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "I want to make sure I have all the information I need to help you properly. \
         Could you please provide:\n\n{fields}\n\n\
         This will help me tailor our solutions to your specific needs."
    )
}

/// Extraction request for a single lead field. The model must answer with a
/// JSON object holding exactly that key.
pub fn extraction_prompt(field: LeadField, message: &str) -> String {
    let key = field.key();
    let (description, examples) = match field {
        LeadField::PharmacyName => (
            "business name, pharmacy name, or company name",
            "Naturally, Natural Products, Main Street Pharmacy",
        ),
        LeadField::Location => ("city, state, or address", "Orlando, New York, Los Angeles"),
        LeadField::RxVolume => ("number representing prescription volume", "1000, 500, 2000"),
        LeadField::ContactPerson => (
            "person's name or title",
            "John Smith, My manager, Sarah Johnson",
        ),
        LeadField::Email => ("email address", "john@pharmacy.com"),
    };

    format!(
        "You are a data extraction assistant. Extract {key} information from this message: \"{message}\"

IMPORTANT: You must respond with ONLY a valid JSON object. No other text.

Return a JSON object with only the {key} field (use null if not found):
{{\"{key}\": \"extracted_value\"}}

Field description: {description}
Examples: {examples}

Extraction rules:
- {key}: Extract {description}
- For rx_volume: Return the number as a number, not a string (e.g., 1000 not \"1000\")
- For location: Extract place names like \"Orlando\", \"New York\", \"Los Angeles\"
- For contact_person: Extract person names like \"John\", \"Sarah\", \"My manager\"
- For email: Extract valid email addresses
- If no {key} information can be extracted, return: {{\"{key}\": null}}"
    )
}

// ── Solutions and follow-up ─────────────────────────────────────────

pub fn solution_benefits(rx_volume: u32) -> &'static str {
    match VolumeTier::from_volume(rx_volume) {
        VolumeTier::High => "\
For high-volume pharmacies like yours, we offer:
• Advanced automation that can save 20+ hours per week
• Real-time inventory management with predictive ordering
• Custom workflow optimization
• Priority support and dedicated account management
• Volume-based pricing that scales with your business",
        VolumeTier::Medium => "\
For pharmacies of your size, we provide:
• Streamlined prescription processing
• Automated inventory tracking
• Comprehensive reporting and analytics
• Integration with major pharmacy systems
• 24/7 technical support",
        VolumeTier::Standard => "\
We can help you:
• Automate routine tasks
• Improve inventory management
• Enhance patient care coordination
• Reduce operational costs
• Scale as your business grows",
    }
}

pub fn high_volume_message(rx_volume: u32) -> String {
    format!(
        "That's impressive! With {rx_volume} prescriptions, you're definitely a high-volume pharmacy. \
         We have specialized solutions designed specifically for pharmacies like yours.\n\n\
         Our high-volume pharmacy program includes:\n\
         • Priority implementation (2-week setup)\n\
         • Dedicated account manager\n\
         • Volume-based pricing discounts\n\
         • Advanced automation features\n\
         • Custom workflow optimization\n\n\
         Would you like to hear more about how we can help streamline your operations?"
    )
}

pub fn follow_up_options() -> &'static str {
    "\
I'd be happy to help you get started. We can:

1. Send you detailed information via email
2. Schedule a consultation call to discuss your specific needs
3. Arrange a demo of our system
4. Connect you with one of our pharmacy specialists

What would work best for you?"
}

pub fn email_offer(pharmacy_name: &str, email: &str) -> String {
    format!(
        "I'd be happy to send you some detailed information about our solutions. I can email you a \
         comprehensive overview of how Pharmesol can help {pharmacy_name}, including case studies \
         from similar pharmacies.\n\nWould you like me to send that information to {email}?"
    )
}

pub fn next_steps(summary: &str, follow_up_action: &str) -> String {
    format!(
        "Great! Let me summarize what we've discussed and our next steps:\n\n{summary}\n\n\
         {follow_up_action}\n\n\
         Is there anything else you'd like to know about Pharmesol before we wrap up?"
    )
}

pub fn successful_closing(action_taken: &str, expected_outcome: &str, pharmacy_name: &str) -> String {
    format!(
        "Perfect! I've {action_taken}. You should {expected_outcome}.\n\n\
         Thank you for calling Pharmesol today. We're excited about the opportunity to help \
         {pharmacy_name} optimize your pharmacy operations.\n\n\
         Is there anything else I can help you with today?"
    )
}

/// Follow-up actions the agent can confirm to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    EmailSent,
    CallbackScheduled,
    DemoScheduled,
    SpecialistContact,
}

pub fn confirmation_message(action: Confirmation) -> &'static str {
    match action {
        Confirmation::EmailSent => {
            "I've sent you detailed information about our solutions. You should receive it within the next few minutes."
        }
        Confirmation::CallbackScheduled => {
            "I've scheduled a consultation call for you. You'll receive a confirmation email with the details."
        }
        Confirmation::DemoScheduled => {
            "I've arranged a demo of our system. Our team will contact you to confirm the details."
        }
        Confirmation::SpecialistContact => {
            "I've connected you with one of our pharmacy specialists. They'll reach out within 24 hours."
        }
    }
}

// ── Email bodies ────────────────────────────────────────────────────

/// Subject and body of the welcome email.
pub fn welcome_email(target: &FollowUpTarget) -> (String, String) {
    let subject = format!("Welcome to Pharmesol - Supporting {}", target.pharmacy_name);
    let body = format!(
        "Dear {contact},

Thank you for your interest in Pharmesol! We're excited to help {name} optimize your pharmacy operations.

Based on your current Rx volume of {volume} prescriptions, we can offer you:

• Advanced inventory management solutions
• Automated prescription processing
• Real-time analytics and reporting
• 24/7 technical support
• Custom integration with your existing systems

Our team will be in touch within 24 hours to discuss how we can best serve your pharmacy.

Best regards,
The Pharmesol Team",
        contact = target.contact_person,
        name = target.pharmacy_name,
        volume = target.rx_volume,
    );
    (subject, body)
}

/// Subject and body of the high-volume program offer.
pub fn high_volume_offer_email(target: &FollowUpTarget) -> (String, String) {
    let subject = format!(
        "Special Offer for {} - High Volume Pharmacy Solutions",
        target.pharmacy_name
    );
    let body = format!(
        "Dear {contact},

We noticed that {name} processes {volume} prescriptions, making you a high-volume pharmacy that could greatly benefit from our advanced solutions.

As a high-volume pharmacy, you're eligible for:

• Priority implementation (2-week setup)
• Dedicated account manager
• Volume-based pricing discounts
• Advanced automation features
• Custom workflow optimization

Would you like to schedule a consultation to discuss how we can help streamline your operations?

Best regards,
The Pharmesol Team",
        contact = target.contact_person,
        name = target.pharmacy_name,
        volume = target.rx_volume,
    );
    (subject, body)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(volume: u32) -> CallerRecord {
        CallerRecord {
            id: "1".into(),
            name: "HealthFirst Pharmacy".into(),
            phone: "555-123-4567".into(),
            location: "New York, NY".into(),
            rx_volume: volume,
            contact_person: "Emily Carter".into(),
            email: None,
            notes: None,
        }
    }

    #[test]
    fn volume_tiers() {
        assert_eq!(VolumeTier::from_volume(1000), VolumeTier::High);
        assert_eq!(VolumeTier::from_volume(999), VolumeTier::Medium);
        assert_eq!(VolumeTier::from_volume(500), VolumeTier::Medium);
        assert_eq!(VolumeTier::from_volume(499), VolumeTier::Standard);
        assert_eq!(VolumeTier::from_volume(0), VolumeTier::Standard);
    }

    #[test]
    fn existing_greeting_is_tiered() {
        let high = existing_customer_greeting(&record(1500));
        assert!(high.contains("HealthFirst Pharmacy"));
        assert!(high.contains("New York, NY"));
        assert!(high.contains("1500 prescriptions"));
        assert!(high.contains("high-volume program"));

        let medium = existing_customer_greeting(&record(650));
        assert!(medium.contains("solid volume"));
        assert!(!medium.contains("high-volume program"));

        let small = existing_customer_greeting(&record(100));
        assert!(small.contains("pharmacies your size"));
    }

    #[test]
    fn existing_greeting_fills_blank_fields() {
        let mut blank = record(0);
        blank.name.clear();
        blank.location.clear();
        let greeting = existing_customer_greeting(&blank);
        assert!(greeting.contains("your pharmacy in your area"));
    }

    #[test]
    fn new_lead_greeting_uses_bot_name() {
        assert!(new_lead_greeting("Alex").contains("My name is Alex"));
    }

    #[test]
    fn benefits_follow_tiers() {
        assert!(solution_benefits(1500).starts_with("For high-volume pharmacies"));
        assert!(solution_benefits(600).starts_with("For pharmacies of your size"));
        assert!(solution_benefits(50).starts_with("We can help you"));
    }

    #[test]
    fn extraction_prompt_names_field() {
        let prompt = extraction_prompt(LeadField::RxVolume, "about 800 a month");
        assert!(prompt.contains("Extract rx_volume information"));
        assert!(prompt.contains("\"about 800 a month\""));
        assert!(prompt.contains("{\"rx_volume\": null}"));
    }

    #[test]
    fn missing_info_lists_fields() {
        let msg = missing_info_message(&[LeadField::Location, LeadField::Email]);
        assert!(msg.contains("• location\n• email address"));
    }

    #[test]
    fn email_bodies_mention_target() {
        let target = FollowUpTarget {
            pharmacy_name: "Corner Apothecary".into(),
            contact_person: "Priya".into(),
            email: None,
            phone: String::new(),
            rx_volume: 1200,
        };
        let (subject, body) = welcome_email(&target);
        assert_eq!(subject, "Welcome to Pharmesol - Supporting Corner Apothecary");
        assert!(body.starts_with("Dear Priya,"));
        assert!(body.contains("1200 prescriptions"));

        let (subject, body) = high_volume_offer_email(&target);
        assert!(subject.starts_with("Special Offer for Corner Apothecary"));
        assert!(body.contains("processes 1200 prescriptions"));
    }

    #[test]
    fn closing_formats() {
        let text = successful_closing("sent you an email", "receive it soon", "Acme Pharmacy");
        assert!(text.starts_with("Perfect! I've sent you an email. You should receive it soon."));
        assert!(text.contains("help Acme Pharmacy optimize"));
    }
}
