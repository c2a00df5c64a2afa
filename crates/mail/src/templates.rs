//! Onboarding invitation templates.
//!
//! Supported languages are `it` and `en`; anything else falls back to `en`.

/// Subject and plain-text body of an onboarding invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationEmail {
    pub subject: String,
    pub body: String,
}

struct Template {
    subject: &'static str,
    greeting: &'static str,
    intro: &'static str,
    closing: &'static str,
}

const IT: Template = Template {
    subject: "Completa il tuo profilo di onboarding",
    greeting: "Gentile",
    intro: "ti invitiamo a completare il questionario di profilazione al seguente link:",
    closing: "Cordiali saluti",
};

const EN: Template = Template {
    subject: "Complete your onboarding profile",
    greeting: "Dear",
    intro: "please complete the profiling questionnaire at the following link:",
    closing: "Kind regards",
};

fn template_for(language: &str) -> &'static Template {
    match language.trim().to_ascii_lowercase().as_str() {
        "it" => &IT,
        _ => &EN,
    }
}

/// Render the invitation for `client_name`.
///
/// A non-blank `custom_subject` replaces the default subject; a non-blank
/// `custom_message` is placed above the link.
pub fn render_onboarding_invitation(
    language: &str,
    client_name: &str,
    advisor_name: &str,
    link: &str,
    custom_message: Option<&str>,
    custom_subject: Option<&str>,
) -> InvitationEmail {
    let template = template_for(language);

    let subject = custom_subject
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(template.subject)
        .to_string();

    let mut body = format!("{} {client_name},\n\n", template.greeting);
    if let Some(message) = custom_message.map(str::trim).filter(|m| !m.is_empty()) {
        body.push_str(message);
        body.push_str("\n\n");
    }
    body.push_str(template.intro);
    body.push_str(&format!("\n\n{link}\n\n{},\n{advisor_name}\n", template.closing));

    InvitationEmail { subject, body }
}
