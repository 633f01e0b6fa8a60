//! Compiled-in email templates.
//!
//! Each notification has a `<name>.subject` and a `<name>.html` template.
//! HTML bodies extend `layout.html` and are auto-escaped; subjects are not.

use crate::error::Result;
use minijinja::Environment;
use serde::Serialize;

const LAYOUT: &str = r#"<!doctype html>
<html>
<body style="font-family: Helvetica, Arial, sans-serif; color: #1f2933;">
  <h2 style="color: #0b4f6c;">{% block heading %}{% endblock %}</h2>
  {% block body %}{% endblock %}
  <p style="color: #7b8794; font-size: 12px;">
    This message was sent by the handover team{% if property_name %} for {{ property_name }}{% endif %}.
  </p>
</body>
</html>"#;

/// `(name, subject, body)` for every notification.
const TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "magic_link",
        "Your sign-in link",
        r#"{% extends "layout.html" %}
{% block heading %}Sign in{% endblock %}
{% block body %}
<p>Hello {{ name }},</p>
<p><a href="{{ link }}">Sign in to the handover portal</a>. The link expires in {{ expires_minutes }} minutes.</p>
<p>If you did not ask for this link you can ignore this email.</p>
{% endblock %}"#,
    ),
    (
        "developer_link",
        "Developer access to {{ property_name }}",
        r#"{% extends "layout.html" %}
{% block heading %}Developer access{% endblock %}
{% block body %}
<p>You have been given read-only access to <strong>{{ property_name }}</strong>.</p>
<p><a href="{{ link }}">Open the handover dashboard</a>. The link expires in {{ expires_hours }} hours.</p>
{% endblock %}"#,
    ),
    (
        "booking_confirmed",
        "Handover booked for unit {{ unit_number }}",
        r#"{% extends "layout.html" %}
{% block heading %}Handover appointment confirmed{% endblock %}
{% block body %}
<p>The handover of unit <strong>{{ unit_number }}</strong> is booked for {{ date }} at {{ time }}.</p>
{% if notes %}<p>Notes: {{ notes }}</p>{% endif %}
<p>Your booking confirmation is attached.</p>
{% endblock %}"#,
    ),
    (
        "booking_rescheduled",
        "Handover rescheduled for unit {{ unit_number }}",
        r#"{% extends "layout.html" %}
{% block heading %}Handover appointment moved{% endblock %}
{% block body %}
<p>The handover of unit <strong>{{ unit_number }}</strong> has moved from {{ previous_date }} at {{ previous_time }}
to {{ date }} at {{ time }}.</p>
{% endblock %}"#,
    ),
    (
        "booking_cancelled",
        "Handover cancelled for unit {{ unit_number }}",
        r#"{% extends "layout.html" %}
{% block heading %}Handover appointment cancelled{% endblock %}
{% block body %}
<p>The handover of unit <strong>{{ unit_number }}</strong> on {{ date }} at {{ time }} has been cancelled.</p>
{% if reason %}<p>Reason: {{ reason }}</p>{% endif %}
{% endblock %}"#,
    ),
    (
        "handover_completed",
        "Unit {{ unit_number }} handed over",
        r#"{% extends "layout.html" %}
{% block heading %}Welcome home{% endblock %}
{% block body %}
<p>The handover of unit <strong>{{ unit_number }}</strong> was completed on {{ completed_at }}.</p>
{% endblock %}"#,
    ),
    (
        "payment_status",
        "Payment status for unit {{ unit_number }}: {{ status }}",
        r#"{% extends "layout.html" %}
{% block heading %}Payment update{% endblock %}
{% block body %}
<p>The payment status of unit <strong>{{ unit_number }}</strong> is now <strong>{{ status }}</strong>.</p>
{% if status == "cleared" %}<p>Once your documents are approved you can book your handover appointment.</p>{% endif %}
{% endblock %}"#,
    ),
    (
        "documents_status",
        "Documents for unit {{ unit_number }}: {{ status }}",
        r#"{% extends "layout.html" %}
{% block heading %}Document review{% endblock %}
{% block body %}
<p>The handover documents for unit <strong>{{ unit_number }}</strong> are now <strong>{{ status }}</strong>.</p>
{% if note %}<p>{{ note }}</p>{% endif %}
{% endblock %}"#,
    ),
    (
        "soa_issued",
        "Statement of account for unit {{ unit_number }}",
        r#"{% extends "layout.html" %}
{% block heading %}Statement of account{% endblock %}
{% block body %}
<table>
  <tr><td>Total due</td><td>{{ total_due }}</td></tr>
  <tr><td>Total paid</td><td>{{ total_paid }}</td></tr>
  <tr><td><strong>Balance</strong></td><td><strong>{{ balance }}</strong></td></tr>
</table>
<p>The full statement is attached.</p>
{% endblock %}"#,
    ),
    (
        "noc_issued",
        "No-objection certificate for unit {{ unit_number }}",
        r#"{% extends "layout.html" %}
{% block heading %}No-objection certificate{% endblock %}
{% block body %}
<p>A no-objection certificate for unit <strong>{{ unit_number }}</strong> was issued on {{ issued_at }}.</p>
<p>The certificate is attached.</p>
{% endblock %}"#,
    ),
    (
        "penalty_added",
        "Penalty added to unit {{ unit_number }}",
        r#"{% extends "layout.html" %}
{% block heading %}Penalty notice{% endblock %}
{% block body %}
<p>A penalty of <strong>{{ amount }}</strong> was added to unit {{ unit_number }}.</p>
<p>Reason: {{ reason }}</p>
{% endblock %}"#,
    ),
];

/// A rendered subject and HTML body.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Holds the compiled template environment.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("layout.html", LAYOUT)?;
        for (name, subject, body) in TEMPLATES {
            env.add_template_owned(format!("{}.subject", name), *subject)?;
            env.add_template_owned(format!("{}.html", name), *body)?;
        }
        Ok(Self { env })
    }

    /// Names of all notification templates.
    pub fn names() -> impl Iterator<Item = &'static str> {
        TEMPLATES.iter().map(|(name, _, _)| *name)
    }

    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<RenderedEmail> {
        let subject = self
            .env
            .get_template(&format!("{}.subject", name))?
            .render(&context)?;
        let html = self.env.get_template(&format!("{}.html", name))?.render(&context)?;
        Ok(RenderedEmail { subject: subject.trim().to_string(), html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_template_renders() {
        let engine = TemplateEngine::new().unwrap();
        let ctx = json!({
            "name": "Sam", "link": "http://x/y", "expires_minutes": 30, "expires_hours": 72,
            "property_name": "Marina Heights", "unit_number": "A-101",
            "date": "2030-03-04", "time": "10:00", "previous_date": "2030-03-03",
            "previous_time": "09:00", "completed_at": "2030-03-04", "status": "cleared",
            "total_due": "AED 10.00", "total_paid": "AED 5.00", "balance": "AED 5.00",
            "issued_at": "2030-03-04", "amount": "AED 1.00", "reason": "late",
        });
        for name in TemplateEngine::names() {
            let rendered = engine.render(name, &ctx).unwrap();
            assert!(!rendered.subject.is_empty(), "{name}");
            assert!(rendered.html.contains("Marina Heights"), "{name}");
        }
    }

    #[test]
    fn test_html_is_escaped_but_subject_is_not() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render(
                "booking_cancelled",
                json!({"unit_number": "A&B", "date": "d", "time": "t", "reason": "<b>x</b>"}),
            )
            .unwrap();
        assert_eq!(rendered.subject, "Handover cancelled for unit A&B");
        assert!(rendered.html.contains("A&amp;B"));
        assert!(!rendered.html.contains("<b>x</b>"));
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.render("nope", json!({})).is_err());
    }
}
