//! Concrete email delivery adapters, one per upstream HTTP API.

pub mod brevo;
pub mod mailgun;
pub mod resend;
