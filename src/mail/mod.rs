mod client;
mod outbox;

pub use client::{Mailer, SendGridClient, VerificationEmail};
pub use outbox::Outbox;
