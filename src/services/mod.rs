mod notifier;
mod oauth;

pub use notifier::{Notifier, WebhookNotifier};
pub use oauth::{CredentialRefresher, GoogleRefresher, RefreshedToken};
