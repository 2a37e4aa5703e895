pub mod credentials;
pub mod redaction;

pub use credentials::{PLACEHOLDER_CREDENTIALS, is_usable_credential};
pub use redaction::{RedactingWriter, redact_secrets};
