pub mod oauth;
pub mod utils;
pub use oauth::{AuthorizationPrompt, ConsolePrompt, CredentialProvider, TokenResponse};
