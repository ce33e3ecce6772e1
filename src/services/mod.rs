pub mod auth_service;
pub mod discover_service;
pub mod email_service;
pub mod grocery_list_service;
pub mod magic_link_service;
pub mod pantry_service;
pub mod recipe_service;
pub mod token_cipher;
pub mod user_service;

pub use auth_service::{AuthService, AuthServiceError, MagicLinkOutcome};
pub use email_service::{create_email_service, EmailError, EmailService, MockEmailService};
pub use magic_link_service::{MagicLinkError, MagicLinkService};
pub use token_cipher::TokenCipher;
