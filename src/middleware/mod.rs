pub mod csrf;
pub mod security_headers;

pub use csrf::{
    csrf_validation_middleware, generate_csrf_token, get_or_create_csrf_token,
    validate_csrf_form_field, CsrfError, CsrfToken, CSRF_FORM_FIELD, CSRF_HEADER,
};
pub use security_headers::security_headers;
