pub mod claims;
pub mod error;
pub mod raw_token;
pub mod validator;

pub use claims::Claims;
pub use error::{FailureKind, TokenError};
pub use raw_token::RawToken;
pub use validator::{TokenValidator, ValidationOutcome};
