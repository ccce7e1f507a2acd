//! Bearer-token identity for the API.
//! Keep the public surface thin and split implementation across sub-modules.

mod credential;
mod principal;
mod token;
mod verifier;

pub use credential::{CredentialError, ServiceAccount};
pub use principal::Principal;
pub use token::{mint_token, Claims, TokenError};
pub use verifier::{bearer_token, AuthError, HmacTokenVerifier, StaticTokenVerifier, TokenVerifier};
