mod extractor;
mod session;

pub use extractor::SessionUser;
pub use session::{SessionClaims, SessionError, SessionVerifier};
