//! Mint a development session token for calling the signing endpoint
//! without the identity provider.
//!
//! cargo run -p spotless-sign --example gen_session_token -- <user-id>

use jsonwebtoken::{EncodingKey, Header, encode};
use spotless_sign::auth::SessionClaims;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let user_id = std::env::args().nth(1).unwrap_or_else(|| "dev-user".to_string());
    let secret = std::env::var("SESSION_JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("SESSION_JWT_SECRET must be set"))?;
    let audience =
        std::env::var("SESSION_JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string());

    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id,
        email: None,
        role: Some(audience.clone()),
        exp: now + 3600,
        iat: Some(now),
        aud: audience,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    println!("{token}");
    Ok(())
}
