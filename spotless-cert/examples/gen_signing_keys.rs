//! Generate the print-signing identity
//! - digital-certificate.txt: publish next to the console so agents can trust it
//! - private-key.pem: goes into SIGNING_PRIVATE_KEY of spotless-sign, never served

use spotless_cert::{IdentityProfile, SigningIdentity, inspect_certificate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "certs".to_string());

    println!("Generating RSA-2048 signing identity...");
    let identity = SigningIdentity::generate(&IdentityProfile::default())?;
    identity.save(&out_dir)?;

    let info = inspect_certificate(identity.cert_pem())?;
    println!(
        "  CN={} O={}",
        info.common_name.unwrap_or_default(),
        info.organization.unwrap_or_default()
    );
    println!("\nDone! Files in {out_dir}/");
    println!("Keep private-key.pem secret.");
    Ok(())
}
