// generate_key.rs
// Utility to generate a new session token signing key

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

fn main() {
    println!("Generating new HS256 signing key...\n");

    let mut key = [0u8; 48];
    OsRng.fill_bytes(&mut key);
    let key = URL_SAFE_NO_PAD.encode(key);

    println!("✅ Key generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("JWT_SECRET={}", key);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this key secure and never commit it to version control");
    println!("  • Rotating it signs every user out: outstanding tokens stop verifying");
}
