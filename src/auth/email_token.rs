use rand::{rngs::OsRng, RngCore};

/// Number of random bytes behind a verification token.
const TOKEN_BYTES: usize = 64;

/// Generate the one-time email verification token: 64 random bytes,
/// hex-encoded to 128 characters.
pub fn generate_email_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
