use rand::{rngs::OsRng, RngCore};

/// Generates an unguessable 256-bit correlation token, hex encoded.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
