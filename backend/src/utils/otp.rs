use rand::Rng;

/// Draws a six-digit passcode without a leading zero.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}
