use rand::Rng;

const SESSION_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CONNECTION_ID_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const SESSION_CODE_LENGTH: usize = 6;
pub const CONNECTION_ID_LENGTH: usize = 16;

fn random_string(rng: &mut impl Rng, alphabet: &[u8], length: usize) -> String {
    (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Short uppercase code identifying a multiplayer session.
pub fn generate_session_code(rng: &mut impl Rng) -> String {
    random_string(rng, SESSION_CODE_ALPHABET, SESSION_CODE_LENGTH)
}

pub fn generate_connection_id() -> String {
    random_string(&mut rand::rng(), CONNECTION_ID_ALPHABET, CONNECTION_ID_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_session_code_is_six_uppercase_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = generate_session_code(&mut rng);
            assert_eq!(code.len(), SESSION_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_connection_ids_differ() {
        let a = generate_connection_id();
        let b = generate_connection_id();
        assert_eq!(a.len(), CONNECTION_ID_LENGTH);
        assert_ne!(a, b);
    }
}
