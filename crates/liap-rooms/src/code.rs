use std::collections::HashSet;

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const LENGTH: usize = 6;

/// Mints a human-shareable room code: uppercase alphanumeric, ambiguous
/// characters (`0`/`O`, `1`/`I`) excluded, retried against `taken` until a
/// free one is found.
pub fn generate(taken: &HashSet<String>) -> String {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..LENGTH).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char).collect();
        if !taken.contains(&code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_expected_length_and_alphabet() {
        let code = generate(&HashSet::new());
        assert_eq!(code.len(), LENGTH);
        assert!(code.chars().all(|c| ALPHABET.contains(&(c as u8))));
    }

    #[test]
    fn generate_avoids_taken_codes() {
        let mut taken = HashSet::new();
        let first = generate(&taken);
        taken.insert(first.clone());
        for _ in 0..100 {
            let next = generate(&taken);
            assert_ne!(next, first);
            taken.insert(next);
        }
    }
}
