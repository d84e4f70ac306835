//! Order number generator

use rand::Rng;

/// Every order number starts with this
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

const SUFFIX_LEN: usize = 10;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `ORD-` followed by 10 random uppercase alphanumerics
pub fn generate() -> String {
    generate_with(&mut rand::thread_rng())
}

pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut number = String::with_capacity(ORDER_NUMBER_PREFIX.len() + SUFFIX_LEN);
    number.push_str(ORDER_NUMBER_PREFIX);
    for _ in 0..SUFFIX_LEN {
        let idx = rng.gen_range(0..ALPHABET.len());
        number.push(ALPHABET[idx] as char);
    }
    number
}

/// Shape check used by tests and clients
pub fn is_well_formed(number: &str) -> bool {
    number.strip_prefix(ORDER_NUMBER_PREFIX).is_some_and(|suffix| {
        suffix.len() == SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_numbers_are_well_formed() {
        for _ in 0..500 {
            let number = generate();
            assert!(is_well_formed(&number), "bad order number {number}");
        }
    }

    #[test]
    fn test_generated_numbers_differ() {
        let numbers: HashSet<String> = (0..1000).map(|_| generate()).collect();
        assert_eq!(numbers.len(), 1000);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("ORD-AB12CD34EF"));
        assert!(!is_well_formed("ORD-ab12cd34ef"));
        assert!(!is_well_formed("ORD-AB12"));
        assert!(!is_well_formed("XYZ-AB12CD34EF"));
    }
}
