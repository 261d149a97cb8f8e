//! Display-name generation for automated agents
//!
//! Names compose an adjective, a noun, and a random integer. Uniqueness
//! is only probabilistic; a collision is a tolerated non-fatal condition
//! handled (or not) by the reply service.

use rand::Rng;

const ADJECTIVES: [&str; 8] = [
    "Rapido",
    "Inteligente",
    "Curioso",
    "Amigavel",
    "Criativo",
    "Ativo",
    "Sabio",
    "Divertido",
];

const NOUNS: [&str; 8] = [
    "Bot",
    "Robo",
    "Assistente",
    "Helper",
    "Amigo",
    "Companheiro",
    "Ajudante",
    "Guia",
];

/// Generate a display name like `CuriosoRobo42`
pub fn generate_username() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let number: u16 = rng.gen_range(1..=999);
    format!("{adjective}{noun}{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_shape() {
        for _ in 0..100 {
            let name = generate_username();

            let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
            let number: u16 = digits.parse().expect("name ends with an integer");
            assert!((1..=999).contains(&number));

            let word = &name[..name.len() - digits.len()];
            assert!(ADJECTIVES.iter().any(|a| word.starts_with(a)));
            assert!(NOUNS.iter().any(|n| word.ends_with(n)));
        }
    }

    #[test]
    fn test_usernames_vary() {
        let names: std::collections::HashSet<String> =
            (0..50).map(|_| generate_username()).collect();
        // Collisions are possible but 50 identical draws are not.
        assert!(names.len() > 1);
    }
}
