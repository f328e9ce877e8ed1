/// Case-insensitive equality for user-facing text such as titles, genres and labels.
///
/// Uses full Unicode lowercasing, so "Amélie" and "AMÉLIE" compare equal.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_ignore_case_folds_non_ascii() {
        assert!(eq_ignore_case("Amélie", "AMÉLIE"));
        assert!(eq_ignore_case("Comédie", "comédie"));
        assert!(eq_ignore_case("ÆON FLUX", "æon flux"));
        assert!(eq_ignore_case("Леон", "ЛЕОН"));
        assert!(!eq_ignore_case("Amélie", "Amelie"));
        assert!(!eq_ignore_case("Heat", "Heat 2"));
    }
}
