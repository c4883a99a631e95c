//! Catalog categories shown as filters on the customer home screen.

/// Pseudo-category that matches every store.
pub const ALL_CATEGORIES: &str = "Todos";

/// Category filters with their display icons, in display order.
pub const CATEGORIES: [(&str, &str); 8] = [
    (ALL_CATEGORIES, "🍽️"),
    ("Pizza", "🍕"),
    ("Hambúrgueres", "🍔"),
    ("Japonesa", "🍣"),
    ("Mexicana", "🌮"),
    ("Saudável", "🥗"),
    ("Bebidas", "🥤"),
    ("Sobremesas", "🍰"),
];

/// Whether an item in `category` passes the `selected` filter.
#[must_use]
pub fn category_matches(selected: &str, category: &str) -> bool {
    selected == ALL_CATEGORIES || selected.eq_ignore_ascii_case(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_matches_everything() {
        assert!(category_matches("Todos", "Pizza"));
        assert!(category_matches("Todos", "Geral"));
    }

    #[test]
    fn test_specific_category() {
        assert!(category_matches("Pizza", "Pizza"));
        assert!(category_matches("pizza", "Pizza"));
        assert!(!category_matches("Japonesa", "Pizza"));
    }

    #[test]
    fn test_first_category_is_all() {
        assert_eq!(CATEGORIES.first().map(|(name, _)| *name), Some(ALL_CATEGORIES));
    }
}
