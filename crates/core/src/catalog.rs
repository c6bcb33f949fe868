//! Catalog listing helpers.

use crate::types::Product;

/// Products whose title or description contains `term`, ignoring case.
///
/// A blank term matches everything. Input order is preserved.
#[must_use]
pub fn search<'a>(products: &'a [Product], term: &str) -> Vec<&'a Product> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }
    products
        .iter()
        .filter(|p| p.matches_lowercase(&needle))
        .collect()
}

/// Sort newest first by creation time.
pub fn sort_newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::types::ProductId;

    fn product(title: &str, description: &str, age_minutes: i64) -> Product {
        Product {
            id: ProductId::generate(),
            title: title.to_owned(),
            description: description.to_owned(),
            price: "10".parse().unwrap(),
            image_url: String::new(),
            asset_id: None,
            sold_out: false,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_search_matches_title_or_description() {
        let products = vec![
            product("Coffee Mug", "Clay mug", 0),
            product("Scarf", "Handwoven cotton", 1),
            product("Basket", "Woven grass basket", 2),
        ];

        let hits: Vec<_> = search(&products, "WOVEN").iter().map(|p| p.title.as_str()).collect();
        assert_eq!(hits, vec!["Scarf", "Basket"]);
        assert_eq!(search(&products, "mug").len(), 1);
        assert!(search(&products, "lamp").is_empty());
    }

    #[test]
    fn test_search_blank_term_returns_all() {
        let products = vec![product("A", "a", 0), product("B", "b", 1)];
        assert_eq!(search(&products, "   ").len(), 2);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut products = vec![product("old", "", 30), product("new", "", 0)];
        sort_newest_first(&mut products);
        assert_eq!(products[0].title, "new");
    }
}
