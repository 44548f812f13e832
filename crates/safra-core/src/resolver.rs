//! Free-text field resolution
//!
//! Transactions name the field they belong to in a free-text "linked area".
//! Resolution tries an exact normalized match first, then substring
//! containment in either direction, first field in listed order wins.

use std::collections::HashMap;

use crate::models::Field;
use crate::normalize::normalize_name;

/// Precomputed lookup over a fixed field set
#[derive(Debug, Clone)]
pub struct FieldResolver<'a> {
    fields: Vec<(&'a Field, String)>,
    exact: HashMap<String, usize>,
}

impl<'a> FieldResolver<'a> {
    pub fn new<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a Field>,
    {
        let mut entries = Vec::new();
        let mut exact = HashMap::new();

        for field in fields {
            let key = normalize_name(&field.name);
            // an empty name would contain-match every input
            if key.is_empty() {
                continue;
            }
            exact.entry(key.clone()).or_insert(entries.len());
            entries.push((field, key));
        }

        Self {
            fields: entries,
            exact,
        }
    }

    /// Resolve linked-area text to a field
    pub fn resolve(&self, linked_area: &str) -> Option<&'a Field> {
        let key = normalize_name(linked_area);
        if key.is_empty() {
            return None;
        }

        if let Some(idx) = self.exact.get(&key) {
            return Some(self.fields[*idx].0);
        }

        self.fields
            .iter()
            .find(|(_, name)| contains_either(&key, name))
            .map(|(field, _)| *field)
    }

    /// Every field the text could refer to by containment.
    ///
    /// Empty when the text matches a field name exactly.
    pub fn candidates(&self, linked_area: &str) -> Vec<&'a Field> {
        let key = normalize_name(linked_area);
        if key.is_empty() || self.exact.contains_key(&key) {
            return Vec::new();
        }

        self.fields
            .iter()
            .filter(|(_, name)| contains_either(&key, name))
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn contains_either(key: &str, name: &str) -> bool {
    key.contains(name) || name.contains(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str, name: &str) -> Field {
        Field {
            id: id.to_string(),
            account_id: "acct".to_string(),
            name: name.to_string(),
            area_ha: 10.0,
            active: true,
            is_default: false,
            property_id: None,
            crop: None,
            safra: None,
        }
    }

    #[test]
    fn test_exact_match_after_normalization() {
        let fields = vec![field("a", "Talhão 1"), field("b", "Talhão 10")];
        let resolver = FieldResolver::new(&fields);

        assert_eq!(resolver.resolve("TALHAO 10").unwrap().id, "b");
        assert_eq!(resolver.resolve("talhão  1").unwrap().id, "a");
    }

    #[test]
    fn test_substring_either_direction() {
        let fields = vec![field("a", "Baixada"), field("b", "Morro Alto")];
        let resolver = FieldResolver::new(&fields);

        // input contains field name
        assert_eq!(resolver.resolve("Adubação na Baixada").unwrap().id, "a");
        // field name contains input
        assert_eq!(resolver.resolve("morro").unwrap().id, "b");
    }

    #[test]
    fn test_first_listed_field_wins_on_overlap() {
        let fields = vec![field("a", "Talhão 1"), field("b", "Talhão 10")];
        let resolver = FieldResolver::new(&fields);

        // "talhao 10 sul" contains both names; listed order decides
        assert_eq!(resolver.resolve("Talhão 10 Sul").unwrap().id, "a");
        let candidates: Vec<_> = resolver
            .candidates("Talhão 10 Sul")
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(candidates, vec!["a", "b"]);
    }

    #[test]
    fn test_no_match_and_empty_input() {
        let fields = vec![field("a", "Baixada")];
        let resolver = FieldResolver::new(&fields);

        assert!(resolver.resolve("Fazenda Boa Vista").is_none());
        assert!(resolver.resolve("").is_none());
        assert!(resolver.resolve("  !! ").is_none());
        assert!(resolver.candidates("").is_empty());
    }

    #[test]
    fn test_fields_with_empty_names_never_match() {
        let fields = vec![field("x", "***"), field("a", "Baixada")];
        let resolver = FieldResolver::new(&fields);

        assert!(resolver.resolve("qualquer coisa").is_none());
        assert_eq!(resolver.resolve("baixada").unwrap().id, "a");
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let fields = vec![field("a", "Sede"), field("b", "SEDE")];
        let resolver = FieldResolver::new(&fields);
        assert_eq!(resolver.resolve("sede").unwrap().id, "a");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let fields = vec![
            field("a", "Talhão 1"),
            field("b", "Talhão 10"),
            field("c", "Café Novo"),
        ];
        let resolver = FieldResolver::new(&fields);
        for input in ["talhao", "Café", "talhão 10", "novo café", "x"] {
            let first = resolver.resolve(input).map(|f| f.id.clone());
            for _ in 0..5 {
                assert_eq!(resolver.resolve(input).map(|f| f.id.clone()), first);
            }
        }
    }
}
