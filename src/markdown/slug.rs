//! Heading title → anchor slug conversion with collision renumbering.

use std::collections::HashMap;

use crate::config::{Dialect, SlugStyle};
use crate::markdown::link::Anchor;
use crate::markdown::node::NodeId;

/// Base slug of a title for a dialect, before collision handling.
pub fn slug_for(title: &str, dialect: Dialect) -> String {
    let lower = title.trim().to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    match dialect.slug_style() {
        SlugStyle::LatinPreserving => {
            for c in lower.chars() {
                match c {
                    ' ' | '-' => slug.push('-'),
                    '_' => slug.push('_'),
                    c if c.is_alphanumeric() => slug.push(c),
                    _ => {}
                }
            }
        }
        SlugStyle::Transliterating => {
            for c in lower.chars() {
                match c {
                    'a'..='z' | '0'..='9' | '_' => slug.push(c),
                    ' ' | '-' => slug.push('-'),
                    c => {
                        if let Some(latin) = transliterate(c) {
                            slug.push_str(latin);
                        }
                    }
                }
            }
        }
    }
    slug
}

/// Latin spelling of a lower-case Cyrillic letter.
fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

// ─────────────────────────────────────────────────────────────────────────────
// Anchor Table
// ─────────────────────────────────────────────────────────────────────────────

/// Anchors of one document keyed by their full link.
#[derive(Debug, Clone)]
pub struct AnchorTable {
    dialect: Dialect,
    anchors: HashMap<String, Anchor>,
}

impl AnchorTable {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            anchors: HashMap::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Register a heading, renumbering its slug until it is unique.
    ///
    /// A candidate that hits an entry with a different title, or one that is
    /// still un-numbered, moves below it as `<candidate>-1`; a candidate that
    /// hits a numbered entry with the same title takes the next number.
    pub fn register(&mut self, title: &str, node: NodeId) -> Anchor {
        let mut candidate = Anchor {
            node,
            title: title.to_string(),
            address: slug_for(title, self.dialect),
            number: 0,
        };

        while let Some(existing) = self.anchors.get(&candidate.full_link()) {
            if existing.title != candidate.title || existing.number == 0 {
                candidate.address = candidate.full_link();
                candidate.number = 1;
            } else {
                candidate.address = existing.address.clone();
                candidate.number = existing.number + 1;
            }
        }

        self.anchors.insert(candidate.full_link(), candidate.clone());
        candidate
    }

    /// Look an anchor up by full link (without `#`).
    pub fn get(&self, full_link: &str) -> Option<&Anchor> {
        self.anchors.get(full_link)
    }

    pub fn contains(&self, full_link: &str) -> bool {
        self.anchors.contains_key(full_link)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors in document order.
    pub fn in_document_order(&self) -> Vec<&Anchor> {
        let mut anchors: Vec<&Anchor> = self.anchors.values().collect();
        anchors.sort_by_key(|a| a.node);
        anchors
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn register_all(dialect: Dialect, titles: &[&str]) -> Vec<String> {
        let mut table = AnchorTable::new(dialect);
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| table.register(title, NodeId(i)).full_link())
            .collect()
    }

    #[test]
    fn test_latin_slug() {
        assert_eq!(slug_for("Hello, World!", Dialect::GitHub), "hello-world");
        assert_eq!(slug_for("snake_case-Title", Dialect::GitHub), "snake_case-title");
        assert_eq!(slug_for("Заголовок Één", Dialect::GitHub), "заголовок-één");
    }

    #[test]
    fn test_transliterated_slug() {
        assert_eq!(slug_for("АБВ abc", Dialect::Habr), "abv-abc");
        assert_eq!(slug_for("Щука и ёж!", Dialect::Habr), "schuka-i-ezh");
        let slug = slug_for("Объявление № 5", Dialect::Habr);
        assert_eq!(slug, "obyavlenie--5");
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'));
    }

    #[test]
    fn test_slug_is_pure() {
        assert_eq!(
            slug_for("Some Title", Dialect::Dev),
            slug_for("Some Title", Dialect::Dev)
        );
    }

    #[test]
    fn test_collision_law() {
        assert_eq!(
            register_all(Dialect::GitHub, &["H2", "H2", "H2 1"]),
            vec!["h2", "h2-1", "h2-1-1"]
        );
    }

    #[test]
    fn test_repeated_titles_increment() {
        assert_eq!(
            register_all(Dialect::GitHub, &["Intro", "Intro", "Intro", "Intro"]),
            vec!["intro", "intro-1", "intro-2", "intro-3"]
        );
    }

    #[test]
    fn test_different_title_same_slug() {
        // "Intro!" slugs to "intro" but is a different title
        assert_eq!(
            register_all(Dialect::GitHub, &["Intro", "Intro!", "Intro?"]),
            vec!["intro", "intro-1", "intro-1-1"]
        );
    }

    #[test]
    fn test_table_keys_are_unique() {
        let mut table = AnchorTable::new(Dialect::GitHub);
        for (i, title) in ["A", "A", "A 1", "A", "A 1"].iter().enumerate() {
            table.register(title, NodeId(i));
        }
        assert_eq!(table.len(), 5);
        let order: Vec<_> = table
            .in_document_order()
            .iter()
            .map(|a| a.full_link())
            .collect();
        assert_eq!(order, vec!["a", "a-1", "a-1-1", "a-2", "a-1-2"]);
    }
}
