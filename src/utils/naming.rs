//! Naming helpers for generated root fields.
//!
//! Root field names are derived from a type name the same way on every
//! entity: pluralise the last camel-case word, then lower the first letter
//! (`UserProfile` → `userProfiles`, `Person` → `people`).

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref IRREGULAR_PLURALS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("person", "people");
        m.insert("child", "children");
        m.insert("man", "men");
        m.insert("woman", "women");
        m.insert("mouse", "mice");
        m.insert("goose", "geese");
        m.insert("foot", "feet");
        m.insert("tooth", "teeth");
        m.insert("ox", "oxen");
        m
    };
    static ref UNCOUNTABLE: Vec<&'static str> = vec![
        "sheep", "fish", "series", "species", "information", "equipment", "news", "deer",
        "data", "media",
    ];
}

/// Split off the last camel-case word: `UserProfile` → (`User`, `Profile`).
fn split_last_word(name: &str) -> (&str, &str) {
    let boundary = name
        .char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    name.split_at(boundary)
}

fn match_case(word: &str, replacement: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => upper_first(replacement),
        _ => replacement.to_string(),
    }
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some(irregular) = IRREGULAR_PLURALS.get(lower.as_str()) {
        return match_case(word, irregular);
    }
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if lower.ends_with("ss")
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
        || lower.ends_with('z')
    {
        return format!("{}es", word);
    }
    if lower.ends_with('s') {
        // already plural
        return word.to_string();
    }
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{}s", word)
}

/// Pluralise a (possibly camel-cased) type name, preserving its casing.
pub fn pluralize(name: &str) -> String {
    let (head, last) = split_last_word(name);
    format!("{}{}", head, pluralize_word(last))
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plural used for root query fields. An explicit `@plural` value wins.
pub fn plural_field_name(type_name: &str, plural_override: Option<&str>) -> String {
    match plural_override {
        Some(value) => lower_first(value),
        None => lower_first(&pluralize(type_name)),
    }
}
