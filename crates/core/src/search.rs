//! Accent-insensitive catalog and customer filtering.
//!
//! Matching is plain substring containment over normalized text: canonical decomposition,
//! combining diacritical marks (U+0300..=U+036F) removed, then lower-cased. There is no
//! ranking or edit distance.

use unicode_normalization::UnicodeNormalization;

use crate::domain::customer::Customer;
use crate::domain::product::Product;

const COMBINING_DIACRITICAL_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036F}';

pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|ch| !COMBINING_DIACRITICAL_MARKS.contains(ch))
        .collect::<String>()
        .to_lowercase()
}

pub fn matches(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.is_empty() {
        return false;
    }
    normalize(haystack).contains(&normalize(needle))
}

/// Records that can be filtered by free text.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;

    fn matches_query(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let needle = normalize(needle);
        self.search_fields()
            .into_iter()
            .filter(|field| !field.is_empty())
            .any(|field| normalize(field).contains(&needle))
    }
}

impl Searchable for Product {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.category.as_str()]
    }
}

impl Searchable for Customer {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.document.as_deref());
        fields.extend(self.city.as_deref());
        fields
    }
}

/// Keeps the records matching `needle`, in input order.
pub fn filter<'a, T: Searchable>(records: &'a [T], needle: &str) -> Vec<&'a T> {
    records.iter().filter(|record| record.matches_query(needle)).collect()
}
