//! An ordered, case-insensitive, case-preserving header multimap.
//!
//! [`HeaderTable`] keeps every field exactly as it appeared (or was built),
//! in insertion order, while lookups ignore ASCII case. Serialization order
//! is the first-insertion order per distinct name, with repeated values of
//! one name kept in their own insertion order; [`HeaderTable::grouped`]
//! yields exactly that view.
//!
//! The table is immutable once built: a [`HeaderTableBuilder`] accumulates
//! entries, `build()` freezes them and constructs the lowercased index
//! (lowercased name to entry positions), so lookups never touch a shared
//! mutable map.

use std::collections::HashMap;

/// One header field as it appeared on the wire or was inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    name: String,
    value: String,
}

impl HeaderEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Immutable ordered multimap of header name to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    entries: Vec<HeaderEntry>,
    index: HashMap<String, Vec<usize>>,
}

impl HeaderTable {
    pub fn builder() -> HeaderTableBuilder {
        HeaderTableBuilder::default()
    }

    /// A table with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// First value for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        let positions = self.index.get(&name.to_ascii_lowercase())?;
        positions.first().map(|&i| self.entries[i].value())
    }

    /// All values for `name` in insertion order, matched case-insensitively.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        match self.index.get(&name.to_ascii_lowercase()) {
            Some(positions) => positions.iter().map(|&i| self.entries[i].value()).collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of entries (not distinct names).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in raw insertion order, original case preserved.
    pub fn entries(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    /// Entries grouped per distinct name: groups follow the first-insertion
    /// order of their name, entries inside a group keep insertion order.
    /// This is the serialization order.
    pub fn grouped(&self) -> Vec<Vec<&HeaderEntry>> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<String, Vec<&HeaderEntry>> = HashMap::new();
        for entry in &self.entries {
            let key = entry.name.to_ascii_lowercase();
            if !groups.contains_key(&key) {
                order.push(entry.name());
            }
            groups.entry(key).or_default().push(entry);
        }
        order
            .iter()
            .map(|name| groups.remove(&name.to_ascii_lowercase()).unwrap_or_default())
            .collect()
    }

    /// The `charset` parameter of the Content-Type header, if any.
    pub fn content_type_charset(&self) -> Option<&str> {
        let content_type = self.get("content-type")?;
        for param in content_type.split(';').skip(1) {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("charset") {
                return Some(value.trim().trim_matches('"'));
            }
        }
        None
    }
}

/// Accumulates entries and freezes them into a [`HeaderTable`].
#[derive(Debug, Default)]
pub struct HeaderTableBuilder {
    entries: Vec<HeaderEntry>,
}

impl HeaderTableBuilder {
    /// Append one entry, keeping duplicates.
    pub fn insert(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(HeaderEntry { name: name.into(), value: value.into() });
        self
    }

    pub fn build(self) -> HeaderTable {
        let mut index: HashMap<String, Vec<usize>> = HashMap::with_capacity(self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            index.entry(entry.name.to_ascii_lowercase()).or_default().push(position);
        }
        HeaderTable { entries: self.entries, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeaderTable {
        HeaderTable::builder()
            .insert("Host", "example.com")
            .insert("Accept", "text/html")
            .insert("Set-Cookie", "a=1")
            .insert("ACCEPT", "application/json")
            .insert("Set-Cookie", "b=2")
            .build()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = sample();
        assert_eq!(table.get("host"), Some("example.com"));
        assert_eq!(table.get("HOST"), Some("example.com"));
        assert_eq!(table.get("x-missing"), None);
        assert!(table.contains("set-cookie"));
    }

    #[test]
    fn get_returns_first_and_get_all_preserves_order() {
        let table = sample();
        assert_eq!(table.get("accept"), Some("text/html"));
        assert_eq!(table.get_all("accept"), vec!["text/html", "application/json"]);
        assert_eq!(table.get_all("set-cookie"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn entries_preserve_original_case() {
        let table = sample();
        let names: Vec<&str> = table.entries().map(HeaderEntry::name).collect();
        assert_eq!(names, vec!["Host", "Accept", "Set-Cookie", "ACCEPT", "Set-Cookie"]);
    }

    #[test]
    fn grouped_follows_first_insertion_order() {
        let table = sample();
        let grouped: Vec<Vec<(&str, &str)>> = table
            .grouped()
            .into_iter()
            .map(|group| group.into_iter().map(|e| (e.name(), e.value())).collect())
            .collect();
        assert_eq!(
            grouped,
            vec![
                vec![("Host", "example.com")],
                vec![("Accept", "text/html"), ("ACCEPT", "application/json")],
                vec![("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")],
            ]
        );
    }

    #[test]
    fn charset_hint_from_content_type() {
        let table = HeaderTable::builder().insert("Content-Type", "text/plain; charset=UTF-8").build();
        assert_eq!(table.content_type_charset(), Some("UTF-8"));

        let table = HeaderTable::builder().insert("Content-Type", "text/plain; CHARSET=\"iso-8859-1\"").build();
        assert_eq!(table.content_type_charset(), Some("iso-8859-1"));

        let table = HeaderTable::builder().insert("Content-Type", "application/octet-stream").build();
        assert_eq!(table.content_type_charset(), None);

        // a parameter without a value does not end the scan
        let table = HeaderTable::builder().insert("Content-Type", "text/plain; flag; charset=utf-8").build();
        assert_eq!(table.content_type_charset(), Some("utf-8"));

        assert_eq!(HeaderTable::empty().content_type_charset(), None);
    }
}
