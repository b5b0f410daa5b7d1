use std::collections::BTreeMap;

/// Name to expansion mapping consulted before dispatch.
///
/// Keys are never empty and never contain whitespace; [`AliasTable::insert`]
/// refuses such names. Iteration is ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an alias. Returns `false` (and changes nothing)
    /// when `name` is not a valid alias name.
    pub fn insert(&mut self, name: impl Into<String>, expansion: impl Into<String>) -> bool {
        let name = name.into();
        if !is_valid_name(&name) {
            return false;
        }
        self.entries.insert(name, expansion.into());
        true
    }

    /// Remove an alias, returning its expansion if it existed.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_existing_entry() {
        let mut table = AliasTable::new();
        assert!(table.insert("ll", "ls -l"));
        assert!(table.insert("ll", "ls -la"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("ll"), Some("ls -la"));
    }

    #[test]
    fn rejects_empty_and_whitespace_names() {
        let mut table = AliasTable::new();
        assert!(!table.insert("", "ls"));
        assert!(!table.insert("l l", "ls"));
        assert!(table.is_empty());
    }

    #[test]
    fn lookup_is_by_exact_key() {
        let mut table = AliasTable::new();
        table.insert("ll", "ls -l");
        assert!(table.contains("ll"));
        assert!(!table.contains("l"));
        assert!(!table.contains("LL"));
        assert_eq!(table.remove("ll").as_deref(), Some("ls -l"));
        assert_eq!(table.remove("ll"), None);
    }

    #[test]
    fn iterates_in_name_order() {
        let mut table = AliasTable::new();
        table.insert("zz", "pwd");
        table.insert("aa", "cd");
        let names: Vec<_> = table.names().collect();
        assert_eq!(names, vec!["aa", "zz"]);
    }
}
