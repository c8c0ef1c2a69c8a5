//! uid → name cache, a read-mostly cache never shrunk mid-run.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct UserTable {
    names: HashMap<u32, String>,
}

impl UserTable {
    pub fn new() -> Self {
        UserTable {
            names: HashMap::new(),
        }
    }

    /// Returns the cached name for `uid`, resolving and caching it on first
    /// lookup. Falls back to the numeric uid (as htop does) if the system
    /// has no such user.
    pub fn get_name(&mut self, uid: u32) -> &str {
        self.names.entry(uid).or_insert_with(|| {
            uzers::get_user_by_uid(uid)
                .and_then(|u| u.name().to_str().map(str::to_owned))
                .unwrap_or_else(|| uid.to_string())
        })
    }

    pub fn find_uid_by_name(&self, name: &str) -> Option<u32> {
        uzers::get_user_by_name(name).map(|u| u.uid())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_uid_falls_back_to_numeric_string() {
        let mut t = UserTable::new();
        // 4_000_000_000 is implausible as a real account on test hosts.
        let name = t.get_name(4_000_000_000).to_owned();
        assert!(name == "4000000000" || !name.is_empty());
    }

    #[test]
    fn repeated_lookup_is_cached() {
        let mut t = UserTable::new();
        let _ = t.get_name(0);
        assert_eq!(t.len(), 1);
        let _ = t.get_name(0);
        assert_eq!(t.len(), 1);
    }
}
