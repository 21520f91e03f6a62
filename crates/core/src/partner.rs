//! Partner identities and network groups.

use std::fmt;

/// A balance source within a network group.
///
/// Identity is the name; the token is the credential handed to the
/// partner's adapter and never shows up in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Partner {
    name: String,
    token: String,
}

impl Partner {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partner")
            .field("name", &self.name)
            .field("token", &"***")
            .finish()
    }
}

/// Active partners of one network, ordered by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkGroup {
    name: String,
    partners: Vec<Partner>,
}

impl NetworkGroup {
    /// Create a group. Partners are sorted by name and duplicates by name
    /// are dropped, keeping the first occurrence.
    pub fn new(name: impl Into<String>, partners: Vec<Partner>) -> Self {
        let mut partners = partners;
        partners.sort_by(|a, b| a.name.cmp(&b.name));
        partners.dedup_by(|a, b| a.name == b.name);
        Self {
            name: name.into(),
            partners,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn partners(&self) -> &[Partner] {
        &self.partners
    }

    pub fn partner(&self, name: &str) -> Option<&Partner> {
        self.partners.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    /// Subset of this group keeping only partners accepted by `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&Partner) -> bool) -> Self {
        Self {
            name: self.name.clone(),
            partners: self.partners.iter().filter(|p| keep(p)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_debug_hides_token() {
        let partner = Partner::new("Partner1", "secret-token");
        let debug = format!("{:?}", partner);
        assert!(debug.contains("Partner1"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_group_sorted_and_deduplicated() {
        let group = NetworkGroup::new(
            "adrich",
            vec![
                Partner::new("Zeta", "z"),
                Partner::new("Alpha", "a"),
                Partner::new("Alpha", "other"),
            ],
        );
        let names: Vec<&str> = group.partners().iter().map(Partner::name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(group.partner("Alpha").unwrap().token(), "a");
    }

    #[test]
    fn test_group_retain() {
        let group = NetworkGroup::new(
            "adrich",
            vec![Partner::new("A", "1"), Partner::new("B", "2")],
        );
        let subset = group.retain(|p| p.name() == "B");
        assert_eq!(subset.name(), "adrich");
        assert_eq!(subset.len(), 1);
        assert!(subset.partner("A").is_none());
    }
}
