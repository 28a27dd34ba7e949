use std::collections::BTreeSet;

use super::domain::CommunityId;
use super::validation::ValidationError;

/// Routing table of communities that own a record table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityDirectory {
    default: CommunityId,
    known: BTreeSet<CommunityId>,
}

impl CommunityDirectory {
    /// The default community is always part of the directory.
    pub fn new(default: CommunityId, others: impl IntoIterator<Item = CommunityId>) -> Self {
        let mut known: BTreeSet<CommunityId> = others.into_iter().collect();
        known.insert(default.clone());
        Self { default, known }
    }

    pub fn single(default: CommunityId) -> Self {
        Self::new(default, [])
    }

    pub fn default_community(&self) -> &CommunityId {
        &self.default
    }

    pub fn communities(&self) -> impl Iterator<Item = &CommunityId> {
        self.known.iter()
    }

    /// Blank or missing values select the default community.
    pub fn resolve(&self, requested: Option<&str>) -> Result<CommunityId, ValidationError> {
        let requested = match requested.map(str::trim) {
            Some(value) if !value.is_empty() => CommunityId::new(value),
            _ => return Ok(self.default.clone()),
        };

        if self.known.contains(&requested) {
            Ok(requested)
        } else {
            Err(ValidationError::UnknownCommunity(requested.0))
        }
    }
}
