use std::collections::HashSet;

use tracing::trace;

use crate::VerifiedChains;

/// Set of subject common names an acceptor admits
///
/// Giving an acceptor no allow-list at all disables the check. An empty allow-list rejects
/// every peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    /// Create an empty allow-list
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit peers whose verified leaf has `common_name` as subject CN
    ///
    /// Returns false if the name was already present.
    pub fn insert(&mut self, common_name: impl Into<String>) -> bool {
        self.names.insert(common_name.into())
    }

    /// True if `common_name` is admitted
    pub fn contains(&self, common_name: &str) -> bool {
        self.names.contains(common_name)
    }

    /// Number of admitted names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if no name is admitted
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Admit the peer if the leaf of at least one verified chain carries an allowed CN
    pub(crate) fn check(&self, chains: &VerifiedChains) -> Result<(), Rejection> {
        if chains.is_empty() {
            return Err(Rejection::NoVerifiedChains);
        }

        for chain in chains {
            match chain.leaf_common_name() {
                Some(name) if self.contains(&name) => {
                    trace!(common_name = %name, "verified leaf is allow-listed");
                    return Ok(());
                }
                Some(name) => trace!(common_name = %name, "verified leaf is not allow-listed"),
                None => trace!("verified leaf has no common name"),
            }
        }

        Err(Rejection::NoAllowedLeaf)
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for AllowList {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.names.extend(iter.into_iter().map(Into::into))
    }
}

/// Apply an optional allow-list; no list admits everyone
pub(crate) fn authorize(
    allow_list: Option<&AllowList>,
    chains: &VerifiedChains,
) -> Result<(), Rejection> {
    match allow_list {
        None => Ok(()),
        Some(list) => list.check(chains),
    }
}

/// Reason an allow-list refused a peer
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum Rejection {
    #[error("peer had zero verified chains")]
    NoVerifiedChains,
    #[error("no verified chain has a leaf certificate with an allow-listed subject CN")]
    NoAllowedLeaf,
}
