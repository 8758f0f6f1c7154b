//! Referral tree resolution over parent-pointer edges.
//!
//! The referral graph is a forest of parent pointers: each user has at
//! most one inbound edge (their referrer). [`find_root`] walks the chain
//! iteratively to the top; [`is_ancestor`] backs the creation-time
//! acyclicity guard. Both take the edge lookup as an injected interface
//! so they can run against any ledger implementation.

use std::collections::HashSet;

use super::UserId;
use crate::error::ServiceError;

/// Read-side access to referral parent pointers.
///
/// Implemented by every ledger store; the resolver only ever needs this
/// one lookup.
pub trait ReferralLookup {
    /// Returns the referrer of `user`, or `None` if no one referred them.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the underlying lookup fails.
    fn referrer_of(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<UserId>, ServiceError>> + Send;
}

/// Resolves the root ancestor of `start`'s referral chain.
///
/// Returns `None` when `start` has no referrer at all; otherwise follows
/// parent pointers to the ancestor with no inbound edge and returns it.
/// The walk is iterative, so chain depth never touches the stack.
///
/// The edge set is acyclic by construction (enforced when edges are
/// created); the visited set turns a corrupted cyclic chain into an error
/// instead of a hang.
///
/// # Errors
///
/// Returns [`ServiceError::ReferralCycle`] if the walk revisits a user,
/// or a store error from the underlying lookup.
pub async fn find_root<L: ReferralLookup>(
    lookup: &L,
    start: UserId,
) -> Result<Option<UserId>, ServiceError> {
    let mut visited = HashSet::from([start]);
    let Some(mut current) = lookup.referrer_of(start).await? else {
        return Ok(None);
    };
    loop {
        if !visited.insert(current) {
            return Err(ServiceError::ReferralCycle(current));
        }
        match lookup.referrer_of(current).await? {
            Some(parent) => current = parent,
            None => return Ok(Some(current)),
        }
    }
}

/// Returns `true` if `ancestor` appears anywhere on `descendant`'s
/// referral chain (a user counts as their own ancestor).
///
/// Used before creating an edge `referrer → referred`: if `referred` is
/// already an ancestor of `referrer`, the new edge would close a cycle.
///
/// # Errors
///
/// Returns [`ServiceError::ReferralCycle`] if the existing chain is
/// already cyclic, or a store error from the underlying lookup.
pub async fn is_ancestor<L: ReferralLookup>(
    lookup: &L,
    ancestor: UserId,
    descendant: UserId,
) -> Result<bool, ServiceError> {
    if ancestor == descendant {
        return Ok(true);
    }
    let mut visited = HashSet::from([descendant]);
    let mut current = descendant;
    while let Some(parent) = lookup.referrer_of(current).await? {
        if parent == ancestor {
            return Ok(true);
        }
        if !visited.insert(parent) {
            return Err(ServiceError::ReferralCycle(parent));
        }
        current = parent;
    }
    Ok(false)
}
