/// AccessGate: view/post/moderate predicates derived from [`Relation`].
///
/// Pure and side-effect free. Callers pass the snapshot they are about
/// to act on; nothing here is cached across membership changes.
use serde::{Deserialize, Serialize};

use crate::group::relation::{compute_relation, relation_of, Relation};
use crate::group::types::Group;
use crate::identity::IdentityProvider;
use crate::types::Identity;

/// Members and the owner can read the group board.
pub fn can_view_board(group: &Group, identity: &Identity) -> bool {
    compute_relation(group, identity) != Relation::Guest
}

/// Members and the owner can write to the group board.
pub fn can_post(group: &Group, identity: &Identity) -> bool {
    compute_relation(group, identity) != Relation::Guest
}

/// Only the owner moderates.
pub fn can_moderate(group: &Group, identity: &Identity) -> bool {
    compute_relation(group, identity) == Relation::Owner
}

/// [`can_view_board`] for whoever the provider says is calling.
/// Anonymous visitors are guests.
pub fn can_view_board_for(provider: &dyn IdentityProvider, group: &Group) -> bool {
    Permissions::for_caller(provider, group).view_board
}

pub fn can_post_for(provider: &dyn IdentityProvider, group: &Group) -> bool {
    Permissions::for_caller(provider, group).post
}

pub fn can_moderate_for(provider: &dyn IdentityProvider, group: &Group) -> bool {
    Permissions::for_caller(provider, group).moderate
}

/// All three permissions for one visitor, computed from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub relation: Relation,
    pub view_board: bool,
    pub post: bool,
    pub moderate: bool,
}

impl Permissions {
    /// Permissions of a possibly anonymous visitor.
    pub fn of(group: &Group, identity: Option<&Identity>) -> Self {
        let relation = relation_of(group, identity);
        Self {
            relation,
            view_board: relation != Relation::Guest,
            post: relation != Relation::Guest,
            moderate: relation == Relation::Owner,
        }
    }

    /// Permissions of whoever the provider says is calling.
    pub fn for_caller(provider: &dyn IdentityProvider, group: &Group) -> Self {
        let caller = provider.current_caller();
        Self::of(group, caller.as_ref().map(|c| &c.id))
    }
}
