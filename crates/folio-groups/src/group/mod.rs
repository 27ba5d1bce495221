/// Reading-group membership and access control.
///
/// One owner per group, admitted members, and a queue of pending
/// applicants. Transitions are pure functions over a snapshot; the
/// registry serializes writes per group and the engine wires commits to
/// notifications.
pub mod access;
pub mod engine;
pub mod moderation;
pub mod registry;
pub mod relation;
pub mod transitions;
pub mod types;

pub use access::{
    can_moderate, can_moderate_for, can_post, can_post_for, can_view_board, can_view_board_for,
    Permissions,
};
pub use engine::MembershipEngine;
pub use moderation::{ApplicationStatus, ConsoleView, ModerationConsole};
pub use registry::{GroupListing, GroupRegistry};
pub use relation::{compute_relation, relation_of, Relation};
pub use transitions::Outcome;
pub use types::{
    Group, GroupId, GroupPatch, GroupSpec, Member, MemberRole, PendingMember, Region,
    DEFAULT_VIRTUAL_REGION_LABEL, MAX_GROUP_CAPACITY, MIN_GROUP_CAPACITY,
};
