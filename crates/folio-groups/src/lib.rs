//! Folio reading groups.
//!
//! Membership and access control for small reading groups: an owner
//! creates a group, readers apply, the owner admits or rejects them, and
//! the board is open to admitted members only.
//!
//! Storage: in-memory or SQLite (MessagePack rows).
//! Notifications: fire-and-forget through a `NotificationEmitter`.

pub mod board;
pub mod config;
pub mod error;
pub mod events;
pub mod group;
pub mod identity;
pub mod metrics;
pub mod store;
pub mod types;

pub use board::{AttachedBook, Comment, GroupBoard, Post, PostDraft, PostId, PostSummary};
pub use config::{ConfigError, EngineConfig};
pub use error::GroupError;
pub use events::{
    ChannelEmitter, EmitError, EventKind, FanoutEmitter, GroupEvent, NotificationEmitter,
    NullEmitter,
};
pub use group::{
    can_moderate, can_moderate_for, can_post, can_post_for, can_view_board, can_view_board_for,
    compute_relation, relation_of, ApplicationStatus, ConsoleView, Group, GroupId, GroupListing,
    GroupPatch, GroupRegistry, GroupSpec, Member, MemberRole, MembershipEngine, ModerationConsole,
    Outcome, PendingMember, Permissions, Region, Relation, DEFAULT_VIRTUAL_REGION_LABEL,
    MAX_GROUP_CAPACITY, MIN_GROUP_CAPACITY,
};
pub use identity::{IdentityProvider, StaticIdentity};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use store::{GroupStore, MemoryStore, SqliteStore, StoreError};
pub use types::{now_ms, Caller, Identity, InvalidIdentity};
