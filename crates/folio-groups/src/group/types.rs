/// Group data structures.
///
/// A `Group` is an immutable value once published by the registry;
/// every change produces a new `Group` through the transition functions.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Identity;

// ── Constants ────────────────────────────────────────────────────────────

/// Smallest allowed group capacity.
pub const MIN_GROUP_CAPACITY: u8 = 1;

/// Largest allowed group capacity.
pub const MAX_GROUP_CAPACITY: u8 = 10;

/// Label the virtual region renders as when no config is at hand.
pub const DEFAULT_VIRTUAL_REGION_LABEL: &str = "Online";

// ── GroupId ──────────────────────────────────────────────────────────────

/// Unique group identifier (e.g., "grp-<uuid>").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    /// Create a new random group ID.
    pub fn new() -> Self {
        Self(format!("grp-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── MemberRole ───────────────────────────────────────────────────────────

/// Stored role of a member record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberRole {
    /// Group creator. Manages info, requests and members.
    Owner,
    /// Approved member. Uses the board and may leave.
    Member,
}

// ── Member / PendingMember ───────────────────────────────────────────────

/// An admitted member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Identity,
    pub display_name: String,
    pub role: MemberRole,
    pub joined_at: u64,
}

/// A join request awaiting the owner's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMember {
    pub id: Identity,
    pub display_name: String,
    pub applied_at: u64,
    /// Free-form text supplied by the applicant. Never interpreted.
    #[serde(default)]
    pub motivation: Option<String>,
}

// ── Region ───────────────────────────────────────────────────────────────

/// Where the group meets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    /// Meets online.
    Virtual,
    /// Meets at a physical place, e.g. "Seoul Mapo-gu".
    Physical(String),
}

impl Region {
    /// Human-readable label, with `virtual_label` standing in for `Virtual`.
    pub fn label<'a>(&'a self, virtual_label: &'a str) -> &'a str {
        match self {
            Region::Virtual => virtual_label,
            Region::Physical(place) => place,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Region::Virtual)
    }
}

// ── Group ────────────────────────────────────────────────────────────────

/// Full group record, as persisted under its id.
///
/// The member count is always `members.len()`; it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub region: Region,
    pub schedule: String,
    pub capacity: u8,
    pub owner_id: Identity,
    pub members: Vec<Member>,
    pub pending_members: Vec<PendingMember>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub created_at: u64,
}

impl Group {
    /// Check if an identity is an admitted member (owner included).
    pub fn is_member(&self, id: &Identity) -> bool {
        self.members.iter().any(|m| m.id == *id)
    }

    /// Check if an identity has a pending join request.
    pub fn is_pending(&self, id: &Identity) -> bool {
        self.pending_members.iter().any(|p| p.id == *id)
    }

    pub fn get_member(&self, id: &Identity) -> Option<&Member> {
        self.members.iter().find(|m| m.id == *id)
    }

    pub fn get_pending(&self, id: &Identity) -> Option<&PendingMember> {
        self.pending_members.iter().find(|p| p.id == *id)
    }

    /// The OWNER member record.
    pub fn owner(&self) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.role == MemberRole::Owner && m.id == self.owner_id)
    }

    /// Display name of the owner, derived from the owner's member record.
    pub fn owner_name(&self) -> &str {
        self.owner().map(|m| m.display_name.as_str()).unwrap_or("")
    }

    /// Number of current members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether the group is at capacity.
    pub fn is_full(&self) -> bool {
        self.members.len() >= usize::from(self.capacity)
    }

    /// Case-insensitive substring match over name, region label and tags.
    ///
    /// An empty filter matches every group.
    pub fn matches_filter(&self, filter: &str, virtual_label: &str) -> bool {
        let needle = filter.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .region
                .label(virtual_label)
                .to_lowercase()
                .contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    /// Verify the structural invariants of a group record.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let owners: Vec<&Member> = self
            .members
            .iter()
            .filter(|m| m.role == MemberRole::Owner)
            .collect();
        if owners.len() != 1 {
            return Err(format!("expected one owner, found {}", owners.len()));
        }
        if owners[0].id != self.owner_id {
            return Err(format!(
                "owner record {} does not match owner_id {}",
                owners[0].id, self.owner_id
            ));
        }
        if !(MIN_GROUP_CAPACITY..=MAX_GROUP_CAPACITY).contains(&self.capacity) {
            return Err(format!("capacity {} out of range", self.capacity));
        }
        if self.members.len() > usize::from(self.capacity) {
            return Err(format!(
                "{} members exceed capacity {}",
                self.members.len(),
                self.capacity
            ));
        }
        for (i, m) in self.members.iter().enumerate() {
            if self.members[..i].iter().any(|other| other.id == m.id) {
                return Err(format!("duplicate member {}", m.id));
            }
        }
        for (i, p) in self.pending_members.iter().enumerate() {
            if self.pending_members[..i].iter().any(|other| other.id == p.id) {
                return Err(format!("duplicate pending entry {}", p.id));
            }
            if self.is_member(&p.id) {
                return Err(format!("{} is both member and pending", p.id));
            }
        }
        Ok(())
    }
}

// ── GroupSpec / GroupPatch ───────────────────────────────────────────────

/// Input for creating a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub description: String,
    pub region: Region,
    #[serde(default)]
    pub schedule: String,
    pub capacity: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Owner-editable subset of a group. `None` leaves a field unchanged.
///
/// Owner id and roles are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub capacity: Option<u8>,
}

impl GroupPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.schedule.is_none()
            && self.image.is_none()
            && self.capacity.is_none()
    }
}

/// Trim tags, drop blanks and case-insensitive duplicates, keep order.
pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let lowered = tag.to_lowercase();
        if out.iter().any(|t| t.to_lowercase() == lowered) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}
