/// ModerationConsole: owner-facing management surface.
///
/// Covers the three management tabs: group info, member list and join
/// requests. Every mutating call re-derives the actor's relation from the
/// latest snapshot before delegating, and the engine checks again inside
/// the group's critical section, so a stale "I am the owner" view on the
/// caller side can never authorize anything.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GroupError;
use crate::group::engine::MembershipEngine;
use crate::group::relation::{compute_relation, Relation};
use crate::group::types::*;
use crate::types::Identity;

/// Where an identity stands with respect to joining a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    NotApplied,
    Pending,
    Admitted,
}

/// Owner's view of a group: current info plus the request queue.
#[derive(Debug, Clone)]
pub struct ConsoleView {
    pub group: Arc<Group>,
    pub pending: Vec<PendingMember>,
}

pub struct ModerationConsole {
    engine: Arc<MembershipEngine>,
}

impl ModerationConsole {
    pub fn new(engine: Arc<MembershipEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<MembershipEngine> {
        &self.engine
    }

    fn ensure_owner(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        action: &str,
    ) -> Result<Arc<Group>, GroupError> {
        let group = self.engine.registry().get_group(group_id)?;
        if compute_relation(&group, actor) != Relation::Owner {
            tracing::debug!(group = %group_id, actor = %actor, action, "moderation refused");
            self.engine.metrics().operations_refused.inc();
            return Err(GroupError::permission(format!("only the owner can {action}")));
        }
        Ok(group)
    }

    // ── Read side ────────────────────────────────────────────────────

    /// Member roster in join order. Visible to everyone.
    pub fn members(&self, group_id: &GroupId) -> Result<Vec<Member>, GroupError> {
        Ok(self.engine.registry().get_group(group_id)?.members.clone())
    }

    /// Pending join requests with their motivation text. Owner only.
    pub fn pending_requests(
        &self,
        group_id: &GroupId,
        actor: &Identity,
    ) -> Result<Vec<PendingMember>, GroupError> {
        let group = self.ensure_owner(group_id, actor, "view join requests")?;
        Ok(group.pending_members.clone())
    }

    /// Info and request queue from a single snapshot. Owner only.
    pub fn overview(
        &self,
        group_id: &GroupId,
        actor: &Identity,
    ) -> Result<ConsoleView, GroupError> {
        let group = self.ensure_owner(group_id, actor, "open the management console")?;
        let pending = group.pending_members.clone();
        Ok(ConsoleView { group, pending })
    }

    /// An identity's own application status.
    pub fn application_status(
        &self,
        group_id: &GroupId,
        identity: &Identity,
    ) -> Result<ApplicationStatus, GroupError> {
        let group = self.engine.registry().get_group(group_id)?;
        Ok(if group.is_member(identity) {
            ApplicationStatus::Admitted
        } else if group.is_pending(identity) {
            ApplicationStatus::Pending
        } else {
            ApplicationStatus::NotApplied
        })
    }

    // ── Write side ───────────────────────────────────────────────────

    pub fn edit_info(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        patch: &GroupPatch,
    ) -> Result<Arc<Group>, GroupError> {
        self.ensure_owner(group_id, actor, "edit group info")?;
        self.engine.edit_group_info(group_id, actor, patch)
    }

    pub fn approve(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        pending_id: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.ensure_owner(group_id, actor, "approve join requests")?;
        self.engine.approve_join(group_id, actor, pending_id)
    }

    pub fn reject(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        pending_id: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.ensure_owner(group_id, actor, "reject join requests")?;
        self.engine.reject_join(group_id, actor, pending_id)
    }

    pub fn kick(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        target: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.ensure_owner(group_id, actor, "remove members")?;
        self.engine.kick_member(group_id, actor, target)
    }
}
