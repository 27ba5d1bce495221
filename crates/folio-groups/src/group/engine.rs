/// MembershipEngine: runs membership transitions against the registry.
///
/// Each call fetches the latest snapshot inside the group's critical
/// section, applies one pure transition, commits, and only then hands the
/// resulting events to the notification emitter.
use std::sync::Arc;

use crate::error::GroupError;
use crate::events::{GroupEvent, NotificationEmitter};
use crate::group::registry::GroupRegistry;
use crate::group::relation::{compute_relation, Relation};
use crate::group::transitions::{self, Outcome};
use crate::group::types::*;
use crate::metrics::{Counter, EngineMetrics};
use crate::types::{now_ms, Caller, Identity};

pub struct MembershipEngine {
    registry: Arc<GroupRegistry>,
    emitter: Arc<dyn NotificationEmitter>,
    metrics: Arc<EngineMetrics>,
}

impl MembershipEngine {
    pub fn new(registry: Arc<GroupRegistry>, emitter: Arc<dyn NotificationEmitter>) -> Self {
        Self::with_metrics(registry, emitter, Arc::new(EngineMetrics::new()))
    }

    pub fn with_metrics(
        registry: Arc<GroupRegistry>,
        emitter: Arc<dyn NotificationEmitter>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            emitter,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    // ── Creation / queries ───────────────────────────────────────────

    /// Create a group through the registry and count it.
    pub fn create_group(
        &self,
        requester: &Caller,
        spec: &GroupSpec,
    ) -> Result<Arc<Group>, GroupError> {
        let group = self.registry.create_group(requester, spec)?;
        self.metrics.groups_created.inc();
        Ok(group)
    }

    /// Relation of `identity` to the current snapshot of the group.
    pub fn compute_relation(
        &self,
        group_id: &GroupId,
        identity: &Identity,
    ) -> Result<Relation, GroupError> {
        let group = self.registry.get_group(group_id)?;
        Ok(compute_relation(&group, identity))
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub fn request_join(
        &self,
        group_id: &GroupId,
        applicant: &Caller,
        motivation: Option<String>,
    ) -> Result<Arc<Group>, GroupError> {
        self.commit("request_join", group_id, |m| &m.joins_requested, |g| {
            transitions::request_join(g, applicant, motivation, now_ms())
        })
    }

    pub fn approve_join(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        pending_id: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.commit("approve_join", group_id, |m| &m.joins_approved, |g| {
            transitions::approve_join(g, actor, pending_id, now_ms())
        })
    }

    pub fn reject_join(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        pending_id: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.commit("reject_join", group_id, |m| &m.joins_rejected, |g| {
            transitions::reject_join(g, actor, pending_id, now_ms())
        })
    }

    pub fn leave_group(
        &self,
        group_id: &GroupId,
        identity: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.commit("leave_group", group_id, |m| &m.members_left, |g| {
            transitions::leave_group(g, identity)
        })
    }

    pub fn kick_member(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        target: &Identity,
    ) -> Result<Arc<Group>, GroupError> {
        self.commit("kick_member", group_id, |m| &m.members_kicked, |g| {
            transitions::kick_member(g, actor, target, now_ms())
        })
    }

    pub fn edit_group_info(
        &self,
        group_id: &GroupId,
        actor: &Identity,
        patch: &GroupPatch,
    ) -> Result<Arc<Group>, GroupError> {
        let config = self.registry.config();
        self.commit("edit_group_info", group_id, |m| &m.groups_edited, |g| {
            transitions::edit_group_info(g, actor, patch, config)
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn commit(
        &self,
        op: &'static str,
        group_id: &GroupId,
        counter: fn(&EngineMetrics) -> &Counter,
        transition: impl FnOnce(&Group) -> Result<Outcome, GroupError>,
    ) -> Result<Arc<Group>, GroupError> {
        let result = self
            .registry
            .update(group_id, |g| transition(g).map(|o| (o.group, o.events)));

        match result {
            Ok((group, events)) => {
                counter(&self.metrics).inc();
                tracing::debug!(
                    op,
                    group = %group_id,
                    events = events.len(),
                    "membership change committed"
                );
                self.dispatch(events);
                Ok(group)
            }
            Err(e) if e.is_workflow() => {
                self.metrics.operations_refused.inc();
                tracing::debug!(op, group = %group_id, "refused: {e}");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(op, group = %group_id, "commit failed: {e}");
                Err(e)
            }
        }
    }

    /// Hand events to the emitter. The change is already committed, so a
    /// delivery failure is only logged.
    fn dispatch(&self, events: Vec<GroupEvent>) {
        for event in events {
            let kind = event.kind;
            if let Err(e) = self.emitter.emit(event) {
                self.metrics.notifications_dropped.inc();
                tracing::warn!(?kind, "notification dropped: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::events::mock::RecordingEmitter;
    use crate::events::EventKind;

    fn id(s: &str) -> Identity {
        Identity::parse(s).unwrap()
    }

    fn caller(s: &str) -> Caller {
        Caller::new(id(s), s)
    }

    fn setup(capacity: u8) -> (MembershipEngine, Arc<RecordingEmitter>, GroupId) {
        let registry = Arc::new(GroupRegistry::new(EngineConfig::default()));
        let emitter = Arc::new(RecordingEmitter::new());
        let engine = MembershipEngine::new(registry, emitter.clone());
        let spec = GroupSpec {
            name: "Hanok Readers".into(),
            description: "Essays and tea".into(),
            region: Region::Physical("Jeonju".into()),
            schedule: "Saturdays".into(),
            capacity,
            tags: vec![],
            image: None,
        };
        let group = engine.create_group(&caller("owner"), &spec).unwrap();
        (engine, emitter, group.id.clone())
    }

    #[test]
    fn lifecycle_emits_events_in_order() {
        let (engine, emitter, gid) = setup(3);
        engine.request_join(&gid, &caller("alice"), Some("hi".into())).unwrap();
        engine.approve_join(&gid, &id("owner"), &id("alice")).unwrap();
        engine.request_join(&gid, &caller("bob"), None).unwrap();
        engine.reject_join(&gid, &id("owner"), &id("bob")).unwrap();
        engine.kick_member(&gid, &id("owner"), &id("alice")).unwrap();

        assert_eq!(
            emitter.kinds(),
            vec![
                EventKind::JoinRequested,
                EventKind::JoinApproved,
                EventKind::JoinRequested,
                EventKind::JoinRejected,
                EventKind::MemberKicked,
            ]
        );
        let snap = engine.metrics().snapshot();
        assert_eq!(snap.joins_requested, 2);
        assert_eq!(snap.joins_approved, 1);
        assert_eq!(snap.joins_rejected, 1);
        assert_eq!(snap.members_kicked, 1);
        assert_eq!(snap.groups_created, 1);
    }

    #[test]
    fn relation_follows_commits() {
        let (engine, _, gid) = setup(3);
        assert_eq!(engine.compute_relation(&gid, &id("alice")).unwrap(), Relation::Guest);
        engine.request_join(&gid, &caller("alice"), None).unwrap();
        assert_eq!(engine.compute_relation(&gid, &id("alice")).unwrap(), Relation::Guest);
        engine.approve_join(&gid, &id("owner"), &id("alice")).unwrap();
        assert_eq!(engine.compute_relation(&gid, &id("alice")).unwrap(), Relation::Member);
        engine.leave_group(&gid, &id("alice")).unwrap();
        assert_eq!(engine.compute_relation(&gid, &id("alice")).unwrap(), Relation::Guest);
    }

    #[test]
    fn refused_operation_changes_nothing() {
        let (engine, emitter, gid) = setup(3);
        let before = engine.registry().get_group(&gid).unwrap();
        assert!(matches!(
            engine.kick_member(&gid, &id("owner"), &id("owner")),
            Err(GroupError::Permission { .. })
        ));
        assert_eq!(*engine.registry().get_group(&gid).unwrap(), *before);
        assert!(emitter.events().is_empty());
        assert_eq!(engine.metrics().snapshot().operations_refused, 1);
    }

    #[test]
    fn emitter_failure_does_not_roll_back() {
        let (engine, emitter, gid) = setup(3);
        emitter.set_fail(true);
        let group = engine.request_join(&gid, &caller("alice"), None).unwrap();
        assert!(group.is_pending(&id("alice")));
        assert!(engine.registry().get_group(&gid).unwrap().is_pending(&id("alice")));
        assert_eq!(engine.metrics().snapshot().notifications_dropped, 1);
    }

    #[test]
    fn unknown_group_is_not_found() {
        let (engine, _, _) = setup(3);
        let missing = GroupId::from("grp-nope");
        assert!(matches!(
            engine.request_join(&missing, &caller("alice"), None),
            Err(GroupError::NotFound { .. })
        ));
        assert!(matches!(
            engine.compute_relation(&missing, &id("alice")),
            Err(GroupError::NotFound { .. })
        ));
    }

    #[test]
    fn edit_uses_registry_config() {
        let (engine, _, gid) = setup(3);
        let patch = GroupPatch {
            schedule: Some(String::new()),
            ..Default::default()
        };
        let group = engine.edit_group_info(&gid, &id("owner"), &patch).unwrap();
        assert_eq!(group.schedule, engine.registry().config().default_schedule);
    }
}
