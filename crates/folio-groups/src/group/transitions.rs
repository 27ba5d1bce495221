/// Membership state machine: pure transitions over a group snapshot.
///
/// Each function takes the current `Group` by reference and returns
/// either a brand-new `Group` plus the events to emit, or an error. The
/// input is never touched, so a failed transition leaves nothing behind.
///
/// Per (group, identity):
///
/// ```text
/// GUEST --request_join--> APPLIED --approve_join--> MEMBER
///                            |                        |
///                       reject_join        leave_group / kick_member
///                            v                        v
///                          GUEST                    GUEST
/// OWNER: no outgoing transition
/// ```
use crate::config::EngineConfig;
use crate::error::GroupError;
use crate::events::{EventKind, GroupEvent};
use crate::group::relation::{compute_relation, Relation};
use crate::group::types::*;
use crate::types::{Caller, Identity};

/// Result of a successful transition.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub group: Group,
    pub events: Vec<GroupEvent>,
}

impl Outcome {
    fn quiet(group: Group) -> Self {
        Self {
            group,
            events: Vec::new(),
        }
    }
}

fn check_capacity_range(capacity: u8) -> Result<(), GroupError> {
    if !(MIN_GROUP_CAPACITY..=MAX_GROUP_CAPACITY).contains(&capacity) {
        return Err(GroupError::validation(format!(
            "capacity must be between {MIN_GROUP_CAPACITY} and {MAX_GROUP_CAPACITY}, got {capacity}"
        )));
    }
    Ok(())
}

fn non_blank(field: &str, value: &str) -> Result<String, GroupError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GroupError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn require_owner(group: &Group, actor: &Identity, action: &str) -> Result<(), GroupError> {
    if compute_relation(group, actor) != Relation::Owner {
        return Err(GroupError::permission(format!("only the owner can {action}")));
    }
    Ok(())
}

fn event(
    group: &Group,
    kind: EventKind,
    recipient: &Identity,
    subject: &Identity,
    message: String,
    now: u64,
) -> GroupEvent {
    GroupEvent {
        kind,
        group_id: group.id.clone(),
        recipient: recipient.clone(),
        subject: subject.clone(),
        message,
        at: now,
    }
}

// ── Creation ─────────────────────────────────────────────────────────────

/// Build a new group with `creator` installed as its sole OWNER member.
pub fn create(
    creator: &Caller,
    spec: &GroupSpec,
    config: &EngineConfig,
    now: u64,
) -> Result<Group, GroupError> {
    let name = non_blank("name", &spec.name)?;
    let description = non_blank("description", &spec.description)?;
    check_capacity_range(spec.capacity)?;

    let region = match &spec.region {
        Region::Virtual => Region::Virtual,
        Region::Physical(place) => Region::Physical(non_blank("region", place)?),
    };

    let schedule = match spec.schedule.trim() {
        "" => config.default_schedule.clone(),
        s => s.to_string(),
    };

    let owner = Member {
        id: creator.id.clone(),
        display_name: creator.display_name.clone(),
        role: MemberRole::Owner,
        joined_at: now,
    };

    Ok(Group {
        id: GroupId::new(),
        name,
        description,
        region,
        schedule,
        capacity: spec.capacity,
        owner_id: creator.id.clone(),
        members: vec![owner],
        pending_members: Vec::new(),
        tags: normalize_tags(&spec.tags),
        image: spec.image.clone().filter(|s| !s.trim().is_empty()),
        created_at: now,
    })
}

// ── Join requests ────────────────────────────────────────────────────────

/// Record a join request from `applicant`.
///
/// The capacity check here only fails fast; `approve_join` repeats it.
pub fn request_join(
    group: &Group,
    applicant: &Caller,
    motivation: Option<String>,
    now: u64,
) -> Result<Outcome, GroupError> {
    if group.is_member(&applicant.id) {
        return Err(GroupError::DuplicateMembership);
    }
    if group.is_pending(&applicant.id) {
        return Err(GroupError::DuplicateApplication);
    }
    if group.is_full() {
        return Err(GroupError::CapacityExceeded {
            capacity: group.capacity,
        });
    }

    let mut next = group.clone();
    next.pending_members.push(PendingMember {
        id: applicant.id.clone(),
        display_name: applicant.display_name.clone(),
        applied_at: now,
        motivation,
    });

    let ev = event(
        group,
        EventKind::JoinRequested,
        &group.owner_id,
        &applicant.id,
        format!("{} asked to join '{}'", applicant.display_name, group.name),
        now,
    );
    Ok(Outcome {
        group: next,
        events: vec![ev],
    })
}

/// Admit a pending applicant as MEMBER.
pub fn approve_join(
    group: &Group,
    actor: &Identity,
    pending_id: &Identity,
    now: u64,
) -> Result<Outcome, GroupError> {
    require_owner(group, actor, "approve join requests")?;
    let Some(pos) = group.pending_members.iter().position(|p| p.id == *pending_id) else {
        return Err(GroupError::not_found(format!("join request from {pending_id}")));
    };
    // Other approvals may have filled the group since the request.
    if group.is_full() {
        return Err(GroupError::CapacityExceeded {
            capacity: group.capacity,
        });
    }

    let mut next = group.clone();
    let pending = next.pending_members.remove(pos);
    next.members.push(Member {
        id: pending.id.clone(),
        display_name: pending.display_name,
        role: MemberRole::Member,
        joined_at: now,
    });

    let ev = event(
        group,
        EventKind::JoinApproved,
        &pending.id,
        &pending.id,
        format!("Your request to join '{}' was approved", group.name),
        now,
    );
    Ok(Outcome {
        group: next,
        events: vec![ev],
    })
}

/// Discard a pending request without admitting anyone.
pub fn reject_join(
    group: &Group,
    actor: &Identity,
    pending_id: &Identity,
    now: u64,
) -> Result<Outcome, GroupError> {
    require_owner(group, actor, "reject join requests")?;
    let Some(pos) = group.pending_members.iter().position(|p| p.id == *pending_id) else {
        return Err(GroupError::not_found(format!("join request from {pending_id}")));
    };

    let mut next = group.clone();
    let pending = next.pending_members.remove(pos);

    let ev = event(
        group,
        EventKind::JoinRejected,
        &pending.id,
        &pending.id,
        format!("Your request to join '{}' was declined", group.name),
        now,
    );
    Ok(Outcome {
        group: next,
        events: vec![ev],
    })
}

// ── Departures ───────────────────────────────────────────────────────────

/// Voluntary departure of a non-owner member. Emits nothing.
pub fn leave_group(group: &Group, identity: &Identity) -> Result<Outcome, GroupError> {
    if *identity == group.owner_id {
        return Err(GroupError::permission(
            "the owner cannot leave; ownership transfer is not supported",
        ));
    }
    if !group.is_member(identity) {
        return Err(GroupError::not_found(format!("member {identity}")));
    }

    let mut next = group.clone();
    next.members.retain(|m| m.id != *identity);
    Ok(Outcome::quiet(next))
}

/// Owner removes a member. The owner itself can never be removed.
pub fn kick_member(
    group: &Group,
    actor: &Identity,
    target: &Identity,
    now: u64,
) -> Result<Outcome, GroupError> {
    require_owner(group, actor, "remove members")?;
    if *target == group.owner_id {
        return Err(GroupError::permission("the owner cannot be removed"));
    }
    if !group.is_member(target) {
        return Err(GroupError::not_found(format!("member {target}")));
    }

    let mut next = group.clone();
    next.members.retain(|m| m.id != *target);

    let ev = event(
        group,
        EventKind::MemberKicked,
        target,
        target,
        format!("You were removed from '{}'", group.name),
        now,
    );
    Ok(Outcome {
        group: next,
        events: vec![ev],
    })
}

// ── Editing ──────────────────────────────────────────────────────────────

/// Apply an owner's edit to name, description, schedule, image, capacity.
///
/// A blank schedule resets to the configured default; a blank image
/// keeps the current one.
pub fn edit_group_info(
    group: &Group,
    actor: &Identity,
    patch: &GroupPatch,
    config: &EngineConfig,
) -> Result<Outcome, GroupError> {
    require_owner(group, actor, "edit group info")?;

    let mut next = group.clone();
    if let Some(name) = &patch.name {
        next.name = non_blank("name", name)?;
    }
    if let Some(description) = &patch.description {
        next.description = non_blank("description", description)?;
    }
    if let Some(schedule) = &patch.schedule {
        next.schedule = match schedule.trim() {
            "" => config.default_schedule.clone(),
            s => s.to_string(),
        };
    }
    if let Some(image) = patch.image.as_deref().map(str::trim) {
        if !image.is_empty() {
            next.image = Some(image.to_string());
        }
    }
    if let Some(capacity) = patch.capacity {
        check_capacity_range(capacity)?;
        if usize::from(capacity) < group.member_count() {
            return Err(GroupError::validation(format!(
                "capacity {capacity} is below the current {} members",
                group.member_count()
            )));
        }
        next.capacity = capacity;
    }
    Ok(Outcome::quiet(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::parse(s).unwrap()
    }

    fn caller(s: &str) -> Caller {
        Caller::new(id(s), s.to_uppercase())
    }

    fn spec(capacity: u8) -> GroupSpec {
        GroupSpec {
            name: "Saturday Classics".into(),
            description: "Reading the canon, slowly".into(),
            region: Region::Physical("Busan".into()),
            schedule: String::new(),
            capacity,
            tags: vec!["classics".into()],
            image: None,
        }
    }

    fn make_group(capacity: u8) -> Group {
        create(&caller("owner"), &spec(capacity), &EngineConfig::default(), 1000).unwrap()
    }

    fn with_member(group: Group, who: &str) -> Group {
        let applied = request_join(&group, &caller(who), None, 1).unwrap().group;
        approve_join(&applied, &id("owner"), &id(who), 2).unwrap().group
    }

    // ── create ──────────────────────────────────────────────────────

    #[test]
    fn create_installs_owner() {
        let group = make_group(4);
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].role, MemberRole::Owner);
        assert_eq!(group.owner_id, id("owner"));
        assert!(group.pending_members.is_empty());
        assert_eq!(group.schedule, "Schedule TBD");
        assert_eq!(group.owner_name(), "OWNER");
        assert_eq!(group.check_invariants(), Ok(()));
    }

    #[test]
    fn create_validates_input() {
        let config = EngineConfig::default();
        let owner = caller("owner");

        let mut blank_name = spec(3);
        blank_name.name = "  ".into();
        assert!(matches!(
            create(&owner, &blank_name, &config, 1),
            Err(GroupError::Validation { .. })
        ));

        let mut blank_desc = spec(3);
        blank_desc.description = String::new();
        assert!(matches!(
            create(&owner, &blank_desc, &config, 1),
            Err(GroupError::Validation { .. })
        ));

        for capacity in [0, 11, 255] {
            assert!(matches!(
                create(&owner, &spec(capacity), &config, 1),
                Err(GroupError::Validation { .. })
            ));
        }
        for capacity in [1, 10] {
            assert!(create(&owner, &spec(capacity), &config, 1).is_ok());
        }

        let mut blank_region = spec(3);
        blank_region.region = Region::Physical(" ".into());
        assert!(matches!(
            create(&owner, &blank_region, &config, 1),
            Err(GroupError::Validation { .. })
        ));
    }

    #[test]
    fn create_keeps_virtual_region_and_schedule() {
        let mut online = spec(3);
        online.region = Region::Virtual;
        online.schedule = "Every other Tuesday".into();
        let group = create(&caller("owner"), &online, &EngineConfig::default(), 1).unwrap();
        assert!(group.region.is_virtual());
        assert_eq!(group.schedule, "Every other Tuesday");
    }

    // ── request_join ────────────────────────────────────────────────

    #[test]
    fn request_join_appends_pending_and_notifies_owner() {
        let group = make_group(3);
        let out = request_join(&group, &caller("alice"), Some("love Austen".into()), 5).unwrap();
        assert_eq!(out.group.pending_members.len(), 1);
        assert_eq!(out.group.pending_members[0].motivation.as_deref(), Some("love Austen"));
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].kind, EventKind::JoinRequested);
        assert_eq!(out.events[0].recipient, id("owner"));
        assert_eq!(out.events[0].subject, id("alice"));
        // Input untouched.
        assert!(group.pending_members.is_empty());
    }

    #[test]
    fn request_join_twice_is_duplicate_application() {
        let group = make_group(3);
        let once = request_join(&group, &caller("alice"), None, 5).unwrap().group;
        let err = request_join(&once, &caller("alice"), None, 6).unwrap_err();
        assert!(matches!(err, GroupError::DuplicateApplication));
        assert_eq!(once.pending_members.len(), 1);
    }

    #[test]
    fn request_join_by_member_is_duplicate_membership() {
        let group = with_member(make_group(3), "alice");
        assert!(matches!(
            request_join(&group, &caller("alice"), None, 9),
            Err(GroupError::DuplicateMembership)
        ));
        assert!(matches!(
            request_join(&group, &caller("owner"), None, 9),
            Err(GroupError::DuplicateMembership)
        ));
    }

    #[test]
    fn request_join_full_group_fails_fast() {
        let group = make_group(1);
        assert!(matches!(
            request_join(&group, &caller("alice"), None, 9),
            Err(GroupError::CapacityExceeded { capacity: 1 })
        ));
    }

    // ── approve / reject ────────────────────────────────────────────

    #[test]
    fn approve_moves_pending_to_members() {
        let group = make_group(3);
        let applied = request_join(&group, &caller("alice"), None, 5).unwrap().group;
        let out = approve_join(&applied, &id("owner"), &id("alice"), 7).unwrap();
        let alice = out.group.get_member(&id("alice")).unwrap();
        assert_eq!(alice.role, MemberRole::Member);
        assert_eq!(alice.joined_at, 7);
        assert_eq!(alice.display_name, "ALICE");
        assert!(out.group.pending_members.is_empty());
        assert_eq!(out.events[0].kind, EventKind::JoinApproved);
        assert_eq!(out.events[0].recipient, id("alice"));
    }

    #[test]
    fn approve_requires_owner() {
        let group = with_member(make_group(4), "mina");
        let applied = request_join(&group, &caller("alice"), None, 5).unwrap().group;
        for actor in ["mina", "alice", "stranger"] {
            assert!(matches!(
                approve_join(&applied, &id(actor), &id("alice"), 6),
                Err(GroupError::Permission { .. })
            ));
        }
    }

    #[test]
    fn approve_unknown_request_is_not_found() {
        let group = make_group(3);
        assert!(matches!(
            approve_join(&group, &id("owner"), &id("ghost"), 6),
            Err(GroupError::NotFound { .. })
        ));
    }

    #[test]
    fn approve_rechecks_capacity() {
        let group = make_group(2);
        let a = request_join(&group, &caller("alice"), None, 1).unwrap().group;
        let ab = request_join(&a, &caller("bob"), None, 2).unwrap().group;
        let full = approve_join(&ab, &id("owner"), &id("alice"), 3).unwrap().group;
        let err = approve_join(&full, &id("owner"), &id("bob"), 4).unwrap_err();
        assert!(matches!(err, GroupError::CapacityExceeded { capacity: 2 }));
        assert!(full.is_pending(&id("bob")));
    }

    #[test]
    fn reject_discards_request() {
        let group = make_group(3);
        let applied = request_join(&group, &caller("alice"), None, 5).unwrap().group;
        let out = reject_join(&applied, &id("owner"), &id("alice"), 6).unwrap();
        assert!(out.group.pending_members.is_empty());
        assert_eq!(out.group.members.len(), 1);
        assert_eq!(out.events[0].kind, EventKind::JoinRejected);

        assert!(matches!(
            reject_join(&out.group, &id("owner"), &id("alice"), 7),
            Err(GroupError::NotFound { .. })
        ));
        assert!(matches!(
            reject_join(&applied, &id("alice"), &id("alice"), 7),
            Err(GroupError::Permission { .. })
        ));
    }

    // ── leave / kick ────────────────────────────────────────────────

    #[test]
    fn leave_removes_member_silently() {
        let group = with_member(make_group(3), "alice");
        let out = leave_group(&group, &id("alice")).unwrap();
        assert!(!out.group.is_member(&id("alice")));
        assert!(out.events.is_empty());
    }

    #[test]
    fn owner_cannot_leave() {
        let group = make_group(3);
        assert!(matches!(
            leave_group(&group, &id("owner")),
            Err(GroupError::Permission { .. })
        ));
    }

    #[test]
    fn leave_by_non_member_is_not_found() {
        let group = make_group(3);
        let applied = request_join(&group, &caller("alice"), None, 1).unwrap().group;
        assert!(matches!(
            leave_group(&applied, &id("alice")),
            Err(GroupError::NotFound { .. })
        ));
    }

    #[test]
    fn kick_removes_member_and_notifies() {
        let group = with_member(make_group(3), "alice");
        let out = kick_member(&group, &id("owner"), &id("alice"), 9).unwrap();
        assert!(!out.group.is_member(&id("alice")));
        assert_eq!(out.events[0].kind, EventKind::MemberKicked);
        assert_eq!(out.events[0].recipient, id("alice"));
    }

    #[test]
    fn kick_owner_is_forbidden() {
        let group = with_member(make_group(3), "alice");
        assert!(matches!(
            kick_member(&group, &id("owner"), &id("owner"), 9),
            Err(GroupError::Permission { .. })
        ));
        assert!(matches!(
            kick_member(&group, &id("alice"), &id("owner"), 9),
            Err(GroupError::Permission { .. })
        ));
    }

    #[test]
    fn kick_checks_actor_and_target() {
        let group = with_member(with_member(make_group(4), "alice"), "bob");
        assert!(matches!(
            kick_member(&group, &id("alice"), &id("bob"), 9),
            Err(GroupError::Permission { .. })
        ));
        assert!(matches!(
            kick_member(&group, &id("owner"), &id("ghost"), 9),
            Err(GroupError::NotFound { .. })
        ));
    }

    // ── edit ────────────────────────────────────────────────────────

    #[test]
    fn edit_updates_allowed_fields() {
        let group = make_group(3);
        let patch = GroupPatch {
            name: Some("Sunday Classics".into()),
            description: Some("Moved to Sundays".into()),
            schedule: Some("Sundays 3pm".into()),
            image: Some("https://img.example/cover.png".into()),
            capacity: Some(6),
        };
        let out = edit_group_info(&group, &id("owner"), &patch, &EngineConfig::default()).unwrap();
        assert_eq!(out.group.name, "Sunday Classics");
        assert_eq!(out.group.description, "Moved to Sundays");
        assert_eq!(out.group.schedule, "Sundays 3pm");
        assert_eq!(out.group.image.as_deref(), Some("https://img.example/cover.png"));
        assert_eq!(out.group.capacity, 6);
        assert_eq!(out.group.owner_id, group.owner_id);
    }

    #[test]
    fn edit_blank_schedule_and_image() {
        let mut group = make_group(3);
        group.image = Some("old.png".into());
        group.schedule = "Mondays".into();
        let patch = GroupPatch {
            schedule: Some(" ".into()),
            image: Some(String::new()),
            ..Default::default()
        };
        let out = edit_group_info(&group, &id("owner"), &patch, &EngineConfig::default()).unwrap();
        assert_eq!(out.group.schedule, "Schedule TBD");
        assert_eq!(out.group.image.as_deref(), Some("old.png"));
    }

    #[test]
    fn edit_rejects_capacity_below_member_count() {
        let group = with_member(with_member(make_group(3), "alice"), "bob");
        let patch = GroupPatch {
            capacity: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            edit_group_info(&group, &id("owner"), &patch, &EngineConfig::default()),
            Err(GroupError::Validation { .. })
        ));
        let exact = GroupPatch {
            capacity: Some(3),
            ..Default::default()
        };
        assert!(edit_group_info(&group, &id("owner"), &exact, &EngineConfig::default()).is_ok());
    }

    #[test]
    fn edit_rejects_bad_input_and_non_owner() {
        let group = with_member(make_group(3), "alice");
        let config = EngineConfig::default();
        let too_big = GroupPatch {
            capacity: Some(11),
            ..Default::default()
        };
        assert!(matches!(
            edit_group_info(&group, &id("owner"), &too_big, &config),
            Err(GroupError::Validation { .. })
        ));
        let blank_name = GroupPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            edit_group_info(&group, &id("owner"), &blank_name, &config),
            Err(GroupError::Validation { .. })
        ));
        assert!(matches!(
            edit_group_info(&group, &id("alice"), &GroupPatch::default(), &config),
            Err(GroupError::Permission { .. })
        ));
    }
}
