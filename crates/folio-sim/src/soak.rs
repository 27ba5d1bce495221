/// Random operation soak: seeded random membership calls over several
/// groups, checking group invariants after every call.
use std::sync::Arc;
use std::time::Instant;

use folio_groups::{
    Caller, EngineConfig, GroupId, GroupPatch, GroupRegistry, GroupSpec, Identity,
    MembershipEngine, NullEmitter, Region, MAX_GROUP_CAPACITY,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::events::{self, EventMetrics, EventSoak};

pub struct SoakConfig {
    pub seed: u64,
    pub groups: usize,
    pub readers: usize,
    pub ops: usize,
}

fn reader(i: usize) -> anyhow::Result<Caller> {
    Ok(Caller::new(Identity::parse(format!("reader-{i}"))?, format!("Reader {i}")))
}

pub fn run(config: &EngineConfig, soak: SoakConfig) -> anyhow::Result<bool> {
    let mut rng = StdRng::seed_from_u64(soak.seed);
    let registry = Arc::new(GroupRegistry::new(config.clone()));
    let engine = MembershipEngine::new(registry.clone(), Arc::new(NullEmitter));

    let mut groups: Vec<(GroupId, Identity)> = Vec::with_capacity(soak.groups);
    for g in 0..soak.groups {
        let owner = Caller::new(Identity::parse(format!("owner-{g}"))?, format!("Owner {g}"));
        let spec = GroupSpec {
            name: format!("Soak Group {g}"),
            description: "Randomised membership traffic".into(),
            region: if rng.random_bool(0.5) {
                Region::Virtual
            } else {
                Region::Physical(format!("District {g}"))
            },
            schedule: String::new(),
            capacity: rng.random_range(2..=MAX_GROUP_CAPACITY),
            tags: vec![],
            image: None,
        };
        let group = engine.create_group(&owner, &spec)?;
        groups.push((group.id.clone(), owner.id));
    }

    let start = Instant::now();
    let (mut accepted, mut refused, mut violations) = (0, 0, 0);
    for _ in 0..soak.ops {
        let (gid, owner) = &groups[rng.random_range(0..groups.len())];
        let who = reader(rng.random_range(0..soak.readers))?;
        // Owner acts most of the time; sometimes a reader tries to moderate.
        let actor = if rng.random_bool(0.85) {
            owner.clone()
        } else {
            who.id.clone()
        };

        let result = match rng.random_range(0..6) {
            0 | 1 => engine.request_join(gid, &who, None),
            2 => engine.approve_join(gid, &actor, &who.id),
            3 => engine.reject_join(gid, &actor, &who.id),
            4 => {
                if rng.random_bool(0.5) {
                    engine.leave_group(gid, &who.id)
                } else {
                    engine.kick_member(gid, &actor, &who.id)
                }
            }
            _ => engine.edit_group_info(
                gid,
                &actor,
                &GroupPatch {
                    capacity: Some(rng.random_range(0..=MAX_GROUP_CAPACITY + 1)),
                    ..Default::default()
                },
            ),
        };
        match result {
            Ok(_) => accepted += 1,
            Err(e) if e.is_workflow() => refused += 1,
            Err(e) => return Err(e.into()),
        }

        let snapshot = registry.get_group(gid)?;
        if let Err(violation) = snapshot.check_invariants() {
            violations += 1;
            tracing::error!(group = %gid, "invariant violated: {violation}");
        }
    }

    events::emit(&EventSoak {
        event: "soak",
        seed: soak.seed,
        groups: soak.groups,
        ops: soak.ops,
        accepted,
        refused,
        violations,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    });
    events::emit(&EventMetrics::new("soak", engine.metrics().snapshot()));

    let ok = violations == 0;
    eprintln!(
        "[{}] soak: {} ops, {accepted} accepted, {refused} refused, {violations} violations",
        if ok { "PASS" } else { "FAIL" },
        soak.ops
    );
    Ok(ok)
}
