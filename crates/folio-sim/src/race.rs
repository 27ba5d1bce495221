/// Approval race: many applicants queued on one group, approved from
/// concurrent blocking tasks. Reports how many got in.
use std::sync::Arc;
use std::time::Instant;

use folio_groups::{
    Caller, EngineConfig, GroupError, GroupRegistry, GroupSpec, Identity, MembershipEngine,
    NullEmitter, Region,
};

use crate::events::{self, EventMetrics, EventRace};

pub struct RaceConfig {
    pub capacity: u8,
    pub applicants: usize,
}

pub async fn run(config: &EngineConfig, race: RaceConfig) -> anyhow::Result<bool> {
    let registry = Arc::new(GroupRegistry::new(config.clone()));
    let engine = Arc::new(MembershipEngine::new(registry.clone(), Arc::new(NullEmitter)));
    let owner = Caller::new(Identity::parse("race-owner")?, "Race Owner");
    let spec = GroupSpec {
        name: "Approval Race".into(),
        description: "Concurrent approvals".into(),
        region: Region::Virtual,
        schedule: String::new(),
        capacity: race.capacity,
        tags: vec![],
        image: None,
    };
    let gid = engine.create_group(&owner, &spec)?.id.clone();

    for i in 0..race.applicants {
        let who = Caller::new(Identity::parse(format!("applicant-{i}"))?, format!("Applicant {i}"));
        engine.request_join(&gid, &who, None)?;
    }
    tracing::info!(applicants = race.applicants, capacity = race.capacity, "race armed");

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(race.applicants);
    for i in 0..race.applicants {
        let engine = engine.clone();
        let gid = gid.clone();
        let owner = owner.id.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let applicant = Identity::parse(format!("applicant-{i}"))
                .map_err(|e| GroupError::Validation {
                    reason: e.to_string(),
                })?;
            engine.approve_join(&gid, &owner, &applicant)
        }));
    }

    let (mut approved, mut refused) = (0, 0);
    for task in tasks {
        match task.await? {
            Ok(_) => approved += 1,
            Err(GroupError::CapacityExceeded { .. }) => refused += 1,
            Err(e) => return Err(e.into()),
        }
    }
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let group = registry.get_group(&gid)?;
    events::emit(&EventRace {
        event: "race",
        capacity: race.capacity,
        applicants: race.applicants,
        approved,
        refused,
        members: group.member_count(),
        elapsed_ms,
    });
    events::emit(&EventMetrics::new("race", engine.metrics().snapshot()));

    let expected = (race.capacity as usize - 1).min(race.applicants);
    let ok = approved == expected && group.check_invariants().is_ok();
    if !ok {
        tracing::error!(approved, expected, "capacity bound violated");
    }
    eprintln!(
        "[{}] race: {approved} approved, {refused} refused, {} members / capacity {}",
        if ok { "PASS" } else { "FAIL" },
        group.member_count(),
        group.capacity
    );
    Ok(ok)
}
