/// Persistence round trip: run a short lifecycle against a SQLite file,
/// reopen it, and check the reloaded groups match what was committed.
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use folio_groups::{
    Caller, EngineConfig, GroupPatch, GroupRegistry, GroupSpec, GroupStore, Identity,
    MembershipEngine, NullEmitter, Region, SqliteStore,
};

use crate::scenario_common::{ensure, ScenarioResult};

fn open(path: &Path, config: &EngineConfig) -> anyhow::Result<MembershipEngine> {
    let store: Arc<dyn GroupStore> = Arc::new(SqliteStore::open(path)?);
    let registry = Arc::new(GroupRegistry::open(store, config.clone())?);
    Ok(MembershipEngine::new(registry, Arc::new(NullEmitter)))
}

pub fn run(db: &Path, config: &EngineConfig) -> anyhow::Result<ScenarioResult> {
    let mut result = ScenarioResult::new("sqlite-persistence");
    let start = Instant::now();

    let owner = Caller::new(Identity::parse("persist-owner")?, "Persist Owner");
    let reader = Caller::new(Identity::parse("persist-reader")?, "Persist Reader");
    let applicant = Caller::new(Identity::parse("persist-applicant")?, "Persist Applicant");

    let committed = {
        let engine = open(db, config)?;
        tracing::info!(db = %db.display(), existing = engine.registry().len(), "store opened");
        let spec = GroupSpec {
            name: "Durable Readers".into(),
            description: "Survives restarts".into(),
            region: Region::Physical("Gwangju".into()),
            schedule: String::new(),
            capacity: 4,
            tags: vec!["history".into()],
            image: None,
        };
        let gid = engine.create_group(&owner, &spec)?.id.clone();
        engine.request_join(&gid, &reader, Some("Long-time lurker".into()))?;
        engine.approve_join(&gid, &owner.id, &reader.id)?;
        engine.request_join(&gid, &applicant, None)?;
        engine.edit_group_info(
            &gid,
            &owner.id,
            &GroupPatch {
                description: Some("Survives restarts, and then some".into()),
                ..Default::default()
            },
        )?
    };

    let engine = open(db, config)?;
    result.step("group reloaded", || {
        let reloaded = engine
            .registry()
            .get_group(&committed.id)
            .map_err(|e| e.to_string())?;
        ensure(*reloaded == *committed, "reloaded group differs")?;
        Ok(format!("{} groups in store", engine.registry().len()))
    });
    result.step("membership intact", || {
        let g = engine
            .registry()
            .get_group(&committed.id)
            .map_err(|e| e.to_string())?;
        ensure(g.is_member(&reader.id), "reader lost membership")?;
        ensure(g.is_pending(&applicant.id), "application lost")?;
        ensure(g.schedule == config.default_schedule, "default schedule not kept")?;
        Ok(String::new())
    });
    result.step("writes after reopen", || {
        let g = engine
            .approve_join(&committed.id, &owner.id, &applicant.id)
            .map_err(|e| e.to_string())?;
        Ok(format!("members={}", g.member_count()))
    });

    result.finalize(start);
    Ok(result)
}
