/// Built-in membership scenarios, run against a fresh in-memory engine
/// each. Notifications are drained by a background task and reported as
/// JSONL.
use std::sync::Arc;
use std::time::Instant;

use folio_groups::{
    can_post, can_view_board, Caller, ChannelEmitter, EngineConfig, EngineMetrics, GroupBoard,
    GroupError, GroupPatch, GroupRegistry, GroupSpec, Identity, MembershipEngine,
    ModerationConsole, PostDraft, Region,
};
use tokio::task::JoinHandle;

use crate::events::{self, EventMetrics, EventNotification};
use crate::scenario_common::{ensure, expect_err, ScenarioResult};

pub struct Harness {
    pub engine: Arc<MembershipEngine>,
    pub registry: Arc<GroupRegistry>,
    pub metrics: Arc<EngineMetrics>,
    drain: JoinHandle<usize>,
}

impl Harness {
    pub fn new(config: &EngineConfig) -> Self {
        let (emitter, mut rx) = ChannelEmitter::new(config.event_buffer);
        let registry = Arc::new(GroupRegistry::new(config.clone()));
        let metrics = Arc::new(EngineMetrics::new());
        let engine = Arc::new(MembershipEngine::with_metrics(
            registry.clone(),
            Arc::new(emitter),
            metrics.clone(),
        ));
        let drain = tokio::spawn(async move {
            let mut delivered = 0;
            while let Some(ev) = rx.recv().await {
                delivered += 1;
                events::emit(&EventNotification {
                    event: "notification",
                    kind: format!("{:?}", ev.kind),
                    group: ev.group_id.to_string(),
                    recipient: ev.recipient.to_string(),
                    message: ev.message,
                });
            }
            delivered
        });
        Self {
            engine,
            registry,
            metrics,
            drain,
        }
    }

    /// Report counters, drop the engine and wait for every queued
    /// notification.
    pub async fn finish(self, scenario: &str) -> anyhow::Result<usize> {
        events::emit(&EventMetrics::new(scenario, self.metrics.snapshot()));
        drop(self.engine);
        drop(self.registry);
        Ok(self.drain.await?)
    }
}

fn person(name: &str) -> anyhow::Result<Caller> {
    Ok(Caller::new(Identity::parse(name.to_lowercase())?, name))
}

fn spec(name: &str, capacity: u8) -> GroupSpec {
    GroupSpec {
        name: name.into(),
        description: format!("{name} simulation"),
        region: Region::Physical("Seoul Mapo-gu".into()),
        schedule: "Thursdays 20:00".into(),
        capacity,
        tags: vec!["fiction".into()],
        image: None,
    }
}

fn ids<'a>(it: impl Iterator<Item = &'a Identity>) -> String {
    it.map(Identity::as_str).collect::<Vec<_>>().join(",")
}

pub async fn run(config: &EngineConfig) -> anyhow::Result<Vec<ScenarioResult>> {
    Ok(vec![
        capacity_at_approval(config).await?,
        access_gating(config).await?,
        owner_protection(config).await?,
        capacity_shrink(config).await?,
        board_walkthrough(config).await?,
    ])
}

async fn capacity_at_approval(config: &EngineConfig) -> anyhow::Result<ScenarioResult> {
    let mut result = ScenarioResult::new("capacity-at-approval");
    let start = Instant::now();
    let h = Harness::new(config);
    let (o, a, b) = (person("Owner")?, person("Ana")?, person("Bo")?);
    let gid = h.engine.create_group(&o, &spec("Capacity", 2))?.id.clone();

    result.step("a and b apply", || {
        h.engine.request_join(&gid, &a, None).map_err(|e| e.to_string())?;
        let g = h.engine.request_join(&gid, &b, None).map_err(|e| e.to_string())?;
        Ok(format!("pending=[{}]", ids(g.pending_members.iter().map(|p| &p.id))))
    });
    result.step("approve a", || {
        let g = h.engine.approve_join(&gid, &o.id, &a.id).map_err(|e| e.to_string())?;
        Ok(format!("members=[{}]", ids(g.members.iter().map(|m| &m.id))))
    });
    result.step("approve b refused", || {
        expect_err(
            h.engine.approve_join(&gid, &o.id, &b.id),
            |e| matches!(e, GroupError::CapacityExceeded { .. }),
            "approve b",
        )
    });
    result.step("state unchanged", || {
        let g = h.registry.get_group(&gid).map_err(|e| e.to_string())?;
        ensure(g.member_count() == 2, "member count changed")?;
        ensure(g.is_pending(&b.id), "b no longer pending")?;
        Ok(String::new())
    });

    h.finish(&result.scenario).await?;
    result.finalize(start);
    Ok(result)
}

async fn access_gating(config: &EngineConfig) -> anyhow::Result<ScenarioResult> {
    let mut result = ScenarioResult::new("access-gating");
    let start = Instant::now();
    let h = Harness::new(config);
    let (o, c) = (person("Owner")?, person("Chae")?);
    let gid = h.engine.create_group(&o, &spec("Gating", 4))?.id.clone();

    result.step("guest cannot post", || {
        let g = h.registry.get_group(&gid).map_err(|e| e.to_string())?;
        ensure(!can_post(&g, &c.id), "guest could post")?;
        Ok(String::new())
    });
    result.step("applicant cannot post", || {
        let g = h
            .engine
            .request_join(&gid, &c, Some("I love essays".into()))
            .map_err(|e| e.to_string())?;
        ensure(!can_post(&g, &c.id), "applicant could post")?;
        ensure(!can_view_board(&g, &c.id), "applicant could read")?;
        Ok(String::new())
    });
    result.step("member can post", || {
        let g = h.engine.approve_join(&gid, &o.id, &c.id).map_err(|e| e.to_string())?;
        ensure(can_post(&g, &c.id), "member could not post")?;
        Ok(String::new())
    });

    h.finish(&result.scenario).await?;
    result.finalize(start);
    Ok(result)
}

async fn owner_protection(config: &EngineConfig) -> anyhow::Result<ScenarioResult> {
    let mut result = ScenarioResult::new("owner-protection");
    let start = Instant::now();
    let h = Harness::new(config);
    let (o, a) = (person("Owner")?, person("Ana")?);
    let gid = h.engine.create_group(&o, &spec("Protection", 4))?.id.clone();
    h.engine.request_join(&gid, &a, None)?;
    h.engine.approve_join(&gid, &o.id, &a.id)?;
    let console = ModerationConsole::new(h.engine.clone());
    let before = h.registry.get_group(&gid)?;

    result.step("owner self-kick refused", || {
        expect_err(
            h.engine.kick_member(&gid, &o.id, &o.id),
            |e| matches!(e, GroupError::Permission { .. }),
            "self-kick",
        )
    });
    result.step("owner leave refused", || {
        expect_err(
            h.engine.leave_group(&gid, &o.id),
            |e| matches!(e, GroupError::Permission { .. }),
            "owner leave",
        )
    });
    result.step("member moderation refused", || {
        expect_err(
            console.kick(&gid, &a.id, &o.id),
            |e| matches!(e, GroupError::Permission { .. }),
            "member kick",
        )
    });
    result.step("state unchanged", || {
        let g = h.registry.get_group(&gid).map_err(|e| e.to_string())?;
        ensure(*g == *before, "group changed")?;
        Ok(String::new())
    });

    drop(console);
    h.finish(&result.scenario).await?;
    result.finalize(start);
    Ok(result)
}

async fn capacity_shrink(config: &EngineConfig) -> anyhow::Result<ScenarioResult> {
    let mut result = ScenarioResult::new("capacity-shrink");
    let start = Instant::now();
    let h = Harness::new(config);
    let o = person("Owner")?;
    let gid = h.engine.create_group(&o, &spec("Shrink", 5))?.id.clone();
    for name in ["Ana", "Bo"] {
        let who = person(name)?;
        h.engine.request_join(&gid, &who, None)?;
        h.engine.approve_join(&gid, &o.id, &who.id)?;
    }

    result.step("shrink below members refused", || {
        let patch = GroupPatch {
            capacity: Some(2),
            ..Default::default()
        };
        expect_err(
            h.engine.edit_group_info(&gid, &o.id, &patch),
            |e| matches!(e, GroupError::Validation { .. }),
            "shrink to 2",
        )
    });
    result.step("shrink to member count", || {
        let patch = GroupPatch {
            capacity: Some(3),
            ..Default::default()
        };
        let g = h.engine.edit_group_info(&gid, &o.id, &patch).map_err(|e| e.to_string())?;
        ensure(g.capacity == 3, "capacity not applied")?;
        Ok(format!("capacity={}", g.capacity))
    });

    h.finish(&result.scenario).await?;
    result.finalize(start);
    Ok(result)
}

async fn board_walkthrough(config: &EngineConfig) -> anyhow::Result<ScenarioResult> {
    let mut result = ScenarioResult::new("board-walkthrough");
    let start = Instant::now();
    let h = Harness::new(config);
    let board = GroupBoard::new(h.registry.clone());
    let (o, a) = (person("Owner")?, person("Ana")?);
    let gid = h.engine.create_group(&o, &spec("Board", 4))?.id.clone();
    h.engine.request_join(&gid, &a, None)?;
    h.engine.approve_join(&gid, &o.id, &a.id)?;

    let mut post_id = None;
    result.step("member writes post", || {
        let post = board
            .write_post(
                &gid,
                &a,
                PostDraft {
                    title: "Chapter one".into(),
                    content: "What did everyone think of the opening?".into(),
                    ..Default::default()
                },
            )
            .map_err(|e| e.to_string())?;
        post_id = Some(post.id.clone());
        Ok(post.id.to_string())
    });
    result.step("owner comments", || {
        let id = post_id.as_ref().ok_or("no post")?;
        let post = board
            .add_comment(&gid, &o, id, "Loved the first line.")
            .map_err(|e| e.to_string())?;
        Ok(format!("comments={}", post.comments.len()))
    });
    result.step("kicked member loses board", || {
        h.engine.kick_member(&gid, &o.id, &a.id).map_err(|e| e.to_string())?;
        expect_err(
            board.posts(&gid, &a.id),
            |e| matches!(e, GroupError::Permission { .. }),
            "read after kick",
        )
    });
    result.step("post kept", || {
        let posts = board.posts(&gid, &o.id).map_err(|e| e.to_string())?;
        ensure(posts.len() == 1, "post removed")?;
        Ok(String::new())
    });

    drop(board);
    h.finish(&result.scenario).await?;
    result.finalize(start);
    Ok(result)
}
