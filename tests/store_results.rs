// tests/store_results.rs
//
// Per-day result tables: fill-once upserts, key shapes, pattern upkeep.
//
use std::sync::Arc;

use chrono::NaiveDate;
use vf_scrape::data::{KeyShape, MatchKey, MatchRecord, Outcome, TeamPair};
use vf_scrape::store::{ResultStore, RetryPolicy, UpsertOutcome};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn store(dir: &tempfile::TempDir, shape: KeyShape) -> ResultStore {
    ResultStore::open(dir.path(), shape, RetryPolicy::immediate(3)).unwrap()
}

fn rec(comp: &str, minutes: u32, outcome: Option<Outcome>) -> MatchRecord {
    MatchRecord::new(day(), comp, minutes, None, outcome)
}

#[tokio::test]
async fn first_outcome_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, KeyShape::Slot);

    assert_eq!(store.upsert(day(), rec("Euro Cup", 570, Some(Outcome::Sim))).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert(day(), rec("Euro Cup", 570, Some(Outcome::Sim))).await.unwrap(), UpsertOutcome::KeptExisting);
    assert_eq!(store.upsert(day(), rec("Euro Cup", 570, None)).await.unwrap(), UpsertOutcome::KeptExisting);
    assert_eq!(store.upsert(day(), rec("Euro Cup", 570, Some(Outcome::Nao))).await.unwrap(), UpsertOutcome::KeptExisting);

    let rows = store.read_all(day()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].outcome, Some(Outcome::Sim));
}

#[tokio::test]
async fn empty_row_is_filled_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, KeyShape::Slot);

    assert_eq!(store.upsert(day(), rec("Euro Cup", 600, None)).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert(day(), rec("Euro Cup", 600, None)).await.unwrap(), UpsertOutcome::NoOp);
    let key = MatchKey::new("Euro Cup", 600, None);
    assert!(!store.exists_with_outcome(day(), &key).await.unwrap());

    assert_eq!(store.upsert(day(), rec("Euro Cup", 600, Some(Outcome::Nao))).await.unwrap(), UpsertOutcome::FilledEmpty);
    assert!(store.exists_with_outcome(day(), &key).await.unwrap());
    assert_eq!(store.read_all(day()).await.unwrap()[0].outcome, Some(Outcome::Nao));
}

#[tokio::test]
async fn slot_and_teams_shape_keeps_same_slot_matches_apart() {
    let dir = tempfile::tempdir().unwrap();
    let teams_store = store(&dir, KeyShape::SlotAndTeams);
    let a = MatchRecord::new(day(), "Copa do Mundo", 570, Some(TeamPair::new("Brasil", "França")), Some(Outcome::Sim));
    let b = MatchRecord::new(day(), "Copa do Mundo", 570, Some(TeamPair::new("Itália", "Alemanha")), Some(Outcome::Nao));

    assert_eq!(teams_store.upsert(day(), a.clone()).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(teams_store.upsert(day(), b.clone()).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(teams_store.read_all(day()).await.unwrap().len(), 2);

    let other = tempfile::tempdir().unwrap();
    let slot_store = store(&other, KeyShape::Slot);
    slot_store.upsert(day(), a).await.unwrap();
    assert_eq!(slot_store.upsert(day(), b).await.unwrap(), UpsertOutcome::KeptExisting);

    let text = std::fs::read_to_string(teams_store.path_for(day())).unwrap();
    assert!(text.contains(",Teams,"));
    assert!(text.contains("Brasil x França"));
}

#[tokio::test]
async fn patterns_follow_every_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, KeyShape::Slot);
    use Outcome::{Nao, Sim};
    // inserted out of order on purpose
    let seq = [(9, Sim), (0, Sim), (6, Sim), (3, Nao)];
    for (m, o) in seq {
        store.upsert(day(), rec("Euro Cup", 540 + m, Some(o))).await.unwrap();
    }

    let rows = store.read_all(day()).await.unwrap();
    let minutes: Vec<u32> = rows.iter().map(|r| r.minutes()).collect();
    assert_eq!(minutes, vec![540, 543, 546, 549]);
    // 1x at 09:06 compares with 09:00, at 09:09 with 09:03
    assert_eq!(rows[2].patterns[0], Some(Sim));
    assert_eq!(rows[3].patterns[0], Some(Nao));
    assert_eq!(rows[1].patterns[0], None);
    // 2x at 09:09 compares with 09:00
    assert_eq!(rows[3].patterns[1], Some(Sim));
}

#[tokio::test]
async fn recompute_repairs_a_hand_edited_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, KeyShape::Slot);
    let text = "Data,Competição,Hora,Minuto,Ambos Marcam\n\
                01/03/2026,Euro Cup,9,0,Sim\n\
                01/03/2026,Euro Cup,9,3,Não\n\
                01/03/2026,Euro Cup,9,6,Sim\n";
    std::fs::write(store.path_for(day()), text).unwrap();

    assert_eq!(store.recompute(day()).await.unwrap(), 3);
    let rows = store.read_all(day()).await.unwrap();
    assert_eq!(rows[2].patterns[0], Some(Outcome::Sim));

    let rewritten = std::fs::read_to_string(store.path_for(day())).unwrap();
    assert!(rewritten.starts_with("\u{feff}Date,Competition,Hour,Minute,Outcome,5x,4x,3x,2x,1x"));

    let empty_day = day().succ_opt().unwrap();
    assert_eq!(store.recompute(empty_day).await.unwrap(), 0);
    assert!(!store.path_for(empty_day).exists());
}

#[tokio::test]
async fn collected_slots_and_latest_are_per_competition() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, KeyShape::Slot);
    store.upsert(day(), rec("Euro Cup", 570, Some(Outcome::Sim))).await.unwrap();
    store.upsert(day(), rec("Euro Cup", 600, None)).await.unwrap();
    store.upsert(day(), rec("Premier League", 700, Some(Outcome::Nao))).await.unwrap();

    let slots = store.collected_slots(day(), "Euro Cup").await.unwrap();
    assert_eq!(slots.len(), 1);
    assert!(slots.contains(&MatchKey::new("Euro Cup", 570, None)));
    assert_eq!(store.latest_collected(day(), "Euro Cup").await.unwrap(), Some(570));
    assert_eq!(store.latest_collected(day(), "Sul Americano").await.unwrap(), None);
}

#[tokio::test]
async fn list_days_is_newest_first_and_ignores_strangers() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir, KeyShape::Slot);
    let d1 = day();
    let d2 = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
    let d3 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    for d in [d1, d2, d3] {
        store.upsert(d, MatchRecord::new(d, "Euro Cup", 60, None, Some(Outcome::Sim))).await.unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
    std::fs::write(dir.path().join("matches_latest.csv"), "x").unwrap();

    assert_eq!(store.list_days().await.unwrap(), vec![d3, d1, d2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_lose_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store(&dir, KeyShape::Slot));
    let competitions = ["Euro Cup", "Premier League", "Sul Americano", "Copa do Mundo"];

    let mut handles = Vec::new();
    for comp in competitions {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for i in 0..15u32 {
                let outcome = if i % 2 == 0 { Outcome::Sim } else { Outcome::Nao };
                store.upsert(day(), rec(comp, 540 + 3 * i, Some(outcome))).await.unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let rows = store.read_all(day()).await.unwrap();
    assert_eq!(rows.len(), competitions.len() * 15);
    for comp in competitions {
        assert_eq!(rows.iter().filter(|r| r.competition == comp).count(), 15);
    }
}
