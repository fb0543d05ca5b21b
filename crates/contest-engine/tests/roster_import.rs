use chrono::{TimeZone, Utc};
use contest_engine::contests::leaderboard::{
    ContentItem, ContentItemId, EngagementMetrics, Entrant, EntrantId, SubmissionStore,
    SubmissionStoreError,
};
use contest_engine::contests::roster::{RosterImporter, RosterSummary};
use contest_engine::contests::ContestId;
use std::sync::Mutex;

fn contest() -> ContestId {
    ContestId("summer-shorts".to_string())
}

#[derive(Default)]
struct SeedState {
    entrants: Vec<Entrant>,
    items: Vec<ContentItem>,
}

#[derive(Default)]
struct SeedStore {
    inner: Mutex<SeedState>,
}

impl SubmissionStore for SeedStore {
    fn upsert_entrant(
        &self,
        _contest_id: &ContestId,
        entrant: Entrant,
    ) -> Result<(), SubmissionStoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if let Some(existing) = state.entrants.iter_mut().find(|e| e.id == entrant.id) {
            *existing = entrant;
        } else {
            state.entrants.push(entrant);
        }
        Ok(())
    }

    fn record_item(
        &self,
        _contest_id: &ContestId,
        item: ContentItem,
    ) -> Result<(), SubmissionStoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if state.items.iter().any(|existing| existing.id == item.id) {
            return Err(SubmissionStoreError::Conflict);
        }
        state.items.push(item);
        Ok(())
    }

    fn update_metrics(
        &self,
        _contest_id: &ContestId,
        item_id: &ContentItemId,
        metrics: EngagementMetrics,
    ) -> Result<(), SubmissionStoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let item = state
            .items
            .iter_mut()
            .find(|item| &item.id == item_id)
            .ok_or(SubmissionStoreError::NotFound)?;
        item.metrics = metrics;
        Ok(())
    }

    fn entrant(
        &self,
        _contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Option<Entrant>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .entrants
            .iter()
            .find(|entrant| &entrant.id == entrant_id)
            .cloned())
    }

    fn entrants(&self, _contest_id: &ContestId) -> Result<Vec<Entrant>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.entrants.clone())
    }

    fn items(&self, _contest_id: &ContestId) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.items.clone())
    }

    fn items_for(
        &self,
        _contest_id: &ContestId,
        entrant_id: &EntrantId,
    ) -> Result<Vec<ContentItem>, SubmissionStoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .items
            .iter()
            .filter(|item| &item.entrant_id == entrant_id)
            .cloned()
            .collect())
    }
}

#[test]
fn importer_seeds_entrants_and_items() {
    let csv = "Entrant ID,Display Name,Handle,Item ID,Submitted At,Duration Secs,Views,Likes,Comments,Shares\n\
neon-loop,Nia Okafor,@neonloop,clip-1,2026-07-02T14:05:00Z,57,238400,19100,2210,940\n\
static-bloom,,,clip-2,2026-07-07,55,38900,2700,305,129\n\
neon-loop,Nia Okafor,@neonloop,clip-3,2026-07-09T09:41:00Z,61,154200,12400,1380,610\n";

    let store = SeedStore::default();
    let summary = RosterImporter::from_reader(csv.as_bytes(), &store, &contest())
        .expect("import succeeds");

    assert_eq!(summary, RosterSummary { entrants: 2, items: 3 });

    let anonymous = store
        .entrant(&contest(), &EntrantId("static-bloom".to_string()))
        .expect("entrant readable")
        .expect("entrant recorded");
    assert_eq!(anonymous.display_name, "static-bloom");
    assert_eq!(anonymous.handle, "@static-bloom");

    let items = store.items(&contest()).expect("items readable");
    let dated = items
        .iter()
        .find(|item| item.id.0 == "clip-2")
        .expect("clip-2 recorded");
    assert_eq!(
        dated.submitted_at,
        Utc.with_ymd_and_hms(2026, 7, 7, 0, 0, 0).unwrap()
    );
    assert_eq!(dated.metrics.views, 38900);
}

#[test]
fn importer_handles_full_roster_export() {
    let data = include_bytes!("../Summer_Shorts_Roster.csv");
    let store = SeedStore::default();

    let summary = RosterImporter::from_reader(&data[..], &store, &contest())
        .expect("roster dataset imports");

    assert_eq!(summary, RosterSummary { entrants: 16, items: 22 });

    let top_entrant = store
        .items_for(&contest(), &EntrantId("neon-loop".to_string()))
        .expect("items readable");
    assert_eq!(top_entrant.len(), 3);

    let items = store.items(&contest()).expect("items readable");
    assert_eq!(items.len(), 22);
    assert!(items.iter().all(|item| item.metrics.views >= item.metrics.likes));
}
