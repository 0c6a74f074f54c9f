use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::trace;

use crate::booking::BookingError;
use crate::journal::Journal;
use crate::model::{AdhocBooking, Doc, DocEvent, FixedSchedule, Member, TimeSpec};

// ── Group-commit journal channel ─────────────────────────

pub(crate) enum JournalCommand {
    Append {
        event: DocEvent,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<DocEvent>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the journal and batches appends.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to every sender.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JournalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                loop {
                    match rx.try_recv() {
                        Ok(JournalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush the batch before the non-append command.
                            let result = flush_batch(&mut journal, &mut batch);
                            respond_batch(&mut batch, &result);
                            handle_non_append(&mut journal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush
                    }
                }

                if !batch.is_empty() {
                    trace!(batch = batch.len(), "journal flush");
                    let result = flush_batch(&mut journal, &mut batch);
                    respond_batch(&mut batch, &result);
                }
            }
            other => handle_non_append(&mut journal, other),
        }
    }
}

fn flush_batch(
    journal: &mut Journal,
    batch: &mut [(DocEvent, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = journal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = journal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(
    batch: &mut Vec<(DocEvent, oneshot::Sender<io::Result<()>>)>,
    result: &io::Result<()>,
) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Compact { events, response } => {
            let result = Journal::write_compacted(journal.path(), &events)
                .and_then(|()| journal.swap_compacted());
            let _ = response.send(result);
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!(),
    }
}

/// One sync partition: the three document collections, their journal, and a
/// watch channel per collection carrying the full sorted snapshot.
///
/// Writes journal first, then apply to the maps, then publish. A subscriber
/// therefore never observes a document the journal could lose on crash.
#[derive(Debug)]
pub struct Partition {
    sync_key: String,
    members: DashMap<String, Member>,
    fixed: DashMap<String, FixedSchedule>,
    adhoc: DashMap<String, AdhocBooking>,
    journal_tx: mpsc::Sender<JournalCommand>,
    members_tx: watch::Sender<Vec<Doc<Member>>>,
    fixed_tx: watch::Sender<Vec<Doc<FixedSchedule>>>,
    adhoc_tx: watch::Sender<Vec<Doc<AdhocBooking>>>,
}

impl Partition {
    /// Replay the journal at `path` into memory and start the writer task.
    pub fn open(sync_key: &str, path: PathBuf) -> io::Result<Self> {
        let events = Journal::replay(&path)?;
        let journal = Journal::open(&path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let partition = Self {
            sync_key: sync_key.to_string(),
            members: DashMap::new(),
            fixed: DashMap::new(),
            adhoc: DashMap::new(),
            journal_tx,
            members_tx: watch::Sender::new(Vec::new()),
            fixed_tx: watch::Sender::new(Vec::new()),
            adhoc_tx: watch::Sender::new(Vec::new()),
        };

        for event in &events {
            partition.apply(event);
        }
        partition.publish_members();
        partition.publish_fixed();
        partition.publish_adhoc();

        Ok(partition)
    }

    pub fn sync_key(&self) -> &str {
        &self.sync_key
    }

    // ── Event application ────────────────────────────────────

    fn apply(&self, event: &DocEvent) {
        match event {
            DocEvent::MemberPut { id, name, kind } => {
                self.members.insert(
                    id.clone(),
                    Member {
                        id: id.clone(),
                        name: name.clone(),
                        kind: *kind,
                    },
                );
            }
            DocEvent::FixedPut {
                key,
                user_id,
                weekday,
                room,
                slot,
                start,
                end,
            } => {
                self.fixed.insert(
                    key.clone(),
                    FixedSchedule {
                        user_id: user_id.clone(),
                        weekday: *weekday,
                        room: *room,
                        time: TimeSpec {
                            slot: *slot,
                            start: *start,
                            end: *end,
                        },
                    },
                );
            }
            DocEvent::FixedDeleted { key } => {
                self.fixed.remove(key);
            }
            DocEvent::AdhocPut {
                key,
                user_id,
                date,
                room,
                slot,
                start,
                end,
            } => {
                self.adhoc.insert(
                    key.clone(),
                    AdhocBooking {
                        user_id: user_id.clone(),
                        date: *date,
                        room: *room,
                        time: TimeSpec {
                            slot: *slot,
                            start: *start,
                            end: *end,
                        },
                    },
                );
            }
            DocEvent::AdhocDeleted { key } => {
                self.adhoc.remove(key);
            }
        }
    }

    fn publish_members(&self) {
        self.members_tx.send_replace(self.members_snapshot());
    }

    fn publish_fixed(&self) {
        self.fixed_tx.send_replace(self.fixed_snapshot());
    }

    fn publish_adhoc(&self) {
        self.adhoc_tx.send_replace(self.adhoc_snapshot());
    }

    fn publish_for(&self, event: &DocEvent) {
        match event {
            DocEvent::MemberPut { .. } => self.publish_members(),
            DocEvent::FixedPut { .. } | DocEvent::FixedDeleted { .. } => self.publish_fixed(),
            DocEvent::AdhocPut { .. } | DocEvent::AdhocDeleted { .. } => self.publish_adhoc(),
        }
    }

    // ── Journaling ───────────────────────────────────────────

    async fn journal_append(&self, event: &DocEvent) -> Result<(), BookingError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| BookingError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| BookingError::JournalError(e.to_string()))
    }

    /// Journal-append + apply + publish in one call.
    async fn commit(&self, event: DocEvent) -> Result<(), BookingError> {
        self.journal_append(&event).await?;
        self.apply(&event);
        self.publish_for(&event);
        Ok(())
    }

    /// Commit many events with one snapshot publication per collection.
    /// Appends are all enqueued before the first response is awaited, so the
    /// writer commits them as a single batch.
    pub async fn apply_batch(&self, events: Vec<DocEvent>) -> Result<(), BookingError> {
        let mut pending = Vec::with_capacity(events.len());
        for event in &events {
            let (tx, rx) = oneshot::channel();
            self.journal_tx
                .send(JournalCommand::Append {
                    event: event.clone(),
                    response: tx,
                })
                .await
                .map_err(|_| BookingError::JournalError("journal writer shut down".into()))?;
            pending.push(rx);
        }
        for rx in pending {
            rx.await
                .map_err(|_| BookingError::JournalError("journal writer dropped response".into()))?
                .map_err(|e| BookingError::JournalError(e.to_string()))?;
        }

        let mut members = false;
        let mut fixed = false;
        let mut adhoc = false;
        for event in &events {
            self.apply(event);
            match event {
                DocEvent::MemberPut { .. } => members = true,
                DocEvent::FixedPut { .. } | DocEvent::FixedDeleted { .. } => fixed = true,
                DocEvent::AdhocPut { .. } | DocEvent::AdhocDeleted { .. } => adhoc = true,
            }
        }
        if members {
            self.publish_members();
        }
        if fixed {
            self.publish_fixed();
        }
        if adhoc {
            self.publish_adhoc();
        }
        Ok(())
    }

    // ── Document writes ──────────────────────────────────────

    pub async fn put_member(&self, member: &Member) -> Result<(), BookingError> {
        self.commit(DocEvent::member_put(member)).await
    }

    pub async fn put_fixed(&self, key: String, rec: &FixedSchedule) -> Result<(), BookingError> {
        self.commit(DocEvent::fixed_put(key, rec)).await
    }

    pub async fn delete_fixed(&self, key: &str) -> Result<(), BookingError> {
        if !self.fixed.contains_key(key) {
            return Err(BookingError::NotFound(key.to_string()));
        }
        self.commit(DocEvent::FixedDeleted { key: key.to_string() })
            .await
    }

    pub async fn put_adhoc(&self, key: String, rec: &AdhocBooking) -> Result<(), BookingError> {
        self.commit(DocEvent::adhoc_put(key, rec)).await
    }

    pub async fn delete_adhoc(&self, key: &str) -> Result<(), BookingError> {
        if !self.adhoc.contains_key(key) {
            return Err(BookingError::NotFound(key.to_string()));
        }
        self.commit(DocEvent::AdhocDeleted { key: key.to_string() })
            .await
    }

    // ── Reads ────────────────────────────────────────────────

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn get_member(&self, id: &str) -> Option<Member> {
        self.members.get(id).map(|e| e.value().clone())
    }

    pub fn members_snapshot(&self) -> Vec<Doc<Member>> {
        let mut docs: Vec<Doc<Member>> = self
            .members
            .iter()
            .map(|e| Doc {
                id: e.key().clone(),
                fields: e.value().clone(),
            })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    pub fn fixed_snapshot(&self) -> Vec<Doc<FixedSchedule>> {
        let mut docs: Vec<Doc<FixedSchedule>> = self
            .fixed
            .iter()
            .map(|e| Doc {
                id: e.key().clone(),
                fields: e.value().clone(),
            })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    pub fn adhoc_snapshot(&self) -> Vec<Doc<AdhocBooking>> {
        let mut docs: Vec<Doc<AdhocBooking>> = self
            .adhoc
            .iter()
            .map(|e| Doc {
                id: e.key().clone(),
                fields: e.value().clone(),
            })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        docs
    }

    // ── Snapshot subscriptions ───────────────────────────────

    pub fn watch_members(&self) -> watch::Receiver<Vec<Doc<Member>>> {
        self.members_tx.subscribe()
    }

    pub fn watch_fixed(&self) -> watch::Receiver<Vec<Doc<FixedSchedule>>> {
        self.fixed_tx.subscribe()
    }

    pub fn watch_adhoc(&self) -> watch::Receiver<Vec<Doc<AdhocBooking>>> {
        self.adhoc_tx.subscribe()
    }

    // ── Compaction ───────────────────────────────────────────

    /// Rewrite the journal as one Put per live document.
    pub async fn compact_journal(&self) -> Result<(), BookingError> {
        let mut events: Vec<DocEvent> = Vec::new();
        for doc in self.members_snapshot() {
            events.push(DocEvent::member_put(&doc.fields));
        }
        for doc in self.fixed_snapshot() {
            events.push(DocEvent::fixed_put(doc.id, &doc.fields));
        }
        for doc in self.adhoc_snapshot() {
            events.push(DocEvent::adhoc_put(doc.id, &doc.fields));
        }

        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| BookingError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| BookingError::JournalError(e.to_string()))
    }

    pub async fn journal_appends_since_compact(&self) -> Result<u64, BookingError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .map_err(|_| BookingError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::JournalError("journal writer dropped response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;
    use crate::model::{MemberKind, Room, Slot, TimeOfDay};

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("talkroom_test_store");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn member(id: &str) -> Member {
        Member {
            id: id.into(),
            name: String::new(),
            kind: MemberKind::ProbationOfficer,
        }
    }

    fn fixed_rec() -> FixedSchedule {
        FixedSchedule {
            user_id: "PO01".into(),
            weekday: 1,
            room: Room::Talk1,
            time: TimeSpec::from_slot(Slot::Morning),
        }
    }

    fn adhoc_rec() -> AdhocBooking {
        AdhocBooking {
            user_id: "PS01".into(),
            date: calendar::date(2, 23).unwrap(),
            room: Room::Talk2,
            time: TimeSpec::explicit(TimeOfDay::from_hm(9, 0), TimeOfDay::from_hm(11, 0)),
        }
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let path = tmp_path("writes_survive_reopen.journal");
        let _ = std::fs::remove_file(&path);

        {
            let p = Partition::open("office-a", path.clone()).unwrap();
            p.put_member(&member("PO01")).await.unwrap();
            p.put_fixed("1_談話室一_morning".into(), &fixed_rec()).await.unwrap();
            p.put_adhoc("2026-02-23_談話室二_09:00_11:00".into(), &adhoc_rec())
                .await
                .unwrap();
        }

        let p = Partition::open("office-a", path.clone()).unwrap();
        assert_eq!(p.member_count(), 1);
        assert_eq!(p.fixed_snapshot().len(), 1);
        let adhocs = p.adhoc_snapshot();
        assert_eq!(adhocs.len(), 1);
        assert_eq!(adhocs[0].id, "2026-02-23_談話室二_09:00_11:00");
        assert_eq!(adhocs[0].fields.user_id, "PS01");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn put_with_same_key_overwrites() {
        let path = tmp_path("overwrite.journal");
        let _ = std::fs::remove_file(&path);

        let p = Partition::open("office-a", path.clone()).unwrap();
        p.put_fixed("1_談話室一_morning".into(), &fixed_rec()).await.unwrap();
        let mut other = fixed_rec();
        other.user_id = "PO02".into();
        p.put_fixed("1_談話室一_morning".into(), &other).await.unwrap();

        let docs = p.fixed_snapshot();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].fields.user_id, "PO02");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let path = tmp_path("delete_missing.journal");
        let _ = std::fs::remove_file(&path);

        let p = Partition::open("office-a", path.clone()).unwrap();
        let err = p.delete_adhoc("nope").await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
        assert!(p.delete_fixed("nope").await.is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn watch_observes_snapshot_after_write() {
        let path = tmp_path("watch.journal");
        let _ = std::fs::remove_file(&path);

        let p = Partition::open("office-a", path.clone()).unwrap();
        let mut rx = p.watch_adhoc();
        assert!(rx.borrow().is_empty());

        p.put_adhoc("2026-02-23_談話室二_09:00_11:00".into(), &adhoc_rec())
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);

        p.delete_adhoc("2026-02-23_談話室二_09:00_11:00").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn batch_applies_all_and_publishes_once() {
        let path = tmp_path("batch.journal");
        let _ = std::fs::remove_file(&path);

        let p = Partition::open("office-a", path.clone()).unwrap();
        let mut rx = p.watch_members();
        let events: Vec<DocEvent> = (1..=5)
            .map(|i| DocEvent::member_put(&member(&format!("PO{i:02}"))))
            .collect();
        p.apply_batch(events).await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 5);
        assert_eq!(p.member_count(), 5);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn compaction_preserves_state_across_reopen() {
        let path = tmp_path("compaction.journal");
        let _ = std::fs::remove_file(&path);

        {
            let p = Partition::open("office-a", path.clone()).unwrap();
            for _ in 0..10 {
                p.put_fixed("1_談話室一_morning".into(), &fixed_rec()).await.unwrap();
            }
            p.put_member(&member("PO01")).await.unwrap();
            p.compact_journal().await.unwrap();
            assert_eq!(p.journal_appends_since_compact().await.unwrap(), 0);
        }

        let replayed = Journal::replay(&path).unwrap();
        // One member, one fixed schedule; the churn is gone.
        assert_eq!(replayed.len(), 2);

        let p = Partition::open("office-a", path.clone()).unwrap();
        assert_eq!(p.member_count(), 1);
        assert_eq!(p.fixed_snapshot().len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
