use std::path::PathBuf;
use std::sync::Arc;

use crate::backup::Backup;
use crate::calendar;
use crate::model::{FixedSchedule, Room, Slot, TimeOfDay, TimeSpec};
use crate::store::Partition;

use super::{BookingError, BookingService};

fn tmp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("talkroom_test_service");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

async fn service(name: &str) -> BookingService {
    let path = tmp_path(name);
    let _ = std::fs::remove_file(&path);
    let store = Arc::new(Partition::open("office-a", path).unwrap());
    let svc = BookingService::new(store);
    assert!(svc.seed_roster_if_empty().await.unwrap());
    svc
}

fn t(h: u16, m: u16) -> TimeOfDay {
    TimeOfDay::from_hm(h, m)
}

// 2026-02-23 is a Monday.
fn monday() -> chrono::NaiveDate {
    calendar::date(2, 23).unwrap()
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let svc = service("seeding.journal").await;
    assert_eq!(svc.store().member_count(), 39);
    assert!(!svc.seed_roster_if_empty().await.unwrap());
    assert_eq!(svc.store().member_count(), 39);
}

#[tokio::test]
async fn booking_lifecycle() {
    let svc = service("lifecycle.journal").await;

    let key = svc
        .book_adhoc("PO01", monday(), Room::Talk1, t(9, 0), t(11, 0))
        .await
        .unwrap();
    assert_eq!(key, "2026-02-23_談話室一_09:00_11:00");

    let view = svc.day_view(Room::Talk1, monday());
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].occupant, "PO01");
    assert_eq!(view[0].source_ids, vec![key.clone()]);

    svc.cancel_adhoc(&key).await.unwrap();
    assert!(svc.day_view(Room::Talk1, monday()).is_empty());
}

#[tokio::test]
async fn overlapping_booking_is_rejected_with_existing_key() {
    let svc = service("overlap.journal").await;
    let key = svc
        .book_adhoc("PO01", monday(), Room::Talk1, t(9, 0), t(11, 0))
        .await
        .unwrap();

    let err = svc
        .book_adhoc("PS01", monday(), Room::Talk1, t(10, 0), t(12, 0))
        .await
        .unwrap_err();
    match err {
        BookingError::Conflict(existing) => assert_eq!(existing, key),
        other => panic!("expected Conflict, got {other}"),
    }

    // Other rooms and touching ranges stay bookable.
    svc.book_adhoc("PS01", monday(), Room::Talk2, t(10, 0), t(12, 0))
        .await
        .unwrap();
    svc.book_adhoc("PS02", monday(), Room::Talk1, t(11, 0), t(12, 0))
        .await
        .unwrap();
}

#[tokio::test]
async fn contiguous_bookings_merge_in_day_view() {
    let svc = service("merge_view.journal").await;
    let k1 = svc
        .book_adhoc("PO01", monday(), Room::Talk1, t(9, 0), t(10, 0))
        .await
        .unwrap();
    let k2 = svc
        .book_adhoc("PO01", monday(), Room::Talk1, t(10, 0), t(11, 0))
        .await
        .unwrap();
    // A different member after a gap stays a separate row.
    let k3 = svc
        .book_adhoc("PS01", monday(), Room::Talk1, t(13, 0), t(14, 0))
        .await
        .unwrap();

    let view = svc.day_view(Room::Talk1, monday());
    assert_eq!(view.len(), 2);
    assert_eq!(view[0].range.start, t(9, 0));
    assert_eq!(view[0].range.end, t(11, 0));
    assert_eq!(view[0].source_ids, vec![k1, k2]);
    assert_eq!(view[1].source_ids, vec![k3]);
}

#[tokio::test]
async fn holidays_and_weekends_are_closed() {
    let svc = service("holiday.journal").await;

    // 2026-01-01 is a listed holiday.
    let new_year = calendar::date(1, 1).unwrap();
    let err = svc
        .book_adhoc("PO01", new_year, Room::Talk1, t(9, 0), t(10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Holiday(_)));

    // 2026-01-04 is a Sunday.
    let sunday = calendar::date(1, 4).unwrap();
    assert!(
        svc.book_adhoc("PO01", sunday, Room::Talk1, t(9, 0), t(10, 0))
            .await
            .is_err()
    );

    // A fixed schedule that lands on a holiday still renders a closed day.
    svc.set_fixed_schedule(FixedSchedule {
        user_id: "PO01".into(),
        weekday: calendar::weekday_of(new_year),
        room: Room::Talk1,
        time: TimeSpec::from_slot(Slot::Morning),
    })
    .await
    .unwrap();
    assert!(svc.day_view(Room::Talk1, new_year).is_empty());
}

#[tokio::test]
async fn dates_outside_operating_year_are_rejected() {
    let svc = service("year.journal").await;
    let next_year = chrono::NaiveDate::from_ymd_opt(2027, 2, 23).unwrap();
    let err = svc
        .book_adhoc("PO01", next_year, Room::Talk1, t(9, 0), t(10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::OutsideOperatingYear(2027)));
}

#[tokio::test]
async fn unknown_member_cannot_book() {
    let svc = service("unknown.journal").await;
    let err = svc
        .book_adhoc("XX99", monday(), Room::Talk1, t(9, 0), t(10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::UnknownMember(_)));
}

#[tokio::test]
async fn fixed_schedule_same_key_replaces_holder() {
    let svc = service("fixed_replace.journal").await;
    let rec = |user: &str| FixedSchedule {
        user_id: user.into(),
        weekday: 1,
        room: Room::Talk1,
        time: TimeSpec::from_slot(Slot::Morning),
    };

    let k1 = svc.set_fixed_schedule(rec("PO01")).await.unwrap();
    let k2 = svc.set_fixed_schedule(rec("PO02")).await.unwrap();
    assert_eq!(k1, k2);
    assert_eq!(k1, "1_談話室一_morning");

    let view = svc.day_view(Room::Talk1, monday());
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].occupant, "PO02");
}

#[tokio::test]
async fn fixed_schedule_blocks_adhoc_booking() {
    let svc = service("fixed_blocks.journal").await;
    let key = svc
        .set_fixed_schedule(FixedSchedule {
            user_id: "PO01".into(),
            weekday: 1,
            room: Room::Talk1,
            time: TimeSpec::from_slot(Slot::Morning),
        })
        .await
        .unwrap();

    let err = svc
        .book_adhoc("PS01", monday(), Room::Talk1, t(10, 0), t(11, 0))
        .await
        .unwrap_err();
    match err {
        BookingError::Conflict(existing) => assert_eq!(existing, key),
        other => panic!("expected Conflict, got {other}"),
    }

    // The afternoon is free.
    svc.book_adhoc("PS01", monday(), Room::Talk1, t(13, 0), t(15, 0))
        .await
        .unwrap();

    svc.remove_fixed_schedule(&key).await.unwrap();
    svc.book_adhoc("PS01", monday(), Room::Talk1, t(10, 0), t(11, 0))
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_weekday_is_rejected() {
    let svc = service("weekday.journal").await;
    let err = svc
        .set_fixed_schedule(FixedSchedule {
            user_id: "PO01".into(),
            weekday: 7,
            room: Room::Talk1,
            time: TimeSpec::from_slot(Slot::Morning),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidWeekday(7)));
}

#[tokio::test]
async fn display_name_truncates_and_falls_back() {
    let svc = service("names.journal").await;

    // Unnamed seat displays as the id.
    assert_eq!(svc.member_display_name("PO01"), "PO01");
    // So does an id not on the roster.
    assert_eq!(svc.member_display_name("XX99"), "XX99");

    svc.set_member_name("PO01", "保護観察官の田中太郎です")
        .await
        .unwrap();
    // Truncated at ten characters, not ten bytes.
    assert_eq!(svc.member_display_name("PO01"), "保護観察官の田中太郎");

    svc.set_member_name("PO02", "   ").await.unwrap();
    assert_eq!(svc.member_display_name("PO02"), "PO02");

    let err = svc.set_member_name("XX99", "x").await.unwrap_err();
    assert!(matches!(err, BookingError::UnknownMember(_)));
}

#[tokio::test]
async fn check_conflict_excludes_own_booking() {
    let svc = service("exclude.journal").await;
    let key = svc
        .book_adhoc("PO01", monday(), Room::Talk1, t(9, 0), t(11, 0))
        .await
        .unwrap();

    assert!(
        svc.check_conflict(Room::Talk1, monday(), t(9, 0), t(10, 0), None)
            .unwrap()
    );
    // Editing the same booking must not collide with itself.
    assert!(
        !svc.check_conflict(Room::Talk1, monday(), t(9, 0), t(10, 0), Some(&key))
            .unwrap()
    );
    assert!(
        svc.check_conflict(Room::Talk1, monday(), t(9, 0), t(10, 0), Some("other"))
            .unwrap()
    );
}

#[tokio::test]
async fn backup_roundtrip_recomputes_keys() {
    let src = service("backup_src.journal").await;
    src.set_member_name("PO01", "田中").await.unwrap();
    src.set_fixed_schedule(FixedSchedule {
        user_id: "PO01".into(),
        weekday: 1,
        room: Room::Talk1,
        time: TimeSpec::from_slot(Slot::Morning),
    })
    .await
    .unwrap();
    src.book_adhoc("PS01", monday(), Room::Talk2, t(9, 0), t(11, 0))
        .await
        .unwrap();

    let json = src.export_backup().to_json().unwrap();
    let backup = Backup::from_json(&json).unwrap();

    let dst = service("backup_dst.journal").await;
    let imported = dst.import_backup(&backup).await.unwrap();
    assert_eq!(imported, 39 + 1 + 1);

    assert_eq!(dst.member_display_name("PO01"), "田中");
    let fixed = dst.store().fixed_snapshot();
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].id, "1_談話室一_morning");
    let view = dst.day_view(Room::Talk2, monday());
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].occupant, "PS01");
}

#[tokio::test]
async fn import_skips_unkeyable_records() {
    let svc = service("import_unkeyable.journal").await;
    let backup = Backup {
        members: vec![],
        fixed_schedules: vec![FixedSchedule {
            user_id: "PO01".into(),
            weekday: 1,
            room: Room::Talk1,
            time: TimeSpec::default(), // neither times nor slot tag
        }],
        adhoc_bookings: vec![],
        sync_key: "office-a".into(),
        export_at: "2026-02-20T09:00:00+00:00".into(),
    };
    assert_eq!(svc.import_backup(&backup).await.unwrap(), 0);
    assert!(svc.store().fixed_snapshot().is_empty());
}

#[tokio::test]
async fn legacy_slot_booking_participates_in_view_and_conflict() {
    let svc = service("legacy.journal").await;
    // Simulate a record written before hour granularity existed.
    let rec = crate::model::AdhocBooking {
        user_id: "PO01".into(),
        date: monday(),
        room: Room::Talk1,
        time: TimeSpec::from_slot(Slot::Afternoon),
    };
    let key = rec.key().unwrap();
    assert_eq!(key, "2026-02-23_談話室一_afternoon");
    svc.store().put_adhoc(key, &rec).await.unwrap();

    let view = svc.day_view(Room::Talk1, monday());
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].range, Slot::Afternoon.range());

    assert!(
        svc.check_conflict(Room::Talk1, monday(), t(14, 0), t(15, 0), None)
            .unwrap()
    );
    assert!(
        !svc.check_conflict(Room::Talk1, monday(), t(9, 0), t(10, 0), None)
            .unwrap()
    );
}
