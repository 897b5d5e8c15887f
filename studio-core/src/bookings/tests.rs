use super::BookingService;
use crate::cards::CardService;
use crate::config::CancellationPolicy;
use crate::schedules::ScheduleService;
use crate::test_support::*;
use shared::models::{
    BookingCreate, BookingFilter, BookingReschedule, BookingReview, BookingStatus, CardCreate,
    CardKind, ScheduleCreate,
};
use shared::{ErrorCode, PaginationQuery, ScopeFilter};

const SCOPE: ScopeFilter = ScopeFilter::All;

fn service(db: &TestDb) -> BookingService {
    BookingService::new(db.pool.clone(), CancellationPolicy::default())
}

fn dto(member_id: i64, coach_id: Option<i64>, start: i64, end: i64) -> BookingCreate {
    BookingCreate {
        member_id,
        course_id: COURSE_YOGA,
        coach_id,
        store_id: STORE_A,
        schedule_id: None,
        card_id: None,
        start_time: start,
        end_time: end,
    }
}

#[tokio::test]
async fn test_create_starts_pending_with_booking_no() {
    let db = test_db().await;
    let svc = service(&db);

    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert!(booking.booking_no.starts_with("BK"));
    assert!(booking.rating.is_none());

    let fetched = svc.get(SCOPE, booking.id).await.unwrap();
    assert_eq!(fetched.booking_no, booking.booking_no);
}

#[tokio::test]
async fn test_create_rejects_inverted_interval() {
    let db = test_db().await;
    let svc = service(&db);

    let start = hours_from_now(10);
    let err = svc
        .create(SCOPE, dto(MEMBER_ANNA, None, start, start))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_create_unknown_references_not_found() {
    let db = test_db().await;
    let svc = service(&db);

    let err = svc
        .create(SCOPE, dto(99999, None, hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let bad_coach = dto(MEMBER_ANNA, Some(99999), hours_from_now(10), hours_from_now(11));
    let err = svc.create(SCOPE, bad_coach).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_coach_overlap_is_conflict() {
    let db = test_db().await;
    let svc = service(&db);

    svc.create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();

    // Different member, same coach, overlapping interval
    let err = svc
        .create(
            SCOPE,
            dto(MEMBER_BEN, Some(COACH_LI), minutes_from_now(630), minutes_from_now(690)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TimeConflict);
    assert_eq!(
        err.details.as_ref().unwrap().get("resource").unwrap(),
        "coach"
    );
}

#[tokio::test]
async fn test_member_overlap_is_conflict() {
    let db = test_db().await;
    let svc = service(&db);

    svc.create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();

    // Same member, no coach involved, overlapping interval
    let err = svc
        .create(SCOPE, dto(MEMBER_ANNA, None, minutes_from_now(630), minutes_from_now(690)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TimeConflict);
    assert_eq!(
        err.details.as_ref().unwrap().get("resource").unwrap(),
        "member"
    );
}

#[tokio::test]
async fn test_touching_intervals_do_not_conflict() {
    let db = test_db().await;
    let svc = service(&db);

    let boundary = hours_from_now(11);
    svc.create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), boundary))
        .await
        .unwrap();

    // Same coach and member, starting exactly where the first one ends
    svc.create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), boundary, hours_from_now(12)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_booking_frees_the_slot() {
    let db = test_db().await;
    let svc = service(&db);

    let first = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();
    svc.cancel(SCOPE, first.id, Some("plans changed".into()))
        .await
        .unwrap();

    // Terminal bookings no longer occupy the interval
    svc.create(SCOPE, dto(MEMBER_BEN, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_confirm_complete_flow() {
    let db = test_db().await;
    let svc = service(&db);

    // Booking already in the past so completion is permitted
    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(-2), hours_from_now(-1)))
        .await
        .unwrap();

    let confirmed = svc.confirm(SCOPE, booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let completed = svc.complete(SCOPE, booking.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
}

#[tokio::test]
async fn test_complete_future_booking_rejected() {
    let db = test_db().await;
    let svc = service(&db);

    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();
    svc.confirm(SCOPE, booking.id).await.unwrap();

    let err = svc.complete(SCOPE, booking.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BookingNotFinished);
}

#[tokio::test]
async fn test_disallowed_transitions_rejected() {
    let db = test_db().await;
    let svc = service(&db);

    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(-2), hours_from_now(-1)))
        .await
        .unwrap();

    // PENDING → COMPLETED and PENDING → NO_SHOW are not edges
    assert_eq!(
        svc.complete(SCOPE, booking.id).await.unwrap_err().code,
        ErrorCode::InvalidTransition
    );
    assert_eq!(
        svc.mark_no_show(SCOPE, booking.id).await.unwrap_err().code,
        ErrorCode::InvalidTransition
    );

    svc.confirm(SCOPE, booking.id).await.unwrap();
    // CONFIRMED → CONFIRMED is not an edge either
    assert_eq!(
        svc.confirm(SCOPE, booking.id).await.unwrap_err().code,
        ErrorCode::InvalidTransition
    );

    let done = svc.mark_no_show(SCOPE, booking.id).await.unwrap();
    assert_eq!(done.status, BookingStatus::NoShow);

    // Terminal: nothing moves any more
    assert_eq!(
        svc.cancel(SCOPE, booking.id, None).await.unwrap_err().code,
        ErrorCode::InvalidTransition
    );
}

#[tokio::test]
async fn test_cancel_window_boundary() {
    let db = test_db().await;
    let svc = service(&db);

    // 121 minutes out: inside the allowance
    let cancellable = svc
        .create(SCOPE, dto(MEMBER_ANNA, None, minutes_from_now(121), minutes_from_now(181)))
        .await
        .unwrap();
    let cancelled = svc
        .cancel(SCOPE, cancellable.id, Some("too early anyway".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("too early anyway"));

    // 119 minutes out: window closed
    let locked = svc
        .create(SCOPE, dto(MEMBER_BEN, None, minutes_from_now(119), minutes_from_now(179)))
        .await
        .unwrap();
    let err = svc.cancel(SCOPE, locked.id, None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::CancelWindowClosed);

    let still_there = svc.get(SCOPE, locked.id).await.unwrap();
    assert_eq!(still_there.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_review_only_once() {
    let db = test_db().await;
    let svc = service(&db);

    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(-2), hours_from_now(-1)))
        .await
        .unwrap();

    // Not reviewable before completion
    let err = svc
        .review(SCOPE, booking.id, BookingReview { rating: 5, comment: None })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransition);

    svc.confirm(SCOPE, booking.id).await.unwrap();
    svc.complete(SCOPE, booking.id).await.unwrap();

    // Rating bounds
    let err = svc
        .review(SCOPE, booking.id, BookingReview { rating: 6, comment: None })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);

    let reviewed = svc
        .review(SCOPE, booking.id, BookingReview { rating: 5, comment: Some("great class".into()) })
        .await
        .unwrap();
    assert_eq!(reviewed.rating, Some(5));
    assert_eq!(reviewed.review_comment.as_deref(), Some("great class"));

    let err = svc
        .review(SCOPE, booking.id, BookingReview { rating: 4, comment: None })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyReviewed);

    // First review untouched
    let fetched = svc.get(SCOPE, booking.id).await.unwrap();
    assert_eq!(fetched.rating, Some(5));
}

#[tokio::test]
async fn test_reschedule_reruns_conflict_check() {
    let db = test_db().await;
    let svc = service(&db);

    let blocker = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();
    let movable = svc
        .create(SCOPE, dto(MEMBER_BEN, Some(COACH_LI), hours_from_now(14), hours_from_now(15)))
        .await
        .unwrap();

    // Into the blocker's window: rejected
    let err = svc
        .reschedule(
            SCOPE,
            movable.id,
            BookingReschedule { start_time: minutes_from_now(630), end_time: minutes_from_now(690) },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TimeConflict);

    // Unchanged after the failed attempt
    let unchanged = svc.get(SCOPE, movable.id).await.unwrap();
    assert_eq!(unchanged.start_time, movable.start_time);

    // A booking never conflicts with itself: shifting within its own window works
    svc.reschedule(
        SCOPE,
        blocker.id,
        BookingReschedule {
            start_time: minutes_from_now(615),
            end_time: minutes_from_now(675),
        },
    )
    .await
    .unwrap();

    // And a genuinely free slot works
    let new_start = hours_from_now(16);
    let new_end = hours_from_now(17);
    let moved = svc
        .reschedule(
            SCOPE,
            movable.id,
            BookingReschedule { start_time: new_start, end_time: new_end },
        )
        .await
        .unwrap();
    assert_eq!(moved.start_time, new_start);
    assert_eq!(moved.end_time, new_end);
}

#[tokio::test]
async fn test_create_consumes_and_cancel_releases_session() {
    let db = test_db().await;
    let svc = service(&db);
    let cards = CardService::new(db.pool.clone());

    let card = cards
        .issue(
            SCOPE,
            CardCreate {
                member_id: MEMBER_ANNA,
                store_id: STORE_A,
                kind: CardKind::PersonalTraining,
                parent_card_id: None,
                coach_id: Some(COACH_LI),
                total_sessions: 5,
                price: 600.0,
                expiry_date: None,
                validity_days: None,
            },
        )
        .await
        .unwrap();
    cards.activate(SCOPE, card.id).await.unwrap();

    let mut create = dto(MEMBER_ANNA, Some(COACH_LI), minutes_from_now(150), minutes_from_now(210));
    create.card_id = Some(card.id);
    let booking = svc.create(SCOPE, create).await.unwrap();

    assert_eq!(cards.get(SCOPE, card.id).await.unwrap().used_sessions, 1);

    svc.cancel(SCOPE, booking.id, Some("sick".into())).await.unwrap();
    assert_eq!(cards.get(SCOPE, card.id).await.unwrap().used_sessions, 0);
}

#[tokio::test]
async fn test_create_with_exhausted_card_writes_nothing() {
    let db = test_db().await;
    let svc = service(&db);
    let cards = CardService::new(db.pool.clone());

    let card = cards
        .issue(
            SCOPE,
            CardCreate {
                member_id: MEMBER_ANNA,
                store_id: STORE_A,
                kind: CardKind::GroupClass,
                parent_card_id: None,
                coach_id: None,
                total_sessions: 1,
                price: 80.0,
                expiry_date: None,
                validity_days: None,
            },
        )
        .await
        .unwrap();
    cards.activate(SCOPE, card.id).await.unwrap();
    cards.consume(SCOPE, card.id).await.unwrap();

    let mut create = dto(MEMBER_ANNA, None, hours_from_now(10), hours_from_now(11));
    create.card_id = Some(card.id);
    let err = svc.create(SCOPE, create).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientEntitlement);

    // The creation transaction rolled back: no booking row exists
    let listed = svc
        .list(SCOPE, BookingFilter::default(), PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn test_card_of_another_member_rejected() {
    let db = test_db().await;
    let svc = service(&db);
    let cards = CardService::new(db.pool.clone());

    let card = cards
        .issue(
            SCOPE,
            CardCreate {
                member_id: MEMBER_BEN,
                store_id: STORE_A,
                kind: CardKind::GroupClass,
                parent_card_id: None,
                coach_id: None,
                total_sessions: 10,
                price: 300.0,
                expiry_date: None,
                validity_days: None,
            },
        )
        .await
        .unwrap();
    cards.activate(SCOPE, card.id).await.unwrap();

    let mut create = dto(MEMBER_ANNA, None, hours_from_now(10), hours_from_now(11));
    create.card_id = Some(card.id);
    let err = svc.create(SCOPE, create).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_schedule_registration_respects_capacity() {
    let db = test_db().await;
    let svc = service(&db);
    let schedules = ScheduleService::new(db.pool.clone(), CancellationPolicy::default());

    let schedule = schedules
        .create(
            SCOPE,
            ScheduleCreate {
                course_id: COURSE_SPIN,
                coach_id: COACH_WANG,
                store_id: STORE_A,
                start_time: hours_from_now(20),
                end_time: hours_from_now(21),
                max_participants: 2,
            },
        )
        .await
        .unwrap();

    let mut first = dto(MEMBER_ANNA, None, hours_from_now(20), hours_from_now(21));
    first.schedule_id = Some(schedule.id);
    first.course_id = COURSE_SPIN;
    let first = svc.create(SCOPE, first).await.unwrap();

    let mut second = dto(MEMBER_BEN, None, hours_from_now(20), hours_from_now(21));
    second.schedule_id = Some(schedule.id);
    second.course_id = COURSE_SPIN;
    svc.create(SCOPE, second).await.unwrap();

    assert_eq!(
        schedules.get(SCOPE, schedule.id).await.unwrap().current_participants,
        2
    );

    // Full: Anna trying to register a second slot elsewhere in time still
    // hits the capacity ceiling
    let mut third = dto(MEMBER_ANNA, None, hours_from_now(30), hours_from_now(31));
    third.schedule_id = Some(schedule.id);
    third.course_id = COURSE_SPIN;
    let err = svc.create(SCOPE, third).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ScheduleFull);

    // Cancelling a registered booking releases the slot
    svc.cancel(SCOPE, first.id, None).await.unwrap();
    assert_eq!(
        schedules.get(SCOPE, schedule.id).await.unwrap().current_participants,
        1
    );
}

#[tokio::test]
async fn test_store_scope_isolates_rows() {
    let db = test_db().await;
    let svc = service(&db);

    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();

    // Another store cannot see or mutate it
    let other = ScopeFilter::Store(STORE_B);
    assert_eq!(
        svc.get(other, booking.id).await.unwrap_err().code,
        ErrorCode::NotFound
    );
    assert_eq!(
        svc.cancel(other, booking.id, None).await.unwrap_err().code,
        ErrorCode::NotFound
    );
    let listed = svc
        .list(other, BookingFilter::default(), PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);

    // Its own store and its own brand both see it
    for scope in [ScopeFilter::Store(STORE_A), ScopeFilter::Brand(BRAND_A)] {
        let listed = svc
            .list(scope, BookingFilter::default(), PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1, "scope {scope:?}");
    }

    // Creating against an out-of-scope member fails closed
    let err = svc
        .create(other, dto(MEMBER_ANNA, None, hours_from_now(12), hours_from_now(13)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_soft_delete_hides_terminal_booking() {
    let db = test_db().await;
    let svc = service(&db);

    let booking = svc
        .create(SCOPE, dto(MEMBER_ANNA, None, hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();

    // Active bookings cannot be removed
    assert_eq!(
        svc.remove(SCOPE, booking.id).await.unwrap_err().code,
        ErrorCode::ValidationFailed
    );

    svc.cancel(SCOPE, booking.id, None).await.unwrap();
    svc.remove(SCOPE, booking.id).await.unwrap();

    assert_eq!(
        svc.get(SCOPE, booking.id).await.unwrap_err().code,
        ErrorCode::NotFound
    );
    let listed = svc
        .list(SCOPE, BookingFilter::default(), PaginationQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let db = test_db().await;
    let svc = service(&db);

    let b1 = svc
        .create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();
    svc.create(SCOPE, dto(MEMBER_BEN, Some(COACH_WANG), hours_from_now(10), hours_from_now(11)))
        .await
        .unwrap();
    svc.create(SCOPE, dto(MEMBER_ANNA, Some(COACH_LI), hours_from_now(12), hours_from_now(13)))
        .await
        .unwrap();
    svc.confirm(SCOPE, b1.id).await.unwrap();

    let by_member = svc
        .list(
            SCOPE,
            BookingFilter { member_id: Some(MEMBER_ANNA), ..Default::default() },
            PaginationQuery::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_member.total, 2);

    let confirmed = svc
        .list(
            SCOPE,
            BookingFilter { status: Some(BookingStatus::Confirmed), ..Default::default() },
            PaginationQuery::default(),
        )
        .await
        .unwrap();
    assert_eq!(confirmed.total, 1);
    assert_eq!(confirmed.items[0].id, b1.id);

    let paged = svc
        .list(SCOPE, BookingFilter::default(), PaginationQuery::new(1, 2))
        .await
        .unwrap();
    assert_eq!(paged.total, 3);
    assert_eq!(paged.items.len(), 2);
    assert_eq!(paged.total_pages, 2);

    let windowed = svc
        .list(
            SCOPE,
            BookingFilter {
                from: Some(minutes_from_now(690)),
                ..Default::default()
            },
            PaginationQuery::default(),
        )
        .await
        .unwrap();
    assert_eq!(windowed.total, 1);
}
