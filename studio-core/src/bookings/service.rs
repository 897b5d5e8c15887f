//! Booking Service

use crate::config::CancellationPolicy;
use crate::conflict::{self, ConflictReport, ConflictSource, Exclude, ResourceRef, TimeRange};
use crate::db::repository::{
    AttemptError, AttemptResult, RepoError, booking as booking_repo, card as card_repo,
    catalog as catalog_repo, course_schedule as schedule_repo,
};
use shared::models::{
    Booking, BookingCreate, BookingFilter, BookingReschedule, BookingReview, BookingStatus,
};
use shared::{AppError, AppResult, PaginatedResponse, PaginationQuery, ScopeFilter};
use sqlx::SqlitePool;

/// Stateless domain service for the booking lifecycle.
///
/// All operations take the caller's [`ScopeFilter`]; rows outside the scope
/// behave like missing rows.
#[derive(Clone)]
pub struct BookingService {
    pool: SqlitePool,
    policy: CancellationPolicy,
}

impl BookingService {
    pub fn new(pool: SqlitePool, policy: CancellationPolicy) -> Self {
        Self { pool, policy }
    }

    /// Create a booking in PENDING status.
    ///
    /// The conflict check, entitlement consumption and class-session
    /// registration run inside one transaction with the insert; on a
    /// write-time conflict signal the whole unit is retried exactly once.
    pub async fn create(&self, scope: ScopeFilter, dto: BookingCreate) -> AppResult<Booking> {
        let range = TimeRange::new(dto.start_time, dto.end_time)?;
        self.check_references(scope, &dto).await?;

        let mut resources = vec![ResourceRef::Member(dto.member_id)];
        if let Some(coach_id) = dto.coach_id {
            resources.push(ResourceRef::Coach(coach_id));
        }

        let mut retried = false;
        loop {
            match self.try_create(&dto, range, &resources).await {
                Ok(booking) => {
                    tracing::info!(
                        booking_no = %booking.booking_no,
                        member_id = booking.member_id,
                        coach_id = ?booking.coach_id,
                        "Booking created"
                    );
                    return Ok(booking);
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable(err)) if !retried => {
                    retried = true;
                    tracing::warn!(error = %err, "Write conflict on booking create, retrying once");
                }
                Err(AttemptError::Retryable(err)) => {
                    return Err(AppError::time_conflict(err.to_string()));
                }
            }
        }
    }

    async fn try_create(
        &self,
        dto: &BookingCreate,
        range: TimeRange,
        resources: &[ResourceRef],
    ) -> AttemptResult<Booking> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        let report = conflict::check(&mut tx, range, resources, None).await?;
        if report.has_conflict() {
            return Err(conflict_error(&report).into());
        }

        if let Some(card_id) = dto.card_id {
            consume_entitlement(&mut tx, card_id, now).await?;
        }

        if let Some(schedule_id) = dto.schedule_id {
            register_attendee(&mut tx, schedule_id, now).await?;
        }

        let booking = Booking {
            id: shared::util::snowflake_id(),
            booking_no: shared::util::booking_no(now),
            member_id: dto.member_id,
            coach_id: dto.coach_id,
            course_id: dto.course_id,
            store_id: dto.store_id,
            schedule_id: dto.schedule_id,
            card_id: dto.card_id,
            start_time: range.start,
            end_time: range.end,
            status: BookingStatus::Pending,
            cancelled_at: None,
            cancellation_reason: None,
            rating: None,
            review_comment: None,
            reviewed_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        booking_repo::insert(&mut tx, &booking).await?;
        tx.commit().await.map_err(RepoError::from)?;
        Ok(booking)
    }

    /// PENDING → CONFIRMED
    pub async fn confirm(&self, scope: ScopeFilter, id: i64) -> AppResult<Booking> {
        let booking = self.get(scope, id).await?;
        if !booking.status.can_transition_to(BookingStatus::Confirmed) {
            return Err(transition_error(&booking, BookingStatus::Confirmed));
        }
        let now = shared::util::now_millis();
        if !booking_repo::confirm(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(id, BookingStatus::Confirmed).await);
        }
        tracing::info!(booking_no = %booking.booking_no, "Booking confirmed");
        self.get(scope, id).await
    }

    /// Cancel while PENDING or CONFIRMED, only outside the cancellation
    /// lead window. Releases the consumed session and the class-session
    /// slot in the same transaction.
    pub async fn cancel(
        &self,
        scope: ScopeFilter,
        id: i64,
        reason: Option<String>,
    ) -> AppResult<Booking> {
        let booking = self.get(scope, id).await?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(transition_error(&booking, BookingStatus::Cancelled));
        }
        let now = shared::util::now_millis();
        if !shared::models::booking::cancel_window_open(
            booking.start_time,
            now,
            self.policy.booking_lead_ms(),
        ) {
            tracing::warn!(booking_no = %booking.booking_no, "Cancellation window closed");
            return Err(AppError::cancel_window_closed(
                self.policy.booking_cancel_lead_min,
            ));
        }

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        if !booking_repo::cancel(&mut tx, id, reason.as_deref(), now).await? {
            drop(tx);
            return Err(self.classify_guard_failure(id, BookingStatus::Cancelled).await);
        }
        if let Some(card_id) = booking.card_id {
            if !card_repo::release_session(&mut tx, card_id, now).await? {
                tracing::warn!(card_id, "No session to release on cancellation");
            }
        }
        if let Some(schedule_id) = booking.schedule_id {
            if !schedule_repo::release_participant(&mut tx, schedule_id, now).await? {
                tracing::warn!(schedule_id, "No participant to release on cancellation");
            }
        }
        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(booking_no = %booking.booking_no, "Booking cancelled");
        self.get(scope, id).await
    }

    /// CONFIRMED → COMPLETED, only once the booking has finished
    pub async fn complete(&self, scope: ScopeFilter, id: i64) -> AppResult<Booking> {
        let booking = self.get(scope, id).await?;
        if !booking.status.can_transition_to(BookingStatus::Completed) {
            return Err(transition_error(&booking, BookingStatus::Completed));
        }
        let now = shared::util::now_millis();
        if booking.end_time > now {
            return Err(AppError::with_message(
                shared::ErrorCode::BookingNotFinished,
                format!("Booking {} has not finished yet", booking.booking_no),
            )
            .with_detail("end_time", booking.end_time));
        }
        if !booking_repo::complete(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(id, BookingStatus::Completed).await);
        }
        tracing::info!(booking_no = %booking.booking_no, "Booking completed");
        self.get(scope, id).await
    }

    /// CONFIRMED → NO_SHOW
    pub async fn mark_no_show(&self, scope: ScopeFilter, id: i64) -> AppResult<Booking> {
        let booking = self.get(scope, id).await?;
        if !booking.status.can_transition_to(BookingStatus::NoShow) {
            return Err(transition_error(&booking, BookingStatus::NoShow));
        }
        let now = shared::util::now_millis();
        if !booking_repo::mark_no_show(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(id, BookingStatus::NoShow).await);
        }
        tracing::info!(booking_no = %booking.booking_no, "Booking marked no-show");
        self.get(scope, id).await
    }

    /// One-shot review of a completed booking
    pub async fn review(
        &self,
        scope: ScopeFilter,
        id: i64,
        review: BookingReview,
    ) -> AppResult<Booking> {
        if !(1..=5).contains(&review.rating) {
            return Err(AppError::validation(format!(
                "Rating must be between 1 and 5, got {}",
                review.rating
            )));
        }
        let booking = self.get(scope, id).await?;
        if booking.rating.is_some() {
            return Err(AppError::already_reviewed());
        }
        if booking.status != BookingStatus::Completed {
            return Err(AppError::invalid_transition(
                "booking",
                booking.status.as_str(),
                "reviewed",
            ));
        }
        let now = shared::util::now_millis();
        if !booking_repo::set_review(&self.pool, id, review.rating, review.comment.as_deref(), now)
            .await?
        {
            // Guard lost a race: either a concurrent review landed first or
            // the status moved. Re-read and classify.
            let current = self.get(scope, id).await?;
            if current.rating.is_some() {
                return Err(AppError::already_reviewed());
            }
            return Err(AppError::invalid_transition(
                "booking",
                current.status.as_str(),
                "reviewed",
            ));
        }
        tracing::info!(booking_no = %booking.booking_no, rating = review.rating, "Booking reviewed");
        self.get(scope, id).await
    }

    /// Move a non-terminal booking to a new interval. The conflict check is
    /// re-run against the new interval (excluding this booking) inside the
    /// update transaction.
    pub async fn reschedule(
        &self,
        scope: ScopeFilter,
        id: i64,
        dto: BookingReschedule,
    ) -> AppResult<Booking> {
        let range = TimeRange::new(dto.start_time, dto.end_time)?;
        let booking = self.get(scope, id).await?;
        if booking.status.is_terminal() {
            return Err(AppError::invalid_transition(
                "booking",
                booking.status.as_str(),
                "rescheduled",
            ));
        }

        let mut resources = vec![ResourceRef::Member(booking.member_id)];
        if let Some(coach_id) = booking.coach_id {
            resources.push(ResourceRef::Coach(coach_id));
        }

        let mut retried = false;
        loop {
            match self.try_reschedule(id, range, &resources).await {
                Ok(()) => {
                    tracing::info!(booking_no = %booking.booking_no, "Booking rescheduled");
                    return self.get(scope, id).await;
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable(err)) if !retried => {
                    retried = true;
                    tracing::warn!(error = %err, "Write conflict on reschedule, retrying once");
                }
                Err(AttemptError::Retryable(err)) => {
                    return Err(AppError::time_conflict(err.to_string()));
                }
            }
        }
    }

    async fn try_reschedule(
        &self,
        id: i64,
        range: TimeRange,
        resources: &[ResourceRef],
    ) -> AttemptResult<()> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        let exclude = Some(Exclude {
            source: ConflictSource::Booking,
            id,
        });
        let report = conflict::check(&mut tx, range, resources, exclude).await?;
        if report.has_conflict() {
            return Err(conflict_error(&report).into());
        }

        if !booking_repo::update_times(&mut tx, id, range.start, range.end, now).await? {
            drop(tx);
            return Err(AttemptError::Fatal(AppError::invalid_transition(
                "booking",
                "terminal",
                "rescheduled",
            )));
        }
        tx.commit().await.map_err(RepoError::from)?;
        Ok(())
    }

    /// Soft delete; only terminal bookings leave the books
    pub async fn remove(&self, scope: ScopeFilter, id: i64) -> AppResult<()> {
        let booking = self.get(scope, id).await?;
        let now = shared::util::now_millis();
        if !booking_repo::soft_delete(&self.pool, id, now).await? {
            return Err(AppError::validation(format!(
                "Booking {} is still active; cancel or complete it first",
                booking.booking_no
            )));
        }
        tracing::info!(booking_no = %booking.booking_no, "Booking removed");
        Ok(())
    }

    /// Fetch one booking in scope
    pub async fn get(&self, scope: ScopeFilter, id: i64) -> AppResult<Booking> {
        booking_repo::find_by_id(&self.pool, scope, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking {id}")))
    }

    /// Paginated list with member/coach/status/date filters
    pub async fn list(
        &self,
        scope: ScopeFilter,
        filter: BookingFilter,
        page: PaginationQuery,
    ) -> AppResult<PaginatedResponse<Booking>> {
        let total = booking_repo::count(&self.pool, scope, &filter).await?;
        let items =
            booking_repo::list(&self.pool, scope, &filter, page.limit(), page.offset()).await?;
        Ok(PaginatedResponse::new(items, total, page.page, page.limit()))
    }

    /// All references on the creation payload must resolve inside the scope
    async fn check_references(&self, scope: ScopeFilter, dto: &BookingCreate) -> AppResult<()> {
        catalog_repo::find_store(&self.pool, scope, dto.store_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {}", dto.store_id)))?;
        catalog_repo::find_member(&self.pool, scope, dto.member_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Member {}", dto.member_id)))?;
        catalog_repo::find_course(&self.pool, scope, dto.course_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Course {}", dto.course_id)))?;
        if let Some(coach_id) = dto.coach_id {
            catalog_repo::find_coach(&self.pool, scope, coach_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Coach {coach_id}")))?;
        }
        if let Some(card_id) = dto.card_id {
            let card = card_repo::find_by_id(&self.pool, scope, card_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Card {card_id}")))?;
            if card.member_id != dto.member_id {
                return Err(AppError::validation(format!(
                    "Card {} belongs to another member",
                    card.card_number
                ))
                .with_detail("card_id", card_id));
            }
        }
        if let Some(schedule_id) = dto.schedule_id {
            schedule_repo::find_by_id(&self.pool, scope, schedule_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Schedule {schedule_id}")))?;
        }
        Ok(())
    }

    /// A guarded transition affected zero rows: the row changed between the
    /// read and the write. Re-read and report the real obstacle.
    async fn classify_guard_failure(&self, id: i64, target: BookingStatus) -> AppError {
        match booking_repo::current_status(&self.pool, id).await {
            Ok(Some(current)) => {
                AppError::invalid_transition("booking", current.as_str(), target.as_str())
            }
            Ok(None) => AppError::not_found(format!("Booking {id}")),
            Err(err) => err.into(),
        }
    }
}

/// Consume one session inside the creation transaction
async fn consume_entitlement(
    tx: &mut sqlx::SqliteConnection,
    card_id: i64,
    now: i64,
) -> AttemptResult<()> {
    let card = card_repo::find_by_id_in(tx, card_id)
        .await?
        .ok_or_else(|| AttemptError::Fatal(AppError::not_found(format!("Card {card_id}"))))?;
    if let Some(blocker) = card.consume_blocker(now) {
        return Err(AttemptError::Fatal(AppError::insufficient_entitlement(
            blocker.as_str(),
        )));
    }
    if !card_repo::consume(tx, card_id, card.version, now).await? {
        // Version moved underneath us; surface as retryable so the whole
        // unit re-reads and re-checks.
        return Err(AttemptError::Retryable(RepoError::WriteConflict(format!(
            "Card {card_id} version moved"
        ))));
    }
    Ok(())
}

/// Register the attendee on the class session inside the creation transaction
async fn register_attendee(
    tx: &mut sqlx::SqliteConnection,
    schedule_id: i64,
    now: i64,
) -> AttemptResult<()> {
    if schedule_repo::add_participant(tx, schedule_id, now).await? {
        return Ok(());
    }
    let err = match schedule_repo::find_by_id_in(tx, schedule_id).await? {
        None => AppError::not_found(format!("Schedule {schedule_id}")),
        Some(s) if s.is_full() => AppError::schedule_full(schedule_id),
        Some(s) => AppError::validation(format!(
            "Schedule {} is {} and not open for booking",
            schedule_id,
            s.status.as_str()
        )),
    };
    Err(AttemptError::Fatal(err))
}

fn transition_error(booking: &Booking, target: BookingStatus) -> AppError {
    AppError::invalid_transition("booking", booking.status.as_str(), target.as_str())
}

fn conflict_error(report: &ConflictReport) -> AppError {
    let mut err = AppError::time_conflict("Requested interval overlaps an existing reservation");
    if let Some(rc) = report.first() {
        err = err
            .with_detail("resource", rc.resource.label())
            .with_detail("resource_id", rc.resource.id())
            .with_detail("overlaps", rc.hits.len() as i64);
    }
    err
}
