//! Schedule Service

use crate::config::CancellationPolicy;
use crate::conflict::{self, ConflictReport, ResourceRef, TimeRange};
use crate::db::repository::{
    AttemptError, AttemptResult, RepoError, catalog as catalog_repo,
    course_schedule as schedule_repo,
};
use shared::models::booking::cancel_window_open;
use shared::models::{CourseSchedule, ScheduleCreate, ScheduleFilter, ScheduleStatus};
use shared::{AppError, AppResult, ErrorCode, PaginatedResponse, PaginationQuery, ScopeFilter};
use sqlx::SqlitePool;

/// Stateless domain service for class sessions
#[derive(Clone)]
pub struct ScheduleService {
    pool: SqlitePool,
    policy: CancellationPolicy,
}

impl ScheduleService {
    pub fn new(pool: SqlitePool, policy: CancellationPolicy) -> Self {
        Self { pool, policy }
    }

    /// Create a session in SCHEDULED status.
    ///
    /// Requires course/coach/store to exist in scope, a future start time
    /// and a clean coach conflict check run inside the insert transaction.
    pub async fn create(&self, scope: ScopeFilter, dto: ScheduleCreate) -> AppResult<CourseSchedule> {
        let range = TimeRange::new(dto.start_time, dto.end_time)?;
        let now = shared::util::now_millis();
        if dto.start_time <= now {
            return Err(AppError::with_message(
                ErrorCode::ScheduleInPast,
                "Class session must start in the future",
            )
            .with_detail("start_time", dto.start_time));
        }
        if dto.max_participants < 1 {
            return Err(AppError::validation(format!(
                "max_participants must be at least 1, got {}",
                dto.max_participants
            )));
        }

        catalog_repo::find_store(&self.pool, scope, dto.store_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {}", dto.store_id)))?;
        catalog_repo::find_coach(&self.pool, scope, dto.coach_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Coach {}", dto.coach_id)))?;
        catalog_repo::find_course(&self.pool, scope, dto.course_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Course {}", dto.course_id)))?;

        let mut retried = false;
        loop {
            match self.try_create(&dto, range).await {
                Ok(schedule) => {
                    tracing::info!(
                        schedule_id = schedule.id,
                        coach_id = schedule.coach_id,
                        "Class session created"
                    );
                    return Ok(schedule);
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable(err)) if !retried => {
                    retried = true;
                    tracing::warn!(error = %err, "Write conflict on session create, retrying once");
                }
                Err(AttemptError::Retryable(err)) => {
                    return Err(AppError::time_conflict(err.to_string()));
                }
            }
        }
    }

    async fn try_create(&self, dto: &ScheduleCreate, range: TimeRange) -> AttemptResult<CourseSchedule> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;

        let resources = [ResourceRef::Coach(dto.coach_id)];
        let report = conflict::check(&mut tx, range, &resources, None).await?;
        if report.has_conflict() {
            return Err(conflict_error(&report).into());
        }

        let schedule = CourseSchedule {
            id: shared::util::snowflake_id(),
            course_id: dto.course_id,
            coach_id: dto.coach_id,
            store_id: dto.store_id,
            start_time: range.start,
            end_time: range.end,
            max_participants: dto.max_participants,
            current_participants: 0,
            status: ScheduleStatus::Scheduled,
            cancelled_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        schedule_repo::insert(&mut tx, &schedule).await?;
        tx.commit().await.map_err(RepoError::from)?;
        Ok(schedule)
    }

    /// Cancel a session, only outside the (longer) class cancellation lead
    /// window since every registered attendee is affected
    pub async fn cancel(&self, scope: ScopeFilter, id: i64) -> AppResult<CourseSchedule> {
        let schedule = self.get(scope, id).await?;
        if !schedule.status.can_transition_to(ScheduleStatus::Cancelled) {
            return Err(transition_error(&schedule, ScheduleStatus::Cancelled));
        }
        let now = shared::util::now_millis();
        if !cancel_window_open(schedule.start_time, now, self.policy.schedule_lead_ms()) {
            tracing::warn!(schedule_id = id, "Session cancellation window closed");
            return Err(AppError::cancel_window_closed(
                self.policy.schedule_cancel_lead_min,
            ));
        }
        if !schedule_repo::cancel(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, ScheduleStatus::Cancelled).await);
        }
        tracing::info!(schedule_id = id, "Class session cancelled");
        self.get(scope, id).await
    }

    /// SCHEDULED → COMPLETED
    pub async fn complete(&self, scope: ScopeFilter, id: i64) -> AppResult<CourseSchedule> {
        let schedule = self.get(scope, id).await?;
        if !schedule.status.can_transition_to(ScheduleStatus::Completed) {
            return Err(transition_error(&schedule, ScheduleStatus::Completed));
        }
        let now = shared::util::now_millis();
        if !schedule_repo::complete(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, ScheduleStatus::Completed).await);
        }
        tracing::info!(schedule_id = id, "Class session completed");
        self.get(scope, id).await
    }

    /// Soft delete; refused while attendee bookings are still registered
    pub async fn remove(&self, scope: ScopeFilter, id: i64) -> AppResult<()> {
        let schedule = self.get(scope, id).await?;
        if schedule.current_participants > 0 {
            return Err(AppError::with_message(
                ErrorCode::ScheduleHasParticipants,
                format!(
                    "Class session {} still has {} registered participants",
                    id, schedule.current_participants
                ),
            ));
        }
        let now = shared::util::now_millis();
        if !schedule_repo::soft_delete(&self.pool, id, now).await? {
            // Lost a race with a late registration
            return Err(AppError::new(ErrorCode::ScheduleHasParticipants));
        }
        tracing::info!(schedule_id = id, "Class session removed");
        Ok(())
    }

    /// Fetch one session in scope
    pub async fn get(&self, scope: ScopeFilter, id: i64) -> AppResult<CourseSchedule> {
        schedule_repo::find_by_id(&self.pool, scope, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Schedule {id}")))
    }

    /// Paginated list with coach/course/status/date filters
    pub async fn list(
        &self,
        scope: ScopeFilter,
        filter: ScheduleFilter,
        page: PaginationQuery,
    ) -> AppResult<PaginatedResponse<CourseSchedule>> {
        let total = schedule_repo::count(&self.pool, scope, &filter).await?;
        let items =
            schedule_repo::list(&self.pool, scope, &filter, page.limit(), page.offset()).await?;
        Ok(PaginatedResponse::new(items, total, page.page, page.limit()))
    }

    async fn classify_guard_failure(
        &self,
        scope: ScopeFilter,
        id: i64,
        target: ScheduleStatus,
    ) -> AppError {
        match schedule_repo::find_by_id(&self.pool, scope, id).await {
            Ok(Some(current)) => {
                AppError::invalid_transition("schedule", current.status.as_str(), target.as_str())
            }
            Ok(None) => AppError::not_found(format!("Schedule {id}")),
            Err(err) => err.into(),
        }
    }
}

fn transition_error(schedule: &CourseSchedule, target: ScheduleStatus) -> AppError {
    AppError::invalid_transition("schedule", schedule.status.as_str(), target.as_str())
}

fn conflict_error(report: &ConflictReport) -> AppError {
    let mut err = AppError::time_conflict("Coach already has a reservation in this interval");
    if let Some(rc) = report.first() {
        err = err
            .with_detail("resource", rc.resource.label())
            .with_detail("resource_id", rc.resource.id())
            .with_detail("overlaps", rc.hits.len() as i64);
    }
    err
}
