//! Time-Conflict Checker
//!
//! Reports temporal overlap between a candidate interval and existing
//! non-terminal reservations, independently per resource dimension (coach,
//! member). Overlap is half-open: `[s1,e1)` and `[s2,e2)` conflict iff
//! `s1 < e2 AND s2 < e1`, so touching endpoints never conflict.
//!
//! The check alone is not race-safe. Creation paths must run it over the
//! same connection as the subsequent insert, inside one transaction, and
//! retry the whole unit once on a write-time conflict signal.

use crate::db::repository::RepoResult;
use shared::AppError;
use sqlx::SqliteConnection;

/// Half-open time interval `[start, end)` in Unix millis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// Build a validated interval; rejects `start >= end`
    pub fn new(start: i64, end: i64) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::validation(format!(
                "start_time ({start}) must be before end_time ({end})"
            ))
            .with_detail("start_time", start)
            .with_detail("end_time", end));
        }
        Ok(Self { start, end })
    }

    /// Half-open overlap; touching endpoints do not conflict
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A constrained resource dimension to check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Coach(i64),
    Member(i64),
}

impl ResourceRef {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceRef::Coach(_) => "coach",
            ResourceRef::Member(_) => "member",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ResourceRef::Coach(id) | ResourceRef::Member(id) => *id,
        }
    }
}

/// Which table an overlapping record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSource {
    Booking,
    Schedule,
}

/// One overlapping record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictHit {
    pub source: ConflictSource,
    pub id: i64,
    pub range: TimeRange,
}

/// Overlaps found for one resource dimension
#[derive(Debug, Clone)]
pub struct ResourceConflicts {
    pub resource: ResourceRef,
    pub hits: Vec<ConflictHit>,
}

/// Result of a conflict check: one entry per dimension that had overlaps
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub by_resource: Vec<ResourceConflicts>,
}

impl ConflictReport {
    pub fn has_conflict(&self) -> bool {
        !self.by_resource.is_empty()
    }

    /// First conflicting dimension, for error reporting
    pub fn first(&self) -> Option<&ResourceConflicts> {
        self.by_resource.first()
    }
}

/// Record to leave out of the scan (the record being rescheduled)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exclude {
    pub source: ConflictSource,
    pub id: i64,
}

/// Scan for overlapping non-terminal reservations, per dimension.
///
/// Every dimension is checked independently: a coach-only conflict is
/// reported even when the member dimension is clear. Soft-deleted rows and
/// terminal statuses never participate.
pub async fn check(
    conn: &mut SqliteConnection,
    range: TimeRange,
    resources: &[ResourceRef],
    exclude: Option<Exclude>,
) -> RepoResult<ConflictReport> {
    let mut report = ConflictReport::default();

    for resource in resources {
        let mut hits = Vec::new();
        hits.extend(scan_bookings(conn, range, *resource, exclude).await?);
        if let ResourceRef::Coach(coach_id) = resource {
            hits.extend(scan_schedules(conn, range, *coach_id, exclude).await?);
        }
        if !hits.is_empty() {
            report.by_resource.push(ResourceConflicts {
                resource: *resource,
                hits,
            });
        }
    }

    Ok(report)
}

async fn scan_bookings(
    conn: &mut SqliteConnection,
    range: TimeRange,
    resource: ResourceRef,
    exclude: Option<Exclude>,
) -> RepoResult<Vec<ConflictHit>> {
    let sql = match resource {
        ResourceRef::Coach(_) => {
            "SELECT id, start_time, end_time FROM booking WHERE deleted_at IS NULL AND status IN ('PENDING', 'CONFIRMED') AND coach_id = ?1 AND start_time < ?2 AND end_time > ?3 AND (?4 IS NULL OR id != ?4)"
        }
        ResourceRef::Member(_) => {
            "SELECT id, start_time, end_time FROM booking WHERE deleted_at IS NULL AND status IN ('PENDING', 'CONFIRMED') AND member_id = ?1 AND start_time < ?2 AND end_time > ?3 AND (?4 IS NULL OR id != ?4)"
        }
    };
    let excluded_id = match exclude {
        Some(Exclude {
            source: ConflictSource::Booking,
            id,
        }) => Some(id),
        _ => None,
    };

    let rows = sqlx::query_as::<_, (i64, i64, i64)>(sql)
        .bind(resource.id())
        .bind(range.end)
        .bind(range.start)
        .bind(excluded_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, start, end)| ConflictHit {
            source: ConflictSource::Booking,
            id,
            range: TimeRange { start, end },
        })
        .collect())
}

async fn scan_schedules(
    conn: &mut SqliteConnection,
    range: TimeRange,
    coach_id: i64,
    exclude: Option<Exclude>,
) -> RepoResult<Vec<ConflictHit>> {
    let excluded_id = match exclude {
        Some(Exclude {
            source: ConflictSource::Schedule,
            id,
        }) => Some(id),
        _ => None,
    };

    let rows = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT id, start_time, end_time FROM course_schedule WHERE deleted_at IS NULL AND status = 'SCHEDULED' AND coach_id = ?1 AND start_time < ?2 AND end_time > ?3 AND (?4 IS NULL OR id != ?4)",
    )
    .bind(coach_id)
    .bind(range.end)
    .bind(range.start)
    .bind(excluded_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, start, end)| ConflictHit {
            source: ConflictSource::Schedule,
            id,
            range: TimeRange { start, end },
        })
        .collect())
}
