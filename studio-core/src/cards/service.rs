//! Card Service

use crate::db::repository::{RepoError, card as card_repo, catalog as catalog_repo};
use shared::models::{Card, CardCreate, CardFilter, CardKind, CardStatus};
use shared::{AppError, AppResult, ErrorCode, PaginatedResponse, PaginationQuery, ScopeFilter};
use sqlx::SqlitePool;

/// Stateless domain service for the entitlement ledger
#[derive(Clone)]
pub struct CardService {
    pool: SqlitePool,
}

impl CardService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a card in INACTIVE status with a generated card number.
    ///
    /// Personal-training cards must be coach-bound; a parent reference must
    /// be a membership card of the same member.
    pub async fn issue(&self, scope: ScopeFilter, dto: CardCreate) -> AppResult<Card> {
        if dto.total_sessions < 1 {
            return Err(AppError::validation(format!(
                "total_sessions must be at least 1, got {}",
                dto.total_sessions
            )));
        }
        if dto.kind == CardKind::PersonalTraining && dto.coach_id.is_none() {
            return Err(AppError::validation(
                "Personal-training cards must be bound to a coach",
            ));
        }

        catalog_repo::find_store(&self.pool, scope, dto.store_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Store {}", dto.store_id)))?;
        catalog_repo::find_member(&self.pool, scope, dto.member_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Member {}", dto.member_id)))?;
        if let Some(coach_id) = dto.coach_id {
            catalog_repo::find_coach(&self.pool, scope, coach_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Coach {coach_id}")))?;
        }
        if let Some(parent_id) = dto.parent_card_id {
            let parent = card_repo::find_by_id(&self.pool, scope, parent_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Card {parent_id}")))?;
            if parent.kind != CardKind::Membership {
                return Err(AppError::validation(
                    "Parent card must be a membership card",
                ));
            }
            if parent.member_id != dto.member_id {
                return Err(AppError::validation(
                    "Parent card belongs to another member",
                ));
            }
        }

        // Card numbers carry a random suffix; on the rare collision we
        // regenerate once before giving up.
        let mut retried = false;
        loop {
            let now = shared::util::now_millis();
            let card = Card {
                id: shared::util::snowflake_id(),
                card_number: shared::util::card_number(dto.kind, now),
                kind: dto.kind,
                member_id: dto.member_id,
                store_id: dto.store_id,
                parent_card_id: dto.parent_card_id,
                coach_id: dto.coach_id,
                total_sessions: dto.total_sessions,
                used_sessions: 0,
                price: dto.price,
                status: CardStatus::Inactive,
                issue_date: now,
                activation_date: None,
                expiry_date: dto.expiry_date,
                validity_days: dto.validity_days,
                version: 0,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            };
            match card_repo::insert(&self.pool, &card).await {
                Ok(()) => {
                    tracing::info!(card_number = %card.card_number, kind = ?card.kind, "Card issued");
                    return Ok(card);
                }
                Err(RepoError::Duplicate(_)) if !retried => {
                    retried = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// INACTIVE → ACTIVE. A card scoped under a parent membership card can
    /// only be activated while the parent itself is active.
    pub async fn activate(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let card = self.get(scope, id).await?;
        if card.status != CardStatus::Inactive {
            return Err(transition_error(&card, CardStatus::Active));
        }
        let now = shared::util::now_millis();
        if let Some(parent_id) = card.parent_card_id {
            let parent = card_repo::find_by_id(&self.pool, scope, parent_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Card {parent_id}")))?;
            if !parent.is_active_at(now) {
                return Err(AppError::with_message(
                    ErrorCode::ParentCardInactive,
                    format!("Parent card {} is not active", parent.card_number),
                ));
            }
        }
        if !card_repo::activate(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, CardStatus::Active).await);
        }
        tracing::info!(card_number = %card.card_number, "Card activated");
        self.get(scope, id).await
    }

    /// Consume one session.
    ///
    /// Guarded by the card's version: two concurrent consumers reading
    /// used_sessions = N can never both write N + 1. A pure version race is
    /// retried once; every other rejection surfaces as
    /// InsufficientEntitlement with the blocking reason.
    pub async fn consume(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let mut retried = false;
        loop {
            let card = self.get(scope, id).await?;
            let now = shared::util::now_millis();
            if let Some(blocker) = card.consume_blocker(now) {
                tracing::warn!(card_number = %card.card_number, reason = blocker.as_str(), "Consumption rejected");
                return Err(AppError::insufficient_entitlement(blocker.as_str()));
            }

            let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
            if card_repo::consume(&mut conn, id, card.version, now).await? {
                drop(conn);
                let updated = self.get(scope, id).await?;
                tracing::info!(
                    card_number = %updated.card_number,
                    used = updated.used_sessions,
                    total = updated.total_sessions,
                    "Session consumed"
                );
                return Ok(updated);
            }
            drop(conn);

            if retried {
                // Two failed guards in a row: the card is moving under real
                // contention; the re-read on the next call will classify.
                return Err(AppError::insufficient_entitlement("version_conflict"));
            }
            retried = true;
        }
    }

    /// Give one session back (booking cancellation path)
    pub async fn release(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let card = self.get(scope, id).await?;
        let now = shared::util::now_millis();
        let mut conn = self.pool.acquire().await.map_err(RepoError::from)?;
        if !card_repo::release_session(&mut conn, id, now).await? {
            return Err(AppError::validation(format!(
                "Card {} has no consumed session to release",
                card.card_number
            )));
        }
        drop(conn);
        self.get(scope, id).await
    }

    /// ACTIVE → FROZEN; a second freeze is rejected
    pub async fn freeze(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let card = self.get(scope, id).await?;
        if !card.status.can_transition_to(CardStatus::Frozen) {
            return Err(transition_error(&card, CardStatus::Frozen));
        }
        let now = shared::util::now_millis();
        if !card_repo::freeze(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, CardStatus::Frozen).await);
        }
        tracing::info!(card_number = %card.card_number, "Card frozen");
        self.get(scope, id).await
    }

    /// FROZEN → ACTIVE
    pub async fn unfreeze(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let card = self.get(scope, id).await?;
        if card.status != CardStatus::Frozen {
            return Err(transition_error(&card, CardStatus::Active));
        }
        let now = shared::util::now_millis();
        if !card_repo::unfreeze(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, CardStatus::Active).await);
        }
        tracing::info!(card_number = %card.card_number, "Card unfrozen");
        self.get(scope, id).await
    }

    /// Any non-terminal status → EXPIRED
    pub async fn expire(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let card = self.get(scope, id).await?;
        if !card.status.can_transition_to(CardStatus::Expired) {
            return Err(transition_error(&card, CardStatus::Expired));
        }
        let now = shared::util::now_millis();
        if !card_repo::expire(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, CardStatus::Expired).await);
        }
        tracing::info!(card_number = %card.card_number, "Card expired");
        self.get(scope, id).await
    }

    /// Bulk entry point for the periodic expiry sweep. Returns how many
    /// cards moved to EXPIRED.
    pub async fn expire_due(&self, now: i64) -> AppResult<u64> {
        let swept = card_repo::expire_due(&self.pool, now).await?;
        if swept > 0 {
            tracing::info!(swept, "Expiry sweep moved cards to EXPIRED");
        }
        Ok(swept)
    }

    /// Any non-terminal status → REFUNDED (terminal). The explicit workflow
    /// for cards with consumed sessions.
    pub async fn refund(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        let card = self.get(scope, id).await?;
        if !card.status.can_transition_to(CardStatus::Refunded) {
            return Err(transition_error(&card, CardStatus::Refunded));
        }
        let now = shared::util::now_millis();
        if !card_repo::refund(&self.pool, id, now).await? {
            return Err(self.classify_guard_failure(scope, id, CardStatus::Refunded).await);
        }
        tracing::info!(card_number = %card.card_number, "Card refunded");
        self.get(scope, id).await
    }

    /// Soft delete. Blocked once any session has been consumed; refund is
    /// the way out for partially-used cards.
    pub async fn remove(&self, scope: ScopeFilter, id: i64) -> AppResult<()> {
        let card = self.get(scope, id).await?;
        if card.used_sessions > 0 {
            return Err(AppError::with_message(
                ErrorCode::CardInUse,
                format!(
                    "Card {} has {} consumed sessions; refund it instead",
                    card.card_number, card.used_sessions
                ),
            ));
        }
        let now = shared::util::now_millis();
        if !card_repo::soft_delete(&self.pool, id, now).await? {
            // A consumption landed between the read and the delete guard
            return Err(AppError::new(ErrorCode::CardInUse));
        }
        tracing::info!(card_number = %card.card_number, "Card removed");
        Ok(())
    }

    /// Fetch one card in scope
    pub async fn get(&self, scope: ScopeFilter, id: i64) -> AppResult<Card> {
        card_repo::find_by_id(&self.pool, scope, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Card {id}")))
    }

    /// Paginated list with member/kind/status filters
    pub async fn list(
        &self,
        scope: ScopeFilter,
        filter: CardFilter,
        page: PaginationQuery,
    ) -> AppResult<PaginatedResponse<Card>> {
        let total = card_repo::count(&self.pool, scope, &filter).await?;
        let items =
            card_repo::list(&self.pool, scope, &filter, page.limit(), page.offset()).await?;
        Ok(PaginatedResponse::new(items, total, page.page, page.limit()))
    }

    async fn classify_guard_failure(
        &self,
        scope: ScopeFilter,
        id: i64,
        target: CardStatus,
    ) -> AppError {
        match card_repo::find_by_id(&self.pool, scope, id).await {
            Ok(Some(current)) => {
                AppError::invalid_transition("card", current.status.as_str(), target.as_str())
            }
            Ok(None) => AppError::not_found(format!("Card {id}")),
            Err(err) => err.into(),
        }
    }
}

fn transition_error(card: &Card, target: CardStatus) -> AppError {
    AppError::invalid_transition("card", card.status.as_str(), target.as_str())
}
