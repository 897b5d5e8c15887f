//! Entitlement Card Model (会员卡 / 私教卡 / 团课卡)
//!
//! A card is a purchased bundle of sessions linked to a member. Three kinds
//! share one shape and one lifecycle: INACTIVE at purchase, ACTIVE after
//! activation, reversibly FROZEN, and terminally EXPIRED or REFUNDED.
//! Session consumption itself is persistence-guarded (optimistic version
//! column) in studio-core; the pure rules live here.

use serde::{Deserialize, Serialize};

/// Card kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum CardKind {
    /// General membership card; may parent coach-bound and group cards
    #[serde(rename = "MEMBERSHIP")]
    #[cfg_attr(feature = "db", sqlx(rename = "MEMBERSHIP"))]
    Membership,
    /// Personal-training card, bound to a coach
    #[serde(rename = "PERSONAL_TRAINING")]
    #[cfg_attr(feature = "db", sqlx(rename = "PERSONAL_TRAINING"))]
    PersonalTraining,
    /// Group-class card
    #[serde(rename = "GROUP_CLASS")]
    #[cfg_attr(feature = "db", sqlx(rename = "GROUP_CLASS"))]
    GroupClass,
}

impl CardKind {
    /// Card-number prefix for this kind
    pub fn number_prefix(self) -> &'static str {
        match self {
            CardKind::Membership => "MC",
            CardKind::PersonalTraining => "PT",
            CardKind::GroupClass => "GC",
        }
    }
}

/// Card status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum CardStatus {
    #[serde(rename = "INACTIVE")]
    #[cfg_attr(feature = "db", sqlx(rename = "INACTIVE"))]
    Inactive,
    #[serde(rename = "ACTIVE")]
    #[cfg_attr(feature = "db", sqlx(rename = "ACTIVE"))]
    Active,
    #[serde(rename = "FROZEN")]
    #[cfg_attr(feature = "db", sqlx(rename = "FROZEN"))]
    Frozen,
    #[serde(rename = "EXPIRED")]
    #[cfg_attr(feature = "db", sqlx(rename = "EXPIRED"))]
    Expired,
    #[serde(rename = "REFUNDED")]
    #[cfg_attr(feature = "db", sqlx(rename = "REFUNDED"))]
    Refunded,
}

impl CardStatus {
    pub const ALL: [CardStatus; 5] = [
        CardStatus::Inactive,
        CardStatus::Active,
        CardStatus::Frozen,
        CardStatus::Expired,
        CardStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Inactive => "INACTIVE",
            CardStatus::Active => "ACTIVE",
            CardStatus::Frozen => "FROZEN",
            CardStatus::Expired => "EXPIRED",
            CardStatus::Refunded => "REFUNDED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CardStatus::Expired | CardStatus::Refunded)
    }

    /// Whether the ledger transition `self → next` is permitted.
    ///
    /// Expiry and refund are reachable from any non-terminal status; the
    /// freeze cycle only moves between ACTIVE and FROZEN.
    pub fn can_transition_to(self, next: CardStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            CardStatus::Active => matches!(self, CardStatus::Inactive | CardStatus::Frozen),
            CardStatus::Frozen => matches!(self, CardStatus::Active),
            CardStatus::Expired | CardStatus::Refunded => true,
            CardStatus::Inactive => false,
        }
    }
}

/// Card entity (DB row / snapshot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Card {
    pub id: i64,
    /// Business number, unique, prefixed by kind (`MC…`, `PT…`, `GC…`)
    pub card_number: String,
    pub kind: CardKind,
    pub member_id: i64,
    pub store_id: i64,
    /// Membership card this card hangs under, if any
    pub parent_card_id: Option<i64>,
    /// Coach binding (personal-training cards)
    pub coach_id: Option<i64>,
    pub total_sessions: i64,
    pub used_sessions: i64,
    pub price: f64,
    pub status: CardStatus,
    /// Unix millis
    pub issue_date: i64,
    pub activation_date: Option<i64>,
    pub expiry_date: Option<i64>,
    /// Validity period applied at activation when expiry_date is unset
    pub validity_days: Option<i64>,
    /// Optimistic-lock counter, bumped by every consuming write
    pub version: i64,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Card {
    /// `status == ACTIVE AND (expiry_date absent OR expiry_date >= now)`
    pub fn is_active_at(&self, now: i64) -> bool {
        self.status == CardStatus::Active && !self.is_expired_at(now)
    }

    /// Past its expiry date, regardless of status
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < now)
    }

    /// All sessions consumed. Independent of status: an exhausted card stays
    /// in its current status until the caller decides policy.
    pub fn is_exhausted(&self) -> bool {
        self.used_sessions >= self.total_sessions
    }

    /// Sessions still consumable (counter only, ignores status/expiry)
    pub fn remaining_sessions(&self) -> i64 {
        (self.total_sessions - self.used_sessions).max(0)
    }

    /// Why a consumption would be rejected right now, if it would be
    pub fn consume_blocker(&self, now: i64) -> Option<ConsumeBlocker> {
        if self.status != CardStatus::Active {
            return Some(ConsumeBlocker::NotActive(self.status));
        }
        if self.is_expired_at(now) {
            return Some(ConsumeBlocker::Expired);
        }
        if self.is_exhausted() {
            return Some(ConsumeBlocker::Exhausted);
        }
        None
    }
}

/// Reason a session consumption is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeBlocker {
    NotActive(CardStatus),
    Expired,
    Exhausted,
}

impl ConsumeBlocker {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsumeBlocker::NotActive(_) => "not_active",
            ConsumeBlocker::Expired => "expired",
            ConsumeBlocker::Exhausted => "exhausted",
        }
    }
}

/// Create card payload (purchase)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCreate {
    pub member_id: i64,
    pub store_id: i64,
    pub kind: CardKind,
    /// Membership card to scope this card under
    pub parent_card_id: Option<i64>,
    /// Required for PERSONAL_TRAINING
    pub coach_id: Option<i64>,
    pub total_sessions: i64,
    #[serde(default)]
    pub price: f64,
    pub expiry_date: Option<i64>,
    pub validity_days: Option<i64>,
}

/// List filter for cards
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFilter {
    pub member_id: Option<i64>,
    pub kind: Option<CardKind>,
    pub status: Option<CardStatus>,
}
