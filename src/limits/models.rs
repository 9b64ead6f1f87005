use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::ServiceError;
use crate::shifts::Slot;
use crate::store::RecordStore;
use crate::users::Role;

/// A capacity ceiling for a role on a date. Without a slot it covers every
/// working slot of the day together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Limit {
    pub id: i64,
    pub team_id: i64,
    pub date: NaiveDate,
    pub slot: Option<Slot>,
    pub role: Role,
    pub max_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// key and value of a limit, upserted on (team_id, date, slot, role)
#[derive(Debug, Clone, PartialEq)]
pub struct NewLimit {
    pub team_id: i64,
    pub date: NaiveDate,
    pub slot: Option<Slot>,
    pub role: Role,
    pub max_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitScope {
    /// the limit only covers the requested slot
    Slot,
    /// the limit covers the whole day
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedLimit {
    /// `None` means nothing is configured and capacity is unbounded
    pub max_count: Option<i64>,
    pub scope: LimitScope,
}

///
/// **PUT /api/limits**
///
/// Leave out the slot to limit the whole day.
///
/// ``` shell
/// curl --location --request PUT 'localhost:8080/api/limits' \
///     --header 'Content-Type: application/json' \
///     --data-raw '{
///         "date": "2025-01-06",
///         "slot": "10:00-23:00",
///         "role": "employee",
///         "max_count": 2
///     }'
/// ```
#[derive(Debug, Deserialize)]
pub struct SetLimit {
    pub date: String,
    pub slot: Option<String>,
    pub role: Role,
    pub max_count: i64,
}

/// **GET /api/limits/resolve**
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub date: String,
    pub role: Role,
    pub slot: String,
}

impl ResolvedLimit {
    pub fn unbounded() -> Self {
        ResolvedLimit {
            max_count: None,
            scope: LimitScope::Day,
        }
    }
}

impl Limit {
    /// Find the ceiling that applies to one slot of a day for a role.
    ///
    /// A limit for exactly this slot wins over a day-wide limit.
    #[tracing::instrument(skip(store))]
    pub fn resolve(
        team_id: i64,
        date: NaiveDate,
        role: Role,
        slot: &Slot,
        store: &dyn RecordStore,
    ) -> Result<ResolvedLimit, ServiceError> {
        let limits = store.limits_for(team_id, date, role)?;

        Ok(resolve_from(&limits, slot))
    }

    /// Create or replace the limit for (team, date, slot, role).
    #[tracing::instrument(skip(store))]
    pub fn set(limit: &NewLimit, store: &dyn RecordStore) -> Result<Limit, ServiceError> {
        if limit.max_count < 0 {
            bad_request!("the maximum count can't be negative");
        }

        if let Some(slot) = &limit.slot {
            if slot.is_no_shift() {
                bad_request!("a day off can't be limited");
            }
        }

        let limit = store.upsert_limit(limit)?;
        info!(
            "team {} allows {} {} on {} ({})",
            limit.team_id,
            limit.max_count,
            limit.role,
            limit.date,
            limit.slot.as_ref().map(Slot::as_str).unwrap_or("whole day")
        );

        Ok(limit)
    }

    /// every limit of a team between two dates, both included
    pub fn between(
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        store: &dyn RecordStore,
    ) -> Result<Vec<Limit>, ServiceError> {
        store.limits_between(team_id, from, to)
    }
}

/// `limits` are all rows for one (team, date, role), ordered by id.
pub fn resolve_from(limits: &[Limit], slot: &Slot) -> ResolvedLimit {
    if let Some(limit) = limits.iter().find(|l| l.slot.as_ref() == Some(slot)) {
        return ResolvedLimit {
            max_count: Some(limit.max_count),
            scope: LimitScope::Slot,
        };
    }

    match limits.iter().find(|l| l.slot.is_none()) {
        Some(limit) => ResolvedLimit {
            max_count: Some(limit.max_count),
            scope: LimitScope::Day,
        },
        None => ResolvedLimit::unbounded(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shifts::SlotCatalog;
    use crate::store::memory::MemoryStore;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd(2025, 1, 6)
    }

    fn slot(token: &str) -> Slot {
        SlotCatalog::default().parse(token).unwrap()
    }

    fn limit(slot: Option<Slot>, role: Role, max_count: i64) -> NewLimit {
        NewLimit {
            team_id: 1,
            date: monday(),
            slot,
            role,
            max_count,
        }
    }

    #[test]
    fn nothing_configured_is_unbounded() {
        let store = MemoryStore::default();

        let resolved =
            Limit::resolve(1, monday(), Role::Employee, &slot("10:00-23:00"), &store).unwrap();

        assert_eq!(resolved, ResolvedLimit::unbounded());
    }

    #[test]
    fn slot_limit_overrides_day_limit() {
        let store = MemoryStore::default();
        let requested = slot("10:00-23:00");

        Limit::set(&limit(None, Role::Employee, 3), &store).unwrap();
        let resolved = Limit::resolve(1, monday(), Role::Employee, &requested, &store).unwrap();
        assert_eq!(resolved.max_count, Some(3));
        assert_eq!(resolved.scope, LimitScope::Day);

        Limit::set(&limit(Some(requested.clone()), Role::Employee, 1), &store).unwrap();
        let resolved = Limit::resolve(1, monday(), Role::Employee, &requested, &store).unwrap();
        assert_eq!(resolved.max_count, Some(1));
        assert_eq!(resolved.scope, LimitScope::Slot);
    }

    #[test]
    fn other_slots_fall_back_to_the_day_limit() {
        let store = MemoryStore::default();

        Limit::set(&limit(None, Role::Employee, 3), &store).unwrap();
        Limit::set(&limit(Some(slot("10:00-23:00")), Role::Employee, 1), &store).unwrap();

        let resolved =
            Limit::resolve(1, monday(), Role::Employee, &slot("17:00-23:00"), &store).unwrap();
        assert_eq!(resolved.max_count, Some(3));
        assert_eq!(resolved.scope, LimitScope::Day);
    }

    #[test]
    fn limits_are_per_role() {
        let store = MemoryStore::default();

        Limit::set(&limit(None, Role::Barman, 1), &store).unwrap();

        let resolved =
            Limit::resolve(1, monday(), Role::Employee, &slot("10:00-23:00"), &store).unwrap();
        assert_eq!(resolved.max_count, None);
    }

    #[test]
    fn setting_twice_replaces_the_limit() {
        let store = MemoryStore::default();

        let first = Limit::set(&limit(None, Role::Employee, 3), &store).unwrap();
        let second = Limit::set(&limit(None, Role::Employee, 5), &store).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.limits_for(1, monday(), Role::Employee).unwrap().len(), 1);
        let resolved =
            Limit::resolve(1, monday(), Role::Employee, &slot("10:00-23:00"), &store).unwrap();
        assert_eq!(resolved.max_count, Some(5));
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let store = MemoryStore::default();

        assert!(Limit::set(&limit(None, Role::Employee, -1), &store).is_err());
        assert!(Limit::set(&limit(Some(Slot::day_off()), Role::Employee, 1), &store).is_err());
    }

    #[test]
    fn zero_is_a_valid_limit() {
        let store = MemoryStore::default();

        Limit::set(&limit(None, Role::Trainee, 0), &store).unwrap();

        let resolved =
            Limit::resolve(1, monday(), Role::Trainee, &slot("10:00-23:00"), &store).unwrap();
        assert_eq!(resolved.max_count, Some(0));
    }
}
