use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::errors::ServiceError;
use crate::limits::{Limit, LimitScope, ResolvedLimit};
use crate::shifts::{Shift, Slot};
use crate::stats::Stats;
use crate::store::RecordStore;
use crate::users::{Role, User};

/// Outcome of an admission check. A denial is a regular outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub admitted: bool,
    /// members already occupying what the limit covers
    pub current_count: i64,
    pub limit: Option<i64>,
    pub scope: LimitScope,
}

impl Decision {
    /// nothing limits this request
    pub fn unbounded() -> Self {
        Decision {
            admitted: true,
            current_count: 0,
            limit: None,
            scope: LimitScope::Day,
        }
    }

    fn against(limit: ResolvedLimit, current_count: i64) -> Self {
        Decision {
            admitted: limit.max_count.map_or(true, |max| current_count < max),
            current_count,
            limit: limit.max_count,
            scope: limit.scope,
        }
    }
}

/// Decide whether `role` may take another `slot` on `date`.
///
/// Occupants are counted by their role, team and active flag as they are now,
/// not as they were when they picked the slot. `excluding_user_id` is left out of
/// the count so members can re-pick a slot they already hold.
///
/// Nothing is written: the caller stores the shift afterwards, so two
/// concurrent requests can both be admitted for the last free place.
#[tracing::instrument(skip(store))]
pub fn check_admission(
    team_id: i64,
    date: NaiveDate,
    role: Role,
    slot: &Slot,
    excluding_user_id: Option<i64>,
    store: &dyn RecordStore,
) -> Result<Decision, ServiceError> {
    if slot.is_no_shift() {
        Stats::admission(true);
        return Ok(Decision::unbounded());
    }

    let limit = Limit::resolve(team_id, date, role, slot, store)?;
    if limit.max_count.is_none() {
        Stats::admission(true);
        return Ok(Decision::unbounded());
    }

    let shifts = store.shifts_on(team_id, date)?;
    let occupant_ids = occupants(&shifts, limit.scope, slot, excluding_user_id);
    let occupants = store.find_users(&occupant_ids.into_iter().collect::<Vec<i64>>())?;
    let current_count = count_holding(&occupants, team_id, role);

    let decision = Decision::against(limit, current_count);
    Stats::admission(decision.admitted);

    debug!(
        "admission for {} on {} at {}: {}/{:?} admitted={}",
        role, date, slot, decision.current_count, decision.limit, decision.admitted
    );

    Ok(decision)
}

/// ids of the members occupying what a limit of `scope` covers
fn occupants(
    shifts: &[Shift],
    scope: LimitScope,
    slot: &Slot,
    excluding_user_id: Option<i64>,
) -> BTreeSet<i64> {
    shifts
        .iter()
        .filter(|shift| Some(shift.user_id) != excluding_user_id)
        .filter(|shift| match scope {
            LimitScope::Slot => &shift.slot == slot,
            LimitScope::Day => !shift.slot.is_no_shift(),
        })
        .map(|shift| shift.user_id)
        .collect()
}

/// members who left for another team no longer hold their old shifts
fn count_holding(occupants: &[User], team_id: i64, role: Role) -> i64 {
    occupants
        .iter()
        .filter(|user| user.is_active && user.team_id == Some(team_id))
        .filter(|user| user.role == Some(role))
        .count() as i64
}
