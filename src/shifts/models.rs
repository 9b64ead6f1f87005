use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::ServiceError;
use crate::shifts::admission::{check_admission, Decision};
use crate::shifts::Slot;
use crate::store::RecordStore;
use crate::users::User;

/// The slot a member picked for a date. There is at most one per member, team and date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shift {
    pub id: i64,
    pub user_id: i64,
    /// always the team the member belonged to when picking
    pub team_id: i64,
    pub date: NaiveDate,
    pub slot: Slot,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShift {
    pub user_id: i64,
    pub team_id: i64,
    pub date: NaiveDate,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Assigned,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentResult {
    pub status: AssignmentStatus,
    /// the stored shift, when assigned
    pub shift: Option<Shift>,
    /// the capacity check, absent for a day off
    pub decision: Option<Decision>,
}

///
/// **POST /api/shifts**
///
/// Pick a slot for a date of the active week.
///
/// ``` shell
/// curl --location --request POST 'localhost:8080/api/shifts' \
///     --header 'Content-Type: application/json' \
///     --data-raw '{ "date": "2025-01-06", "slot": "10:00-23:00" }'
/// ```
#[derive(Debug, Deserialize)]
pub struct PickShift {
    pub date: String,
    pub slot: String,
}

impl AssignmentResult {
    /// a short sentence explaining the result to the member
    pub fn describe(&self, date: NaiveDate, slot: &Slot) -> String {
        match (self.status, self.decision) {
            (AssignmentStatus::Assigned, _) if slot.is_no_shift() => {
                format!("Done! You have {} off.", date)
            }
            (AssignmentStatus::Assigned, _) => format!("Done! You work {} on {}.", slot, date),
            (AssignmentStatus::Denied, Some(decision)) => format!(
                "{} on {} is full: {} of {} places are taken. Pick another slot.",
                slot,
                date,
                decision.current_count,
                decision.limit.unwrap_or_default()
            ),
            (AssignmentStatus::Denied, None) => format!("{} on {} is full.", slot, date),
        }
    }
}

impl Shift {
    /// Whether `user` may pick `slot` on `date`, ignoring the shift they hold themselves.
    ///
    /// Members without a role can't match any limit and are always admitted.
    pub fn admission_for(
        user: &User,
        team_id: i64,
        date: NaiveDate,
        slot: &Slot,
        store: &dyn RecordStore,
    ) -> Result<Decision, ServiceError> {
        match user.role {
            Some(role) => check_admission(team_id, date, role, slot, Some(user.id), store),
            None => Ok(Decision::unbounded()),
        }
    }

    /// Store `slot` as the member's shift on `date` when capacity allows it.
    ///
    /// Only active members of `team_id` can pick. Calling this again with the
    /// same arguments changes nothing. A day off is stored without any
    /// capacity check.
    #[tracing::instrument(skip(store))]
    pub fn assign(
        user_id: i64,
        team_id: i64,
        date: NaiveDate,
        slot: Slot,
        store: &dyn RecordStore,
    ) -> Result<AssignmentResult, ServiceError> {
        let user = User::find(user_id, store)?;
        if user.team_id()? != team_id {
            forbidden!("you can only pick shifts in your own team");
        }

        if slot.is_no_shift() {
            let shift = Shift::upsert(user_id, team_id, date, slot, store)?;
            return Ok(AssignmentResult {
                status: AssignmentStatus::Assigned,
                shift: Some(shift),
                decision: None,
            });
        }

        let decision = Shift::admission_for(&user, team_id, date, &slot, store)?;
        if !decision.admitted {
            info!(
                "user {} was denied {} on {} ({}/{:?})",
                user_id, slot, date, decision.current_count, decision.limit
            );
            return Ok(AssignmentResult {
                status: AssignmentStatus::Denied,
                shift: None,
                decision: Some(decision),
            });
        }

        let shift = Shift::upsert(user_id, team_id, date, slot, store)?;

        Ok(AssignmentResult {
            status: AssignmentStatus::Assigned,
            shift: Some(shift),
            decision: Some(decision),
        })
    }

    fn upsert(
        user_id: i64,
        team_id: i64,
        date: NaiveDate,
        slot: Slot,
        store: &dyn RecordStore,
    ) -> Result<Shift, ServiceError> {
        match store.find_shift(user_id, team_id, date)? {
            Some(existing) if existing.slot == slot => Ok(existing),
            Some(existing) => store.update_shift_slot(existing.id, &slot),
            None => store.insert_shift(&NewShift {
                user_id,
                team_id,
                date,
                slot,
            }),
        }
    }

    /// all shifts of a team between two dates, both included
    pub fn between(
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        store: &dyn RecordStore,
    ) -> Result<Vec<Shift>, ServiceError> {
        store.shifts_between(team_id, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{Limit, NewLimit};
    use crate::shifts::SlotCatalog;
    use crate::store::memory::MemoryStore;
    use crate::teams::Team;
    use crate::users::Role;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd(2025, 1, 6)
    }

    fn slot(token: &str) -> Slot {
        SlotCatalog::default().parse(token).unwrap()
    }

    fn team_with_member(store: &MemoryStore, role: Role) -> (i64, User) {
        let mut owner = User::ensure("tg:owner", "Owner", store).unwrap();
        let team = Team::create("Bar Central", &mut owner, store).unwrap();
        let mut member = User::ensure("tg:anna", "Anna", store).unwrap();
        member.join(team.id, store).unwrap();
        let member = member.set_role(role, store).unwrap();
        (team.id, member)
    }

    fn day_limit(store: &MemoryStore, team_id: i64, role: Role, max_count: i64) {
        Limit::set(
            &NewLimit {
                team_id,
                date: monday(),
                slot: None,
                role,
                max_count,
            },
            store,
        )
        .unwrap();
    }

    #[test]
    fn assigning_twice_keeps_one_shift() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);

        let first = Shift::assign(anna.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();
        let second = Shift::assign(anna.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();

        assert_eq!(first.status, AssignmentStatus::Assigned);
        assert_eq!(second.status, AssignmentStatus::Assigned);
        let shifts = store.shifts_on(team_id, monday()).unwrap();
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].slot, slot("10:00-23:00"));
    }

    #[test]
    fn repicking_updates_in_place() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);

        let first = Shift::assign(anna.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();
        let second = Shift::assign(anna.id, team_id, monday(), slot("17:00-23:00"), &store).unwrap();

        let first = first.shift.unwrap();
        let second = second.shift.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.slot, slot("17:00-23:00"));
        assert_eq!(store.shifts_on(team_id, monday()).unwrap().len(), 1);
    }

    #[test]
    fn member_at_the_limit_can_switch_slots() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);
        day_limit(&store, team_id, Role::Employee, 1);

        Shift::assign(anna.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();
        let result = Shift::assign(anna.id, team_id, monday(), slot("12:00-23:00"), &store).unwrap();

        assert_eq!(result.status, AssignmentStatus::Assigned);
    }

    #[test]
    fn denied_assignments_write_nothing() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);
        day_limit(&store, team_id, Role::Employee, 1);
        Shift::assign(anna.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();

        let mut boris = User::ensure("tg:boris", "Boris", &store).unwrap();
        boris.join(team_id, &store).unwrap();
        boris.set_role(Role::Employee, &store).unwrap();

        let result = Shift::assign(boris.id, team_id, monday(), slot("17:00-23:00"), &store).unwrap();

        assert_eq!(result.status, AssignmentStatus::Denied);
        assert!(result.shift.is_none());
        let decision = result.decision.unwrap();
        assert_eq!(decision.current_count, 1);
        assert_eq!(decision.limit, Some(1));
        assert!(store.find_shift(boris.id, team_id, monday()).unwrap().is_none());
    }

    #[test]
    fn day_off_ignores_limits() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);
        day_limit(&store, team_id, Role::Employee, 0);

        let result = Shift::assign(anna.id, team_id, monday(), Slot::day_off(), &store).unwrap();

        assert_eq!(result.status, AssignmentStatus::Assigned);
        assert!(result.decision.is_none());
        assert!(result.shift.unwrap().slot.is_no_shift());
    }

    #[test]
    fn members_without_role_are_admitted() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);
        day_limit(&store, team_id, Role::Employee, 0);

        let mut boris = User::ensure("tg:boris", "Boris", &store).unwrap();
        boris.join(team_id, &store).unwrap();

        let denied = Shift::assign(anna.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();
        let admitted =
            Shift::assign(boris.id, team_id, monday(), slot("10:00-23:00"), &store).unwrap();

        assert_eq!(denied.status, AssignmentStatus::Denied);
        assert_eq!(admitted.status, AssignmentStatus::Assigned);
    }

    #[test]
    fn shifts_stay_in_the_members_team() {
        let store = MemoryStore::default();
        let (team_id, anna) = team_with_member(&store, Role::Employee);

        let result = Shift::assign(anna.id, team_id + 1, monday(), slot("10:00-23:00"), &store);

        assert!(result.is_err());
    }

    #[test]
    fn outsiders_cannot_take_a_day_off_in_a_team() {
        let store = MemoryStore::default();
        let (team_id, _) = team_with_member(&store, Role::Employee);
        let stranger = User::ensure("tg:stranger", "Stranger", &store).unwrap();

        let result = Shift::assign(stranger.id, team_id, monday(), Slot::day_off(), &store);

        match result {
            Err(ServiceError::Forbidden(_)) => {}
            other => panic!("expected forbidden, got {:?}", other),
        }
        assert!(store.shifts_on(team_id, monday()).unwrap().is_empty());
    }

    #[test]
    fn denial_is_explained() {
        let result = AssignmentResult {
            status: AssignmentStatus::Denied,
            shift: None,
            decision: Some(Decision {
                admitted: false,
                current_count: 2,
                limit: Some(2),
                scope: crate::limits::LimitScope::Slot,
            }),
        };

        assert_eq!(
            result.describe(monday(), &slot("10:00-23:00")),
            "10:00-23:00 on 2025-01-06 is full: 2 of 2 places are taken. Pick another slot."
        );
    }
}
