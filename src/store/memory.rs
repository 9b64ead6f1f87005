use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use crate::errors::ServiceError;
use crate::limits::{Limit, NewLimit};
use crate::shifts::{NewShift, Shift, Slot};
use crate::store::RecordStore;
use crate::teams::{NewTeam, Team};
use crate::users::{NewUser, Role, User};
use crate::weeks::{NewWeek, Week};

/// Keeps every record in process, nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    teams: Vec<Team>,
    users: Vec<User>,
    weeks: Vec<Week>,
    shifts: Vec<Shift>,
    limits: Vec<Limit>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, ServiceError> {
        self.tables.lock().map_err(|_| {
            error!("memory store lock is poisoned");
            ServiceError::InternalServerError
        })
    }
}

impl RecordStore for MemoryStore {
    fn insert_team(&self, team: &NewTeam) -> Result<Team, ServiceError> {
        let mut tables = self.tables()?;

        if tables.teams.iter().any(|t| t.invite_code == team.invite_code) {
            conflict!("invite code {} is already in use", team.invite_code);
        }

        let team = Team {
            id: tables.next_id(),
            name: team.name.clone(),
            invite_code: team.invite_code.clone(),
            created_at: Some(Utc::now()),
        };
        tables.teams.push(team.clone());

        Ok(team)
    }

    fn find_team(&self, id: i64) -> Result<Option<Team>, ServiceError> {
        Ok(self.tables()?.teams.iter().find(|t| t.id == id).cloned())
    }

    fn find_team_by_invite_code(&self, code: &str) -> Result<Option<Team>, ServiceError> {
        Ok(self
            .tables()?
            .teams
            .iter()
            .find(|t| t.invite_code == code)
            .cloned())
    }

    fn update_invite_code(&self, team_id: i64, code: &str) -> Result<Team, ServiceError> {
        let mut tables = self.tables()?;

        if tables
            .teams
            .iter()
            .any(|t| t.id != team_id && t.invite_code == code)
        {
            conflict!("invite code {} is already in use", code);
        }

        let team = tables
            .teams
            .iter_mut()
            .find(|t| t.id == team_id)
            .ok_or(ServiceError::NotFound)?;
        team.invite_code = code.to_string();

        Ok(team.clone())
    }

    fn insert_user(&self, user: &NewUser) -> Result<User, ServiceError> {
        let mut tables = self.tables()?;

        if tables
            .users
            .iter()
            .any(|u| u.external_identity == user.external_identity)
        {
            conflict!("{} is already registered", user.external_identity);
        }

        let user = User {
            id: tables.next_id(),
            external_identity: user.external_identity.clone(),
            display_name: user.display_name.clone(),
            team_id: None,
            role: None,
            is_owner: false,
            is_admin: false,
            is_active: true,
            left_at: None,
            created_at: Some(Utc::now()),
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    fn find_user(&self, id: i64) -> Result<Option<User>, ServiceError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_identity(&self, identity: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.external_identity == identity)
            .cloned())
    }

    fn find_users(&self, ids: &[i64]) -> Result<Vec<User>, ServiceError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    fn team_members(&self, team_id: i64) -> Result<Vec<User>, ServiceError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .filter(|u| u.team_id == Some(team_id))
            .cloned()
            .collect())
    }

    fn update_user(&self, user: &User) -> Result<User, ServiceError> {
        let mut tables = self.tables()?;

        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(ServiceError::NotFound)?;

        stored.display_name = user.display_name.clone();
        stored.team_id = user.team_id;
        stored.role = user.role;
        stored.is_owner = user.is_owner;
        stored.is_admin = user.is_admin;
        stored.is_active = user.is_active;
        stored.left_at = user.left_at;

        Ok(stored.clone())
    }

    fn active_week(&self, team_id: i64) -> Result<Option<Week>, ServiceError> {
        Ok(self
            .tables()?
            .weeks
            .iter()
            .find(|w| w.team_id == team_id && w.is_active)
            .cloned())
    }

    fn activate_week(&self, week: &NewWeek) -> Result<Week, ServiceError> {
        let mut tables = self.tables()?;

        tables
            .weeks
            .iter_mut()
            .filter(|w| w.team_id == week.team_id)
            .for_each(|w| w.is_active = false);

        let week = Week {
            id: tables.next_id(),
            team_id: week.team_id,
            start_date: week.start_date,
            end_date: week.end_date,
            is_active: true,
            created_at: Some(Utc::now()),
        };
        tables.weeks.push(week.clone());

        Ok(week)
    }

    fn find_shift(
        &self,
        user_id: i64,
        team_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Shift>, ServiceError> {
        Ok(self
            .tables()?
            .shifts
            .iter()
            .find(|s| s.user_id == user_id && s.team_id == team_id && s.date == date)
            .cloned())
    }

    fn shifts_on(&self, team_id: i64, date: NaiveDate) -> Result<Vec<Shift>, ServiceError> {
        self.shifts_between(team_id, date, date)
    }

    fn shifts_between(
        &self,
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Shift>, ServiceError> {
        Ok(self
            .tables()?
            .shifts
            .iter()
            .filter(|s| s.team_id == team_id && from <= s.date && s.date <= to)
            .cloned()
            .collect())
    }

    fn insert_shift(&self, shift: &NewShift) -> Result<Shift, ServiceError> {
        let mut tables = self.tables()?;

        if tables.shifts.iter().any(|s| {
            s.user_id == shift.user_id && s.team_id == shift.team_id && s.date == shift.date
        }) {
            conflict!(
                "user {} already has a shift on {}",
                shift.user_id,
                shift.date
            );
        }

        let now = Utc::now();
        let shift = Shift {
            id: tables.next_id(),
            user_id: shift.user_id,
            team_id: shift.team_id,
            date: shift.date,
            slot: shift.slot.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.shifts.push(shift.clone());

        Ok(shift)
    }

    fn update_shift_slot(&self, shift_id: i64, slot: &Slot) -> Result<Shift, ServiceError> {
        let mut tables = self.tables()?;

        let shift = tables
            .shifts
            .iter_mut()
            .find(|s| s.id == shift_id)
            .ok_or(ServiceError::NotFound)?;
        shift.slot = slot.clone();
        shift.updated_at = Some(Utc::now());

        Ok(shift.clone())
    }

    fn limits_for(
        &self,
        team_id: i64,
        date: NaiveDate,
        role: Role,
    ) -> Result<Vec<Limit>, ServiceError> {
        // rows are appended with increasing ids, so they are already in id order
        Ok(self
            .tables()?
            .limits
            .iter()
            .filter(|l| l.team_id == team_id && l.date == date && l.role == role)
            .cloned()
            .collect())
    }

    fn limits_between(
        &self,
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Limit>, ServiceError> {
        Ok(self
            .tables()?
            .limits
            .iter()
            .filter(|l| l.team_id == team_id && from <= l.date && l.date <= to)
            .cloned()
            .collect())
    }

    fn upsert_limit(&self, limit: &NewLimit) -> Result<Limit, ServiceError> {
        let mut tables = self.tables()?;

        let existing = tables.limits.iter_mut().find(|l| {
            l.team_id == limit.team_id
                && l.date == limit.date
                && l.role == limit.role
                && l.slot == limit.slot
        });

        if let Some(existing) = existing {
            existing.max_count = limit.max_count;
            return Ok(existing.clone());
        }

        let limit = Limit {
            id: tables.next_id(),
            team_id: limit.team_id,
            date: limit.date,
            slot: limit.slot.clone(),
            role: limit.role,
            max_count: limit.max_count,
            created_at: Some(Utc::now()),
        };
        tables.limits.push(limit.clone());

        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd(2025, 1, 6)
    }

    #[test]
    fn identities_are_unique() {
        let store = MemoryStore::default();
        let user = NewUser {
            external_identity: "tg:1".to_string(),
            display_name: "Anna".to_string(),
        };

        store.insert_user(&user).unwrap();

        match store.insert_user(&user) {
            Err(ServiceError::Conflict(_)) => {}
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    fn one_shift_per_user_and_day() {
        let store = MemoryStore::default();
        let shift = NewShift {
            user_id: 1,
            team_id: 1,
            date: monday(),
            slot: Slot::day_off(),
        };

        store.insert_shift(&shift).unwrap();

        assert!(store.insert_shift(&shift).is_err());
    }

    #[test]
    fn shift_ranges_include_both_ends() {
        let store = MemoryStore::default();
        for offset in 0..3 {
            store
                .insert_shift(&NewShift {
                    user_id: 1,
                    team_id: 1,
                    date: monday() + chrono::Duration::days(offset),
                    slot: Slot::day_off(),
                })
                .unwrap();
        }

        let shifts = store
            .shifts_between(1, monday(), monday() + chrono::Duration::days(1))
            .unwrap();

        assert_eq!(shifts.len(), 2);
        assert!(store.shifts_between(2, monday(), monday()).unwrap().is_empty());
    }

    #[test]
    fn day_wide_and_slot_limits_are_separate_rows() {
        let store = MemoryStore::default();
        let mut limit = NewLimit {
            team_id: 1,
            date: monday(),
            slot: None,
            role: Role::Host,
            max_count: 2,
        };

        store.upsert_limit(&limit).unwrap();
        limit.slot = Some(Slot::stored("10:00-23:00".to_string()));
        store.upsert_limit(&limit).unwrap();
        limit.max_count = 1;
        store.upsert_limit(&limit).unwrap();

        let limits = store.limits_for(1, monday(), Role::Host).unwrap();
        assert_eq!(limits.len(), 2);
        assert!(limits[0].slot.is_none());
        assert_eq!(limits[1].max_count, 1);
    }
}
