//! Persistence boundary for teams, users, weeks, shifts and limits.
//!
//! Everything above this module talks to a `RecordStore`, which lets the
//! scheduling rules run against postgres in production and against the
//! in-process tables when no database is configured (and in tests).
use chrono::NaiveDate;

use crate::errors::ServiceError;
use crate::limits::{Limit, NewLimit};
use crate::shifts::{NewShift, Shift, Slot};
use crate::teams::{NewTeam, Team};
use crate::users::{NewUser, Role, User};
use crate::weeks::{NewWeek, Week};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Typed reads and writes over the scheduling records.
///
/// Lookups that find nothing return `None` or an empty list, errors are
/// reserved for a store that can't be reached or rejects a write.
pub trait RecordStore: Send + Sync {
    fn insert_team(&self, team: &NewTeam) -> Result<Team, ServiceError>;
    fn find_team(&self, id: i64) -> Result<Option<Team>, ServiceError>;
    fn find_team_by_invite_code(&self, code: &str) -> Result<Option<Team>, ServiceError>;
    fn update_invite_code(&self, team_id: i64, code: &str) -> Result<Team, ServiceError>;

    fn insert_user(&self, user: &NewUser) -> Result<User, ServiceError>;
    fn find_user(&self, id: i64) -> Result<Option<User>, ServiceError>;
    fn find_user_by_identity(&self, identity: &str) -> Result<Option<User>, ServiceError>;
    /// unknown ids are skipped
    fn find_users(&self, ids: &[i64]) -> Result<Vec<User>, ServiceError>;
    fn team_members(&self, team_id: i64) -> Result<Vec<User>, ServiceError>;
    /// writes every mutable field of `user` back, keyed by its id
    fn update_user(&self, user: &User) -> Result<User, ServiceError>;

    fn active_week(&self, team_id: i64) -> Result<Option<Week>, ServiceError>;
    /// deactivates the team's active week and inserts `week` as the new active one
    fn activate_week(&self, week: &NewWeek) -> Result<Week, ServiceError>;

    fn find_shift(
        &self,
        user_id: i64,
        team_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Shift>, ServiceError>;
    fn shifts_on(&self, team_id: i64, date: NaiveDate) -> Result<Vec<Shift>, ServiceError>;
    fn shifts_between(
        &self,
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Shift>, ServiceError>;
    fn insert_shift(&self, shift: &NewShift) -> Result<Shift, ServiceError>;
    fn update_shift_slot(&self, shift_id: i64, slot: &Slot) -> Result<Shift, ServiceError>;

    /// all limits of a role on a date, ordered by id
    fn limits_for(
        &self,
        team_id: i64,
        date: NaiveDate,
        role: Role,
    ) -> Result<Vec<Limit>, ServiceError>;
    fn limits_between(
        &self,
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Limit>, ServiceError>;
    /// replaces the max count of the limit with the same team, date, slot and role
    fn upsert_limit(&self, limit: &NewLimit) -> Result<Limit, ServiceError>;
}
