use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use crate::db;
use crate::errors::ServiceError;
use crate::limits::{Limit, NewLimit};
use crate::schema::{limits, shifts, teams, users, weeks};
use crate::shifts::{NewShift, Shift, Slot};
use crate::store::RecordStore;
use crate::teams::{NewTeam, Team};
use crate::users::{NewUser, Role, User};
use crate::weeks::{NewWeek, Week};

/// Records in postgres, every call checks a connection out of the pool.
pub struct PgStore {
    pool: db::Pool,
}

impl PgStore {
    pub fn new(pool: db::Pool) -> PgStore {
        PgStore { pool }
    }

    fn conn(&self) -> Result<db::Conn, ServiceError> {
        Ok(self.pool.get()?)
    }
}

// roles and slots are plain varchars in the database

#[derive(Queryable)]
struct UserRow {
    id: i64,
    external_identity: String,
    display_name: String,
    team_id: Option<i64>,
    role: Option<String>,
    is_owner: bool,
    is_admin: bool,
    is_active: bool,
    left_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = ServiceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            external_identity: row.external_identity,
            display_name: row.display_name,
            team_id: row.team_id,
            role: row.role.map(|role| role.parse::<Role>()).transpose()?,
            is_owner: row.is_owner,
            is_admin: row.is_admin,
            is_active: row.is_active,
            left_at: row.left_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable)]
struct ShiftRow {
    id: i64,
    user_id: i64,
    team_id: i64,
    date: NaiveDate,
    slot: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            user_id: row.user_id,
            team_id: row.team_id,
            date: row.date,
            slot: Slot::stored(row.slot),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable)]
struct LimitRow {
    id: i64,
    team_id: i64,
    date: NaiveDate,
    slot: Option<String>,
    role: String,
    max_count: i64,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<LimitRow> for Limit {
    type Error = ServiceError;

    fn try_from(row: LimitRow) -> Result<Self, Self::Error> {
        Ok(Limit {
            id: row.id,
            team_id: row.team_id,
            date: row.date,
            slot: row.slot.map(Slot::stored),
            role: row.role.parse()?,
            max_count: row.max_count,
            created_at: row.created_at,
        })
    }
}

fn users_from(rows: Vec<UserRow>) -> Result<Vec<User>, ServiceError> {
    rows.into_iter().map(User::try_from).collect()
}

fn limits_from(rows: Vec<LimitRow>) -> Result<Vec<Limit>, ServiceError> {
    rows.into_iter().map(Limit::try_from).collect()
}

impl RecordStore for PgStore {
    fn insert_team(&self, team: &NewTeam) -> Result<Team, ServiceError> {
        let conn = self.conn()?;

        let team = diesel::insert_into(teams::table)
            .values(team)
            .get_result::<Team>(&conn)?;

        Ok(team)
    }

    fn find_team(&self, id: i64) -> Result<Option<Team>, ServiceError> {
        let conn = self.conn()?;

        let team = teams::table.find(id).first::<Team>(&conn).optional()?;

        Ok(team)
    }

    fn find_team_by_invite_code(&self, code: &str) -> Result<Option<Team>, ServiceError> {
        let conn = self.conn()?;

        let team = teams::table
            .filter(teams::invite_code.eq(code))
            .first::<Team>(&conn)
            .optional()?;

        Ok(team)
    }

    fn update_invite_code(&self, team_id: i64, code: &str) -> Result<Team, ServiceError> {
        let conn = self.conn()?;

        let team = diesel::update(teams::table.find(team_id))
            .set(teams::invite_code.eq(code))
            .get_result::<Team>(&conn)?;

        Ok(team)
    }

    fn insert_user(&self, user: &NewUser) -> Result<User, ServiceError> {
        let conn = self.conn()?;

        let row = diesel::insert_into(users::table)
            .values(user)
            .get_result::<UserRow>(&conn)?;

        User::try_from(row)
    }

    fn find_user(&self, id: i64) -> Result<Option<User>, ServiceError> {
        let conn = self.conn()?;

        let row = users::table.find(id).first::<UserRow>(&conn).optional()?;

        row.map(User::try_from).transpose()
    }

    fn find_user_by_identity(&self, identity: &str) -> Result<Option<User>, ServiceError> {
        let conn = self.conn()?;

        let row = users::table
            .filter(users::external_identity.eq(identity))
            .first::<UserRow>(&conn)
            .optional()?;

        row.map(User::try_from).transpose()
    }

    fn find_users(&self, ids: &[i64]) -> Result<Vec<User>, ServiceError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let conn = self.conn()?;

        let rows = users::table
            .filter(users::id.eq_any(ids.to_vec()))
            .load::<UserRow>(&conn)?;

        users_from(rows)
    }

    fn team_members(&self, team_id: i64) -> Result<Vec<User>, ServiceError> {
        let conn = self.conn()?;

        let rows = users::table
            .filter(users::team_id.eq(team_id))
            .order(users::id.asc())
            .load::<UserRow>(&conn)?;

        users_from(rows)
    }

    fn update_user(&self, user: &User) -> Result<User, ServiceError> {
        let conn = self.conn()?;

        let row = diesel::update(users::table.find(user.id))
            .set((
                users::display_name.eq(&user.display_name),
                users::team_id.eq(user.team_id),
                users::role.eq(user.role.map(Role::as_str)),
                users::is_owner.eq(user.is_owner),
                users::is_admin.eq(user.is_admin),
                users::is_active.eq(user.is_active),
                users::left_at.eq(user.left_at),
            ))
            .get_result::<UserRow>(&conn)?;

        User::try_from(row)
    }

    fn active_week(&self, team_id: i64) -> Result<Option<Week>, ServiceError> {
        let conn = self.conn()?;

        let week = weeks::table
            .filter(weeks::team_id.eq(team_id))
            .filter(weeks::is_active.eq(true))
            .first::<Week>(&conn)
            .optional()?;

        Ok(week)
    }

    fn activate_week(&self, week: &NewWeek) -> Result<Week, ServiceError> {
        let conn = self.conn()?;

        conn.transaction::<Week, ServiceError, _>(|| {
            diesel::update(
                weeks::table
                    .filter(weeks::team_id.eq(week.team_id))
                    .filter(weeks::is_active.eq(true)),
            )
            .set(weeks::is_active.eq(false))
            .execute(&conn)?;

            let week = diesel::insert_into(weeks::table)
                .values(week)
                .get_result::<Week>(&conn)?;

            Ok(week)
        })
    }

    fn find_shift(
        &self,
        user_id: i64,
        team_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Shift>, ServiceError> {
        let conn = self.conn()?;

        let row = shifts::table
            .filter(shifts::user_id.eq(user_id))
            .filter(shifts::team_id.eq(team_id))
            .filter(shifts::date.eq(date))
            .first::<ShiftRow>(&conn)
            .optional()?;

        Ok(row.map(Shift::from))
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
        let conn = self.conn()?;

        let rows = shifts::table
            .filter(shifts::team_id.eq(team_id))
            .filter(shifts::date.between(from, to))
            .order(shifts::id.asc())
            .load::<ShiftRow>(&conn)?;

        Ok(rows.into_iter().map(Shift::from).collect())
    }

    fn insert_shift(&self, shift: &NewShift) -> Result<Shift, ServiceError> {
        let conn = self.conn()?;

        let row = diesel::insert_into(shifts::table)
            .values((
                shifts::user_id.eq(shift.user_id),
                shifts::team_id.eq(shift.team_id),
                shifts::date.eq(shift.date),
                shifts::slot.eq(shift.slot.as_str()),
            ))
            .get_result::<ShiftRow>(&conn)?;

        Ok(Shift::from(row))
    }

    fn update_shift_slot(&self, shift_id: i64, slot: &Slot) -> Result<Shift, ServiceError> {
        let conn = self.conn()?;

        let row = diesel::update(shifts::table.find(shift_id))
            .set((
                shifts::slot.eq(slot.as_str()),
                shifts::updated_at.eq(Some(Utc::now())),
            ))
            .get_result::<ShiftRow>(&conn)?;

        Ok(Shift::from(row))
    }

    fn limits_for(
        &self,
        team_id: i64,
        date: NaiveDate,
        role: Role,
    ) -> Result<Vec<Limit>, ServiceError> {
        let conn = self.conn()?;

        let rows = limits::table
            .filter(limits::team_id.eq(team_id))
            .filter(limits::date.eq(date))
            .filter(limits::role.eq(role.as_str()))
            .order(limits::id.asc())
            .load::<LimitRow>(&conn)?;

        limits_from(rows)
    }

    fn limits_between(
        &self,
        team_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Limit>, ServiceError> {
        let conn = self.conn()?;

        let rows = limits::table
            .filter(limits::team_id.eq(team_id))
            .filter(limits::date.between(from, to))
            .order((limits::date.asc(), limits::id.asc()))
            .load::<LimitRow>(&conn)?;

        limits_from(rows)
    }

    fn upsert_limit(&self, limit: &NewLimit) -> Result<Limit, ServiceError> {
        let conn = self.conn()?;

        let row = conn.transaction::<LimitRow, ServiceError, _>(|| {
            let same_key = limits::table
                .filter(limits::team_id.eq(limit.team_id))
                .filter(limits::date.eq(limit.date))
                .filter(limits::role.eq(limit.role.as_str()));

            let existing = match &limit.slot {
                Some(slot) => same_key
                    .filter(limits::slot.eq(slot.as_str()))
                    .select(limits::id)
                    .first::<i64>(&conn)
                    .optional()?,
                None => same_key
                    .filter(limits::slot.is_null())
                    .select(limits::id)
                    .first::<i64>(&conn)
                    .optional()?,
            };

            let row = match existing {
                Some(id) => diesel::update(limits::table.find(id))
                    .set(limits::max_count.eq(limit.max_count))
                    .get_result::<LimitRow>(&conn)?,
                None => diesel::insert_into(limits::table)
                    .values((
                        limits::team_id.eq(limit.team_id),
                        limits::date.eq(limit.date),
                        limits::slot.eq(limit.slot.as_ref().map(Slot::as_str)),
                        limits::role.eq(limit.role.as_str()),
                        limits::max_count.eq(limit.max_count),
                    ))
                    .get_result::<LimitRow>(&conn)?,
            };

            Ok(row)
        })?;

        Limit::try_from(row)
    }
}
