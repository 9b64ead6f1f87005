mod grid;
pub mod routes;

pub use grid::*;

use crate::errors::ServiceError;
use crate::shifts::Shift;
use crate::store::RecordStore;
use crate::users::User;
use crate::weeks::Week;

/// The grid of the team's active week, `None` when no week is active.
pub fn active_grid(team_id: i64, store: &dyn RecordStore) -> Result<Option<Grid>, ServiceError> {
    let week = match Week::active(team_id, store)? {
        Some(week) => week,
        None => return Ok(None),
    };

    let members = User::members(team_id, store)?;
    let shifts = Shift::between(team_id, week.start_date, week.end_date, store)?;

    Ok(Some(render_grid(&members, &week.days(), &shifts)))
}
