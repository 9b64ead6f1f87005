use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::errors::ServiceError;
use crate::shifts::{Shift, Slot};
use crate::users::{Role, User};
use crate::weeks::WeekDay;

/// shown for a day a member didn't pick anything for
pub const PLACEHOLDER: &str = "-";

const NAME_HEADER: &str = "Name";
const OTHER_TITLE: &str = "Other";

/// The week's schedule: one column per day, members grouped by role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    /// day labels, e.g. `Mon 06.01`
    pub columns: Vec<String>,
    pub groups: Vec<GridGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGroup {
    pub title: String,
    /// `None` for the members without a role
    pub role: Option<Role>,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub user_id: i64,
    pub name: String,
    /// one cell per column
    pub cells: Vec<String>,
}

/// Lay out `shifts` for `week_days`.
///
/// Groups follow `Role::ALL`, members without a role come last. Members who
/// left the team and empty groups are not shown.
pub fn render_grid(users: &[User], week_days: &[WeekDay], shifts: &[Shift]) -> Grid {
    let mut slots: HashMap<(i64, NaiveDate), &Slot> = HashMap::with_capacity(shifts.len());
    for shift in shifts {
        slots.entry((shift.user_id, shift.date)).or_insert(&shift.slot);
    }

    let mut active: Vec<&User> = users.iter().filter(|user| user.is_active).collect();
    active.sort_by_key(|user| user.display_name.to_lowercase());

    let row = |user: &User| GridRow {
        user_id: user.id,
        name: user.display_name.clone(),
        cells: week_days
            .iter()
            .map(|day| match slots.get(&(user.id, day.iso_date)) {
                Some(slot) => slot.to_string(),
                None => PLACEHOLDER.to_string(),
            })
            .collect(),
    };

    let mut groups: Vec<GridGroup> = Role::ALL
        .iter()
        .map(|role| GridGroup {
            title: role.title().to_string(),
            role: Some(*role),
            rows: active
                .iter()
                .filter(|user| user.role == Some(*role))
                .map(|user| row(*user))
                .collect(),
        })
        .collect();

    groups.push(GridGroup {
        title: OTHER_TITLE.to_string(),
        role: None,
        rows: active
            .iter()
            .filter(|user| user.role.is_none())
            .map(|user| row(*user))
            .collect(),
    });

    groups.retain(|group| !group.rows.is_empty());

    Grid {
        columns: week_days.iter().map(WeekDay::label).collect(),
        groups,
    }
}

impl Grid {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The grid as a spreadsheet: a header row, then a title row per group
    /// followed by its members.
    pub fn to_csv(&self) -> Result<String, ServiceError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(vec![]);

        let mut header = vec![NAME_HEADER.to_string()];
        header.extend(self.columns.iter().cloned());

        let written = (|| -> Result<(), csv::Error> {
            writer.write_record(&header)?;
            for group in &self.groups {
                writer.write_record(&[group.title.as_str()])?;
                for row in &group.rows {
                    writer.write_record(std::iter::once(&row.name).chain(row.cells.iter()))?;
                }
            }
            writer.flush()?;
            Ok(())
        })();

        if let Err(e) = written {
            error!("unable to write the schedule as csv: {}", e);
            return Err(ServiceError::InternalServerError);
        }

        let bytes = writer.into_inner().map_err(|e| {
            error!("unable to finish the schedule csv: {}", e);
            ServiceError::InternalServerError
        })?;

        String::from_utf8(bytes).map_err(|e| {
            error!("schedule csv is not valid utf-8: {}", e);
            ServiceError::InternalServerError
        })
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths = vec![NAME_HEADER.chars().count()];
        widths.extend(self.columns.iter().map(|column| column.chars().count()));

        for group in &self.groups {
            for row in &group.rows {
                widths[0] = widths[0].max(row.name.chars().count());
                for (i, cell) in row.cells.iter().enumerate() {
                    widths[i + 1] = widths[i + 1].max(cell.chars().count());
                }
            }
        }

        widths
    }
}

/// fixed width text table, as sent back to chat clients
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();

        write!(f, "{:<width$}", NAME_HEADER, width = widths[0])?;
        for (column, width) in self.columns.iter().zip(&widths[1..]) {
            write!(f, " | {:<width$}", column, width = width)?;
        }
        writeln!(f)?;

        let total = widths.iter().sum::<usize>() + 3 * self.columns.len();
        writeln!(f, "{}", "-".repeat(total))?;

        for group in &self.groups {
            writeln!(f, "[{}]", group.title)?;
            for row in &group.rows {
                write!(f, "{:<width$}", row.name, width = widths[0])?;
                for (cell, width) in row.cells.iter().zip(&widths[1..]) {
                    write!(f, " | {:<width$}", cell, width = width)?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}
