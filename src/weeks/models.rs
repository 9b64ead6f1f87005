use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::errors::ServiceError;
use crate::schema::weeks;
use crate::store::RecordStore;

/// a week always spans monday up to and including sunday
const WEEK_LENGTH: i64 = 7;

/// labels by position in the week, a week is always shown as starting on monday
/// Picked by position in the range, not by the calendar weekday of the date.
/// Activated weeks start on a Monday, so both agree for them.
const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// The 7-day period a team is currently picking shifts for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable)]
pub struct Week {
    pub id: i64,
    pub team_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "weeks"]
pub struct NewWeek {
    pub team_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// One calendar day of a week as it's shown to members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekDay {
    /// Mon, Tue, ...
    pub weekday_label: String,
    /// dd.mm
    pub display_date: String,
    pub iso_date: NaiveDate,
}

/// **GET /api/weeks/active**
#[derive(Debug, Serialize)]
pub struct ActiveWeek {
    pub week: Week,
    pub days: Vec<WeekDay>,
}

/// **POST /api/weeks**, any date inside the wanted week
#[derive(Debug, Deserialize)]
pub struct ActivateWeek {
    pub date: String,
}

impl Week {
    /// The week a team is currently scheduling, if it opened one.
    pub fn active(team_id: i64, store: &dyn RecordStore) -> Result<Option<Week>, ServiceError> {
        store.active_week(team_id)
    }

    /// Open the week containing `date` for the team, closing the week that was active.
    #[tracing::instrument(skip(store))]
    pub fn activate(
        team_id: i64,
        date: NaiveDate,
        store: &dyn RecordStore,
    ) -> Result<Week, ServiceError> {
        let start_date = monday_of(date);

        let week = store.activate_week(&NewWeek {
            team_id,
            start_date,
            end_date: start_date + Duration::days(WEEK_LENGTH - 1),
            is_active: true,
        })?;

        info!(
            "team {} is now scheduling {} - {}",
            team_id, week.start_date, week.end_date
        );

        Ok(week)
    }

    pub fn days(&self) -> Vec<WeekDay> {
        expand_week(self.start_date, self.end_date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Every day from `start_date` up to and including `end_date`. Days are
/// labeled by their position in the range, so the first one is always `Mon`.
/// An inverted range has no days.
pub fn expand_week(start_date: NaiveDate, end_date: NaiveDate) -> Vec<WeekDay> {
    let days = (end_date - start_date).num_days() + 1;

    (0..days.max(0))
        .map(|offset| {
            let date = start_date + Duration::days(offset);
            WeekDay {
                weekday_label: WEEKDAY_LABELS[(offset % WEEK_LENGTH) as usize].to_string(),
                display_date: date.format("%d.%m").to_string(),
                iso_date: date,
            }
        })
        .collect()
}

/// the monday on or before `date`
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// parse an ISO `YYYY-MM-DD` date sent by a client
pub fn parse_date(input: &str) -> Result<NaiveDate, ServiceError> {
    match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        Ok(date) => Ok(date),
        Err(_) => Err(ServiceError::BadRequest(format!(
            "'{}' is not a valid date, expected YYYY-MM-DD",
            input.trim()
        ))),
    }
}

impl WeekDay {
    /// the label members pick a day by, e.g. `Mon 06.01`
    pub fn label(&self) -> String {
        format!("{} {}", self.weekday_label, self.display_date)
    }

    /// accepts the day's label as well as its ISO date
    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim();
        self.label().eq_ignore_ascii_case(input) || self.iso_date.to_string() == input
    }
}
