use std::fmt;

use regex::Regex;

use crate::errors::ServiceError;

/// canonical spelling of the "not working that day" marker
pub const DAY_OFF: &str = "day off";

/// Tokens meaning the member doesn't work that day. They can always be
/// picked and never count towards a limit.
const NO_SHIFT_MARKERS: &[&str] = &[DAY_OFF, "off", "вых", "-"];

/// offered instead of a slot when a limit should cover the whole day
pub const WHOLE_DAY: &str = "whole day";

/// A concrete working time range from the catalog, or the day off marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(String);

impl Slot {
    pub fn day_off() -> Slot {
        Slot(DAY_OFF.to_string())
    }

    /// wraps a value read back from the store, it was validated when written
    pub(crate) fn stored(raw: String) -> Slot {
        Slot(raw)
    }

    pub fn is_no_shift(&self) -> bool {
        is_no_shift_marker(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn is_no_shift_marker(token: &str) -> bool {
    let token = token.trim().to_lowercase();
    NO_SHIFT_MARKERS.iter().any(|marker| *marker == token)
}

/// The fixed list of slots a team's members can pick from.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCatalog {
    slots: Vec<String>,
}

impl SlotCatalog {
    /// Every token has to be a `HH:MM-HH:MM` range that ends after it starts.
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Result<SlotCatalog, ServiceError> {
        lazy_static! {
            static ref TIME_RANGE: Regex =
                Regex::new(r"^([01]\d|2[0-3]):[0-5]\d-([01]\d|2[0-3]):[0-5]\d$")
                    .expect("invalid time range regex");
        }

        let mut slots: Vec<String> = Vec::with_capacity(tokens.len());

        for token in tokens {
            let token = token.as_ref().trim();

            if !TIME_RANGE.is_match(token) {
                bad_request!("'{}' is not a HH:MM-HH:MM time range", token);
            }

            let (start, end) = token.split_at(5);
            if start >= &end[1..] {
                bad_request!("the slot '{}' ends before it starts", token);
            }

            if !slots.iter().any(|slot| slot == token) {
                slots.push(token.to_string());
            }
        }

        if slots.is_empty() {
            bad_request!("the slot catalog can't be empty");
        }

        Ok(SlotCatalog { slots })
    }

    /// Parse a slot picked by a member: a catalog slot or any of the day off markers.
    pub fn parse(&self, input: &str) -> Result<Slot, ServiceError> {
        if is_no_shift_marker(input) {
            return Ok(Slot::day_off());
        }

        self.parse_working(input)
    }

    /// Parse a catalog slot, day off markers are rejected.
    pub fn parse_working(&self, input: &str) -> Result<Slot, ServiceError> {
        let input = input.trim();

        match self.slots.iter().find(|slot| *slot == input) {
            Some(slot) => Ok(Slot(slot.clone())),
            None => Err(ServiceError::BadRequest(format!(
                "'{}' is not one of the available slots: {}",
                input,
                self.slots.join(", ")
            ))),
        }
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// what a member can pick for a day, the day off marker last
    pub fn choices(&self) -> Vec<String> {
        let mut choices = self.slots.clone();
        choices.push(DAY_OFF.to_string());
        choices
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        SlotCatalog {
            slots: vec![
                "09:30-23:00".to_string(),
                "10:00-23:00".to_string(),
                "11:00-23:00".to_string(),
                "12:00-23:00".to_string(),
                "13:00-23:00".to_string(),
                "17:00-23:00".to_string(),
            ],
        }
    }
}
