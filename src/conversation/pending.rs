use std::fmt::Display;

use chrono::NaiveDate;
use shiftboard_sessions::SessionKey;

use crate::shifts::Slot;
use crate::users::Role;

/// What a day is being picked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Shift,
    Limit,
}

/// Where a conversation is in a multi step flow, i.e. what the next free
/// text message is an answer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Pending {
    Idle,
    AwaitingTeamName,
    AwaitingInviteCode,
    AwaitingDate {
        purpose: Purpose,
    },
    AwaitingSlot {
        purpose: Purpose,
        date: NaiveDate,
    },
    AwaitingRole {
        date: NaiveDate,
        /// `None` limits the whole day
        slot: Option<Slot>,
    },
    AwaitingCount {
        date: NaiveDate,
        slot: Option<Slot>,
        role: Role,
    },
}

impl Default for Pending {
    fn default() -> Self {
        Pending::Idle
    }
}

impl SessionKey for Pending {
    fn session_key<T: Display>(conversation_id: T) -> String {
        format!("conversation.{}.pending", conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_tagged_by_state() {
        let pending = Pending::AwaitingSlot {
            purpose: Purpose::Shift,
            date: NaiveDate::from_ymd(2025, 1, 6),
        };

        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["state"], "awaiting_slot");
        assert_eq!(json["purpose"], "shift");
        assert_eq!(json["date"], "2025-01-06");

        let restored: Pending = serde_json::from_value(json).unwrap();
        assert_eq!(restored, pending);
    }

    #[test]
    fn keys_are_per_conversation() {
        assert_eq!(Pending::session_key("42"), "conversation.42.pending");
    }
}
