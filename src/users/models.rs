use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::errors::ServiceError;
use crate::schema::users;
use crate::store::RecordStore;
use crate::validator::Validator;

/// The job a member does, limits are configured per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Barman,
    Host,
    Runner,
    Admin,
    Trainee,
}

impl Role {
    /// display order of the schedule groups
    pub const ALL: [Role; 6] = [
        Role::Employee,
        Role::Barman,
        Role::Host,
        Role::Runner,
        Role::Admin,
        Role::Trainee,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Barman => "barman",
            Role::Host => "host",
            Role::Runner => "runner",
            Role::Admin => "admin",
            Role::Trainee => "trainee",
        }
    }

    /// heading used for a group of members in the schedule
    pub fn title(self) -> &'static str {
        match self {
            Role::Employee => "Waiters",
            Role::Barman => "Bar",
            Role::Host => "Hosts",
            Role::Runner => "Runners",
            Role::Admin => "Admins",
            Role::Trainee => "Trainees",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        match Role::ALL.iter().find(|role| role.as_str() == wanted) {
            Some(role) => Ok(*role),
            None => Err(ServiceError::BadRequest(format!(
                "unknown role '{}', expected one of employee, barman, host, runner, admin, trainee",
                s.trim()
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    /// the chat account this member talks to us from
    pub external_identity: String,
    pub display_name: String,
    pub team_id: Option<i64>,
    pub role: Option<Role>,
    pub is_owner: bool,
    pub is_admin: bool,
    pub is_active: bool,
    pub left_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub external_identity: String,
    pub display_name: String,
}

/// sent by a role change request
#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

impl User {
    /// Find the member behind a chat account, registering it on first contact.
    ///
    /// A new user belongs to no team and has no role.
    #[tracing::instrument(skip(store))]
    pub fn ensure(
        external_identity: &str,
        display_name: &str,
        store: &dyn RecordStore,
    ) -> Result<User, ServiceError> {
        if let Some(user) = store.find_user_by_identity(external_identity)? {
            return Ok(user);
        }

        let new_user = Validator::new(NewUser {
            external_identity: external_identity.to_string(),
            display_name: display_name.to_string(),
        })
        .validate()?;

        let user = store.insert_user(&new_user)?;
        info!("registered user {} as {}", user.id, user.display_name);

        Ok(user)
    }

    pub fn find(id: i64, store: &dyn RecordStore) -> Result<User, ServiceError> {
        store.find_user(id)?.ok_or(ServiceError::NotFound)
    }

    /// members of a team, including the ones who left
    pub fn members(team_id: i64, store: &dyn RecordStore) -> Result<Vec<User>, ServiceError> {
        let mut members = store.team_members(team_id)?;
        members.sort_by(|a, b| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()));
        Ok(members)
    }

    /// the team of an active member, or an error explaining why there is none
    pub fn team_id(&self) -> Result<i64, ServiceError> {
        match self.team_id {
            Some(team_id) if self.is_active => Ok(team_id),
            Some(_) => Err(ServiceError::Forbidden(
                "you are no longer an active member of this team".to_string(),
            )),
            None => Err(ServiceError::Forbidden(
                "you are not a member of any team".to_string(),
            )),
        }
    }

    /// returns true if a user may manage the team's weeks, limits and roles
    pub fn can_manage(&self) -> bool {
        self.is_active && (self.is_admin || self.is_owner)
    }

    /// Roles are read at check time, so a change also moves the member's
    /// existing shifts to the new role's capacity.
    pub fn set_role(&mut self, role: Role, store: &dyn RecordStore) -> Result<User, ServiceError> {
        self.role = Some(role);
        store.update_user(self)
    }

    /// A deactivated member keeps their shifts but no longer counts towards any limit.
    pub fn deactivate(&mut self, store: &dyn RecordStore) -> Result<User, ServiceError> {
        if self.is_owner {
            forbidden!("the team owner can't be deactivated");
        }
        self.is_active = false;
        self.left_at = Some(Utc::now());
        store.update_user(self)
    }

    /// Move the user into a team as a plain member.
    pub fn join(&mut self, team_id: i64, store: &dyn RecordStore) -> Result<User, ServiceError> {
        self.team_id = Some(team_id);
        self.is_owner = false;
        self.is_admin = false;
        self.is_active = true;
        self.left_at = None;
        store.update_user(self)
    }
}

impl crate::validator::Validate<NewUser> for NewUser {
    fn validate(&self) -> Result<(), ServiceError> {
        lazy_static! {
            static ref IDENTITY_PATTERN: Regex =
                Regex::new(r"^[0-9A-Za-z@._:-]+$").expect("invalid identity regex");
        }

        if self.external_identity.trim().is_empty() {
            bad_request!("the external identity can't be empty");
        }

        if self.external_identity.len() > 64 {
            bad_request!("the external identity is too long, max 64 characters");
        }

        if !IDENTITY_PATTERN.is_match(&self.external_identity) {
            bad_request!("the external identity contains invalid characters");
        }

        if self.display_name.trim().is_empty() {
            bad_request!("the display name can't be empty");
        }

        if self.display_name.chars().count() > 64 {
            bad_request!("the display name is too long, max 64 characters");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn roles_parse_case_insensitive() {
        assert_eq!("Barman".parse::<Role>().unwrap(), Role::Barman);
        assert_eq!(" employee ".parse::<Role>().unwrap(), Role::Employee);
        assert!("cook".parse::<Role>().is_err());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let serialized = serde_json::to_string(&Role::Trainee).unwrap();

        assert_eq!(serialized, "\"trainee\"");
    }

    #[test]
    fn empty_identity() {
        let user = NewUser {
            external_identity: String::from(""),
            display_name: String::from("Anna"),
        };

        assert!(Validator::new(user).validate().is_err());
    }

    #[test]
    fn identity_with_spaces() {
        let user = NewUser {
            external_identity: String::from("12 34"),
            display_name: String::from("Anna"),
        };

        assert!(Validator::new(user).validate().is_err());
    }

    #[test]
    fn valid_identity() {
        let user = NewUser {
            external_identity: String::from("tg:123456789"),
            display_name: String::from("Anna Petrova"),
        };

        assert!(Validator::new(user).validate().is_ok());
    }

    #[test]
    fn ensure_registers_once() {
        let store = MemoryStore::default();

        let first = User::ensure("tg:1", "Anna", &store).unwrap();
        let second = User::ensure("tg:1", "Anna P.", &store).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name, "Anna");
        assert!(second.team_id.is_none());
        assert!(second.is_active);
    }

    #[test]
    fn owner_cannot_be_deactivated() {
        let store = MemoryStore::default();
        let mut user = User::ensure("tg:1", "Anna", &store).unwrap();
        user.is_owner = true;

        assert!(user.deactivate(&store).is_err());
    }

    #[test]
    fn deactivated_members_have_no_team() {
        let store = MemoryStore::default();
        let mut user = User::ensure("tg:1", "Anna", &store).unwrap();
        user.join(7, &store).unwrap();
        assert_eq!(user.team_id().unwrap(), 7);

        let user = user.deactivate(&store).unwrap();

        assert!(user.left_at.is_some());
        assert!(user.team_id().is_err());
        assert!(!user.can_manage());
    }
}
