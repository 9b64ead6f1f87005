use chrono::{DateTime, Utc};
use rand::Rng;

use crate::errors::ServiceError;
use crate::schema::teams;
use crate::store::RecordStore;
use crate::users::User;
use crate::validator::Validator;

/// invite codes avoid characters that are easy to confuse when typed over
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const INVITE_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub invite_code: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "teams"]
pub struct NewTeam {
    pub name: String,
    pub invite_code: String,
}

///
/// **POST /api/teams**
///
/// The creator becomes owner and administrator of the new team.
///
/// ``` shell
/// curl --location --request POST 'localhost:8080/api/teams' \
///     --header 'Content-Type: application/json' \
///     --data-raw '{ "name": "Bar Central" }'
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTeam {
    pub name: String,
}

/// **POST /api/teams/join**
#[derive(Debug, Deserialize)]
pub struct JoinTeam {
    pub invite_code: String,
}

impl Team {
    /// Creates a team and makes `owner` its owner and administrator.
    ///
    /// The team row and the owner update are two separate writes, when the
    /// second one fails the team exists without members.
    #[tracing::instrument(skip(store))]
    pub fn create(
        name: &str,
        owner: &mut User,
        store: &dyn RecordStore,
    ) -> Result<Team, ServiceError> {
        let request = Validator::new(CreateTeam {
            name: name.trim().to_string(),
        })
        .validate()?;

        let team = store.insert_team(&NewTeam {
            name: request.name,
            invite_code: generate_invite_code(),
        })?;

        owner.team_id = Some(team.id);
        owner.is_owner = true;
        owner.is_admin = true;
        owner.is_active = true;
        owner.left_at = None;
        store.update_user(owner)?;

        info!("user {} created team {}", owner.id, team.id);

        Ok(team)
    }

    pub fn find(id: i64, store: &dyn RecordStore) -> Result<Team, ServiceError> {
        store.find_team(id)?.ok_or(ServiceError::NotFound)
    }

    /// Join the team behind an invite code. Codes are matched case-insensitively,
    /// an unknown code is not an error.
    #[tracing::instrument(skip(user, store))]
    pub fn join(
        invite_code: &str,
        user: &mut User,
        store: &dyn RecordStore,
    ) -> Result<Option<Team>, ServiceError> {
        let code = invite_code.trim().to_uppercase();
        if code.is_empty() {
            return Ok(None);
        }

        let team = match store.find_team_by_invite_code(&code)? {
            Some(team) => team,
            None => return Ok(None),
        };

        user.join(team.id, store)?;
        info!("user {} joined team {}", user.id, team.id);

        Ok(Some(team))
    }

    /// Replace the invite code, the old one stops working immediately
    pub fn rotate_invite_code(&self, store: &dyn RecordStore) -> Result<Team, ServiceError> {
        store.update_invite_code(self.id, &generate_invite_code())
    }
}

pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_LENGTH)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0, INVITE_ALPHABET.len())] as char)
        .collect()
}

impl crate::validator::Validate<CreateTeam> for CreateTeam {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            bad_request!("the team name is too short");
        }

        if self.name.chars().count() > 64 {
            bad_request!("the team name is too long, maximum 64 characters");
        }

        if self.name.contains('\n') {
            bad_request!("the team name should fit on a single line");
        }

        Ok(())
    }
}
