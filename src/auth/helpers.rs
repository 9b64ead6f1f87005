use actix_identity::Identity;

use crate::errors::ServiceError;
use crate::store::RecordStore;
use crate::users::User;

/// get the user_id remembered for the current request
/// returns Unauthorized when nobody is remembered
pub fn get_user_id(id: &Identity) -> Result<i64, ServiceError> {
    let identity = match id.identity() {
        Some(identity) => identity,
        None => return Err(ServiceError::Unauthorized),
    };

    match identity.parse::<i64>() {
        Ok(user_id) => Ok(user_id),
        Err(_) => {
            warn!("forgetting unreadable identity '{}'", identity);
            id.forget();
            Err(ServiceError::Unauthorized)
        }
    }
}

/// load the calling user along with the team they are an active member of
pub fn member(user_id: i64, store: &dyn RecordStore) -> Result<(User, i64), ServiceError> {
    let user = match store.find_user(user_id)? {
        Some(user) => user,
        None => return Err(ServiceError::Unauthorized),
    };
    let team_id = user.team_id()?;

    Ok((user, team_id))
}

/// like `member`, but only for the team's owner and administrators
pub fn manager(user_id: i64, store: &dyn RecordStore) -> Result<(User, i64), ServiceError> {
    let (user, team_id) = member(user_id, store)?;

    if !user.can_manage() {
        forbidden!("only the team owner or an administrator can do this");
    }

    Ok((user, team_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::teams::Team;

    #[test]
    fn unknown_users_are_unauthorized() {
        let store = MemoryStore::default();

        match member(42, &store) {
            Err(ServiceError::Unauthorized) => {}
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn only_managers_pass() {
        let store = MemoryStore::default();
        let mut owner = User::ensure("tg:1", "Anna", &store).unwrap();
        let team = Team::create("Bar Central", &mut owner, &store).unwrap();
        let mut member_user = User::ensure("tg:2", "Boris", &store).unwrap();
        member_user.join(team.id, &store).unwrap();

        assert_eq!(manager(owner.id, &store).unwrap().1, team.id);
        assert_eq!(member(member_user.id, &store).unwrap().1, team.id);
        assert!(manager(member_user.id, &store).is_err());
    }
}
