use crate::errors::ServiceError;

/// Input that still has to pass its checks before it reaches the store.
#[derive(Debug)]
pub struct Validator<T>(T);

/// Checks on user supplied input, a failure is a `ServiceError::BadRequest`.
pub trait Validate<T> {
    fn validate(&self) -> Result<(), ServiceError>;
}

impl<T> Validator<T>
where
    T: Validate<T>,
{
    pub fn new(input: T) -> Validator<T> {
        Validator(input)
    }

    /// hands the input back once it is known to be valid
    pub fn validate(self) -> Result<T, ServiceError> {
        self.0.validate()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teams::CreateTeam;
    use crate::users::NewUser;

    #[test]
    fn team_names_fit_on_one_line() {
        let name = Validator::new(CreateTeam {
            name: "Bar\nCentral".to_string(),
        });

        match name.validate() {
            Err(ServiceError::BadRequest(message)) => assert!(message.contains("single line")),
            other => panic!("expected a bad request, got {:?}", other),
        }
    }

    #[test]
    fn valid_input_is_handed_back() {
        let user = Validator::new(NewUser {
            external_identity: "tg:42".to_string(),
            display_name: "Anna".to_string(),
        })
        .validate()
        .unwrap();

        assert_eq!(user.external_identity, "tg:42");
    }

    #[test]
    fn identities_use_a_restricted_alphabet() {
        let user = Validator::new(NewUser {
            external_identity: "tg 42".to_string(),
            display_name: "Anna".to_string(),
        });

        assert!(user.validate().is_err());
    }
}
