use chrono::NaiveDate;

use crate::conversation::{Pending, Purpose};
use crate::errors::ServiceError;
use crate::limits::{Limit, NewLimit};
use crate::schedule::{active_grid, Grid};
use crate::shifts::{AssignmentStatus, Shift, SlotCatalog, Slot, WHOLE_DAY};
use crate::store::RecordStore;
use crate::teams::Team;
use crate::users::{Role, User};
use crate::weeks::{Week, WeekDay};

/// What a conversation needs from the rest of the service.
pub struct Context<'a> {
    pub store: &'a dyn RecordStore,
    pub catalog: &'a SlotCatalog,
}

///
/// **POST /api/chat**
///
/// ``` shell
/// curl --location --request POST 'localhost:8080/api/chat' \
///     --header 'Content-Type: application/json' \
///     --data-raw '{
///         "conversation_id": "123456789",
///         "external_identity": "tg:123456789",
///         "display_name": "Anna",
///         "text": "my shift"
///     }'
/// ```
#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub conversation_id: String,
    pub external_identity: String,
    pub display_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    /// answers the client can offer as buttons
    pub choices: Vec<String>,
    pub schedule: Option<Grid>,
}

/// The reply to a message and the state the conversation moves to.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub reply: Reply,
    pub next: Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    CreateTeam,
    JoinTeam,
    Schedule,
    MyShift,
    Invite,
    SetLimit,
    Help,
    Cancel,
}

const HELP: &str = "start - register and show the menu
create team - start a new team and become its owner
join team - join a team with its invite code
schedule - show the schedule of the active week
my shift - pick your slot for a day of the active week
invite - show your team's invite code
set limit - limit how many members of a role can work (administrators)
cancel - stop what you were doing";

const NOT_IN_TEAM: &str = "You're not in a team yet. Create one or join one with an invite code.";
const NO_ACTIVE_WEEK: &str = "There is no active week yet. Ask your team owner to open one.";
const MANAGERS_ONLY: &str = "Only the team owner or an administrator can set limits.";

impl Command {
    fn parse(text: &str) -> Option<Command> {
        let text = text.trim().trim_start_matches('/').replace('_', " ");

        let command = match text.to_lowercase().as_str() {
            "start" => Command::Start,
            "create team" => Command::CreateTeam,
            "join team" => Command::JoinTeam,
            "schedule" => Command::Schedule,
            "my shift" => Command::MyShift,
            "invite" => Command::Invite,
            "set limit" => Command::SetLimit,
            "help" => Command::Help,
            "cancel" => Command::Cancel,
            _ => return None,
        };

        Some(command)
    }
}

impl Reply {
    fn text<S: Into<String>>(text: S) -> Reply {
        Reply {
            text: text.into(),
            choices: vec![],
            schedule: None,
        }
    }

    fn choices(mut self, choices: Vec<String>) -> Reply {
        self.choices = choices;
        self
    }

    fn schedule(mut self, schedule: Option<Grid>) -> Reply {
        self.schedule = schedule;
        self
    }
}

impl Step {
    fn to(next: Pending, reply: Reply) -> Step {
        Step { reply, next }
    }

    fn idle(reply: Reply) -> Step {
        Step::to(Pending::Idle, reply)
    }
}

fn menu(user: &User) -> Vec<String> {
    let mut menu = vec!["schedule", "my shift", "invite"];
    if user.can_manage() {
        menu.push("set limit");
    }
    menu.push("help");

    menu.into_iter().map(String::from).collect()
}

fn not_in_team() -> Step {
    Step::idle(
        Reply::text(NOT_IN_TEAM).choices(vec!["create team".to_string(), "join team".to_string()]),
    )
}

fn labels(days: &[WeekDay]) -> Vec<String> {
    days.iter().map(WeekDay::label).collect()
}

/// Splits input the user can correct from failures they can't do anything about.
fn correctable<T>(result: Result<T, ServiceError>) -> Result<Result<T, String>, ServiceError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(ServiceError::BadRequest(message)) => Ok(Err(message)),
        Err(e) => Err(e),
    }
}

/// Answer one chat message.
///
/// Commands work from every state, anything else is read as the answer to
/// `pending`. Input that can't be used keeps the conversation where it is.
#[tracing::instrument(skip(ctx))]
pub fn handle(
    ctx: &Context<'_>,
    message: &ChatMessage,
    pending: Pending,
) -> Result<Step, ServiceError> {
    let mut user = User::ensure(&message.external_identity, &message.display_name, ctx.store)?;
    let text = message.text.trim();

    if let Some(command) = Command::parse(text) {
        debug!("user {} sent {:?}", user.id, command);
        return run(ctx, &user, command);
    }

    match pending {
        Pending::Idle => Ok(Step::idle(
            Reply::text("Sorry, I didn't get that. Send help to see what I can do.")
                .choices(menu(&user)),
        )),
        Pending::AwaitingTeamName => create_team(ctx, &mut user, text),
        Pending::AwaitingInviteCode => join_team(ctx, &mut user, text),
        Pending::AwaitingDate { purpose } => pick_date(ctx, &user, purpose, text),
        Pending::AwaitingSlot {
            purpose: Purpose::Shift,
            date,
        } => pick_shift_slot(ctx, &user, date, text),
        Pending::AwaitingSlot {
            purpose: Purpose::Limit,
            date,
        } => pick_limit_slot(ctx, &user, date, text),
        Pending::AwaitingRole { date, slot } => pick_role(&user, date, slot, text),
        Pending::AwaitingCount { date, slot, role } => {
            pick_count(ctx, &user, date, slot, role, text)
        }
    }
}

fn run(ctx: &Context<'_>, user: &User, command: Command) -> Result<Step, ServiceError> {
    match command {
        Command::Start => match user.team_id() {
            Ok(_) => Ok(Step::idle(
                Reply::text(format!("Welcome, {}! Pick something from the menu.", user.display_name))
                    .choices(menu(user)),
            )),
            Err(_) => Ok(not_in_team()),
        },
        Command::CreateTeam => Ok(Step::to(
            Pending::AwaitingTeamName,
            Reply::text("Send the name of your new team, on a single line."),
        )),
        Command::JoinTeam => Ok(Step::to(
            Pending::AwaitingInviteCode,
            Reply::text("Send the invite code of the team you want to join."),
        )),
        Command::Schedule => show_schedule(ctx, user),
        Command::MyShift => start_picking(ctx, user, Purpose::Shift),
        Command::SetLimit => start_picking(ctx, user, Purpose::Limit),
        Command::Invite => {
            let team_id = match user.team_id() {
                Ok(team_id) => team_id,
                Err(_) => return Ok(not_in_team()),
            };
            let team = Team::find(team_id, ctx.store)?;
            Ok(Step::idle(Reply::text(format!(
                "The invite code of {} is {}",
                team.name, team.invite_code
            ))))
        }
        Command::Help => Ok(Step::idle(Reply::text(HELP))),
        Command::Cancel => {
            let choices = match user.team_id() {
                Ok(_) => menu(user),
                Err(_) => vec!["create team".to_string(), "join team".to_string()],
            };
            Ok(Step::idle(Reply::text("Cancelled.").choices(choices)))
        }
    }
}

fn show_schedule(ctx: &Context<'_>, user: &User) -> Result<Step, ServiceError> {
    let team_id = match user.team_id() {
        Ok(team_id) => team_id,
        Err(_) => return Ok(not_in_team()),
    };

    match active_grid(team_id, ctx.store)? {
        Some(grid) if grid.is_empty() => Ok(Step::idle(
            Reply::text("Nobody is on the schedule yet.").schedule(Some(grid)),
        )),
        Some(grid) => Ok(Step::idle(
            Reply::text(grid.to_string())
                .choices(menu(user))
                .schedule(Some(grid)),
        )),
        None => Ok(Step::idle(Reply::text(NO_ACTIVE_WEEK))),
    }
}

/// the days of the team's active week
fn active_days(ctx: &Context<'_>, team_id: i64) -> Result<Option<Vec<WeekDay>>, ServiceError> {
    Ok(Week::active(team_id, ctx.store)?.map(|week| week.days()))
}

fn start_picking(ctx: &Context<'_>, user: &User, purpose: Purpose) -> Result<Step, ServiceError> {
    let team_id = match user.team_id() {
        Ok(team_id) => team_id,
        Err(_) => return Ok(not_in_team()),
    };

    if purpose == Purpose::Limit && !user.can_manage() {
        return Ok(Step::idle(Reply::text(MANAGERS_ONLY)));
    }

    let days = match active_days(ctx, team_id)? {
        Some(days) => days,
        None => return Ok(Step::idle(Reply::text(NO_ACTIVE_WEEK))),
    };

    let question = match purpose {
        Purpose::Shift => "Pick the day of your shift:",
        Purpose::Limit => "Pick the day to set a limit for:",
    };

    Ok(Step::to(
        Pending::AwaitingDate { purpose },
        Reply::text(question).choices(labels(&days)),
    ))
}

fn create_team(ctx: &Context<'_>, user: &mut User, name: &str) -> Result<Step, ServiceError> {
    match correctable(Team::create(name, user, ctx.store))? {
        Ok(team) => Ok(Step::idle(
            Reply::text(format!(
                "Team {} is created! Its invite code is {}. You are its owner and administrator.",
                team.name, team.invite_code
            ))
            .choices(menu(user)),
        )),
        Err(message) => Ok(Step::to(
            Pending::AwaitingTeamName,
            Reply::text(format!("{}. Send another name, or cancel.", message)),
        )),
    }
}

fn join_team(ctx: &Context<'_>, user: &mut User, code: &str) -> Result<Step, ServiceError> {
    match Team::join(code, user, ctx.store)? {
        Some(team) => Ok(Step::idle(
            Reply::text(format!("You joined {}!", team.name)).choices(menu(user)),
        )),
        None => Ok(Step::to(
            Pending::AwaitingInviteCode,
            Reply::text("No team uses this invite code. Check it and try again, or cancel."),
        )),
    }
}

fn pick_date(
    ctx: &Context<'_>,
    user: &User,
    purpose: Purpose,
    text: &str,
) -> Result<Step, ServiceError> {
    let team_id = match user.team_id() {
        Ok(team_id) => team_id,
        Err(_) => return Ok(not_in_team()),
    };

    let days = match active_days(ctx, team_id)? {
        Some(days) => days,
        None => return Ok(Step::idle(Reply::text(NO_ACTIVE_WEEK))),
    };

    let day = match days.iter().find(|day| day.matches(text)) {
        Some(day) => day,
        None => {
            return Ok(Step::to(
                Pending::AwaitingDate { purpose },
                Reply::text("That's not a day of the active week, pick one of these:")
                    .choices(labels(&days)),
            ))
        }
    };

    let next = Pending::AwaitingSlot {
        purpose,
        date: day.iso_date,
    };

    match purpose {
        Purpose::Shift => Ok(Step::to(
            next,
            Reply::text(format!("Pick your slot for {}:", day.label()))
                .choices(ctx.catalog.choices()),
        )),
        Purpose::Limit => {
            let mut choices = ctx.catalog.slots().to_vec();
            choices.push(WHOLE_DAY.to_string());
            Ok(Step::to(
                next,
                Reply::text(format!("Which slot of {} should be limited?", day.label()))
                    .choices(choices),
            ))
        }
    }
}

fn pick_shift_slot(
    ctx: &Context<'_>,
    user: &User,
    date: NaiveDate,
    text: &str,
) -> Result<Step, ServiceError> {
    let team_id = match user.team_id() {
        Ok(team_id) => team_id,
        Err(_) => return Ok(not_in_team()),
    };

    let still_open = active_days(ctx, team_id)?
        .map(|days| days.iter().any(|day| day.iso_date == date))
        .unwrap_or(false);
    if !still_open {
        return Ok(Step::idle(Reply::text(
            "The active week changed in the meantime, start again with my shift.",
        )));
    }

    let stay = Pending::AwaitingSlot {
        purpose: Purpose::Shift,
        date,
    };

    let slot = match correctable(ctx.catalog.parse(text))? {
        Ok(slot) => slot,
        Err(message) => {
            return Ok(Step::to(
                stay,
                Reply::text(message).choices(ctx.catalog.choices()),
            ))
        }
    };

    let result = Shift::assign(user.id, team_id, date, slot.clone(), ctx.store)?;
    let text = result.describe(date, &slot);

    match result.status {
        AssignmentStatus::Assigned => Ok(Step::idle(
            Reply::text(text)
                .choices(menu(user))
                .schedule(active_grid(team_id, ctx.store)?),
        )),
        AssignmentStatus::Denied => Ok(Step::to(
            stay,
            Reply::text(text).choices(ctx.catalog.choices()),
        )),
    }
}

fn pick_limit_slot(
    ctx: &Context<'_>,
    user: &User,
    date: NaiveDate,
    text: &str,
) -> Result<Step, ServiceError> {
    if !user.can_manage() {
        return Ok(Step::idle(Reply::text(MANAGERS_ONLY)));
    }

    let slot = if text.eq_ignore_ascii_case(WHOLE_DAY) {
        None
    } else {
        match correctable(ctx.catalog.parse_working(text))? {
            Ok(slot) => Some(slot),
            Err(message) => {
                let mut choices = ctx.catalog.slots().to_vec();
                choices.push(WHOLE_DAY.to_string());
                return Ok(Step::to(
                    Pending::AwaitingSlot {
                        purpose: Purpose::Limit,
                        date,
                    },
                    Reply::text(message).choices(choices),
                ));
            }
        }
    };

    Ok(Step::to(
        Pending::AwaitingRole { date, slot },
        Reply::text("Which role should be limited?").choices(role_choices()),
    ))
}

fn role_choices() -> Vec<String> {
    Role::ALL.iter().map(|role| role.to_string()).collect()
}

fn pick_role(
    user: &User,
    date: NaiveDate,
    slot: Option<Slot>,
    text: &str,
) -> Result<Step, ServiceError> {
    if !user.can_manage() {
        return Ok(Step::idle(Reply::text(MANAGERS_ONLY)));
    }

    match correctable(text.parse::<Role>())? {
        Ok(role) => Ok(Step::to(
            Pending::AwaitingCount { date, slot, role },
            Reply::text(format!(
                "How many of the {} may work then? Send a number, 0 or more.",
                role.title().to_lowercase()
            )),
        )),
        Err(message) => Ok(Step::to(
            Pending::AwaitingRole { date, slot },
            Reply::text(message).choices(role_choices()),
        )),
    }
}

fn pick_count(
    ctx: &Context<'_>,
    user: &User,
    date: NaiveDate,
    slot: Option<Slot>,
    role: Role,
    text: &str,
) -> Result<Step, ServiceError> {
    if !user.can_manage() {
        return Ok(Step::idle(Reply::text(MANAGERS_ONLY)));
    }

    let team_id = match user.team_id() {
        Ok(team_id) => team_id,
        Err(_) => return Ok(not_in_team()),
    };

    let max_count = match text.parse::<i64>() {
        Ok(count) if count >= 0 => count,
        _ => {
            return Ok(Step::to(
                Pending::AwaitingCount { date, slot, role },
                Reply::text("Send a whole number, 0 or more."),
            ))
        }
    };

    let limit = Limit::set(
        &NewLimit {
            team_id,
            date,
            slot,
            role,
            max_count,
        },
        ctx.store,
    )?;

    let covers = match &limit.slot {
        Some(slot) => slot.to_string(),
        None => WHOLE_DAY.to_string(),
    };

    Ok(Step::idle(
        Reply::text(format!(
            "Done! At most {} of the {} can work on {} ({}).",
            limit.max_count,
            role.title().to_lowercase(),
            limit.date,
            covers
        ))
        .choices(menu(user)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct Chat {
        store: MemoryStore,
        catalog: SlotCatalog,
    }

    impl Chat {
        fn new() -> Chat {
            Chat {
                store: MemoryStore::default(),
                catalog: SlotCatalog::default(),
            }
        }

        fn send(&self, identity: &str, text: &str, pending: Pending) -> Step {
            let context = Context {
                store: &self.store,
                catalog: &self.catalog,
            };
            let message = ChatMessage {
                conversation_id: identity.to_string(),
                external_identity: identity.to_string(),
                display_name: identity.to_string(),
                text: text.to_string(),
            };

            handle(&context, &message, pending).unwrap()
        }

        /// an owner with a team and an open week starting on 2025-01-06
        fn team(&self, owner: &str) -> Team {
            let mut user = User::ensure(owner, owner, &self.store).unwrap();
            let team = Team::create("Bar Central", &mut user, &self.store).unwrap();
            Week::activate(team.id, monday(), &self.store).unwrap();
            team
        }

        fn member(&self, identity: &str, team: &Team, role: Role) -> User {
            let mut user = User::ensure(identity, identity, &self.store).unwrap();
            user.join(team.id, &self.store).unwrap();
            user.set_role(role, &self.store).unwrap()
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd(2025, 1, 6)
    }

    #[test]
    fn commands_parse_loosely() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("My Shift"), Some(Command::MyShift));
        assert_eq!(Command::parse("/set_limit"), Some(Command::SetLimit));
        assert_eq!(Command::parse("10:00-23:00"), None);
    }

    #[test]
    fn cancel_returns_to_idle_from_every_state() {
        let chat = Chat::new();
        let states = vec![
            Pending::Idle,
            Pending::AwaitingTeamName,
            Pending::AwaitingInviteCode,
            Pending::AwaitingDate {
                purpose: Purpose::Shift,
            },
            Pending::AwaitingSlot {
                purpose: Purpose::Limit,
                date: monday(),
            },
            Pending::AwaitingRole {
                date: monday(),
                slot: None,
            },
            Pending::AwaitingCount {
                date: monday(),
                slot: None,
                role: Role::Host,
            },
        ];

        for state in states {
            assert_eq!(chat.send("tg:1", "cancel", state).next, Pending::Idle);
        }
    }

    #[test]
    fn creating_a_team() {
        let chat = Chat::new();

        let step = chat.send("tg:1", "create team", Pending::Idle);
        assert_eq!(step.next, Pending::AwaitingTeamName);

        let step = chat.send("tg:1", "Bar Central", step.next);
        assert_eq!(step.next, Pending::Idle);
        assert!(step.reply.text.contains("is created"));

        let owner = chat.store.find_user_by_identity("tg:1").unwrap().unwrap();
        assert!(owner.is_owner);
        assert!(owner.team_id.is_some());
    }

    #[test]
    fn unusable_team_name_keeps_waiting() {
        let chat = Chat::new();

        let step = chat.send("tg:1", "x".repeat(80).as_str(), Pending::AwaitingTeamName);

        assert_eq!(step.next, Pending::AwaitingTeamName);
    }

    #[test]
    fn joining_with_a_wrong_code_keeps_waiting() {
        let chat = Chat::new();
        let team = chat.team("tg:owner");

        let step = chat.send("tg:2", "WRONG123", Pending::AwaitingInviteCode);
        assert_eq!(step.next, Pending::AwaitingInviteCode);

        let step = chat.send("tg:2", &team.invite_code.to_lowercase(), step.next);
        assert_eq!(step.next, Pending::Idle);
        assert_eq!(
            chat.store.find_user_by_identity("tg:2").unwrap().unwrap().team_id,
            Some(team.id)
        );
    }

    #[test]
    fn picking_a_shift() {
        let chat = Chat::new();
        let team = chat.team("tg:owner");
        let anna = chat.member("tg:anna", &team, Role::Employee);

        let step = chat.send("tg:anna", "my shift", Pending::Idle);
        assert_eq!(
            step.next,
            Pending::AwaitingDate {
                purpose: Purpose::Shift
            }
        );
        assert_eq!(step.reply.choices.len(), 7);

        // not a day of the week
        let step = chat.send("tg:anna", "Mon 13.01", step.next);
        assert_eq!(
            step.next,
            Pending::AwaitingDate {
                purpose: Purpose::Shift
            }
        );

        let step = chat.send("tg:anna", "Mon 06.01", step.next);
        assert_eq!(
            step.next,
            Pending::AwaitingSlot {
                purpose: Purpose::Shift,
                date: monday()
            }
        );

        // not in the catalog
        let step = chat.send("tg:anna", "10:00-22:00", step.next);
        assert!(matches!(step.next, Pending::AwaitingSlot { .. }));

        let step = chat.send("tg:anna", "10:00-23:00", step.next);
        assert_eq!(step.next, Pending::Idle);
        assert!(step.reply.schedule.is_some());

        let shift = chat
            .store
            .find_shift(anna.id, team.id, monday())
            .unwrap()
            .unwrap();
        assert_eq!(shift.slot.as_str(), "10:00-23:00");
    }

    #[test]
    fn a_full_slot_can_be_picked_again() {
        let chat = Chat::new();
        let team = chat.team("tg:owner");
        let anna = chat.member("tg:anna", &team, Role::Barman);
        chat.member("tg:boris", &team, Role::Barman);
        Limit::set(
            &NewLimit {
                team_id: team.id,
                date: monday(),
                slot: None,
                role: Role::Barman,
                max_count: 1,
            },
            &chat.store,
        )
        .unwrap();
        Shift::assign(
            anna.id,
            team.id,
            monday(),
            chat.catalog.parse("12:00-23:00").unwrap(),
            &chat.store,
        )
        .unwrap();

        let picking = Pending::AwaitingSlot {
            purpose: Purpose::Shift,
            date: monday(),
        };
        let step = chat.send("tg:boris", "12:00-23:00", picking.clone());

        assert_eq!(step.next, picking);
        assert!(step.reply.text.contains("is full"));

        let step = chat.send("tg:boris", "вых", step.next);
        assert_eq!(step.next, Pending::Idle);
    }

    #[test]
    fn setting_a_limit() {
        let chat = Chat::new();
        let team = chat.team("tg:owner");

        let step = chat.send("tg:owner", "set limit", Pending::Idle);
        let step = chat.send("tg:owner", "2025-01-07", step.next);
        let step = chat.send("tg:owner", "whole day", step.next);
        assert_eq!(
            step.next,
            Pending::AwaitingRole {
                date: NaiveDate::from_ymd(2025, 1, 7),
                slot: None
            }
        );

        let step = chat.send("tg:owner", "cook", step.next);
        assert!(matches!(step.next, Pending::AwaitingRole { .. }));

        let step = chat.send("tg:owner", "host", step.next);
        let step = chat.send("tg:owner", "-1", step.next);
        assert!(matches!(step.next, Pending::AwaitingCount { .. }));

        let step = chat.send("tg:owner", "2", step.next);
        assert_eq!(step.next, Pending::Idle);

        let limits = chat
            .store
            .limits_for(team.id, NaiveDate::from_ymd(2025, 1, 7), Role::Host)
            .unwrap();
        assert_eq!(limits.len(), 1);
        assert_eq!(limits[0].max_count, 2);
    }

    #[test]
    fn members_cannot_set_limits() {
        let chat = Chat::new();
        let team = chat.team("tg:owner");
        chat.member("tg:anna", &team, Role::Employee);

        let step = chat.send("tg:anna", "set limit", Pending::Idle);

        assert_eq!(step.next, Pending::Idle);
        assert_eq!(step.reply.text, MANAGERS_ONLY);
    }

    #[test]
    fn strangers_are_asked_to_join() {
        let chat = Chat::new();

        let step = chat.send("tg:1", "my shift", Pending::Idle);

        assert_eq!(step.next, Pending::Idle);
        assert_eq!(step.reply.text, NOT_IN_TEAM);
    }
}
