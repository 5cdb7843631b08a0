//! Operator account handlers.

use std::io::IsTerminal;

use secrecy::SecretString;
use tabled::Tabled;

use lockdeck_core::{NewUser, Role, SyncEngine, UserProfile, UserUpdate};

use crate::cli::{GlobalOpts, RoleArg, UserCreateArgs, UserUpdateArgs, UsersArgs, UsersCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
}

impl UserRow {
    fn new(u: &UserProfile) -> Self {
        Self {
            id: u.id.map(|id| id.to_string()).unwrap_or_default(),
            username: u.username.clone(),
            name: u.name.clone().unwrap_or_default(),
            email: u.email.clone().unwrap_or_default(),
            role: u.role.clone().unwrap_or_default(),
        }
    }
}

fn detail(u: &UserProfile) -> String {
    [
        format!("ID:       {}", u.id.map_or_else(|| "-".into(), |id| id.to_string())),
        format!("Username: {}", u.username),
        format!("Name:     {}", u.name.as_deref().unwrap_or("-")),
        format!("Email:    {}", u.email.as_deref().unwrap_or("-")),
        format!("Role:     {}", u.role.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Manager => Role::Manager,
            RoleArg::User => Role::User,
            RoleArg::Guest => Role::Guest,
        }
    }
}

impl From<UserUpdateArgs> for UserUpdate {
    fn from(args: UserUpdateArgs) -> Self {
        UserUpdate {
            username: args.rename,
            role: args.role.map(Role::from),
            email: args.email,
            name: args.name,
        }
    }
}

pub async fn handle(
    engine: &SyncEngine,
    args: UsersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List => {
            let users = engine.list_users().await?;
            let out = output::render_list(&global.output, &users, UserRow::new, |u| {
                u.username.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Create(args) => {
            let password = new_password(&args)?;
            let user = NewUser {
                username: args.login,
                role: args.role.into(),
                email: args.email,
                name: args.name,
            };
            let created = engine.create_user(&user, &password).await?;
            let out = output::render_single(&global.output, &created, detail, |u| {
                u.id.map(|id| id.to_string()).unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Update(args) => {
            let id = args.id;
            let update = UserUpdate::from(args);
            if update.is_empty() {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "pass at least one of --rename, --role, --email, --name".into(),
                });
            }
            let updated = engine.update_user(id, &update).await?;
            let out = output::render_single(&global.output, &updated, detail, |u| {
                u.username.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UsersCommand::Delete { id } => {
            engine.delete_user(id).await?;
            output::print_output(&format!("User {id} deleted"), global.quiet);
            Ok(())
        }
    }
}

fn new_password(args: &UserCreateArgs) -> Result<SecretString, CliError> {
    if let Some(password) = &args.new_password {
        return Ok(SecretString::from(password.clone()));
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "new-password".into(),
            reason: "required when stdin is not a terminal".into(),
        });
    }
    let password = rpassword::prompt_password(format!("Password for {}: ", args.login))?;
    Ok(SecretString::from(password))
}
