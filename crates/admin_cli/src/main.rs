use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, NewUser};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "splitledger_admin")]
#[command(about = "Admin utilities for SplitLedger (bootstrap users/groups)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./splitledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Group(Group),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: String,
}

#[derive(Args, Debug)]
struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    /// Create a group; the owner becomes its admin.
    Create(GroupCreateArgs),
    /// Add an existing user to a group.
    AddMember(GroupAddMemberArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct GroupAddMemberArgs {
    #[arg(long)]
    group: i64,
    /// Username of a group admin.
    #[arg(long)]
    admin: String,
    /// Username of the user to add.
    #[arg(long)]
    member: String,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> CliResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn say(out: &mut std::io::Stderr, line: &str) -> CliResult<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(line),
        Print("\r\n")
    )?;
    out.flush()?;
    Ok(())
}

/// Read a password without echoing it, printing `*` per character.
fn prompt_password(prompt: &str) -> CliResult<String> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                break;
            }
            KeyCode::Backspace if buf.pop().is_some() => {
                execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
            }
            _ => {}
        }
        out.flush()?;
    }

    Ok(buf)
}

fn prompt_new_password() -> CliResult<String> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.is_empty() {
            say(&mut out, "Password must not be empty.")?;
            continue;
        }
        if first == prompt_password("Confirm password: ")? {
            return Ok(first);
        }
        say(&mut out, "Passwords do not match. Try again.")?;
    }

    Err("too many attempts".into())
}

async fn connect_db(database_url: &str) -> CliResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn user_id(engine: &Engine, username: &str) -> CliResult<i64> {
    match engine.user_id_by_username(username).await {
        Ok(id) => Ok(id),
        Err(EngineError::KeyNotFound(_)) => Err(format!("user not found: {username}").into()),
        Err(err) => Err(err.into()),
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_new_password()?;
            let id = engine
                .create_user(NewUser {
                    username: args.username.clone(),
                    email: args.email,
                    first_name: args.first_name,
                    password,
                })
                .await?;
            println!("created user: {} (id {id})", args.username);
        }
        Command::Group(Group {
            command: GroupCommand::Create(args),
        }) => {
            let owner = user_id(&engine, &args.owner).await?;
            let group = engine
                .new_group(&args.name, args.description.as_deref(), owner)
                .await?;
            println!("created group: {} (id {})", group.name, group.id);
        }
        Command::Group(Group {
            command: GroupCommand::AddMember(args),
        }) => {
            let admin = user_id(&engine, &args.admin).await?;
            let member = user_id(&engine, &args.member).await?;
            engine.add_group_member(args.group, admin, member).await?;
            println!("added {} to group {}", args.member, args.group);
        }
    }

    engine.shutdown().await;
    Ok(())
}
