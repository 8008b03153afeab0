//! Command-line parsing.

use horizon_todo_core::todo::TodoId;
use horizon_todo_runtime::Route;
use thiserror::Error;

/// Usage text printed by `help` and on parse errors.
pub const USAGE: &str = "\
Usage: horizon-todo <command> [args]

Commands:
  list [page]               Show a page of your todos and the sample feed
  add <title>               Add a todo
  update <id> <title>       Rename a todo
  complete <id>             Mark a todo as done
  reopen <id>               Mark a todo as not done
  delete <id>               Delete a todo
  search <text>             Find todos whose title contains <text>
  show <id>                 Show one todo
  login <email> <password>  Sign in
  signup <email> <password> Create an account and sign in
  logout                    Sign out
  help                      Show this message";

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show one page
    List {
        /// 1-based page number
        page: usize,
    },
    /// Create a todo
    Add {
        /// Title as typed
        title: String,
    },
    /// Change a title
    Rename {
        /// Target record
        id: TodoId,
        /// New title
        title: String,
    },
    /// Change the completion flag
    SetCompleted {
        /// Target record
        id: TodoId,
        /// New state
        completed: bool,
    },
    /// Delete a todo
    Delete {
        /// Target record
        id: TodoId,
    },
    /// Title search
    Search {
        /// Search text
        query: String,
    },
    /// Detail view
    Show {
        /// Target record
        id: TodoId,
    },
    /// Email/password sign-in
    Login {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },
    /// Email/password registration
    SignUp {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },
    /// Sign out
    Logout,
    /// Print usage
    Help,
}

/// Command-line errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    /// Unrecognised command word
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    /// A required argument is absent
    #[error("Missing argument <{argument}> for `{command}`")]
    MissingArgument {
        /// Command being parsed
        command: &'static str,
        /// Name of the argument
        argument: &'static str,
    },
    /// An argument has the wrong shape
    #[error("Invalid {argument}: {value}")]
    InvalidArgument {
        /// Name of the argument
        argument: &'static str,
        /// Value as given
        value: String,
    },
}

impl Command {
    /// Parses the arguments after the program name. No arguments means `list`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] for unknown commands and missing or malformed arguments.
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let Some(command) = args.next() else {
            return Ok(Self::List { page: 1 });
        };
        let rest: Vec<String> = args.collect();

        match command.as_str() {
            "list" | "ls" => {
                let page = match rest.first() {
                    Some(raw) => raw.parse().map_err(|_| CliError::InvalidArgument {
                        argument: "page",
                        value: raw.clone(),
                    })?,
                    None => 1,
                };
                Ok(Self::List { page })
            }
            "add" => Ok(Self::Add {
                title: joined("add", "title", &rest)?,
            }),
            "update" => {
                let id = id_at("update", &rest)?;
                let title = joined("update", "title", rest.get(1..).unwrap_or_default())?;
                Ok(Self::Rename { id, title })
            }
            "complete" | "done" => Ok(Self::SetCompleted {
                id: id_at("complete", &rest)?,
                completed: true,
            }),
            "reopen" => Ok(Self::SetCompleted {
                id: id_at("reopen", &rest)?,
                completed: false,
            }),
            "delete" | "rm" => Ok(Self::Delete {
                id: id_at("delete", &rest)?,
            }),
            "search" => Ok(Self::Search {
                query: joined("search", "text", &rest)?,
            }),
            "show" => Ok(Self::Show {
                id: id_at("show", &rest)?,
            }),
            "login" => {
                let (email, password) = credentials("login", &rest)?;
                Ok(Self::Login { email, password })
            }
            "signup" => {
                let (email, password) = credentials("signup", &rest)?;
                Ok(Self::SignUp { email, password })
            }
            "logout" => Ok(Self::Logout),
            "help" | "--help" | "-h" => Ok(Self::Help),
            other => Err(CliError::UnknownCommand(other.to_string())),
        }
    }

    /// The view this command stands for; the navigation guard decides
    /// whether it may run.
    #[must_use]
    pub fn route(&self) -> Route {
        match self {
            Self::List { .. } | Self::Rename { .. } | Self::SetCompleted { .. } | Self::Delete { .. } => {
                Route::Todos
            }
            Self::Add { .. } => Route::AddTodo,
            Self::Search { .. } => Route::Search,
            Self::Show { id } => Route::TodoDetails(id.clone()),
            Self::Login { .. } | Self::Logout => Route::Login,
            Self::SignUp { .. } => Route::SignUp,
            Self::Help => Route::Home,
        }
    }
}

fn id_at(command: &'static str, rest: &[String]) -> Result<TodoId, CliError> {
    rest.first()
        .map(|raw| TodoId::parse(raw))
        .ok_or(CliError::MissingArgument {
            command,
            argument: "id",
        })
}

fn joined(command: &'static str, argument: &'static str, words: &[String]) -> Result<String, CliError> {
    let text = words.join(" ");
    if text.trim().is_empty() {
        return Err(CliError::MissingArgument { command, argument });
    }
    Ok(text)
}

fn credentials(command: &'static str, rest: &[String]) -> Result<(String, String), CliError> {
    match rest {
        [email, password, ..] => Ok((email.clone(), password.clone())),
        [_] => Err(CliError::MissingArgument {
            command,
            argument: "password",
        }),
        [] => Err(CliError::MissingArgument {
            command,
            argument: "email",
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn parse(line: &str) -> Result<Command, CliError> {
        Command::parse(line.split_whitespace())
    }

    #[test]
    fn no_arguments_lists_first_page() {
        assert_eq!(Command::parse(Vec::<String>::new()), Ok(Command::List { page: 1 }));
        assert_eq!(parse("list 3"), Ok(Command::List { page: 3 }));
    }

    #[test]
    fn titles_are_joined() {
        assert_eq!(
            parse("add Buy oat milk"),
            Ok(Command::Add {
                title: "Buy oat milk".to_string()
            })
        );
        assert_eq!(
            parse("update abc123 New title"),
            Ok(Command::Rename {
                id: TodoId::remote("abc123"),
                title: "New title".to_string()
            })
        );
    }

    #[test]
    fn ids_use_legacy_routing() {
        assert_eq!(
            parse("complete 7"),
            Ok(Command::SetCompleted {
                id: TodoId::Feed(7),
                completed: true
            })
        );
        assert_eq!(
            parse("delete 201"),
            Ok(Command::Delete {
                id: TodoId::remote("201")
            })
        );
    }

    #[test]
    fn missing_arguments_are_reported() {
        assert_eq!(
            parse("add"),
            Err(CliError::MissingArgument {
                command: "add",
                argument: "title"
            })
        );
        assert_eq!(
            parse("update abc"),
            Err(CliError::MissingArgument {
                command: "update",
                argument: "title"
            })
        );
        assert_eq!(
            parse("login ada@example.com"),
            Err(CliError::MissingArgument {
                command: "login",
                argument: "password"
            })
        );
    }

    #[test]
    fn bad_input_is_rejected() {
        assert_eq!(parse("frobnicate"), Err(CliError::UnknownCommand("frobnicate".to_string())));
        assert!(matches!(parse("list two"), Err(CliError::InvalidArgument { argument: "page", .. })));
    }

    #[test]
    fn commands_map_to_routes() {
        assert!(parse("list").unwrap().route().requires_auth());
        assert!(parse("add x").unwrap().route().requires_auth());
        assert!(parse("search milk").unwrap().route().requires_auth());
        assert!(!parse("show 3").unwrap().route().requires_auth());
        assert!(!parse("login a b").unwrap().route().requires_auth());
    }
}
