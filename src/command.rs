// escat - CLI for the Elasticsearch cat and cluster monitoring APIs
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The closed set of commands escat understands.
//!
//! Commands are looked up by name in [`COMMANDS`], which is kept sorted so
//! that help output and ambiguity messages list candidates alphabetically.
//! Any unambiguous prefix of a name selects that command.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Aliases,
    Allocation,
    Count,
    Health,
    Indices,
    Info,
    Master,
    Nodes,
    Plugins,
    Repositories,
    Role,
    Segments,
    Snapshots,
    Templates,
    User,
}

/// Static metadata for one command.
#[derive(Debug)]
pub struct CommandSpec {
    pub command: Command,
    pub name: &'static str,
    pub about: &'static str,
    /// Positional arguments accepted after the command name, for usage lines.
    pub synopsis: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: Command::Aliases,
        name: "aliases",
        about: "Print Aliases",
        synopsis: "[PREFIX]",
    },
    CommandSpec {
        command: Command::Allocation,
        name: "allocation",
        about: "Print Allocation",
        synopsis: "",
    },
    CommandSpec {
        command: Command::Count,
        name: "count",
        about: "Print Count",
        synopsis: "[PREFIX]",
    },
    CommandSpec {
        command: Command::Health,
        name: "health",
        about: "Print Cluster health",
        synopsis: "",
    },
    CommandSpec {
        command: Command::Indices,
        name: "indices",
        about: "Print Indices",
        synopsis: "[PREFIX] [_]",
    },
    CommandSpec {
        command: Command::Info,
        name: "info",
        about: "Print Info",
        synopsis: "",
    },
    CommandSpec {
        command: Command::Master,
        name: "master",
        about: "Print Master",
        synopsis: "",
    },
    CommandSpec {
        command: Command::Nodes,
        name: "nodes",
        about: "Print Nodes",
        synopsis: "",
    },
    CommandSpec {
        command: Command::Plugins,
        name: "plugins",
        about: "Print Plugins",
        synopsis: "",
    },
    CommandSpec {
        command: Command::Repositories,
        name: "repositories",
        about: "Print Repositories",
        synopsis: "[PREFIX] [_]",
    },
    CommandSpec {
        command: Command::Role,
        name: "role",
        about: "Print Role",
        synopsis: "[NAME]",
    },
    CommandSpec {
        command: Command::Segments,
        name: "segments",
        about: "Print Segments",
        synopsis: "[PREFIX]",
    },
    CommandSpec {
        command: Command::Snapshots,
        name: "snapshots",
        about: "Print Snapshots",
        synopsis: "REPOSITORY [_]",
    },
    CommandSpec {
        command: Command::Templates,
        name: "templates",
        about: "Print Templates",
        synopsis: "[PREFIX] [_]",
    },
    CommandSpec {
        command: Command::User,
        name: "user",
        about: "Print User",
        synopsis: "[NAME]",
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`; run `escat --help` to list commands")]
    Unknown(String),
    #[error("command `{input}` is ambiguous; it matches: {candidates}")]
    Ambiguous { input: String, candidates: String },
}

impl Command {
    pub fn spec(self) -> &'static CommandSpec {
        COMMANDS
            .iter()
            .find(|spec| spec.command == self)
            .unwrap_or_else(|| unreachable!("every command has a table entry"))
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Whether the positional ARG is used to build the request path.
    pub fn takes_target(self) -> bool {
        !self.spec().synopsis.is_empty()
    }

    pub fn usage(self) -> String {
        let spec = self.spec();
        if spec.synopsis.is_empty() {
            format!("escat [OPTIONS] {}", spec.name)
        } else {
            format!("escat [OPTIONS] {} {}", spec.name, spec.synopsis)
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let needle = input.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(CommandError::Unknown(input.to_string()));
        }

        if let Some(spec) = COMMANDS.iter().find(|spec| spec.name == needle) {
            return Ok(spec.command);
        }

        let matches: Vec<&CommandSpec> = COMMANDS
            .iter()
            .filter(|spec| spec.name.starts_with(&needle))
            .collect();

        match matches.as_slice() {
            [] => Err(CommandError::Unknown(input.to_string())),
            [only] => Ok(only.command),
            many => Err(CommandError::Ambiguous {
                input: input.to_string(),
                candidates: many
                    .iter()
                    .map(|spec| spec.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// The "Commands:" block shown at the end of `escat --help`.
pub fn help_table() -> String {
    let mut out = String::from("Commands:\n");
    for spec in COMMANDS {
        out.push_str(&format!("   {:<17}{}\n", spec.name, spec.about));
    }
    out.push_str("\nAny unambiguous prefix of a command name is accepted.\n");
    out.push_str("A trailing `_` fetches the full definition of each listed item as JSON.");
    out
}
