//! CLI command definitions using Clap.
//!
//! `vbar start` runs the bar. Every other subcommand is a thin client that
//! sends one request to the running bar and exits.

use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config::Settings;
use crate::core::constants::{APP_NAME, APP_VERSION, env};
use crate::core::{Error, Result};
use crate::platform::ipc::{self, AddBlock, AddCss, AddMenu, ControlRequest, ResponseData};

mod list;

/// vbar - a status bar driven by shell commands.
#[derive(Parser, Debug)]
#[command(name = "vbar")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Control socket of the bar.
    #[arg(long, global = true, env = env::SOCKET, value_name = "PATH")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Start the bar.
    ///
    /// Binds the control socket, runs the configuration script (`vbarrc`)
    /// and keeps running until interrupted or stopped with `vbar stop`.
    Start {
        /// Record the bar in memory instead of drawing it.
        #[arg(long)]
        headless: bool,
    },

    /// Add a block to the running bar.
    #[command(after_long_help = r#"Examples:
  vbar add-block --name clock --right --command 'date +%H:%M' --interval 60
  vbar add-block --name title --center --tail-command 'xtitle -s'
  vbar add-block --name hello --text 'hi' --click-command 'notify-send hi'"#)]
    AddBlock(AddBlockArgs),

    /// Register a style rule for a block class.
    ///
    /// Each block carries the class `block<name>`.
    #[command(name = "add-css")]
    AddCss {
        /// Class the rule applies to (e.g. blockclock).
        #[arg(long)]
        class: String,

        /// Style declarations.
        #[arg(long)]
        css: String,
    },

    /// Append an item to a block's menu.
    ///
    /// The menu opens when the block is clicked.
    #[command(name = "add-menu")]
    AddMenu {
        /// Block to attach the item to.
        #[arg(long)]
        name: String,

        /// Item label.
        #[arg(long)]
        text: String,

        /// Command run when the item is activated.
        #[arg(long)]
        command: String,
    },

    /// Re-run a block's command now.
    Update {
        #[arg(long)]
        name: String,
    },

    /// Remove a block.
    Remove {
        #[arg(long)]
        name: String,
    },

    /// List the blocks of the running bar.
    List {
        /// Output in JSON format instead of table format.
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Check whether the bar is running.
    Ping,

    /// Stop the running bar.
    Stop,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(vbar completions --shell zsh)"
    ///   vbar completions --shell fish > ~/.config/fish/completions/vbar.fish
    #[command(verbatim_doc_comment)]
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

/// Arguments of `vbar add-block`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(group(ArgGroup::new("position").args(["left", "center", "right"])))]
pub struct AddBlockArgs {
    /// Unique block name.
    #[arg(long)]
    pub name: String,

    /// Place the block in the left group (default).
    #[arg(long)]
    pub left: bool,

    /// Place the block in the center group.
    #[arg(long)]
    pub center: bool,

    /// Place the block in the right group.
    #[arg(long)]
    pub right: bool,

    /// Initial text.
    #[arg(long, default_value = "")]
    pub text: String,

    /// Command whose trimmed output becomes the text.
    #[arg(long, conflicts_with = "tail_command")]
    pub command: Option<String>,

    /// Long-running command; every output line replaces the text.
    #[arg(long)]
    pub tail_command: Option<String>,

    /// Re-run --command every N seconds.
    #[arg(long, default_value_t = 0, value_name = "SECONDS", requires = "command")]
    pub interval: u64,

    /// Command run when the block is clicked.
    #[arg(long)]
    pub click_command: Option<String>,
}

impl From<AddBlockArgs> for AddBlock {
    fn from(args: AddBlockArgs) -> Self {
        Self {
            name: args.name,
            text: args.text,
            left: args.left,
            center: args.center,
            right: args.right,
            command: args.command,
            tail_command: args.tail_command,
            interval: args.interval,
            click_command: args.click_command,
        }
    }
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(self) -> Result<()> {
        let settings = Settings::from_env(self.socket.as_deref());

        let request = match self.command {
            Commands::Start { headless } => return crate::app::run(settings, headless),
            Commands::Completions { shell } => {
                Self::print_completions(shell);
                return Ok(());
            }
            Commands::List { json } => return Self::execute_list(&settings.socket_path, json),
            Commands::Ping => return Self::execute_ping(&settings.socket_path),
            Commands::AddBlock(args) => ControlRequest::AddBlock(args.into()),
            Commands::AddCss { class, css } => ControlRequest::AddCss(AddCss { class, css }),
            Commands::AddMenu { name, text, command } => {
                ControlRequest::AddMenu(AddMenu { name, text, command })
            }
            Commands::Update { name } => ControlRequest::Update { name },
            Commands::Remove { name } => ControlRequest::Remove { name },
            Commands::Stop => ControlRequest::Quit,
        };

        send(&settings.socket_path, &request).map(|_| ())
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, APP_NAME, &mut io::stdout());
    }

    fn execute_list(socket: &Path, json: bool) -> Result<()> {
        let blocks = match send(socket, &ControlRequest::List)? {
            Some(ResponseData::Blocks { blocks }) => blocks,
            _ => return Err(Error::ipc("unexpected response to list request")),
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        } else if blocks.is_empty() {
            println!("No blocks.");
        } else {
            println!("{}", list::format_blocks_table(&blocks));
        }

        Ok(())
    }

    fn execute_ping(socket: &Path) -> Result<()> {
        match send(socket, &ControlRequest::Ping)? {
            Some(ResponseData::Pong { pid, version }) => {
                println!("vbar {version} running (pid {pid}) on {}", socket.display());
                Ok(())
            }
            _ => Err(Error::ipc("unexpected response to ping")),
        }
    }
}

/// Sends one request on a short-lived runtime.
fn send(socket: &Path, request: &ControlRequest) -> Result<Option<ResponseData>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(ipc::send_request(socket, request))
}
