// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevctl`: a thin debugging/ops client over `kandevd`'s WebSocket
//! protocol. Every subcommand opens one connection, sends one request, and
//! prints the response — there is no persistent client state.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "kandevctl", version, about = "Talk to a running kandevd daemon")]
struct Cli {
    /// Daemon address, host:port (overrides $KANDEV_LISTEN_ADDR).
    #[arg(long, global = true)]
    addr: Option<String>,

    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every task the daemon knows about.
    Status,
    /// Launch a session for a task.
    Launch {
        task_id: String,
        /// Stage the session without starting its agent.
        #[arg(long)]
        prepare: bool,
        #[arg(long)]
        agent_profile_id: Option<String>,
    },
    /// Send a prompt to a session (queues it if a turn is already open).
    Prompt {
        task_id: String,
        session_id: String,
        prompt: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        plan_mode: bool,
    },
    /// Cancel a session's in-flight agent turn.
    Cancel { session_id: String },
    /// Answer a pending permission request.
    #[command(name = "respond-permission")]
    RespondPermission {
        session_id: String,
        pending_id: String,
        #[arg(long)]
        option_id: Option<String>,
        #[arg(long)]
        cancel: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let addr = cli.addr.unwrap_or_else(|| std::env::var("KANDEV_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:4190".to_string()));

    let result = match cli.command {
        Command::Status => commands::status::run(&addr, cli.output).await,
        Command::Launch { task_id, prepare, agent_profile_id } => {
            commands::launch::run(&addr, cli.output, task_id, prepare, agent_profile_id).await
        }
        Command::Prompt { task_id, session_id, prompt, model, plan_mode } => {
            commands::prompt::run(&addr, cli.output, task_id, session_id, prompt, model, plan_mode).await
        }
        Command::Cancel { session_id } => commands::cancel::run(&addr, session_id).await,
        Command::RespondPermission { session_id, pending_id, option_id, cancel } => {
            commands::respond_permission::run(&addr, session_id, pending_id, option_id, cancel).await
        }
    };

    if let Err(err) = result {
        eprintln!("kandevctl: {err}");
        std::process::exit(1);
    }
}
