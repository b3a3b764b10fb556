use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use client_core::{
    load_settings, load_settings_from, AgentClient, ChatEvent, ChatSnapshot, NoticeKind,
    SendOutcome,
};
use shared::domain::{FundRecord, Role, SearchType};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Terminal front end for the mutual funds assistant")]
struct Args {
    /// Backend base url, e.g. http://127.0.0.1:8000/api
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    user_name: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Settings file; defaults to ./mf_agent.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ask the backend to drop its session context on /reset
    #[arg(long)]
    teardown_on_reset: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum ConsoleCommand {
    Send(String),
    Clear,
    Reset,
    Status,
    Search { search_type: SearchType, query: String },
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleCommand::Send(line.to_string())));
    };

    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let command = match name {
        "clear" => ConsoleCommand::Clear,
        "reset" => ConsoleCommand::Reset,
        "status" => ConsoleCommand::Status,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "search" => {
            let args = args.trim();
            let (first, remainder) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            match first.parse::<SearchType>() {
                Ok(search_type) => ConsoleCommand::Search {
                    search_type,
                    query: remainder.trim().to_string(),
                },
                Err(_) => ConsoleCommand::Search {
                    search_type: SearchType::General,
                    query: args.to_string(),
                },
            }
        }
        other => return Err(format!("unknown command '/{other}'; try /help")),
    };
    Ok(Some(command))
}

fn print_help() {
    println!("Type a question to chat. Commands:");
    println!("  /search [type] <fund name>");
    for line in search_type_lines() {
        println!("{line}");
    }
    println!("  /status  /clear  /reset  /quit");
}

fn search_type_lines() -> Vec<String> {
    SearchType::ALL
        .iter()
        .map(|kind| format!("      {:<14} {}", kind.as_str(), kind.label()))
        .collect()
}

fn print_status(snapshot: &ChatSnapshot) {
    let connection = if snapshot.is_connected {
        "Connected"
    } else {
        "Disconnected"
    };
    match &snapshot.session_id {
        Some(id) => println!(
            "{connection} • Session: {}... • {} message(s)",
            id.chars().take(8).collect::<String>(),
            snapshot.messages.len()
        ),
        None => println!("{connection} • no session • {} message(s)", snapshot.messages.len()),
    }
}

fn fund_lines(index: usize, fund: &FundRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "{}. {} ({})",
        index + 1,
        fund.display_name(),
        fund.amc_display()
    )];
    if let Some(nav) = fund.format_nav() {
        match &fund.nav_date {
            Some(date) => lines.push(format!("   NAV {nav} as of {date}")),
            None => lines.push(format!("   NAV {nav}")),
        }
    }
    if let Some(ret) = &fund.return_1y {
        lines.push(format!("   1Y return {}", FundRecord::format_return(ret)));
    }
    if fund.has_period_returns() {
        let periods = [
            ("1M", &fund.return_1m),
            ("YTD", &fund.return_ytd),
            ("3Y", &fund.return_3y),
        ]
        .into_iter()
        .filter_map(|(label, metric)| {
            metric
                .as_ref()
                .filter(|m| !m.to_string().trim().is_empty())
                .map(|m| format!("{label} {}", FundRecord::format_return(m)))
        })
        .collect::<Vec<_>>();
        lines.push(format!("   Returns {}", periods.join(" | ")));
    }
    if let Some(ratio) = &fund.expense_ratio {
        lines.push(format!("   Expense ratio {ratio}%"));
    }
    if let Some(manager) = &fund.fund_manager {
        lines.push(format!("   Manager {manager}"));
    }
    if let Some(risk) = &fund.sebi_risk_category {
        lines.push(format!("   Risk {risk}"));
    }
    lines
}

async fn run_command(client: &AgentClient, command: ConsoleCommand, user_name: Option<&str>) {
    match command {
        ConsoleCommand::Send(text) => match client.chat.send_message(&text, user_name).await {
            SendOutcome::Delivered => {
                let reply = client
                    .chat
                    .messages()
                    .into_iter()
                    .rev()
                    .find(|m| m.role == Role::Assistant);
                if let Some(reply) = reply {
                    println!("assistant> {}", reply.content);
                }
            }
            SendOutcome::Failed(message) => println!("error> {message}"),
            SendOutcome::Ignored(reason) => tracing::debug!(?reason, "send ignored"),
            SendOutcome::Discarded => {}
        },
        ConsoleCommand::Clear => {
            client.chat.clear_chat();
            println!("Chat cleared.");
        }
        ConsoleCommand::Reset => {
            client.chat.reset_session();
            println!("Session reset.");
        }
        ConsoleCommand::Status => {
            client.chat.check_connection().await;
            print_status(&client.chat.snapshot());
        }
        ConsoleCommand::Search { search_type, query } => {
            client.search.search(&query, search_type).await;
            let snapshot = client.search.snapshot();
            if let Some(notice) = client.search.take_notice() {
                let marker = match notice.kind {
                    NoticeKind::Success => "ok",
                    NoticeKind::Failure => "!!",
                };
                println!("[{marker}] {}", notice.text);
            }
            for (index, fund) in snapshot.results.iter().enumerate() {
                for line in fund_lines(index, fund) {
                    println!("{line}");
                }
            }
        }
        ConsoleCommand::Help => print_help(),
        ConsoleCommand::Quit => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    if let Some(timeout) = args.timeout_secs {
        settings.request_timeout_secs = timeout;
    }
    settings.teardown_on_reset |= args.teardown_on_reset;

    let client = AgentClient::connect(&settings)?;
    let user_name = args.user_name.filter(|name| !name.trim().is_empty());

    let mut events = client.chat.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ChatEvent::SessionEstablished(id)) => {
                    tracing::info!(session_id = %id, "session established")
                }
                Ok(ChatEvent::SendFailed {
                    retryable: true, ..
                }) => println!("(the request can be retried by sending the message again)"),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("MF Agent console, backend {}", settings.api_base_url);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => run_command(&client, command, user_name.as_deref()).await,
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }
    }

    Ok(())
}
