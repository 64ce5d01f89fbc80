use anyhow::{bail, Context, Result};
use nova::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Commands:
  /new [title]     start a thread and select it
  /threads         list active threads
  /archived        list archived threads
  /select N        select active thread N
  /rename TITLE    rename the selected thread
  /archive         archive the selected thread
  /unarchive N     restore archived thread N
  /delete          delete the selected thread and its messages
  /clear           delete the selected thread's messages
  /quit            exit
Anything else is sent as a message.";

#[derive(Debug, PartialEq)]
enum Command {
    New(Option<String>),
    Threads,
    Archived,
    Select(usize),
    Rename(String),
    Archive,
    Unarchive(usize),
    Delete,
    Clear,
    Help,
    Quit,
    Say(String),
}

impl Command {
    fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Self::Say(line.to_string()));
        }

        let (name, rest) = match line.split_once(' ') {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        Ok(match name {
            "/new" => Self::New(arg),
            "/threads" => Self::Threads,
            "/archived" => Self::Archived,
            "/select" => Self::Select(parse_index(rest)?),
            "/rename" => Self::Rename(arg.context("usage: /rename TITLE")?),
            "/archive" => Self::Archive,
            "/unarchive" => Self::Unarchive(parse_index(rest)?),
            "/delete" => Self::Delete,
            "/clear" => Self::Clear,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            other => bail!("unknown command {}, try /help", other),
        })
    }
}

/// 1-based index as shown in listings
fn parse_index(arg: &str) -> Result<usize> {
    let n: usize = arg.parse().context("expected a thread number")?;
    if n == 0 {
        bail!("thread numbers start at 1");
    }
    Ok(n - 1)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let user = std::env::var("NOVA_USER").unwrap_or_else(|_| "demo-user".to_string());
    let mut builder = SessionBuilder::new().user(&user);
    match std::env::var("NOVA_API_URL") {
        Ok(url) => {
            println!("Backend: {}", url);
            builder = builder.http(url);
        }
        Err(_) => println!("Backend: in-memory"),
    }
    match std::env::var("LLM_GATEWAY_API_KEY") {
        Ok(key) => {
            builder = builder.gateway_key(key);
            if let Ok(url) = std::env::var("LLM_GATEWAY_URL") {
                builder = builder.gateway_url(url);
            }
        }
        Err(_) => println!("LLM_GATEWAY_API_KEY not set; messages are stored without replies"),
    }

    let session = builder.build().await?;
    println!("Signed in as {}. Type /help for commands.\n", user);
    print_threads(&session.sync.snapshot().threads);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("! {}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&session, command).await {
            println!("! {}", e);
        }
    }

    session.sync.shutdown().await;
    Ok(())
}

async fn run(session: &Session, command: Command) -> Result<()> {
    let sync = &session.sync;
    match command {
        Command::New(title) => {
            let thread = sync.create_thread(title).await?;
            println!("Started \"{}\"", thread.title);
        }
        Command::Threads => {
            sync.refresh_threads().await?;
            print_threads(&sync.snapshot().threads);
        }
        Command::Archived => {
            let archived = sync.load_archived_threads().await?;
            print_threads(&archived);
        }
        Command::Select(index) => {
            let thread = nth_thread(&sync.snapshot().threads, index)?;
            sync.select_thread(Some(&thread.id)).await?;
            println!("== {} ==", thread.title);
            print_messages(&sync.snapshot().messages);
        }
        Command::Rename(title) => {
            let id = selected(session)?;
            let thread = sync.rename_thread(&id, &title).await?;
            println!("Renamed to \"{}\"", thread.title);
        }
        Command::Archive => {
            let id = selected(session)?;
            sync.set_archived(&id, true).await?;
            println!("Archived");
        }
        Command::Unarchive(index) => {
            let snapshot = sync.snapshot();
            let archived = if snapshot.archived_loaded {
                snapshot.archived_threads
            } else {
                sync.load_archived_threads().await?
            };
            let thread = nth_thread(&archived, index)?;
            sync.set_archived(&thread.id, false).await?;
            println!("Restored \"{}\"", thread.title);
        }
        Command::Delete => {
            let id = selected(session)?;
            sync.delete_thread(&id).await?;
            println!("Deleted");
        }
        Command::Clear => {
            let id = selected(session)?;
            sync.clear_thread_messages(&id).await?;
            println!("Cleared");
        }
        Command::Help => println!("{}", HELP),
        Command::Say(text) => match session.chat(&text).await? {
            Some(reply) => println!("nova> {}", reply),
            None => println!("(stored)"),
        },
        Command::Quit => {}
    }
    Ok(())
}

fn selected(session: &Session) -> Result<String> {
    session
        .sync
        .snapshot()
        .selected
        .context("no thread selected, use /select N or /new")
}

fn nth_thread(threads: &[Thread], index: usize) -> Result<Thread> {
    threads
        .get(index)
        .cloned()
        .with_context(|| format!("no thread #{}", index + 1))
}

fn print_threads(threads: &[Thread]) {
    if threads.is_empty() {
        println!("(no threads)");
        return;
    }
    for (i, thread) in threads.iter().enumerate() {
        println!(
            "{:>3}. {} ({} messages, updated {})",
            i + 1,
            thread.title,
            thread.message_count,
            thread.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        let who = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "nova",
        };
        println!("{}> {}", who, message.content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/new").unwrap(), Command::New(None));
        assert_eq!(
            Command::parse("/new Sleep plan").unwrap(),
            Command::New(Some("Sleep plan".to_string()))
        );
        assert_eq!(Command::parse("/select 2").unwrap(), Command::Select(1));
        assert_eq!(Command::parse("/unarchive 1").unwrap(), Command::Unarchive(0));
        assert_eq!(
            Command::parse("/rename  Recovery ").unwrap(),
            Command::Rename("Recovery".to_string())
        );
        assert_eq!(Command::parse("/quit").unwrap(), Command::Quit);
        assert_eq!(
            Command::parse("how did I sleep?").unwrap(),
            Command::Say("how did I sleep?".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse("/select").is_err());
        assert!(Command::parse("/select 0").is_err());
        assert!(Command::parse("/rename").is_err());
        assert!(Command::parse("/bogus").is_err());
    }
}
