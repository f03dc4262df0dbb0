//! Live feed: initial list, stream updates, and line commands from stdin.

use anyhow::{Context, Result, bail};
use bulletin_core::live::{ChannelOptions, HttpTransport, LiveChannel};
use bulletin_core::render::render_entry;
use bulletin_core::router::RouteOutcome;
use bulletin_core::store::ViewStore;
use bulletin_core::{Feed, NewsletterApi, NewsletterDraft};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::cli::Session;

const HELP: &str = "commands: new TITLE | CONTENT, edit ID TITLE | CONTENT, show, help, quit";

/// A line typed while watching.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    New(NewsletterDraft),
    Edit { id: i64, draft: NewsletterDraft },
    Show,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let command = match verb {
            "new" => Command::New(parse_draft(rest)?),
            "edit" => {
                let (id, rest) = rest
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .context("usage: edit ID TITLE | CONTENT")?;
                let id = id
                    .parse()
                    .with_context(|| format!("invalid newsletter id '{id}'"))?;
                Command::Edit {
                    id,
                    draft: parse_draft(rest)?,
                }
            }
            "show" => Command::Show,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{other}' ({HELP})"),
        };
        Ok(Some(command))
    }
}

fn parse_draft(text: &str) -> Result<NewsletterDraft> {
    let (title, content) = text
        .split_once('|')
        .context("expected TITLE | CONTENT")?;
    let title = title.trim();
    if title.is_empty() {
        bail!("title must not be empty");
    }
    Ok(NewsletterDraft::new(title, content.trim()))
}

pub async fn run(session: &Session) -> Result<()> {
    let http = session.http()?;
    let mut feed = Feed::new(session.api(http.clone()));

    // The feed stays interactive without a session; the live channel keeps
    // retrying on its own.
    match feed.authenticate(&session.credentials).await {
        Ok(()) => {
            if let Err(e) = feed.load_initial().await {
                eprintln!("Alert: {e:#}");
            }
        }
        Err(e) => eprintln!("Alert: {:#}", e.context("log in")),
    }
    print_store(feed.store());

    let options = ChannelOptions {
        reconnect_delay: session.config.reconnect_delay(),
        ..ChannelOptions::default()
    };
    let mut channel = LiveChannel::open(HttpTransport::new(http), session.events_url(), options);
    let mut state = channel.subscribe_state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = channel.recv() => {
                let Some(event) = event else { break };
                if let Some(outcome) = feed.apply(event) {
                    print_outcome(feed.store(), outcome);
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                eprintln!("[live] {current}");
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(&mut feed, command).await,
                    Ok(None) => {}
                    Err(e) => eprintln!("{e:#}"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    channel.close().await;
    Ok(())
}

async fn execute<A: NewsletterApi>(feed: &mut Feed<A>, command: Command) {
    match command {
        Command::New(draft) => match feed.create(&draft).await {
            Ok(created) => println!("Created newsletter #{}", created.id),
            Err(e) => eprintln!("Alert: {e:#}"),
        },
        Command::Edit { id, draft } => {
            if feed.begin_edit(id).is_none() {
                eprintln!("No newsletter #{id} in view");
                return;
            }
            feed.set_draft(id, draft);
            match feed.submit_edit(id).await {
                Ok(()) => print_outcome(feed.store(), RouteOutcome::Updated(id)),
                Err(e) => {
                    eprintln!("Alert: {e:#}");
                    feed.cancel_edit(id);
                }
            }
        }
        Command::Show => {
            print_store(feed.store());
            feed.acknowledge();
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn print_store(store: &ViewStore) {
    if store.is_empty() {
        println!("No newsletters yet.");
        return;
    }
    for entry in store.entries() {
        println!("{}\n", render_entry(entry));
    }
}

fn print_outcome(store: &ViewStore, outcome: RouteOutcome) {
    let label = match outcome {
        RouteOutcome::Inserted(_) => "new",
        RouteOutcome::Refreshed(_) => "refreshed",
        RouteOutcome::Updated(_) => "updated",
        RouteOutcome::Missed(_) => return,
    };
    if let Some(entry) = store.get(outcome.id()) {
        println!("-- {label}\n{}\n", render_entry(entry));
    }
}
