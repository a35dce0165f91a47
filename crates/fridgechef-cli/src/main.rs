mod render;
mod speech;

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fridgechef_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use fridgechef_contracts::errors::RecipeError;
use fridgechef_contracts::events::{DiscardStage, EventLog, SessionEvent};
use fridgechef_contracts::filters::FilterSet;
use fridgechef_contracts::image::ImagePayload;
use fridgechef_contracts::models::ModelCatalog;
use fridgechef_contracts::session::{ActiveTab, FetchApplied, Phase, Session};
use fridgechef_contracts::speech::SilentSpeaker;
use fridgechef_engine::{
    build_recipe_request, EngineConfig, FetchCompletion, FetchSlot, FetchWorker, RecipeEngine,
};
use serde_json::json;
use uuid::Uuid;

use crate::render::{render_filters, render_recipe_grid, render_screen, render_shopping_list, render_tabs};
use crate::speech::speaker_from_env;

#[derive(Debug, Parser)]
#[command(name = "fridgechef", version, about = "Recipes from a photo of your fridge")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Chat(ChatArgs),
    Suggest(SuggestArgs),
    Request(RequestArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long = "filter")]
    filters: Vec<String>,
}

#[derive(Debug, Parser)]
struct SuggestArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long = "filter")]
    filters: Vec<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Parser)]
struct RequestArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long = "filter")]
    filters: Vec<String>,
    #[arg(long)]
    model: Option<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fridgechef error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Suggest(args) => run_suggest(args),
        Command::Request(args) => run_request(args),
    }
}

fn default_events_path(session_id: &str) -> PathBuf {
    std::env::temp_dir()
        .join("fridgechef")
        .join(session_id)
        .join("events.jsonl")
}

fn open_engine(model: Option<String>, events: Option<PathBuf>) -> Result<RecipeEngine> {
    let session_id = Uuid::new_v4().to_string();
    let events_path = events.unwrap_or_else(|| default_events_path(&session_id));
    let config = EngineConfig::from_env().with_model(model);
    RecipeEngine::new(config, EventLog::new(events_path, session_id))
}

#[derive(Debug)]
enum ChatEvent {
    Line(String),
    Eof,
    Fetched(FetchCompletion),
}

impl From<FetchCompletion> for ChatEvent {
    fn from(completion: FetchCompletion) -> Self {
        Self::Fetched(completion)
    }
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue(String),
    Quit,
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let filters = FilterSet::from_names(&args.filters)?;
    let engine = Arc::new(open_engine(args.model, args.events)?);
    let session = Session::new(speaker_from_env()).with_filters(filters);

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone())?;
    let mut app = ChatApp::new(engine, session, tx);
    app.log(SessionEvent::SessionStarted {
        model: app.engine.model().name.clone(),
        filters: app.session.filters().to_vec(),
    })?;

    println!(
        "Fridgechef using {}. Type /help for commands.",
        app.engine.model().name
    );
    if let Some(warning) = app.engine.model_warning() {
        println!("{warning}");
    }
    println!("Events: {}", app.events.path().display());
    print!("{}", render_screen(&app.session));
    prompt()?;

    while let Ok(event) = rx.recv() {
        match event {
            ChatEvent::Eof => break,
            ChatEvent::Line(line) => match app.handle_line(&line) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue(text)) => print!("{text}"),
                Err(err) => println!("{err:#}"),
            },
            ChatEvent::Fetched(completion) => match app.handle_completion(completion) {
                Ok(Some(text)) => print!("\n{text}"),
                Ok(None) => continue,
                Err(err) => println!("{err:#}"),
            },
        }
        prompt()?;
    }
    app.shutdown()
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn spawn_stdin_reader(sink: Sender<ChatEvent>) -> Result<()> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = line.trim_end_matches(['\n', '\r']).to_string();
                        if sink.send(ChatEvent::Line(text)).is_err() {
                            return;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        eprintln!("fridgechef: stdin read failed: {err}");
                        break;
                    }
                }
            }
            let _ = sink.send(ChatEvent::Eof);
        })
        .context("failed to spawn stdin reader")?;
    Ok(())
}

/// Interactive session: one `Session`, at most one fetch in flight.
struct ChatApp {
    engine: Arc<RecipeEngine>,
    events: EventLog,
    session: Session,
    slot: FetchSlot,
    sink: Sender<ChatEvent>,
}

impl ChatApp {
    fn new(engine: Arc<RecipeEngine>, session: Session, sink: Sender<ChatEvent>) -> Self {
        let events = engine.event_log();
        Self {
            engine,
            events,
            session,
            slot: FetchSlot::new(),
            sink,
        }
    }

    fn log(&self, event: SessionEvent) -> Result<()> {
        self.events.record(&event)?;
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let intent = parse_intent(line);
        let text = match intent.action.as_str() {
            "noop" => String::new(),
            "quit" => return Ok(Flow::Quit),
            "help" => format!("Commands: {}\n", CHAT_HELP_COMMANDS.join(", ")),
            "submit_photo" => {
                let Some(path) = intent.arg_str("path") else {
                    bail!("usage: /photo <path>");
                };
                self.submit_photo(Path::new(path))?
            }
            "new_photo" => {
                self.start_over()?;
                render_screen(&self.session)
            }
            "toggle_filter" => {
                let Some(name) = intent.arg_str("name") else {
                    bail!("usage: /filter <name>");
                };
                let enabled = self.session.toggle_filter(name)?;
                self.log(SessionEvent::FilterToggled {
                    filter: name.to_string(),
                    enabled,
                    active: self.session.filters().to_vec(),
                })?;
                match self.session.phase() {
                    Phase::ReadyBrowsing => format!(
                        "{}\n{}",
                        render_filters(self.session.filters()),
                        render_screen(&self.session)
                    ),
                    _ => render_filters(self.session.filters()),
                }
            }
            "show_filters" => render_filters(self.session.filters()),
            "show_recipes" => {
                self.session.set_active_tab(ActiveTab::Recipes);
                render_screen(&self.session)
            }
            "set_tab" => {
                let name = intent.arg_str("name").unwrap_or_default().to_ascii_lowercase();
                let tab = match name.as_str() {
                    "recipes" | "fridge" => ActiveTab::Recipes,
                    "shopping" => ActiveTab::Shopping,
                    other => bail!("unknown tab '{other}'; use recipes or shopping"),
                };
                self.session.set_active_tab(tab);
                render_screen(&self.session)
            }
            "select_recipe" => {
                let Some(index) = intent.arg_u64("index") else {
                    bail!("usage: /cook <n>");
                };
                let index = usize::try_from(index).context("recipe number out of range")?;
                let recipe = self.session.select_recipe(index)?.recipe_name().to_string();
                self.log(SessionEvent::RecipeSelected { index, recipe })?;
                render_screen(&self.session)
            }
            "next_step" => {
                let moved = self.session.next_step()?;
                step_text(moved, "Already at the last step.", &self.session)
            }
            "previous_step" => {
                let moved = self.session.previous_step()?;
                step_text(moved, "Already at the first step.", &self.session)
            }
            "read_aloud" => {
                let speaking = self.session.toggle_read_aloud()?;
                self.log(SessionEvent::ReadAloudToggled { speaking })?;
                if speaking {
                    "Reading step aloud. /read again to stop.\n".to_string()
                } else {
                    String::new()
                }
            }
            "exit_cooking" => {
                self.session.exit_cooking()?;
                render_screen(&self.session)
            }
            "add_missing" => {
                let added = self.session.add_missing_to_shopping_list()?;
                self.log(SessionEvent::ShoppingListUpdated {
                    added,
                    items: self.shopping_items(),
                })?;
                format!(
                    "Added {added} item(s) to your shopping list.\n{}",
                    render_shopping_list(self.session.shopping_list())
                )
            }
            "show_shopping" => {
                self.session.set_active_tab(ActiveTab::Shopping);
                format!(
                    "{}{}",
                    render_tabs(ActiveTab::Shopping, self.session.shopping_list().len()),
                    render_shopping_list(self.session.shopping_list())
                )
            }
            "clear_shopping" => {
                self.session.clear_shopping_list();
                self.log(SessionEvent::ShoppingListCleared)?;
                "Shopping list cleared.\n".to_string()
            }
            "status" => self.status(),
            "unknown" => match (intent.arg_str("hint"), intent.arg_str("command")) {
                (Some(hint), _) => format!("{hint}\n"),
                (None, Some(command)) => {
                    format!("Unknown command /{command}. Type /help for commands.\n")
                }
                (None, None) => "Unknown command. Type /help for commands.\n".to_string(),
            },
            other => bail!("unsupported action '{other}'"),
        };
        Ok(Flow::Continue(text))
    }

    fn submit_photo(&mut self, path: &Path) -> Result<String> {
        let image = ImagePayload::from_path(path)?;
        let summary = format!("{} photo, {} bytes", image.mime_type(), image.decoded_len());
        let ticket = self.session.submit_image(image)?;
        let request_id = ticket.request_id;

        let handle = match FetchWorker::spawn(Arc::clone(&self.engine), ticket, self.sink.clone()) {
            Ok(handle) => handle,
            Err(err) => {
                self.session
                    .complete_fetch(request_id, Err(RecipeError::fetch(format!("{err:#}"))));
                return Err(err);
            }
        };
        if let Some(superseded) = self.slot.replace(handle) {
            self.log(SessionEvent::FetchSuperseded {
                request_id: superseded,
                by: request_id,
            })?;
        }
        self.log(SessionEvent::PhotoSubmitted {
            request_id,
            path: path.display().to_string(),
        })?;
        Ok(format!(
            "Analyzing {summary} with {} ({request_id})...\n",
            self.engine.model().name
        ))
    }

    fn start_over(&mut self) -> Result<()> {
        if let Some(cancelled) = self.slot.cancel() {
            self.log(SessionEvent::FetchCancelled {
                request_id: cancelled,
            })?;
        }
        self.session.new_photo();
        Ok(())
    }

    /// Returns the screen to show, or `None` when the completion is stale.
    fn handle_completion(&mut self, completion: FetchCompletion) -> Result<Option<String>> {
        let FetchCompletion { request_id, result } = completion;
        let applied = self.session.complete_fetch(request_id, result);
        self.slot.finish(request_id)?;
        match applied {
            FetchApplied::Applied => Ok(Some(render_screen(&self.session))),
            FetchApplied::Stale => {
                self.log(SessionEvent::RecipesStaleDiscarded {
                    request_id,
                    stage: DiscardStage::Session,
                })?;
                Ok(None)
            }
        }
    }

    fn status(&self) -> String {
        let filters = self.session.filters().to_vec();
        let filters = if filters.is_empty() {
            "none".to_string()
        } else {
            filters.join(", ")
        };
        let pending = self
            .session
            .pending_request()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let worker = self
            .slot
            .in_flight()
            .map(|id| format!("fetching request {id}"))
            .unwrap_or_else(|| "idle".to_string());
        let model = self.engine.model();
        format!(
            "Phase: {}\nModel: {} ({})\nFilters: {filters}\nRecipes: {} shown of {}\nShopping list: {} item(s)\nPending request: {pending}\nFetch worker: {worker}\nEvents: {}\n",
            self.session.phase(),
            model.name,
            model.provider,
            self.session.visible_recipes().len(),
            self.session.recipes().len(),
            self.session.shopping_list().len(),
            self.events.path().display(),
        )
    }

    fn shutdown(&mut self) -> Result<()> {
        self.slot.cancel();
        if self.session.phase() == Phase::Cooking {
            self.session.exit_cooking()?;
        }
        self.log(SessionEvent::SessionFinished {
            shopping_list: self.shopping_items(),
        })
    }

    fn shopping_items(&self) -> Vec<String> {
        self.session
            .shopping_list()
            .items()
            .map(str::to_string)
            .collect()
    }
}

fn step_text(moved: bool, edge: &str, session: &Session) -> String {
    let screen = render_screen(session);
    if moved {
        screen
    } else {
        format!("{edge}\n{screen}")
    }
}

fn run_suggest(args: SuggestArgs) -> Result<i32> {
    let filters = FilterSet::from_names(&args.filters)?;
    let image = ImagePayload::from_path(&args.image)?;
    let engine = open_engine(args.model, args.events)?;
    if let Some(warning) = engine.model_warning() {
        eprintln!("fridgechef: {warning}");
    }

    let mut session = Session::new(Box::new(SilentSpeaker)).with_filters(filters);
    let ticket = session.submit_image(image)?;
    let result = engine.fetch_recipes(ticket.request_id, ticket.image, &ticket.filters);
    if let Err(err) = &result {
        eprintln!("fridgechef: {err}");
    }
    session.complete_fetch(ticket.request_id, result);

    if let Some(message) = session.error() {
        eprintln!("{message}");
        return Ok(1);
    }
    let visible = session.visible_recipes();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
    } else {
        print!("{}", render_recipe_grid(&visible, false, None));
    }
    Ok(0)
}

fn run_request(args: RequestArgs) -> Result<i32> {
    let filters = FilterSet::from_names(&args.filters)?;
    let image = ImagePayload::from_path(&args.image)?;
    let config = EngineConfig::from_env().with_model(args.model);
    let choice = ModelCatalog::default().resolve(config.model.as_deref())?;
    let request = build_recipe_request(&choice.model.name, image, &filters.to_vec());
    let body = json!({
        "model": choice.model.name,
        "provider": choice.model.provider,
        "fallback_reason": choice.fallback.as_ref().map(ToString::to_string),
        "payload": request.to_redacted_payload(),
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(0)
}
