use std::fmt::Display;
use std::io::{self, Read, StdoutLock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use clap::Parser;

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Text;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::config::{Config, ConfigError};
use crate::gate::RateGate;
use crate::logging;
use crate::openai::{api_key_from_env, OpenAIClient, OpenAIGPTModel};
use crate::options::{Capability, Language};
use crate::output::OutputStore;
use crate::render::markdown_text;
use crate::session::{Outcome, Request, Session};
use crate::ModelError;

#[derive(Parser, Clone)]
#[command(name = "gamemaster")]
pub enum GameMasterCLIArgs {
    /// Interactive terminal studio
    Studio(StudioArgs),
    /// Generate once and print the result
    Generate(GenerateArgs),
}

#[derive(clap::ValueEnum, Clone, Copy)]
#[allow(non_camel_case_types)]
enum ArgModelKind {
    GPT5_Nano,
    GPT5_Mini,
    GPT5,
    GPT4o_Mini,
}

impl From<ArgModelKind> for OpenAIGPTModel {
    fn from(value: ArgModelKind) -> Self {
        match value {
            ArgModelKind::GPT5_Nano => Self::GPT5Nano,
            ArgModelKind::GPT5_Mini => Self::GPT5Mini,
            ArgModelKind::GPT5 => Self::GPT5,
            ArgModelKind::GPT4o_Mini => Self::GPT4oMini,
        }
    }
}

#[derive(clap::Args, Clone)]
pub struct CommonArgs {
    /// YAML config file (defaults to ./gamemaster.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    model: Option<ArgModelKind>,

    /// Minimum number of seconds between two model calls
    #[arg(long)]
    min_interval: Option<u64>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::Args, Clone)]
#[command(author, version, about, long_about = None)]
pub struct StudioArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, value_enum, default_value_t = Capability::GameConceptGenerator)]
    capability: Capability,

    #[arg(long, value_enum, default_value_t = Language::English)]
    language: Language,

    /// Text to start the prompt with
    #[arg(long)]
    prompt: Option<String>,

    /// Print the last output to stdout when leaving
    #[arg(long)]
    write_stdout: bool,
}

#[derive(clap::Args, Clone)]
#[command(author, version, about, long_about = None)]
pub struct GenerateArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, value_enum)]
    capability: Capability,

    #[arg(long, value_enum, default_value_t = Language::English)]
    language: Language,

    /// Prompt text, read from stdin when omitted
    #[arg(long)]
    prompt: Option<String>,
}

impl CommonArgs {
    fn config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(model) = self.model {
            config.model = model.into();
        }
        if let Some(secs) = self.min_interval {
            config.min_interval_secs = secs;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        Ok(config)
    }
}

fn open_session(config: &Config) -> Result<Session, Box<dyn std::error::Error>> {
    let api_key = api_key_from_env()?;
    let client = OpenAIClient::new(
        config.model,
        &api_key,
        &config.api_base,
        config.max_completion_tokens,
        config.request_timeout(),
    )?;
    Ok(Session::new(
        RateGate::new(config.min_interval()),
        Arc::new(client),
        OutputStore::new(&config.output_dir),
    ))
}

#[allow(clippy::missing_errors_doc)]
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = GameMasterCLIArgs::parse();
    match args {
        GameMasterCLIArgs::Studio(studio_args) => {
            let config = studio_args.common.config()?;
            let _guard = logging::init_file(&config.log_dir, studio_args.common.verbose)?;
            let session = open_session(&config)?;
            tracing::info!(model = config.model.api_name(), "starting studio");
            let mut ui = GameMasterUI::new(studio_args, session)?;
            ui.run().await?;
        }
        GameMasterCLIArgs::Generate(generate_args) => {
            logging::init_stderr(generate_args.common.verbose);
            let config = generate_args.common.config()?;
            let session = open_session(&config)?;
            generate(generate_args, session).await?;
        }
    }
    Ok(())
}

async fn generate(
    args: GenerateArgs,
    mut session: Session,
) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let request = Request {
        capability: args.capability,
        language: args.language,
        prompt,
    };
    let generation = session.submit(&request).await?;
    println!("{}", generation.text);
    eprintln!("Saved to {}", generation.path.display());
    if generation.outcome == Outcome::Failed {
        return Err(format!("generation failed, see {}", generation.path.display()).into());
    }
    Ok(())
}

enum RequestExit {
    Rejected,
    Cancel,
    Exit,
    Finished,
}

#[derive(Copy, Clone)]
enum RequestProgress {
    Waiting,
    S0,
    S1,
    S2,
    S3,
}

impl RequestProgress {
    const fn next_state(self) -> Self {
        match self {
            Self::Waiting | Self::S3 => Self::S0,
            Self::S0 => Self::S1,
            Self::S1 => Self::S2,
            Self::S2 => Self::S3,
        }
    }
}

impl Display for RequestProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, ""),
            Self::S0 => write!(f, "-"),
            Self::S1 => write!(f, "\\"),
            Self::S2 => write!(f, "|"),
            Self::S3 => write!(f, "/"),
        }
    }
}

#[derive(Clone, Copy)]
enum Controls {
    Editing,
    Processing,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Focus {
    Capability,
    Language,
    Prompt,
}

impl Focus {
    const fn next(self) -> Self {
        match self {
            Self::Capability => Self::Language,
            Self::Language => Self::Prompt,
            Self::Prompt => Self::Capability,
        }
    }

    const fn previous(self) -> Self {
        match self {
            Self::Capability => Self::Prompt,
            Self::Language => Self::Capability,
            Self::Prompt => Self::Language,
        }
    }
}

enum Status {
    Ready,
    Generating,
    Warning(String),
    Saved(PathBuf),
    Failed(PathBuf),
    Error(String),
}

impl Status {
    fn style(&self) -> Style {
        match self {
            Self::Ready | Self::Generating => Style::default(),
            Self::Warning(_) => Style::default().fg(Color::Yellow),
            Self::Saved(_) => Style::default().fg(Color::Green),
            Self::Failed(_) | Self::Error(_) => Style::default().fg(Color::Red),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Generating => write!(f, "🎮 GameMaster AI is generating..."),
            Self::Warning(message) | Self::Error(message) => write!(f, "{message}"),
            Self::Saved(path) => write!(f, "⬇️ Saved to {}", path.display()),
            Self::Failed(path) => write!(f, "Request failed, error saved to {}", path.display()),
        }
    }
}

struct ModelWindow {
    pub response: String,
    pub text: Text<'static>,
    pub language: Option<Language>,
    fidget: RequestProgress,
}

impl ModelWindow {
    fn update(&mut self, new: String, language: Language) {
        self.text = markdown_text(&new);
        self.response = new;
        self.language = Some(language);
        self.fidget = RequestProgress::Waiting;
    }

    fn spin_fidget(&mut self) {
        self.fidget = self.fidget.next_state();
    }

    fn paragraph(&self, scroll: u16) -> Paragraph<'static> {
        let title = match self.language {
            Some(language) => format!("🧠 Agent Output ({language}) {}", self.fidget),
            None => format!("🧠 Agent Output {}", self.fidget),
        };
        Paragraph::new(self.text.clone())
            .block(Block::default().borders(Borders::ALL).title(title))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
    }
}

fn focus_block(title: &str, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title.to_string())
}

fn create_menu_list<'t>(names: Vec<&'static str>, title: &str, focused: bool) -> List<'t> {
    let items: Vec<ListItem> = names.into_iter().map(ListItem::new).collect();
    List::new(items)
        .block(focus_block(title, focused))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ")
}

fn create_input_paragraph<'t>(text: String, focused: bool) -> Paragraph<'t> {
    Paragraph::new(text)
        .block(focus_block("Enter your idea or requirement:", focused))
        .alignment(Alignment::Left)
}

fn create_status_paragraph<'t>(status: &Status) -> Paragraph<'t> {
    Paragraph::new(status.to_string()).style(status.style())
}

fn create_controls_paragraph<'t>(state: Controls) -> Paragraph<'t> {
    let text = match state {
        Controls::Editing => {
            "<C-c>: Exit | Tab: Next field | ↑/↓: Select | Enter: Generate | PgUp/PgDn: Scroll"
        }
        Controls::Processing => "<C-c>: Exit | Esc: Cancel",
    };
    Paragraph::new(text)
        .block(Block::default().borders(Borders::TOP))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true })
}

fn select_next(state: &mut ListState, len: usize) {
    let next = state.selected().map_or(0, |i| (i + 1) % len);
    state.select(Some(next));
}

fn select_previous(state: &mut ListState, len: usize) {
    let previous = state.selected().map_or(0, |i| (i + len - 1) % len);
    state.select(Some(previous));
}

fn list_state(selected: usize) -> ListState {
    let mut state = ListState::default();
    state.select(Some(selected));
    state
}

pub struct GameMasterUI<'t> {
    args: StudioArgs,
    session: Session,
    term: Terminal<CrosstermBackend<StdoutLock<'t>>>,
    focus: Focus,
    capability_state: ListState,
    language_state: ListState,
    input: Input,
    response: ModelWindow,
    scroll: u16,
    status: Status,
    controls: Controls,
}

impl<'t> GameMasterUI<'t> {
    /// This function initializes the UI and eases disabling terminal raw mode in all circumstances
    fn initialization(
        args: StudioArgs,
        session: Session,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut stdout = io::stdout().lock();
        crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let term = Terminal::new(backend)?;

        let capability = Capability::ALL
            .iter()
            .position(|c| *c == args.capability)
            .unwrap_or_default();
        let language = Language::ALL
            .iter()
            .position(|l| *l == args.language)
            .unwrap_or_default();
        let input = Input::new(args.prompt.clone().unwrap_or_default());
        let response = ModelWindow {
            response: String::new(),
            text: Text::default(),
            language: None,
            fidget: RequestProgress::Waiting,
        };

        Ok(GameMasterUI {
            args,
            session,
            term,
            focus: Focus::Prompt,
            capability_state: list_state(capability),
            language_state: list_state(language),
            input,
            response,
            scroll: 0,
            status: Status::Ready,
            controls: Controls::Editing,
        })
    }

    fn new(args: StudioArgs, session: Session) -> Result<Self, Box<dyn std::error::Error>> {
        enable_raw_mode()?;
        match Self::initialization(args, session) {
            Ok(ui) => Ok(ui),
            Err(err) => {
                disable_raw_mode()?;
                Err(err)
            }
        }
    }

    async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let exit = self.mainloop().await;

        // restore terminal mode
        disable_raw_mode()?;
        crossterm::execute!(
            self.term.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.term.show_cursor()?;
        exit?;

        if self.args.write_stdout && !self.response.response.is_empty() {
            println!("{}", self.response.response);
        }
        Ok(())
    }

    fn request(&self) -> Request {
        let capability = self
            .capability_state
            .selected()
            .and_then(|i| Capability::ALL.get(i).copied())
            .unwrap_or(Capability::GameConceptGenerator);
        let language = self
            .language_state
            .selected()
            .and_then(|i| Language::ALL.get(i).copied())
            .unwrap_or(Language::English);
        Request {
            capability,
            language,
            prompt: self.input.value().to_string(),
        }
    }

    async fn mainloop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            self.controls = Controls::Editing;
            self.draw()?;

            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match key {
                    KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => return Ok(()),
                    KeyEvent {
                        code: KeyCode::Enter,
                        ..
                    } => {
                        if matches!(self.send_request().await?, RequestExit::Exit) {
                            return Ok(());
                        }
                    }
                    KeyEvent {
                        code: KeyCode::Tab, ..
                    } => self.focus = self.focus.next(),
                    KeyEvent {
                        code: KeyCode::BackTab,
                        ..
                    } => self.focus = self.focus.previous(),
                    KeyEvent {
                        code: KeyCode::PageDown,
                        ..
                    } => self.scroll = self.scroll.saturating_add(5),
                    KeyEvent {
                        code: KeyCode::PageUp,
                        ..
                    } => self.scroll = self.scroll.saturating_sub(5),
                    KeyEvent {
                        code: code @ (KeyCode::Up | KeyCode::Down),
                        ..
                    } if self.focus != Focus::Prompt => {
                        let (state, len) = match self.focus {
                            Focus::Capability => (&mut self.capability_state, Capability::ALL.len()),
                            _ => (&mut self.language_state, Language::ALL.len()),
                        };
                        if code == KeyCode::Down {
                            select_next(state, len);
                        } else {
                            select_previous(state, len);
                        }
                    }
                    _ if self.focus == Focus::Prompt => {
                        self.input.handle_event(&Event::Key(key));
                    }
                    _ => (),
                }
            }
        }
    }

    fn draw(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let capabilities = create_menu_list(
            Capability::ALL.iter().map(|c| c.name()).collect(),
            "Agent Capability",
            self.focus == Focus::Capability,
        );
        let languages = create_menu_list(
            Language::ALL.iter().map(|l| l.name()).collect(),
            "Output Language",
            self.focus == Focus::Language,
        );
        let input_text =
            create_input_paragraph(self.input.value().to_string(), self.focus == Focus::Prompt);
        let response = self.response.paragraph(self.scroll);
        let status = create_status_paragraph(&self.status);
        let controls = create_controls_paragraph(self.controls);
        let prompt_focused = self.focus == Focus::Prompt;

        self.term.draw(|f| {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(34), Constraint::Min(20)].as_ref())
                .split(f.size());
            let sidebar = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(9), Constraint::Min(4)].as_ref())
                .split(columns[0]);
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(5),
                        Constraint::Length(1),
                        Constraint::Length(2),
                    ]
                    .as_ref(),
                )
                .split(columns[1]);

            f.render_stateful_widget(capabilities, sidebar[0], &mut self.capability_state);
            f.render_stateful_widget(languages, sidebar[1], &mut self.language_state);

            let width = chunks[0].width.max(3) - 3; // keep 2 for borders and 1 for cursor
            let scroll = self.input.visual_scroll(width as usize);
            f.render_widget(
                input_text.scroll((0, u16::try_from(scroll).unwrap_or_default())),
                chunks[0],
            );
            if prompt_focused {
                f.set_cursor(
                    chunks[0].x
                        + u16::try_from(self.input.visual_cursor().max(scroll) - scroll)
                            .unwrap_or_default()
                        + 1,
                    chunks[0].y + 1,
                );
            }
            f.render_widget(response, chunks[1]);
            f.render_widget(status, chunks[2]);
            f.render_widget(controls, chunks[3]);
        })?;
        Ok(())
    }

    async fn send_request(&mut self) -> Result<RequestExit, Box<dyn std::error::Error>> {
        let request = self.request();
        let conversation = match self.session.begin(&request, Instant::now()) {
            Ok(conversation) => conversation,
            Err(err) => {
                self.status = Status::Warning(err.to_string());
                return Ok(RequestExit::Rejected);
            }
        };

        let model = self.session.model();
        let request_task = tokio::spawn(async move { model.send(&conversation).await });
        self.status = Status::Generating;
        self.controls = Controls::Processing;

        loop {
            self.draw()?;
            if crossterm::event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = crossterm::event::read()? {
                    match key {
                        KeyEvent {
                            code: KeyCode::Esc, ..
                        } => {
                            request_task.abort();
                            tracing::info!("request cancelled");
                            self.response.fidget = RequestProgress::Waiting;
                            self.status = Status::Warning("Request cancelled".to_string());
                            return Ok(RequestExit::Cancel);
                        }
                        KeyEvent {
                            code: KeyCode::Char('c'),
                            modifiers: KeyModifiers::CONTROL,
                            ..
                        } => {
                            request_task.abort();
                            return Ok(RequestExit::Exit);
                        }
                        _ => (),
                    }
                }
            }
            if request_task.is_finished() {
                let result = request_task
                    .await
                    .unwrap_or_else(|err| Err(ModelError::Other(err.to_string())));
                self.status = match self.session.finish(&request, result, Local::now()) {
                    Ok(generation) => {
                        self.response.update(generation.text, request.language);
                        self.scroll = 0;
                        match generation.outcome {
                            Outcome::Failed => Status::Failed(generation.path),
                            Outcome::Completed | Outcome::Empty => Status::Saved(generation.path),
                        }
                    }
                    Err(err) => Status::Error(err.to_string()),
                };
                return Ok(RequestExit::Finished);
            }
            self.response.spin_fidget();
        }
    }
}
