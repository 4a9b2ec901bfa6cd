use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, SystemTime},
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use keyrace::{
    account::{Account, AccountContext, FileAccountStore},
    app::{App, Control},
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore},
    history::RaceDb,
    logging::init_logger,
    quote::{build_source, FixedQuote, QuoteSource, QuoteSourceKind},
    runtime::{AppEvent, Runner, TerminalEvents, TICK_RATE},
    training::build_trainer,
};

/// terminal typing races with live wpm, mistake heat-maps and local leaderboards
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type quotes against the clock, see which keys you keep missing, and drill them with generated training quotes. Races are saved per local user and ranked on a leaderboard."
)]
pub struct Cli {
    /// custom quote to type
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// where quotes come from (defaults to the configured source)
    #[clap(short = 's', long, value_enum)]
    source: Option<QuoteSourceKind>,

    /// log in as an existing local user
    #[clap(short = 'u', long, conflicts_with = "register")]
    user: Option<String>,

    /// create a local user and log in as them
    #[clap(long, value_name = "NAME")]
    register: Option<String>,

    /// email stored with a new user
    #[clap(long, requires = "register")]
    email: Option<String>,

    /// password for --user or --register (prompted for when omitted)
    #[clap(long)]
    password: Option<String>,

    /// forget the saved login and exit
    #[clap(long)]
    logout: bool,

    /// start with a training quote built from your latest mistakes
    #[clap(long)]
    train: bool,

    /// open on the leaderboard
    #[clap(long, conflicts_with = "history")]
    leaderboard: bool,

    /// open on your race history
    #[clap(long)]
    history: bool,

    /// write your race history as CSV and exit
    #[clap(long, value_name = "PATH")]
    export_history: Option<PathBuf>,

    /// never call the completion service for training quotes
    #[clap(long)]
    offline: bool,
}

fn read_password(cli: &Cli) -> io::Result<String> {
    match &cli.password {
        Some(password) => Ok(password.clone()),
        None => rpassword::prompt_password("password: "),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    init_logger(AppDirs::log_dir(), "info");
    let config_store = FileConfigStore::new();
    let config = config_store.load();
    let db = RaceDb::open(AppDirs::db_path())?;

    let mut accounts = AccountContext::new(FileAccountStore::new());
    if let Err(e) = accounts.load() {
        warn!(error = %e, "ignoring unreadable saved login");
    }

    if cli.logout {
        accounts.clear()?;
        println!("logged out");
        return Ok(());
    }
    if let Some(username) = cli.register.clone() {
        let password = read_password(&cli)?;
        accounts.register(
            &db,
            Account {
                username,
                email: cli.email.clone(),
            },
            &password,
        )?;
    } else if let Some(username) = &cli.user {
        let password = read_password(&cli)?;
        accounts.login(&db, username, &password)?;
    }

    if let Some(path) = &cli.export_history {
        let username = accounts.username().ok_or(keyrace::Error::NotLoggedIn)?;
        let rows = db.export_history_csv(username, File::create(path)?)?;
        println!("wrote {rows} races to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let quotes: Box<dyn QuoteSource> = match &cli.prompt {
        Some(prompt) => Box::new(FixedQuote(prompt.clone())),
        None => build_source(
            cli.source.unwrap_or(config.quote_source),
            &config.quote_url,
            Duration::from_secs(config.http_timeout_secs),
        )?,
    };
    let trainer = build_trainer(&config, cli.offline);
    let username = accounts.username().map(str::to_string);
    info!(user = ?username, "starting");

    let mut app = App::new(db, quotes, trainer, username, &config)
        .with_config_store(Box::new(config_store));
    if cli.train {
        if let Err(e) = app.start_training() {
            app.new_quote();
            app.status = Some(format!("no training quote: {e}"));
        }
    } else {
        app.new_quote();
    }
    let opened = if cli.history {
        app.open_history()
    } else if cli.leaderboard {
        app.open_leaderboard()
    } else {
        Ok(())
    };
    if let Err(e) = opened {
        app.status = Some(e.to_string());
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(TerminalEvents::spawn(), TICK_RATE);

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(SystemTime::now()),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}
