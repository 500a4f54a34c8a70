use anyhow::{bail, Context};
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::{debug, info, warn};
use phrasedrill::{
    app_dirs::AppDirs,
    audio::{AudioPlayback, CommandAudio, SilentAudio},
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    deck::{self, DeckStatus},
    phrase::{Formality, Phrase, PhraseId},
    practice::{Practice, PracticeConfig},
    quota::{DailyQuota, UsageQuota},
    reveal::{RevealMode, RevealUnits},
    runtime::{Action, CrosstermEventSource, Runner},
    store::PhraseDb,
    translation::{ManualTranslation, TranslationProvider, TranslationRequest},
    ui::{describe_next_due, PracticeView},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;
const SHORT_ID_LEN: usize = 8;

/// spaced repetition drills for spoken phrases
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice saying phrases in another language. Each review shows the prompt, then the pronunciation, then reveals the target text piece by piece before you rate your recall."
)]
pub struct Cli {
    /// directory holding the phrase database and config (defaults to the platform locations)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// review the phrases that are due (default)
    Practice,
    /// add a phrase together with its translation
    Add(AddArgs),
    /// list phrases, newest first
    List {
        /// only show phrases that are due now
        #[clap(long)]
        due: bool,
    },
    /// delete a phrase by id or unique id prefix
    Delete { id: String },
    /// delete every phrase
    Clear {
        /// confirm deleting the whole collection
        #[clap(long)]
        yes: bool,
    },
    /// show how many phrases are due and today's allowance
    Status,
    /// show or change settings
    Settings(SettingsArgs),
}

#[derive(Args, Debug, Clone)]
struct AddArgs {
    /// what you want to be able to say, in your own language
    prompt: String,

    /// the phrase in the language you are learning
    #[clap(short, long)]
    target: String,

    /// romanized pronunciation of the target
    #[clap(short, long)]
    pronunciation: String,

    /// word-by-word literal translation
    #[clap(short, long)]
    gloss: Option<String>,

    /// register of the translation (defaults to the configured one)
    #[clap(short, long, value_enum)]
    formality: Option<Formality>,
}

#[derive(Args, Debug, Clone, Default)]
struct SettingsArgs {
    /// speak the target automatically during reveal
    #[clap(long)]
    auto_play: Option<bool>,

    /// default register for new phrases
    #[clap(long, value_enum)]
    formality: Option<Formality>,

    /// lift the daily limit on new phrases
    #[clap(long)]
    unlimited: Option<bool>,

    /// new phrases allowed per day
    #[clap(long)]
    daily_limit: Option<u32>,

    /// reveal the target one character or one word at a time
    #[clap(long, value_enum)]
    reveal_units: Option<RevealMode>,

    /// shown in place of hidden units
    #[clap(long)]
    placeholder: Option<String>,

    /// speech command such as "espeak -v zh"; an empty string disables audio
    #[clap(long)]
    speak_command: Option<String>,
}

impl SettingsArgs {
    fn is_empty(&self) -> bool {
        self.auto_play.is_none()
            && self.formality.is_none()
            && self.unlimited.is_none()
            && self.daily_limit.is_none()
            && self.reveal_units.is_none()
            && self.placeholder.is_none()
            && self.speak_command.is_none()
    }

    fn apply_to(self, cfg: &mut Config) {
        if let Some(v) = self.auto_play {
            cfg.auto_play_audio = v;
        }
        if let Some(v) = self.formality {
            cfg.formality = v;
        }
        if let Some(v) = self.unlimited {
            cfg.unlimited = v;
        }
        if let Some(v) = self.daily_limit {
            cfg.daily_limit = v;
        }
        if let Some(v) = self.reveal_units {
            cfg.reveal_units = v;
        }
        if let Some(v) = self.placeholder {
            cfg.placeholder = v;
        }
        if let Some(v) = self.speak_command {
            cfg.speak_command = Some(v).filter(|c| !c.trim().is_empty());
        }
    }
}

pub struct App {
    db: PhraseDb,
    config_store: FileConfigStore,
    config: Config,
}

impl App {
    fn open(data_dir: Option<&Path>) -> anyhow::Result<Self> {
        let (db_path, config_store) = match data_dir {
            Some(dir) => (
                AppDirs::db_path_in(dir),
                FileConfigStore::with_path(AppDirs::config_path_in(dir)),
            ),
            None => (
                AppDirs::db_path().context("could not determine where to keep phrases")?,
                FileConfigStore::new(),
            ),
        };
        debug!(
            "database at {}, config at {}",
            db_path.display(),
            config_store.path().display()
        );
        let db = PhraseDb::open(&db_path)
            .with_context(|| format!("could not open {}", db_path.display()))?;
        let config = config_store.load();
        Ok(Self {
            db,
            config_store,
            config,
        })
    }

    fn quota(&self) -> DailyQuota<'_, SystemClock> {
        DailyQuota::new(
            &self.db,
            SystemClock,
            self.config.daily_limit,
            self.config.unlimited,
        )
    }

    fn audio(&self) -> Box<dyn AudioPlayback> {
        match self.config.speak_command.as_deref().map(CommandAudio::new) {
            Some(Ok(audio)) => Box::new(audio),
            Some(Err(e)) => {
                warn!("audio disabled: {e}");
                Box::new(SilentAudio)
            }
            None => Box::new(SilentAudio),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut app = App::open(cli.data_dir.as_deref())?;
    let mut out = io::stdout().lock();

    match cli.command.unwrap_or(Command::Practice) {
        Command::Practice => {
            drop(out);
            practice(&app)
        }
        Command::Add(args) => add(&app, &mut out, args),
        Command::List { due } => list(&app, &mut out, due, SystemClock.now()),
        Command::Delete { id } => delete(&app, &mut out, &id),
        Command::Clear { yes } => clear(&app, &mut out, yes),
        Command::Status => status(&app, &mut out, SystemClock.now()),
        Command::Settings(args) => settings(&mut app, &mut out, args),
    }
}

fn practice(app: &App) -> anyhow::Result<()> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut phrases = app.db.load_all()?;
    let rule = app.config.reveal_units.rule();

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, app, &mut phrases, rule.as_ref());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let reviewed = result?;
    println!(
        "reviewed {reviewed} phrase{}",
        if reviewed == 1 { "" } else { "s" }
    );
    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &App,
    phrases: &mut [Phrase],
    rule: &dyn RevealUnits,
) -> anyhow::Result<usize> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    let mut practice = Practice::start(
        phrases,
        rule,
        PracticeConfig::from(&app.config),
        app.audio(),
        SystemClock,
    );
    info!("practice started with {} due", practice.state().remaining);
    let mut notice: Option<String> = None;

    loop {
        terminal.draw(|f| render(&practice, notice.clone(), f))?;

        // ticks keep the relative due time fresh
        let Some(action) = runner.next_action() else {
            continue;
        };

        let outcome = match action {
            Action::Quit => break,
            Action::Reveal => practice.advance_reveal().map(|_| ()),
            Action::Replay => practice.speak_current(),
            Action::Rate(rating) => {
                let before = practice.session().reviewed().len();
                let outcome = practice.submit_rating(rating).map(|_| ());
                persist_review(&practice, &app.db, before)?;
                outcome
            }
        };
        notice = outcome.err().map(|e| e.to_string());
    }

    let session = practice.finish();
    info!("practice finished, {} reviewed", session.reviewed().len());
    Ok(session.reviewed().len())
}

/// Writes back the phrase rated by the last event, if it rated one.
fn persist_review<A: AudioPlayback, C: Clock>(
    practice: &Practice<'_, A, C>,
    db: &PhraseDb,
    reviewed_before: usize,
) -> phrasedrill::Result<()> {
    let session = practice.session();
    if session.reviewed().len() == reviewed_before {
        return Ok(());
    }
    let Some(id) = session.reviewed().last() else {
        return Ok(());
    };
    if let Some(phrase) = session.phrases().iter().find(|p| &p.id == id) {
        db.save_review(phrase)?;
    }
    Ok(())
}

fn render<A: AudioPlayback, C: Clock>(
    practice: &Practice<'_, A, C>,
    notice: Option<String>,
    f: &mut Frame,
) {
    let view = PracticeView::new(
        practice.state(),
        practice.session().current_phrase(),
        practice.masked_units(),
        practice.clock().now(),
        practice.session().reviewed().len(),
    )
    .with_notice(notice);
    f.render_widget(&view, f.area());
}

fn short_id(id: &PhraseId) -> String {
    id.to_string().chars().take(SHORT_ID_LEN).collect()
}

fn add(app: &App, out: &mut impl Write, args: AddArgs) -> anyhow::Result<()> {
    let formality = args.formality.unwrap_or(app.config.formality);
    let provider = ManualTranslation {
        target_text: args.target,
        target_pronunciation: args.pronunciation,
        literal_gloss: args.gloss,
    };
    let translation = provider.translate(&TranslationRequest {
        source_text: args.prompt.clone(),
        formality,
    })?;

    let mut quota = app.quota();
    let phrase = deck::add_phrase(
        &app.db,
        &mut quota,
        &args.prompt,
        translation,
        formality,
        SystemClock.now(),
    )?;

    writeln!(
        out,
        "added {}  {} → {}",
        short_id(&phrase.id),
        phrase.prompt_text,
        phrase.target_text
    )?;
    if let Some(left) = quota.remaining_today()? {
        writeln!(out, "{left} new phrase(s) left today")?;
    }
    Ok(())
}

fn list(
    app: &App,
    out: &mut impl Write,
    due_only: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<()> {
    let phrases = app.db.load_all()?;
    let shown: Vec<&Phrase> = phrases
        .iter()
        .rev()
        .filter(|p| !due_only || p.is_due(now))
        .collect();

    if shown.is_empty() {
        writeln!(out, "no phrases")?;
        return Ok(());
    }

    for phrase in shown {
        let due = if phrase.is_due(now) {
            "due now".to_string()
        } else {
            format!("due {}", describe_next_due(phrase.next_due_at, now))
        };
        writeln!(
            out,
            "{}  {} → {} ({})  [{}]",
            short_id(&phrase.id),
            phrase.prompt_text,
            phrase.target_text,
            phrase.target_pronunciation,
            due
        )?;
    }
    Ok(())
}

fn delete(app: &App, out: &mut impl Write, prefix: &str) -> anyhow::Result<()> {
    let id = app.db.resolve_prefix(prefix)?;
    app.db.delete(&id)?;
    writeln!(out, "deleted {}", short_id(&id))?;
    Ok(())
}

fn clear(app: &App, out: &mut impl Write, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to delete every phrase without --yes");
    }
    let deleted = app.db.delete_all()?;
    writeln!(out, "deleted {deleted} phrase(s)")?;
    Ok(())
}

fn status(
    app: &App,
    out: &mut impl Write,
    now: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<()> {
    let phrases = app.db.load_all()?;
    let summary = DeckStatus::of(&phrases, now);

    writeln!(out, "phrases: {}", summary.total)?;
    writeln!(out, "due now: {}", summary.due)?;
    match summary.next_due_at {
        Some(next) => writeln!(out, "next review: {}", describe_next_due(next, now))?,
        None => writeln!(out, "next review: none scheduled")?,
    }
    let quota = app.quota();
    match quota.remaining_today()? {
        Some(left) => writeln!(out, "new phrases left today: {left} of {}", quota.limit())?,
        None => writeln!(out, "new phrases left today: unlimited")?,
    }
    Ok(())
}

fn settings(app: &mut App, out: &mut impl Write, args: SettingsArgs) -> anyhow::Result<()> {
    if !args.is_empty() {
        args.apply_to(&mut app.config);
        app.config_store
            .save(&app.config)
            .with_context(|| format!("could not write {}", app.config_store.path().display()))?;
        info!("settings saved to {}", app.config_store.path().display());
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&app.config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use clap::Parser;
    use phrasedrill::{
        clock::FixedClock, phrase::Rating, reveal::CharUnits, scheduler::apply_rating,
        session::RevealState,
    };
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn temp_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let app = App::open(Some(dir.path())).unwrap();
        (dir, app)
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_cli_defaults_to_practice() {
        let cli = Cli::parse_from(["phrasedrill"]);
        assert!(cli.command.is_none());
        assert!(cli.data_dir.is_none());
    }

    #[test]
    fn test_cli_add_arguments() {
        let cli = Cli::parse_from([
            "phrasedrill",
            "add",
            "thank you",
            "--target",
            "谢谢",
            "-p",
            "xièxie",
            "--formality",
            "formal",
            "--data-dir",
            "/tmp/drill",
        ]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/drill")));
        match cli.command {
            Some(Command::Add(args)) => {
                assert_eq!(args.prompt, "thank you");
                assert_eq!(args.target, "谢谢");
                assert_eq!(args.pronunciation, "xièxie");
                assert_eq!(args.gloss, None);
                assert_eq!(args.formality, Some(Formality::Formal));
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_add_requires_target() {
        let result = Cli::try_parse_from(["phrasedrill", "add", "hello", "-p", "nǐ hǎo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_settings_arguments() {
        let cli = Cli::parse_from([
            "phrasedrill",
            "settings",
            "--auto-play",
            "false",
            "--reveal-units",
            "words",
        ]);
        match cli.command {
            Some(Command::Settings(args)) => {
                assert_eq!(args.auto_play, Some(false));
                assert_eq!(args.reveal_units, Some(RevealMode::Words));
                assert!(!args.is_empty());
            }
            other => panic!("expected settings, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_apply_clears_empty_speak_command() {
        let mut cfg = Config {
            speak_command: Some("espeak".into()),
            ..Default::default()
        };
        SettingsArgs {
            speak_command: Some("  ".into()),
            daily_limit: Some(10),
            ..Default::default()
        }
        .apply_to(&mut cfg);
        assert_eq!(cfg.speak_command, None);
        assert_eq!(cfg.daily_limit, 10);
    }

    #[test]
    fn test_add_then_list_newest_first() {
        let (_dir, app) = temp_app();
        for (prompt, target) in [("hello", "你好"), ("thanks", "谢谢")] {
            let args = AddArgs {
                prompt: prompt.into(),
                target: target.into(),
                pronunciation: "x".into(),
                gloss: None,
                formality: None,
            };
            output(|out| add(&app, out, args));
        }

        let text = output(|out| list(&app, out, false, SystemClock.now()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("thanks → 谢谢"));
        assert!(lines[1].contains("hello → 你好"));
        assert!(lines[0].contains("due now"));
    }

    #[test]
    fn test_list_due_only_hides_scheduled() {
        let (_dir, app) = temp_app();
        let mut later = Phrase::new("later", "以后", "yǐhòu", now() - Duration::hours(1));
        apply_rating(&mut later, Rating::Easy, now());
        app.db.insert(&later).unwrap();
        app.db
            .insert(&Phrase::new("now", "现在", "xiànzài", now()))
            .unwrap();

        let text = output(|out| list(&app, out, true, now()));
        assert!(text.contains("现在"));
        assert!(!text.contains("以后"));
    }

    #[test]
    fn test_status_reports_due_and_next() {
        let (_dir, app) = temp_app();
        let mut later = Phrase::new("later", "以后", "yǐhòu", now() - Duration::hours(1));
        apply_rating(&mut later, Rating::Easy, now());
        app.db.insert(&later).unwrap();
        app.db
            .insert(&Phrase::new("now", "现在", "xiànzài", now()))
            .unwrap();

        let text = output(|out| status(&app, out, now()));
        assert!(text.contains("phrases: 2"));
        assert!(text.contains("due now: 1"));
        assert!(text.contains("next review: in"));
    }

    #[test]
    fn test_delete_by_prefix_and_clear() {
        let (_dir, app) = temp_app();
        let first = Phrase::new("a", "一", "yī", now());
        app.db.insert(&first).unwrap();
        app.db.insert(&Phrase::new("b", "二", "èr", now())).unwrap();

        output(|out| delete(&app, out, &short_id(&first.id)));
        assert_eq!(app.db.count().unwrap(), 1);

        assert!(clear(&app, &mut Vec::<u8>::new(), false).is_err());
        assert_eq!(app.db.count().unwrap(), 1);
        output(|out| clear(&app, out, true));
        assert_eq!(app.db.count().unwrap(), 0);
    }

    #[test]
    fn test_settings_persist_between_opens() {
        let (dir, mut app) = temp_app();
        let args = SettingsArgs {
            unlimited: Some(true),
            ..Default::default()
        };
        let text = output(|out| settings(&mut app, out, args));
        assert!(text.contains("\"unlimited\": true"));

        let reopened = App::open(Some(dir.path())).unwrap();
        assert!(reopened.config.unlimited);
    }

    #[test]
    fn test_persist_review_writes_back_rated_phrase() {
        let (dir, app) = temp_app();
        app.db
            .insert(&Phrase::new("hello", "你好", "nǐ hǎo", now()))
            .unwrap();
        let mut phrases = app.db.load_all().unwrap();
        let clock = FixedClock::new(now());
        let config = PracticeConfig {
            auto_play_audio: false,
            ..Default::default()
        };
        let mut practice = Practice::start(&mut phrases, &CharUnits, config, SilentAudio, &clock);

        // no rating yet, nothing to write
        practice.advance_reveal().unwrap();
        persist_review(&practice, &app.db, 0).unwrap();
        let untouched = &app.db.load_all().unwrap()[0];
        assert_eq!(untouched.last_reviewed_at, None);
        assert_eq!(untouched.next_due_at, now());

        while practice.state().reveal_state != RevealState::RatingReady {
            practice.advance_reveal().unwrap();
        }
        let before = practice.session().reviewed().len();
        practice.submit_rating(Rating::Easy).unwrap();
        persist_review(&practice, &app.db, before).unwrap();
        drop(practice);

        let reopened = App::open(Some(dir.path())).unwrap();
        let stored = &reopened.db.load_all().unwrap()[0];
        assert_eq!(stored.repetition_count, 1);
        assert_eq!(stored.last_reviewed_at, Some(now()));
        assert_eq!(stored.next_due_at, now() + Duration::days(1));
    }
}
