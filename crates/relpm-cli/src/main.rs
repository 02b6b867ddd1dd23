//! RelPM - keep M3U playlists portable by storing tracks relative to the
//! playlist file.
//!
//! This is the command line entry point. It plays the role of the user
//! interface for the core library: it renders progress, answers encoding
//! and missing-track questions from stdin, and reports failures.

mod controller;
mod error;
mod logging;
mod prompt;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use relpm_core::{AppConfig, PlaylistList, ReadOptions, Separator, WriteOptions, relative_path};
use tracing::{error, info, warn};

use crate::controller::{read_playlist, write_playlist};
use crate::error::{CliError, CliResult};
use crate::logging::{LoggingConfig, LoggingGuard};
use crate::prompt::{Prompter, Refuse, StdinPrompter};

#[derive(Parser, Debug)]
#[command(name = "relpm", version)]
#[command(about = "Keep M3U playlists portable by storing tracks relative to the playlist")]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Verbose logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file to use instead of the default one.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for log files instead of the default one.
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the configured read and write behaviour.
#[derive(Args, Debug, Clone, Default)]
struct SessionArgs {
    /// Read metadata from the audio files' tags instead of #EXTINF lines.
    #[arg(long, global = true)]
    tags_from_files: bool,

    /// Also write <name>_last100.<ext> holding the final 100 tracks.
    #[arg(long, global = true)]
    last100: bool,

    /// Encoding to use for non-ASCII text instead of asking.
    #[arg(long, global = true, value_name = "LABEL")]
    encoding: Option<String>,

    /// Abort instead of asking questions.
    #[arg(long, global = true)]
    non_interactive: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tracks of a playlist.
    Show {
        /// Playlist file.
        playlist: PathBuf,
    },
    /// Read a playlist and save it somewhere else, recalculating paths.
    Convert {
        /// Playlist to read.
        input: PathBuf,
        /// Playlist to write.
        output: PathBuf,
    },
    /// Start a new playlist, optionally with files in it.
    Create {
        /// Playlist file; must not exist yet.
        playlist: PathBuf,
        /// Files to put in, in order.
        files: Vec<PathBuf>,
    },
    /// Read and rewrite a playlist in place.
    Resave {
        /// Playlist file.
        playlist: PathBuf,
    },
    /// Insert audio files into a playlist.
    Insert {
        /// Playlist file.
        playlist: PathBuf,
        /// Track number the first file gets (default: append).
        #[arg(long)]
        at: Option<usize>,
        /// Files to insert, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove tracks by number.
    Remove {
        /// Playlist file.
        playlist: PathBuf,
        /// Track numbers as shown by `show`.
        #[arg(required = true)]
        numbers: Vec<usize>,
    },
    /// Move tracks as one block.
    Move {
        /// Playlist file.
        playlist: PathBuf,
        /// Track number the block is dropped before (one past the end appends).
        #[arg(long)]
        to: usize,
        /// Track numbers as shown by `show`.
        #[arg(required = true)]
        numbers: Vec<usize>,
    },
    /// Print TARGET relative to BASE (a trailing separator marks a directory).
    Relative {
        /// Absolute target path.
        target: String,
        /// Absolute base file or directory.
        base: String,
        /// Use `\` instead of `/` in the result.
        #[arg(long)]
        windows: bool,
    },
}

/// Loaded configuration plus the options for this run.
struct Session {
    config: AppConfig,
    config_path: Option<PathBuf>,
    read: ReadOptions,
    write: WriteOptions,
}

impl Session {
    fn load(config_path: Option<&Path>, args: &SessionArgs) -> CliResult<Self> {
        let config = match config_path {
            Some(path) if path.exists() => AppConfig::load_from(path)?,
            Some(_) => AppConfig::default(),
            None => AppConfig::load()?,
        };

        let mut effective = config.clone();
        if args.tags_from_files {
            effective.import.parse_extinf_tags = false;
        }
        if args.last100 {
            effective.export.write_last100 = true;
        }
        if let Some(label) = &args.encoding {
            effective.encoding = Some(label.clone());
        }

        Ok(Self {
            read: effective.read_options()?,
            write: effective.write_options()?,
            config,
            config_path: config_path.map(Path::to_path_buf),
        })
    }

    fn remember(&mut self, playlist: &Path) {
        self.config.last_file = Some(playlist.to_path_buf());
        let saved = match &self.config_path {
            Some(path) => self.config.save_to(path),
            None => self.config.save(),
        };
        if let Err(e) = saved {
            warn!("Could not remember last file: {}", e);
        }
    }
}

/// Convert a 1-based track number to an index.
fn to_index(number: usize) -> CliResult<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| CliError::Usage("track numbers start at 1".to_string()))
}

fn print_list(list: &PlaylistList) {
    println!("{} ({} tracks)", list.playlist().display(), list.len());
    for (i, track) in list.iter().enumerate() {
        let duration = track.metadata().formatted_duration().unwrap_or_default();
        println!("{:>4}  {:>6}  {}", i + 1, duration, track);
        if track.title().is_some() {
            println!("              {}", track.relative_path());
        }
    }
}

async fn edit_and_save<P: Prompter>(
    session: &mut Session,
    playlist: &Path,
    prompter: &mut P,
    edit: impl FnOnce(&mut PlaylistList) -> CliResult<()>,
) -> CliResult<()> {
    let mut list = read_playlist(playlist, session.read, prompter).await?;
    edit(&mut list)?;
    save(session, list, playlist, prompter).await
}

async fn save<P: Prompter>(
    session: &mut Session,
    list: PlaylistList,
    target: &Path,
    prompter: &mut P,
) -> CliResult<()> {
    for path in write_playlist(list, target, session.write, prompter).await? {
        println!("Wrote {}", path.display());
    }
    session.remember(target);
    Ok(())
}

async fn run<P: Prompter>(cli: &Cli, prompter: &mut P) -> CliResult<()> {
    if let Command::Relative { target, base, windows } = &cli.command {
        let separator = if *windows { Separator::Windows } else { Separator::Unix };
        println!("{}", relative_path(target, base, separator)?);
        return Ok(());
    }

    let mut session = Session::load(cli.config.as_deref(), &cli.session)?;

    match &cli.command {
        Command::Show { playlist } => {
            let list = read_playlist(playlist, session.read, prompter).await?;
            print_list(&list);
            session.remember(playlist);
        }
        Command::Convert { input, output } => {
            let list = read_playlist(input, session.read, prompter).await?;
            save(&mut session, list, output, prompter).await?;
        }
        Command::Create { playlist, files } => {
            if playlist.exists() {
                return Err(CliError::Usage(format!("{} already exists", playlist.display())));
            }
            let mut list = PlaylistList::new(playlist);
            list.insert_files(0, files, true)?;
            save(&mut session, list, playlist, prompter).await?;
        }
        Command::Resave { playlist } => {
            edit_and_save(&mut session, playlist, prompter, |_| Ok(())).await?;
        }
        Command::Insert { playlist, at, files } => {
            edit_and_save(&mut session, playlist, prompter, |list| {
                let index = match at {
                    Some(number) => to_index(*number)?,
                    None => list.len(),
                };
                Ok(list.insert_files(index, files, true)?)
            })
            .await?;
        }
        Command::Remove { playlist, numbers } => {
            let indices = numbers.iter().map(|&n| to_index(n)).collect::<CliResult<Vec<_>>>()?;
            edit_and_save(&mut session, playlist, prompter, |list| {
                let removed = list.remove_many(&indices)?;
                info!("Removed {} tracks", removed.len());
                Ok(())
            })
            .await?;
        }
        Command::Move { playlist, to, numbers } => {
            let indices = numbers.iter().map(|&n| to_index(n)).collect::<CliResult<Vec<_>>>()?;
            let drop_index = to_index(*to)?;
            edit_and_save(&mut session, playlist, prompter, |list| {
                list.move_items(&indices, drop_index)?;
                Ok(())
            })
            .await?;
        }
        Command::Relative { .. } => {}
    }
    Ok(())
}

/// Set up logging for this run.
///
/// A `--log-dir` that cannot be used is an error. Trouble with the default
/// location only costs the log file.
fn setup_logging(cli: &Cli) -> CliResult<Option<LoggingGuard>> {
    let mut config = if cli.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_directory(dir.clone());
    }

    match logging::init(&config) {
        Ok(guard) => Ok(Some(guard)),
        Err(e) if cli.log_dir.is_some() => Err(e.into()),
        Err(e) => {
            eprintln!("relpm: {e}");
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("relpm: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    info!("Starting relpm: {:?}", cli.command);

    let result = if cli.session.non_interactive {
        run(&cli, &mut Refuse).await
    } else {
        run(&cli, &mut StdinPrompter::new()).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("relpm: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
