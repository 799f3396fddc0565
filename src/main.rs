//! The `mozart` command-line tool inspects a MIDI file and prints the playback
//! sequences a practice session would send to a transport.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use mozart::playback::build_range_sequence;
use mozart::{smf, Composition, Config, PlaybackMode, Staff, StaffSelection};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// MIDI file to read
    input: PathBuf,

    /// YAML file overriding the default configuration
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Staff to show: 0 for all parts merged, N for the N-th track
    #[clap(short, long, value_parser)]
    staff: Option<usize>,

    /// First chord position of the played range
    #[clap(long, value_parser)]
    from: Option<usize>,

    /// Last chord position of the played range
    #[clap(long, value_parser)]
    to: Option<usize>,

    /// How notes are spaced when played
    #[clap(short, long, value_enum, default_value_t = Mode::Synchronized)]
    mode: Mode,

    /// Print the playback sequence of the range as JSON
    #[clap(short, long, value_parser)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Synchronized,
    Offset,
}

impl From<Mode> for PlaybackMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Synchronized => PlaybackMode::Synchronized,
            Mode::Offset => PlaybackMode::Offset,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Config::from_yaml(&content)?
        }
        None => Config::default(),
    };

    let bytes =
        fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let title = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string());
    let song = smf::load_composition(&bytes, title, &config)?;

    let selection = match args.staff {
        None if !args.json => {
            print_summary(&song);
            return Ok(());
        }
        None | Some(0) => StaffSelection::Composite,
        Some(n) => StaffSelection::Track(n - 1),
    };
    let Some(staff) = song.staff(selection) else {
        bail!(
            "'{}' has {} track staff(s); no staff {:?}",
            song.title(),
            song.tracks().len(),
            args.staff
        );
    };

    let from = args.from.unwrap_or(0);
    let to = args.to.unwrap_or_else(|| staff.len().saturating_sub(1));
    if to >= staff.len() || from > to {
        bail!(
            "range {}..={} is outside '{}' ({} chords)",
            from,
            to,
            staff.description(),
            staff.len()
        );
    }

    if args.json {
        let range = build_range_sequence(
            &staff.chords()[from..=to],
            staff.timing(),
            args.mode.into(),
            &config,
        );
        println!("{}", serde_json::to_string_pretty(&range.sequence)?);
    } else {
        print_chords(staff, from, to);
    }
    Ok(())
}

fn print_summary(song: &Composition) {
    let options = song.options();
    println!("{}", song.title());
    println!(
        "  time signature {}/{}, {} ppq, {} mpq",
        options.numerator, options.denominator, options.ppq, options.mpq
    );
    for (i, staff) in song.staves().iter().enumerate() {
        println!("  [{}] {}: {} chord(s)", i, staff.description(), staff.len());
    }
}

fn print_chords(staff: &Staff, from: usize, to: usize) {
    println!(
        "{} ({}/{}, {} ppq)",
        staff.description(),
        staff.numerator(),
        staff.denominator(),
        staff.ppq()
    );
    for (position, chord) in staff.chords().iter().enumerate().take(to + 1).skip(from) {
        println!(
            "  {:>4}  {:<12} {}",
            position,
            chord.position_label(staff.numerator(), staff.ppq()),
            chord
        );
    }
}
