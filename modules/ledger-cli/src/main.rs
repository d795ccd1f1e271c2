use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ledger_calendar::{
    load_config, CalendarConfig, CalendarError, CalendarResult, Clock, FixedClock, GameCalendar,
    GameDate, GameDateTime, SystemClock, WeekKey, WeekRange,
};

#[derive(Parser)]
#[command(name = "ledger", about = "Game day and week keys for the ledger")]
struct Cli {
    /// Path to config TOML file (defaults plus LEDGER_* env vars if omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate at this instant instead of now. RFC 3339, or a bare
    /// `YYYY-MM-DDTHH:MM:SS` read in the calendar's reference offset.
    #[arg(long, global = true)]
    at: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current game date
    Today,
    /// Current game week key and its date range
    Week,
    /// Whether records for a stored game date may still be edited (exit 1 if
    /// not). Anything other than a canonical `YYYY-MM-DD` is locked.
    Editable { date: String },
    /// Whether two game dates fall in the same game week (exit 1 if not)
    SameWeek { first: GameDate, second: GameDate },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Report {
    Today {
        game_date: GameDate,
        game_datetime: GameDateTime,
        week_key: WeekKey,
    },
    Week(WeekRange),
    Editable {
        date: String,
        today: GameDate,
        editable: bool,
    },
    SameWeek {
        first: WeekKey,
        second: WeekKey,
        same_week: bool,
    },
}

impl Report {
    fn succeeded(&self) -> bool {
        match self {
            Report::Editable { editable, .. } => *editable,
            Report::SameWeek { same_week, .. } => *same_week,
            Report::Today { .. } | Report::Week(_) => true,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Today {
                game_date,
                game_datetime,
                week_key,
            } => write!(f, "{game_date} ({week_key}, stamped {game_datetime})"),
            Report::Week(range) => write!(f, "{} ({} .. {})", range.key, range.start, range.end),
            Report::Editable {
                date,
                today,
                editable,
            } => {
                if *editable {
                    write!(f, "{date} is editable")
                } else {
                    write!(f, "{date} is locked (current game date is {today})")
                }
            }
            Report::SameWeek {
                first,
                second,
                same_week,
            } => {
                if *same_week {
                    write!(f, "same week ({first})")
                } else {
                    write!(f, "different weeks ({first} vs {second})")
                }
            }
        }
    }
}

/// Exit code for a negative `editable` / `same-week` answer.
const EXIT_NO: u8 = 1;
/// Exit code for bad input, bad config or an unsupported instant.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ledger=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = run(&cli);
    if let Err(e) = &outcome {
        eprintln!("Error: {e:#}");
    }
    ExitCode::from(exit_status(&outcome))
}

fn run(cli: &Cli) -> Result<Report> {
    let calendar = load_calendar(cli.config.as_deref())?;

    let report = match cli.at.as_deref() {
        Some(raw) => {
            let instant = parse_instant(raw, calendar.offset())?;
            tracing::info!(at = %instant, "Evaluating at fixed instant");
            execute(&cli.command, &calendar, &FixedClock(instant))?
        }
        None => execute(&cli.command, &calendar, &SystemClock)?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(report)
}

fn exit_status(outcome: &Result<Report>) -> u8 {
    match outcome {
        Ok(report) if report.succeeded() => 0,
        Ok(_) => EXIT_NO,
        Err(_) => EXIT_ERROR,
    }
}

/// File config (if given) with `LEDGER_*` env overrides on top.
fn load_calendar(path: Option<&Path>) -> Result<GameCalendar> {
    let base = match path {
        Some(path) => {
            tracing::info!(config = %path.display(), "Loading config");
            load_config(path)?
        }
        None => CalendarConfig::default(),
    };
    let config = base.with_env_overrides()?;
    config.log_summary();
    Ok(GameCalendar::new(&config)?)
}

/// Parse an `--at` value. Inputs without an offset are wall-clock time in
/// the calendar's reference offset.
fn parse_instant(raw: &str, offset: FixedOffset) -> CalendarResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            CalendarError::InvalidArgument(format!(
                "expected RFC 3339 or YYYY-MM-DDTHH:MM:SS, got {raw:?}"
            ))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CalendarError::InvalidArgument(format!("ambiguous local time: {raw:?}")))
}

fn execute(
    command: &Command,
    calendar: &GameCalendar,
    clock: &dyn Clock,
) -> CalendarResult<Report> {
    let now = clock.now();
    let report = match command {
        Command::Today => Report::Today {
            game_date: calendar.to_game_date(&now)?,
            game_datetime: calendar.game_datetime(&now)?,
            week_key: calendar.to_week_key(&now)?,
        },
        Command::Week => Report::Week(calendar.week_range(&now)?),
        Command::Editable { date } => Report::Editable {
            date: date.clone(),
            today: calendar.to_game_date(&now)?,
            editable: calendar.is_editable_str(date, &now),
        },
        Command::SameWeek { first, second } => Report::SameWeek {
            first: calendar.week_key_of(*first)?,
            second: calendar.week_key_of(*second)?,
            same_week: calendar.is_same_week(*first, *second)?,
        },
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn clock_at(raw: &str) -> FixedClock {
        FixedClock(parse_instant(raw, kst()).unwrap())
    }

    fn editable(date: &str) -> Command {
        Command::Editable { date: date.into() }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ledger", "editable", "2024-01-16", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Editable { .. }));
    }

    #[test]
    fn rejects_malformed_same_week_argument() {
        assert!(Cli::try_parse_from(["ledger", "same-week", "2024-1-16", "2024-01-17"]).is_err());
    }

    #[test]
    fn rfc3339_keeps_its_own_offset() {
        let instant = parse_instant("2024-01-16T18:00:00Z", kst()).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 16, 18, 0, 0).unwrap());
    }

    #[test]
    fn bare_datetime_is_read_in_reference_offset() {
        let instant = parse_instant("2024-01-17T03:00:00", kst()).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 16, 18, 0, 0).unwrap());
        let spaced = parse_instant("2024-01-17 03:00:00", kst()).unwrap();
        assert_eq!(spaced, instant);
    }

    #[test]
    fn garbage_instant_is_invalid_argument() {
        let err = parse_instant("yesterday", kst()).unwrap_err();
        assert!(matches!(err, CalendarError::InvalidArgument(_)));
    }

    #[test]
    fn today_report() {
        let report = execute(
            &Command::Today,
            &GameCalendar::default(),
            &clock_at("2024-01-17T03:00:00+09:00"),
        )
        .unwrap();
        assert_eq!(report.to_string(), "2024-01-16 (2024-W02, stamped 2024-01-16T03:00:00)");
        assert!(report.succeeded());
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "game_date": "2024-01-16",
                "game_datetime": "2024-01-16T03:00:00",
                "week_key": "2024-W02",
            })
        );
    }

    #[test]
    fn week_report() {
        let report = execute(
            &Command::Week,
            &GameCalendar::default(),
            &clock_at("2024-01-17T03:00:00+09:00"),
        )
        .unwrap();
        assert_eq!(report.to_string(), "2024-W02 (2024-01-10 .. 2024-01-16)");
    }

    #[test]
    fn editable_report_fails_for_other_days() {
        let calendar = GameCalendar::default();
        let clock = clock_at("2024-01-17T03:00:00+09:00");

        let ok = execute(&editable("2024-01-16"), &calendar, &clock).unwrap();
        assert!(ok.succeeded());

        let locked = execute(&editable("2024-01-17"), &calendar, &clock).unwrap();
        assert!(!locked.succeeded());
        assert_eq!(
            locked.to_string(),
            "2024-01-17 is locked (current game date is 2024-01-16)"
        );
    }

    #[test]
    fn malformed_stored_date_is_locked() {
        let calendar = GameCalendar::default();
        let clock = clock_at("2024-01-17T03:00:00+09:00");

        let report = execute(&editable("2024-1-16"), &calendar, &clock).unwrap();
        assert!(!report.succeeded());
        assert_eq!(
            report.to_string(),
            "2024-1-16 is locked (current game date is 2024-01-16)"
        );
        assert_eq!(exit_status(&Ok(report)), EXIT_NO);
    }

    #[test]
    fn same_week_report() {
        let calendar = GameCalendar::default();
        let clock = SystemClock;
        let report = execute(
            &Command::SameWeek {
                first: "2024-01-16".parse().unwrap(),
                second: "2024-01-17".parse().unwrap(),
            },
            &calendar,
            &clock,
        )
        .unwrap();
        assert!(!report.succeeded());
        assert_eq!(report.to_string(), "different weeks (2024-W02 vs 2024-W03)");
    }

    #[test]
    fn unsupported_instant_is_an_error() {
        let calendar = GameCalendar::default();
        let clock = FixedClock(kst().with_ymd_and_hms(10000, 1, 8, 12, 0, 0).unwrap().with_timezone(&Utc));
        assert!(execute(&Command::Today, &calendar, &clock).is_err());
        assert!(execute(&Command::Week, &calendar, &clock).is_err());
    }

    #[test]
    fn errors_exit_differently_from_negative_answers() {
        let calendar = GameCalendar::default();
        let clock = clock_at("2024-01-17T03:00:00+09:00");

        let yes = execute(&editable("2024-01-16"), &calendar, &clock);
        let no = execute(&editable("2024-01-17"), &calendar, &clock);
        assert_eq!(exit_status(&yes.map_err(Into::into)), 0);
        assert_eq!(exit_status(&no.map_err(Into::into)), EXIT_NO);

        let failed: Result<Report> = Err(anyhow::anyhow!("bad config"));
        assert_eq!(exit_status(&failed), EXIT_ERROR);
        assert_ne!(EXIT_NO, EXIT_ERROR);
    }
}
