// src/bin/jourlog.rs

//! Driver program _jourlog_.
//!
//! Processes user-passed command-line arguments.
//! In the default mode, opens the journal, applies the filters, and prints
//! matching entries.
//! In `--send` mode, writes one entry to the journal.
//!
//! Exits with `0` when reading ends because there are no more matching
//! entries or the `--limit` was reached; `1` for any other error.

#![allow(non_camel_case_types)]

use std::io::Write;
use std::process::ExitCode;

use ::chrono::{
    DateTime,
    Local,
};
use ::clap::Parser;
use ::const_format::concatcp;
use ::si_trace_print::stack::stack_offset_set;
use ::si_trace_print::{
    defn,
    defo,
    defx,
};

use ::jourlog::common::FPath;
use ::jourlog::data::datetime::{
    parse_datetime_arg,
    DateTimeL,
};
use ::jourlog::data::journal::{
    JournalEntry,
    JournalOutput,
};
use ::jourlog::data::priority::Priority;
use ::jourlog::error::ReaderError;
use ::jourlog::readers::filters::TimeWindow;
use ::jourlog::readers::journalreader::JournalReader;
use ::jourlog::writers::jourlog::JourLog;
use ::jourlog::{
    de_wrn,
    e_err,
    jlog,
};

#[cfg(debug_assertions)]
const CLI_HELP_AFTER_NOTE_DEBUG: &str = "\nDEBUG BUILD";
#[cfg(not(debug_assertions))]
const CLI_HELP_AFTER_NOTE_DEBUG: &str = "";

/// `--help` _afterword_ message.
const CLI_HELP_AFTER: &str = concatcp!(
    "\
Filters of different fields must all match. Repeated --match of the same
field match any of the values.

DateTime values for --since and --until may be:
    \"2023-04-01T06:44:32+00:00\"   RFC 3339
    \"2023-04-01 06:44:32\"         local time
    \"2023-04-01\"                  local midnight
    \"@1680331472\"                 Unix epoch seconds
    \"-2h\"                         relative to now (s, m, h, d, w)
To pass a value with leading \"-\" use \"=\" notation, e.g. \"--since=-2h\".

Priority may be a name (emerg, alert, crit, err, warning, notice, info,
debug) or a number 0-7. Entries of that priority or more severe are printed.
",
    CLI_HELP_AFTER_NOTE_DEBUG,
);

// Note:
// * the `about` is taken from `Cargo.toml:[package]:description`.
#[derive(Parser, Debug)]
#[clap(
    about = env!("CARGO_PKG_DESCRIPTION"),
    author = env!("CARGO_PKG_AUTHORS"),
    name = "jourlog",
    version = concatcp!(
        "Version: ",
        env!("CARGO_PKG_VERSION_MAJOR"), ".",
        env!("CARGO_PKG_VERSION_MINOR"), ".",
        env!("CARGO_PKG_VERSION_PATCH"), "\n",
        "MSRV: ", env!("CARGO_PKG_RUST_VERSION"), "\n",
        "License: ", env!("CARGO_PKG_LICENSE"), "\n",
    ),
    after_help = CLI_HELP_AFTER,
    verbatim_doc_comment,
    // `--send` is an exclusive "mode"
    override_usage = "\n  jourlog [OPTIONS]\n\n  jourlog --send <MESSAGE> [--send-priority <PRIORITY>] [--field <KEY=VALUE>...]",
)]
struct CLI_Args {
    /// Match entries of this systemd unit (_SYSTEMD_UNIT).
    #[clap(short = 'u', long, verbatim_doc_comment)]
    unit: Option<String>,

    /// Match entries of this service (__SYSTEMD_SERVICE).
    #[clap(long, verbatim_doc_comment)]
    service: Option<String>,

    /// Match entries from this host (_HOSTNAME).
    #[clap(short = 'H', long, verbatim_doc_comment)]
    hostname: Option<String>,

    /// Match entries from this executable path (_EXE).
    #[clap(short = 'e', long, verbatim_doc_comment)]
    exe: Option<String>,

    /// Match entries whose MESSAGE is exactly this text.
    #[clap(short = 'm', long, verbatim_doc_comment)]
    message: Option<String>,

    /// Match entries of this priority or more severe.
    #[clap(
        short = 'p',
        long,
        verbatim_doc_comment,
        value_parser = cli_parse_priority,
    )]
    priority: Option<i64>,

    /// Match entries at or after this datetime.
    #[clap(
        short = 'S',
        long,
        verbatim_doc_comment,
        allow_hyphen_values = true,
    )]
    since: Option<String>,

    /// Match entries at or before this datetime.
    #[clap(
        short = 'U',
        long,
        verbatim_doc_comment,
        allow_hyphen_values = true,
    )]
    until: Option<String>,

    /// Match entries within this time window ending now.
    #[clap(long, value_enum, verbatim_doc_comment)]
    window: Option<TimeWindow>,

    /// Add a raw match expression, e.g. "SYSLOG_IDENTIFIER=sshd".
    /// May be passed more than once.
    #[clap(short = 'M', long = "match", verbatim_doc_comment)]
    matches: Vec<String>,

    /// Print at most this many entries. 0 is unlimited.
    #[clap(short = 'n', long, default_value_t = 0, verbatim_doc_comment)]
    limit: i64,

    /// Start reading after the entry of this cursor token.
    #[clap(long, verbatim_doc_comment)]
    after_cursor: Option<String>,

    /// After the last entry, print the cursor token to resume from with
    /// --after-cursor. Nothing is printed if no entry was read and no
    /// --after-cursor was passed.
    #[clap(long, verbatim_doc_comment)]
    show_cursor: bool,

    /// Output format.
    #[clap(
        short = 'o',
        long,
        value_enum,
        default_value_t = JournalOutput::Short,
        verbatim_doc_comment,
    )]
    output: JournalOutput,

    /// Read these journal files instead of the local journal.
    #[clap(short = 'D', long, num_args = 1.., verbatim_doc_comment)]
    files: Vec<FPath>,

    /// Write MESSAGE to the journal and exit.
    #[clap(
        long,
        verbatim_doc_comment,
        conflicts_with_all = [
            "unit", "service", "hostname", "exe", "message", "priority",
            "since", "until", "window", "matches", "after_cursor",
            "show_cursor", "files",
        ],
    )]
    send: Option<String>,

    /// Priority of the --send message.
    #[clap(
        long,
        default_value_t = Priority::Info,
        value_parser = cli_parse_send_priority,
        verbatim_doc_comment,
    )]
    send_priority: Priority,

    /// Extra KEY=VALUE field of the --send message.
    /// May be passed more than once.
    #[clap(
        long = "field",
        value_parser = cli_parse_field,
        requires = "send",
        verbatim_doc_comment,
    )]
    fields: Vec<(String, String)>,
}

/// `clap` argument parser for `--priority`.
///
/// Numbers are passed through unchecked; the reader validates the range.
fn cli_parse_priority(input: &str) -> Result<i64, String> {
    if let Ok(value) = input.trim().parse::<i64>() {
        return Ok(value);
    }

    input.parse::<Priority>().map(|p| p.as_u8() as i64)
}

/// `clap` argument parser for `--send-priority`.
fn cli_parse_send_priority(input: &str) -> Result<Priority, String> {
    input.parse::<Priority>()
}

/// `clap` argument parser for `--field`.
fn cli_parse_field(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", input)),
    }
}

/// Parse a `--since` or `--until` value.
fn cli_process_datetime(
    input: &str,
    now: &DateTime<Local>,
    arg: &str,
) -> Result<DateTimeL, String> {
    parse_datetime_arg(input, now).map_err(|err| format!("--{} {}", arg, err))
}

/// Apply all filter arguments to `reader`.
fn apply_filters(
    reader: &mut JournalReader,
    args: &CLI_Args,
    now: &DateTime<Local>,
) -> Result<(), String> {
    defn!();
    if let Some(unit) = &args.unit {
        reader.set_unit(unit).map_err(|err| err.to_string())?;
    }
    if let Some(service) = &args.service {
        reader.set_service(service).map_err(|err| err.to_string())?;
    }
    if let Some(hostname) = &args.hostname {
        reader.set_hostname(hostname).map_err(|err| err.to_string())?;
    }
    if let Some(exe) = &args.exe {
        reader.set_executable(exe).map_err(|err| err.to_string())?;
    }
    if let Some(message) = &args.message {
        reader.set_message_filter(message).map_err(|err| err.to_string())?;
    }
    if let Some(priority) = args.priority {
        reader.set_priority(priority).map_err(|err| err.to_string())?;
    }
    if let Some(since) = &args.since {
        let dt = cli_process_datetime(since, now, "since")?;
        reader.set_since(&dt).map_err(|err| err.to_string())?;
    }
    if let Some(until) = &args.until {
        let dt = cli_process_datetime(until, now, "until")?;
        reader.set_until(&dt).map_err(|err| err.to_string())?;
    }
    if let Some(window) = args.window {
        reader.apply_window_at(window, now).map_err(|err| err.to_string())?;
    }
    for expr in args.matches.iter() {
        reader.add_filter(expr).map_err(|err| err.to_string())?;
    }
    defx!();

    Ok(())
}

/// Position `reader` at the head or after `--after-cursor`.
fn position(
    reader: &mut JournalReader,
    args: &CLI_Args,
) -> Result<(), ReaderError> {
    match &args.after_cursor {
        Some(cursor) => {
            reader.seek_cursor(cursor)?;
            // the entry at the cursor itself was already seen
            match reader.retrieve_entry() {
                Ok(entry) if entry.cursor() == cursor => {
                    defo!("skipped entry at cursor");
                }
                Ok(_entry) => {
                    defo!("cursor entry no longer matches; rewind");
                    reader.seek_cursor(cursor)?;
                }
                Err(ReaderError::MalformedEntry) => {}
                Err(err) if err.is_exhausted() => {}
                Err(err) => return Err(err),
            }
            reader.reset_counter();
        }
        None => reader.seek_head()?,
    }

    Ok(())
}

/// Print matching entries until the traversal ends.
/// Returns `true` if it ended normally.
fn read_mode(args: &CLI_Args) -> bool {
    defn!();
    let opened = if args.files.is_empty() {
        JournalReader::open()
    } else {
        JournalReader::open_files(&args.files)
    };
    let mut reader: JournalReader = match opened {
        Ok(reader) => reader,
        Err(err) => {
            e_err!("{}", err);
            defx!("open failed");
            return false;
        }
    };

    let now: DateTime<Local> = Local::now();
    if let Err(err) = apply_filters(&mut reader, args, &now) {
        e_err!("{}", err);
        defx!("apply_filters failed");
        return false;
    }
    reader.set_limit(args.limit);
    if let Err(err) = position(&mut reader, args) {
        e_err!("{}", err);
        defx!("position failed");
        return false;
    }

    let stdout = std::io::stdout();
    let mut stdout_lock = stdout.lock();
    let mut ok: bool = true;
    // resume point; unchanged if nothing new is printed
    let mut last_cursor: Option<String> = args.after_cursor.clone();
    loop {
        let entry: JournalEntry = match reader.retrieve_entry() {
            Ok(entry) => entry,
            Err(ReaderError::MalformedEntry) => {
                de_wrn!("skipping entry without MESSAGE");
                continue;
            }
            Err(err) if err.is_end_of_traversal() => {
                defo!("{}", err);
                break;
            }
            Err(err) => {
                e_err!("{}", err);
                ok = false;
                break;
            }
        };
        if let Err(_err) = writeln!(stdout_lock, "{}", entry.to_output_string(args.output)) {
            // e.g. broken pipe
            defo!("write failed {}", _err);
            break;
        }
        last_cursor = Some(entry.cursor().to_string());
    }
    if args.show_cursor {
        match last_cursor {
            Some(cursor) if !cursor.is_empty() => {
                let _ = writeln!(stdout_lock, "-- cursor: {}", cursor);
            }
            _ => de_wrn!("no cursor to show"),
        }
    }
    let _ = stdout_lock.flush();
    reader.close();
    defx!("{}", ok);

    ok
}

/// Write `--send` to the journal.
/// Returns `true` if it was written.
fn send_mode(
    message: &str,
    args: &CLI_Args,
) -> bool {
    defn!("({:?})", message);
    let mut logger = match JourLog::new() {
        Ok(logger) => logger,
        Err(err) => {
            e_err!("{}", err);
            return false;
        }
    };
    logger.set_log_level(Priority::Debug);
    let fields: Vec<(&str, &str)> = args
        .fields
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let ok = match jlog!(logger, args.send_priority, fields = &fields, "{}", message) {
        Ok(sent) => sent,
        Err(err) => {
            e_err!("{}", err);
            false
        }
    };
    defx!("{}", ok);

    ok
}

/// Process the user-passed command-line arguments.
/// Determine a process return code.
pub fn main() -> ExitCode {
    if cfg!(debug_assertions) {
        stack_offset_set(Some(0));
    }
    defn!();

    let args = CLI_Args::parse();
    defo!("args {:?}", args);

    let ret: bool = match &args.send {
        Some(message) => send_mode(message, &args),
        None => read_mode(&args),
    };

    let exitcode = if ret { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    defx!("exitcode {:?}", exitcode);

    exitcode
}
