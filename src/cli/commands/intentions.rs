//! Intentions commands, including the interactive month editor.

use super::runtime;
use crate::cli::backend::Backend;
use crate::cli::{Cli, ClientArgs, IntentionsCommands};
use crate::client::IntentionsApi;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::intentions::calendar::{format_day_label, month_name};
use crate::intentions::{
    DraftRow, EditSession, LeaveChoice, LeaveOutcome, Notice, NoticeLevel, RowField, View,
};
use crate::validate::parse_date;
use chrono::{Datelike, Local, Locale, NaiveDate};
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

/// Execute an intentions command.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached or a request fails.
pub fn execute(cli: &Cli, command: &IntentionsCommands, json: bool) -> Result<()> {
    match command {
        IntentionsCommands::List { year, client } => {
            let year = year.unwrap_or_else(current_year);
            list(cli, client, year, json)
        }
        IntentionsCommands::Show { year, month, client } => show(cli, client, *year, *month, json),
        IntentionsCommands::Edit { year, month, client } => {
            let year = year.unwrap_or_else(current_year);
            edit(cli, client, year, *month)
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn current_year() -> i32 {
    today().year()
}

fn connect(cli: &Cli, args: &ClientArgs) -> Result<(Settings, Backend)> {
    let settings = cli.settings(args.overrides())?;
    let backend = Backend::connect(args, &settings, &cli.actor())?;
    Ok((settings, backend))
}

fn label_for(date: &str, locale: Locale) -> String {
    parse_date(date.trim()).map_or_else(|| date.to_string(), |d| format_day_label(d, locale))
}

fn month_title(year: i32, month: u32, locale: Locale) -> String {
    month_name(month, locale).map_or_else(|| format!("{year}-{month:02}"), |name| format!("{name} {year}"))
}

fn list(cli: &Cli, args: &ClientArgs, year: i32, json: bool) -> Result<()> {
    let (settings, backend) = connect(cli, args)?;
    let rt = runtime()?;

    if json {
        let months = rt.block_on(backend.list_months(year))?;
        println!("{}", serde_json::to_string(&months)?);
        return Ok(());
    }

    let mut session = EditSession::new(backend, year, settings.locale);
    rt.block_on(session.load(year))?;
    print_month_list(&session, year, settings.locale);
    Ok(())
}

fn show(cli: &Cli, args: &ClientArgs, year: i32, month: u32, json: bool) -> Result<()> {
    let (settings, backend) = connect(cli, args)?;
    let months = runtime()?.block_on(backend.list_months(year))?;
    let record = months.into_iter().find(|m| m.is_for(year, month));

    if json {
        println!("{}", serde_json::to_string(&record)?);
        return Ok(());
    }

    println!("{}", month_title(year, month, settings.locale).bold());
    match record {
        Some(record) if !record.intentions.is_empty() => {
            for intention in &record.intentions {
                println!(
                    "  {:<28} {:<5}  {}",
                    label_for(&intention.date, settings.locale),
                    intention.time,
                    intention.intention
                );
            }
        }
        _ => println!("  {}", "No intentions".dimmed()),
    }
    Ok(())
}

fn edit(cli: &Cli, args: &ClientArgs, year: i32, month: Option<u32>) -> Result<()> {
    let (settings, backend) = connect(cli, args)?;
    println!("Editing intentions on {}", backend.describe(&settings));
    println!("{}", "Type 'help' for commands.".dimmed());

    let locale = settings.locale;
    runtime()?.block_on(async move {
        backend.check().await?;
        let mut session = EditSession::new(backend, year, locale);
        session.load(year).await?;
        if let Some(month) = month {
            session.enter_month(month)?;
        }
        let mut input = BufReader::new(tokio::io::stdin()).lines();
        repl(&mut session, &mut input, locale).await
    })
}

enum Flow {
    Continue,
    Quit,
}

async fn repl(session: &mut EditSession<Backend>, input: &mut Input, locale: Locale) -> Result<()> {
    render(session, locale);
    loop {
        prompt(session);

        let line = tokio::select! {
            line = input.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                if let Flow::Quit = quit(session, input).await? {
                    return Ok(());
                }
                print_notices(&session.take_notices());
                continue;
            }
        };

        let Some(line) = line else {
            if session.needs_unload_confirmation() {
                eprintln!("{}", "Input closed; unsaved changes discarded.".yellow());
            }
            return Ok(());
        };

        let result = run_command(session, line.trim(), input, locale).await;
        let notices = session.take_notices();
        print_notices(&notices);
        match result {
            Ok(Flow::Quit) => return Ok(()),
            Ok(Flow::Continue) => {}
            Err(e) if notices.is_empty() => println!("{} {e}", "error:".red().bold()),
            Err(_) => {}
        }
    }
}

async fn run_command(
    session: &mut EditSession<Backend>,
    line: &str,
    input: &mut Input,
    locale: Locale,
) -> Result<Flow> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        render(session, locale);
        return Ok(Flow::Continue);
    };
    let rest: Vec<&str> = words.collect();

    match (command, session.view()) {
        ("help" | "?", _) => print_help(session.view()),
        ("quit" | "exit" | "q", _) => return quit(session, input).await,

        ("year", View::MonthList { .. }) => {
            let year = parse_arg::<i32>(rest.first(), "year")?;
            session.load(year).await?;
            render(session, locale);
        }
        ("open", View::MonthList { .. }) => {
            let month = parse_arg::<u32>(rest.first(), "month")?;
            session.enter_month(month)?;
            render(session, locale);
        }
        (n, View::MonthList { .. }) if n.parse::<u32>().is_ok() => {
            session.enter_month(parse_arg::<u32>(Some(&n), "month")?)?;
            render(session, locale);
        }

        ("add", View::MonthEdit { .. }) => {
            let index = session.add_row(today())?;
            if let Some(time) = rest.first() {
                session.edit_row(index, RowField::Time, time)?;
            }
            if rest.len() > 1 {
                session.edit_row(index, RowField::Text, &rest[1..].join(" "))?;
            }
            render(session, locale);
        }
        ("set", View::MonthEdit { .. }) => {
            let index = row_index(rest.first())?;
            let field: RowField = rest
                .get(1)
                .ok_or_else(|| Error::InvalidArgument("Usage: set <row> <date|time|text> <value>".into()))?
                .parse()?;
            let value = rest.get(2..).map(|v| v.join(" ")).unwrap_or_default();
            session.edit_row(index, field, &value)?;
            render(session, locale);
        }
        ("rm" | "del", View::MonthEdit { .. }) => {
            let index = row_index(rest.first())?;
            session.delete_row(index).await?;
            render(session, locale);
        }
        ("save", View::MonthEdit { .. }) => {
            session.save().await?;
            render(session, locale);
        }
        ("back", View::MonthEdit { .. }) => {
            if leave(session, input).await? == LeaveOutcome::Left {
                render(session, locale);
            }
        }

        (other, view) => {
            let hint = match view {
                View::MonthList { .. } => "open a month first",
                View::MonthEdit { .. } => "go back to the month list first",
            };
            return Err(Error::InvalidArgument(format!(
                "'{other}' is not available here ({hint}; 'help' lists commands)"
            )));
        }
    }
    Ok(Flow::Continue)
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&&str>, name: &str) -> Result<T> {
    arg.and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::InvalidArgument(format!("Expected a {name}")))
}

/// Rows are numbered from 1 on screen.
fn row_index(arg: Option<&&str>) -> Result<usize> {
    match parse_arg::<usize>(arg, "row number")? {
        0 => Err(Error::InvalidArgument("Rows are numbered from 1".into())),
        n => Ok(n - 1),
    }
}

/// Leave the open month, asking about unsaved changes.
async fn leave(session: &mut EditSession<Backend>, input: &mut Input) -> Result<LeaveOutcome> {
    match session.try_leave() {
        LeaveOutcome::NeedsConfirmation => {
            let choice = ask_leave_choice(input).await?;
            Ok(session.resolve_leave(choice).await)
        }
        outcome => Ok(outcome),
    }
}

async fn quit(session: &mut EditSession<Backend>, input: &mut Input) -> Result<Flow> {
    if !session.needs_unload_confirmation() {
        return Ok(Flow::Quit);
    }
    match leave(session, input).await? {
        LeaveOutcome::Left => Ok(Flow::Quit),
        _ => Ok(Flow::Continue),
    }
}

async fn ask_leave_choice(input: &mut Input) -> Result<LeaveChoice> {
    print!("{} [s]ave, [d]iscard or [c]ancel? ", "Unsaved changes.".yellow().bold());
    std::io::stdout().flush()?;

    let answer = input.next_line().await?.unwrap_or_default();
    Ok(match answer.trim().to_ascii_lowercase().as_str() {
        "s" | "save" => LeaveChoice::Save,
        "d" | "discard" => LeaveChoice::Discard,
        _ => LeaveChoice::Cancel,
    })
}

fn prompt(session: &EditSession<Backend>) {
    let marker = if session.is_dirty() { "*" } else { "" };
    match session.view() {
        View::MonthList { year } => print!("{year}> "),
        View::MonthEdit { year, month } => print!("{year}-{month:02}{marker}> "),
    }
    let _ = std::io::stdout().flush();
}

fn render(session: &EditSession<Backend>, locale: Locale) {
    match session.view() {
        View::MonthList { year } => print_month_list(session, year, locale),
        View::MonthEdit { year, month } => {
            let mut title = month_title(year, month, locale).bold().to_string();
            if session.is_dirty() {
                title.push_str(&format!(" {}", "(unsaved changes)".yellow()));
            }
            println!("{title}");
            if session.rows().is_empty() {
                println!("  {}", "No intentions. Use 'add' to start.".dimmed());
            }
            for (i, row) in session.rows().iter().enumerate() {
                print_row(i + 1, row, locale);
            }
        }
    }
}

fn print_row(number: usize, row: &DraftRow, locale: Locale) {
    let flag = if row.is_new {
        "+".green()
    } else if row.is_modified {
        "~".yellow()
    } else {
        " ".normal()
    };
    let mut line = format!(
        "{number:>3}{flag} {:<28} {:<5}  {}",
        label_for(&row.date, locale),
        row.time,
        row.text
    );
    if !row.is_complete() {
        line.push_str(&format!("  {}", "(incomplete, not saved)".dimmed()));
    }
    println!("{line}");
}

fn print_month_list(session: &EditSession<Backend>, year: i32, locale: Locale) {
    println!("{}", format!("Intentions {year}").bold());
    for summary in session.month_summaries() {
        let name = month_name(summary.month, locale).unwrap_or_default();
        let count = match summary.count {
            0 => "-".dimmed().to_string(),
            1 => "1 intention".to_string(),
            n => format!("{n} intentions"),
        };
        println!("  {:>2}  {name:<12} {count}", summary.month);
    }
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Success => println!("{} {}", "ok:".green().bold(), notice.message),
            NoticeLevel::Error => println!("{} {}", "error:".red().bold(), notice.message),
        }
    }
}

fn print_help(view: View) {
    match view {
        View::MonthList { .. } => {
            println!("  <month> | open <month>    edit a month (1-12)");
            println!("  year <year>               switch year");
        }
        View::MonthEdit { .. } => {
            println!("  add [time] [text]         add a row dated today (clamped to this month)");
            println!("  set <row> <field> <value> change date, time or text of a row");
            println!("  rm <row>                  delete a row (saved rows are deleted at once)");
            println!("  save                      save the month");
            println!("  back                      return to the month list");
        }
    }
    println!("  quit                      exit");
}
