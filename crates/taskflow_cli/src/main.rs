use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskflow_cli::canvas::TerminalCanvas;
use taskflow_cli::cli::{Cli, Command, ThemeCommand, collect_overrides, init_tracing};
use taskflow_core::app::{App, AppView, SubmitOutcome};
use taskflow_core::config::{self, Config, Palette, palette_for_theme};
use taskflow_core::error::AppError;
use taskflow_core::model::Task;
use taskflow_core::stats::{DayBoundaries, status_distribution, weekly_completions_with};
use taskflow_core::storage::{JsonFileStore, Persistence, json_store};
use time::{Date, OffsetDateTime, UtcOffset};

type TaskApp = App<JsonFileStore>;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Done")]
    done: &'static str,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    label: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Completed")]
    count: usize,
}

fn local_now() -> OffsetDateTime {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset)
}

/// Local offset in effect at local midnight of `date`: a first guess from UTC
/// midnight, then the offset at the midnight that guess implies.
fn local_offset_on(date: Date) -> Option<UtcOffset> {
    let midnight = date.midnight();
    let guess = UtcOffset::local_offset_at(midnight.assume_utc()).ok()?;
    UtcOffset::local_offset_at(midnight.assume_offset(guess)).ok()
}

fn load_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "using default configuration");
    }
    let overrides = collect_overrides(raw_overrides)?;
    Ok(config::merge_overrides(&loaded.config, &overrides))
}

fn open_app(config: &Config) -> Result<TaskApp, AppError> {
    let path = json_store::store_path(config.store_path.as_deref())?;
    let store = JsonFileStore::open(&path)?;
    App::start_with_day_boundaries(
        Persistence::new(store),
        config.default_theme(),
        Some(Box::new(TerminalCanvas::default())),
        DayBoundaries::PerDate(local_offset_on),
        local_now(),
    )
}

fn print_task_json(task: &Task) -> Result<(), AppError> {
    let json = serde_json::to_string(task).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn print_view_plain(view: &AppView, palette: &Palette) {
    if view.list.empty_visible {
        println!("{}", palette.mutedize("No tasks found"));
    } else {
        let rows: Vec<TaskRow> = view
            .list
            .items
            .iter()
            .map(|item| TaskRow {
                id: item.id.clone(),
                done: if item.completed { "[x]" } else { "[ ]" },
                text: item.text.clone(),
                priority: item.priority_label,
                created: item.date_label.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    let stats = &view.stats;
    println!(
        "{}",
        palette.mutedize(&format!(
            "{} of {} completed, {} pending ({}%)",
            stats.done, stats.total, stats.pending, stats.percent
        ))
    );
}

fn print_view_json(view: &AppView) -> Result<(), AppError> {
    let json = serde_json::json!({
        "items": view.list.items,
        "stats": {
            "total": view.stats.total,
            "done": view.stats.done,
            "pending": view.stats.pending,
            "percent": view.stats.percent,
        },
    });
    println!("{json}");
    Ok(())
}

fn print_stats(app: &TaskApp, json: bool, palette: &Palette) {
    let now = local_now();
    let stats = app.view().stats;
    let week = weekly_completions_with(app.tasks(), now, app.day_boundaries());
    let distribution = status_distribution(app.tasks());

    if json {
        let weekly: Vec<serde_json::Value> = week
            .iter()
            .map(|bucket| {
                serde_json::json!({
                    "label": bucket.label,
                    "date": bucket.date.to_string(),
                    "count": bucket.count,
                })
            })
            .collect();
        let slices: Vec<serde_json::Value> = distribution
            .slices()
            .into_iter()
            .map(|(label, value)| serde_json::json!({ "label": label, "value": value }))
            .collect();
        let payload = serde_json::json!({
            "total": stats.total,
            "done": stats.done,
            "pending": stats.pending,
            "percent": stats.percent,
            "weekly": weekly,
            "distribution": slices,
        });
        println!("{payload}");
        return;
    }

    println!("{}", palette.accentize(&format!("Progress: {}%", stats.percent)));
    println!(
        "Total: {}  Done: {}  Pending: {}",
        stats.total, stats.done, stats.pending
    );

    let rows: Vec<DayRow> = week
        .iter()
        .map(|bucket| DayRow {
            label: bucket.label.clone(),
            date: bucket.date.to_string(),
            count: bucket.count,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let slices: Vec<String> = distribution
        .slices()
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect();
    println!("{}", palette.mutedize(&slices.join("  ")));
}

fn print_charts(app: &TaskApp) -> Result<(), AppError> {
    let charts = app.charts();
    let (Some(weekly), Some(status)) = (charts.weekly_config(), charts.status_config()) else {
        return Err(AppError::invalid_data("charts are unavailable"));
    };
    let payload = serde_json::json!({ "weekly": weekly, "status": status });
    let rendered = serde_json::to_string_pretty(&payload)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(app: &mut TaskApp, cli: Cli) -> Result<(), AppError> {
    let palette = palette_for_theme(app.theme());

    match cli.command {
        Command::Add { text, priority } => {
            let text = text.unwrap_or_default();
            let task = match app.submit_task(&text, priority, local_now())? {
                SubmitOutcome::Added(task) => task,
                SubmitOutcome::Rejected(_) => {
                    return Err(AppError::invalid_input("text is required"));
                }
            };
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Added task: {} ({})", task.text, task.id);
            }
        }
        Command::List {
            search,
            status,
            priority,
        } => {
            app.set_search(search.as_deref().unwrap_or_default());
            app.set_status_filter(status);
            app.set_priority_filter(priority);
            let view = app.view();
            if cli.json {
                print_view_json(&view)?;
            } else {
                print_view_plain(&view, &palette);
            }
        }
        Command::Toggle { id } => match app.toggle_task(id.trim(), local_now())? {
            Some(task) if cli.json => print_task_json(&task)?,
            Some(task) if task.completed => {
                println!("Completed task: {} ({})", task.text, task.id)
            }
            Some(task) => println!("Reopened task: {} ({})", task.text, task.id),
            None => println!("No task with id {}", id.trim()),
        },
        Command::Delete { id } => {
            let id = id.trim();
            app.request_delete(id);
            match app.finish_removal(id, local_now())? {
                Some(task) if cli.json => print_task_json(&task)?,
                Some(task) => println!("Deleted task: {} ({})", task.text, task.id),
                None => println!("No task with id {id}"),
            }
        }
        Command::ClearCompleted => {
            app.request_clear_completed();
            let removed = app.finish_clear_completed(local_now())?;
            if cli.json {
                println!("{}", serde_json::json!({ "removed": removed.len() }));
            } else if removed.is_empty() {
                println!("No completed tasks to clear");
            } else {
                println!("Cleared {} completed task(s)", removed.len());
            }
        }
        Command::Stats => print_stats(app, cli.json, &palette),
        Command::Charts => print_charts(app)?,
        Command::Theme { action } => {
            let theme = match action.unwrap_or(ThemeCommand::Show) {
                ThemeCommand::Show => app.theme(),
                ThemeCommand::Toggle => app.toggle_theme()?,
            };
            if cli.json {
                println!("{}", serde_json::json!({ "theme": theme }));
            } else {
                println!("Theme: {}", palette_for_theme(theme).accentize(theme.as_str()));
            }
        }
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let config = load_config(&[])?;
    let mut app = open_app(&config)?;
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskflow".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            tracing::warn!("config overrides only apply when the session starts");
        }

        if let Err(err) = run_command(&mut app, cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn run_once(cli: Cli) -> Result<(), AppError> {
    let config = load_config(&cli.config_override)?;
    let mut app = open_app(&config)?;
    run_command(&mut app, cli)
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = init_tracing(0, 0).and_then(|_| run_interactive()) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(cli.verbose, cli.quiet).and_then(|_| run_once(cli)) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::split_command_line;

    #[test]
    fn split_command_line_honours_quotes() {
        let args = split_command_line(r#"add "Buy oat milk" -p low"#).unwrap();
        assert_eq!(args, vec!["add", "Buy oat milk", "-p", "low"]);
    }

    #[test]
    fn split_command_line_unescapes_quotes() {
        let args = split_command_line(r#"add "say \"hi\"""#).unwrap();
        assert_eq!(args, vec!["add", r#"say "hi""#]);
    }

    #[test]
    fn split_command_line_rejects_open_quote() {
        let err = split_command_line(r#"add "oops"#).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
