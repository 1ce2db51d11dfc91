use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::data::access::AccessList;
use crate::data::legacy_import::import_legacy_workbook;
use crate::freshness::SystemClock;
use crate::i18n::Locale;
use crate::reconcile::{InboundReport, ReportService};
use crate::server::{self, api, AppContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Submit,
    Tile,
    Info,
    Export,
    Import,
    Authorize,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("submit") => Some(Command::Submit),
        Some("tile") => Some(Command::Tile),
        Some("info") => Some(Command::Info),
        Some("export") => Some(Command::Export),
        Some("import") => Some(Command::Import),
        Some("authorize") => Some(Command::Authorize),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("usage: tilewatch <serve|submit|tile|info|export|import|authorize>");
        return 2;
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 1;
        }
    };

    match command {
        Command::Serve => handle_serve(config),
        Command::Submit => handle_submit(&config, args),
        Command::Tile => handle_lookup(&config, args, "tile"),
        Command::Info => handle_lookup(&config, args, "info"),
        Command::Export => handle_export(&config),
        Command::Import => handle_import(&config, args),
        Command::Authorize => handle_authorize(&config, args),
    }
}

fn report_service(config: &Config) -> Option<ReportService> {
    let built = config.grammar().and_then(|grammar| {
        Ok(ReportService::new(
            config.store_path.clone(),
            grammar,
            Box::new(SystemClock),
            config.zone()?,
        ))
    });
    match built {
        Ok(service) => Some(service),
        Err(err) => {
            eprintln!("configuration error: {err}");
            None
        }
    }
}

fn handle_serve(config: Config) -> i32 {
    let bind_addr = config.bind.clone();
    let ctx = match AppContext::from_config(config) {
        Ok(ctx) => Arc::new(ctx),
        Err(err) => {
            eprintln!("server error: {err}");
            return 1;
        }
    };
    match server::run_server(ctx, &bind_addr) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

/// Reports entered here count as forwarded; the operator vouches for them.
fn handle_submit(config: &Config, args: &[String]) -> i32 {
    let (Some(poster), true) = (args.get(2), args.len() > 3) else {
        eprintln!("usage: tilewatch submit <poster> <message...>");
        return 2;
    };
    let Some(service) = report_service(config) else {
        return 1;
    };

    let report = InboundReport {
        text: args[3..].join(" "),
        poster: poster.clone(),
        user_id: None,
        language_code: None,
        forwarded: true,
    };
    match service.submit(&report) {
        Ok(saved) => match serde_json::to_string_pretty(&saved) {
            Ok(payload) => {
                println!("{payload}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize saved report: {err}");
                1
            }
        },
        Err(err) => {
            eprintln!("submit failed: {err}");
            1
        }
    }
}

fn handle_lookup(config: &Config, args: &[String], command: &str) -> i32 {
    let Some(location) = args.get(2) else {
        eprintln!("usage: tilewatch {command} <location>");
        return 2;
    };
    let Some(service) = report_service(config) else {
        return 1;
    };
    let locale = Locale::detect(std::env::var("LANG").ok().as_deref());

    match service.lookup(location) {
        Ok(view) if command == "info" => {
            println!("{}", api::tile_report_text(locale, &view));
            0
        }
        Ok(view) => {
            println!("{}", api::tile_summary_text(locale, &view));
            0
        }
        Err(err) => {
            eprintln!("{command} failed: {err}");
            1
        }
    }
}

fn handle_export(config: &Config) -> i32 {
    let Some(service) = report_service(config) else {
        return 1;
    };
    match service.export_csv() {
        Ok(csv) => {
            print!("{csv}");
            0
        }
        Err(err) => {
            eprintln!("export failed: {err}");
            1
        }
    }
}

fn handle_import(config: &Config, args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: tilewatch import <legacy.xlsx>");
        return 2;
    };

    match import_legacy_workbook(Path::new(path), &config.store_path) {
        Ok(report) => {
            println!(
                "import complete: rows={}, created={}, updated={}, skipped={}, source='{}'",
                report.rows_read, report.created, report.updated, report.skipped, report.source_path
            );
            0
        }
        Err(err) => {
            eprintln!("import failed: {err}");
            1
        }
    }
}

fn handle_authorize(config: &Config, args: &[String]) -> i32 {
    let Some(raw_id) = args.get(2) else {
        eprintln!("usage: tilewatch authorize <user_id>");
        return 2;
    };
    let Ok(user_id) = raw_id.parse::<i64>() else {
        eprintln!("invalid user id '{raw_id}'");
        return 2;
    };

    let added = AccessList::load(config.access_list_path.clone())
        .and_then(|mut access| access.authorize(user_id));
    match added {
        Ok(true) => {
            println!("authorized user {user_id}");
            0
        }
        Ok(false) => {
            println!("user {user_id} was already authorized");
            0
        }
        Err(err) => {
            eprintln!("authorize failed: {err}");
            1
        }
    }
}
