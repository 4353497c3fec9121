//! CLI entry point.
//!
//! # Responsibility
//! - Route one `METHOD PATH [BODY]` request through `cityinfo_core` and print the response.
//! - Read store and logging settings from `CITYINFO_*` environment variables.
//!
//! A body of `-` is read from stdin.

use cityinfo_core::{handle_request, init_logging, ApiRequest, CoreConfig, LogNotifier, Method};
use log::error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const USAGE: &str = "usage: cityinfo_cli <GET|POST|PUT|PATCH|DELETE> <PATH> [BODY|-]";

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(code) => code,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Vec<String>) -> Result<ExitCode, String> {
    if matches!(args.as_slice(), [flag] if flag == "--version") {
        println!("cityinfo_core version={}", cityinfo_core::core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let request = parse_args(&args)?;
    let config = CoreConfig::from_env();

    if let Some(log_dir) = &config.logging.log_dir {
        let log_dir = absolute(log_dir)?;
        init_logging(&config.logging.level, &log_dir.to_string_lossy())
            .map_err(|err| format!("logging: {err}"))?;
    }

    let service = config.build_service(LogNotifier).map_err(|err| {
        error!("event=cli_start module=cli status=error error={err}");
        format!("store: {err}")
    })?;

    let response = handle_request(&service, &request);
    println!("status: {}", response.status);
    if let Some(location) = &response.location {
        println!("location: {location}");
    }
    if let Some(body) = &response.body {
        println!("{body:#}");
    }

    Ok(if response.status < 400 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_args(args: &[String]) -> Result<ApiRequest, String> {
    let (method, path, body) = match args {
        [method, path] => (method, path, None),
        [method, path, body] => (method, path, Some(body)),
        _ => return Err(USAGE.to_string()),
    };

    let method = Method::parse(method).ok_or_else(|| format!("unknown method `{method}`\n{USAGE}"))?;
    let mut request = ApiRequest::new(method, path.as_str());
    if let Some(body) = body {
        request = request.with_body(read_body(body)?);
    }
    Ok(request)
}

fn read_body(arg: &str) -> Result<String, String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .map_err(|err| format!("cannot read body from stdin: {err}"))?;
    Ok(body)
}

fn absolute(dir: &Path) -> Result<PathBuf, String> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(dir))
        .map_err(|err| format!("cannot resolve log directory: {err}"))
}
