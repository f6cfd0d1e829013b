//! `robio` – command line front end for the input core.
//!
//! ```text
//! robio [run]   build simulated devices from ~/.robio/config.toml and drive
//!               the control loop until Ctrl-C (or `cycles` cycles)
//! robio init    write the default configuration
//! robio show    print the effective configuration
//! ```
//!
//! Ctrl-C sets a shared shutdown flag; the control loop finishes its current
//! cycle and exits cleanly.

mod config;
mod session;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use robio_types::RobioError;
use tracing::warn;

use crate::session::Session;

enum Command {
    Run,
    Init,
    Show,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg {
            None | Some("run") => Some(Command::Run),
            Some("init") => Some(Command::Init),
            Some("show") => Some(Command::Show),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    let _guard = robio_runtime::init_tracing("robio");

    let arg = std::env::args().nth(1);
    let Some(command) = Command::parse(arg.as_deref()) else {
        print_usage();
        return ExitCode::from(2);
    };

    print_banner();

    let result = match command {
        Command::Run => run(),
        Command::Init => init(),
        Command::Show => show(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn load_or_default() -> Result<config::Config, RobioError> {
    match config::load()? {
        Some(cfg) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            Ok(cfg)
        }
        None => {
            println!(
                "  {} Run `{}` to create one.",
                "No config found, using defaults.".dimmed(),
                "robio init".bold()
            );
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

fn run() -> Result<(), RobioError> {
    let cfg = load_or_default()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping control loop …".yellow().bold());
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop with SIGKILL");
    }

    let mut session = Session::build(&cfg)?;
    println!(
        "  Control loop: {} ms period, {}\n",
        cfg.control_period_ms,
        if cfg.cycles == 0 {
            "until Ctrl-C".to_string()
        } else {
            format!("{} cycles", cfg.cycles)
        }
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| RobioError::Config(format!("failed to start runtime: {e}")))?;
    let cycles = runtime.block_on(session.run(shutdown))?;

    println!();
    println!(
        "  {} {} cycles, {} button events",
        "✓".green().bold(),
        cycles,
        session.events()
    );
    Ok(())
}

fn init() -> Result<(), RobioError> {
    let path = config::config_path();
    if path.exists() {
        println!(
            "  {} already exists; leaving it untouched.",
            path.display().to_string().bold()
        );
        return Ok(());
    }
    config::save(&config::Config::default())?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

fn show() -> Result<(), RobioError> {
    let cfg = load_or_default()?;
    let raw = toml::to_string_pretty(&cfg)
        .map_err(|e| RobioError::Config(format!("failed to serialize config: {e}")))?;
    println!();
    println!("{raw}");
    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", r#"   ____        __    _     "#.bold().cyan());
    println!("{}", r#"  / __ \____  / /_  (_)___ "#.bold().cyan());
    println!("{}", r#" / /_/ / __ \/ __ \/ / __ \"#.bold().cyan());
    println!("{}", r#"/_/ |_|\____/_.___/_/\____/"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "robio".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Input & sensor normalization core");
    println!();
}

fn print_usage() {
    eprintln!("usage: robio [run | init | show]");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert!(matches!(Command::parse(None), Some(Command::Run)));
        assert!(matches!(Command::parse(Some("run")), Some(Command::Run)));
        assert!(matches!(Command::parse(Some("init")), Some(Command::Init)));
        assert!(matches!(Command::parse(Some("show")), Some(Command::Show)));
        assert!(Command::parse(Some("fly")).is_none());
    }
}
