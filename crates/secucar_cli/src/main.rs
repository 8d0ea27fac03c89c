//! CLI bootstrap probe.
//!
//! # Responsibility
//! - Load configuration from `SECUCAR_*` variables, start logging and open
//!   the database exactly like a server process would.
//! - Exit non-zero on any startup failure instead of aborting.
//!
//! Open failures are already logged with `severity=fatal` by the core; this
//! binary only reports them on stderr.

use secucar_core::{
    core_version, init_logging, logging_status, Database, DatabaseConfig, StartupError,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let outcome = DatabaseConfig::from_env()
        .map_err(|err| Box::new(StartupError::from(err)) as Box<dyn Error>)
        .and_then(|config| run(&config));

    match outcome {
        Ok(schema_version) => {
            println!("secucar_core version={}", core_version());
            println!("secucar_core schema_version={schema_version}");
            if let Some((level, log_dir)) = logging_status() {
                let target =
                    log_dir.map_or_else(|| "stderr".to_string(), |dir| dir.display().to_string());
                println!("secucar_core log_level={level} log_target={target}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("secucar: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &DatabaseConfig) -> Result<u32, Box<dyn Error>> {
    init_logging(config.log_level, config.log_dir.as_deref()).map_err(StartupError::Logging)?;
    let database = Database::open(config)?;
    Ok(database.schema_version()?)
}
