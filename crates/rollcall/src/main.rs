//! `rollcall` - CLI for the student registration record book
//!
//! This binary provides the command-line interface for registering students,
//! listing the record book, and running the registration daemon.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use rollcall::cli::{
    Cli, Command, ConfigCommand, ListCommand, OutputFormat, RegisterCommand, ServeCommand,
};
use rollcall::{init_logging, Config, RecordStore, Registry, RegistrationServer, Submission};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Register(register_cmd) => handle_register(&config, register_cmd),
        Command::List(list_cmd) => handle_list(&config, &list_cmd),
        Command::Serve(serve_cmd) => handle_serve(&config, serve_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_registry(config: &Config) -> rollcall::Result<Registry> {
    let store = RecordStore::open(config.data_path(), config.decode_policy())?;
    Ok(Registry::new(store))
}

fn handle_register(
    config: &Config,
    cmd: RegisterCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(config)?;
    let submission = Submission::new(cmd.name, cmd.email, cmd.course, cmd.phone);
    let record = registry.register(submission)?;

    println!("Registered {} <{}>", record.name, record.email);
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(config)?;
    let records = registry.list()?;

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No students registered.");
                return Ok(());
            }
            println!("{:<24} {:<28} {:<16} {}", "NAME", "EMAIL", "COURSE", "PHONE");
            for record in &records {
                println!(
                    "{:<24} {:<28} {:<16} {}",
                    record.name, record.email, record.course, record.phone
                );
            }
            println!();
            println!("{} student(s) registered", records.len());
        }
    }
    Ok(())
}

fn handle_serve(config: &Config, cmd: ServeCommand) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(config)?;
    let socket_path = cmd.socket.unwrap_or_else(|| config.socket_path());
    let server = RegistrationServer::new(socket_path, config.request_timeout(), registry);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server.run())?;
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Record book:      {}", config.data_path().display());
                println!(
                    "  On decode error:  {:?}",
                    config.storage.on_decode_error
                );
                println!();
                println!("[Server]");
                println!("  Socket:           {}", config.socket_path().display());
                println!(
                    "  Request timeout:  {}ms",
                    config.server.request_timeout_ms
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
