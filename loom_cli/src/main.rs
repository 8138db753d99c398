// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod theme;

use clap::{Parser as ClapParser, Subcommand};
use cliclack::{input, intro, set_theme};
use loom_cli::{
    Instance, InstanceConfig, LoaderError, exit_with_parse_errors, print_exports,
    print_module_entries, print_parse_errors, print_result,
};
use loom_vm::ecmascript::{
    scripts_and_modules::module::module_semantics::{
        abstract_module_records::Module, source_text_module_records::parse_module,
    },
    types::Value,
};
use theme::DefaultTheme;

/// An ECMAScript module graph engine
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "loom")]
#[command(about = "An ECMAScript module graph engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parses a module and prints its import and export entries
    Parse {
        /// The path of the module to parse
        path: String,
    },

    /// Evaluates modules
    Eval {
        #[arg(short, long)]
        verbose: bool,

        /// Longest chain of nested imports before evaluation fails
        #[arg(long)]
        max_depth: Option<u32>,

        /// The modules to evaluate
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Runs the REPL
    Repl {
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    match args.command {
        Command::Parse { path } => {
            init_logger(false);
            let file = std::fs::read_to_string(&path)?;
            match parse_module(&file, Some(&path), None) {
                Ok(record) => print_module_entries(&record),
                Err(errors) => exit_with_parse_errors(errors, &path, &file),
            }
        }
        Command::Eval {
            verbose,
            max_depth,
            paths,
        } => {
            init_logger(verbose);
            let mut config = InstanceConfig {
                verbose,
                ..Default::default()
            };
            if let Some(max_depth) = max_depth {
                config.max_module_graph_depth = max_depth;
            }
            let mut instance =
                Instance::new(config).map_err(|_| "Failed to initialize the global object")?;
            let interrupt_handle = instance.interrupt_handle();
            ctrlc::set_handler(move || interrupt_handle.interrupt())?;

            assert!(!paths.is_empty());
            for path in paths {
                let module = match instance.load_module(&path) {
                    Ok(module) => module,
                    Err(LoaderError::Parse {
                        path,
                        source_text,
                        errors,
                    }) => exit_with_parse_errors(errors, &path.display().to_string(), &source_text),
                    Err(error) => return Err(error.into()),
                };
                let result = instance.run_module(&module);
                let verbose = instance.config().verbose;
                print_result(instance.agent(), result.map(|_| Value::Undefined), verbose);
            }
        }
        Command::Repl { verbose } => {
            init_logger(verbose);
            let mut instance = Instance::new(InstanceConfig {
                verbose,
                ..Default::default()
            })
            .map_err(|_| "Failed to initialize the global object")?;

            set_theme(DefaultTheme);
            println!("\n\n");
            let mut placeholder = "Enter a line of Javascript".to_string();
            let mut line_number = 0;

            loop {
                intro("Loom Repl (type exit or ctrl+c to exit)")?;
                let input: String = input("").placeholder(&placeholder).interact()?;

                if input.trim() == "exit" {
                    std::process::exit(0);
                }
                placeholder = input.to_string();
                line_number += 1;
                let name = format!("<repl:{line_number}>");
                let module = match parse_module(&input, Some(&name), None) {
                    Ok(record) => Module::from(record),
                    Err(errors) => {
                        print_parse_errors(errors, &name, &input);
                        continue;
                    }
                };
                let result = instance
                    .run_module(&module)
                    .and_then(|_| print_exports(instance.agent(), &module));
                if let Err(error) = result {
                    eprintln!(
                        "Uncaught exception: {}",
                        error.to_string(instance.agent())
                    );
                }
            }
        }
    }
    Ok(())
}
