//! Tongs - Regras de build por teclado
//!
//! As tenazes que seguram a peça na bigorna.
//!
//! # Uso
//! ```bash
//! tongs check keyboards/pad/rules.mk
//! tongs show keyboards/pad/rules.mk --format json
//! tongs build pad default -j 8
//! tongs compiledb pad default
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "tongs")]
#[command(about = "🔧 Tongs - Regras de build por teclado", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Valida um rules.mk
    Check {
        /// Arquivo de regras
        rules: PathBuf,

        /// Perfil base (TOML) aplicado antes das regras
        #[arg(long)]
        defaults: Option<PathBuf>,
    },

    /// Mostra a configuração resolvida
    Show {
        /// Arquivo de regras
        rules: PathBuf,

        /// Perfil base (TOML) aplicado antes das regras
        #[arg(long)]
        defaults: Option<PathBuf>,

        /// Formato de saída
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Mostra variáveis de make e defines
    Flags {
        /// Arquivo de regras
        rules: PathBuf,

        /// Perfil base (TOML) aplicado antes das regras
        #[arg(long)]
        defaults: Option<PathBuf>,
    },

    /// Lista MCUs, bootloaders ou features conhecidos
    List {
        #[command(subcommand)]
        what: ListAction,
    },

    /// Compila o firmware de um teclado
    Build {
        /// Teclado (ex: handwired/pad)
        keyboard: String,

        /// Keymap
        keymap: String,

        /// Arquivo de regras (padrão: keyboards/<teclado>/rules.mk)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Perfil base (TOML) aplicado antes das regras
        #[arg(long)]
        defaults: Option<PathBuf>,

        /// Alvo extra do make após o keymap (ex: flash)
        #[arg(long)]
        target: Option<String>,

        /// Jobs paralelos do make
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Só mostra o comando make
        #[arg(long)]
        dry_run: bool,
    },

    /// Gera compile_commands.json
    Compiledb {
        /// Teclado (ex: handwired/pad)
        keyboard: String,

        /// Keymap
        keymap: String,
    },

    /// Mostra ambiente
    Env,
}

#[derive(Subcommand)]
enum ListAction {
    /// MCUs conhecidos
    Mcus,
    /// Bootloaders e MCUs compatíveis
    Bootloaders,
    /// Features opcionais
    Features,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Rules,
    Toml,
    Json,
}

impl Commands {
    /// Output meant for other programs gets no banner
    fn machine_output(&self) -> bool {
        matches!(self, Commands::Show { format, .. } if *format != Format::Text)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = cli.quiet || cli.command.machine_output();

    // Banner
    if !quiet {
        println!("{}", "🔧 Tongs - Regras de build por teclado".bright_cyan().bold());
        println!();
    }

    match cli.command {
        Commands::Check { rules, defaults } => {
            commands::check::run(&rules, defaults.as_deref(), cli.verbose)?;
        }
        Commands::Show { rules, defaults, format } => {
            commands::show::run(&rules, defaults.as_deref(), format)?;
        }
        Commands::Flags { rules, defaults } => {
            commands::flags::run(&rules, defaults.as_deref(), cli.verbose)?;
        }
        Commands::List { what } => match what {
            ListAction::Mcus => commands::list::mcus(cli.verbose)?,
            ListAction::Bootloaders => commands::list::bootloaders(cli.verbose)?,
            ListAction::Features => commands::list::features(cli.verbose)?,
        },
        Commands::Build {
            keyboard,
            keymap,
            rules,
            defaults,
            target,
            jobs,
            dry_run,
        } => {
            let opts = commands::build::BuildOptions {
                keyboard,
                keymap,
                rules,
                defaults,
                target,
                jobs,
                dry_run,
            };
            commands::build::run(&opts, cli.verbose)?;
        }
        Commands::Compiledb { keyboard, keymap } => {
            commands::compiledb::run(&keyboard, &keymap, cli.verbose)?;
        }
        Commands::Env => commands::env::run(cli.verbose)?,
    }

    Ok(())
}
