use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use quizdocx::document::parsing::xml::write_xml;
use quizdocx::document::validate_docx_file;
use quizdocx::equation::{latex_to_mathml, latex_to_omml, to_mathml};
use quizdocx::{
    Config, ExportMode, ParsedQuestion, ProcessOptions, export_questions, process_file,
    sanitize_latex,
};

#[derive(Parser)]
#[command(name = "quizdocx")]
#[command(about = "Extract math exam questions from .docx files and export them back to Word")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a .docx into question records (JSON on stdout)
    Parse {
        /// Input document
        file: PathBuf,

        /// Directory for the source copy and extracted assets
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Keep metafile formulas as images instead of recognizing LaTeX
        #[arg(long)]
        no_latex: bool,

        /// Base URL the asset directory will be served under
        #[arg(long)]
        asset_base_url: Option<String>,
    },

    /// Write question records back into a .docx
    Export {
        /// JSON file: a question array, or the output of `parse`
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ExportMode::Teacher)]
        mode: ExportMode,

        #[arg(short, long)]
        output: PathBuf,

        /// Base for relative image URLs (overrides the one in the input)
        #[arg(long)]
        asset_base_url: Option<String>,
    },

    /// Convert a LaTeX expression to OMML (or MathML)
    Latex {
        expr: String,

        #[arg(long)]
        mathml: bool,
    },

    /// Clean up recognized LaTeX
    Sanitize { expr: String },

    /// Write the default configuration file
    InitConfig,
}

/// `export` input: a bare question array or a parse result
#[derive(Deserialize)]
#[serde(untagged)]
enum ExportInput {
    Questions(Vec<ParsedQuestion>),
    Parsed {
        questions: Vec<ParsedQuestion>,
        #[serde(default)]
        asset_base_url: Option<String>,
    },
}

impl ExportInput {
    fn into_parts(self) -> (Vec<ParsedQuestion>, Option<String>) {
        match self {
            ExportInput::Questions(questions) => (questions, None),
            ExportInput::Parsed {
                questions,
                asset_base_url,
            } => (questions, asset_base_url),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse {
            file,
            work_dir,
            no_latex,
            asset_base_url,
        } => {
            validate_docx_file(&file)?;
            let options = ProcessOptions {
                use_latex: !no_latex,
                asset_base_url,
                config: Config::load()?,
                ..ProcessOptions::default()
            };
            let result = process_file(&file, work_dir.as_deref(), &options).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Export {
            input,
            mode,
            output,
            asset_base_url,
        } => {
            let json = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let parsed: ExportInput = serde_json::from_str(&json)
                .with_context(|| format!("{} is not a question list", input.display()))?;
            let (questions, input_base) = parsed.into_parts();
            let base = asset_base_url.or(input_base);

            let config = Config::load()?;
            let bytes = export_questions(&questions, mode, base.as_deref(), &config.export).await?;
            tokio::fs::write(&output, bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            eprintln!(
                "Exported {} questions to {}",
                questions.len(),
                output.display()
            );
        }
        Command::Latex { expr, mathml } => {
            if mathml {
                println!("{}", to_mathml(&latex_to_mathml(&expr)?));
            } else {
                let omml = latex_to_omml(&expr)?;
                println!("{}", String::from_utf8_lossy(&write_xml(&omml, false)?));
            }
        }
        Command::Sanitize { expr } => {
            println!("{}", sanitize_latex(&expr));
        }
        Command::InitConfig => {
            Config::init_default()?;
            match Config::get_config_path() {
                Some(path) => println!("Wrote default configuration to {}", path.display()),
                None => println!("No configuration directory on this system"),
            }
        }
    }

    Ok(())
}
