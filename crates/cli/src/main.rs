//! certgen - write one personalized certificate PDF per spreadsheet row

mod prompt;

use anyhow::{Context, Result};
use certgen::{default_font_dirs, run_batch, BatchSummary, FontCatalog, RawRequest, FONTS_README};
use clap::{ArgAction, Args, Parser, Subcommand};
use prompt::Prompter;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "certgen",
    version,
    about = "Generate personalized PDF certificates from a spreadsheet and a PDF template"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write FONTS_README.md with the available font names and exit
    Fonts,
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// JSON file with default settings; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Spreadsheet with a header row and one person per row (.xlsx)
    #[arg(long, value_name = "PATH")]
    spreadsheet: Option<String>,

    /// PDF template to draw on
    #[arg(long, value_name = "PATH")]
    template: Option<String>,

    /// Folder for the generated PDFs
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Column letter holding the name
    #[arg(long, value_name = "COL")]
    name_column: Option<String>,

    /// Column letter holding the identifier used as file name
    #[arg(long, value_name = "COL")]
    id_column: Option<String>,

    /// Text box in points, origin bottom-left
    #[arg(long = "box", value_name = "X1,Y1,X2,Y2", allow_hyphen_values = true)]
    bbox: Option<String>,

    /// Font name as listed in FONTS_README.md
    #[arg(long, value_name = "NAME")]
    font: Option<String>,

    #[arg(long, value_name = "PT")]
    font_size: Option<String>,

    /// Zero-based template page to draw on
    #[arg(long, value_name = "INDEX")]
    page: Option<String>,

    /// Text color
    #[arg(long, value_name = "#RRGGBB|R,G,B")]
    color: Option<String>,

    /// Worksheet name (defaults to the first sheet)
    #[arg(long, value_name = "NAME")]
    sheet: Option<String>,

    /// Never prompt; missing settings use their defaults
    #[arg(long)]
    no_prompt: bool,
}

impl GenerateArgs {
    fn to_raw(&self) -> RawRequest {
        RawRequest {
            spreadsheet: self.spreadsheet.clone(),
            template: self.template.clone(),
            output_dir: self.output_dir.clone(),
            name_column: self.name_column.clone(),
            id_column: self.id_column.clone(),
            bbox: self.bbox.clone(),
            font: self.font.clone(),
            font_size: self.font_size.clone(),
            page: self.page.clone(),
            color: self.color.clone(),
            sheet: self.sheet.clone(),
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Config file, then flags, then prompts for whatever is still missing
fn collect_request(args: &GenerateArgs) -> Result<RawRequest> {
    let mut raw = match &args.config {
        Some(path) => RawRequest::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RawRequest::default(),
    };
    raw = raw.merge(args.to_raw());

    if !args.no_prompt && std::io::stdin().is_terminal() {
        let stdin = std::io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());
        raw = prompter.fill(raw).context("failed to read answers")?;
    }
    Ok(raw)
}

fn print_summary(summary: &BatchSummary) {
    let rule = "=".repeat(50);
    println!();
    println!("{rule}");
    println!("Processing complete!");
    println!("  Generated:     {}", summary.generated.len());
    println!("  Skipped:       {}", summary.skipped.len());
    println!("  Failed:        {}", summary.failed.len());
    if summary.overwritten > 0 {
        println!("  Overwritten:   {}", summary.overwritten);
    }
    println!("  Output folder: {}", summary.output_dir.display());
    println!("{rule}");
}

fn run(cli: Cli) -> Result<()> {
    let catalog = FontCatalog::discover(default_font_dirs());
    catalog
        .write_readme(FONTS_README)
        .with_context(|| format!("failed to write {FONTS_README}"))?;

    if let Some(Command::Fonts) = cli.command {
        println!("Wrote {} font names to {FONTS_README}", catalog.len());
        return Ok(());
    }

    let raw = collect_request(&cli.generate)?;
    let request = raw.validate(&catalog).context("invalid settings")?;
    log::info!(
        "generating from {} with template {}",
        request.spreadsheet_path.display(),
        request.template_path.display()
    );

    let summary = run_batch(&request, &catalog)?;
    print_summary(&summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_request() {
        let cli = Cli::try_parse_from([
            "certgen",
            "--spreadsheet",
            "people.xlsx",
            "--box",
            "-10,0,300,50",
            "--font",
            "courier",
            "--font-size",
            "18",
            "--page",
            "1",
            "--no-prompt",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert!(cli.generate.no_prompt);
        assert_eq!(
            cli.generate.to_raw(),
            RawRequest {
                spreadsheet: Some("people.xlsx".to_string()),
                bbox: Some("-10,0,300,50".to_string()),
                font: Some("courier".to_string()),
                font_size: Some("18".to_string()),
                page: Some("1".to_string()),
                ..RawRequest::default()
            }
        );
    }

    #[test]
    fn test_fonts_subcommand() {
        let cli = Cli::try_parse_from(["certgen", "fonts", "-v"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Fonts)));
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_verbosity_count() {
        let cli = Cli::try_parse_from(["certgen", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
        assert!(Cli::try_parse_from(["certgen", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("certgen.json");
        std::fs::write(
            &config,
            r#"{"template": "from-config.pdf", "box": [1, 2, 3, 4], "fontSize": 30}"#,
        )
        .unwrap();

        let args = GenerateArgs {
            config: Some(config),
            font_size: Some("12".to_string()),
            no_prompt: true,
            ..GenerateArgs::default()
        };
        let raw = collect_request(&args).unwrap();

        assert_eq!(raw.template.as_deref(), Some("from-config.pdf"));
        assert_eq!(raw.bbox.as_deref(), Some("1,2,3,4"));
        assert_eq!(raw.font_size.as_deref(), Some("12"));
    }

    #[test]
    fn test_missing_config_file() {
        let args = GenerateArgs {
            config: Some(PathBuf::from("/definitely/not/here.json")),
            no_prompt: true,
            ..GenerateArgs::default()
        };
        let err = collect_request(&args).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load config"));
    }
}
