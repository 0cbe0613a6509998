use clap::Parser;
use color_eyre::Result;
use form_app::cli::Cli;

fn main() -> Result<()> {
    form_app::errors::init()?;
    let cli = Cli::parse();
    let _log_guard = form_app::logging::init_logging(cli.log_file.as_deref())?;

    let output = form_app::run(&cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
