use clap::Args;
use std::path::PathBuf;

use super::OutputFormat;
use skolai::app::App;
use skolai::import::import_file;

#[derive(Args)]
pub struct ImportCommand {
    /// JSON dump of the browser dashboard's local storage
    pub file: PathBuf,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl ImportCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let summary = import_file(&app.store, &self.file).await?;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text => {
                print!("{}", summary);
                println!(
                    "\nImported {} record(s) from {}",
                    summary.imported(),
                    self.file.display()
                );
                if summary.skipped() > 0 {
                    println!(
                        "Skipped {} row(s) that could not be read (see warnings above)",
                        summary.skipped()
                    );
                }
            }
        }
        Ok(())
    }
}
