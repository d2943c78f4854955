use anyhow::Result;
use blockpress::build::{build_site, render_post};
use blockpress::client::NotionClient;
use blockpress::config::{Config, NotionSettings};
use clap::{App, AppSettings, Arg, SubCommand};
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let matches = App::new("blockpress")
        .about("Builds a static blog from a Notion data source")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(
                    Arg::with_name("PROJECT_DIR")
                        .help("Directory containing blockpress.yaml (or a subdirectory of it)")
                        .index(1),
                )
                .arg(
                    Arg::with_name("OUTPUT")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .help("Output directory (defaults to `_output` in the project)"),
                ),
        )
        .subcommand(
            SubCommand::with_name("render")
                .about("Prints one post's body HTML")
                .arg(
                    Arg::with_name("SLUG")
                        .help("The post's slug")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    // Fail before doing any work if the API settings are missing.
    let settings = NotionSettings::from_env()?;

    match matches.subcommand() {
        ("build", Some(matches)) => {
            let project_dir = match matches.value_of("PROJECT_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => std::env::current_dir()?,
            };
            let output = match matches.value_of("OUTPUT") {
                Some(dir) => PathBuf::from(dir),
                None => project_dir.join("_output"),
            };
            let config = Config::from_directory(&project_dir, &output)?;
            build_site(config, &settings).await?;
            log::info!("site written to {}", output.display());
        }
        ("render", Some(matches)) => {
            let slug = matches.value_of("SLUG").unwrap_or_default();
            let client = NotionClient::new(&settings)?;
            let html = render_post(&client, &client, &settings.data_source_id, slug).await?;
            println!("{}", html);
        }
        _ => unreachable!("clap requires a subcommand"),
    }
    Ok(())
}
