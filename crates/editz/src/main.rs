use crate::prelude::*;
use clap::Parser;

mod edit;
mod error;
mod extract;
mod prelude;
mod server;

#[cfg(test)]
mod testing;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Replace text in PDF documents while keeping the surrounding layout"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "EDITZ_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Print the text spans of a document
    Extract(crate::extract::ExtractOptions),

    /// Replace one text span and write the edited document
    Edit(crate::edit::EditOptions),

    /// Start the HTTP backend
    Serve(crate::server::cli::ServeOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    let default_filter = if app.global.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    color_eyre::install()?;

    match app.command {
        SubCommands::Extract(options) => crate::extract::run(options, app.global).await,
        SubCommands::Edit(options) => crate::edit::run(options, app.global).await,
        SubCommands::Serve(options) => crate::server::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
