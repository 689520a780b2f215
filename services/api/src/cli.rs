use crate::demo::{run_demo, run_rank, run_score, DemoArgs, RankArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use idea_board::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Idea Board",
    about = "Run the idea board service or inspect enriched ideas from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with enriched idea exports
    Ideas {
        #[command(subcommand)]
        command: IdeasCommand,
    },
    /// Walk through submission, voting and metric edits against an in-memory store
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum IdeasCommand {
    /// Filter and rank an enriched export
    Rank(RankArgs),
    /// Compute a composite score from raw metrics
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Ideas {
            command: IdeasCommand::Rank(args),
        } => run_rank(args),
        Command::Ideas {
            command: IdeasCommand::Score(args),
        } => run_score(args),
        Command::Demo(args) => run_demo(args),
    }
}
