use crate::demo::{run_demo, run_submission_score, DemoArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use contest_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Contest Standings Engine",
    about = "Run and demonstrate the creator contest standings engine from the command line",
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
    /// Score submissions without touching any contest state
    Submission {
        #[command(subcommand)]
        command: SubmissionCommand,
    },
    /// Run an end-to-end CLI demo of a live contest refresh loop
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum SubmissionCommand {
    /// Score one submission payload and print the factor breakdown
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
    /// Seed an in-memory demo contest so the API serves standings immediately
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Submission {
            command: SubmissionCommand::Score(args),
        } => run_submission_score(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
