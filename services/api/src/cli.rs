use crate::render::{run_render, RenderArgs};
use crate::server;
use call_intake::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "call-intake",
    about = "Receive call applications and re-render their PDF summaries",
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
    /// Render the PDF summary of an archived submission file
    Render(RenderArgs),
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
        Command::Render(args) => run_render(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["call-intake"]).expect("parses");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["call-intake", "serve", "--port", "8080"]).expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn render_requires_input_and_output() {
        assert!(Cli::try_parse_from(["call-intake", "render", "--input", "a.json"]).is_err());
        let cli = Cli::try_parse_from([
            "call-intake",
            "render",
            "--input",
            "a.json",
            "--output",
            "a.pdf",
        ])
        .expect("parses");
        assert!(matches!(cli.command, Some(Command::Render(_))));
    }
}
