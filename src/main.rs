use defer_dispatch::cli::run_cli;
use defer_dispatch::logging::init_logging;

fn main() -> anyhow::Result<()> {
    init_logging()?;
    run_cli()
}
