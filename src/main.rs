// src/main.rs

use encarun::outcome::exit_codes;
use encarun::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("encarun error: {err:?}");
            std::process::exit(exit_codes::ERROR_OTHER);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let outcome = run(args).await?;
    Ok(outcome.process_exit_code())
}
