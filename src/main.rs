use clap::Parser;

use core_lib::{
    app::{EXIT_FATAL, run},
    cli::Cli,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            EXIT_FATAL
        }
    };

    // a libgit2 call stuck past its timeout must not keep the process alive
    std::process::exit(code);
}
