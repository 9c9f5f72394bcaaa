use muuc::run_from_env;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("MUUC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_from_env() {
        eprintln!("error: {}", err.message);
        std::process::exit(1);
    }
}
