//! Binary entrypoint for distkit-cli

fn main() {
    if let Err(err) = distkit_cli::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
