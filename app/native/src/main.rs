//! Starshell configuration tooling.
//!
//! Manages the configuration file read by the Starshell core.

fn main() {
    starshell_lib::init_logging();

    if let Err(err) = starshell_lib::cli::run() {
        eprintln!("starshell: {err}");
        std::process::exit(1);
    }
}
