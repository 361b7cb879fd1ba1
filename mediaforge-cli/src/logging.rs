// mediaforge-cli/src/logging.rs
//
// Console logging setup.

use std::io::Write;

/// Initializes env_logger with a timestamped, level-tagged line format.
/// `RUST_LOG` still overrides the level chosen by the verbose flag.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}
