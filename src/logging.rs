use std::sync::Once;

use log::info;

use crate::config::Configuration;

static INIT: Once = Once::new();

/// Wires the log facade to stdout and, when configured, a log file. The
/// level comes from `logging.level`; an unreadable log file degrades to
/// stdout-only logging instead of aborting startup.
pub fn setup_logging(cfg: &Configuration) {
    let log_level = match cfg.logging.level.as_str() {
        "off" => log::LevelFilter::Off,
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" | "warning" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        level => {
            eprintln!("udpt: unknown log level encountered '{level}'");
            std::process::exit(1);
        }
    };

    if log_level == log::LevelFilter::Off {
        return;
    }

    INIT.call_once(|| {
        let mut dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}][{}] {}",
                    chrono::Local::now().format("%+"),
                    record.target(),
                    record.level(),
                    message
                ));
            })
            .level(log_level)
            .chain(std::io::stdout());

        if let Some(filename) = &cfg.logging.filename {
            match fern::log_file(filename) {
                Ok(file) => dispatch = dispatch.chain(file),
                Err(e) => eprintln!("udpt: could not open log file '{filename}': {e}"),
            }
        }

        if let Err(_e) = dispatch.apply() {
            eprintln!("udpt: failed to initialize logging.");
            std::process::exit(1);
        }

        info!("logging initialized.");
    });
}
