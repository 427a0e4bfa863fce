use std::process::exit;
use std::sync::Arc;

use log::info;
use tokio::sync::watch;

use udpt::config::Configuration;
use udpt::tracker::Tracker;
use udpt::{app, logging};

#[tokio::main]
async fn main() {
    let parser = clap::App::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            clap::Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .help("Configuration file to load."),
        )
        .arg(
            clap::Arg::with_name("check")
                .short("t")
                .long("check")
                .help("Validate the configuration and exit."),
        )
        .arg(
            clap::Arg::with_name("interactive")
                .short("i")
                .long("interactive")
                .help("Run in the foreground."),
        );

    let matches = parser.get_matches();

    let cfg = match matches.value_of("config") {
        Some(config_path) => match Configuration::load_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("udpt: failed to open configuration: {e}");
                exit(1);
            }
        },
        None => {
            eprintln!("No configuration file supplied. Using default configuration.");
            Configuration::default()
        }
    };

    if matches.is_present("check") {
        println!("configuration is valid.");
        exit(0);
    }

    // daemonization is not supported on this runtime, the tracker always
    // runs in the foreground
    let _ = matches.is_present("interactive");

    let cfg = Arc::new(cfg);

    logging::setup_logging(&cfg);

    let tracker = match Tracker::new(&cfg) {
        Ok(tracker) => Arc::new(tracker),
        Err(e) => {
            eprintln!("udpt: failed to open the database: {e}");
            exit(1);
        }
    };

    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let jobs = match app::start(&cfg, tracker.clone(), shutdown_receiver).await {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("udpt: {e}");
            exit(1);
        }
    };

    shutdown_signal().await;

    info!("shutting down...");
    let _ = shutdown_sender.send(true);

    for job in jobs {
        let _ = job.await;
    }

    info!("goodbye.");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install termination signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("CTRL-C received"),
        _ = terminate => info!("termination signal received"),
    }
}
