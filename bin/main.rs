use tracing::{error, info};
use tracing_subscriber;

use clap::{value_t, App, Arg};

use sentinel_2pc::server::{node, Settings};
use sentinel_2pc::Result;

use std::path::Path;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = App::new("sentinel")
        .version("0.1")
        .about("Admits transactions into the two-phase-commit ledger")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("CONFIG")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("sentinel-id")
                .short("i")
                .long("sentinel-id")
                .value_name("SENTINEL_ID")
                .takes_value(true)
                .required(false),
        )
        .get_matches();

    let config_path = value_t!(matches.value_of("config"), String).unwrap_or_else(|e| e.exit());
    let mut settings = Settings::load(Path::new(&config_path))?;
    if matches.is_present("sentinel-id") {
        settings.sentinel_id =
            value_t!(matches.value_of("sentinel-id"), u32).unwrap_or_else(|e| e.exit());
    }
    let config = settings.validate()?;

    let sys = actix::System::new();
    sys.block_on(async move {
        if let Err(err) = node::run(config).await {
            error!("sentinel failed to start: {}", err);
            actix::System::current().stop();
            return;
        }

        let sig = if cfg!(unix) {
            use futures::future::FutureExt;
            use tokio::signal::unix::{signal, SignalKind};

            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(mut sigint), Ok(mut sigterm)) => futures::select! {
                    _ = sigint.recv().fuse() => "SIGINT",
                    _ = sigterm.recv().fuse() => "SIGTERM"
                },
                _ => {
                    let _ = tokio::signal::ctrl_c().await;
                    "Ctrl+C"
                }
            }
        } else {
            let _ = tokio::signal::ctrl_c().await;
            "Ctrl+C"
        };
        info!(target: "sentinel", "Got {}, stopping...", sig);

        actix::System::current().stop();
    });
    sys.run()?;

    Ok(())
}
