mod gatt;

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use bluer::{Adapter, Session};
use clap::Parser;
use tokio::{signal, time::sleep};

use smok_common::config::Config;
use smok_common::constants::*;
use smok_common::logger::*;
use smok_common::SmokService;

// stderr is a pipe that `smok start` stops reading after startup
static LOGGER: Logger = Logger::new(DAEMON_NAME, false);

#[derive(Debug, Parser)]
#[command(name = DAEMON_NAME, about = "BLE GATT peripheral exposing CPU temperature and Wi-Fi setup")]
struct Args {
    #[arg(
        short,
        long,
        help = "Bluetooth adapter to serve on (e.g. hci0), uses the default adapter if not specified"
    )]
    adapter: Option<String>,
    #[arg(short, long, default_value = LOCAL_NAME, help = "Advertised local name")]
    name: String,
    #[arg(long, default_value = DEFAULT_PASSKEY, help = "Passkey enabling the gated characteristics")]
    passkey: String,
    #[arg(long, default_value = WPA_SUPPLICANT_PATH, help = "wpa_supplicant file written on Wi-Fi configuration")]
    wpa_conf: PathBuf,
    #[arg(long, default_value = THERMAL_ZONE_PATH, help = "Thermal zone file reporting the CPU temperature")]
    thermal_zone: PathBuf,
    #[arg(long, default_value = WPA_COUNTRY, help = "Country code written in the wpa_supplicant file")]
    country: String,
    #[arg(
        long,
        default_value_t = NOTIFY_PERIOD.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(100..),
        help = "Period between two notifications, in milliseconds"
    )]
    notify_ms: u64,
    #[arg(short, long, help = "If specified, logs debug messages too")]
    verbose: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            adapter: args.adapter,
            local_name: args.name,
            passkey: args.passkey,
            wpa_supplicant_path: args.wpa_conf,
            thermal_zone_path: args.thermal_zone,
            country: args.country,
            notify_period: Duration::from_millis(args.notify_ms),
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    LOGGER.init(log_level(args.verbose));

    let config = Config::from(args);

    if let Err(error) = serve(config).await {
        error!("{error}");
        // Picked up by `smok start` when the daemon dies during startup
        let _ = writeln!(io::stderr(), "{error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/*
 * - Registers the SMOK GATT application and the advertisement with BlueZ
 * - Waits for SIGINT
 * - Drops both handles which unregisters them from the bus
 */
async fn serve(config: Config) -> bluer::Result<()> {
    let session = Session::new().await?;
    let adapter = get_adapter(&session, config.adapter.as_deref()).await?;

    let service = SmokService::from_config(&config);

    let app_handle = adapter
        .serve_gatt_application(gatt::application(&service, config.notify_period))
        .await?;
    info!("GATT application registered on {}", adapter.name());

    let adv_handle = adapter
        .advertise(gatt::advertisement(&config.local_name))
        .await?;
    info!(
        "Advertising as {} ({})",
        config.local_name,
        adapter.address().await?
    );

    if let Err(error) = signal::ctrl_c().await {
        error!("Cannot listen for SIGINT: {error}");
    }

    info!("Shutting down, unregistering GATT application and advertisement");
    drop(adv_handle);
    drop(app_handle);
    // Gives BlueZ the time to process the unregistration
    sleep(Duration::from_secs(1)).await;

    Ok(())
}

async fn get_adapter(session: &Session, name: Option<&str>) -> bluer::Result<Adapter> {
    let adapter = match name {
        Some(name) => session.adapter(name)?,
        None => session.default_adapter().await?,
    };

    if !adapter.is_powered().await? {
        adapter.set_powered(true).await?;
    }

    Ok(adapter)
}
