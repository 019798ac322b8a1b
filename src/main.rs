use anyhow::{Context, Result, anyhow, bail, ensure};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use esp_portal_client::{
    config::AppConfig,
    device_client::{DeviceClient, EspDeviceClient},
    types::{FirmwareBuild, WorkflowKind},
    workflow::{
        FirmwareImage, Outcome, WiredParams, WorkflowController, WorkflowEvent, WorkflowParams,
    },
};
use log::{error, info};
use std::{io::Write, path::PathBuf, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;

// the countdown reports every second, silence after the upload means the
// device never settled on a result
const FIRMWARE_RESULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "esp-portal-client")]
#[command(version, about = "Drive the ESP32 device portal: network joins and firmware updates")]
#[command(long_about = "Talks to the device's HTTP API (DEVICE_URL, default http://192.168.4.1), \
                       starts a workflow and follows it by polling until the device reports a result.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a wifi network
    Wifi {
        /// Network name, truncated to 32 bytes
        ssid: String,
        /// Passphrase, truncated to 64 bytes
        password: String,
    },
    /// Configure and join the wired network
    Eth {
        #[command(subcommand)]
        mode: EthMode,
    },
    /// Disconnect the device from its wifi network
    WifiDisconnect,
    /// Disconnect the device from the wired network
    EthDisconnect,
    /// Upload a firmware image and wait for the device to reboot
    Ota {
        /// Firmware image to upload
        file: PathBuf,
    },
    /// Show access point, clock, ethernet config and firmware build
    Info,
}

#[derive(Subcommand)]
enum EthMode {
    /// Obtain an address via DHCP
    Dhcp,
    /// Use a static address
    Static {
        ip: String,
        subnet: String,
        gateway: String,
        /// Optional DNS server
        #[arg(long)]
        dns: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize();

    let cli = Cli::parse();

    match cli.command {
        Commands::Wifi { ssid, password } => {
            run_workflow(WorkflowParams::WirelessJoin { ssid, password }).await
        }
        Commands::Eth { mode } => {
            let params = match mode {
                EthMode::Dhcp => WiredParams::dhcp(),
                EthMode::Static {
                    ip,
                    subnet,
                    gateway,
                    dns,
                } => WiredParams {
                    dns,
                    ..WiredParams::static_ip(&ip, &subnet, &gateway)
                },
            };
            run_workflow(WorkflowParams::WiredJoin(params)).await
        }
        Commands::WifiDisconnect => disconnect(WorkflowKind::WirelessJoin).await,
        Commands::EthDisconnect => disconnect(WorkflowKind::WiredJoin).await,
        Commands::Ota { file } => {
            let image = FirmwareImage::from_path(&file).await?;
            run_workflow(WorkflowParams::FirmwareUpdate { files: vec![image] }).await
        }
        Commands::Info => show_info().await,
    }
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));
}

fn spawn_controller() -> Result<(WorkflowController, UnboundedReceiver<WorkflowEvent>)> {
    let config = AppConfig::get();
    let device = EspDeviceClient::new()?;

    Ok(WorkflowController::spawn(device, config.polling.clone()))
}

async fn run_workflow(params: WorkflowParams) -> Result<()> {
    let kind = params.kind();
    let (controller, mut events) = spawn_controller()?;

    controller.start(params)?;
    let result = follow(kind, &mut events, FIRMWARE_RESULT_TIMEOUT).await;

    controller.shutdown();
    result
}

/// Print events of `kind` until its workflow is over
async fn follow(
    kind: WorkflowKind,
    events: &mut UnboundedReceiver<WorkflowEvent>,
    result_timeout: Duration,
) -> Result<()> {
    let mut uploaded = false;

    loop {
        let next = if uploaded {
            tokio::time::timeout(result_timeout, events.recv())
                .await
                .map_err(|_| anyhow!("device did not report a {kind} result after the upload"))?
        } else {
            events.recv().await
        };

        let Some(event) = next else {
            bail!("workflow engine stopped unexpectedly");
        };

        println!("{event}");

        match event {
            WorkflowEvent::WorkflowCompleted {
                outcome: Outcome::Failure { reason },
                ..
            } => bail!("{kind} failed: {reason}"),
            WorkflowEvent::WorkflowCompleted { .. } if kind != WorkflowKind::FirmwareUpdate => {
                return Ok(());
            }
            WorkflowEvent::ReloadRequested => return Ok(()),
            WorkflowEvent::UploadProgress { sent, total } if sent >= total => uploaded = true,
            _ => {}
        }
    }
}

async fn disconnect(kind: WorkflowKind) -> Result<()> {
    let (controller, mut events) = spawn_controller()?;

    controller.disconnect(kind)?;

    let event = events
        .recv()
        .await
        .context("workflow engine stopped unexpectedly")?;
    println!("{event}");

    controller.shutdown();

    ensure!(
        matches!(&event, WorkflowEvent::StatusChanged { label, .. } if label == "Disconnected"),
        "failed to disconnect {kind}"
    );

    Ok(())
}

async fn show_info() -> Result<()> {
    let device = EspDeviceClient::new()?;

    let ssid = device.ap_ssid().await?;
    println!("access point: {ssid}");

    let time = device.local_time().await?;
    println!("local time:   {time}");

    let eth = device.eth_config().await?;
    println!(
        "ethernet:     {} ip {} subnet {} gateway {} dns {} mac {}",
        eth.mode, eth.ip, eth.subnet, eth.gateway, eth.dns, eth.mac
    );

    let build = FirmwareBuild::from(device.ota_status().await?);
    println!("firmware:     {build}");

    Ok(())
}
