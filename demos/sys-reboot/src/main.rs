//! # Sys Reboot Demo
//!
//! Registers a simulated device implementing the Sys service, then calls
//! `Sys.Reboot` on it through a loopback instance. Pass `--raw` to send an
//! arbitrary JSON argument document straight to the dispatcher instead, which
//! shows server-side validation rejecting bad input.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use strict_rpc::loopback::LoopbackInstance;
use strict_rpc::prelude::*;
use strict_rpc_sys::{RebootArgs, SERVICE_ID, Sys, SysClient, register_service};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reboot delay in milliseconds; omitted means the device default
    #[arg(short, long)]
    delay_ms: Option<i64>,

    /// Send this JSON document as the raw Sys.Reboot arguments
    #[arg(long)]
    raw: Option<String>,

    /// Make the device refuse the reboot with this status
    #[arg(long)]
    busy_status: Option<i32>,

    /// Client call timeout in milliseconds
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,
}

/// Pretends to reboot by sleeping for the requested delay
struct SimulatedDevice {
    busy_status: Option<i32>,
}

#[async_trait]
impl Sys for SimulatedDevice {
    async fn reboot(&self, _ctx: &CallContext, args: RebootArgs) -> RpcResult<()> {
        if let Some(status) = self.busy_status {
            warn!(status, "Device busy, refusing reboot");
            return Err(RpcError::remote(status, "busy"));
        }
        let delay = args.delay_ms_or_default();
        info!(delay_ms = delay, "Rebooting");
        tokio::time::sleep(Duration::from_millis(delay.max(0) as u64)).await;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let registry = Arc::new(Registry::new());
    register_service(
        &registry,
        Arc::new(SimulatedDevice {
            busy_status: args.busy_status,
        }),
    )?;
    if let Some(definition) = registry.service(SERVICE_ID) {
        info!(
            service = SERVICE_ID,
            definition = %definition.to_document(),
            "Published service definition"
        );
    }

    if let Some(raw) = args.raw {
        let cmd = Command::new("Sys.Reboot").with_args(raw.into_bytes());
        let response = registry.dispatch(CallContext::new(), "demo", cmd).await;
        info!(
            status = response.status,
            status_msg = %response.status_msg,
            "Raw dispatch finished"
        );
        return Ok(());
    }

    let instance = Arc::new(LoopbackInstance::new(registry, "demo"));
    let client = SysClient::new(instance, "device")
        .with_config(StubConfig::default().with_call_timeout(Duration::from_millis(args.timeout_ms)));

    let reboot_args = RebootArgs {
        delay_ms: args.delay_ms,
    };
    match client.reboot(&CallContext::new(), reboot_args).await {
        Ok(()) => info!("Reboot acknowledged"),
        Err(RpcError::Remote { status, message }) => {
            warn!(status, message = %message, "Device refused reboot")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
