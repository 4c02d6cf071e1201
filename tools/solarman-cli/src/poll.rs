//! `poll` command: one-shot or periodic register reads

use crate::output::print_registers;
use anyhow::{Context, Result};
use solarman::{
    ConnectionParams, LoggerConfig, LoggerConnection, LoggerProtocol, RegisterRequest,
    SolarmanError,
};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

pub async fn run(config: &LoggerConfig, watch: bool) -> Result<()> {
    let protocol = LoggerProtocol::from_config(config)?;
    let requests = config.register_requests()?;
    let params = ConnectionParams::from_config(config);

    if watch {
        watch_loop(config, &protocol, &requests, params).await;
        return Ok(());
    }

    let mut connection = LoggerConnection::connect(params)
        .await
        .context("Failed to connect to logger")?;
    let result = protocol.read_all(&mut connection, &requests).await;
    connection.close().await;

    let registers = result.context("Register read failed")?;
    print_registers(&registers);
    Ok(())
}

/// Poll until Ctrl-C; failures are logged and the next cycle tries again
async fn watch_loop(
    config: &LoggerConfig,
    protocol: &LoggerProtocol,
    requests: &[RegisterRequest],
    params: ConnectionParams,
) {
    let mut ticker = interval(config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut connection: Option<LoggerConnection> = None;

    info!(
        "Polling {} every {}s ({} requests, {} mode)",
        params.endpoint(),
        config.refresh_interval_secs,
        requests.len(),
        protocol.mode()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                break;
            },
        }

        if connection.is_none() {
            match LoggerConnection::connect(params.clone()).await {
                Ok(conn) => connection = Some(conn),
                Err(e) => {
                    warn!("Logger unreachable, retrying next cycle: {}", e);
                    continue;
                },
            }
        }
        let Some(conn) = connection.as_mut() else {
            continue;
        };

        match protocol.read_all(conn, requests).await {
            Ok(registers) => print_registers(&registers),
            Err(e) => {
                report_cycle_error(&e);
                if e.needs_reconnect() {
                    conn.close().await;
                    connection = None;
                }
            },
        }
    }

    if let Some(mut conn) = connection {
        conn.close().await;
    }
}

fn report_cycle_error(err: &SolarmanError) {
    if err.is_configuration_issue() {
        error!("Poll failed, check the logger configuration: {}", err);
    } else if err.is_transient() {
        warn!("Poll failed: {}", err);
    } else {
        error!("Poll failed: {}", err);
    }
}
