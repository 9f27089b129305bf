//! `dhcv6d` — binary entry point. Parses the CLI, loads configuration,
//! and wires the listener, worker pool, and control channel together.
//! `anyhow` is used here and only here (§0): library code keeps its own
//! specific error types so callers can match on cause, but a binary's
//! `main` just needs one propagation type with good context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use dhcv6d::cli::{Cli, Command, EXIT_BIND_ERROR, EXIT_CONFIG_ERROR, EXIT_SHUTDOWN_ERROR};
use dhcv6d::config::{self, HandlerFactoryRegistry, PipelineBuilder};
use dhcv6d::listener::Listener;
use dhcv6d::stats::{ControlChannel, ControlCommand, Stats};
use dhcv6d::worker::{self, ActivePipeline, SharedPipeline};

/// §5: "then drains the work queue up to a grace period (default 5 s),
/// then force-terminates workers."
const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// re-reads `config_path`, rebuilds the registry and pipeline in full,
/// and only then swaps them in (§4.9/§7: "the old pipeline is kept and
/// an error is reported on the control channel" on failure; in-flight
/// transactions holding the prior `Arc<ActivePipeline>` finish against
/// it regardless of the swap).
async fn reload_from_disk(
    config_path: &std::path::Path,
    stats: &Stats,
    shared_pipeline: &SharedPipeline,
) -> Result<(), String> {
    let config_text = std::fs::read_to_string(config_path)
        .map_err(|err| format!("reading configuration from {}: {err}", config_path.display()))?;
    let server_config = config::tree::from_str(&config_text).map_err(|err| err.to_string())?;
    let builder = PipelineBuilder::new(HandlerFactoryRegistry::with_builtins());
    let (registry, pipeline) = builder
        .build(&server_config, stats.dropped_direct_client_counter())
        .map_err(|err| err.to_string())?;
    worker::reload(shared_pipeline, ActivePipeline { registry, pipeline }).await;
    Ok(())
}

fn main() {
    // clap itself prints usage and exits(2) on a malformed invocation,
    // which lines up with §6's "2 on configuration error" without this
    // binary needing its own bad-args exit path.
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            std::process::exit(EXIT_BIND_ERROR);
        }
    };

    let exit_code = runtime.block_on(async_main(cli));
    std::process::exit(exit_code);
}

async fn async_main(cli: Cli) -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let Command::Server(args) = cli.command;

    let config_text = match std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading configuration from {}", args.config.display()))
    {
        Ok(text) => text,
        Err(err) => {
            error!(error = ?err, "failed to read configuration");
            return EXIT_CONFIG_ERROR;
        }
    };

    let server_config = match config::tree::from_str(&config_text) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to parse configuration");
            return EXIT_CONFIG_ERROR;
        }
    };

    let stats = Stats::new();
    let builder = PipelineBuilder::new(HandlerFactoryRegistry::with_builtins());
    let (registry, pipeline) = match builder.build(&server_config, stats.dropped_direct_client_counter()) {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %err, "failed to build pipeline from configuration");
            return EXIT_CONFIG_ERROR;
        }
    };

    if args.check {
        info!("configuration is valid");
        return 0;
    }

    let listener = match Listener::bind(&server_config.listener).await {
        Ok(listener) => Arc::new(listener),
        Err(err) => {
            error!(error = %err, "failed to bind listener socket(s)");
            return EXIT_BIND_ERROR;
        }
    };

    let shared_pipeline = worker::shared(ActivePipeline { registry, pipeline });

    let queue_depth = server_config.worker_pool.effective_queue_depth();
    let (inbound_tx, inbound_rx) = mpsc::channel(queue_depth);
    let (outbound_tx, outbound_rx) = mpsc::channel(queue_depth);
    let inbound_rx = Arc::new(tokio::sync::Mutex::new(inbound_rx));

    // one task per bound socket; kept as a `Vec` rather than wrapped in
    // an outer task so shutdown can abort every one of them directly
    // instead of aborting a wrapper whose children would otherwise keep
    // accepting datagrams.
    let recv_handles = listener.recv_loop(inbound_tx, stats.clone());

    let send_task = {
        let listener = listener.clone();
        let stats = stats.clone();
        tokio::spawn(worker::send_loop(listener, outbound_rx, stats))
    };

    let worker_handles = worker::spawn_workers(
        server_config.worker_pool.workers,
        inbound_rx,
        shared_pipeline.clone(),
        outbound_tx,
        stats.clone(),
    );

    let (command_tx, mut command_rx) = mpsc::channel(8);
    let control = ControlChannel::new(server_config.control_socket.path.clone());
    let control_error_seen = Arc::new(AtomicBool::new(false));
    let control_task = {
        let stats = stats.clone();
        let control_error_seen = control_error_seen.clone();
        tokio::spawn(async move {
            if let Err(err) = control.run(stats, command_tx).await {
                control_error_seen.store(true, Ordering::Relaxed);
                error!(error = %err, "control channel exited");
            }
        })
    };

    info!("dhcv6d running");

    let mut shutdown_via_control = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received interrupt, shutting down");
                break;
            }
            command = command_rx.recv() => {
                match command {
                    Some(ControlCommand::Shutdown) => {
                        info!("received shutdown command");
                        shutdown_via_control = true;
                        break;
                    }
                    Some(ControlCommand::Reload(reply)) => {
                        let outcome = reload_from_disk(&args.config, &stats, &shared_pipeline).await;
                        match &outcome {
                            Ok(()) => info!("configuration reloaded"),
                            Err(err) => {
                                control_error_seen.store(true, Ordering::Relaxed);
                                error!(error = %err, "reload failed, keeping previous pipeline");
                            }
                        }
                        let _ = reply.send(outcome);
                    }
                    Some(ControlCommand::Stats) | None => {}
                }
            }
        }
    }

    // §5: "shutdown stops listeners first (stop accepting), then drains
    // the work queue up to a grace period, then force-terminates
    // workers." Aborting every recv task drops the inbound sender each
    // one owns once all clones are gone, which closes the channel;
    // workers keep draining whatever is already buffered in it and exit
    // on their own once it's empty.
    for handle in &recv_handles {
        handle.abort();
    }
    for handle in recv_handles {
        let _ = handle.await;
    }

    let drain_deadline = Instant::now() + SHUTDOWN_DRAIN_GRACE;
    loop {
        if worker_handles.iter().all(|handle| handle.is_finished()) {
            break;
        }
        if Instant::now() >= drain_deadline {
            warn!("worker drain grace period elapsed, forcing shutdown");
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    for handle in &worker_handles {
        handle.abort();
    }
    for handle in worker_handles {
        let _ = handle.await;
    }

    send_task.abort();
    control_task.abort();

    // §6: a `shutdown` control command that followed a runtime error
    // (a failed reload, a control-channel fault) reports exit code 4
    // rather than the clean-shutdown 0.
    if shutdown_via_control && control_error_seen.load(Ordering::Relaxed) {
        EXIT_SHUTDOWN_ERROR
    } else {
        0
    }
}
