//! Statistics & control channel — §4.8. Counters and latency
//! histograms live behind a `prometheus::Registry`; the UNIX-domain
//! control socket offers the newline-delimited `stats`/`reload`/
//! `shutdown` text protocol from §6 against the same counters.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use prometheus::{Encoder as _, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::IoError;

/// process-wide counters and histograms. Cheap to clone (every field is
/// already a `prometheus` handle wrapping an `Arc` internally), so a
/// single `Stats` value is shared by reference across workers.
#[derive(Clone)]
pub struct Stats {
    registry: Registry,
    messages_total: IntCounterVec,
    decode_failures_total: IntCounter,
    encode_failures_total: IntCounter,
    send_failures_total: IntCounter,
    timeouts_total: IntCounter,
    pipeline_latency_seconds: HistogramVec,
    dropped_direct_client_total: Arc<AtomicU64>,
}

impl Stats {
    pub fn new() -> Self {
        let registry = Registry::new();

        let messages_total = IntCounterVec::new(
            Opts::new("dhcv6d_messages_total", "messages processed, by request type and disposition"),
            &["message_type", "disposition"],
        )
        .expect("static metric definition");
        let decode_failures_total = IntCounter::new(
            "dhcv6d_decode_failures_total",
            "datagrams dropped because they failed to decode",
        )
        .expect("static metric definition");
        let encode_failures_total = IntCounter::new(
            "dhcv6d_encode_failures_total",
            "responses dropped because encoding violated an invariant",
        )
        .expect("static metric definition");
        let send_failures_total = IntCounter::new(
            "dhcv6d_send_failures_total",
            "responses dropped because the send to the client failed",
        )
        .expect("static metric definition");
        let timeouts_total = IntCounter::new(
            "dhcv6d_timeouts_total",
            "transactions dropped because their deadline was exceeded",
        )
        .expect("static metric definition");
        let pipeline_latency_seconds = HistogramVec::new(
            HistogramOpts::new("dhcv6d_pipeline_latency_seconds", "time spent running the pipeline for one transaction"),
            &["disposition"],
        )
        .expect("static metric definition");

        registry.register(Box::new(messages_total.clone())).expect("metric name collision");
        registry.register(Box::new(decode_failures_total.clone())).expect("metric name collision");
        registry.register(Box::new(encode_failures_total.clone())).expect("metric name collision");
        registry.register(Box::new(send_failures_total.clone())).expect("metric name collision");
        registry.register(Box::new(timeouts_total.clone())).expect("metric name collision");
        registry.register(Box::new(pipeline_latency_seconds.clone())).expect("metric name collision");

        Stats {
            registry,
            messages_total,
            decode_failures_total,
            encode_failures_total,
            send_failures_total,
            timeouts_total,
            pipeline_latency_seconds,
            dropped_direct_client_total: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_message(&self, message_type: &str, disposition: &str) {
        self.messages_total.with_label_values(&[message_type, disposition]).inc();
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures_total.inc();
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures_total.inc();
    }

    pub fn record_send_failure(&self) {
        self.send_failures_total.inc();
    }

    pub fn record_timeout(&self) {
        self.timeouts_total.inc();
    }

    pub fn record_latency(&self, disposition: &str, seconds: f64) {
        self.pipeline_latency_seconds.with_label_values(&[disposition]).observe(seconds);
    }

    /// shared counter handed to
    /// [`crate::handler::builtin::RejectDirectClientMessagesHandler`] so
    /// the `stats` control command can report it alongside the
    /// `prometheus` counters above.
    pub fn dropped_direct_client_counter(&self) -> Arc<AtomicU64> {
        self.dropped_direct_client_total.clone()
    }

    /// Prometheus text exposition format, for an external scraper/sink.
    pub fn render_prometheus(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf).expect("text encoding cannot fail for well-formed metrics");
        String::from_utf8(buf).expect("prometheus text encoder always emits UTF-8")
    }

    /// the plain `key=value` dump the control socket's `stats` command
    /// returns (§6) — a flatter view than the full Prometheus exposition
    /// format, one line per counter family summed across label values.
    pub fn render_key_value(&self) -> String {
        let mut out = String::new();
        for family in self.registry.gather() {
            let total: i64 = family
                .get_metric()
                .iter()
                .map(|m| {
                    if m.has_counter() {
                        m.get_counter().get_value() as i64
                    } else if m.has_histogram() {
                        m.get_histogram().get_sample_count() as i64
                    } else {
                        0
                    }
                })
                .sum();
            out.push_str(family.get_name());
            out.push('=');
            out.push_str(&total.to_string());
            out.push('\n');
        }
        out.push_str("dropped_direct_client=");
        out.push_str(&self.dropped_direct_client_total.load(Ordering::Relaxed).to_string());
        out.push('\n');
        out
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// outcome of a `reload` command, reported back over the control
/// socket. `reload` itself is driven by whoever owns the listener/
/// worker lifecycle (`crate::cli`/the binary); this channel only
/// carries the request and its result.
pub type ReloadRequest = oneshot::Sender<Result<(), String>>;

/// commands accepted on the control socket, one per line.
pub enum ControlCommand {
    Stats,
    Reload(ReloadRequest),
    Shutdown,
}

/// the UNIX-domain control socket from §4.8/§6. Parses the
/// newline-delimited `stats`/`reload`/`shutdown` protocol and forwards
/// `reload`/`shutdown` onto a channel the process owner drains;
/// `stats` is answered directly since it only reads shared counters.
pub struct ControlChannel {
    path: PathBuf,
}

impl ControlChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ControlChannel { path: path.into() }
    }

    /// bind the socket (removing a stale file left by a prior run) and
    /// serve connections until `shutdown_tx` is dropped or the listener
    /// errors. Each accepted connection is handled on its own task.
    pub async fn run(self, stats: Stats, commands: mpsc::Sender<ControlCommand>) -> Result<(), IoError> {
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
        }
        let listener = UnixListener::bind(&self.path).map_err(IoError::ControlSocket)?;
        info!(path = %self.path.display(), "control socket listening");

        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "control socket accept failed");
                    continue;
                }
            };
            let stats = stats.clone();
            let commands = commands.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(stream, stats, commands).await {
                    warn!(error = %err, "control connection ended with an error");
                }
            });
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn serve_connection(
    stream: tokio::net::UnixStream,
    stats: Stats,
    commands: mpsc::Sender<ControlCommand>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match line.trim() {
            "stats" => stats.render_key_value(),
            "reload" => {
                let (tx, rx) = oneshot::channel();
                if commands.send(ControlCommand::Reload(tx)).await.is_err() {
                    "error: reload channel closed\n".to_string()
                } else {
                    match rx.await {
                        Ok(Ok(())) => "ok\n".to_string(),
                        Ok(Err(message)) => format!("error: {message}\n"),
                        Err(_) => "error: reload worker dropped the request\n".to_string(),
                    }
                }
            }
            "shutdown" => {
                let _ = commands.send(ControlCommand::Shutdown).await;
                "ok\n".to_string()
            }
            "" => continue,
            other => format!("error: unknown command {other}\n"),
        };
        writer.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_dump_includes_registered_families() {
        let stats = Stats::new();
        stats.record_message("solicit", "emit");
        stats.record_decode_failure();
        let dump = stats.render_key_value();
        assert!(dump.contains("dhcv6d_messages_total=1"));
        assert!(dump.contains("dhcv6d_decode_failures_total=1"));
    }

    #[test]
    fn prometheus_text_includes_metric_names() {
        let stats = Stats::new();
        stats.record_timeout();
        let text = stats.render_prometheus();
        assert!(text.contains("dhcv6d_timeouts_total"));
    }
}
