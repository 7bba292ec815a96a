// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lovegame host: desktop stand-in for the mobile app shell.
//
// Entry point. Initialises logging, loads `lovegame.json` from the working
// directory (defaults if absent), and serves the method channel over stdin /
// stdout. The main thread is the owning context; a reader thread only
// forwards raw lines onto it.
//
// Input, one call per line:   {"id": 1, "method": "performAction", "args": {"type": "like"}}
// Output, one reply per line: {"id": 1, "reply": [{"action": "like", "success": true}]}
// A `null` reply means the method is not implemented.

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use lovegame_bridge::stub::StubChannel;
use lovegame_bridge::{MainQueue, OwningContext};
use lovegame_core::BridgeConfig;
use tracing::{debug, error, info, warn};

const CONFIG_FILE: &str = "lovegame.json";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(platform = lovegame_bridge::platform_name(), "Lovegame host starting");

    let config = match BridgeConfig::load_or_default(CONFIG_FILE) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, path = CONFIG_FILE, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let queue = MainQueue::new();
    let stub = match StubChannel::new(&config, queue.handle()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "channel setup failed");
            return ExitCode::FAILURE;
        }
    };
    info!(channel = %config.channel_name, workers = config.max_workers, "serving on stdin/stdout");

    let pending = Arc::new(AtomicUsize::new(0));
    let eof = Arc::new(AtomicBool::new(false));
    spawn_reader(Arc::clone(&stub), queue.handle(), Arc::clone(&pending), Arc::clone(&eof));

    // Keep turning until input is exhausted and every call has been answered.
    while !(eof.load(Ordering::Acquire) && pending.load(Ordering::Acquire) == 0) {
        queue.turn(Duration::from_millis(100));
    }
    queue.pump();

    info!("Lovegame host stopped");
    ExitCode::SUCCESS
}

/// Forward stdin lines onto the owning loop. Does no decoding itself.
fn spawn_reader(
    stub: Arc<StubChannel>,
    main: lovegame_bridge::MainHandle,
    pending: Arc<AtomicUsize>,
    eof: Arc<AtomicBool>,
) {
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(l) if l.trim().is_empty() => continue,
                    Ok(l) => l,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                };

                pending.fetch_add(1, Ordering::AcqRel);
                let stub = Arc::clone(&stub);
                let answered = Arc::clone(&pending);
                let posted = main.post(Box::new(move || handle_line(&stub, line, answered)));
                if posted.is_err() {
                    pending.fetch_sub(1, Ordering::AcqRel);
                    break;
                }
            }
            eof.store(true, Ordering::Release);
            debug!("stdin closed");
        });

    if let Err(e) = spawned {
        error!(error = %e, "failed to spawn stdin reader");
        std::process::exit(1);
    }
}

/// Runs on the owning loop.
fn handle_line(stub: &StubChannel, line: String, pending: Arc<AtomicUsize>) {
    let id = serde_json::from_str::<serde_json::Value>(&line)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .unwrap_or(serde_json::Value::Null);

    stub.handle_message(line.as_bytes(), move |envelope| {
        let reply = if envelope.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&envelope).unwrap_or(serde_json::Value::Null)
        };
        let frame = serde_json::json!({ "id": id, "reply": reply });

        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{frame}").and_then(|()| out.flush()) {
            error!(error = %e, "stdout write failed");
        }
        pending.fetch_sub(1, Ordering::AcqRel);
    });
}
