use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{info, warn};

use super::{EvalError, EvalHandle, EvalOutcome, EvalReport, Evaluator};

// What an external evaluator sees after `stop`.
const SILENCE: &str = "hush()";

enum Request {
    Evaluate { handle: EvalHandle, program: String },
    Stop,
    SetCps(f64),
}

/// Hands programs to an external evaluator by rewriting a watched file
/// from a worker thread. When several requests queue up before the worker
/// gets to them, only the newest evaluate/stop is applied.
pub struct ProgramFileEvaluator {
    tx: Sender<Request>,
    report_rx: Receiver<EvalReport>,
    next_handle: u64,
    worker: Option<JoinHandle<()>>,
}

impl ProgramFileEvaluator {
    pub fn start(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let (tx, rx) = crossbeam_channel::bounded::<Request>(64);
        let (report_tx, report_rx) = crossbeam_channel::bounded::<EvalReport>(64);
        let worker = std::thread::Builder::new()
            .name("evaluator".into())
            .spawn(move || run_worker(path, rx, report_tx))?;
        Ok(Self {
            tx,
            report_rx,
            next_handle: 0,
            worker: Some(worker),
        })
    }

    pub fn poll_report(&self) -> Option<EvalReport> {
        self.report_rx.try_recv().ok()
    }

    pub fn wait_report(&self, timeout: Duration) -> Option<EvalReport> {
        self.report_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, request: Request) -> Result<(), EvalError> {
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => EvalError::Busy,
            TrySendError::Disconnected(_) => EvalError::Disconnected,
        })
    }
}

impl Evaluator for ProgramFileEvaluator {
    fn evaluate(&mut self, program: &str) -> Result<EvalHandle, EvalError> {
        if program.trim().is_empty() {
            return Err(EvalError::EmptyProgram);
        }
        let handle = EvalHandle(self.next_handle + 1);
        self.send(Request::Evaluate {
            handle,
            program: program.to_string(),
        })?;
        self.next_handle += 1;
        Ok(handle)
    }

    fn stop(&mut self) -> Result<(), EvalError> {
        self.send(Request::Stop)
    }

    fn set_cps(&mut self, cps: f64) -> Result<(), EvalError> {
        self.send(Request::SetCps(cps))
    }
}

impl Drop for ProgramFileEvaluator {
    fn drop(&mut self) {
        // closing the channel ends the worker loop
        let (closed, _) = crossbeam_channel::bounded(0);
        drop(std::mem::replace(&mut self.tx, closed));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(path: PathBuf, rx: Receiver<Request>, report_tx: Sender<EvalReport>) {
    let report = |handle, outcome| {
        let _ = report_tx.try_send(EvalReport { handle, outcome });
    };
    // last program handed off that is still running
    let mut current: Option<(EvalHandle, String)> = None;

    while let Ok(first) = rx.recv() {
        let mut latest = None;
        let mut cps = None;
        for request in std::iter::once(first).chain(rx.try_iter()) {
            match request {
                Request::SetCps(value) => cps = Some(value),
                newer => {
                    // a newer program or stop carries its own tempo
                    cps = None;
                    if let Some(Request::Evaluate { handle, .. }) = latest.replace(newer) {
                        report(Some(handle), EvalOutcome::Superseded);
                    }
                }
            }
        }

        let (handle, text, outcome) = match (latest, &current, cps) {
            (Some(Request::Evaluate { handle, program }), _, cps) => {
                let program = match cps {
                    Some(cps) => with_tempo(&program, cps),
                    None => program,
                };
                (Some(handle), program, EvalOutcome::Running)
            }
            (Some(Request::Stop), _, _) => (None, SILENCE.to_string(), EvalOutcome::Stopped),
            (_, Some((handle, program)), Some(cps)) => {
                (Some(*handle), with_tempo(program, cps), EvalOutcome::Running)
            }
            _ => {
                info!(?cps, "tempo change with nothing playing");
                continue;
            }
        };
        match std::fs::write(&path, format!("{text}\n")) {
            Ok(()) => {
                info!(path = %path.display(), ?handle, "program handed off");
                current = handle.map(|h| (h, text));
                report(handle, outcome);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not write program");
                report(handle, EvalOutcome::Failed(e.to_string()));
            }
        }
    }
}

// Replaces a leading `setcps(..)` line, or adds one.
fn with_tempo(program: &str, cps: f64) -> String {
    let is_tempo = |line: &str| line.trim_start().starts_with("setcps(");
    let body = match program.split_once('\n') {
        Some((first, rest)) if is_tempo(first) => rest,
        None if is_tempo(program) => "",
        _ => program,
    };
    format!("setcps({cps})\n{body}")
}
