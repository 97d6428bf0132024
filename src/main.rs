use std::cell::RefCell;
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use zenith_navigator::events::Phase;
use zenith_navigator::memory::{RecordingRegistry, RecordingTransport};
use zenith_navigator::scripts::BatchId;
use zenith_navigator::{
    Applied, Dispatch, FormSubmission, LinkClick, MemoryViewPort, NavState, Navigator, NavigatorConfig,
    PageRequest, PageSnapshot, Primer, RequestId, ResponseEnvelope, RouteParams, ScriptBatch, Trigger,
    TransportFailure,
};

type ReplayNavigator = Navigator<MemoryViewPort, RecordingTransport, RecordingRegistry>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Transcript {
    /// Initial window location, fragment included.
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    primer: Option<Primer>,
    /// Lifecycle handlers to install; each one logs when it fires.
    #[serde(default)]
    handlers: Vec<HandlerSpec>,
    /// Answer given to every confirmation prompt.
    #[serde(default = "default_confirm")]
    confirm: bool,
    steps: Vec<Step>,
}

fn default_confirm() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HandlerSpec {
    file: String,
    phase: Phase,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
enum Step {
    Click(LinkClick),
    Submit(FormSubmission),
    /// Server answer; defaults to the latest request.
    Response {
        #[serde(default)]
        id: Option<RequestId>,
        envelope: ResponseEnvelope,
    },
    Failure {
        #[serde(default)]
        id: Option<RequestId>,
        failure: TransportFailure,
    },
    /// Script batch finished; defaults to the latest batch.
    ScriptsLoaded {
        #[serde(default)]
        batch: Option<BatchId>,
    },
    Fragment {
        fragment: String,
    },
    Track {
        lock_id: String,
        value: String,
    },
    Edit {
        #[serde(default)]
        lock_id: Option<String>,
        value: String,
    },
    Keystroke {
        #[serde(default)]
        lock_id: Option<String>,
        char_code: u32,
        value: String,
    },
    Reset,
    Ready,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum StepOutcome {
    Dispatch { result: Dispatch },
    Applied { result: Applied },
    ScriptsLoaded { accepted: bool },
    Replay {
        index: Option<usize>,
        /// Queued behind a script batch still loading.
        deferred: bool,
        error: Option<String>,
    },
    Locked { locked: bool },
    Done,
}

#[derive(Debug, Serialize)]
struct HistorySlot<'a> {
    index: usize,
    #[serde(flatten)]
    page: &'a PageSnapshot,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    outcomes: Vec<StepOutcome>,
    state: NavState,
    current_index: usize,
    history: Vec<HistorySlot<'a>>,
    menu_keys: Vec<&'a str>,
    locked: Vec<&'a str>,
    route_params: &'a RouteParams,
    requests: Vec<&'a PageRequest>,
    script_batches: &'a [ScriptBatch],
    fired: Vec<String>,
    surface: &'a MemoryViewPort,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("[zenith-navigator] {err:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ZENITH_NAV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let config = match parse_args()? {
        Some(path) => NavigatorConfig::load(&path).with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => NavigatorConfig::default(),
    };

    let mut stdin_payload = String::new();
    io::stdin()
        .read_to_string(&mut stdin_payload)
        .context("failed to read stdin")?;
    if stdin_payload.trim().is_empty() {
        bail!("stdin payload is empty");
    }
    let transcript: Transcript = serde_json::from_str(&stdin_payload).context("invalid transcript JSON")?;

    let mut surface = MemoryViewPort::default().with_content(transcript.content);
    surface.confirm_answer = transcript.confirm;
    if let Some(location) = transcript.location {
        surface.href = location;
    }

    let mut navigator = Navigator::new(config, surface, RecordingTransport::new(), RecordingRegistry::default())?;
    let fired = Rc::new(RefCell::new(Vec::new()));
    for declared in &transcript.handlers {
        let log = Rc::clone(&fired);
        let entry = format!("{}:{}", declared.phase.as_str(), declared.file);
        let handler = move |_: &mut dyn zenith_navigator::ViewPort| log.borrow_mut().push(entry.clone());
        match declared.phase {
            Phase::Onload => navigator.events_mut().register_onload(&declared.file, handler),
            Phase::Teardown => navigator.events_mut().register_teardown(&declared.file, handler),
        };
    }

    navigator.start();
    if let Some(primer) = transcript.primer {
        navigator.prime(primer);
    }

    let mut outcomes = Vec::with_capacity(transcript.steps.len());
    for (index, step) in transcript.steps.into_iter().enumerate() {
        let outcome = apply_step(&mut navigator, step).with_context(|| format!("step {index}"))?;
        outcomes.push(outcome);
    }

    let fired = fired.borrow().clone();
    let report = Report {
        outcomes,
        state: navigator.state(),
        current_index: navigator.history().current_index(),
        history: navigator
            .history()
            .entries()
            .map(|(index, page)| HistorySlot { index, page })
            .collect(),
        menu_keys: navigator.menus().keys(),
        locked: navigator.lock().locked_ids().collect(),
        route_params: navigator.route_params(),
        requests: navigator.transport().sent.iter().map(|(_, request)| request).collect(),
        script_batches: &navigator.modules().batches,
        fired,
        surface: navigator.view(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn apply_step(navigator: &mut ReplayNavigator, step: Step) -> Result<StepOutcome> {
    let outcome = match step {
        Step::Click(link) => StepOutcome::Dispatch {
            result: navigator.request(Trigger::Link(link)),
        },
        Step::Submit(form) => StepOutcome::Dispatch {
            result: navigator.request(Trigger::Submit(form)),
        },
        Step::Response { id, envelope } => {
            let id = request_id(navigator, id)?;
            StepOutcome::Applied {
                result: navigator.on_response(id, envelope),
            }
        }
        Step::Failure { id, failure } => {
            let id = request_id(navigator, id)?;
            StepOutcome::Applied {
                result: navigator.on_transport_failure(id, failure),
            }
        }
        Step::ScriptsLoaded { batch } => {
            let batch = match batch {
                Some(batch) => batch,
                None => navigator
                    .modules()
                    .batches
                    .last()
                    .map(|batch| batch.id)
                    .ok_or_else(|| anyhow!("no script batch has been requested"))?,
            };
            StepOutcome::ScriptsLoaded {
                accepted: navigator.scripts_loaded(batch),
            }
        }
        Step::Fragment { fragment } => match navigator.fragment_changed(&fragment) {
            None => StepOutcome::Replay {
                index: None,
                deferred: false,
                error: None,
            },
            Some(Ok(())) => match navigator.pending_replay() {
                Some(index) => StepOutcome::Replay {
                    index: Some(index),
                    deferred: true,
                    error: None,
                },
                None => StepOutcome::Replay {
                    index: Some(navigator.history().current_index().saturating_sub(1)),
                    deferred: false,
                    error: None,
                },
            },
            Some(Err(err)) => StepOutcome::Replay {
                index: None,
                deferred: false,
                error: Some(err.to_string()),
            },
        },
        Step::Track { lock_id, value } => {
            navigator.track_field(&lock_id, &value);
            StepOutcome::Locked {
                locked: navigator.lock().is_locked(),
            }
        }
        Step::Edit { lock_id, value } => StepOutcome::Locked {
            locked: navigator.field_edited(lock_id.as_deref(), &value),
        },
        Step::Keystroke {
            lock_id,
            char_code,
            value,
        } => StepOutcome::Locked {
            locked: navigator.keystroke(lock_id.as_deref(), char_code, &value),
        },
        Step::Reset => {
            navigator.form_reset();
            StepOutcome::Locked { locked: false }
        }
        Step::Ready => {
            navigator.page_ready();
            StepOutcome::Done
        }
    };
    Ok(outcome)
}

fn request_id(navigator: &ReplayNavigator, id: Option<RequestId>) -> Result<RequestId> {
    id.or_else(|| navigator.transport().last_id())
        .ok_or_else(|| anyhow!("no request has been sent"))
}

fn parse_args() -> Result<Option<PathBuf>> {
    let mut config: Option<PathBuf> = None;
    let mut args = env::args().skip(1);

    match args.next().as_deref() {
        Some("replay") => {}
        Some(other) => bail!("unknown command '{other}'. usage: zenith-navigator replay [--config <file.toml>]"),
        None => bail!("missing command. usage: zenith-navigator replay [--config <file.toml>]"),
    }

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or_else(|| anyhow!("missing value for --config"))?;
                config = Some(PathBuf::from(value));
            }
            _ => bail!("unknown argument '{arg}'. usage: zenith-navigator replay [--config <file.toml>]"),
        }
    }

    Ok(config)
}
