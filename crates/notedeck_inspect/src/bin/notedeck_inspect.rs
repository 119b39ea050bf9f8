use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use notedeck_inspect::args::USAGE;
use notedeck_inspect::{
    classify, render, Args, FetchObserver, FetchOptions, Fetcher, KindNamer, KindNames,
    KindSelection, LivenessSnapshot,
};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Progress goes to stderr so stdout only carries the report.
#[derive(Default)]
struct Progress {
    last_reported: AtomicUsize,
}

const MESSAGES_STEP: usize = 100;

impl FetchObserver for Progress {
    fn on_liveness(&self, liveness: LivenessSnapshot) {
        eprintln!(
            "relays: {}/{} settled ({} connected, {} failed)",
            liveness.settled(),
            liveness.total,
            liveness.connected,
            liveness.failed
        );
    }

    fn on_messages(&self, seen: usize) {
        let bucket = seen / MESSAGES_STEP;
        if bucket > 0 && self.last_reported.fetch_max(bucket, Ordering::AcqRel) < bucket {
            eprintln!("notes: {seen} so far");
        }
    }
}

fn setup_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notedeck_inspect=info,enostr=info"));

    // stdout is reserved for the report
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(env_filter)
            .init();
        return None;
    };

    use tracing_appender::{
        non_blocking,
        rolling::{RollingFileAppender, Rotation},
    };

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        log_dir,
        format!("notedeck-inspect-{}.log", env!("CARGO_PKG_VERSION")),
    );
    let (non_blocking_writer, guard) = non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_writer);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Some(guard)
}

fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("panic: {info}");
        default_hook(info);
    }));
}

async fn run(args: Args) -> notedeck_inspect::Result<()> {
    let names = match &args.kind_names {
        Some(path) => KindNames::load(path)?,
        None => KindNames::default(),
    };
    let namer = KindNamer::new(names);

    let mut options = FetchOptions::default();
    if let Some(timeout) = args.timeout {
        options.timeout = timeout;
    }

    let fetcher = Fetcher::default().options(options);
    let outcome = fetcher
        .fetch(&args.request(), Arc::new(Progress::default()))
        .await?;

    let learned = namer.cache().learn_from_handlers(&outcome.notes);
    if learned > 0 {
        info!("learned {learned} kind names from handler notes");
    }

    let classified = classify(&outcome.notes);
    let selection = KindSelection::from(args.kind);

    let report = if args.json {
        render::json(&classified, outcome.liveness, selection, &namer)?
    } else {
        render::text(&classified, outcome.liveness, selection, &namer)
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(report.as_bytes())?;
    if !report.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let (args, unrecognized) = Args::parse(&raw);

    let _guard = setup_logging(args.log_dir.as_deref());
    setup_panic_hook();

    if args.help {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    for arg in &unrecognized {
        warn!("ignoring unrecognized argument '{arg}'");
    }

    if !args.invalid.is_empty() {
        for problem in &args.invalid {
            error!("{problem}");
        }
        eprint!("{USAGE}");
        return ExitCode::from(2);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
