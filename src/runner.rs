// src/runner.rs
//
// One tokio task per competition, each with its own tab, all sharing the
// anchor and result stores. Returns once every worker has exited.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::Config;
use crate::core::time::Calendar;
use crate::driver::PageSession;
use crate::engine::{CompetitionWorker, EngineSettings, State};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::store::{AnchorStore, ResultStore};

/// The shared on-disk state.
#[derive(Clone, Debug)]
pub struct Stores {
    pub anchors: Arc<AnchorStore>,
    pub results: Arc<ResultStore>,
}

impl Stores {
    /// Open both stores, creating their directories. Failure here is fatal
    /// for the whole run.
    pub fn open(config: &Config) -> Result<Self> {
        let retry = config.retry_policy();
        Ok(Self {
            anchors: Arc::new(AnchorStore::open(&config.anchor_dir, retry)?),
            results: Arc::new(ResultStore::open(&config.history_dir, config.key_shape, retry)?),
        })
    }
}

/// How one competition's worker ended.
#[derive(Debug)]
pub struct WorkerReport {
    pub competition: String,
    pub final_state: State,
    pub anchor: Option<u32>,
    pub result: Result<()>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<WorkerReport>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &WorkerReport> {
        self.reports.iter().filter(|r| r.result.is_err())
    }

    pub fn report(&self, competition: &str) -> Option<&WorkerReport> {
        self.reports.iter().find(|r| r.competition == competition)
    }
}

/// Cancel `token` on the first Ctrl-C. Host binaries spawn this next to
/// `run`.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    logw!("Could not listen for Ctrl-C: {e}");
                    return;
                }
                logf!("Ctrl-C, stopping workers");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

/// Run every configured competition until `cancel` fires or all workers
/// have stopped on their own.
pub async fn run<S>(
    config: &Config,
    session: Arc<S>,
    stores: &Stores,
    calendar: Arc<dyn Calendar>,
    progress: Arc<dyn Progress>,
    cancel: CancellationToken,
) -> RunSummary
where
    S: PageSession + 'static,
{
    let settings = EngineSettings::from_config(config);
    let mut set = JoinSet::new();

    for competition in &config.competitions {
        let competition = competition.clone();
        let span = tracing::info_span!("competition", name = %competition);
        let session = Arc::clone(&session);
        let settings = settings.clone();
        let stores = stores.clone();
        let calendar = Arc::clone(&calendar);
        let progress = Arc::clone(&progress);
        let cancel = cancel.clone();

        set.spawn(
            async move {
                let driver = match session.open_tab(&competition).await {
                    Ok(d) => d,
                    Err(e) => {
                        loge!("Could not open a tab: {e}");
                        return WorkerReport {
                            competition,
                            final_state: State::Stopped,
                            anchor: None,
                            result: Err(Error::Driver(e)),
                        };
                    }
                };
                let mut worker = CompetitionWorker::new(
                    competition.clone(),
                    driver,
                    settings,
                    stores.anchors,
                    stores.results,
                    calendar,
                )
                .with_progress(progress)
                .with_cancel(cancel);

                worker.run().await;
                WorkerReport {
                    competition,
                    final_state: worker.state(),
                    anchor: worker.anchor(),
                    result: Ok(()),
                }
            }
            .instrument(span),
        );
    }
    logf!("Started {} competition workers", set.len());

    let mut summary = RunSummary::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(report) => summary.reports.push(report),
            Err(e) => loge!("Worker task died: {e}"),
        }
    }
    summary
}
