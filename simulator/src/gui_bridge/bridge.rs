use crate::gui_bridge::model::{RunHistory, StatusModel};
use crate::workflow::config::RunFile;
use crate::workflow::runner::Runner;
use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    thread::{self, JoinHandle},
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

/// HTTP front end for starting, canceling and observing runs.
///
/// `POST /run` takes a JSON [`RunFile`] and starts it in the background,
/// `POST /cancel` stops the live run and `GET /status` returns a
/// [`StatusModel`].
pub struct ControlBridge {
    runner: Runner,
    history: Arc<RwLock<RunHistory>>,
}

impl ControlBridge {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            history: Arc::new(RwLock::new(RunHistory::default())),
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let runner = self.runner.clone();
        let history = self.history.clone();
        let runner_filter = warp::any().map(move || runner.clone());
        let history_filter = warp::any().map(move || history.clone());

        let status_route = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter.clone())
            .and(history_filter.clone())
            .map(|runner: Runner, history: Arc<RwLock<RunHistory>>| {
                let history = history.read().unwrap_or_else(PoisonError::into_inner);
                warp::reply::json(&StatusModel::capture(&runner, &history))
            });

        let run_route = warp::path("run")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::json())
            .and(runner_filter.clone())
            .and(history_filter)
            .map(
                |file: RunFile, runner: Runner, history: Arc<RwLock<RunHistory>>| {
                    if let Err(err) = file.to_run_config() {
                        warn!("bridge rejected run: {:#}", err);
                        return warp::reply::with_status(
                            warp::reply::json(&json!({
                                "status": "rejected",
                                "error": format!("{:#}", err)
                            })),
                            StatusCode::BAD_REQUEST,
                        );
                    }
                    match spawn_run(runner, history, file) {
                        Ok(()) => warp::reply::with_status(
                            warp::reply::json(&json!({"status": "started"})),
                            StatusCode::ACCEPTED,
                        ),
                        Err(err) => warp::reply::with_status(
                            warp::reply::json(&json!({
                                "status": "error",
                                "error": format!("{:#}", err)
                            })),
                            StatusCode::INTERNAL_SERVER_ERROR,
                        ),
                    }
                },
            );

        let cancel_route = warp::path("cancel")
            .and(warp::path::end())
            .and(warp::post())
            .and(runner_filter)
            .map(|runner: Runner| {
                runner.cancel();
                warp::reply::json(&json!({"status": "canceling", "state": runner.state()}))
            });

        status_route.or(run_route).or(cancel_route)
    }

    /// Serves [`routes`](Self::routes) on `addr` from a dedicated thread.
    pub fn serve(&self, addr: SocketAddr) -> Result<JoinHandle<()>> {
        let routes = self.routes();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building bridge runtime")?;
        let handle = thread::Builder::new()
            .name("control-bridge".into())
            .spawn(move || {
                runtime.block_on(async move {
                    warp::serve(routes).run(addr).await;
                });
            })
            .context("spawning bridge thread")?;
        info!("control bridge listening on http://{}", addr);
        Ok(handle)
    }

    pub fn publish_status(&self, message: &str) {
        println!("[bridge] {}", message);
    }

    pub fn snapshot(&self) -> StatusModel {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        StatusModel::capture(&self.runner, &history)
    }
}

/// Runs `file` on its own thread; the engine cancels whatever was live.
fn spawn_run(runner: Runner, history: Arc<RwLock<RunHistory>>, file: RunFile) -> Result<()> {
    thread::Builder::new()
        .name("bridge-run".into())
        .spawn(move || {
            let result = runner.execute(&file);
            let mut history = history.write().unwrap_or_else(PoisonError::into_inner);
            match result {
                Ok(report) => history.record_report(&report),
                Err(err) => {
                    warn!("bridge run failed: {:#}", err);
                    history.record_error(&err);
                }
            }
        })
        .context("spawning run thread")?;
    Ok(())
}
