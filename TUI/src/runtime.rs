// Executes controller effects on a background tokio runtime

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::action::Action;
use crate::backend::Backend;
use crate::controller::Effect;

/// The running poll timer. Dropping the handle stops the timer.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct Runtime {
    rt: tokio::runtime::Runtime,
    backend: Arc<Backend>,
    tx: UnboundedSender<Action>,
    rx: UnboundedReceiver<Action>,
    poller: Option<PollHandle>,
    poll_interval: Duration,
    download_dir: PathBuf,
}

impl Runtime {
    pub fn new(
        backend: Backend,
        poll_interval: Duration,
        download_dir: PathBuf,
    ) -> std::io::Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("redefine-io")
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            rt,
            backend: Arc::new(backend),
            tx,
            rx,
            poller: None,
            poll_interval,
            download_dir,
        })
    }

    #[cfg(test)]
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Collect every action completed since the last call, without blocking.
    pub fn drain(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(action) = self.rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    pub fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Upload { seq, file } => {
                self.spawn(move |backend| async move {
                    let result = backend.upload(&file).await;
                    Action::UploadFinished { seq, result }
                });
            }
            Effect::Generate { seq, request } => {
                self.spawn(move |backend| async move {
                    let result = backend.generate(request).await;
                    Action::GenerateFinished { seq, result }
                });
            }
            Effect::ArmPollTimer => self.arm_poller(),
            Effect::CancelPollTimer => self.cancel_poller(),
            Effect::FetchProgress { task_id } => {
                self.spawn(move |backend| async move {
                    let result = backend.progress(&task_id).await;
                    Action::ProgressReceived { task_id, result }
                });
            }
            Effect::Download { result_ref, file_name } => {
                let dest = self.download_dir.join(file_name);
                self.spawn(move |backend| async move {
                    let result = backend.download(&result_ref, &dest).await.map(|_| dest);
                    Action::DownloadFinished(result)
                });
            }
            Effect::CheckHealth => {
                self.spawn(|backend| async move { Action::HealthChecked(backend.health().await) });
            }
            // Presentation effects never reach the runtime
            Effect::Alert(_) | Effect::Status(_) | Effect::Quit => {
                debug!(?effect, "ignoring presentation effect");
            }
        }
    }

    fn spawn<F, Fut>(&self, job: F)
    where
        F: FnOnce(Arc<Backend>) -> Fut,
        Fut: std::future::Future<Output = Action> + Send + 'static,
    {
        let tx = self.tx.clone();
        let fut = job(Arc::clone(&self.backend));
        self.rt.spawn(async move {
            let action = fut.await;
            if tx.send(action).is_err() {
                warn!("ui loop gone, dropping backend result");
            }
        });
    }

    fn arm_poller(&mut self) {
        // Dropping the old handle aborts it before the new timer starts
        self.poller = None;

        let tx = self.tx.clone();
        let period = self.poll_interval;
        let task = self.rt.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(Action::PollTick).is_err() {
                    break;
                }
            }
        });

        debug!(?period, "poll timer armed");
        self.poller = Some(PollHandle { task });
    }

    fn cancel_poller(&mut self) {
        if self.poller.take().is_some() {
            debug!("poll timer cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime(poll_ms: u64) -> Runtime {
        let backend = Backend::new("http://127.0.0.1:9").unwrap();
        Runtime::new(backend, Duration::from_millis(poll_ms), std::env::temp_dir()).unwrap()
    }

    fn wait_for<F: FnMut(&mut Runtime) -> bool>(rt: &mut Runtime, mut done: F) -> bool {
        for _ in 0..200 {
            if done(rt) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_timer_emits_ticks_until_cancelled() {
        let mut rt = runtime(10);
        rt.execute(Effect::ArmPollTimer);
        assert!(rt.is_polling());

        let mut ticks = 0;
        assert!(wait_for(&mut rt, |rt| {
            ticks += rt.drain().iter().filter(|a| **a == Action::PollTick).count();
            ticks >= 2
        }));

        rt.execute(Effect::CancelPollTimer);
        assert!(!rt.is_polling());
        // Cancelling twice is harmless
        rt.execute(Effect::CancelPollTimer);

        std::thread::sleep(Duration::from_millis(50));
        rt.drain();
        std::thread::sleep(Duration::from_millis(50));
        assert!(rt.drain().is_empty());
    }

    #[test]
    fn test_rearming_keeps_a_single_timer() {
        let mut rt = runtime(20);
        rt.execute(Effect::ArmPollTimer);
        rt.execute(Effect::ArmPollTimer);
        rt.execute(Effect::ArmPollTimer);
        assert!(rt.is_polling());

        // One timer at 20ms yields about five ticks in 110ms; three would yield about fifteen
        std::thread::sleep(Duration::from_millis(110));
        let ticks = rt.drain().len();
        assert!(ticks >= 1 && ticks <= 7, "got {} ticks", ticks);
    }

    #[test]
    fn test_failed_request_comes_back_as_action() {
        let mut rt = runtime(1000);
        rt.execute(Effect::CheckHealth);

        let mut received = Vec::new();
        assert!(wait_for(&mut rt, |rt| {
            received.extend(rt.drain());
            !received.is_empty()
        }));
        assert!(matches!(received[0], Action::HealthChecked(Err(_))));
    }
}
