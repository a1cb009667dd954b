//! Repurposing cycle state machine.
//!
//! `Idle → Loading → {Succeeded | Failed}`, reusable indefinitely. Cycles may
//! overlap; the most recently started one owns the shared state
//! (highest sequence wins). A cycle that resolves after a newer one started
//! still returns its outcome to its own caller, but leaves the shared state
//! alone.
//!
//! A cycle whose future is dropped before it resolves (never awaited,
//! cancelled by `select!` or a timeout) returns the state to `Idle` if it
//! still owns it. The retained result is kept.

use std::{future::Future, sync::Arc};

use tokio::sync::watch;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    backend::GenerationBackend,
    error::{ErrorKind, Result},
    parse::parse_result,
    prompt::build_prompt,
    types::{GenerationRequest, GenerationResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Succeeded(GenerationResult),
    Failed(ErrorKind),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }
}

/// Observable view of a [`Repurposer`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Sequence number of the cycle that owns `state`; 0 before the first.
    pub seq: u64,
    pub state: RequestState,
    /// Last successful result. Survives while a newer cycle is loading and
    /// is replaced (or cleared) only when that cycle resolves.
    pub retained: Option<GenerationResult>,
}

pub struct Repurposer {
    backend: Arc<dyn GenerationBackend>,
    snapshot: watch::Sender<Snapshot>,
}

impl Repurposer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Self { backend, snapshot }
    }

    pub fn state(&self) -> RequestState {
        self.snapshot.borrow().state.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every transition as it is published.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    pub fn retained_result(&self) -> Option<GenerationResult> {
        self.snapshot.borrow().retained.clone()
    }

    /// Drop any held result and return to `Idle`. Cycles still in flight
    /// become stale and will not touch the state when they resolve.
    pub fn discard(&self) {
        self.snapshot.send_modify(|snap| {
            snap.seq += 1;
            snap.state = RequestState::Idle;
            snap.retained = None;
        });
    }

    /// Start a repurposing cycle.
    ///
    /// The state is `Loading` as soon as this returns, before the returned
    /// future is first polled. The network exchange happens when it is
    /// awaited.
    pub fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<GenerationResult>> + '_ {
        let prompt = build_prompt(&request);
        let seq = self.begin();
        let span = info_span!(
            "repurpose",
            seq,
            cycle_id = %Uuid::new_v4(),
            platform = %request.platform
        );

        let guard = CycleGuard {
            snapshot: &self.snapshot,
            seq,
            resolved: false,
        };

        async move {
            let mut guard = guard;
            info!(title = %request.video_title, "Requesting repost kit");

            let outcome = self
                .backend
                .generate(&prompt)
                .await
                .and_then(|text| parse_result(&text));

            match &outcome {
                Ok(result) => info!(
                    captions = result.captions.len(),
                    hashtags = result.hashtags.len(),
                    "Repost kit generated"
                ),
                Err(e) => warn!(kind = ?e.kind(), error = %e, "Generation failed"),
            }

            if !guard.resolve(&outcome) {
                info!("Cycle superseded, outcome not applied");
            }

            outcome
        }
        .instrument(span)
    }

    fn begin(&self) -> u64 {
        let mut seq = 0;
        self.snapshot.send_modify(|snap| {
            snap.seq += 1;
            snap.state = RequestState::Loading;
            seq = snap.seq;
        });
        seq
    }
}

/// Ties the shared state to the lifetime of one cycle's future.
struct CycleGuard<'a> {
    snapshot: &'a watch::Sender<Snapshot>,
    seq: u64,
    resolved: bool,
}

impl CycleGuard<'_> {
    /// Apply `outcome` if this cycle still owns the state.
    fn resolve(&mut self, outcome: &Result<GenerationResult>) -> bool {
        self.resolved = true;
        let seq = self.seq;
        self.snapshot.send_if_modified(|snap| {
            if snap.seq != seq {
                return false;
            }
            match outcome {
                Ok(result) => {
                    snap.state = RequestState::Succeeded(result.clone());
                    snap.retained = Some(result.clone());
                }
                Err(e) => {
                    snap.state = RequestState::Failed(e.kind());
                    snap.retained = None;
                }
            }
            true
        })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let seq = self.seq;
        let abandoned = self.snapshot.send_if_modified(|snap| {
            if snap.seq != seq {
                return false;
            }
            snap.state = RequestState::Idle;
            true
        });
        if abandoned {
            warn!(seq, "Cycle dropped before resolving, state reset to idle");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::{error::GenerationError, prompt::GenerationPrompt};

    const KIT_A: &str =
        r##"{"captions":["a","b","c"],"hashtags":["#x","#y"],"description":"d","analysis":"s"}"##;
    const KIT_B: &str =
        r##"{"captions":["second"],"hashtags":["#z"],"description":"d2","analysis":"s2"}"##;

    /// Answers each call with the next scripted outcome.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, _prompt: &GenerationPrompt) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected backend call")
        }
    }

    /// Blocks each call until the test releases it.
    struct GatedBackend {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<String>>>>,
    }

    impl GatedBackend {
        fn new(calls: usize) -> (Arc<Self>, Vec<oneshot::Sender<Result<String>>>) {
            let (senders, receivers): (Vec<_>, VecDeque<_>) =
                (0..calls).map(|_| oneshot::channel()).unzip();
            let backend = Arc::new(Self {
                gates: Mutex::new(receivers),
            });
            (backend, senders)
        }
    }

    #[async_trait]
    impl GenerationBackend for GatedBackend {
        async fn generate(&self, _prompt: &GenerationPrompt) -> Result<String> {
            let gate = self
                .gates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected backend call");
            gate.await.expect("gate dropped")
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("TikTok Trending Video", "tiktok", "")
    }

    fn kit(text: &str) -> GenerationResult {
        parse_result(text).unwrap()
    }

    #[tokio::test]
    async fn starts_idle() {
        let repurposer = Repurposer::new(ScriptedBackend::new(vec![]));
        assert_eq!(repurposer.snapshot(), Snapshot::default());
    }

    #[tokio::test]
    async fn enters_loading_before_resolving() {
        let repurposer = Repurposer::new(ScriptedBackend::new(vec![Ok(KIT_A.into())]));

        let cycle = repurposer.generate(request());
        assert_eq!(repurposer.state(), RequestState::Loading);

        let result = cycle.await.unwrap();
        assert_eq!(result.captions, vec!["a", "b", "c"]);
        assert_eq!(result.hashtags, vec!["#x", "#y"]);
        assert_eq!(result.description, "d");
        assert_eq!(result.analysis, "s");
        assert_eq!(repurposer.state(), RequestState::Succeeded(result));
    }

    #[tokio::test]
    async fn failures_collapse_into_failed_with_kind() {
        let repurposer = Repurposer::new(ScriptedBackend::new(vec![
            Ok(r#"{"captions":["a"],"description":"d","analysis":"s"}"#.into()),
            Ok("not json at all".into()),
            Err(GenerationError::transport(Some(500), "boom")),
        ]));

        let err = repurposer.generate(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert_eq!(repurposer.state(), RequestState::Failed(ErrorKind::SchemaViolation));

        repurposer.generate(request()).await.unwrap_err();
        assert_eq!(repurposer.state(), RequestState::Failed(ErrorKind::MalformedPayload));

        repurposer.generate(request()).await.unwrap_err();
        assert_eq!(repurposer.state(), RequestState::Failed(ErrorKind::Transport));
    }

    #[tokio::test]
    async fn retained_result_survives_loading_and_clears_on_failure() {
        let (backend, mut gates) = GatedBackend::new(2);
        let repurposer = Repurposer::new(backend);

        gates.remove(0).send(Ok(KIT_A.into())).unwrap();
        repurposer.generate(request()).await.unwrap();
        assert_eq!(repurposer.retained_result(), Some(kit(KIT_A)));

        let cycle = repurposer.generate(request());
        assert!(repurposer.state().is_loading());
        assert_eq!(repurposer.retained_result(), Some(kit(KIT_A)));

        gates
            .remove(0)
            .send(Err(GenerationError::transport(None, "reset")))
            .unwrap();
        cycle.await.unwrap_err();
        assert_eq!(repurposer.state(), RequestState::Failed(ErrorKind::Transport));
        assert_eq!(repurposer.retained_result(), None);
    }

    #[tokio::test]
    async fn newest_cycle_wins_when_older_resolves_last() {
        let (backend, gates) = GatedBackend::new(2);
        let repurposer = Repurposer::new(backend);
        let [first_gate, second_gate]: [_; 2] = gates.try_into().ok().unwrap();

        let first = repurposer.generate(request());
        let second = repurposer.generate(request());

        let (first, second, ()) = tokio::join!(first, second, async {
            second_gate.send(Ok(KIT_B.into())).unwrap();
            tokio::task::yield_now().await;
            first_gate.send(Ok(KIT_A.into())).unwrap();
        });

        // Each caller still sees its own outcome.
        assert_eq!(first.unwrap(), kit(KIT_A));
        assert_eq!(second.unwrap(), kit(KIT_B));

        let snapshot = repurposer.snapshot();
        assert_eq!(snapshot.seq, 2);
        assert_eq!(snapshot.state, RequestState::Succeeded(kit(KIT_B)));
        assert_eq!(snapshot.retained, Some(kit(KIT_B)));
    }

    #[tokio::test]
    async fn stale_resolution_keeps_newer_cycle_loading() {
        let (backend, mut gates) = GatedBackend::new(1);
        let repurposer = Repurposer::new(backend);

        let first = repurposer.generate(request());
        let second = repurposer.generate(request());

        gates.remove(0).send(Ok(KIT_A.into())).unwrap();
        assert_eq!(first.await.unwrap(), kit(KIT_A));

        assert_eq!(repurposer.state(), RequestState::Loading);
        assert_eq!(repurposer.retained_result(), None);

        drop(second);
        assert_eq!(repurposer.state(), RequestState::Idle);
    }

    /// Never answers.
    struct SilentBackend;

    #[async_trait]
    impl GenerationBackend for SilentBackend {
        async fn generate(&self, _prompt: &GenerationPrompt) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn timed_out_cycle_returns_to_idle_and_keeps_retained() {
        let (backend, mut gates) = GatedBackend::new(2);
        let repurposer = Repurposer::new(backend);

        gates.remove(0).send(Ok(KIT_A.into())).unwrap();
        repurposer.generate(request()).await.unwrap();

        let elapsed =
            tokio::time::timeout(Duration::from_millis(20), repurposer.generate(request())).await;
        assert!(elapsed.is_err());

        assert_eq!(repurposer.state(), RequestState::Idle);
        assert_eq!(repurposer.retained_result(), Some(kit(KIT_A)));
    }

    #[tokio::test]
    async fn never_polled_cycle_returns_to_idle() {
        let repurposer = Repurposer::new(Arc::new(SilentBackend));
        let mut rx = repurposer.subscribe();

        let cycle = repurposer.generate(request());
        assert!(rx.borrow_and_update().state.is_loading());

        drop(cycle);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().state, RequestState::Idle);
    }

    #[tokio::test]
    async fn dropped_stale_cycle_leaves_newer_state_alone() {
        let repurposer = Repurposer::new(ScriptedBackend::new(vec![Ok(KIT_B.into())]));

        let first = repurposer.generate(request());
        let result = repurposer.generate(request()).await.unwrap();
        drop(first);

        assert_eq!(repurposer.state(), RequestState::Succeeded(result));
    }

    #[tokio::test]
    async fn discard_returns_to_idle_and_ignores_in_flight_cycle() {
        let (backend, mut gates) = GatedBackend::new(1);
        let repurposer = Repurposer::new(backend);

        let cycle = repurposer.generate(request());
        repurposer.discard();
        assert_eq!(repurposer.state(), RequestState::Idle);

        gates.remove(0).send(Ok(KIT_A.into())).unwrap();
        assert_eq!(cycle.await.unwrap(), kit(KIT_A));
        assert_eq!(repurposer.state(), RequestState::Idle);
        assert_eq!(repurposer.retained_result(), None);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let repurposer = Repurposer::new(ScriptedBackend::new(vec![Ok(KIT_A.into())]));
        let mut rx = repurposer.subscribe();

        let cycle = repurposer.generate(request());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().state.is_loading());

        cycle.await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().state, RequestState::Succeeded(kit(KIT_A)));
    }
}
