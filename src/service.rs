//! The form broker
//!
//! [`FormService`] correlates submissions with host replies. Each `show`
//! registers a one-shot sender under a fresh [`SubmissionId`] and waits on the
//! receiver; the host answers later through [`FormService::resolve`] or
//! [`FormService::handle_event`]. The entry is removed before its sender
//! fires, so every submission resolves exactly once.
//!
//! A `show` future dropped while the host is still accepting the form takes
//! its entry with it. Once the host has accepted, dropping the future does not
//! withdraw the form: the user still sees it, and the target stays busy until
//! the host replies or the user leaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult, HostError};
use crate::form::FormDescription;
use crate::host::{FormHost, HostEvent, HostReply, Submission, SubmissionId};
use crate::outcome::{CancelationReason, RejectionReason};
use crate::target::{FormTarget, TargetId};

type PendingMap = HashMap<SubmissionId, Pending>;

struct Pending {
    target: TargetId,
    reply: oneshot::Sender<HostReply>,
}

struct Inner {
    host: Arc<dyn FormHost>,
    // Never held across an await
    pending: Mutex<PendingMap>,
    shutting_down: AtomicBool,
    host_closed: AtomicBool,
    reject_busy_targets: bool,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, PendingMap> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a submission that never reached the host
struct PresentGuard<'a> {
    inner: &'a Inner,
    id: SubmissionId,
    armed: bool,
}

impl PresentGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PresentGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.inner.pending().remove(&self.id).is_some() {
            tracing::debug!(id = %self.id, "form withdrawn before the host accepted it");
        }
    }
}

/// Broker between form builders and a [`FormHost`]
///
/// Cheap to clone; clones share the same pending submissions.
#[derive(Clone)]
pub struct FormService {
    inner: Arc<Inner>,
}

impl FormService {
    pub fn new(host: Arc<dyn FormHost>) -> Self {
        Self::with_config(host, &BrokerConfig::default())
    }

    pub fn with_config(host: Arc<dyn FormHost>, config: &BrokerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                pending: Mutex::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
                host_closed: AtomicBool::new(false),
                reject_busy_targets: config.reject_busy_targets(),
            }),
        }
    }

    /// Handle for showing forms to the user `id`
    pub fn target(&self, id: impl Into<TargetId>) -> FormTarget {
        FormTarget::new(id.into(), self.clone())
    }

    /// Number of submissions still waiting for the host
    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    pub fn is_host_closed(&self) -> bool {
        self.inner.host_closed.load(Ordering::SeqCst)
    }

    /// Present `form` to `target` and wait for the raw reply
    pub(crate) async fn submit(
        &self,
        target: &TargetId,
        form: FormDescription,
    ) -> BrokerResult<HostReply> {
        let submission = Submission {
            id: SubmissionId::new(),
            target: target.clone(),
            submitted_at: Utc::now(),
            form,
        };
        let id = submission.id;
        let (reply_tx, reply_rx) = oneshot::channel();

        {
            let mut pending = self.inner.pending();
            if self.is_shut_down() {
                tracing::debug!(user = %target, "form submitted during shutdown");
                return Ok(HostReply::rejected(RejectionReason::ServerShutdown));
            }
            if self.is_host_closed() {
                tracing::debug!(user = %target, "form submitted after host closed");
                return Err(BrokerError::HostUnavailable("host closed".to_string()));
            }
            if self.inner.reject_busy_targets && pending.values().any(|p| &p.target == target) {
                tracing::info!(user = %target, "target already has an open form");
                return Ok(HostReply::canceled(CancelationReason::UserBusy));
            }
            pending.insert(
                id,
                Pending {
                    target: target.clone(),
                    reply: reply_tx,
                },
            );
        }

        tracing::info!(%id, user = %target, "form submitted");

        let mut guard = PresentGuard {
            inner: &self.inner,
            id,
            armed: true,
        };
        let presented = self.inner.host.present(&submission).await;
        guard.disarm();

        if let Err(error) = presented {
            tracing::warn!(%id, user = %target, "host refused form: {}", error);
            // A reply may have raced in before the error; it wins.
            if self.inner.pending().remove(&id).is_some() {
                return match error {
                    HostError::TargetGone(_) => Ok(HostReply::rejected(RejectionReason::PlayerQuit)),
                    HostError::Malformed(_) => {
                        Ok(HostReply::rejected(RejectionReason::MalformedResponse))
                    }
                    HostError::Unavailable(message) => Err(BrokerError::HostUnavailable(message)),
                };
            }
        }

        reply_rx
            .await
            .map_err(|_| BrokerError::HostUnavailable("host closed before replying".to_string()))
    }

    /// Deliver the host's reply for submission `id`
    ///
    /// Fails with [`BrokerError::UnknownSubmission`] if `id` was never issued
    /// or has already resolved.
    pub async fn resolve(&self, id: SubmissionId, reply: HostReply) -> BrokerResult<()> {
        let entry = self.inner.pending().remove(&id);
        let Some(entry) = entry else {
            return Err(BrokerError::UnknownSubmission(id));
        };
        tracing::info!(%id, user = %entry.target, ?reply, "form resolved");
        if entry.reply.send(reply).is_err() {
            tracing::debug!(%id, "caller stopped waiting for form");
        }
        Ok(())
    }

    /// Reject every pending form of `target` with `PlayerQuit`
    ///
    /// Returns how many forms were rejected.
    pub async fn disconnect(&self, target: &TargetId) -> usize {
        let ids: Vec<SubmissionId> = self
            .inner
            .pending()
            .iter()
            .filter(|(_, p)| &p.target == target)
            .map(|(id, _)| *id)
            .collect();
        let mut rejected = 0;
        for id in ids {
            if self
                .resolve(id, HostReply::rejected(RejectionReason::PlayerQuit))
                .await
                .is_ok()
            {
                rejected += 1;
            }
        }
        tracing::info!(user = %target, rejected, "target disconnected");
        rejected
    }

    /// Reject all pending forms with `ServerShutdown` and refuse new ones
    pub async fn shutdown(&self) {
        let drained: Vec<(SubmissionId, Pending)> = {
            let mut pending = self.inner.pending();
            self.inner.shutting_down.store(true, Ordering::SeqCst);
            pending.drain().collect()
        };
        tracing::info!(pending = drained.len(), "form service shutting down");
        for (id, entry) in drained {
            let reply = HostReply::rejected(RejectionReason::ServerShutdown);
            if entry.reply.send(reply).is_err() {
                tracing::debug!(%id, "caller stopped waiting for form");
            }
        }
    }

    /// Forget all pending forms and refuse new ones
    ///
    /// Waiting and later callers fail with `HostUnavailable`.
    pub async fn host_closed(&self) {
        let dropped = {
            let mut pending = self.inner.pending();
            self.inner.host_closed.store(true, Ordering::SeqCst);
            let count = pending.len();
            pending.clear();
            count
        };
        if dropped > 0 {
            tracing::warn!(dropped, "form host closed with forms still open");
        }
    }

    /// Apply one event from the host
    pub async fn handle_event(&self, event: HostEvent) {
        match event {
            HostEvent::Reply { id, reply } => {
                if let Err(error) = self.resolve(id, reply).await {
                    tracing::warn!("ignoring host reply: {}", error);
                }
            }
            HostEvent::TargetLeft { target } => {
                self.disconnect(&target).await;
            }
            HostEvent::Shutdown => self.shutdown().await,
        }
    }

    /// Feed host events into the broker until the stream ends
    pub fn spawn_event_pump(&self, mut events: mpsc::UnboundedReceiver<HostEvent>) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                service.handle_event(event).await;
            }
            service.host_closed().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{ActionForm, MessageForm, ModalForm};
    use crate::host::{ChannelHost, MockFormHost};
    use crate::outcome::{FormOutcome, FormValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready};

    fn channel_service() -> (FormService, mpsc::UnboundedReceiver<Submission>) {
        let (host, rx) = ChannelHost::new();
        (FormService::new(Arc::new(host)), rx)
    }

    /// Host that never finishes accepting a form
    struct StalledHost;

    #[async_trait::async_trait]
    impl FormHost for StalledHost {
        async fn present(&self, _submission: &Submission) -> Result<(), HostError> {
            std::future::pending().await
        }
    }

    fn months() -> ActionForm {
        ActionForm::new()
            .title("Months")
            .body("Choose your favorite month!")
            .button("January", None)
            .button("February", None)
            .button("March", None)
            .button("April", None)
            .button("May", None)
    }

    mod scenarios {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_user_picks_fourth_month() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let shown = tokio::spawn(async move { months().show(&target).await });

            let submission = submissions.recv().await.unwrap();
            assert_eq!(submission.target, TargetId::from("steve"));
            service
                .resolve(submission.id, HostReply::selected(3))
                .await
                .unwrap();

            let outcome = shown.await.unwrap().unwrap();
            assert_eq!(outcome, FormOutcome::Completed(3));
            assert_eq!(outcome.selection(), Some(3));
        }

        #[tokio::test]
        async fn test_user_closes_message_form() {
            let (service, mut submissions) = channel_service();
            let target = service.target("alex");
            let form = MessageForm::new().button1("Yes").button2("No");

            let shown = tokio::spawn(async move { form.show(&target).await });

            let submission = submissions.recv().await.unwrap();
            service
                .resolve(
                    submission.id,
                    HostReply::canceled(CancelationReason::UserClosed),
                )
                .await
                .unwrap();

            let outcome = shown.await.unwrap().unwrap();
            assert!(outcome.canceled());
            assert_eq!(outcome.cancelation_reason(), Some(CancelationReason::UserClosed));
            assert_eq!(outcome.selection(), None);
        }

        #[tokio::test]
        async fn test_modal_submitted_unchanged() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");
            let form = ModalForm::new()
                .toggle("Enabled", Some(true))
                .slider("Level", 0.0, 10.0, 1.0, Some(5.0));

            let shown = tokio::spawn(async move { form.show(&target).await });

            let submission = submissions.recv().await.unwrap();
            service
                .resolve(submission.id, HostReply::values(vec![json!(true), json!(5)]))
                .await
                .unwrap();

            let outcome = shown.await.unwrap().unwrap();
            assert_eq!(
                outcome.form_values(),
                Some(&[FormValue::Bool(true), FormValue::Number(5.0)][..])
            );
        }

        #[tokio::test]
        async fn test_target_disconnects_before_reply() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let shown = tokio::spawn(async move { months().show(&target).await });

            submissions.recv().await.unwrap();
            assert_eq!(service.disconnect(&TargetId::from("steve")).await, 1);

            let outcome = shown.await.unwrap().unwrap();
            assert_eq!(outcome.rejection_reason(), Some(RejectionReason::PlayerQuit));
            assert_eq!(service.pending_count(), 0);
        }
    }

    mod resolution {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_show_stays_pending_until_host_replies() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");
            let form = months();

            let mut shown = tokio_test::task::spawn(form.show(&target));
            assert_pending!(shown.poll());

            let submission = submissions.try_recv().unwrap();
            assert_eq!(service.pending_count(), 1);
            service
                .resolve(submission.id, HostReply::selected(0))
                .await
                .unwrap();

            assert!(shown.is_woken());
            let outcome = assert_ready!(shown.poll()).unwrap();
            assert_eq!(outcome.selection(), Some(0));
        }

        #[tokio::test]
        async fn test_second_reply_is_unknown() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let shown = tokio::spawn(async move { months().show(&target).await });
            let submission = submissions.recv().await.unwrap();

            service
                .resolve(submission.id, HostReply::selected(1))
                .await
                .unwrap();
            let duplicate = service
                .resolve(submission.id, HostReply::selected(2))
                .await;
            assert!(matches!(duplicate, Err(BrokerError::UnknownSubmission(id)) if id == submission.id));

            assert_eq!(shown.await.unwrap().unwrap().selection(), Some(1));
        }

        #[tokio::test]
        async fn test_resolve_unknown_id_fails() {
            let (service, _submissions) = channel_service();
            let result = service
                .resolve(SubmissionId::new(), HostReply::selected(0))
                .await;
            assert!(matches!(result, Err(BrokerError::UnknownSubmission(_))));
        }

        #[tokio::test]
        async fn test_resubmission_is_independent() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");
            let form = MessageForm::new().button1("Yes").button2("No");

            let first_form = form.clone();
            let first_target = target.clone();
            let first = tokio::spawn(async move { first_form.show(&first_target).await });
            let first_submission = submissions.recv().await.unwrap();
            service
                .resolve(first_submission.id, HostReply::selected(0))
                .await
                .unwrap();
            assert_eq!(first.await.unwrap().unwrap().selection(), Some(0));

            let second = tokio::spawn(async move { form.show(&target).await });
            let second_submission = submissions.recv().await.unwrap();
            assert_ne!(first_submission.id, second_submission.id);
            assert_eq!(first_submission.form, second_submission.form);
            service
                .resolve(second_submission.id, HostReply::selected(1))
                .await
                .unwrap();
            assert_eq!(second.await.unwrap().unwrap().selection(), Some(1));
        }

        #[tokio::test]
        async fn test_targets_resolve_out_of_order() {
            let (service, mut submissions) = channel_service();
            let steve = service.target("steve");
            let alex = service.target("alex");

            let first = tokio::spawn(async move { months().show(&steve).await });
            let first_submission = submissions.recv().await.unwrap();
            let second = tokio::spawn(async move { months().show(&alex).await });
            let second_submission = submissions.recv().await.unwrap();

            service
                .resolve(second_submission.id, HostReply::selected(4))
                .await
                .unwrap();
            assert_eq!(second.await.unwrap().unwrap().selection(), Some(4));

            service
                .resolve(first_submission.id, HostReply::selected(2))
                .await
                .unwrap();
            assert_eq!(first.await.unwrap().unwrap().selection(), Some(2));
        }

        #[tokio::test]
        async fn test_malformed_completion_is_rejected() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let shown = tokio::spawn(async move { months().show(&target).await });
            let submission = submissions.recv().await.unwrap();
            service
                .resolve(submission.id, HostReply::selected(5))
                .await
                .unwrap();

            let outcome = shown.await.unwrap().unwrap();
            assert_eq!(outcome.rejection_reason(), Some(RejectionReason::MalformedResponse));
        }
    }

    mod busy {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_second_form_to_same_target_is_busy() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let first_target = target.clone();
            let first = tokio::spawn(async move { months().show(&first_target).await });
            let submission = submissions.recv().await.unwrap();

            let second = MessageForm::new().button1("Yes").button2("No").show(&target).await;
            assert_eq!(
                second.unwrap().cancelation_reason(),
                Some(CancelationReason::UserBusy)
            );
            assert!(submissions.try_recv().is_err());

            service
                .resolve(submission.id, HostReply::selected(0))
                .await
                .unwrap();
            assert_eq!(first.await.unwrap().unwrap().selection(), Some(0));
        }

        #[tokio::test]
        async fn test_busy_detection_can_be_disabled() {
            let (host, mut submissions) = ChannelHost::new();
            let config = BrokerConfig {
                reject_busy_targets: Some(false),
                ..Default::default()
            };
            let service = FormService::with_config(Arc::new(host), &config);
            let target = service.target("steve");

            let first_target = target.clone();
            let _first = tokio::spawn(async move { months().show(&first_target).await });
            submissions.recv().await.unwrap();
            let _second = tokio::spawn(async move { months().show(&target).await });
            submissions.recv().await.unwrap();

            assert_eq!(service.pending_count(), 2);
        }
    }

    mod lifecycle {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_shutdown_rejects_pending_and_new_forms() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let pending_target = target.clone();
            let pending = tokio::spawn(async move { months().show(&pending_target).await });
            submissions.recv().await.unwrap();

            service.shutdown().await;
            assert!(service.is_shut_down());
            assert_eq!(
                pending.await.unwrap().unwrap().rejection_reason(),
                Some(RejectionReason::ServerShutdown)
            );

            let late = months().show(&target).await.unwrap();
            assert_eq!(late.rejection_reason(), Some(RejectionReason::ServerShutdown));
            assert!(submissions.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_closed_host_fails_pending_calls() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");

            let shown = tokio::spawn(async move { months().show(&target).await });
            submissions.recv().await.unwrap();
            service.host_closed().await;

            let result = shown.await.unwrap();
            assert!(matches!(result, Err(BrokerError::HostUnavailable(_))));
        }

        #[tokio::test]
        async fn test_event_pump_applies_events() {
            let (service, mut submissions) = channel_service();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let pump = service.spawn_event_pump(event_rx);

            let steve = service.target("steve");
            let alex = service.target("alex");
            let picked = tokio::spawn(async move { months().show(&steve).await });
            let steve_submission = submissions.recv().await.unwrap();
            let left = tokio::spawn(async move { months().show(&alex).await });
            submissions.recv().await.unwrap();

            event_tx
                .send(HostEvent::Reply {
                    id: steve_submission.id,
                    reply: HostReply::selected(3),
                })
                .unwrap();
            event_tx
                .send(HostEvent::TargetLeft {
                    target: TargetId::from("alex"),
                })
                .unwrap();

            assert_eq!(picked.await.unwrap().unwrap().selection(), Some(3));
            assert_eq!(
                left.await.unwrap().unwrap().rejection_reason(),
                Some(RejectionReason::PlayerQuit)
            );

            drop(event_tx);
            pump.await.unwrap();
        }

        #[tokio::test]
        async fn test_event_pump_end_fails_pending_calls() {
            let (service, mut submissions) = channel_service();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let pump = service.spawn_event_pump(event_rx);

            let target = service.target("steve");
            let shown = tokio::spawn(async move { months().show(&target).await });
            submissions.recv().await.unwrap();

            drop(event_tx);
            pump.await.unwrap();
            assert!(matches!(
                shown.await.unwrap(),
                Err(BrokerError::HostUnavailable(_))
            ));
        }
    }

    mod withdrawal {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_show_dropped_before_host_accepts_frees_target() {
            let service = FormService::new(Arc::new(StalledHost));
            let target = service.target("steve");
            let form = months();

            let mut shown = tokio_test::task::spawn(form.show(&target));
            assert_pending!(shown.poll());
            assert_eq!(service.pending_count(), 1);
            drop(shown);
            assert_eq!(service.pending_count(), 0);

            let mut again = tokio_test::task::spawn(form.show(&target));
            assert_pending!(again.poll());
            assert_eq!(service.pending_count(), 1);
        }

        #[tokio::test]
        async fn test_show_dropped_after_host_accepts_keeps_target_busy() {
            let (service, mut submissions) = channel_service();
            let target = service.target("steve");
            let form = months();

            let mut shown = tokio_test::task::spawn(form.show(&target));
            assert_pending!(shown.poll());
            let submission = submissions.try_recv().unwrap();
            drop(shown);
            assert_eq!(service.pending_count(), 1);

            let busy = form.show(&target).await.unwrap();
            assert_eq!(busy.cancelation_reason(), Some(CancelationReason::UserBusy));

            service
                .resolve(submission.id, HostReply::selected(0))
                .await
                .unwrap();
            assert_eq!(service.pending_count(), 0);
        }

        #[tokio::test]
        async fn test_show_after_event_pump_ends_is_unavailable() {
            let (service, mut submissions) = channel_service();
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let pump = service.spawn_event_pump(event_rx);

            drop(event_tx);
            pump.await.unwrap();
            assert!(service.is_host_closed());

            let result = months().show(&service.target("steve")).await;
            assert!(matches!(result, Err(BrokerError::HostUnavailable(_))));
            assert_eq!(service.pending_count(), 0);
            assert!(submissions.try_recv().is_err());
        }
    }

    mod host_errors {
        use super::*;
        use pretty_assertions::assert_eq;

        fn mock_service(error: HostError) -> FormService {
            let mut host = MockFormHost::new();
            host.expect_present()
                .times(1)
                .returning(move |_| Err(error.clone()));
            FormService::new(Arc::new(host))
        }

        #[tokio::test]
        async fn test_target_gone_is_player_quit() {
            let service = mock_service(HostError::TargetGone(TargetId::from("steve")));
            let outcome = months().show(&service.target("steve")).await.unwrap();
            assert_eq!(outcome.rejection_reason(), Some(RejectionReason::PlayerQuit));
            assert_eq!(service.pending_count(), 0);
        }

        #[tokio::test]
        async fn test_malformed_is_malformed_response() {
            let service = mock_service(HostError::Malformed("title too long".to_string()));
            let outcome = ModalForm::new()
                .toggle("On", None)
                .show(&service.target("steve"))
                .await
                .unwrap();
            assert_eq!(outcome.rejection_reason(), Some(RejectionReason::MalformedResponse));
        }

        #[tokio::test]
        async fn test_unavailable_is_an_error() {
            let service = mock_service(HostError::Unavailable("pipe closed".to_string()));
            let result = months().show(&service.target("steve")).await;
            assert!(matches!(result, Err(BrokerError::HostUnavailable(msg)) if msg == "pipe closed"));
            assert_eq!(service.pending_count(), 0);
        }

        #[tokio::test]
        async fn test_host_receives_submitted_form() {
            let mut host = MockFormHost::new();
            host.expect_present()
                .withf(|submission| {
                    submission.target == TargetId::from("steve")
                        && matches!(&submission.form, FormDescription::Action(data) if data.button_count() == 5)
                })
                .times(1)
                .returning(|_| Err(HostError::TargetGone(TargetId::from("steve"))));
            let service = FormService::new(Arc::new(host));
            let outcome = months().show(&service.target("steve")).await.unwrap();
            assert!(!outcome.canceled());
        }
    }
}
