//! Dashboard controller.
//!
//! Receives commands from the UI thread, runs the network work on the Tokio
//! runtime and reports back as reducer actions. Work still in flight when the
//! dashboard closes is aborted.

use super::actions::{fetch, run_mutation, Mutation, MutationOutcome, Target};
use crate::api::ApiClient;
use crate::lifecycle;
use crate::model::{RelationshipBundle, SupervisionRelationship, SupervisionRequest, ViewerRole};
use crate::store::StoreAction;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Commands emitted by the UI.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Load(Target),
    Mutate(Mutation),
    Quit,
}

/// Updates sent back to the UI, one reducer per entity.
#[derive(Debug)]
pub(crate) enum UiEvent {
    Requests(StoreAction<Vec<SupervisionRequest>>),
    Relationships(StoreAction<Vec<SupervisionRelationship>>),
    Bundle(u64, StoreAction<RelationshipBundle>),
    MutationFinished(MutationOutcome),
}

async fn load(client: &ApiClient, target: Target, event_tx: &UnboundedSender<UiEvent>) {
    match target {
        Target::Requests | Target::Request(_) => {
            let _ = event_tx.send(UiEvent::Requests(StoreAction::FetchStarted));
            let action = match fetch("load requests", client.list_requests()).await {
                Ok(mut list) => {
                    lifecycle::sort_for_display(&mut list);
                    StoreAction::FetchSucceeded(list)
                }
                Err(msg) => StoreAction::FetchFailed(msg),
            };
            let _ = event_tx.send(UiEvent::Requests(action));
        }
        Target::Relationships => {
            let _ = event_tx.send(UiEvent::Relationships(StoreAction::FetchStarted));
            let action = match fetch("load relationships", client.list_relationships()).await {
                Ok(list) => StoreAction::FetchSucceeded(list),
                Err(msg) => StoreAction::FetchFailed(msg),
            };
            let _ = event_tx.send(UiEvent::Relationships(action));
        }
        Target::Relationship(id) => {
            let _ = event_tx.send(UiEvent::Bundle(id, StoreAction::FetchStarted));
            let loaded = fetch("load relationship", client.load_relationship_bundle(id)).await;
            let action = match loaded {
                Ok(bundle) => StoreAction::FetchSucceeded(bundle),
                Err(msg) => StoreAction::FetchFailed(msg),
            };
            let _ = event_tx.send(UiEvent::Bundle(id, action));
        }
    }
}

pub(crate) async fn run_controller(
    client: ApiClient,
    role: ViewerRole,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) {
    let mut tasks: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Load(target)) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tasks.spawn(async move { load(&client, target, &tx).await });
                    }
                    Some(UiCommand::Mutate(m)) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tasks.spawn(async move {
                            let outcome = run_mutation(&client, role, &m).await;
                            let refetch = outcome.succeeded().then_some(outcome.target);
                            let _ = tx.send(UiEvent::MutationFinished(outcome));
                            // The view only ever shows what the server returns next.
                            if let Some(target) = refetch {
                                load(&client, target, &tx).await;
                            }
                        });
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(error = %e, "dashboard task panicked");
                    }
                }
            }
        }
    }

    if !tasks.is_empty() {
        tracing::debug!(in_flight = tasks.len(), "aborting in-flight requests");
    }
    tasks.abort_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&Settings {
            base_url: server.uri(),
            token: None,
            role: ViewerRole::Supervisor,
            user_id: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn successful_mutation_triggers_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/supervision/requests/1/accept"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/supervision/requests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 2, "status": "cancelled" },
                    { "id": 1, "status": "accepted" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_controller(
            client(&server),
            ViewerRole::Supervisor,
            event_tx,
            cmd_rx,
        ));

        cmd_tx.send(UiCommand::Mutate(Mutation::Accept { request: 1 })).unwrap();

        match event_rx.recv().await.unwrap() {
            UiEvent::MutationFinished(outcome) => assert!(outcome.succeeded()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            event_rx.recv().await.unwrap(),
            UiEvent::Requests(StoreAction::FetchStarted)
        ));
        match event_rx.recv().await.unwrap() {
            UiEvent::Requests(StoreAction::FetchSucceeded(list)) => {
                let ids: Vec<u64> = list.iter().map(|r| r.id).collect();
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("unexpected {other:?}"),
        }

        cmd_tx.send(UiCommand::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failed_mutation_does_not_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/supervision/requests/1/accept"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "message": "Not yours." })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_controller(
            client(&server),
            ViewerRole::Supervisor,
            event_tx,
            cmd_rx,
        ));

        cmd_tx.send(UiCommand::Mutate(Mutation::Accept { request: 1 })).unwrap();
        match event_rx.recv().await.unwrap() {
            UiEvent::MutationFinished(outcome) => {
                assert!(!outcome.succeeded());
                assert_eq!(outcome.toast.message, "Not yours.");
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(cmd_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn quit_aborts_slow_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/supervision/relationships"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [] }))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_controller(
            client(&server),
            ViewerRole::Supervisor,
            event_tx,
            cmd_rx,
        ));

        cmd_tx.send(UiCommand::Load(Target::Relationships)).unwrap();
        assert!(matches!(
            event_rx.recv().await.unwrap(),
            UiEvent::Relationships(StoreAction::FetchStarted)
        ));
        cmd_tx.send(UiCommand::Quit).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("controller should stop promptly")
            .unwrap();
        // The aborted task dropped its sender without reporting a result.
        assert!(event_rx.recv().await.is_none());
    }
}
