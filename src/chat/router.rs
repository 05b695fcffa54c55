use crate::{
    messages::{store, Target},
    session::CurrentUser,
    AppState,
};

use super::{
    channels::SessionId,
    events::{ClientEvent, ServerEvent},
};

/// Handle one inbound protocol event for a connected session.
///
/// Persistence happens before any fan-out, so subscribers see messages in
/// the order they were stored. A store failure drops the event with a
/// warning; the origin session is not told.
pub async fn dispatch(state: &AppState, session_id: SessionId, user: &CurrentUser, event: ClientEvent) {
    match event {
        ClientEvent::JoinRoom { room_id } => {
            // membership is not consulted: any authenticated session may
            // subscribe to any channel key
            state.channels.subscribe(session_id, room_id).await;
            tracing::debug!(user = %user.username, %room_id, "joined room channel");
        }

        ClientEvent::GroupMessage { room_id, message } => {
            match store::append(&state.db_pool, user.id, Target::Room(room_id), &message).await {
                Ok(stored) => {
                    // the sender is subscribed too and receives its own copy
                    state
                        .channels
                        .broadcast(room_id, ServerEvent::NewGroupMessage { message: stored }, None)
                        .await;
                }
                Err(err) => {
                    tracing::warn!(user = %user.username, %room_id, error = %err, "dropping group message");
                }
            }
        }

        ClientEvent::PrivateMessage { to, message } => {
            match store::append(&state.db_pool, user.id, Target::Direct(to), &message).await {
                Ok(stored) => {
                    // recipient's personal channel only: the sender renders
                    // its own copy locally and gets no echo
                    let event = ServerEvent::NewPrivateMessage {
                        from: stored.sender,
                        to,
                        message: stored.content,
                        timestamp: stored.created_at,
                    };
                    state.channels.broadcast(to, event, Some(session_id)).await;
                }
                Err(err) => {
                    tracing::warn!(user = %user.username, %to, error = %err, "dropping private message");
                }
            }
        }

        ClientEvent::Typing { room, is_typing } => {
            state.typing.set(user.id, is_typing).await;
            let event = ServerEvent::Typing { user: user.username.clone(), is_typing };
            state.channels.broadcast(room, event, Some(session_id)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::testutil::{insert_user, test_pool};

    async fn connect(state: &AppState, user_id: Uuid) -> (SessionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let session_id = Uuid::now_v7();
        let (tx, rx) = mpsc::unbounded_channel();
        state.channels.register(session_id, tx).await;
        state.channels.subscribe(session_id, user_id).await;
        (session_id, rx)
    }

    fn current(id: Uuid, username: &str) -> CurrentUser {
        CurrentUser { id, username: username.into() }
    }

    #[tokio::test]
    async fn group_messages_echo_to_every_subscriber() {
        let state = AppState::new(test_pool().await);
        let alice = insert_user(&state.db_pool, "alice").await;
        let bob = insert_user(&state.db_pool, "bob").await;
        let room_id = Uuid::now_v7();

        let (alice_session, mut alice_rx) = connect(&state, alice).await;
        let (bob_session, mut bob_rx) = connect(&state, bob).await;
        dispatch(&state, alice_session, &current(alice, "alice"), ClientEvent::JoinRoom { room_id }).await;
        dispatch(&state, bob_session, &current(bob, "bob"), ClientEvent::JoinRoom { room_id }).await;

        dispatch(
            &state,
            alice_session,
            &current(alice, "alice"),
            ClientEvent::GroupMessage { room_id, message: "hi".into() },
        )
        .await;

        for rx in [&mut alice_rx, &mut bob_rx] {
            let Ok(ServerEvent::NewGroupMessage { message }) = rx.try_recv() else {
                panic!("expected newGroupMessage");
            };
            assert_eq!(message.content, "hi");
            assert_eq!(message.sender.id, alice);
            assert_eq!(message.room, Some(room_id));
        }

        let history = store::room_history(&state.db_pool, room_id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hi");
    }

    #[tokio::test]
    async fn private_messages_reach_only_the_recipient() {
        let state = AppState::new(test_pool().await);
        let alice = insert_user(&state.db_pool, "alice").await;
        let bob = insert_user(&state.db_pool, "bob").await;

        let (alice_session, mut alice_rx) = connect(&state, alice).await;
        let (_bob_session, mut bob_rx) = connect(&state, bob).await;

        dispatch(
            &state,
            alice_session,
            &current(alice, "alice"),
            ClientEvent::PrivateMessage { to: bob, message: "hello".into() },
        )
        .await;

        let Ok(ServerEvent::NewPrivateMessage { from, to, message, .. }) = bob_rx.try_recv() else {
            panic!("expected newPrivateMessage");
        };
        assert_eq!(from.id, alice);
        assert_eq!(from.username, "alice");
        assert_eq!(to, bob);
        assert_eq!(message, "hello");

        // no server echo for the sender
        assert!(alice_rx.try_recv().is_err());

        let history = store::direct_history(&state.db_pool, alice, bob, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn typing_relays_to_the_channel_without_the_origin() {
        let state = AppState::new(test_pool().await);
        let alice = insert_user(&state.db_pool, "alice").await;
        let bob = insert_user(&state.db_pool, "bob").await;
        let room_id = Uuid::now_v7();

        let (alice_session, mut alice_rx) = connect(&state, alice).await;
        let (bob_session, mut bob_rx) = connect(&state, bob).await;
        dispatch(&state, alice_session, &current(alice, "alice"), ClientEvent::JoinRoom { room_id }).await;
        dispatch(&state, bob_session, &current(bob, "bob"), ClientEvent::JoinRoom { room_id }).await;

        dispatch(
            &state,
            alice_session,
            &current(alice, "alice"),
            ClientEvent::Typing { room: room_id, is_typing: true },
        )
        .await;

        let Ok(ServerEvent::Typing { user, is_typing }) = bob_rx.try_recv() else {
            panic!("expected typing relay");
        };
        assert_eq!(user, "alice");
        assert!(is_typing);
        assert!(alice_rx.try_recv().is_err());
        assert!(state.typing.is_typing(alice).await);

        dispatch(
            &state,
            alice_session,
            &current(alice, "alice"),
            ClientEvent::Typing { room: room_id, is_typing: false },
        )
        .await;
        assert!(!state.typing.is_typing(alice).await);
    }

    #[tokio::test]
    async fn store_failures_drop_the_event_silently() {
        let state = AppState::new(test_pool().await);
        let alice = insert_user(&state.db_pool, "alice").await;
        let bob = insert_user(&state.db_pool, "bob").await;
        let (alice_session, _alice_rx) = connect(&state, alice).await;
        let (_bob_session, mut bob_rx) = connect(&state, bob).await;

        state.db_pool.close().await;
        dispatch(
            &state,
            alice_session,
            &current(alice, "alice"),
            ClientEvent::PrivateMessage { to: bob, message: "lost".into() },
        )
        .await;

        assert!(bob_rx.try_recv().is_err());
    }
}
