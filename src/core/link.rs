//! Broker link: MQTT-over-websocket connection manager.
//!
//! Runs as a single async task driving the rumqttc event loop. Inbound
//! retained messages on the flow-name namespace are routed to the UI as
//! [`LinkEvent`]s; UI commands turn into retained publishes. Connection loss
//! triggers bounded exponential backoff instead of the hot reconnect loop a
//! naive client would run; once attempts are exhausted the link idles until
//! the user asks for a retry. A shutdown command disconnects cleanly and
//! never reconnects.

use std::time::Duration;

use flume::{Receiver, Sender};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, Publish, QoS, Transport};

use crate::core::{
    bus::{LinkCommand, LinkEvent},
    config::BrokerConfig,
    flows::{
        create_flow_message, delete_flow_message, flow_id, flow_name_topic, parse_flow_topic,
        FlowPublish, FLOW_NAME_FILTER,
    },
};

const RECONNECT_BASE: Duration = Duration::from_millis(500);
const RECONNECT_CAP: Duration = Duration::from_secs(30);
const RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Delay before reconnect attempt number `attempt` (1-based): exponential
/// from the base delay, capped.
fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    RECONNECT_BASE
        .saturating_mul(1u32 << shift)
        .min(RECONNECT_CAP)
}

/// Drive the broker link until shutdown. Returns when a `Shutdown` command
/// arrives or the UI side of the command channel is dropped.
pub async fn run(
    cfg: BrokerConfig,
    cmd_rx: Receiver<LinkCommand>,
    event_tx: Sender<LinkEvent>,
) -> anyhow::Result<()> {
    let url = cfg.websocket_url();
    log::info!("Broker link starting, endpoint {url}");

    'session: loop {
        let mut options = MqttOptions::new(&cfg.client_id, &url, cfg.port);
        options.set_transport(Transport::Ws);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                polled = eventloop.poll() => match polled {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        attempts = 0;
                        log::info!("mqtt connected");
                        if let Err(err) = client.subscribe(FLOW_NAME_FILTER, QoS::AtLeastOnce).await {
                            log::error!("Failed to subscribe to {FLOW_NAME_FILTER}: {err}");
                        }
                        let _ = event_tx.send(LinkEvent::Connected);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        route_publish(&publish, &event_tx);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        attempts += 1;
                        let reason = err.to_string();
                        log::warn!(
                            "mqtt connection lost: {reason} (attempt {attempts}/{RECONNECT_MAX_ATTEMPTS})"
                        );
                        let _ = event_tx.send(LinkEvent::Disconnected { reason });

                        if attempts >= RECONNECT_MAX_ATTEMPTS {
                            log::error!("Reconnect attempts exhausted, link idle until retry");
                            let _ = event_tx.send(LinkEvent::Exhausted);
                            match idle_until_retry(&cmd_rx, &event_tx).await {
                                IdleOutcome::Retry => continue 'session,
                                IdleOutcome::Shutdown => return Ok(()),
                            }
                        }

                        // Commands must stay live through the backoff window;
                        // a shutdown mid-backoff exits immediately instead of
                        // stalling for up to the cap.
                        match wait_backoff(backoff_delay(attempts), &cmd_rx, &event_tx).await {
                            BackoffOutcome::Elapsed => {}
                            BackoffOutcome::Retry => continue 'session,
                            BackoffOutcome::Shutdown => return Ok(()),
                        }
                    }
                },
                cmd = cmd_rx.recv_async() => match cmd {
                    Ok(LinkCommand::CreateFlow(name)) => {
                        send_publish(&client, &event_tx, create_flow_message(&name)).await;
                    }
                    Ok(LinkCommand::DeleteFlow(id)) => {
                        send_publish(&client, &event_tx, delete_flow_message(&id)).await;
                    }
                    Ok(LinkCommand::Retry) => {}
                    Ok(LinkCommand::Shutdown) | Err(_) => {
                        log::info!("Broker link shutting down");
                        let _ = client.disconnect().await;
                        // Bounded flush of the DISCONNECT packet so a dead
                        // broker cannot stall exit.
                        let _ =
                            tokio::time::timeout(Duration::from_millis(500), eventloop.poll())
                                .await;
                        return Ok(());
                    }
                },
            }
        }
    }
}

enum IdleOutcome {
    Retry,
    Shutdown,
}

enum BackoffOutcome {
    Elapsed,
    Retry,
    Shutdown,
}

/// Sleep out a backoff delay while still servicing commands. `Shutdown` ends
/// the link at once, `Retry` restarts the attempt cycle, and create/delete
/// commands are answered with a publish failure since there is no connection
/// to send them on.
async fn wait_backoff(
    delay: Duration,
    cmd_rx: &Receiver<LinkCommand>,
    event_tx: &Sender<LinkEvent>,
) -> BackoffOutcome {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return BackoffOutcome::Elapsed,
            cmd = cmd_rx.recv_async() => match cmd {
                Ok(LinkCommand::Retry) => return BackoffOutcome::Retry,
                Ok(LinkCommand::Shutdown) | Err(_) => return BackoffOutcome::Shutdown,
                Ok(LinkCommand::CreateFlow(name)) => {
                    let _ = event_tx.send(LinkEvent::PublishFailed {
                        topic: flow_name_topic(&flow_id(&name)),
                        reason: "not connected".to_string(),
                    });
                }
                Ok(LinkCommand::DeleteFlow(id)) => {
                    let _ = event_tx.send(LinkEvent::PublishFailed {
                        topic: flow_name_topic(&id),
                        reason: "not connected".to_string(),
                    });
                }
            },
        }
    }
}

/// Wait for a retry or shutdown after backoff exhaustion. Create/delete
/// commands arriving in this state are answered with a publish failure so the
/// UI does not drop them silently.
async fn idle_until_retry(
    cmd_rx: &Receiver<LinkCommand>,
    event_tx: &Sender<LinkEvent>,
) -> IdleOutcome {
    loop {
        match cmd_rx.recv_async().await {
            Ok(LinkCommand::Retry) => return IdleOutcome::Retry,
            Ok(LinkCommand::Shutdown) | Err(_) => return IdleOutcome::Shutdown,
            Ok(LinkCommand::CreateFlow(name)) => {
                let _ = event_tx.send(LinkEvent::PublishFailed {
                    topic: flow_name_topic(&flow_id(&name)),
                    reason: "not connected".to_string(),
                });
            }
            Ok(LinkCommand::DeleteFlow(id)) => {
                let _ = event_tx.send(LinkEvent::PublishFailed {
                    topic: flow_name_topic(&id),
                    reason: "not connected".to_string(),
                });
            }
        }
    }
}

/// Route an incoming publish. Both creation and deletion flow through here:
/// a non-empty payload names a flow, an empty payload clears it.
fn route_publish(publish: &Publish, event_tx: &Sender<LinkEvent>) {
    let payload = String::from_utf8_lossy(&publish.payload);
    log::debug!(
        "mqtt received message: '{}'='{}'",
        publish.topic,
        payload
    );

    let Some(id) = parse_flow_topic(&publish.topic) else {
        return;
    };

    let event = if payload.is_empty() {
        LinkEvent::FlowCleared { id: id.to_string() }
    } else {
        LinkEvent::FlowNamed {
            id: id.to_string(),
            name: payload.into_owned(),
        }
    };
    let _ = event_tx.send(event);
}

async fn send_publish(client: &AsyncClient, event_tx: &Sender<LinkEvent>, msg: FlowPublish) {
    log::debug!("mqtt publish '{}'='{}' retained", msg.topic, msg.payload);
    if let Err(err) = client
        .publish(&msg.topic, QoS::AtLeastOnce, msg.retained, msg.payload.clone())
        .await
    {
        log::error!("Failed to publish to {}: {err}", msg.topic);
        let _ = event_tx.send(LinkEvent::PublishFailed {
            topic: msg.topic,
            reason: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(2));
        assert_eq!(backoff_delay(7), Duration::from_secs(30));
        assert_eq!(backoff_delay(100), Duration::from_secs(30));
    }

    #[test]
    fn test_shutdown_during_backoff_exits_promptly() {
        let cfg = BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1, // nothing listens here
            client_id: "link-test".to_string(),
        };
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let (event_tx, event_rx) = flume::unbounded();

        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(run(cfg, cmd_rx, event_tx))
        });

        // Let a few attempts fail so a multi-second backoff window is active.
        let mut disconnects = 0;
        while disconnects < 4 {
            match event_rx.recv_timeout(Duration::from_secs(30)).unwrap() {
                LinkEvent::Disconnected { .. } => disconnects += 1,
                _ => {}
            }
        }

        let started = std::time::Instant::now();
        cmd_tx.send(LinkCommand::Shutdown).unwrap();
        handle.join().unwrap().unwrap();
        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_secs(2),
            "shutdown during backoff took {elapsed:?}"
        );
    }

    #[test]
    fn test_route_publish_named_and_cleared() {
        let (tx, rx) = flume::unbounded();

        let named = Publish::new("flows/demo/name", QoS::AtLeastOnce, "Demo Flow".as_bytes().to_vec());
        route_publish(&named, &tx);
        assert_eq!(
            rx.try_recv().unwrap(),
            LinkEvent::FlowNamed {
                id: "demo".to_string(),
                name: "Demo Flow".to_string()
            }
        );

        let cleared = Publish::new("flows/demo/name", QoS::AtLeastOnce, Vec::<u8>::new());
        route_publish(&cleared, &tx);
        assert_eq!(
            rx.try_recv().unwrap(),
            LinkEvent::FlowCleared {
                id: "demo".to_string()
            }
        );

        let foreign = Publish::new("sensors/demo/temp", QoS::AtLeastOnce, "21".as_bytes().to_vec());
        route_publish(&foreign, &tx);
        assert!(rx.try_recv().is_err());
    }
}
