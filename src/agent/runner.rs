//! Agent lifecycle and publish loop
//!
//! The runner owns the protocol client and walks the state machine
//! `Init → LoggingIn → LoadingChannels → Subscribing → Running → Stopping
//! → Stopped`. A failure while logging in or loading channels aborts the
//! run before `Running`. Cancellation arrives on a watch channel set by
//! the process's signal glue and is checked between publishes, never
//! inside one.

use crate::client::{ChatClient, ClientError};
use crate::config::BotSection;
use crate::transport::{RequestTransport, Subscriber};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Fixed pool the agent draws messages from
pub const MESSAGE_POOL: [&str; 10] = [
    "Olá pessoal! Como vocês estão?",
    "Alguém quer conversar sobre tecnologia?",
    "Que dia lindo hoje!",
    "Alguém tem alguma dica interessante?",
    "Vamos discutir sobre sistemas distribuídos!",
    "Que tal falarmos sobre mensageria?",
    "Alguém já usou Docker em produção?",
    "Vamos compartilhar experiências!",
    "Que tal um café virtual?",
    "Alguém tem projetos interessantes para mostrar?",
];

/// Lifecycle states of the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Init,
    LoggingIn,
    LoadingChannels,
    Subscribing,
    Running,
    Stopping,
    Stopped,
}

/// Drives one agent from startup through the publish loop to shutdown
pub struct AgentRunner<R, S> {
    client: ChatClient<R, S>,
    pacing: BotSection,
    state: AgentState,
    shutdown: watch::Receiver<bool>,
}

impl<R, S> AgentRunner<R, S>
where
    R: RequestTransport,
    S: Subscriber,
{
    /// Create a runner around a connected client. The watch channel is the
    /// cancellation context; flipping it to `true` requests a stop.
    pub fn new(client: ChatClient<R, S>, pacing: BotSection, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            client,
            pacing,
            state: AgentState::Init,
            shutdown,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The protocol client, for inspection
    pub fn client(&self) -> &ChatClient<R, S> {
        &self.client
    }

    /// Run the agent to completion: startup, publish loop, shutdown.
    /// Returns the startup error when the agent never reached `Running`.
    pub async fn start(&mut self) -> Result<(), ClientError> {
        if let Err(e) = self.startup().await {
            error!(error = %e, "Agent startup failed");
            self.stop().await;
            return Err(e);
        }
        info!(user = %self.client.username(), "Agent started");
        self.run_loop().await;
        self.stop().await;
        Ok(())
    }

    async fn startup(&mut self) -> Result<(), ClientError> {
        self.state = AgentState::LoggingIn;
        self.client.login().await?;

        self.state = AgentState::LoadingChannels;
        self.client.load_channels().await?;

        self.state = AgentState::Subscribing;
        self.client.subscribe_direct().await;

        self.state = AgentState::Running;
        Ok(())
    }

    async fn run_loop(&mut self) {
        while !self.should_stop() {
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "Error in publish loop, backing off");
                self.pause(self.pacing.error_backoff_secs).await;
            }
        }
    }

    /// One publish cycle: pick a channel, burst messages at it, rest.
    async fn run_cycle(&mut self) -> Result<(), ClientError> {
        let Some(channel) = self.pick_channel() else {
            warn!("No channel available, waiting");
            self.pause(self.pacing.empty_channels_wait_secs).await;
            return Ok(());
        };

        for _ in 0..self.pacing.burst_size {
            if self.should_stop() {
                return Ok(());
            }
            let message = pick_message();
            // Unacknowledged publishes are counted by the client and not
            // retried; only a dead request connection errors out here.
            self.client.publish(&channel, message).await?;
            self.pause_range(
                self.pacing.message_delay_min_secs,
                self.pacing.message_delay_max_secs,
            )
            .await;
        }

        info!("Message burst complete, waiting for next cycle");
        self.pause_range(
            self.pacing.cycle_delay_min_secs,
            self.pacing.cycle_delay_max_secs,
        )
        .await;
        Ok(())
    }

    /// Release both connections. Idempotent: repeated stops are no-ops.
    pub async fn stop(&mut self) {
        if self.state == AgentState::Stopped {
            return;
        }
        self.state = AgentState::Stopping;
        self.client.close().await;
        self.state = AgentState::Stopped;
        info!("Agent stopped");
    }

    fn should_stop(&self) -> bool {
        *self.shutdown.borrow()
            || matches!(self.state, AgentState::Stopping | AgentState::Stopped)
    }

    fn pick_channel(&self) -> Option<String> {
        let channels = self.client.channels();
        if channels.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        Some(channels[rng.gen_range(0..channels.len())].clone())
    }

    /// Sleep, waking early when a stop is requested
    async fn pause(&mut self, secs: f64) {
        if secs <= 0.0 {
            return;
        }
        let sleep = tokio::time::sleep(Duration::from_secs_f64(secs));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn pause_range(&mut self, min_secs: f64, max_secs: f64) {
        let secs = if max_secs > min_secs {
            rand::thread_rng().gen_range(min_secs..max_secs)
        } else {
            min_secs
        };
        self.pause(secs).await;
    }
}

fn pick_message() -> &'static str {
    let mut rng = rand::thread_rng();
    MESSAGE_POOL[rng.gen_range(0..MESSAGE_POOL.len())]
}
