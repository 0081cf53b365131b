//! Command-loop driver around [`SessionPage`].
//!
//! The page itself is timer-agnostic: it only arms/clears [`TimerSlot`]s.
//! The driver owns the real `tokio` timers, resynchronizing them with the
//! slots after every turn of the loop — a slot's generation changes exactly
//! when its schedule does, so a rebuild replaces the previous instance and
//! two live timers of the same kind cannot exist.

use std::future::pending;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep};
use tracing::debug;

use crate::page::{ChannelPatch, PointPatch, SessionPage, SyncMode};
use crate::timers::TimerSlot;

const COMMAND_CHANNEL_SIZE: usize = 64;

/// Everything an operator (or embedding UI) can ask the session to do.
#[derive(Debug)]
pub enum PageCommand {
    Connect,
    Disconnect,
    UpdatePollInterval,
    ApplyPollTimeoutConfig,
    SetAutoReadEnabled(bool),
    UpdateAutoReadInterval(u64),
    StopAutoRead,
    ReadPoint(String),
    WritePoint(String),
    StartPolling(String),
    StopPolling,
    SyncSnapshot,
    AddGateway {
        name: String,
        start_slave_id: i64,
        end_slave_id: i64,
    },
    UpdateGatewayName {
        gateway_id: String,
        name: String,
    },
    RemoveChannel(String),
    SetActiveChannel(String),
    UpdateChannelSettings(ChannelPatch),
    AppendPointsBatch {
        count: i64,
        function_code: u8,
        start_address: i64,
    },
    UpdatePoint {
        point_id: String,
        patch: PointPatch,
    },
    RemovePoint(String),
    SetConfigMode(SyncMode),
    LoadRemoteConfig,
    SaveRemoteConfig {
        auto_rename_duplicate_gateway: bool,
    },
    SetPointSelection(Vec<String>),
    ApplyCollectPoints {
        apply_all: bool,
    },
    Shutdown,
}

/// Repeating timer mirrored from a [`TimerSlot`].
struct ScheduledInterval {
    seen_generation: u64,
    interval: Option<Interval>,
}

impl ScheduledInterval {
    fn new() -> Self {
        Self {
            seen_generation: 0,
            interval: None,
        }
    }

    fn resync(&mut self, slot: &TimerSlot) {
        if self.seen_generation == slot.generation() {
            return;
        }
        self.seen_generation = slot.generation();
        self.interval = slot.period().map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
    }

    /// Completes on the next tick; pends forever while unarmed.
    async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending().await,
        }
    }
}

/// One-shot delay mirrored from a [`TimerSlot`] (the persist debounce).
struct ScheduledDelay {
    seen_generation: u64,
    delay: Option<Pin<Box<Sleep>>>,
}

impl ScheduledDelay {
    fn new() -> Self {
        Self {
            seen_generation: 0,
            delay: None,
        }
    }

    fn resync(&mut self, slot: &TimerSlot) {
        if self.seen_generation == slot.generation() {
            return;
        }
        self.seen_generation = slot.generation();
        self.delay = slot.period().map(|period| Box::pin(sleep(period)));
    }

    async fn fire(&mut self) {
        match self.delay.as_mut() {
            Some(delay) => {
                delay.as_mut().await;
                self.delay = None;
            }
            None => pending().await,
        }
    }
}

/// Runs a [`SessionPage`] behind an mpsc command channel.
pub struct PageDriver {
    page: SessionPage,
    commands: mpsc::Receiver<PageCommand>,
    snapshot: ScheduledInterval,
    auto_read: ScheduledInterval,
    collect: ScheduledInterval,
    persist: ScheduledDelay,
}

impl PageDriver {
    pub fn new(page: SessionPage) -> (Self, mpsc::Sender<PageCommand>) {
        let (sender, receiver) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let driver = Self {
            page,
            commands: receiver,
            snapshot: ScheduledInterval::new(),
            auto_read: ScheduledInterval::new(),
            collect: ScheduledInterval::new(),
            persist: ScheduledDelay::new(),
        };
        (driver, sender)
    }

    /// Restore persisted state, then serve commands and timer ticks until
    /// `Shutdown` arrives or every sender is dropped.
    pub async fn run(mut self) {
        self.page.restore_persisted_state().await;

        loop {
            self.snapshot.resync(&self.page.timers().snapshot);
            self.auto_read.resync(&self.page.timers().auto_read);
            self.collect.resync(&self.page.timers().collect);
            self.persist.resync(&self.page.timers().persist);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PageCommand::Shutdown) | None => {
                        debug!("session driver shutting down");
                        self.page.shutdown().await;
                        return;
                    }
                    Some(command) => self.dispatch(command).await,
                },
                () = self.snapshot.tick() => self.page.sync_snapshot().await,
                () = self.auto_read.tick() => self.page.tick_auto_read().await,
                () = self.collect.tick() => self.page.tick_collect().await,
                () = self.persist.fire() => self.page.flush_persist().await,
            }
        }
    }

    async fn dispatch(&mut self, command: PageCommand) {
        match command {
            PageCommand::Connect => self.page.connect_channel().await,
            PageCommand::Disconnect => self.page.disconnect_channel().await,
            PageCommand::UpdatePollInterval => self.page.update_poll_interval().await,
            PageCommand::ApplyPollTimeoutConfig => self.page.apply_poll_timeout_config(),
            PageCommand::SetAutoReadEnabled(enabled) => self.page.set_auto_read_enabled(enabled),
            PageCommand::UpdateAutoReadInterval(interval_ms) => {
                self.page.update_auto_read_interval(interval_ms);
            }
            PageCommand::StopAutoRead => self.page.stop_auto_read(),
            PageCommand::ReadPoint(point_id) => self.page.read_point(&point_id).await,
            PageCommand::WritePoint(point_id) => self.page.write_point(&point_id).await,
            PageCommand::StartPolling(point_id) => self.page.start_polling(&point_id).await,
            PageCommand::StopPolling => self.page.stop_polling().await,
            PageCommand::SyncSnapshot => self.page.sync_snapshot().await,
            PageCommand::AddGateway {
                name,
                start_slave_id,
                end_slave_id,
            } => {
                self.page
                    .add_gateway_with_range(&name, start_slave_id, end_slave_id);
            }
            PageCommand::UpdateGatewayName { gateway_id, name } => {
                self.page.update_gateway_name(&gateway_id, &name);
            }
            PageCommand::RemoveChannel(channel_key) => {
                self.page.remove_channel(&channel_key).await;
            }
            PageCommand::SetActiveChannel(channel_key) => {
                self.page.set_active_channel(&channel_key);
            }
            PageCommand::UpdateChannelSettings(patch) => {
                self.page.update_channel_settings(patch);
            }
            PageCommand::AppendPointsBatch {
                count,
                function_code,
                start_address,
            } => {
                self.page
                    .append_points_by_batch(count, function_code, start_address);
            }
            PageCommand::UpdatePoint { point_id, patch } => {
                self.page.update_point(&point_id, patch);
            }
            PageCommand::RemovePoint(point_id) => self.page.remove_point(&point_id),
            PageCommand::SetConfigMode(mode) => self.page.set_config_mode(mode).await,
            PageCommand::LoadRemoteConfig => self.page.load_config_from_remote().await,
            PageCommand::SaveRemoteConfig {
                auto_rename_duplicate_gateway,
            } => {
                self.page
                    .save_config_to_remote(auto_rename_duplicate_gateway)
                    .await;
            }
            PageCommand::SetPointSelection(point_ids) => {
                self.page.set_point_selection(point_ids);
            }
            PageCommand::ApplyCollectPoints { apply_all } => {
                self.page.apply_collect_points(apply_all).await;
            }
            PageCommand::Shutdown => unreachable!("handled by the run loop"),
        }
    }
}
