//! Spawns new agents to keep the population near a target size, weighted
//! toward commodities the market currently undersupplies.
//!
//! Grounded in the original engine's `ChooseNewClassWeighted`/`RandomChoice`
//! pair: a cumulative weighted draw over `exp(gamma * t_average(net_supply))`.

use crate::agent::{AgentHandle, Role, RoleCatalog};
use crate::agent_runtime::AgentRuntime;
use crate::auction_house::AuctionHouseHandle;
use crate::clock::Clock;
use crate::config::Config;
use crate::errors::StartupError;
use crate::ids::AgentId;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SupervisorMetrics {
    pub tick: u64,
    pub trader_count: usize,
    pub spread_profit: f64,
}

pub struct Supervisor<R: RoleCatalog> {
    house: Arc<AuctionHouseHandle>,
    config: Config,
    clock: Arc<dyn Clock>,
    trader_tick_ms: u64,
    next_id: AtomicU64,
    metrics: Mutex<Vec<SupervisorMetrics>>,
    agent_threads: Mutex<Vec<JoinHandle<()>>>,
    _role: std::marker::PhantomData<R>,
}

impl<R: RoleCatalog> Supervisor<R> {
    pub fn new(house: Arc<AuctionHouseHandle>, config: Config, clock: Arc<dyn Clock>, trader_tick_ms: u64) -> Self {
        Self {
            house,
            config,
            clock,
            trader_tick_ms,
            next_id: AtomicU64::new(1), // 0 is reserved for the auction house
            metrics: Mutex::new(Vec::new()),
            agent_threads: Mutex::new(Vec::new()),
            _role: std::marker::PhantomData,
        }
    }

    pub fn metrics_snapshot(&self) -> Vec<SupervisorMetrics> {
        self.metrics.lock().clone()
    }

    /// Runs control-ticks until the auction house shuts down, spawning
    /// agents on its own thread (§4.8 + §5's "its own scheduling unit").
    ///
    /// Returns `Err` if a role ever names a commodity the auction house
    /// never registered: a startup-shape mismatch, not a recoverable
    /// runtime condition, so the loop stops and the caller is expected to
    /// turn this into a nonzero exit.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<Result<(), StartupError>> {
        thread::Builder::new()
            .name("supervisor".into())
            .spawn(move || -> Result<(), StartupError> {
                let mut tick: u64 = 0;
                let result = loop {
                    if self.house.is_shutdown() {
                        break Ok(());
                    }
                    let tick_start = self.clock.now_ms();
                    if let Err(err) = self.control_tick(tick) {
                        break Err(err);
                    }
                    tick += 1;
                    let elapsed = self.clock.now_ms() - tick_start;
                    let pad = self.config.target_steptime_ms as i64 - elapsed;
                    if pad > 0 {
                        thread::sleep(Duration::from_millis(pad as u64));
                    }
                };
                if result.is_err() {
                    self.house.shutdown();
                }
                let mut threads = self.agent_threads.lock();
                for handle in threads.drain(..) {
                    let _ = handle.join();
                }
                result
            })
            .expect("failed to spawn supervisor thread")
    }

    fn control_tick(&self, tick: u64) -> Result<(), StartupError> {
        let current = self.house.known_trader_count();
        if current < self.config.target_trader_count {
            let deficit = self.config.target_trader_count - current;
            let to_spawn = deficit.min(self.config.max_spawns_per_tick);
            let mut rng = rand::thread_rng();
            let mut spawned = self.agent_threads.lock();
            for _ in 0..to_spawn {
                if let Some(role) = self.choose_role(&mut rng) {
                    spawned.push(self.spawn_agent(role)?);
                }
            }
        }

        self.metrics.lock().push(SupervisorMetrics {
            tick,
            trader_count: self.house.known_trader_count(),
            spread_profit: self.house.spread_profit(),
        });
        Ok(())
    }

    /// Cumulative weighted draw over `RoleCatalog::commodities()`, mirroring
    /// `RandomChoice`: draw `r` uniform on `[0, sum(weights))`, walk the
    /// weights subtracting until `r` lands inside one.
    fn choose_role(&self, rng: &mut impl Rng) -> Option<R> {
        let commodities = R::commodities();
        if commodities.is_empty() {
            return None;
        }
        let weights: Vec<f64> = commodities
            .iter()
            .copied()
            .map(|c| {
                let net_supply = self
                    .house
                    .history
                    .net_supply
                    .t_average(c, self.config.supervisor_lookback_ms);
                (self.config.supervisor_gamma * net_supply).exp()
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return R::for_commodity(commodities[0]);
        }
        let mut draw = rng.gen_range(0.0..total);
        for (commodity, weight) in commodities.iter().copied().zip(weights.iter()) {
            if draw < *weight {
                return R::for_commodity(commodity);
            }
            draw -= weight;
        }
        R::for_commodity(commodities[commodities.len() - 1])
    }

    fn spawn_agent(&self, role: R) -> Result<JoinHandle<()>, StartupError> {
        let id: AgentId = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(AgentHandle::new(
            id,
            role.class_name(),
            self.config.starting_money,
            self.config.starting_capacity,
            self.config.price_model_window,
            self.config.mailbox_capacity,
        ));
        for (commodity, ideal) in role.ideal_inventory() {
            let unit_size = self
                .house
                .commodity(commodity)
                .ok_or_else(|| StartupError::UnknownCommodity { commodity: commodity.to_string() })?
                .unit_size;
            handle.register_commodity(commodity, unit_size, ideal);
        }
        tracing::info!(agent = id, class = role.class_name(), "spawning agent");
        let runtime = AgentRuntime::new(
            handle,
            role,
            Arc::downgrade(&self.house),
            self.config,
            self.clock.clone(),
            self.trader_tick_ms,
        );
        Ok(runtime.spawn())
    }
}
