//! Drives one `AgentHandle` through registration and its per-tick loop.
//!
//! Generic over `Role` rather than boxing it: the runtime is instantiated
//! once per concrete role type at the binary boundary, so there is no
//! dyn-dispatch cost on the hot per-tick path (see the design notes on
//! reserving trait objects for the auction house's capability sets, not for
//! role variants).

use crate::agent::{AgentHandle, Role, TraderOps};
use crate::auction_house::AuctionHouseHandle;
use crate::clock::Clock;
use crate::config::Config;
use crate::message::{Message, Offer};
use rand::Rng;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct AgentRuntime<R: Role> {
    handle: Arc<AgentHandle>,
    role: R,
    /// Weak by design: the auction house owns agents strongly for the
    /// duration of their registration, so an agent can only ever observe its
    /// own death via this reference failing to upgrade.
    house: Weak<AuctionHouseHandle>,
    config: Config,
    clock: Arc<dyn Clock>,
    trader_tick_ms: u64,
}

impl<R: Role> AgentRuntime<R> {
    pub fn new(
        handle: Arc<AgentHandle>,
        role: R,
        house: Weak<AuctionHouseHandle>,
        config: Config,
        clock: Arc<dyn Clock>,
        trader_tick_ms: u64,
    ) -> Self {
        Self {
            handle,
            role,
            house,
            config,
            clock,
            trader_tick_ms,
        }
    }

    pub fn handle(&self) -> &Arc<AgentHandle> {
        &self.handle
    }

    /// Sends `RegisterRequest` and blocks (draining the inbox) until the
    /// auction house replies. Returns `false` on rejection or if the house is
    /// already gone.
    fn register(&self) -> bool {
        let Some(house) = self.house.upgrade() else {
            tracing::warn!(agent = self.handle.id(), "auction house gone before registration");
            return false;
        };
        house.receive(Message::RegisterRequest(self.handle.clone()));
        loop {
            if let Some(msg) = self.handle.inbox.pop() {
                if let Message::RegisterResponse { accepted, reason } = msg {
                    if accepted {
                        self.handle.mark_ready();
                        tracing::debug!(agent = self.handle.id(), class = self.handle.class(), "registered");
                        return true;
                    }
                    tracing::warn!(agent = self.handle.id(), ?reason, "registration rejected");
                    return false;
                }
                // Anything else arriving before RegisterResponse is spurious
                // this early; drop it rather than block forever re-polling.
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Spawns the agent's dedicated thread: registers, then runs the tick
    /// loop at `trader_tick_ms` cadence until self-destruction or the
    /// auction house disappearing.
    pub fn spawn(mut self) -> JoinHandle<()> {
        let agent_id = self.handle.id();
        thread::Builder::new()
            .name(format!("agent-{agent_id}"))
            .spawn(move || {
                if !self.register() {
                    self.handle.mark_destroyed();
                    return;
                }
                let mut rng = rand::thread_rng();
                loop {
                    let tick_start = self.clock.now_ms();
                    if !self.tick(&mut rng) {
                        break;
                    }
                    let elapsed = self.clock.now_ms() - tick_start;
                    let pad = self.trader_tick_ms as i64 - elapsed;
                    if pad > 0 {
                        thread::sleep(Duration::from_millis(pad as u64));
                    }
                }
            })
            .expect("failed to spawn agent thread")
    }

    /// One tick per §4.6: drain inbox, produce, quote, self-destruct check,
    /// flush outbox, advance counters. Returns `false` when the agent should
    /// stop ticking.
    fn tick(&mut self, rng: &mut impl Rng) -> bool {
        let Some(house) = self.house.upgrade() else {
            self.handle.mark_destroyed();
            return false;
        };
        let now = self.clock.now_ms();

        // 1. Drain inbox.
        let mut shutdown_requested = false;
        let inbox_budget = self.config.max_processed_per_flush_agent;
        self.handle.inbox.drain_budgeted(inbox_budget, |msg| match msg {
            Message::BidResult(result) | Message::AskResult(result) => {
                if result.traded_quantity > 0 {
                    self.handle
                        .state
                        .lock()
                        .price_model
                        .observe(&result.commodity, result.avg_fill_price, result.traded_quantity);
                }
            }
            Message::ShutdownCommand => shutdown_requested = true,
            Message::RegisterResponse { .. } | Message::Empty => {}
            other => tracing::trace!(agent = self.handle.id(), msg = ?other, "unexpected message in agent inbox"),
        });
        if shutdown_requested {
            self.handle.mark_destroyed();
            return false;
        }

        // 2. Production/consumption step.
        let mut ready_this_tick = false;
        if self.handle.is_ready() {
            ready_this_tick = true;
            let ops: &dyn TraderOps = self.handle.as_ref();
            let mut cost_acc = self.handle.state.lock().track_cost;
            self.role.tick(ops, &mut cost_acc, rng);
            self.handle.state.lock().track_cost = cost_acc;
        }

        // 3. Post asks/bids from current inventory state.
        if ready_this_tick {
            self.quote(&house, now, rng);
        }

        // 4. Self-destruct on insolvency.
        let mut keep_running = true;
        if self.handle.balance() <= 0.0 {
            house.receive(Message::ShutdownNotify {
                id: self.handle.id(),
                class: self.handle.class().to_string(),
                age_ticks: self.handle.age_ticks(),
            });
            self.handle.mark_destroyed();
            keep_running = false;
        }

        // 5. Flush outbox into the auction house.
        let outbox_budget = self.config.max_processed_per_flush_agent;
        let mut processed = 0;
        while processed < outbox_budget {
            let Some(msg) = self.handle.outbox.pop() else { break };
            house.receive(msg);
            processed += 1;
        }

        // 6. Advance counters.
        {
            let mut state = self.handle.state.lock();
            state.age_ticks += 1;
            if ready_this_tick {
                state.ticks += 1;
            }
        }

        keep_running
    }

    fn quote(&self, house: &Arc<AuctionHouseHandle>, now: i64, rng: &mut impl Rng) {
        let external_lookback_ms = self.config.external_lookback_ms(self.trader_tick_ms);
        let commodities: Vec<String> = {
            let state = self.handle.state.lock();
            state.inventory.commodities().map(String::from).collect()
        };
        let sender = self.handle.id();
        let expiry_ms = now + self.trader_tick_ms as i64;

        for commodity in commodities {
            let (stored, ideal, original_cost, empty_space, unit_size, surplus, shortage) = {
                let state = self.handle.state.lock();
                (
                    state.inventory.query(&commodity),
                    state.inventory.ideal(&commodity),
                    state.inventory.query_cost(&commodity),
                    state.inventory.empty_space(),
                    state.inventory.unit_size(&commodity),
                    state.inventory.surplus(&commodity),
                    state.inventory.shortage(&commodity),
                )
            };

            if surplus >= 1 {
                let fair = original_cost * 1.15;
                let market = house.history.buy_price.t_average(&commodity, external_lookback_ms);
                let (lo, hi) = if fair <= market { (fair, market) } else { (market, fair) };
                let price = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
                self.handle.outbox.push(Message::Ask(Offer {
                    sender,
                    commodity: commodity.clone(),
                    quantity: surplus,
                    unit_price: price.max(self.config.min_price),
                    expiry_ms,
                }));
            }

            if ideal > 0 {
                let fulfillment = stored as f64 / ideal as f64;
                let balance = self.handle.balance();
                if fulfillment < 1.0 && empty_space >= unit_size && balance >= self.config.min_price {
                    let fair_mid = house.history.mid_price.t_average(&commodity, external_lookback_ms);
                    let days_savings = balance / self.config.idle_tax;
                    let fulfillment_term = fulfillment - 0.5;
                    let desperation = (5.0 / (days_savings * days_savings) + 1.0)
                        * (1.0 - 0.4 * fulfillment_term / (1.0 + 0.4 * fulfillment_term.abs()));
                    let bid_price = (fair_mid * desperation).clamp(self.config.min_price, balance);

                    let favorability = self.handle.state.lock().price_model.favorability(&commodity, bid_price);
                    let min_limit = if stored == 0 { 1 } else { 0 };
                    let max_limit = if unit_size > 0.0 { (empty_space / unit_size).floor() as u64 } else { shortage };
                    let max_limit = max_limit.max(min_limit);
                    let quantity = ((favorability * shortage as f64).ceil() as u64).clamp(min_limit, max_limit);

                    if quantity > 0 {
                        self.handle.outbox.push(Message::Bid(Offer {
                            sender,
                            commodity,
                            quantity,
                            unit_price: bid_price,
                            expiry_ms,
                        }));
                    }
                }
            }
        }
    }
}
