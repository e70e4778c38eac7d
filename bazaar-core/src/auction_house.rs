//! Registration, order books, clearing, settlement, history, demographics.
//!
//! Splits its work across two threads serialized by a single state mutex,
//! per the design notes: a message pump (drains inbox/outbox every ~1ms) and
//! a clearing loop (resolves every commodity's book every `auction_tick_ms`).

use crate::agent::{AgentHandle, TraderOps};
use crate::clock::Clock;
use crate::commodity::Commodity;
use crate::config::Config;
use crate::history::History;
use crate::ids::{AgentId, AUCTION_HOUSE_ID};
use crate::mailbox::Mailbox;
use crate::message::{Message, Offer, OfferResult, Side};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct BookEntry {
    offer: Offer,
    remaining: u64,
    broker_fee_paid: bool,
    traded_quantity: u64,
    fill_notional: f64,
    /// True if this offer was posted with `expiry_ms == 0` ("immediate,
    /// valid this clearing only"). Such offers close at the end of the tick
    /// they were examined in regardless of fill.
    immediate: bool,
    closed: bool,
}

impl BookEntry {
    fn new(offer: Offer) -> Self {
        let remaining = offer.quantity;
        Self {
            offer,
            remaining,
            broker_fee_paid: false,
            traded_quantity: 0,
            fill_notional: 0.0,
            immediate: false,
            closed: false,
        }
    }

    fn avg_fill_price(&self) -> f64 {
        if self.traded_quantity > 0 {
            self.fill_notional / self.traded_quantity as f64
        } else {
            0.0
        }
    }
}

#[derive(Default)]
struct OrderBook {
    bids: Vec<BookEntry>,
    asks: Vec<BookEntry>,
}

struct Inner {
    commodities: HashMap<String, Commodity>,
    books: HashMap<String, OrderBook>,
    known_traders: HashMap<AgentId, Arc<AgentHandle>>,
    demographics: HashMap<String, i64>,
    total_deaths: u64,
    total_age_at_death: u64,
    spread_profit: f64,
}

pub struct AuctionHouseHandle {
    inbox: Mailbox<Message>,
    outbox: Mailbox<(AgentId, Message)>,
    state: parking_lot::Mutex<Inner>,
    pub history: History,
    pub config: Config,
    clock: Arc<dyn Clock>,
    shutdown: AtomicBool,
}

impl AuctionHouseHandle {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        let history = History::new(config.history_capacity);
        Self {
            inbox: Mailbox::new(config.mailbox_capacity, "auction-house-inbox"),
            outbox: Mailbox::new(config.mailbox_capacity, "auction-house-outbox"),
            state: parking_lot::Mutex::new(Inner {
                commodities: HashMap::new(),
                books: HashMap::new(),
                known_traders: HashMap::new(),
                demographics: HashMap::new(),
                total_deaths: 0,
                total_age_at_death: 0,
                spread_profit: 0.0,
            }),
            history,
            config,
            clock,
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> AgentId {
        AUCTION_HOUSE_ID
    }

    /// Idempotent: initializes all six history logs with the design-default
    /// seed values and an empty book.
    pub fn register_commodity(&self, commodity: Commodity) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if state.commodities.contains_key(&commodity.id) {
            return;
        }
        self.history.register(&commodity.id, now);
        state.books.insert(commodity.id.clone(), OrderBook::default());
        state.commodities.insert(commodity.id.clone(), commodity);
    }

    pub fn commodity_ids(&self) -> Vec<String> {
        self.state.lock().commodities.keys().cloned().collect()
    }

    pub fn commodity(&self, id: &str) -> Option<Commodity> {
        self.state.lock().commodities.get(id).cloned()
    }

    /// The `Mailbox { receive, send }` entry point every other participant
    /// pushes into.
    pub fn receive(&self, msg: Message) {
        self.inbox.push(msg);
    }

    pub fn known_trader_count(&self) -> usize {
        self.state.lock().known_traders.len()
    }

    pub fn spread_profit(&self) -> f64 {
        self.state.lock().spread_profit
    }

    pub fn live_count(&self, class: &str) -> i64 {
        self.state.lock().demographics.get(class).copied().unwrap_or(0)
    }

    pub fn total_deaths(&self) -> u64 {
        self.state.lock().total_deaths
    }

    pub fn average_age_at_death(&self) -> f64 {
        let state = self.state.lock();
        if state.total_deaths == 0 {
            0.0
        } else {
            state.total_age_at_death as f64 / state.total_deaths as f64
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Drains up to `max_processed_per_flush_auction` inbound messages,
    /// mutating books/known-traders/demographics, then flushes the outbox.
    pub fn pump_once(&self) {
        let now = self.clock.now_ms();
        let budget = self.config.max_processed_per_flush_auction;
        let mut processed = 0;
        while processed < budget {
            let Some(msg) = self.inbox.pop() else { break };
            self.handle_inbound(msg, now);
            processed += 1;
        }
        self.flush_outbox();
    }

    fn handle_inbound(&self, msg: Message, _now: i64) {
        match msg {
            Message::RegisterRequest(handle) => self.handle_register(handle),
            Message::Bid(offer) => self.handle_offer(offer, Side::Bid),
            Message::Ask(offer) => self.handle_offer(offer, Side::Ask),
            Message::ShutdownNotify { id, class, age_ticks } => {
                let mut state = self.state.lock();
                if let Some(count) = state.demographics.get_mut(&class) {
                    *count -= 1;
                }
                state.total_deaths += 1;
                state.total_age_at_death += age_ticks;
                state.known_traders.remove(&id);
            }
            Message::Empty | Message::RegisterResponse { .. } | Message::BidResult(_) | Message::AskResult(_) | Message::ShutdownCommand => {
                tracing::trace!("auction house ignoring inbound message not addressed to it");
            }
        }
    }

    fn handle_register(&self, handle: Arc<AgentHandle>) {
        let id = handle.id();
        let mut state = self.state.lock();
        if id == AUCTION_HOUSE_ID {
            handle.receive(Message::RegisterResponse {
                accepted: false,
                reason: Some(crate::errors::RegistrationError::IdClashWithAuctionHouse),
            });
            return;
        }
        if state.known_traders.contains_key(&id) {
            handle.receive(Message::RegisterResponse {
                accepted: false,
                reason: Some(crate::errors::RegistrationError::IdClashWithExistingTrader),
            });
            return;
        }
        let class = handle.class().to_string();
        state.known_traders.insert(id, handle);
        *state.demographics.entry(class).or_insert(0) += 1;
        drop(state);
        self.outbox.push((id, Message::RegisterResponse { accepted: true, reason: None }));
        tracing::info!(agent = id, "agent registered");
    }

    fn validate_offer_shape(offer: &Offer) -> Result<(), crate::errors::OfferError> {
        if offer.quantity == 0 {
            return Err(crate::errors::OfferError::NonPositiveQuantity { quantity: offer.quantity as i64 });
        }
        if offer.unit_price <= 0.0 {
            return Err(crate::errors::OfferError::NonPositivePrice { price: offer.unit_price });
        }
        Ok(())
    }

    fn handle_offer(&self, offer: Offer, side: Side) {
        if let Err(err) = Self::validate_offer_shape(&offer) {
            tracing::warn!(sender = offer.sender, ?side, %err, "rejecting malformed offer before book insertion");
            return;
        }
        let mut state = self.state.lock();
        let Some(book) = state.books.get_mut(&offer.commodity) else {
            tracing::warn!(commodity = %offer.commodity, "offer for unregistered commodity dropped");
            return;
        };
        match side {
            Side::Bid => book.bids.push(BookEntry::new(offer)),
            Side::Ask => book.asks.push(BookEntry::new(offer)),
        }
    }

    fn flush_outbox(&self) {
        let budget = self.config.max_processed_per_flush_auction;
        let mut processed = 0;
        while processed < budget {
            let Some((recipient, msg)) = self.outbox.pop() else { break };
            let handle = self.state.lock().known_traders.get(&recipient).cloned();
            if let Some(handle) = handle {
                handle.receive(msg);
            }
            processed += 1;
        }
    }

    /// Runs one clearing pass over every registered commodity.
    pub fn clear_tick(&self) {
        let now = self.clock.now_ms();
        let commodity_ids: Vec<String> = self.state.lock().books.keys().cloned().collect();
        for commodity in commodity_ids {
            self.resolve_offers(&commodity, now);
        }
        tracing::debug!(spread_profit = self.spread_profit(), "clearing tick complete");
    }

    fn resolve_offers(&self, commodity: &str, now: i64) {
        let fee_rate = self.config.broker_fee_rate;
        let tax_rate = self.config.sales_tax_rate;

        let (mut bids, mut asks) = {
            let mut state = self.state.lock();
            let Some(book) = state.books.get_mut(commodity) else { return };
            (std::mem::take(&mut book.bids), std::mem::take(&mut book.asks))
        };

        bids.sort_by(|a, b| b.offer.unit_price.partial_cmp(&a.offer.unit_price).unwrap());
        asks.sort_by(|a, b| a.offer.unit_price.partial_cmp(&b.offer.unit_price).unwrap());

        let mut spread_profit_delta = 0.0f64;
        {
            let state = self.state.lock();
            let known = &state.known_traders;
            for entry in bids.iter_mut() {
                Self::validate_entry(entry, Side::Bid, now, known, fee_rate, &self.outbox, &mut spread_profit_delta);
            }
            for entry in asks.iter_mut() {
                Self::validate_entry(entry, Side::Ask, now, known, fee_rate, &self.outbox, &mut spread_profit_delta);
            }
        }

        let supply: u64 = asks.iter().filter(|e| !e.closed).map(|e| e.remaining).sum();
        let demand: u64 = bids.iter().filter(|e| !e.closed).map(|e| e.remaining).sum();

        let mut bid_i = 0usize;
        let mut ask_i = 0usize;
        let mut trades_this_tick: u64 = 0;
        let mut mid_notional = 0.0;
        let mut mid_volume = 0.0;
        let mut buy_notional = 0.0;

        loop {
            while bid_i < bids.len() && bids[bid_i].closed {
                bid_i += 1;
            }
            while ask_i < asks.len() && asks[ask_i].closed {
                ask_i += 1;
            }
            if bid_i >= bids.len() || ask_i >= asks.len() {
                break;
            }
            if bids[bid_i].offer.unit_price < asks[ask_i].offer.unit_price {
                break;
            }

            let clearing_price = asks[ask_i].offer.unit_price;
            let traded = bids[bid_i].remaining.min(asks[ask_i].remaining);
            let buyer_id = bids[bid_i].offer.sender;
            let seller_id = asks[ask_i].offer.sender;

            let (buyer, seller) = {
                let state = self.state.lock();
                (state.known_traders.get(&buyer_id).cloned(), state.known_traders.get(&seller_id).cloned())
            };
            let (Some(buyer), Some(seller)) = (buyer, seller) else {
                if buyer.is_none() {
                    self.close_entry(&mut bids[bid_i], Side::Bid);
                }
                if seller.is_none() {
                    self.close_entry(&mut asks[ask_i], Side::Ask);
                }
                break;
            };

            let taken_goods = seller.try_take_commodity(commodity, traded, true);
            if taken_goods < traded {
                self.close_entry(&mut asks[ask_i], Side::Ask);
                break;
            }
            let notional = traded as f64 * clearing_price;
            let taken_money = buyer.try_take_money(notional, true);
            if taken_money < notional {
                self.close_entry(&mut bids[bid_i], Side::Bid);
                break;
            }

            buyer.try_add_commodity(commodity, traded, Some(clearing_price), false);
            let seller_credit = notional * (1.0 - tax_rate);
            seller.add_money(seller_credit);
            spread_profit_delta += notional * tax_rate;

            bids[bid_i].traded_quantity += traded;
            bids[bid_i].fill_notional += notional;
            bids[bid_i].remaining -= traded;
            asks[ask_i].traded_quantity += traded;
            asks[ask_i].fill_notional += notional;
            asks[ask_i].remaining -= traded;

            mid_notional += notional;
            mid_volume += traded as f64;
            buy_notional += bids[bid_i].offer.unit_price * traded as f64;
            trades_this_tick += 1;

            if bids[bid_i].remaining == 0 {
                self.close_entry(&mut bids[bid_i], Side::Bid);
                bid_i += 1;
            }
            if asks[ask_i].remaining == 0 {
                self.close_entry(&mut asks[ask_i], Side::Ask);
                ask_i += 1;
            }
        }

        for entry in bids.iter_mut() {
            if entry.closed {
                continue;
            }
            if entry.immediate || entry.offer.expiry_ms <= now {
                self.close_entry(entry, Side::Bid);
            }
        }
        for entry in asks.iter_mut() {
            if entry.closed {
                continue;
            }
            if entry.immediate || entry.offer.expiry_ms <= now {
                self.close_entry(entry, Side::Ask);
            }
        }

        bids.retain(|e| !e.closed);
        asks.retain(|e| !e.closed);
        {
            let mut state = self.state.lock();
            if let Some(book) = state.books.get_mut(commodity) {
                book.bids = bids;
                book.asks = asks;
            }
            state.spread_profit += spread_profit_delta;
        }

        self.history.asks.add(commodity, supply as f64, now);
        self.history.bids.add(commodity, demand as f64, now);
        self.history.net_supply.add(commodity, supply as f64 - demand as f64, now);
        self.history.trade_count.add(commodity, trades_this_tick as f64, now);
        if trades_this_tick > 0 {
            self.history.mid_price.add(commodity, mid_notional / mid_volume, now);
            self.history.buy_price.add(commodity, buy_notional / mid_volume, now);
        } else {
            let prev_mid = self.history.mid_price.most_recent(commodity);
            let prev_buy = self.history.buy_price.most_recent(commodity);
            self.history.mid_price.add(commodity, prev_mid, now);
            self.history.buy_price.add(commodity, prev_buy, now);
        }
    }

    fn validate_entry(
        entry: &mut BookEntry,
        side: Side,
        now: i64,
        known: &HashMap<AgentId, Arc<AgentHandle>>,
        fee_rate: f64,
        outbox: &Mailbox<(AgentId, Message)>,
        spread_profit: &mut f64,
    ) {
        if entry.closed {
            return;
        }
        if entry.offer.expiry_ms == 0 {
            entry.broker_fee_paid = true;
            entry.immediate = true;
            entry.offer.expiry_ms = 1;
        } else if entry.offer.expiry_ms < now {
            Self::close_entry_static(entry, side, outbox);
            return;
        }

        let Some(trader) = known.get(&entry.offer.sender) else {
            Self::close_entry_static(entry, side, outbox);
            return;
        };

        if !entry.broker_fee_paid {
            let fee = entry.remaining as f64 * entry.offer.unit_price * fee_rate;
            let paid = trader.try_take_money(fee, true);
            if paid + 1e-9 >= fee {
                entry.broker_fee_paid = true;
                *spread_profit += paid;
            } else {
                Self::close_entry_static(entry, side, outbox);
                return;
            }
        }

        let stake_ok = match side {
            Side::Bid => trader.has_money(entry.remaining as f64 * entry.offer.unit_price),
            Side::Ask => trader.has_commodity(&entry.offer.commodity, entry.remaining),
        };
        if !stake_ok {
            Self::close_entry_static(entry, side, outbox);
        }
    }

    fn close_entry(&self, entry: &mut BookEntry, side: Side) {
        Self::close_entry_static(entry, side, &self.outbox);
    }

    fn close_entry_static(entry: &mut BookEntry, side: Side, outbox: &Mailbox<(AgentId, Message)>) {
        if entry.closed {
            return;
        }
        let result = OfferResult {
            sender: entry.offer.sender,
            commodity: entry.offer.commodity.clone(),
            side,
            broker_fee_paid: entry.broker_fee_paid,
            traded_quantity: entry.traded_quantity,
            untraded_quantity: entry.remaining,
            avg_fill_price: entry.avg_fill_price(),
            limit_price: entry.offer.unit_price,
        };
        let msg = match side {
            Side::Bid => Message::BidResult(result),
            Side::Ask => Message::AskResult(result),
        };
        outbox.push((entry.offer.sender, msg));
        entry.closed = true;
    }

    /// Stops the message pump, pushes `ShutdownCommand` directly to every
    /// known trader (bypassing the outbox, since the house is tearing down),
    /// and clears the registry.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let traders: Vec<Arc<AgentHandle>> = {
            let mut state = self.state.lock();
            let traders = state.known_traders.values().cloned().collect();
            state.known_traders.clear();
            traders
        };
        for trader in traders {
            trader.receive(Message::ShutdownCommand);
        }
        tracing::info!("auction house shutdown complete");
    }

    /// Spawns the message-pump and clearing-loop threads. The clearing loop
    /// triggers `shutdown()` itself once `run_duration_ms` has elapsed.
    pub fn spawn(house: Arc<AuctionHouseHandle>, run_duration_ms: u64) -> (JoinHandle<()>, JoinHandle<()>) {
        let pump_house = house.clone();
        let pump = thread::Builder::new()
            .name("auction-house-pump".into())
            .spawn(move || {
                while !pump_house.is_shutdown() {
                    pump_house.pump_once();
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .expect("failed to spawn auction house message pump thread");

        let clear_house = house;
        let tick_ms = clear_house.config.auction_tick_ms;
        let clearing = thread::Builder::new()
            .name("auction-house-clearing".into())
            .spawn(move || {
                let start = clear_house.clock.now_ms();
                loop {
                    if clear_house.is_shutdown() {
                        break;
                    }
                    let tick_start = clear_house.clock.now_ms();
                    clear_house.clear_tick();
                    let elapsed_total = clear_house.clock.now_ms() - start;
                    if elapsed_total >= run_duration_ms as i64 {
                        clear_house.shutdown();
                        break;
                    }
                    let tick_elapsed = clear_house.clock.now_ms() - tick_start;
                    let pad = tick_ms as i64 - tick_elapsed;
                    if pad > 0 {
                        thread::sleep(Duration::from_millis(pad as u64));
                    }
                }
            })
            .expect("failed to spawn auction house clearing thread");

        (pump, clearing)
    }
}
