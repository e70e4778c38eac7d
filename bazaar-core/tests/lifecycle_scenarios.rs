//! Drives a real `AgentRuntime` thread against a live auction house to
//! exercise the idle-tax self-destruct path end to end, rather than calling
//! `Role::tick` directly as the `bazaar-roles` unit tests do.

use bazaar_core::agent::{AgentHandle, Role, RoleCatalog, TraderOps};
use bazaar_core::{AgentRuntime, AuctionHouseHandle, Config, SystemClock};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

const TEST_IDLE_TAX: f64 = 20.0;

/// A role with no recipe at all -- every tick is an idle tick.
#[derive(Clone, Copy)]
struct NeverProduces;

impl Role for NeverProduces {
    fn class_name(&self) -> &'static str {
        "idler"
    }

    fn tick(&mut self, ops: &dyn TraderOps, cost_acc: &mut f64, _rng: &mut dyn rand::RngCore) {
        ops.force_take_money(TEST_IDLE_TAX);
        *cost_acc += TEST_IDLE_TAX;
    }

    fn ideal_inventory(&self) -> Vec<(&'static str, u64)> {
        vec![]
    }
}

impl RoleCatalog for NeverProduces {
    fn for_commodity(_commodity: &str) -> Option<Self> {
        None
    }

    fn commodities() -> &'static [&'static str] {
        &[]
    }
}

fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    predicate()
}

/// Starting with two ticks' worth of money, the idler loses `TEST_IDLE_TAX`
/// per tick and self-destructs the instant its balance reaches zero, sending
/// exactly one `ShutdownNotify` to the auction house.
#[test]
fn idle_agent_self_destructs_after_exhausting_its_balance() {
    let clock = Arc::new(SystemClock);
    let house = Arc::new(AuctionHouseHandle::new(Config::default(), clock.clone()));
    let house_weak: Weak<AuctionHouseHandle> = Arc::downgrade(&house);

    let (pump, clearing) = AuctionHouseHandle::spawn(house.clone(), 2_000);

    let handle = Arc::new(AgentHandle::new(1, "idler", TEST_IDLE_TAX * 2.0, 100.0, 50, 64));
    let runtime = AgentRuntime::new(handle.clone(), NeverProduces, house_weak, Config::default(), clock, 5);
    let agent_thread = runtime.spawn();

    let destroyed = wait_until(|| handle.is_destroyed(), Duration::from_millis(500));
    assert!(destroyed, "agent should self-destruct once its balance is exhausted");

    let notified = wait_until(|| house.total_deaths() == 1, Duration::from_millis(500));
    assert!(notified, "exactly one ShutdownNotify should reach the auction house");
    assert_eq!(house.known_trader_count(), 0);
    assert!(handle.balance() <= 0.0);

    house.shutdown();
    agent_thread.join().expect("agent thread panicked");
    pump.join().expect("pump thread panicked");
    clearing.join().expect("clearing thread panicked");
}
