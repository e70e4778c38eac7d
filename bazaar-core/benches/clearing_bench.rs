use bazaar_core::agent::TraderOps;
use bazaar_core::{AgentHandle, Commodity, Config, ManualClock};
use bazaar_core::auction_house::AuctionHouseHandle;
use bazaar_core::message::{Message, Offer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn populated_house(agent_count: u64) -> (Arc<AuctionHouseHandle>, Vec<Arc<AgentHandle>>) {
    let clock = Arc::new(ManualClock::new(0));
    let house = Arc::new(AuctionHouseHandle::new(Config::default(), clock));
    house.register_commodity(Commodity::new("widget", 1.0));

    let mut agents = Vec::with_capacity(agent_count as usize);
    for id in 1..=agent_count {
        let agent = Arc::new(AgentHandle::new(id, "trader", 10_000.0, 10_000.0, 50, 256));
        agent.register_commodity("widget", 1.0, 0);
        agent.try_add_commodity("widget", 100, Some(1.0), false);
        house.receive(Message::RegisterRequest(agent.clone()));
        agents.push(agent);
    }
    house.pump_once();
    (house, agents)
}

/// Half the agents ask, half bid, alternating price ladders that guarantee a
/// crossing spread, roughly matching the order-book shape the clearing loop
/// sees under steady load.
fn post_crossing_book(house: &AuctionHouseHandle, agents: &[Arc<AgentHandle>]) {
    let half = agents.len() / 2;
    for (i, agent) in agents.iter().enumerate() {
        let offer = Offer {
            sender: agent.id(),
            commodity: "widget".into(),
            quantity: 5,
            unit_price: if i < half { 9.0 + (i as f64 * 0.001) } else { 11.0 - (i as f64 * 0.001) },
            expiry_ms: 1_000_000,
        };
        if i < half {
            house.receive(Message::Ask(offer));
        } else {
            house.receive(Message::Bid(offer));
        }
    }
    house.pump_once();
}

fn bench_clear_tick(c: &mut Criterion) {
    for &agent_count in &[10u64, 100, 500] {
        let (house, agents) = populated_house(agent_count);
        c.bench_function(&format!("clearing/clear_tick_{agent_count}_agents"), |b| {
            b.iter(|| {
                post_crossing_book(&house, &agents);
                black_box(house.clear_tick());
            })
        });
    }
}

fn bench_registration(c: &mut Criterion) {
    c.bench_function("clearing/register_single_agent", |b| {
        let clock = Arc::new(ManualClock::new(0));
        let house = Arc::new(AuctionHouseHandle::new(Config::default(), clock));
        let mut next_id = 1u64;
        b.iter(|| {
            let agent = Arc::new(AgentHandle::new(next_id, "trader", 100.0, 100.0, 50, 64));
            next_id += 1;
            house.receive(Message::RegisterRequest(agent));
            black_box(house.pump_once());
        })
    });
}

criterion_group!(benches, bench_clear_tick, bench_registration);
criterion_main!(benches);
