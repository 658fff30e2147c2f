//! Stress tests for manet-routing
//!
//! These tests drive many routers through floods over line and grid
//! topologies and hammer the routing table with updates.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use manet_core::{Addressing, Frame, NodeId, SeqNo, SimTime};
use manet_routing::{AodvRouter, RouteUpdate, RouterAction, RouterConfig, RoutingTable};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Deliver every transmitted frame to the neighbors `adjacent` allows,
/// one hop per 100us, until nothing is left in flight.
fn drain<F>(routers: &mut [AodvRouter], initial: Vec<RouterAction>, origin: usize, adjacent: F)
where
    F: Fn(usize, usize) -> bool,
{
    let mut rng = StdRng::seed_from_u64(7);
    let mut queue: VecDeque<(usize, Frame, u64)> = VecDeque::new();

    let enqueue = |queue: &mut VecDeque<(usize, Frame, u64)>,
                   sender: usize,
                   actions: Vec<RouterAction>,
                   step: u64| {
        for action in actions {
            if let RouterAction::Transmit { frame, .. } = action {
                queue.push_back((sender, frame, step + 1));
            }
        }
    };

    enqueue(&mut queue, origin, initial, 0);
    while let Some((sender, frame, step)) = queue.pop_front() {
        let now = SimTime::from_micros(step * 100);
        let receivers: Vec<usize> = match frame.to {
            Addressing::Broadcast => (0..routers.len())
                .filter(|&r| r != sender && adjacent(sender, r))
                .collect(),
            Addressing::Unicast(to) => {
                let to = to.0 as usize;
                if adjacent(sender, to) { vec![to] } else { vec![] }
            }
        };
        for receiver in receivers {
            let actions = routers[receiver].on_receive(frame.clone(), now, &mut rng);
            enqueue(&mut queue, receiver, actions, step);
        }
    }
}

fn make_routers(count: u32) -> Vec<AodvRouter> {
    NodeId::range(count)
        .into_iter()
        .map(|id| AodvRouter::new(id, RouterConfig::default()))
        .collect()
}

#[test]
fn test_routing_table_throughput() {
    const UPDATES: u32 = 10_000;
    const DESTINATIONS: u32 = 1_000;

    let table = RoutingTable::new(Duration::from_secs(3));
    let now = SimTime::ZERO;

    let start = Instant::now();
    for i in 0..UPDATES {
        let update = RouteUpdate {
            destination: NodeId(i % DESTINATIONS),
            next_hop: NodeId(i % 7),
            hop_count: (i % 10) as u8 + 1,
            seq: SeqNo(i / DESTINATIONS + 1),
        };
        table
            .update(update, Duration::from_secs(3), now)
            .expect("every pass carries a newer sequence number");
    }
    println!("Applied {} updates in {:?}", UPDATES, start.elapsed());

    assert_eq!(table.len(), DESTINATIONS as usize);
    for dest in 0..DESTINATIONS {
        assert_eq!(
            table.last_known_seq(NodeId(dest)),
            Some(SeqNo(UPDATES / DESTINATIONS))
        );
    }
}

#[test]
fn test_line_flood_forwards_each_request_once() {
    const NODES: u32 = 20;
    let mut routers = make_routers(NODES);
    let destination = NodeId(NODES - 1);

    let initial = routers[0].discover(destination, SimTime::ZERO);
    drain(&mut routers, initial, 0, |a, b| a.abs_diff(b) == 1);

    let route = routers[0]
        .route_to(destination, SimTime::from_millis(10))
        .expect("route discovered");
    assert_eq!(route.next_hop, NodeId(1));
    assert_eq!(route.hop_count, (NODES - 1) as u8);

    for router in &routers[1..(NODES - 1) as usize] {
        assert_eq!(router.stats().requests_forwarded, 1, "{}", router.id());
        assert_eq!(router.stats().replies_forwarded, 1, "{}", router.id());
    }
    assert_eq!(routers[(NODES - 1) as usize].stats().replies_sent, 1);

    // Every node on the path knows both directions
    let later = SimTime::from_millis(10);
    for (i, router) in routers.iter().enumerate().skip(1).take((NODES - 2) as usize) {
        assert_eq!(router.route_to(NodeId(0), later).unwrap().hop_count, i as u8);
        assert_eq!(
            router.route_to(destination, later).unwrap().hop_count,
            (NODES as usize - 1 - i) as u8
        );
    }
}

#[test]
fn test_grid_flood_suppresses_duplicates() {
    const SIDE: usize = 6;
    let mut routers = make_routers((SIDE * SIDE) as u32);
    let adjacent = |a: usize, b: usize| {
        let (ax, ay) = (a % SIDE, a / SIDE);
        let (bx, by) = (b % SIDE, b / SIDE);
        ax.abs_diff(bx) + ay.abs_diff(by) == 1
    };
    let destination = NodeId((SIDE * SIDE - 1) as u32);

    let initial = routers[0].discover(destination, SimTime::ZERO);
    drain(&mut routers, initial, 0, adjacent);

    let route = routers[0]
        .route_to(destination, SimTime::from_millis(10))
        .expect("route discovered");
    assert_eq!(route.hop_count, (2 * (SIDE - 1)) as u8);

    let mut duplicates = 0;
    for router in &routers[1..SIDE * SIDE - 1] {
        assert!(router.stats().requests_forwarded <= 1, "{}", router.id());
        duplicates += router.stats().duplicates_dropped;
    }
    assert!(duplicates > 0);
    assert_eq!(routers[SIDE * SIDE - 1].stats().replies_sent, 1);
}

#[test]
fn test_many_sequential_discoveries() {
    const NODES: u32 = 8;
    let mut routers = make_routers(NODES);

    for target in 1..NODES {
        let initial = routers[0].discover(NodeId(target), SimTime::ZERO);
        drain(&mut routers, initial, 0, |a, b| a.abs_diff(b) == 1);
    }

    let now = SimTime::from_millis(1);
    for target in 1..NODES {
        let route = routers[0].route_to(NodeId(target), now).unwrap();
        assert_eq!(route.hop_count, target as u8);
    }
    assert_eq!(routers[0].samples().len(), (NODES - 1) as usize);
}
