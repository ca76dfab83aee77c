//! Performance benchmarks for the validation and simulation hot paths

use server::game::World;
use server::state::ServerState;
use shared::geometry::point_segment_distance;
use shared::{ClientCommand, InfraKind, Point, Segment, ServerMessage};
use std::time::Instant;

/// A grid of roads `size` blocks wide, 32 units apart
fn road_grid(size: usize) -> World {
    let mut world = World::new(1_000_000_000.0);
    let extent = size as f32 * 32.0;
    for i in 0..=size {
        let offset = i as f32 * 32.0;
        for (start, end) in [
            (Point::new(offset, 0.0), Point::new(offset, extent)),
            (Point::new(0.0, offset), Point::new(extent, offset)),
        ] {
            world
                .add_infrastructure(Segment {
                    start,
                    end,
                    kind: InfraKind::Road,
                    owner: "bench".to_string(),
                })
                .unwrap();
        }
    }
    world
}

/// Benchmarks point-to-segment distance, the core of every road check
#[test]
fn benchmark_point_segment_distance() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(320.0, 64.0);

    let iterations = 100_000;
    let start = Instant::now();

    let mut total = 0.0;
    for i in 0..iterations {
        let p = Point::new((i % 400) as f32, (i % 90) as f32);
        total += point_segment_distance(p, a, b);
    }

    let duration = start.elapsed();
    println!(
        "Point-segment distance: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(total > 0.0);
    assert!(duration.as_millis() < 500);
}

/// Benchmarks route validation against a dense road network
#[test]
fn benchmark_route_validation() {
    let world = road_grid(20);
    // Staircase along the grid lines, and the same corners joined diagonally
    let staircase: Vec<Point> = (0..=20)
        .flat_map(|i| {
            let d = i as f32 * 32.0;
            [Point::new(d, d), Point::new(d + 32.0, d)]
        })
        .take(40)
        .collect();
    let diagonal: Vec<Point> = (0..=20)
        .map(|i| Point::new(i as f32 * 32.0, i as f32 * 32.0))
        .collect();

    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        assert!(world.is_route_on_roads(&staircase));
        assert!(!world.is_route_on_roads(&diagonal));
    }

    let duration = start.elapsed();
    println!(
        "Route validation: {} iterations over {} roads in {:?}",
        iterations,
        world.lines.len(),
        duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks one bus tick with many buses in flight
#[test]
fn benchmark_bus_simulation() {
    let mut world = road_grid(10);
    for i in 0..=10 {
        let d = i as f32 * 32.0;
        world
            .add_bus_route("bench", vec![Point::new(0.0, d), Point::new(320.0, d)])
            .unwrap();
        world
            .add_bus_route("bench", vec![Point::new(d, 0.0), Point::new(d, 320.0)])
            .unwrap();
    }
    let bus_count = world.buses.len();

    let ticks = 2_000;
    let start = Instant::now();

    let mut laps = 0;
    for _ in 0..ticks {
        laps += world
            .step_buses(0.05)
            .iter()
            .filter(|update| update.lap_completed)
            .count();
    }

    let duration = start.elapsed();
    println!(
        "Bus simulation: {} ticks of {} buses in {:?} ({} laps)",
        ticks, bus_count, duration, laps
    );

    assert!(laps > 0);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks decoding inbound command lines
#[test]
fn benchmark_command_parsing() {
    let lines = [
        "C:p1:123:456",
        "I:p1:0:0:320:0:0",
        "B:p1:64:64:1",
        "R:p1:0:0:320:0:320:320:0:320",
        "D:p1:100:4",
        "PING",
    ];

    let iterations = 20_000;
    let start = Instant::now();

    for _ in 0..iterations {
        for line in &lines {
            assert!(ClientCommand::parse(line).is_some());
        }
    }

    let duration = start.elapsed();
    println!(
        "Command parsing: {} lines in {:?}",
        iterations * lines.len(),
        duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks building the full-state resend for a large city
#[test]
fn benchmark_snapshot_encoding() {
    let mut world = road_grid(30);
    for i in 0..200 {
        let position = Point::new((i % 30) as f32 * 32.0 + 16.0, (i / 30) as f32 * 32.0 + 16.0);
        world.add_building("bench", position, i % 3).unwrap();
    }

    let iterations = 100;
    let start = Instant::now();

    let mut bytes = 0;
    for _ in 0..iterations {
        let encoded: Vec<String> = world.snapshot().iter().map(|m| m.to_string()).collect();
        bytes += encoded.iter().map(|line| line.len() + 1).sum::<usize>();
        assert_eq!(
            encoded.last().map(String::as_str),
            Some("STATE_SYNCED")
        );
    }

    let duration = start.elapsed();
    println!(
        "Snapshot encoding: {} resends ({} bytes) in {:?}",
        iterations, bytes, duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Stress test: many rapid edits from one player through the command handler
#[test]
fn stress_test_command_handling() {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Notify};

    let mut state = ServerState::new(1_000_000.0);
    let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let (tx, mut rx) = mpsc::channel(server::client_manager::OUTBOUND_QUEUE_LINES);
    let conn = state.clients.register(addr, tx, Arc::new(Notify::new()));
    server::commands::handle_line(&mut state, conn, "JOIN:p1:Bench");

    let edits = 5_000;
    let start = Instant::now();

    for i in 0..edits {
        let y = (i % 100) * 32;
        server::commands::handle_line(&mut state, conn, &format!("I:p1:0:{y}:320:{y}:0"));
    }

    let duration = start.elapsed();
    println!("Command handling: {} edits in {:?}", edits, duration);

    assert_eq!(state.world.lines.len(), edits);
    let mut echoed = 0;
    while let Ok(line) = rx.try_recv() {
        if matches!(ServerMessage::parse(&line), Some(ServerMessage::Infrastructure { .. })) {
            echoed += 1;
        }
    }
    assert_eq!(echoed, edits);
    assert!(duration.as_millis() < 3000);
}
