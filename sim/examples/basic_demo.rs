//! Basic demonstration of the Gridsight interest manager.
//!
//! Run with: cargo run --example basic_demo
//! Set RUST_LOG=debug to watch scans, LOG_FORMAT=json for structured output.

use gridsight_sim::{InterestConfig, ServerConfig, ServerWorld, SubscriptionEvent, Vec3};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn main() {
    init_tracing();
    println!("=== Gridsight - Interest Management Demo ===\n");

    let config = ServerConfig {
        fixed_timestep: 0.05,
        interest: InterestConfig {
            cell_size: 50.0,
            update_interval: 0.5,
            ..Default::default()
        },
    };
    let mut server = match ServerWorld::new(config) {
        Ok(server) => server,
        Err(err) => {
            eprintln!("invalid config: {err}");
            return;
        }
    };

    // Two players on opposite sides of the map.
    for player in [1, 2] {
        server.connect_player(player);
        server.set_player_ready(player, true);
    }
    let _ = server.spawn_entity(1, Vec3::new(-200.0, 0.0, 0.0), 80.0, Some(1));
    let _ = server.spawn_entity(2, Vec3::new(200.0, 0.0, 0.0), 80.0, Some(2));

    // A line of scenery between them.
    for i in 0..9u32 {
        let x = -200.0 + i as f32 * 50.0;
        let _ = server.spawn_entity(100 + i, Vec3::new(x, 0.0, 30.0), 60.0, None);
    }

    // Walk player 1's avatar east across the map.
    for step in 0..80 {
        let x = -200.0 + step as f32 * 5.0;
        server.move_entity(1, Vec3::new(x, 0.0, 0.0));
        server.step(0.05);

        for event in server.drain_events() {
            match event {
                SubscriptionEvent::Added { subscriber, entity } => {
                    println!("t={:.2}s  player {} + entity {}", server.current_time(), subscriber.player, entity)
                }
                SubscriptionEvent::Removed { subscriber, entity } => {
                    println!("t={:.2}s  player {} - entity {}", server.current_time(), subscriber.player, entity)
                }
                SubscriptionEvent::SubscribersChanged { .. } => {}
            }
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    let snapshot = server.snapshot();
    println!("{}", snapshot.to_json_pretty().unwrap_or_else(|_| "{}".to_string()));

    if let Some(manager) = server.manager() {
        println!("\n{}", manager.profiler().summary());
    }
}
