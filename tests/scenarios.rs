use epigrid::{Config, Engine, SimError, Status};
use std::collections::HashMap;

fn config(n_agents: usize, width: usize, height: usize, wrap_around: bool) -> Config {
    let mut cfg = Config::default();
    cfg.init.n_agents = n_agents;
    cfg.grid.width = width;
    cfg.grid.height = height;
    cfg.grid.wrap_around = wrap_around;
    cfg
}

fn count(engine: &Engine, status: Status) -> usize {
    engine.agents().filter(|agt| agt.status() == status).count()
}

#[test]
fn population_plus_deaths_is_conserved() {
    for (seed, wrap_around) in [(1, true), (2, false)] {
        let mut cfg = config(200, 20, 20, wrap_around);
        cfg.model.transmission_probability = 0.8;
        cfg.model.death_probability = 0.5;
        let mut engine = Engine::from_seed(cfg, seed).unwrap();

        let mut prev_population = engine.population();
        for _ in 0..60 {
            engine.step().unwrap();
            let rec = engine.metrics().last().unwrap();
            assert!(rec.population <= prev_population);
            assert_eq!(rec.population + rec.deaths, 200);
            assert_eq!(rec.population, engine.grid().len());
            prev_population = rec.population;
        }
        let deaths = engine.series("deaths").unwrap();
        assert!(deaths.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn timers_match_status_at_every_tick() {
    let mut cfg = config(150, 15, 15, true);
    cfg.model.incubation_ticks = 3;
    cfg.model.recovery_ticks = 4;
    cfg.model.death_probability = 0.2;
    let mut engine = Engine::from_seed(cfg, 3).unwrap();

    for _ in 0..40 {
        engine.step().unwrap();
        for agt in engine.agents() {
            assert!(agt.is_consistent(), "inconsistent timers: {agt:?}");
            assert!(!(agt.incubation().is_some() && agt.recovery().is_some()));
        }
    }
}

#[test]
fn only_previously_sick_agents_infect() {
    let mut cfg = config(300, 12, 12, true);
    cfg.model.transmission_probability = 0.7;
    cfg.model.incubation_ticks = 1;
    cfg.model.recovery_ticks = 2;
    let mut engine = Engine::from_seed(cfg, 4).unwrap();

    for _ in 0..30 {
        let before: HashMap<_, _> = engine
            .agents()
            .map(|agt| (agt.id(), agt.status()))
            .collect();
        engine.step().unwrap();
        for agt in engine.agents() {
            if agt.infections() > 0 {
                assert_eq!(agt.status(), Status::Infectious);
                assert!(before[&agt.id()].is_sick());
            }
        }
    }
}

#[test]
fn certain_transmission_on_single_cell_infects_everyone_at_once() {
    let mut cfg = config(5, 1, 1, false);
    cfg.model.transmission_probability = 1.0;
    cfg.model.incubation_ticks = 1;
    cfg.model.recovery_ticks = 3;
    cfg.model.infection_radius = 0;
    let mut engine = Engine::from_seed(cfg, 5).unwrap();

    engine.step().unwrap();
    assert_eq!(count(&engine, Status::Healthy), 0);
    assert_eq!(count(&engine, Status::Infectious), 1);
    assert_eq!(count(&engine, Status::Incubating), 4);

    let rec = engine.metrics().last().unwrap();
    assert_eq!(rec.new_infections, 4);
    assert_eq!(rec.mean_infections_per_infectious, 4.0);
    assert_eq!(rec.sick, 5);
    assert_eq!(rec.mean_nearest_distance, 0.0);
}

#[test]
fn no_deaths_without_death_probability() {
    let mut cfg = config(100, 10, 10, true);
    cfg.model.transmission_probability = 1.0;
    cfg.model.death_probability = 0.0;
    let mut engine = Engine::from_seed(cfg, 6).unwrap();

    engine.run(50).unwrap();
    assert_eq!(engine.deaths(), 0);
    assert_eq!(engine.population(), 100);
    assert_eq!(count(&engine, Status::Dead), 0);
}

#[test]
fn certain_death_kills_every_recovering_agent() {
    let mut cfg = config(5, 1, 1, true);
    cfg.model.transmission_probability = 1.0;
    cfg.model.death_probability = 1.0;
    cfg.model.incubation_ticks = 1;
    cfg.model.recovery_ticks = 1;
    let mut engine = Engine::from_seed(cfg, 7).unwrap();

    engine.run(3).unwrap();
    assert_eq!(engine.population(), 0);
    assert_eq!(engine.deaths(), 5);
    assert_eq!(engine.series("deaths").unwrap(), [0.0, 1.0, 5.0]);
    assert_eq!(engine.series("population").unwrap(), [5.0, 4.0, 0.0]);

    // An empty population keeps stepping without errors.
    engine.step().unwrap();
    let rec = engine.metrics().last().unwrap();
    assert_eq!(rec.reproduction_estimate, 0.0);
    assert!(engine.snapshot().iter().flatten().all(|&code| code == 0));
}

#[test]
fn whole_grid_outbreak_ends_immune_after_three_ticks() {
    for seed in 0..10 {
        let mut cfg = config(10, 5, 5, true);
        cfg.model.incubation_ticks = 1;
        cfg.model.recovery_ticks = 1;
        cfg.model.death_probability = 0.0;
        cfg.model.transmission_probability = 1.0;
        cfg.model.infection_radius = 5;
        let mut engine = Engine::from_seed(cfg, seed).unwrap();

        engine.run(3).unwrap();
        assert_eq!(count(&engine, Status::Immune), 10, "seed {seed}");
        assert_eq!(engine.deaths(), 0);
    }
}

#[test]
fn lone_agent_is_seeded_and_never_infects() {
    let mut cfg = config(1, 6, 6, false);
    cfg.model.transmission_probability = 1.0;
    let mut engine = Engine::from_seed(cfg, 8).unwrap();
    assert_eq!(count(&engine, Status::Incubating), 1);

    engine.run(10).unwrap();
    assert!(
        engine
            .series("mean_nearest_distance")
            .unwrap()
            .iter()
            .all(|&dist| dist == 0.0)
    );
    assert!(
        engine
            .series("new_infections")
            .unwrap()
            .iter()
            .all(|&n| n == 0.0)
    );
    assert_eq!(engine.population() + engine.deaths(), 1);
}

/// Chebyshev distance between two cells, measured around the torus when it wraps.
fn cell_distance(a: (usize, usize), b: (usize, usize), size: (usize, usize), wrap: bool) -> usize {
    let axis = |p: usize, q: usize, len: usize| {
        let d = p.abs_diff(q);
        if wrap { d.min(len - d) } else { d }
    };
    axis(a.0, b.0, size.0).max(axis(a.1, b.1, size.1))
}

#[test]
fn moves_stay_within_radius_and_infectious_agents_hold_still() {
    for (seed, wrap_around) in [(12, true), (13, false)] {
        let mut cfg = config(200, 9, 7, wrap_around);
        cfg.model.move_radius = 2;
        cfg.model.transmission_probability = 0.6;
        cfg.model.death_probability = 0.1;
        let mut engine = Engine::from_seed(cfg, seed).unwrap();

        let grid = engine.grid();
        let size = (grid.width(), grid.height());
        let wrap = grid.wrap_around();
        assert_eq!(wrap, wrap_around);
        let move_radius = engine.config().model.move_radius;

        let mut n_moves = 0;
        let mut n_held = 0;
        for _ in 0..30 {
            let before: HashMap<_, _> = engine
                .agents()
                .map(|agt| {
                    let cell = engine.grid().position(agt.id()).unwrap();
                    (agt.id(), (agt.status(), cell))
                })
                .collect();
            engine.step().unwrap();

            for agt in engine.agents() {
                let (status_before, cell_before) = before[&agt.id()];
                let cell_after = engine.grid().position(agt.id()).unwrap();
                let dist = cell_distance(cell_before, cell_after, size, wrap);
                assert!(
                    dist <= move_radius,
                    "agent {} jumped {dist} cells (wrap {wrap})",
                    agt.id()
                );
                if dist > 0 {
                    n_moves += 1;
                }
                if status_before == Status::Infectious && agt.status() == Status::Infectious {
                    assert_eq!(cell_before, cell_after, "infectious agent {} moved", agt.id());
                    n_held += 1;
                }
            }
        }
        assert!(n_moves > 0);
        assert!(n_held > 0);
    }
}

#[test]
fn snapshot_is_idempotent_and_sized_to_grid() {
    let mut engine = Engine::from_seed(config(40, 7, 4, false), 9).unwrap();
    engine.run(5).unwrap();

    let snap = engine.snapshot();
    assert_eq!(snap, engine.snapshot());
    assert_eq!(snap.len(), 7);
    assert!(snap.iter().all(|col| col.len() == 4));

    let n_occupied = snap.iter().flatten().filter(|&&code| code != 0).count();
    assert!(n_occupied <= engine.population());
    assert!(snap.iter().flatten().all(|&code| code <= 4));

    for agt in engine.agents() {
        let (x, y) = engine.grid().position(agt.id()).unwrap();
        assert_ne!(snap[x][y], 0);
    }
}

#[test]
fn spread_clusters_around_infectious_agents() {
    let mut cfg = config(400, 20, 20, true);
    cfg.model.transmission_probability = 1.0;
    cfg.model.infection_radius = 1;
    cfg.model.move_radius = 1;
    cfg.model.death_probability = 0.0;
    let mut engine = Engine::from_seed(cfg, 10).unwrap();

    engine.run(30).unwrap();
    let total_infections: f64 = engine.series("new_infections").unwrap().iter().sum();
    assert!(total_infections > 0.0);
    assert!(
        engine
            .metrics()
            .iter()
            .all(|rec| rec.reproduction_estimate >= 0.0 && rec.mean_nearest_distance >= 0.0)
    );
}

#[test]
fn invalid_probability_is_reported() {
    let mut cfg = config(10, 5, 5, true);
    cfg.model.death_probability = -0.1;
    let err = Engine::from_seed(cfg, 11).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::InvalidConfiguration(_))
    ));
}
