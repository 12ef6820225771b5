use physim::configuration::config::{
    AppliedForceConfig, AxisRange, BodyConfig, ControlConfig, ControlValue, ForceMode, GraphConfig,
    LineConfig, ObjectConfig, OutputGroupConfig, OutputValueConfig, SceneConfig, Vec2Config, Wall,
};
use physim::simulation::clock::{ClockState, MAX_STEPS_PER_FRAME};
use physim::simulation::engine::{PhysicsEngine, ShapeDesc};
use physim::simulation::property::Property;
use physim::simulation::units::{Unit, UnitConverter};
use physim::{export_csv, tracked_objects, ExportError, NVec2, RapierWorld, SimError, Simulation};

use approx::assert_relative_eq;
use std::path::PathBuf;

/// Ball of radius 1 at (40, 30) in a 80 × 60 m box with no walls
pub fn ball_scene(gravity: f64) -> SceneConfig {
    let mut cfg = SceneConfig::new("ball");
    cfg.environment.gravity = gravity;
    cfg.objects.push(ObjectConfig::new("ball", 40.0, 30.0, BodyConfig::circle(1.0)));
    cfg
}

/// Line graph with one line per `(label, target, property)`
pub fn line_graph(title: &str, lines: &[(&str, &str, &str)]) -> GraphConfig {
    GraphConfig {
        kind: "line".into(),
        title: title.into(),
        y_axis_range: Some(AxisRange { min: -10.0, max: 10.0 }),
        y_axis_label: None,
        lines: lines
            .iter()
            .map(|(label, target, property)| LineConfig {
                label: label.to_string(),
                color: "#ffffff".into(),
                target_obj: target.to_string(),
                property: property.to_string(),
            })
            .collect(),
    }
}

/// Load a scene into a fresh rapier-backed runtime
pub fn load(cfg: SceneConfig) -> Simulation<RapierWorld> {
    let mut sim = Simulation::new(RapierWorld::default());
    sim.load(cfg).expect("scene loads");
    sim
}

/// First callback at t = 0, then play
pub fn start(sim: &mut Simulation<RapierWorld>) -> f64 {
    sim.frame(0.0).unwrap();
    sim.play().unwrap();
    0.0
}

/// Exactly `n` ticks, one per callback
pub fn run_ticks(sim: &mut Simulation<RapierWorld>, now: &mut f64, n: usize) {
    for _ in 0..n {
        *now += sim.step_ms();
        let report = sim.frame(*now).unwrap();
        assert_eq!(report.steps, 1);
    }
}

fn scene_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenes").join(name)
}

// ==================================================================================
// Unit conversion
// ==================================================================================

#[test]
fn conversions_round_trip() {
    for (unit, ppu) in [(Unit::M, 10.0), (Unit::Cm, 0.5), (Unit::Ft, 33.3)] {
        let u = UnitConverter::new(unit, ppu).unwrap();
        for v in [-123.456, 0.0, 1e-3, 7.25, 4096.0] {
            assert_relative_eq!(u.from_pixels_x(u.to_pixels_x(v)), v, epsilon = 1e-9);
            assert_relative_eq!(u.from_pixels_y(u.to_pixels_y(v)), v, epsilon = 1e-9);
            assert_relative_eq!(u.from_pixels_velocity_x(u.to_pixels_velocity_x(v)), v, epsilon = 1e-9);
            assert_relative_eq!(u.from_pixels_velocity_y(u.to_pixels_velocity_y(v)), v, epsilon = 1e-9);
            assert_relative_eq!(u.from_pixels_dimension(u.to_pixels_dimension(v)), v, epsilon = 1e-9);
            for p in Property::ALL {
                assert_relative_eq!(
                    u.from_pixels_property(p, u.to_pixels_property(p, v)),
                    v,
                    epsilon = 1e-9
                );
            }
        }
    }
}

#[test]
fn y_axis_is_flipped() {
    let u = UnitConverter::new(Unit::M, 10.0).unwrap();
    let (_, height) = u.simulation_dimensions();
    assert_eq!(u.to_pixels_y(0.0), u.canvas_height);
    assert_relative_eq!(u.to_pixels_y(height), 0.0, epsilon = 1e-9);
    // up in the world is negative velocity in the engine
    assert!(u.to_pixels_velocity_y(5.0) < 0.0);
    assert_relative_eq!(u.to_pixels_force_y(2.0), -u.to_pixels_force_x(2.0), epsilon = 1e-15);
}

#[test]
fn gravity_scale_is_linear() {
    let u = UnitConverter::new(Unit::M, 10.0).unwrap();
    assert_eq!(u.to_engine_gravity_scale(0.0), 0.0);
    assert_relative_eq!(
        u.to_engine_gravity_scale(19.6),
        2.0 * u.to_engine_gravity_scale(9.8),
        epsilon = 1e-15
    );
}

#[test]
fn scene_coordinates_land_on_the_canvas() {
    let mut cfg = SceneConfig::new("placement");
    cfg.objects.push(ObjectConfig::new("box", 4.0, 3.0, BodyConfig::rectangle(1.0, 1.0)));
    let sim = load(cfg);

    let s = sim.body_state("box").unwrap();
    assert_relative_eq!(s.position.x, 40.0, epsilon = 1e-9);
    assert_relative_eq!(s.position.y, 570.0, epsilon = 1e-9);
    assert_relative_eq!(sim.read_property("box", Property::PositionX).unwrap(), 4.0, epsilon = 1e-9);
    assert_relative_eq!(sim.read_property("box", Property::PositionY).unwrap(), 3.0, epsilon = 1e-9);
}

// ==================================================================================
// Clock and lifecycle
// ==================================================================================

#[test]
fn lifecycle_errors() {
    let mut sim = Simulation::new(RapierWorld::default());
    assert!(matches!(sim.play(), Err(SimError::NotLoaded)));
    assert_eq!(sim.frame(10.0).unwrap().steps, 0);

    sim.load(ball_scene(9.8)).unwrap();
    assert_eq!(sim.state(), ClockState::Ready);
    assert!(matches!(sim.load(ball_scene(9.8)), Err(SimError::AlreadyLoaded)));
}

#[test]
fn tick_count_ignores_callback_chunking() {
    let chunkings: [&[f64]; 3] = [&[10.0], &[20.0], &[5.0, 30.0, 15.0, 40.0, 10.0]];
    let mut results = Vec::new();
    for chunks in chunkings {
        let mut sim = load(ball_scene(9.8));
        let mut now = start(&mut sim);
        let mut elapsed = 0.0;
        let mut i = 0;
        while elapsed < 1000.0 {
            let dt = chunks[i % chunks.len()].min(1000.0 - elapsed);
            now += dt;
            elapsed += dt;
            sim.frame(now).unwrap();
            i += 1;
        }
        results.push((sim.ticks(), sim.body_state("ball").unwrap()));
    }
    assert_eq!(results[0].0, 59);
    for r in &results[1..] {
        assert_eq!(r.0, results[0].0);
        assert_eq!(r.1, results[0].1);
    }
}

#[test]
fn resume_after_long_pause_is_capped() {
    let mut sim = load(ball_scene(9.8));
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 10);

    sim.pause().unwrap();
    for _ in 0..100 {
        now += 100.0;
        assert_eq!(sim.frame(now).unwrap().steps, 0);
    }
    assert_eq!(sim.ticks(), 10);

    sim.play().unwrap();
    now += 10_000.0;
    let report = sim.frame(now).unwrap();
    assert!(report.steps <= MAX_STEPS_PER_FRAME);
    assert_eq!(report.state, ClockState::Running);
}

#[test]
fn reset_is_idempotent() {
    let mut cfg = ball_scene(9.8);
    cfg.objects[0].velocity = Some(Vec2Config::new(3.0, 4.0));
    cfg.objects[0].angular_velocity = Some(1.5);
    cfg.graphs.push(line_graph("y", &[("y", "ball", "position.y")]));
    let mut sim = load(cfg);
    let initial = sim.body_state("ball").unwrap();

    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 30);
    assert_ne!(sim.body_state("ball").unwrap(), initial);

    for _ in 0..2 {
        sim.reset().unwrap();
        let s = sim.body_state("ball").unwrap();
        assert_relative_eq!(s.position.x, initial.position.x, epsilon = 1e-9);
        assert_relative_eq!(s.position.y, initial.position.y, epsilon = 1e-9);
        assert_relative_eq!(s.velocity.x, initial.velocity.x, epsilon = 1e-9);
        assert_relative_eq!(s.velocity.y, initial.velocity.y, epsilon = 1e-9);
        assert_relative_eq!(s.angular_velocity, initial.angular_velocity, epsilon = 1e-9);
        assert_eq!(sim.ticks(), 0);
        assert_eq!(sim.sim_time(), 0.0);
        assert_eq!(sim.state(), ClockState::Ready);
        assert!(sim.graphs()[0].points().is_empty());
    }
}

// ==================================================================================
// Derived acceleration and graphs
// ==================================================================================

#[test]
fn acceleration_converges_to_gravity() {
    let mut cfg = ball_scene(9.8);
    cfg.objects[0].acceleration = Some(Vec2Config::new(0.0, -9.8));
    let mut sim = load(cfg);

    // declared value shows before the first tick
    assert_relative_eq!(sim.read_property("ball", Property::AccelerationY).unwrap(), -9.8, epsilon = 1e-9);

    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 1);
    assert_eq!(sim.read_property("ball", Property::AccelerationY).unwrap(), 0.0);

    run_ticks(&mut sim, &mut now, 5);
    assert_relative_eq!(sim.read_property("ball", Property::AccelerationY).unwrap(), -9.8, epsilon = 1e-3);
    assert_relative_eq!(sim.read_property("ball", Property::AccelerationX).unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn graph_time_strictly_increases() {
    let mut cfg = ball_scene(9.8);
    cfg.graphs.push(line_graph("motion", &[("y", "ball", "position.y"), ("vy", "ball", "velocity.y")]));
    let mut sim = load(cfg);
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 20);
    sim.pause().unwrap();
    now += 500.0;
    sim.frame(now).unwrap();
    sim.play().unwrap();
    run_ticks(&mut sim, &mut now, 20);

    let points = sim.graphs()[0].points();
    assert_eq!(points.len(), 40);
    assert!(points.windows(2).all(|w| w[1].time > w[0].time));
    assert_relative_eq!(points[39].time, sim.sim_time(), epsilon = 1e-12);
    // falling: vy only decreases
    assert!(points.windows(2).all(|w| w[1].values["vy"] <= w[0].values["vy"]));
}

// ==================================================================================
// Physics behaviour
// ==================================================================================

#[test]
fn head_on_collision_conserves_momentum() {
    let mut cfg = SceneConfig::new("collision");
    cfg.environment.gravity = 0.0;
    for (id, x, v, m) in [("a", 10.0, 5.0, 1.0), ("b", 20.0, -3.0, 2.0)] {
        let mut obj = ObjectConfig::new(id, x, 30.0, BodyConfig::circle(1.0));
        obj.velocity = Some(Vec2Config::new(v, 0.0));
        obj.mass = Some(m);
        obj.restitution = Some(1.0);
        obj.friction = Some(0.0);
        cfg.objects.push(obj);
    }
    let mut sim = load(cfg);

    let momentum = |sim: &Simulation<RapierWorld>| {
        ["a", "b"]
            .iter()
            .map(|id| {
                sim.read_property(id, Property::Mass).unwrap()
                    * sim.read_property(id, Property::VelocityX).unwrap()
            })
            .sum::<f64>()
    };
    let before = momentum(&sim);
    assert_relative_eq!(before, -1.0, epsilon = 1e-9);

    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 120);
    // they did collide
    assert!(sim.read_property("a", Property::VelocityX).unwrap() < 0.0);
    assert!((momentum(&sim) - before).abs() < 0.01);
}

#[test]
fn collision_with_density_masses_conserves_momentum() {
    let mut cfg = SceneConfig::new("collision");
    cfg.environment.gravity = 0.0;
    // circle area in px² times the default density gives masses 1 and 2
    for (id, x, v, m) in [("a", 10.0, 5.0, 1.0_f64), ("b", 20.0, -3.0, 2.0_f64)] {
        let radius = (m / (0.001 * std::f64::consts::PI)).sqrt() / 10.0;
        let mut obj = ObjectConfig::new(id, x, 30.0, BodyConfig::circle(radius));
        obj.velocity = Some(Vec2Config::new(v, 0.0));
        obj.restitution = Some(1.0);
        obj.friction = Some(0.0);
        cfg.objects.push(obj);
    }
    let mut sim = load(cfg);
    assert_relative_eq!(sim.read_property("a", Property::Mass).unwrap(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(sim.read_property("b", Property::Mass).unwrap(), 2.0, epsilon = 1e-9);

    let momentum = |sim: &Simulation<RapierWorld>| {
        ["a", "b"]
            .iter()
            .map(|id| {
                sim.read_property(id, Property::Mass).unwrap()
                    * sim.read_property(id, Property::VelocityX).unwrap()
            })
            .sum::<f64>()
    };
    let before = momentum(&sim);
    assert_relative_eq!(before, -1.0, epsilon = 1e-9);

    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 120);
    assert!(sim.read_property("a", Property::VelocityX).unwrap() < 0.0);
    assert!((momentum(&sim) - before).abs() < 0.01);
}

#[test]
fn continuous_force_accelerates_the_body() {
    let mut cfg = ball_scene(0.0);
    cfg.objects[0].mass = Some(1.0);
    cfg.objects[0].applied_force = Some(AppliedForceConfig {
        x: 10.0,
        y: 0.0,
        mode: ForceMode::Continuous,
        delay_ms: 0.0,
    });
    let mut sim = load(cfg);
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 30);

    let v = sim.read_property("ball", Property::VelocityX).unwrap();
    assert_relative_eq!(v, 10.0 * sim.sim_time(), max_relative = 1e-6);
}

#[test]
fn pause_holds_the_remaining_delay() {
    let mut cfg = ball_scene(0.0);
    cfg.objects[0].applied_force = Some(AppliedForceConfig {
        x: 10.0,
        y: 0.0,
        mode: ForceMode::Impulse,
        delay_ms: 500.0,
    });
    let mut sim = load(cfg);
    let mut now = start(&mut sim);
    assert_eq!(sim.pending_forces(), 1);

    run_ticks(&mut sim, &mut now, 12); // 200 ms
    sim.pause().unwrap();
    sim.play().unwrap();
    run_ticks(&mut sim, &mut now, 17); // 483 ms running
    assert_eq!(sim.pending_forces(), 1);
    assert_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), 0.0);

    run_ticks(&mut sim, &mut now, 3);
    assert_eq!(sim.pending_forces(), 0, "impulse fired once");
    assert!(sim.read_property("ball", Property::VelocityX).unwrap() > 0.0);
}

#[test]
fn resume_does_not_refire_impulses() {
    let mut cfg = ball_scene(0.0);
    cfg.objects[0].mass = Some(1.0);
    cfg.objects[0].applied_force = Some(AppliedForceConfig {
        x: 10.0,
        y: 0.0,
        mode: ForceMode::Impulse,
        delay_ms: 0.0,
    });
    let mut sim = load(cfg);
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 5);
    let kicked = sim.read_property("ball", Property::VelocityX).unwrap();
    assert!(kicked > 0.0);

    sim.pause().unwrap();
    sim.play().unwrap();
    run_ticks(&mut sim, &mut now, 5);
    assert_relative_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), kicked, epsilon = 1e-9);

    // reset starts the plan over
    sim.reset().unwrap();
    sim.frame(now).unwrap();
    sim.play().unwrap();
    run_ticks(&mut sim, &mut now, 1);
    assert_relative_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), kicked, epsilon = 1e-9);
}

// ==================================================================================
// Controls
// ==================================================================================

#[test]
fn controls_write_through_after_reset() {
    let mut cfg = ball_scene(0.0);
    cfg.controls.push(ControlConfig::slider("Speed", "ball", "velocity.x", (0.0, 10.0, 0.5), 2.0));
    cfg.controls.push(ControlConfig::toggle("Pinned", "ball", "isStatic", false));
    let mut sim = load(cfg);
    assert_relative_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), 2.0, epsilon = 1e-9);

    sim.set_control("Speed", ControlValue::Number(6.0)).unwrap();
    assert_relative_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), 6.0, epsilon = 1e-9);

    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 10);
    sim.reset().unwrap();
    // held value is pushed again
    assert_relative_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), 6.0, epsilon = 1e-9);

    sim.set_control("Speed", ControlValue::Number(8.0)).unwrap();
    assert_relative_eq!(sim.read_property("ball", Property::VelocityX).unwrap(), 8.0, epsilon = 1e-9);

    sim.set_control("Pinned", ControlValue::Bool(true)).unwrap();
    assert_eq!(sim.read_property("ball", Property::IsStatic), Some(1.0));
}

/// Ball under gravity with a `velocity.x` slider defaulting to 5
fn speed_slider_scene() -> SceneConfig {
    let mut cfg = ball_scene(9.8);
    cfg.controls.push(ControlConfig::slider("Speed", "ball", "velocity.x", (0.0, 10.0, 0.5), 5.0));
    cfg
}

fn assert_at_rest_with_slider_speed(sim: &Simulation<RapierWorld>) {
    let units = sim.units().unwrap();
    let state = sim.body_state("ball").unwrap();
    assert_relative_eq!(state.velocity.x, units.to_pixels_velocity_x(5.0), epsilon = 1e-9);
    assert_relative_eq!(state.velocity.y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(sim.read_property("ball", Property::PositionX).unwrap(), 40.0, epsilon = 1e-9);
    assert_eq!(sim.sim_time(), 0.0);
}

#[test]
fn reset_after_pause_rebinds_slider_value() {
    let mut sim = load(speed_slider_scene());
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 20);
    assert!(sim.read_property("ball", Property::VelocityY).unwrap() < 0.0);

    sim.pause().unwrap();
    sim.reset().unwrap();
    assert_eq!(sim.state(), ClockState::Ready);
    assert_at_rest_with_slider_speed(&sim);
}

#[test]
fn reset_before_play_keeps_slider_value() {
    let mut sim = load(speed_slider_scene());
    sim.reset().unwrap();
    assert_at_rest_with_slider_speed(&sim);
}

#[test]
fn dangling_targets_are_inert() {
    let mut cfg = ball_scene(9.8);
    cfg.controls.push(ControlConfig::slider("Ghost", "ghost", "mass", (1.0, 2.0, 0.1), 1.0));
    cfg.outputs.push(OutputGroupConfig {
        title: None,
        values: vec![
            OutputValueConfig {
                label: "Ghost height".into(),
                target_obj: "ghost".into(),
                property: "position.y".into(),
                unit: None,
            },
            OutputValueConfig {
                label: "Height".into(),
                target_obj: "ball".into(),
                property: "position.y".into(),
                unit: None,
            },
        ],
    });
    cfg.graphs.push(line_graph("g", &[("ghost", "ghost", "position.y"), ("y", "ball", "position.y")]));
    let mut sim = load(cfg);

    sim.set_control("Ghost", ControlValue::Number(1.5)).unwrap();
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 3);

    let outputs = sim.outputs();
    assert_eq!(outputs[0].value, None);
    assert_eq!(outputs[0].display_value(), "—");
    assert!(outputs[1].value.is_some());
    assert_eq!(outputs[1].unit, "m");
    let p = &sim.graphs()[0].points()[0];
    assert!(p.values.contains_key("y") && !p.values.contains_key("ghost"));
}

// ==================================================================================
// Scene assembly
// ==================================================================================

#[test]
fn bad_objects_are_skipped() {
    let mut cfg = SceneConfig::new("mixed");
    let bowtie = [(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)];
    cfg.objects.push(ObjectConfig::new("blob", 10.0, 10.0, BodyConfig { kind: "blob".into(), ..BodyConfig::default() }));
    cfg.objects.push(ObjectConfig::new(
        "bowtie",
        20.0,
        10.0,
        BodyConfig::vertex(bowtie.iter().map(|&(x, y)| Vec2Config::new(x, y)).collect()),
    ));
    cfg.objects.push(ObjectConfig::new("ok", 30.0, 10.0, BodyConfig::polygon(5, 1.0)));
    cfg.graphs.push(GraphConfig { kind: "pie".into(), ..line_graph("pie", &[]) });
    let sim = load(cfg);

    let ids: Vec<&str> = sim.scene().unwrap().objects().iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
    assert!(sim.graphs().is_empty());
    assert_eq!(sim.engine().body_count(), 1);
}

#[test]
fn concave_outline_becomes_convex_pieces() {
    let mut cfg = SceneConfig::new("ell");
    let ell = [(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (1.0, 1.0), (1.0, 4.0), (0.0, 4.0)];
    cfg.objects.push(ObjectConfig::new(
        "ell",
        20.0,
        20.0,
        BodyConfig::vertex(ell.iter().map(|&(x, y)| Vec2Config::new(x, y)).collect()),
    ));
    let sim = load(cfg);

    match &sim.scene().unwrap().object("ell").unwrap().shape {
        ShapeDesc::Compound { pieces, .. } => assert!(pieces.len() >= 2),
        other => panic!("expected compound shape, got {other:?}"),
    }
    // default mass follows the full area (7 m² = 700 px²)
    assert_relative_eq!(sim.read_property("ell", Property::Mass).unwrap(), 0.7, epsilon = 1e-9);
}

#[test]
fn teardown_leaves_the_engine_empty() {
    let mut sim = Simulation::new(RapierWorld::default());
    for _ in 0..3 {
        let mut cfg = ball_scene(9.8);
        cfg.environment.walls = [Wall::Left, Wall::Right, Wall::Bottom].into_iter().collect();
        sim.load(cfg).unwrap();
        assert_eq!(sim.engine().body_count(), 4);
        sim.teardown();
        assert_eq!(sim.engine().body_count(), 0);
        assert_eq!(sim.state(), ClockState::Idle);
        assert!(sim.snapshot().is_empty());
    }
}

#[test]
fn ball_rests_on_the_floor() {
    let mut cfg = ball_scene(9.8);
    cfg.environment.walls = [Wall::Bottom].into_iter().collect();
    cfg.objects[0].y = 5.0;
    cfg.objects[0].restitution = Some(0.0);
    let mut sim = load(cfg);
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 180);

    let y = sim.read_property("ball", Property::PositionY).unwrap();
    assert!((y - 1.0).abs() < 0.05, "ball centre at {y}");
}

// ==================================================================================
// Dragging
// ==================================================================================

#[test]
fn paused_drag_moves_the_body_to_the_pointer() {
    let mut cfg = ball_scene(9.8);
    cfg.objects[0].velocity = Some(Vec2Config::new(1.0, 0.0));
    let mut pinned = ObjectConfig::new("pinned", 10.0, 10.0, BodyConfig::rectangle(2.0, 2.0));
    pinned.is_static = Some(true);
    cfg.objects.push(pinned);
    let mut sim = load(cfg);

    assert_eq!(sim.begin_drag(NVec2::new(100.0, 500.0)), None, "static bodies stay put");
    assert_eq!(sim.begin_drag(NVec2::new(250.0, 50.0)), None);

    assert_eq!(sim.begin_drag(NVec2::new(403.0, 300.0)).as_deref(), Some("ball"));
    sim.move_drag(NVec2::new(503.0, 250.0)).unwrap();
    let s = sim.body_state("ball").unwrap();
    assert_relative_eq!(s.position.x, 500.0, epsilon = 1e-9);
    assert_relative_eq!(s.position.y, 250.0, epsilon = 1e-9);
    assert_eq!(s.velocity, NVec2::zeros());
    sim.end_drag();
    assert!(!sim.is_dragging());

    // the moved body is found where it now sits
    assert_eq!(sim.begin_drag(NVec2::new(500.0, 250.0)).as_deref(), Some("ball"));
}

#[test]
fn running_drag_pulls_toward_the_pointer() {
    let mut sim = load(ball_scene(0.0));
    let mut now = start(&mut sim);
    sim.begin_drag(NVec2::new(400.0, 300.0)).unwrap();
    sim.move_drag(NVec2::new(450.0, 300.0)).unwrap();
    run_ticks(&mut sim, &mut now, 10);
    assert!(sim.body_state("ball").unwrap().position.x > 400.0);
}

#[test]
fn releasing_a_drag_while_paused_stops_the_body() {
    let mut sim = load(ball_scene(0.0));
    let mut now = start(&mut sim);
    sim.begin_drag(NVec2::new(400.0, 300.0)).unwrap();
    sim.move_drag(NVec2::new(450.0, 300.0)).unwrap();
    run_ticks(&mut sim, &mut now, 10);
    assert!(sim.body_state("ball").unwrap().velocity.x > 0.0);

    sim.pause().unwrap();
    sim.end_drag();
    assert!(!sim.is_dragging());
    assert_eq!(sim.body_state("ball").unwrap().velocity, NVec2::zeros());
}

// ==================================================================================
// Export and scene files
// ==================================================================================

#[test]
fn csv_merges_lines_by_time() {
    let mut cfg = ball_scene(9.8);
    cfg.graphs.push(line_graph("height", &[("Height", "ball", "position.y")]));
    cfg.graphs.push(line_graph("speed", &[("vy", "ball", "velocity.y")]));
    let mut sim = load(cfg);
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 6);

    assert_eq!(tracked_objects(sim.graphs())["ball"], vec!["Height", "vy"]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ball.csv");
    let labels = vec!["Height".to_string(), "vy".to_string()];
    let rows = export_csv(sim.graphs(), "ball", &labels, std::fs::File::create(&path).unwrap()).unwrap();
    assert_eq!(rows, 6);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "time,Height,vy");
    assert_eq!(lines.len(), 7);
    assert!(lines[1].starts_with("0.0167,29.99"), "{}", lines[1]);
    assert_eq!(lines[1].split(',').count(), 3);

    assert!(matches!(
        export_csv(sim.graphs(), "ball", &[], std::io::sink()),
        Err(ExportError::NothingSelected)
    ));
    assert!(matches!(
        export_csv(sim.graphs(), "nobody", &labels, std::io::sink()),
        Err(ExportError::UnknownObject(_))
    ));
}

#[test]
fn bundled_scenes_load_and_run() {
    for name in ["toss_ball.json", "two_boxes.yaml"] {
        let cfg = SceneConfig::load(scene_path(name)).unwrap();
        assert!(cfg.dangling_references().is_empty(), "{name}");
        let mut sim = load(cfg);
        let mut now = start(&mut sim);
        run_ticks(&mut sim, &mut now, 60);
        assert!(sim.outputs().iter().all(|r| r.value.is_some()), "{name}");
        assert!(sim.graphs().iter().all(|g| g.points().len() == 60), "{name}");
    }
}

#[test]
fn toss_ball_goes_up_then_down() {
    let mut sim = load(SceneConfig::load(scene_path("toss_ball.json")).unwrap());
    let mut now = start(&mut sim);
    run_ticks(&mut sim, &mut now, 30);
    assert!(sim.read_property("ball", Property::PositionY).unwrap() > 5.0);
    run_ticks(&mut sim, &mut now, 90);
    assert!(sim.read_property("ball", Property::VelocityY).unwrap() < 20.0);
    sim.reset().unwrap();
    assert_relative_eq!(sim.read_property("ball", Property::PositionY).unwrap(), 5.0, epsilon = 1e-9);
}

#[test]
fn custom_body_kinds_can_be_registered() {
    let mut sim = Simulation::new(RapierWorld::default());
    sim.registries_mut().bodies.register("wedge", |cfg, units| {
        let w = units.to_pixels_dimension(cfg.width.unwrap_or(1.0));
        Ok(ShapeDesc::Polygon {
            vertices: vec![NVec2::new(0.0, 0.0), NVec2::new(w, 0.0), NVec2::new(0.0, w)],
        })
    });
    let mut cfg = SceneConfig::new("wedge");
    cfg.objects.push(ObjectConfig::new(
        "w",
        10.0,
        10.0,
        BodyConfig { kind: "wedge".into(), width: Some(2.0), ..BodyConfig::default() },
    ));
    sim.load(cfg).unwrap();
    assert!(sim.scene().unwrap().object("w").is_some());
}
