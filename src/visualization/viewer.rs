use bevy::color::Srgba;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use log::{error, info};

use crate::simulation::engine::ShapeDesc;
use crate::simulation::rapier_world::RapierWorld;
use crate::simulation::runtime::Simulation;
use crate::simulation::states::NVec2;

/// Bevy resource wrapping the runtime
#[derive(Resource)]
struct Sim(Simulation<RapierWorld>);

/// Open a window the size of the scene canvas and run until it closes.
///
/// - Space: play / pause
/// - R: reset
/// - left mouse: drag a body
pub fn run_viewer(sim: Simulation<RapierWorld>) {
    let (width, height) = sim
        .units()
        .map_or((800.0, 600.0), |u| (u.canvas_width as f32, u.canvas_height as f32));
    let title = sim
        .config()
        .map_or_else(|| "physim".to_string(), |c| c.title.clone());
    info!("viewer: {title} ({width}x{height})");

    App::new()
        .insert_resource(Sim(sim))
        .insert_resource(ClearColor(Color::srgb(0.07, 0.08, 0.1)))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title,
                        resolution: (width, height).into(),
                        resizable: false,
                        ..default()
                    }),
                    ..default()
                })
                .disable::<LogPlugin>(),
        )
        .add_systems(Startup, setup_camera_system)
        .add_systems(Update, (input_system, step_system, draw_system).chain())
        .run();
}

fn setup_camera_system(mut commands: Commands) {
    commands.spawn(Camera2dBundle::default());
}

/// Engine pixels (origin top-left, y down) to world space (origin centre, y up)
fn to_world(p: NVec2, window: &Window) -> Vec2 {
    Vec2::new(
        p.x as f32 - window.width() / 2.0,
        window.height() / 2.0 - p.y as f32,
    )
}

fn input_system(
    keys: Res<ButtonInput<KeyCode>>,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sim: ResMut<Sim>,
) {
    let sim = &mut sim.0;
    if keys.just_pressed(KeyCode::Space) {
        let result = match sim.state() {
            crate::simulation::clock::ClockState::Running => sim.pause(),
            _ => sim.play(),
        };
        if let Err(e) = result {
            error!("{e}");
        }
    }
    if keys.just_pressed(KeyCode::KeyR) {
        if let Err(e) = sim.reset() {
            error!("{e}");
        }
    }

    let Ok(window) = windows.get_single() else {
        return;
    };
    // window cursor coordinates already match engine pixels
    let cursor = window
        .cursor_position()
        .map(|c| NVec2::new(c.x as f64, c.y as f64));

    if buttons.just_released(MouseButton::Left) {
        sim.end_drag();
    }
    let Some(point) = cursor else {
        return;
    };
    if buttons.just_pressed(MouseButton::Left) {
        sim.begin_drag(point);
    } else if buttons.pressed(MouseButton::Left) && sim.is_dragging() {
        if let Err(e) = sim.move_drag(point) {
            error!("{e}");
        }
    }
}

fn step_system(time: Res<Time>, mut sim: ResMut<Sim>) {
    if let Err(e) = sim.0.frame(time.elapsed_seconds_f64() * 1000.0) {
        error!("{e}");
    }
}

fn draw_system(mut gizmos: Gizmos, windows: Query<&Window, With<PrimaryWindow>>, sim: Res<Sim>) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    for body in sim.0.snapshot() {
        if body.is_wall {
            continue;
        }
        let color = body
            .color
            .as_deref()
            .and_then(|c| Srgba::hex(c).ok())
            .map_or(Color::WHITE, Color::from);
        let centre = to_world(body.position, window);
        match &body.shape {
            ShapeDesc::Circle { radius } => {
                gizmos.circle_2d(centre, *radius as f32, color);
                // spoke so rotation is visible
                let tip = body.position + nalgebra::Rotation2::new(body.angle) * NVec2::new(*radius, 0.0);
                gizmos.line_2d(centre, to_world(tip, window), color);
            }
            shape => {
                let rotation = nalgebra::Rotation2::new(body.angle);
                let mut points: Vec<Vec2> = shape
                    .outline()
                    .iter()
                    .map(|v| to_world(body.position + rotation * v, window))
                    .collect();
                if let Some(&first) = points.first() {
                    points.push(first);
                }
                gizmos.linestrip_2d(points, color);
            }
        }
    }
}
