//! The simulation runtime: one scene, one engine, one fixed-step loop
//!
//! [`Simulation`] owns the physics engine and everything built from the
//! loaded scene. The host drives it with [`Simulation::frame`] once per
//! display callback and reads [`Simulation::snapshot`] to draw; user input
//! arrives through `play`/`pause`/`reset`, [`Simulation::set_control`] and
//! the drag calls. Everything runs on the caller's thread, so a control
//! write always lands before the next step and every read sees post-step
//! state.
//!
//! Per tick:
//! 1. due delayed forces and the drag spring are applied
//! 2. `engine.step(step_ms)`, simulation time advances by one step
//! 3. acceleration side-table updated from the new velocities
//! 4. outputs refreshed, one point appended to every graph

use log::{debug, error, info, warn};
use nalgebra::Rotation2;

use crate::configuration::config::{ControlValue, SceneConfig};
use crate::error::{EngineError, SimError};
use crate::simulation::bodies::BodyRegistry;
use crate::simulation::clock::{
    AccelerationTracker, ClockState, FixedStepClock, ForceSchedule, ScheduledForce,
};
use crate::simulation::controls::{Control, ControlPanel, ControlRegistry};
use crate::simulation::engine::{BodyHandle, PhysicsEngine, ShapeDesc};
use crate::simulation::observe::{
    clamp_small, Graph, GraphRegistry, OutputPanel, OutputReading, PropertySource,
};
use crate::simulation::property::Property;
use crate::simulation::scene::{wall_geometry, Scene};
use crate::simulation::states::{BodyState, NVec2};
use crate::simulation::units::{UnitConverter, FRAME_RATE};

/// Fraction of the pointer offset closed per tick by a running drag
pub const DRAG_STIFFNESS: f64 = 0.2;
/// Velocity damping of the drag spring, per tick
pub const DRAG_DAMPING: f64 = 0.1;

/// The three discriminant registries a scene is built against
#[derive(Default)]
pub struct Registries {
    pub bodies: BodyRegistry,
    pub controls: ControlRegistry,
    pub graphs: GraphRegistry,
}

/// What one host callback did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    pub sim_time: f64, // seconds
    pub state: ClockState,
}

/// Render view of one body, engine space
#[derive(Debug, Clone, PartialEq)]
pub struct BodySnapshot {
    pub id: String,
    pub position: NVec2,
    pub angle: f64,
    pub shape: ShapeDesc,
    pub color: Option<String>,
    pub is_static: bool,
    pub is_wall: bool,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    handle: BodyHandle,
    local: NVec2, // grab point in the body frame
    pointer: NVec2,
}

struct Loaded {
    config: SceneConfig,
    scene: Scene,
    controls: ControlPanel,
    outputs: OutputPanel,
    graphs: Vec<Box<dyn Graph>>,
}

/// Converted, clamped reads against the live world
struct Reader<'a, E: PhysicsEngine> {
    engine: &'a E,
    scene: &'a Scene,
    accel: &'a AccelerationTracker,
}

impl<E: PhysicsEngine> PropertySource for Reader<'_, E> {
    fn read(&self, target: &str, property: Property) -> Option<f64> {
        read_real(self.engine, self.scene, self.accel, target, property).map(clamp_small)
    }
}

fn read_real<E: PhysicsEngine + ?Sized>(
    engine: &E,
    scene: &Scene,
    accel: &AccelerationTracker,
    target: &str,
    property: Property,
) -> Option<f64> {
    let handle = scene.handle(target)?;
    let raw = property.read(engine, handle, accel.get(target)).ok()?;
    Some(scene.units.from_pixels_property(property, raw))
}

/// Push one control's held value into its target body
fn push_control<E: PhysicsEngine + ?Sized>(engine: &mut E, scene: &Scene, control: &Control) {
    let Some((property, value)) = control.binding() else {
        return;
    };
    let Some(handle) = scene.handle(&control.target) else {
        debug!("control {}: no object `{}`, write dropped", control.label, control.target);
        return;
    };
    let engine_value = scene.units.to_pixels_property(property, value);
    if let Err(e) = property.write(engine, handle, engine_value) {
        warn!("control {}: {e}", control.label);
    }
}

fn world_point(state: &BodyState, local: NVec2) -> NVec2 {
    state.position + Rotation2::new(state.angle) * local
}

pub struct Simulation<E: PhysicsEngine> {
    engine: E,
    registries: Registries,
    state: ClockState,
    clock: FixedStepClock,
    accel: AccelerationTracker,
    forces: ForceSchedule,
    drag: Option<Drag>,
    loaded: Option<Loaded>,
}

impl<E: PhysicsEngine> Simulation<E> {
    pub fn new(engine: E) -> Self {
        Self::with_registries(engine, Registries::default())
    }

    pub fn with_registries(engine: E, registries: Registries) -> Self {
        Self {
            engine,
            registries,
            state: ClockState::Idle,
            clock: FixedStepClock::new(FRAME_RATE),
            accel: AccelerationTracker::new(),
            forces: ForceSchedule::default(),
            drag: None,
            loaded: None,
        }
    }

    // ==========================================
    // Lifecycle
    // ==========================================

    /// Assemble `config` into the engine. Idle → Ready.
    pub fn load(&mut self, config: SceneConfig) -> Result<(), SimError> {
        if self.loaded.is_some() {
            return Err(SimError::AlreadyLoaded);
        }
        let scene = Scene::assemble(&config, &self.registries.bodies, &mut self.engine)?;
        let units = scene.units;

        let controls = ControlPanel::build(&config.controls, &self.registries.controls);
        let outputs = OutputPanel::build(&config.outputs, units.unit_label());
        let graphs = self.registries.graphs.build_all(&config.graphs);

        self.clock = FixedStepClock::new(units.frame_rate);
        self.accel = AccelerationTracker::new();
        let mut planned = Vec::new();
        for obj in &config.objects {
            if scene.handle(&obj.id).is_none() {
                continue;
            }
            if let Some(a) = obj.acceleration {
                self.accel.seed(
                    &obj.id,
                    NVec2::new(units.to_pixels_velocity_x(a.x), units.to_pixels_velocity_y(a.y)),
                );
            }
            if let Some(f) = &obj.applied_force {
                planned.push(ScheduledForce {
                    id: obj.id.clone(),
                    force: NVec2::new(units.to_pixels_force_x(f.x), units.to_pixels_force_y(f.y)),
                    mode: f.mode,
                    delay_ms: f.delay_ms,
                });
            }
        }
        self.forces = ForceSchedule::new(planned);
        self.drag = None;

        info!("loaded `{}`", config.title);
        self.loaded = Some(Loaded {
            config,
            scene,
            controls,
            outputs,
            graphs,
        });
        self.state = ClockState::Ready;
        self.push_controls();
        self.refresh_outputs();
        Ok(())
    }

    /// Ready/Paused → Running. Arms delayed forces on the first play after
    /// load or reset; later plays resume their countdown.
    pub fn play(&mut self) -> Result<(), SimError> {
        match self.state {
            ClockState::Idle => Err(SimError::NotLoaded),
            ClockState::Running => Ok(()),
            ClockState::Ready | ClockState::Paused => {
                self.accel.restart();
                self.forces.arm();
                self.state = ClockState::Running;
                info!("play at t = {:.3}s", self.clock.sim_time());
                Ok(())
            }
        }
    }

    /// Running → Paused. Delayed forces stop counting down until the next play.
    pub fn pause(&mut self) -> Result<(), SimError> {
        match self.state {
            ClockState::Idle => Err(SimError::NotLoaded),
            ClockState::Running => {
                self.state = ClockState::Paused;
                info!("paused at t = {:.3}s", self.clock.sim_time());
                Ok(())
            }
            ClockState::Ready | ClockState::Paused => Ok(()),
        }
    }

    /// Back to the load-time state, then re-push every control value
    pub fn reset(&mut self) -> Result<(), SimError> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Err(SimError::NotLoaded);
        };
        loaded
            .scene
            .restore(&mut self.engine)
            .map_err(|source| SimError::Tick {
                tick: self.clock.ticks(),
                source,
            })?;
        for graph in loaded.graphs.iter_mut() {
            graph.clear();
        }
        self.clock.reset();
        self.accel.reset();
        self.forces.cancel();
        self.drag = None;
        self.state = ClockState::Ready;
        self.push_controls();
        self.refresh_outputs();
        info!("reset");
        Ok(())
    }

    /// Remove every body and return to Idle
    pub fn teardown(&mut self) {
        if let Some(mut loaded) = self.loaded.take() {
            loaded.scene.teardown(&mut self.engine);
            info!("tore down `{}`", loaded.config.title);
        }
        self.accel.clear();
        self.forces = ForceSchedule::default();
        self.drag = None;
        self.clock.reset();
        self.state = ClockState::Idle;
    }

    // ==========================================
    // Loop
    // ==========================================

    /// One host callback at wall-clock `now_ms`
    pub fn frame(&mut self, now_ms: f64) -> Result<FrameReport, SimError> {
        let running = self.state == ClockState::Running;
        let advance = self.clock.advance(now_ms, running);
        if running {
            self.forces.elapse(advance.wall_delta_ms);
        }
        for _ in 0..advance.steps {
            if let Err(source) = self.tick() {
                let tick = self.clock.ticks();
                self.state = ClockState::Paused;
                error!("tick {tick} failed, pausing: {source}");
                return Err(SimError::Tick { tick, source });
            }
        }
        Ok(FrameReport {
            steps: advance.steps,
            sim_time: self.clock.sim_time(),
            state: self.state,
        })
    }

    fn tick(&mut self) -> Result<(), EngineError> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Ok(());
        };
        let scene = &loaded.scene;

        for (id, force) in self.forces.due() {
            if let Some(h) = scene.handle(&id) {
                let at = self.engine.body_state(h)?.position;
                self.engine.apply_force(h, at, force)?;
            }
        }
        if let Some(drag) = self.drag {
            let s = self.engine.body_state(drag.handle)?;
            let grab = world_point(&s, drag.local);
            let mass = self.engine.mass(drag.handle)?;
            let pull = (drag.pointer - grab) * DRAG_STIFFNESS - s.velocity * DRAG_DAMPING;
            self.engine.apply_force(drag.handle, grab, pull * mass)?;
        }

        self.engine.step(self.clock.step_ms());
        self.clock.tick();

        let dt = self.clock.step_seconds();
        for obj in scene.objects() {
            let s = self.engine.body_state(obj.handle)?;
            if !s.is_finite() {
                return Err(EngineError::NonFinite { id: obj.id.clone() });
            }
            self.accel.record(&obj.id, s.velocity, dt);
        }

        let reader = Reader {
            engine: &self.engine,
            scene: &loaded.scene,
            accel: &self.accel,
        };
        loaded.outputs.refresh(&reader);
        let time = self.clock.sim_time();
        for graph in loaded.graphs.iter_mut() {
            graph.record(time, &reader);
        }
        Ok(())
    }

    fn refresh_outputs(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            let reader = Reader {
                engine: &self.engine,
                scene: &loaded.scene,
                accel: &self.accel,
            };
            loaded.outputs.refresh(&reader);
        }
    }

    fn push_controls(&mut self) {
        if let Some(loaded) = self.loaded.as_ref() {
            for control in loaded.controls.iter() {
                push_control(&mut self.engine, &loaded.scene, control);
            }
        }
    }

    // ==========================================
    // Input
    // ==========================================

    /// Set a control by label and push it into its target
    pub fn set_control(&mut self, label: &str, value: ControlValue) -> Result<(), SimError> {
        let loaded = self.loaded.as_mut().ok_or(SimError::NotLoaded)?;
        let control = loaded
            .controls
            .set(label, value, &self.registries.controls)?;
        push_control(&mut self.engine, &loaded.scene, control);
        self.refresh_outputs();
        Ok(())
    }

    /// Grab the topmost movable object under `point` (engine px)
    pub fn begin_drag(&mut self, point: NVec2) -> Option<String> {
        let loaded = self.loaded.as_ref()?;
        let hits = self.engine.bodies_at_point(point);
        let obj = loaded.scene.objects().iter().rev().find(|o| {
            hits.contains(&o.handle) && !self.engine.is_static(o.handle).unwrap_or(true)
        })?;
        let s = self.engine.body_state(obj.handle).ok()?;
        let local = Rotation2::new(-s.angle) * (point - s.position);
        self.drag = Some(Drag {
            handle: obj.handle,
            local,
            pointer: point,
        });
        debug!("drag start on {}", obj.id);
        Some(obj.id.clone())
    }

    /// Move the pointer of an active drag. Outside Running this moves the
    /// body directly so its grab point sits on the pointer, at rest.
    pub fn move_drag(&mut self, point: NVec2) -> Result<(), SimError> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(());
        };
        drag.pointer = point;
        let drag = *drag;
        if self.state == ClockState::Running {
            return Ok(());
        }
        let solve = |engine: &mut E| -> Result<(), EngineError> {
            let s = engine.body_state(drag.handle)?;
            let offset = Rotation2::new(s.angle) * drag.local;
            engine.set_position(drag.handle, point - offset)?;
            engine.set_velocity(drag.handle, NVec2::zeros())?;
            engine.set_angular_velocity(drag.handle, 0.0)
        };
        solve(&mut self.engine).map_err(|source| SimError::Tick {
            tick: self.clock.ticks(),
            source,
        })?;
        self.refresh_outputs();
        Ok(())
    }

    pub fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            if self.state != ClockState::Running {
                if let Err(e) = self.engine.set_velocity(drag.handle, NVec2::zeros()) {
                    warn!("end drag: {e}");
                }
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn sim_time(&self) -> f64 {
        self.clock.sim_time()
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    pub fn step_ms(&self) -> f64 {
        self.clock.step_ms()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn registries_mut(&mut self) -> &mut Registries {
        &mut self.registries
    }

    pub fn config(&self) -> Option<&SceneConfig> {
        self.loaded.as_ref().map(|l| &l.config)
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.loaded.as_ref().map(|l| &l.scene)
    }

    pub fn units(&self) -> Option<UnitConverter> {
        self.scene().map(|s| s.units)
    }

    pub fn controls(&self) -> Option<&ControlPanel> {
        self.loaded.as_ref().map(|l| &l.controls)
    }

    pub fn outputs(&self) -> &[OutputReading] {
        self.loaded.as_ref().map_or(&[], |l| l.outputs.readings())
    }

    pub fn graphs(&self) -> &[Box<dyn Graph>] {
        self.loaded.as_ref().map_or(&[], |l| l.graphs.as_slice())
    }

    pub fn pending_forces(&self) -> usize {
        self.forces.pending()
    }

    /// Engine-space state of an object
    pub fn body_state(&self, id: &str) -> Option<BodyState> {
        let h = self.scene()?.handle(id)?;
        self.engine.body_state(h).ok()
    }

    /// Engine-space derived acceleration of an object
    pub fn acceleration(&self, id: &str) -> Option<NVec2> {
        self.scene()?.handle(id)?;
        Some(self.accel.get(id))
    }

    /// Real-world value of a property, without display clamping
    pub fn read_property(&self, id: &str, property: Property) -> Option<f64> {
        read_real(&self.engine, self.scene()?, &self.accel, id, property)
    }

    /// Every wall and object as the renderer should draw it
    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        let Some(scene) = self.scene() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(scene.walls().len() + scene.objects().len());
        for &(wall, handle) in scene.walls() {
            let (position, shape) = wall_geometry(wall, &scene.units);
            if self.engine.body_state(handle).is_ok() {
                out.push(BodySnapshot {
                    id: format!("wall:{wall:?}").to_lowercase(),
                    position,
                    angle: 0.0,
                    shape,
                    color: None,
                    is_static: true,
                    is_wall: true,
                });
            }
        }
        for obj in scene.objects() {
            let Ok(s) = self.engine.body_state(obj.handle) else {
                continue;
            };
            out.push(BodySnapshot {
                id: obj.id.clone(),
                position: s.position,
                angle: s.angle,
                shape: obj.shape.clone(),
                color: obj.color.clone(),
                is_static: self.engine.is_static(obj.handle).unwrap_or(false),
                is_wall: false,
            });
        }
        out
    }
}
