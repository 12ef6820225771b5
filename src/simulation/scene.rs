//! Build a live scene from configuration
//!
//! Takes a validated [`SceneConfig`] and creates, in the engine:
//! - static walls on the requested canvas edges
//! - one body per object (converted to engine space first)
//!
//! and keeps the non-owning `id → handle` map that every binding resolves
//! through, plus the initial state of each body for reset.
//!
//! A malformed object (unknown body kind, bad geometry) is skipped with a
//! warning; an engine failure aborts the whole assembly and removes every
//! body created so far.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::configuration::config::{ObjectConfig, SceneConfig, Wall};
use crate::error::{EngineError, SimError};
use crate::simulation::bodies::BodyRegistry;
use crate::simulation::engine::{BodyDesc, BodyHandle, PhysicsEngine, ShapeDesc, DEFAULT_DENSITY};
use crate::simulation::states::{BodyState, InitialState, Material, NVec2};
use crate::simulation::units::UnitConverter;

/// Wall thickness in pixels
pub const WALL_THICKNESS: f64 = 50.0;

/// Inertia at or above this locks rotation
pub const LOCKED_INERTIA: f64 = 1e9;

const WALL_MATERIAL: Material = Material {
    restitution: 0.0,
    friction: 0.1,
    friction_static: 0.5,
    friction_air: 0.0,
};

/// One assembled object
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: String,
    pub handle: BodyHandle,
    pub shape: ShapeDesc,
    pub color: Option<String>,
    pub initial: InitialState,
}

#[derive(Debug)]
pub struct Scene {
    pub title: String,
    pub units: UnitConverter,
    walls: Vec<(Wall, BodyHandle)>,
    objects: Vec<SceneObject>,
    index: HashMap<String, usize>,
}

/// Centre and shape of a wall whose inner face lies on the canvas edge
pub fn wall_geometry(wall: Wall, units: &UnitConverter) -> (NVec2, ShapeDesc) {
    let (w, h, t) = (units.canvas_width, units.canvas_height, WALL_THICKNESS);
    let (centre, width, height) = match wall {
        Wall::Left => (NVec2::new(-t / 2.0, h / 2.0), t, h + 2.0 * t),
        Wall::Right => (NVec2::new(w + t / 2.0, h / 2.0), t, h + 2.0 * t),
        Wall::Top => (NVec2::new(w / 2.0, -t / 2.0), w + 2.0 * t, t),
        Wall::Bottom => (NVec2::new(w / 2.0, h + t / 2.0), w + 2.0 * t, t),
    };
    (centre, ShapeDesc::Rectangle { width, height })
}

fn locks_rotation(inertia: Option<f64>) -> bool {
    inertia.map_or(false, |i| i.is_infinite() || i >= LOCKED_INERTIA)
}

/// Engine-space description of one object
pub fn object_desc(obj: &ObjectConfig, shape: ShapeDesc, units: &UnitConverter) -> BodyDesc {
    let velocity = obj.velocity.unwrap_or_default();
    let mass = obj.mass.unwrap_or_else(|| shape.area() * DEFAULT_DENSITY);
    BodyDesc {
        label: obj.id.clone(),
        state: BodyState {
            position: NVec2::new(units.to_pixels_x(obj.x), units.to_pixels_y(obj.y)),
            angle: units.to_pixels_angle(obj.angle.unwrap_or(0.0)),
            velocity: NVec2::new(
                units.to_pixels_velocity_x(velocity.x),
                units.to_pixels_velocity_y(velocity.y),
            ),
            angular_velocity: units.to_pixels_angular_velocity(obj.angular_velocity.unwrap_or(0.0)),
        },
        material: Material {
            restitution: obj.restitution.unwrap_or(ObjectConfig::DEFAULT_RESTITUTION),
            friction: obj.friction.unwrap_or(ObjectConfig::DEFAULT_FRICTION),
            friction_static: obj.friction_static.unwrap_or(ObjectConfig::DEFAULT_FRICTION_STATIC),
            friction_air: obj.friction_air.unwrap_or(ObjectConfig::DEFAULT_FRICTION_AIR),
        },
        shape,
        mass,
        is_static: obj.is_static.unwrap_or(false),
        fixed_rotation: locks_rotation(obj.inertia),
    }
}

impl Scene {
    pub fn assemble<E: PhysicsEngine + ?Sized>(
        cfg: &SceneConfig,
        bodies: &BodyRegistry,
        engine: &mut E,
    ) -> Result<Self, SimError> {
        cfg.validate()?;
        let env = &cfg.environment;
        let units = UnitConverter::new(env.unit, env.pixels_per_unit)?;

        let mut scene = Scene {
            title: cfg.title.clone(),
            units,
            walls: Vec::new(),
            objects: Vec::new(),
            index: HashMap::new(),
        };

        engine.set_gravity_scale(units.to_engine_gravity_scale(env.gravity));

        for &wall in &env.walls {
            let (centre, shape) = wall_geometry(wall, &units);
            let desc = BodyDesc {
                label: format!("wall:{wall:?}").to_lowercase(),
                mass: shape.area() * DEFAULT_DENSITY,
                shape,
                state: BodyState {
                    position: centre,
                    angle: 0.0,
                    velocity: NVec2::zeros(),
                    angular_velocity: 0.0,
                },
                material: WALL_MATERIAL,
                is_static: true,
                fixed_rotation: true,
            };
            match engine.add_body(&desc) {
                Ok(handle) => scene.walls.push((wall, handle)),
                Err(source) => {
                    scene.teardown(engine);
                    return Err(SimError::Assembly {
                        id: desc.label,
                        source,
                    });
                }
            }
        }

        for obj in &cfg.objects {
            let Some(factory) = bodies.factory(&obj.body.kind) else {
                warn!("object {}: unknown body type `{}`, skipped", obj.id, obj.body.kind);
                continue;
            };
            let shape = match factory(&obj.body, &units) {
                Ok(shape) => shape,
                Err(e) => {
                    warn!("object {}: {e}, skipped", obj.id);
                    continue;
                }
            };
            let desc = object_desc(obj, shape, &units);
            let handle = match engine.add_body(&desc) {
                Ok(h) => h,
                Err(source) => {
                    scene.teardown(engine);
                    return Err(SimError::Assembly {
                        id: obj.id.clone(),
                        source,
                    });
                }
            };
            debug!(
                "object {} at ({:.1}, {:.1}) px, mass {:.3}",
                obj.id, desc.state.position.x, desc.state.position.y, desc.mass
            );
            scene.index.insert(obj.id.clone(), scene.objects.len());
            scene.objects.push(SceneObject {
                id: obj.id.clone(),
                handle,
                color: obj.body.color.clone(),
                initial: InitialState {
                    state: desc.state,
                    material: desc.material,
                    mass: desc.mass,
                    is_static: desc.is_static,
                },
                shape: desc.shape,
            });
        }

        for (site, target) in cfg.dangling_references() {
            warn!("{site} targets unknown object `{target}`, binding is inert");
        }

        info!(
            "assembled scene `{}`: {} objects, {} walls",
            scene.title,
            scene.objects.len(),
            scene.walls.len()
        );
        Ok(scene)
    }

    pub fn handle(&self, id: &str) -> Option<BodyHandle> {
        self.index.get(id).map(|&i| self.objects[i].handle)
    }

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.index.get(id).map(|&i| &self.objects[i])
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn walls(&self) -> &[(Wall, BodyHandle)] {
        &self.walls
    }

    /// Put every object back to its assembled state
    pub fn restore<E: PhysicsEngine + ?Sized>(&self, engine: &mut E) -> Result<(), EngineError> {
        for obj in &self.objects {
            let h = obj.handle;
            let init = &obj.initial;
            engine.set_static(h, init.is_static)?;
            engine.set_mass(h, init.mass)?;
            engine.set_material(h, init.material)?;
            engine.set_position(h, init.state.position)?;
            engine.set_angle(h, init.state.angle)?;
            engine.set_velocity(h, init.state.velocity)?;
            engine.set_angular_velocity(h, init.state.angular_velocity)?;
        }
        Ok(())
    }

    /// Remove every wall and object from the engine and clear the map
    pub fn teardown<E: PhysicsEngine + ?Sized>(&mut self, engine: &mut E) {
        let handles = self
            .walls
            .drain(..)
            .map(|(_, h)| h)
            .chain(self.objects.drain(..).map(|o| o.handle));
        for h in handles {
            if let Err(e) = engine.remove_body(h) {
                warn!("teardown: {e}");
            }
        }
        self.index.clear();
    }
}
