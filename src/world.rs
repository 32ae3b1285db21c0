// src/world.rs
//
// The simulator-facing side: actor handles, the world-debug draw
// interface, and camera frame delivery.
//
// The camera sensor invokes an image callback asynchronously in the
// original host. Here the callback target is an id-keyed registry slot
// (SensorHub) instead of a back-reference into the visualizer, so a
// destroyed visualizer simply leaves a dangling handle whose frames are
// dropped.

use std::collections::{HashMap, VecDeque};
use tracing::debug;

use nalgebra::Vector3;
use opencv::core::Scalar;

use crate::transform::{Location, Transform};

pub type ActorId = u64;

/// Axis-aligned box in the actor's local frame: a center offset plus
/// half-extents.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub center: Location,
    pub extent: Vector3<f64>,
}

/// Snapshot of a simulator actor, as handed over per frame.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub type_id: String,
    pub transform: Transform,
    pub bounding_box: BoundingBox,
}

/// Id → actor lookup for the current frame. A state entry whose actor is
/// missing is skipped by the visualizers, not treated as fatal.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: HashMap<ActorId, Actor>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, actor: Actor) {
        self.actors.insert(actor.id, actor);
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Short display name derived from a simulator type id:
/// "vehicle.audi.tt" → "Audi Tt", truncated to 15 characters.
pub fn display_name(type_id: &str) -> String {
    let mut parts: Vec<String> = type_id
        .split('.')
        .skip(1)
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if parts.is_empty() {
        parts.push("Obj".to_string());
    }

    parts.join(" ").trim().chars().take(15).collect()
}

/// RGB color for overlays and debug markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// OpenCV scalar in BGR channel order.
    pub fn to_scalar(self) -> Scalar {
        Scalar::new(self.b as f64, self.g as f64, self.r as f64, 0.0)
    }
}

/// The simulator's world-debug interface: transient markers drawn into
/// the 3D scene.
pub trait DebugDraw {
    fn draw_point(&mut self, location: Location, size: f64, color: Color, lifetime: f64);

    fn draw_line(
        &mut self,
        from: Location,
        to: Location,
        thickness: f64,
        color: Color,
        lifetime: f64,
    );

    fn draw_arrow(
        &mut self,
        from: Location,
        to: Location,
        thickness: f64,
        arrow_size: f64,
        color: Color,
        lifetime: f64,
    );
}

/// Raw camera image as delivered by the sensor callback (BGRA bytes).
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub frame: u64,
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

/// Opaque handle identifying a registered camera consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorHandle(u64);

/// Frames buffered per consumer before being polled.
const SENSOR_QUEUE_CAPACITY: usize = 4;

/// Registry decoupling the sensor callback from the consuming visualizer.
/// Frames delivered for an unregistered handle are dropped.
#[derive(Debug, Default)]
pub struct SensorHub {
    next_id: u64,
    pending: HashMap<SensorHandle, VecDeque<CameraFrame>>,
}

impl SensorHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self) -> SensorHandle {
        let handle = SensorHandle(self.next_id);
        self.next_id += 1;
        self.pending.insert(handle, VecDeque::new());
        handle
    }

    pub fn unregister(&mut self, handle: SensorHandle) {
        self.pending.remove(&handle);
    }

    /// Image-arrival callback. Oldest frames are evicted when the consumer
    /// falls behind.
    pub fn deliver(&mut self, handle: SensorHandle, frame: CameraFrame) {
        match self.pending.get_mut(&handle) {
            Some(queue) => {
                if queue.len() >= SENSOR_QUEUE_CAPACITY {
                    queue.pop_front();
                }
                queue.push_back(frame);
            }
            None => {
                debug!("camera frame {} for unregistered sensor, dropped", frame.frame);
            }
        }
    }

    pub fn poll(&mut self, handle: SensorHandle) -> Option<CameraFrame> {
        self.pending.get_mut(&handle)?.pop_front()
    }
}
