//! Interactor bookkeeping.
//!
//! Interactors live in dense slots so kernels can index colliders directly.
//! Several interactors may share one rigid body. Bodies get their own dense
//! slots, and `collider_to_body` maps one to the other. Removal swaps the last
//! slot into the hole and remaps whatever pointed at it.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collider::{Collider, ColliderShape};
use crate::core_types::{AffineTransform, Vec3};
use crate::error::{Result, WaveSimError};
use crate::solver::RigidMotion;

use super::motion::MotionEstimator;
use super::scene::SceneHost;

/// Host-assigned interactor handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractorId(pub u64);

/// Host-assigned rigid-body handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// Everything needed to register an interactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractorDesc {
    pub id: InteractorId,
    pub shape: ColliderShape,
    /// Shape offset from the transform origin, local units
    pub center: Vec3,
    pub contact_offset: f32,
    pub body: Option<BodyId>,
    /// Linear velocity smoothing in `[0, 1)`, velocity mode only
    pub velocity_smoothing: f32,
}

impl InteractorDesc {
    pub fn new(id: InteractorId, shape: ColliderShape) -> Self {
        Self {
            id,
            shape,
            center: Vec3::zeros(),
            contact_offset: 0.0,
            body: None,
            velocity_smoothing: 0.0,
        }
    }

    pub fn with_body(mut self, body: BodyId) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
struct InteractorEntry {
    desc: InteractorDesc,
    motion: MotionEstimator,
}

#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    id: BodyId,
    /// Interactors sharing this body
    refs: usize,
}

#[derive(Debug)]
pub struct InteractorRegistry {
    limit: usize,
    slots: FxHashMap<InteractorId, usize>,
    entries: Vec<InteractorEntry>,
    colliders: Vec<Collider>,
    collider_to_body: Vec<Option<usize>>,
    bodies: Vec<BodyEntry>,
}

impl InteractorRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            slots: FxHashMap::default(),
            entries: Vec::with_capacity(limit),
            colliders: Vec::with_capacity(limit),
            collider_to_body: Vec::with_capacity(limit),
            bodies: Vec::with_capacity(limit),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn contains(&self, id: InteractorId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn slot_of(&self, id: InteractorId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Registers an interactor placed at `transform`.
    ///
    /// Registering an id twice returns its existing slot.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::InteractorLimit`] when the registry is full. The
    /// registry is left unchanged.
    pub fn add(&mut self, desc: InteractorDesc, transform: AffineTransform) -> Result<usize> {
        if let Some(&slot) = self.slots.get(&desc.id) {
            debug!(id = desc.id.0, slot, "Interactor already registered");
            return Ok(slot);
        }
        if self.entries.len() >= self.limit {
            warn!(
                id = desc.id.0,
                limit = self.limit,
                "Interactor limit reached, increase max_interactors to detect more"
            );
            return Err(WaveSimError::InteractorLimit { limit: self.limit });
        }

        let body_slot = desc.body.map(|id| self.acquire_body(id));
        let slot = self.entries.len();
        self.colliders.push(Collider::new(
            desc.shape,
            desc.center,
            desc.contact_offset,
            transform,
        ));
        self.collider_to_body.push(body_slot);
        self.slots.insert(desc.id, slot);
        debug!(id = desc.id.0, slot, body = ?desc.body, "Interactor registered");
        self.entries.push(InteractorEntry {
            desc,
            motion: MotionEstimator::new(),
        });
        Ok(slot)
    }

    /// Unregisters an interactor.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::UnknownInteractor`] when `id` is not registered.
    pub fn remove(&mut self, id: InteractorId) -> Result<()> {
        let slot = self
            .slots
            .remove(&id)
            .ok_or(WaveSimError::UnknownInteractor(id.0))?;

        self.entries.swap_remove(slot);
        self.colliders.swap_remove(slot);
        let body_slot = self.collider_to_body.swap_remove(slot);
        if let Some(moved) = self.entries.get(slot) {
            self.slots.insert(moved.desc.id, slot);
        }
        if let Some(body_slot) = body_slot {
            self.release_body(body_slot);
        }
        debug!(id = id.0, slot, "Interactor removed");
        Ok(())
    }

    fn acquire_body(&mut self, id: BodyId) -> usize {
        if let Some(slot) = self.bodies.iter().position(|b| b.id == id) {
            self.bodies[slot].refs += 1;
            return slot;
        }
        self.bodies.push(BodyEntry { id, refs: 1 });
        self.bodies.len() - 1
    }

    fn release_body(&mut self, slot: usize) {
        self.bodies[slot].refs -= 1;
        if self.bodies[slot].refs > 0 {
            return;
        }
        let last = self.bodies.len() - 1;
        self.bodies.swap_remove(slot);
        if slot != last {
            for mapped in self.collider_to_body.iter_mut().flatten() {
                if *mapped == last {
                    *mapped = slot;
                }
            }
        }
    }

    /// Colliders by interactor slot.
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Rigid-body slot of each interactor slot.
    pub fn collider_to_body(&self) -> &[Option<usize>] {
        &self.collider_to_body
    }

    /// Rigid bodies by body slot.
    pub fn bodies(&self) -> impl ExactSizeIterator<Item = BodyId> + '_ {
        self.bodies.iter().map(|b| b.id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = InteractorId> + '_ {
        self.entries.iter().map(|e| e.desc.id)
    }

    pub fn desc(&self, slot: usize) -> Option<&InteractorDesc> {
        self.entries.get(slot).map(|e| &e.desc)
    }

    /// Estimates the motion of every interactor for this tick.
    pub(crate) fn update_motions<H: SceneHost + ?Sized>(
        &mut self,
        host: &H,
        dt: f32,
    ) -> Vec<RigidMotion> {
        self.entries
            .iter_mut()
            .zip(&self.colliders)
            .map(|(entry, collider)| {
                let body = entry.desc.body.and_then(|id| host.rigid_body(id));
                entry.motion.update(
                    collider.transform(),
                    body.as_ref(),
                    dt,
                    entry.desc.velocity_smoothing,
                )
            })
            .collect()
    }

    pub(crate) fn set_transform(&mut self, slot: usize, transform: AffineTransform) {
        self.colliders[slot].set_transform(transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(id: u64) -> InteractorDesc {
        InteractorDesc::new(InteractorId(id), ColliderShape::Sphere { radius: 0.5 })
    }

    #[test]
    fn test_cap_rejects_and_keeps_state() {
        let mut registry = InteractorRegistry::new(2);
        registry.add(sphere(1), AffineTransform::identity()).unwrap();
        registry.add(sphere(2), AffineTransform::identity()).unwrap();
        let err = registry.add(sphere(3), AffineTransform::identity());
        assert!(matches!(err, Err(WaveSimError::InteractorLimit { limit: 2 })));
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(InteractorId(3)));
    }

    #[test]
    fn test_duplicate_add_returns_existing_slot() {
        let mut registry = InteractorRegistry::new(1);
        assert_eq!(registry.add(sphere(7), AffineTransform::identity()).unwrap(), 0);
        assert_eq!(registry.add(sphere(7), AffineTransform::identity()).unwrap(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut registry = InteractorRegistry::new(3);
        for id in 1..=3 {
            registry.add(sphere(id), AffineTransform::identity()).unwrap();
        }
        registry.remove(InteractorId(1)).unwrap();
        assert_eq!(registry.slot_of(InteractorId(3)), Some(0));
        assert_eq!(registry.slot_of(InteractorId(2)), Some(1));
        assert_eq!(registry.colliders().len(), 2);
        assert!(matches!(
            registry.remove(InteractorId(1)),
            Err(WaveSimError::UnknownInteractor(1))
        ));
    }

    #[test]
    fn test_shared_bodies_are_collapsed_and_remapped() {
        let mut registry = InteractorRegistry::new(4);
        registry
            .add(sphere(1).with_body(BodyId(10)), AffineTransform::identity())
            .unwrap();
        registry
            .add(sphere(2).with_body(BodyId(20)), AffineTransform::identity())
            .unwrap();
        registry
            .add(sphere(3).with_body(BodyId(20)), AffineTransform::identity())
            .unwrap();
        registry.add(sphere(4), AffineTransform::identity()).unwrap();
        assert_eq!(registry.body_count(), 2);
        assert_eq!(
            registry.collider_to_body(),
            &[Some(0), Some(1), Some(1), None]
        );

        // Dropping body 10 moves body 20 into slot 0
        registry.remove(InteractorId(1)).unwrap();
        assert_eq!(registry.body_count(), 1);
        assert_eq!(registry.bodies().collect::<Vec<_>>(), vec![BodyId(20)]);
        let slot = registry.slot_of(InteractorId(2)).unwrap();
        assert_eq!(registry.collider_to_body()[slot], Some(0));
        let slot = registry.slot_of(InteractorId(3)).unwrap();
        assert_eq!(registry.collider_to_body()[slot], Some(0));
    }
}
