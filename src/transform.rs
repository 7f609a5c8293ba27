//! World transform snapshots and change detection across frames.

/// Position, rotation and scale of an object at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: glam::Vec3,
    pub rotation: glam::Quat,
    pub scale: glam::Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: glam::Vec3::ZERO,
            rotation: glam::Quat::IDENTITY,
            scale: glam::Vec3::ONE,
        }
    }
}

impl Transform {
    /// Direction the transform faces, `-Z` in local space.
    pub fn forward(&self) -> glam::Vec3 {
        self.rotation * glam::Vec3::NEG_Z
    }
}

/// Set of transforms whose movement invalidates accumulated samples.
///
/// Holds the snapshot taken at the end of the previous check instead of
/// per-object dirty flags. Each change is reported exactly once.
#[derive(Debug, Default)]
pub struct WatchedTransforms {
    previous: Option<Vec<Transform>>,
}

impl WatchedTransforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `current` with the last snapshot and store it as the new one.
    ///
    /// Returns `true` when nothing was observed before, when the set of
    /// watched transforms changed size, or when any component differs.
    pub fn consume_changes(&mut self, current: &[Transform]) -> bool {
        let changed = match &self.previous {
            Some(previous) => previous.as_slice() != current,
            None => true,
        };

        match &mut self.previous {
            Some(previous) if changed => {
                previous.clear();
                previous.extend_from_slice(current);
            }
            Some(_) => {}
            None => self.previous = Some(current.to_vec()),
        }

        changed
    }

    /// Forget the stored snapshot so the next check reports a change.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }
}
