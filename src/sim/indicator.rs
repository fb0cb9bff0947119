//! Camera-facing launch indicator

use crate::host::{EntityId, Host};
use crate::yaw_facing;

/// Turns the launch pointer to the camera's horizontal heading every frame
#[derive(Debug, Clone, Copy)]
pub struct LaunchIndicator {
    entity: EntityId,
}

impl LaunchIndicator {
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    /// Face the camera heading (yaw only). Returns false when there is no
    /// camera or it looks straight up/down; the rotation is then untouched.
    pub fn update<H: Host + ?Sized>(&self, host: &mut H) -> bool {
        let Some(rotation) = host.camera_forward().and_then(yaw_facing) else {
            return false;
        };
        host.set_rotation(self.entity, rotation);
        true
    }
}
