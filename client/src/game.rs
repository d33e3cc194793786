//! Local player movement through the maze

use crate::world::WorldState;
use shared::{Player, Vec3, ANIM_IDLE, ANIM_WALK, CELL_SIZE, PLAYER_SPEED, TURN_SPEED};

/// Longest single translation checked against the grid. A long frame is
/// split into sub-steps of at most this length so it cannot skip a wall.
const MAX_SUBSTEP: f32 = CELL_SIZE * 0.25;

/// Movement intent sampled from the keyboard for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveInput {
    pub fn is_idle(&self) -> bool {
        !(self.forward || self.backward || self.left || self.right)
    }
}

/// Advances the local player by one frame of input.
///
/// Left/right turn in place, forward/backward translate along the facing.
/// Translation into a wall is blocked per axis so the player slides along
/// corridors. Large `dt` values are walked in sub-steps, so a stalled frame
/// never carries the player through a wall. Returns true when position,
/// rotation or animation changed.
pub fn step_local(player: &mut Player, input: &MoveInput, world: &WorldState, dt: f32) -> bool {
    let before = (player.position, player.rotation, player.animation.clone());

    let mut yaw = player.rotation.y;
    if input.left {
        yaw += TURN_SPEED * dt;
    }
    if input.right {
        yaw -= TURN_SPEED * dt;
    }
    player.rotation.y = wrap_angle(yaw);

    let mut direction = 0.0;
    if input.forward {
        direction += 1.0;
    }
    if input.backward {
        direction -= 1.0;
    }

    let mut moved = false;
    if direction != 0.0 {
        let distance = PLAYER_SPEED * dt * direction;
        let substeps = (distance.abs() / MAX_SUBSTEP).ceil().max(1.0) as usize;
        let step = distance / substeps as f32;
        let delta = Vec3::new(player.rotation.y.sin() * step, 0.0, player.rotation.y.cos() * step);

        for _ in 0..substeps {
            let current = player.position;
            let full = Vec3::new(current.x + delta.x, current.y, current.z + delta.z);
            let along_x = Vec3::new(current.x + delta.x, current.y, current.z);
            let along_z = Vec3::new(current.x, current.y, current.z + delta.z);

            match [full, along_x, along_z]
                .into_iter()
                .find(|candidate| world.is_walkable(*candidate))
            {
                Some(next) if next != current => {
                    player.position = next;
                    moved = true;
                }
                _ => break,
            }
        }
    }

    player.animation = if moved { ANIM_WALK } else { ANIM_IDLE }.to_string();

    before != (player.position, player.rotation, player.animation.clone())
}

fn wrap_angle(a: f32) -> f32 {
    let mut x = a;
    while x > std::f32::consts::PI {
        x -= std::f32::consts::TAU;
    }
    while x < -std::f32::consts::PI {
        x += std::f32::consts::TAU;
    }
    x
}
