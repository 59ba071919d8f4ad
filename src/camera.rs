//! Orbit camera controller for the demo app.
//!
//! Drag with the left mouse button to orbit, scroll to zoom. Zoom is
//! spring-smoothed in `update`.

use glam::{Mat4, Quat, Vec3};
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

pub struct OrbitCamera {
    pub center: Vec3,
    pub distance: f32,
    target_distance: f32,
    pub yaw: f32,
    pub pitch: f32,

    is_dragging: bool,
    last_mouse_pos: Option<PhysicalPosition<f64>>,

    pub mouse_sensitivity: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl OrbitCamera {
    const MIN_DISTANCE: f32 = 0.2;
    const MAX_PITCH: f32 = 1.55;

    pub fn new(distance: f32) -> Self {
        Self {
            center: Vec3::ZERO,
            distance,
            target_distance: distance,
            yaw: 0.6,
            pitch: 0.35,
            is_dragging: false,
            last_mouse_pos: None,
            mouse_sensitivity: 0.005,
            zoom_speed: 0.1,
        }
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.is_dragging = state == ElementState::Pressed;
            if !self.is_dragging {
                self.last_mouse_pos = None;
            }
        }
    }

    pub fn handle_mouse_move(&mut self, position: PhysicalPosition<f64>) {
        if self.is_dragging {
            if let Some(last) = self.last_mouse_pos {
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                self.yaw -= dx * self.mouse_sensitivity;
                self.pitch = (self.pitch + dy * self.mouse_sensitivity)
                    .clamp(-Self::MAX_PITCH, Self::MAX_PITCH);
            }
        }
        self.last_mouse_pos = Some(position);
    }

    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
        };
        self.target_distance =
            (self.target_distance * (1.0 - amount * self.zoom_speed)).max(Self::MIN_DISTANCE);
    }

    pub fn update(&mut self, dt: f32) {
        let blend = 1.0 - (-dt * 10.0).exp();
        self.distance += (self.target_distance - self.distance) * blend;
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    pub fn position(&self) -> Vec3 {
        self.center + self.rotation() * (Vec3::Z * self.distance)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), self.center, Vec3::Y);
        let proj = Mat4::perspective_rh(45.0_f32.to_radians(), aspect, 0.05, 200.0);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_clamped() {
        let mut camera = OrbitCamera::default();
        camera.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
        camera.handle_mouse_move(PhysicalPosition::new(0.0, 0.0));
        camera.handle_mouse_move(PhysicalPosition::new(0.0, 1e5));
        assert!(camera.pitch <= OrbitCamera::MAX_PITCH);
    }

    #[test]
    fn test_zoom_never_reaches_center() {
        let mut camera = OrbitCamera::default();
        for _ in 0..100 {
            camera.handle_scroll(MouseScrollDelta::LineDelta(0.0, 5.0));
            camera.update(0.1);
        }
        assert!(camera.distance >= OrbitCamera::MIN_DISTANCE * 0.9);
    }

    #[test]
    fn test_position_at_distance() {
        let camera = OrbitCamera::new(3.0);
        assert!((camera.position().length() - 3.0).abs() < 1e-4);
    }
}
