//! # Cloner application entry point
//!
//! Opens a window and renders a swarm of mesh instances over a
//! scattered point cloud. Space freezes/resumes the noise field, E
//! deactivates/reactivates the whole pipeline, Escape quits.

fn main() {
    cloner::app::run();
}
