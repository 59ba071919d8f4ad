fn main() {
    // Rebuild if the cloner shaders change
    println!("cargo:rerun-if-changed=shaders/noise3d.wgsl");
    println!("cargo:rerun-if-changed=shaders/cloner_update.wgsl");
    println!("cargo:rerun-if-changed=shaders/cloner_surface.wgsl");
}
