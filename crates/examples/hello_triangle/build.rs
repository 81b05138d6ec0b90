// Compiles the GLSL shaders under shaders/ to SPIR-V in OUT_DIR.

use std::{
    env, fs,
    path::{Path, PathBuf},
    process::Command,
};

const SHADER_DIR: &str = "shaders";
const SHADER_EXTENSIONS: [&str; 2] = ["vert", "frag"];

fn main() {
    println!("cargo:rerun-if-changed={SHADER_DIR}");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let target_dir = out_dir.join("shaders");
    fs::create_dir_all(&target_dir).expect("Failed to create shader output directory");
    println!("cargo:rustc-env=SHADER_OUT_DIR={}", target_dir.display());

    let glslc = glslc_path();
    let sources = fs::read_dir(SHADER_DIR)
        .expect("Failed to read shader directory")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_shader_source(path));

    for source in sources {
        let file_name = source
            .file_name()
            .expect("Shader sources have a file name")
            .to_string_lossy()
            .into_owned();
        let output = target_dir.join(format!("{file_name}.spv"));

        match Command::new(&glslc).arg(&source).arg("-o").arg(&output).status() {
            Ok(status) if status.success() => {}
            Ok(status) => panic!("glslc failed for {file_name} with {status}"),
            Err(err) => {
                // Without a compiler the crate still builds, loading the shaders fails at runtime
                println!(
                    "cargo:warning=Could not run {} ({err}), {file_name} was not compiled",
                    glslc.display()
                );
                return;
            }
        }
    }
}

/// `glslc` from the Vulkan SDK when installed, otherwise whatever is on the PATH.
fn glslc_path() -> PathBuf {
    match env::var_os("VULKAN_SDK") {
        Some(sdk) if cfg!(target_os = "windows") => Path::new(&sdk).join("Bin").join("glslc.exe"),
        Some(sdk) => Path::new(&sdk).join("bin").join("glslc"),
        None => PathBuf::from("glslc"),
    }
}

fn is_shader_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| SHADER_EXTENSIONS.contains(&ext))
}
