use gl_generator::{Api, Fallbacks, Profile, Registry};
use std::env;
use std::fs::File;
use std::path::PathBuf;

fn main() {
    let dest = PathBuf::from(&env::var("OUT_DIR").unwrap());

    println!("cargo:rerun-if-changed=build.rs");

    let mut file = File::create(dest.join("gl_bindings.rs")).unwrap();
    Registry::new(Api::Gl, (4, 6), Profile::Core, Fallbacks::All, ["GL_ARB_get_program_binary"])
        .write_bindings(gl_generator::StructGenerator, &mut file)
        .unwrap();
}
