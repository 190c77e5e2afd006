fn main() {
    // Tell Cargo that if the given file changes, to rerun this build script.
    println!("cargo:rerun-if-changed=src/reference.c");
    // Use the `cc` crate to build the vendor reference of the compensation
    // algorithm and statically link it. Only the tests call into it.
    cc::Build::new()
        .file("src/reference.c")
        .compile("bmp180_reference");
}
