fn main() {
    if let Ok(dir) = std::env::var("LIBSPECTROMETER_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }
    println!("cargo:rustc-link-lib=dylib=spectrometer");
    println!("cargo:rerun-if-env-changed=LIBSPECTROMETER_DIR");
}
