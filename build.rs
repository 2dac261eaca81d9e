fn main() {
    println!("cargo:rustc-check-cfg=cfg(nightly)");

    if version_check::is_feature_flaggable() == Some(true) {
        println!("cargo:rustc-cfg=nightly");
    }
}
