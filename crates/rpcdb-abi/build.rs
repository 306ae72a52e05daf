fn main() {
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let version_script = format!("{manifest_dir}/version_scripts/rpcdb.map");
    // The exports are only `no_mangle` without debug_assertions (see
    // rpc_abi.rs), so the version script can only name them in that case.
    let exports_unmangled = std::env::var_os("CARGO_CFG_DEBUG_ASSERTIONS").is_none();
    if exports_unmangled && std::path::Path::new(&version_script).exists() {
        println!("cargo:rustc-cdylib-link-arg=-Wl,--version-script={version_script}");
    }
    println!("cargo:rerun-if-changed=version_scripts/rpcdb.map");
}
