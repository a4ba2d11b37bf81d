#[cfg(windows)]
extern crate winres;

#[cfg(windows)]
fn main() {
    let mut res = winres::WindowsResource::new();
    res.set("SubSystem", "Windows");
    res.set("FileDescription", "Subgrab subtitle downloader");
    if let Err(e) = res.compile() {
        println!("cargo:warning=failed to compile Windows resources: {}", e);
    }

    // No console window for the GUI build
    println!("cargo:rustc-link-arg=/SUBSYSTEM:WINDOWS");
    println!("cargo:rustc-link-arg=/ENTRY:mainCRTStartup");
}

#[cfg(not(windows))]
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
}
