//! Installer for the ifd-swicc IFD handler
//!
//! This binary installs the ifd-swicc driver files to the appropriate
//! system directories for pcscd to find them.
//!
//! Usage: sudo ifd-swicc-install
//!
//! After building with `cargo build --release`, run:
//!   sudo ifd-swicc-install

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

const BUNDLE_DIR: &str = "/usr/lib/pcsc/drivers/ifd-swicc.bundle";
const CONF_DIR: &str = "/etc/reader.conf.d";
const LIBRARY: &str = "libifd_swicc.so";

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleDevelopmentRegion</key>
    <string>English</string>
    <key>CFBundleExecutable</key>
    <string>libifd_swicc.so</string>
    <key>CFBundleIdentifier</key>
    <string>org.swicc.ifd-handler</string>
    <key>CFBundleInfoDictionaryVersion</key>
    <string>6.0</string>
    <key>CFBundleName</key>
    <string>ifd-swicc</string>
    <key>CFBundlePackageType</key>
    <string>BNDL</string>
    <key>CFBundleShortVersionString</key>
    <string>0.1.0</string>
    <key>CFBundleSignature</key>
    <string>????</string>
    <key>CFBundleVersion</key>
    <string>0.1.0</string>
    <key>ifdCapabilities</key>
    <string>0x00000000</string>
    <key>ifdProtocolSupport</key>
    <string>0x00000001</string>
    <key>ifdVersionNumber</key>
    <string>0x00000001</string>
    <key>ifdManufacturerString</key>
    <string>swICC</string>
    <key>ifdProductString</key>
    <string>swICC Simulated Reader</string>
    <key>ifdSerialNumber</key>
    <string>0</string>
    <key>ifdLogLevel</key>
    <string>0x0003</string>
</dict>
</plist>
"#;

const READER_CONF: &str = r#"# swICC simulated smart card reader
# The card simulator connects to this driver over TCP (port 37324 by default)

FRIENDLYNAME      "swICC PC/SC IFD Handler"
DEVICENAME        /dev/null
LIBPATH           /usr/lib/pcsc/drivers/ifd-swicc.bundle/Contents/Linux/libifd_swicc.so
CHANNELID         0x00000001
"#;

fn main() {
    if !is_root() {
        eprintln!("Error: This installer must be run as root (use sudo)");
        process::exit(1);
    }

    println!("Installing ifd-swicc IFD handler...");

    let lib_path = match find_library() {
        Some(path) => path,
        None => {
            eprintln!("Error: Could not find {}", LIBRARY);
            eprintln!("Make sure you have built the library with: cargo build --release");
            process::exit(1);
        }
    };
    println!("Found library at: {}", lib_path.display());

    if let Err(e) = install(&lib_path) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    println!();
    println!("IFD handler installed successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Restart pcscd: sudo systemctl restart pcscd");
    println!("  2. Start the swICC card simulator and point it at port 37324");
    println!("  3. Verify with: pcsc_scan");
}

fn install(lib_path: &Path) -> io::Result<()> {
    let bundle_contents = Path::new(BUNDLE_DIR).join("Contents");
    let bundle_linux = bundle_contents.join("Linux");

    fs::create_dir_all(&bundle_linux)?;
    println!("Created bundle directory: {}", BUNDLE_DIR);

    fs::write(bundle_contents.join("Info.plist"), INFO_PLIST)?;
    println!("Wrote Info.plist");

    let dest_lib = bundle_linux.join(LIBRARY);
    fs::copy(lib_path, &dest_lib)?;
    println!("Copied library to: {}", dest_lib.display());

    fs::create_dir_all(CONF_DIR)?;
    let conf_path = Path::new(CONF_DIR).join("swicc");
    fs::write(&conf_path, READER_CONF)?;
    println!("Wrote reader configuration: {}", conf_path.display());
    Ok(())
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

fn find_library() -> Option<PathBuf> {
    let locations = [
        // Current directory (for development)
        PathBuf::from("target/release").join(LIBRARY),
        PathBuf::from("../target/release").join(LIBRARY),
        // System library paths
        PathBuf::from("/usr/local/lib").join(LIBRARY),
        PathBuf::from("/usr/lib").join(LIBRARY),
    ];

    if let Some(path) = locations.iter().find(|path| path.exists()) {
        return Some(path.clone());
    }

    env::var("LD_LIBRARY_PATH").ok().and_then(|ld_path| {
        ld_path
            .split(':')
            .map(|dir| Path::new(dir).join(LIBRARY))
            .find(|path| path.exists())
    })
}
