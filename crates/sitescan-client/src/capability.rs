use std::path::{Path, PathBuf};

use sitescan_core::capability::Capabilities;

/// Executable names searched on `$PATH` when no well-known location matches.
const CHROME_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Probe the runtime once at startup.
///
/// The render fallback is available only when this build includes the
/// `browser` feature and a Chrome/Chromium binary can be found.
pub fn probe_capabilities() -> Capabilities {
    let chrome = find_chrome_binary();
    let render_fallback = cfg!(feature = "browser") && chrome.is_some();
    match &chrome {
        Some(bin) if render_fallback => {
            tracing::info!(chrome = %bin.display(), "Render fallback available");
        }
        Some(_) => {
            tracing::info!("Chrome found but this build lacks the browser feature");
        }
        None => tracing::info!("No Chrome binary found, render fallback disabled"),
    }
    Capabilities::new(render_fallback)
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// `CHROME_BIN` wins when it points at an existing file. Snap-packaged
/// Chromium is checked before its `/snap/bin` wrapper, which strips the
/// headless flags. Falls back to a `$PATH` search.
pub fn find_chrome_binary() -> Option<PathBuf> {
    let override_path = std::env::var_os("CHROME_BIN").map(PathBuf::from);
    let path_var = std::env::var_os("PATH");
    locate_chrome(override_path.as_deref(), path_var.as_deref())
}

fn locate_chrome(override_path: Option<&Path>, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    if let Some(path) = override_path.filter(|p| p.is_file()) {
        return Some(path.to_path_buf());
    }

    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ];
    if let Some(found) = candidates.iter().map(PathBuf::from).find(|p| p.is_file()) {
        return Some(found);
    }

    let path_var = path_var?;
    std::env::split_paths(path_var)
        .flat_map(|dir| CHROME_NAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}
