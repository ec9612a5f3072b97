// build.rs — wkhtml-locate
//
// Handles the optional `bundled` feature: when active, copies the
// wkhtmltoimage executable pointed to by `WKHTMLTOIMAGE_BUNDLE_EXE` into
// Cargo's output directory and generates a tiny Rust source file that embeds
// the bytes with `include_bytes!`.

use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=WKHTMLTOIMAGE_BUNDLE_EXE");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_BUNDLED");

    if std::env::var("CARGO_FEATURE_BUNDLED").is_err() {
        return;
    }

    // ── Locate the source executable ──────────────────────────────────────
    let exe_src = match std::env::var("WKHTMLTOIMAGE_BUNDLE_EXE") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => {
            panic!(
                "\n\
                 ┌─────────────────────────────────────────────────────────┐\n\
                 │  wkhtml-locate: `bundled` feature activated but         │\n\
                 │  `WKHTMLTOIMAGE_BUNDLE_EXE` is not set.                 │\n\
                 │                                                         │\n\
                 │  Set it to the path of wkhtmltoimage.exe to embed.      │\n\
                 │                                                         │\n\
                 │  Installers are available from:                         │\n\
                 │  https://wkhtmltopdf.org/downloads.html                 │\n\
                 └─────────────────────────────────────────────────────────┘\n"
            )
        }
    };

    if !exe_src.exists() {
        panic!(
            "wkhtml-locate: WKHTMLTOIMAGE_BUNDLE_EXE points to a file that does not exist: {}",
            exe_src.display()
        );
    }

    // ── Copy into OUT_DIR with a fixed name ───────────────────────────────
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));
    let exe_dest = out_dir.join("bundled_wkhtmltoimage");

    std::fs::copy(&exe_src, &exe_dest).unwrap_or_else(|e| {
        panic!(
            "wkhtml-locate: failed to copy {} → {}: {}",
            exe_src.display(),
            exe_dest.display(),
            e
        )
    });

    // `include_bytes!` needs a literal path, so the invocation lives in a
    // generated file pulled in with `include!()`.
    let bundled_rs = out_dir.join("bundled.rs");
    let code = r#"
/// The wkhtmltoimage executable embedded at compile time.
pub static TOOL_BYTES: &[u8] = include_bytes!("bundled_wkhtmltoimage");
"#;
    std::fs::write(&bundled_rs, code).unwrap_or_else(|e| {
        panic!(
            "wkhtml-locate: failed to write {}: {}",
            bundled_rs.display(),
            e
        )
    });

    println!("cargo:rerun-if-changed={}", exe_dest.display());
}
