const ENV_FILE: &str = ".env";
const ENV_PREFIX: &str = "TEMPREPORTER_";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", ENV_FILE);
    emit_overrides_from_env_file();
    embuild::espidf::sysenv::output();
}

/// Forwards `TEMPREPORTER_*` keys from a local `.env` to `option_env!` in the firmware
fn emit_overrides_from_env_file() {
    let Ok(entries) = dotenvy::from_filename_iter(ENV_FILE) else {
        return;
    };

    for entry in entries {
        match entry {
            Ok((key, value)) if key.starts_with(ENV_PREFIX) => {
                println!("cargo:rustc-env={}={}", key, value);
            }
            Ok(_) => {}
            Err(e) => println!("cargo:warning=Skipping malformed {} line: {}", ENV_FILE, e),
        }
    }
}
