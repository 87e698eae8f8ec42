#![no_main]

use libfuzzer_sys::fuzz_target;
use phaseloop::config::{ConfigLimits, ConfigLoader, LoaderOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        let loader = ConfigLoader::new(LoaderOptions {
            config_limits: ConfigLimits::default(),
            seed_override: None,
        });

        // Errors are fine; panics are not.
        let _ = loader.load_from_str(yaml_str);
    }
});
