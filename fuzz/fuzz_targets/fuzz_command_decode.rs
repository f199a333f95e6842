#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Any text frame either decodes to a known command or is rejected.
    match powder_core::decode(data) {
        Ok(cmd) => {
            assert!(!cmd.name().is_empty());
        }
        Err(e) => {
            let _ = e.to_string();
        }
    }
    // The same payload inside a well-formed envelope must not panic either.
    let wrapped = serde_json::json!({ "command": "setSetting", "key": data }).to_string();
    assert!(powder_core::decode(&wrapped).is_ok());
});
