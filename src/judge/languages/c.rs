//! C language handler

use super::LanguageHandler;

/// Get handler for C
pub fn handler() -> LanguageHandler {
    LanguageHandler {
        language: "c".to_string(),
        display_name: "C11 (GCC)".to_string(),
        version: "gcc 12".to_string(),
        source_file: "main.c".to_string(),
        image: None,
        compile_command: Some("gcc -O2 -std=c11 -o /tmp/main /tmp/main.c -lm".to_string()),
        run_command: "/tmp/main".to_string(),
    }
}
