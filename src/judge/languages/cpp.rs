//! C++ language handler

use super::LanguageHandler;

/// Get handler for C++
pub fn handler() -> LanguageHandler {
    LanguageHandler {
        language: "cpp".to_string(),
        display_name: "C++17 (GCC)".to_string(),
        version: "g++ 12".to_string(),
        source_file: "main.cpp".to_string(),
        image: None,
        compile_command: Some("g++ -O2 -std=c++17 -o /tmp/main /tmp/main.cpp".to_string()),
        run_command: "/tmp/main".to_string(),
    }
}
