//! Java language handler

use super::LanguageHandler;

/// Get handler for Java; the entry class must be `Main`
pub fn handler() -> LanguageHandler {
    LanguageHandler {
        language: "java".to_string(),
        display_name: "Java 17 (OpenJDK)".to_string(),
        version: "openjdk 17".to_string(),
        source_file: "Main.java".to_string(),
        image: None,
        compile_command: Some("javac -d /tmp /tmp/Main.java".to_string()),
        run_command: "java -Xss64m -cp /tmp Main".to_string(),
    }
}
