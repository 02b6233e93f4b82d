//! JavaScript language handler

use super::LanguageHandler;
use crate::constants::container_images;

/// Get handler for JavaScript on Node.js
pub fn handler() -> LanguageHandler {
    LanguageHandler {
        language: "javascript".to_string(),
        display_name: "JavaScript (Node.js)".to_string(),
        version: "node 20".to_string(),
        source_file: "main.js".to_string(),
        image: Some(container_images::JAVASCRIPT.to_string()),
        compile_command: None,
        run_command: "node /tmp/main.js".to_string(),
    }
}
