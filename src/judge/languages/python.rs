//! Python language handler

use super::LanguageHandler;
use crate::constants::container_images;

/// Get handler for Python
pub fn handler() -> LanguageHandler {
    LanguageHandler {
        language: "python".to_string(),
        display_name: "Python 3".to_string(),
        version: "3.11".to_string(),
        source_file: "main.py".to_string(),
        image: Some(container_images::PYTHON.to_string()),
        compile_command: None,
        run_command: "python3 /tmp/main.py".to_string(),
    }
}
