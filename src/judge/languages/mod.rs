//! Language-specific recipes for compilation and execution

pub mod c;
pub mod cpp;
pub mod java;
pub mod python;
pub mod javascript;

use base64::Engine;

use crate::{
    constants::{
        self, COMPILE_ERROR_EXIT_CODE, COMPILE_ERROR_MARKER, COMPILE_OUTPUT_LIMIT_BYTES,
        MEMORY_KB_MARKER, RUN_MS_MARKER, TIMEOUT_EXIT_CODE,
    },
    config::{DockerConfig, JudgeConfig},
    error::AdmissionError,
};

/// Settings shared by every recipe a worker builds
#[derive(Debug, Clone)]
pub struct RecipeSettings {
    /// Image used by compiled languages
    pub judge_image: String,
    pub compile_timeout_ms: u64,
    pub safety_margin_ms: u64,
    pub output_limit_bytes: usize,
}

impl RecipeSettings {
    pub fn from_config(docker: &DockerConfig, judge: &JudgeConfig) -> Self {
        Self {
            judge_image: docker.judge_image.clone(),
            compile_timeout_ms: judge.compile_timeout_ms,
            safety_margin_ms: judge.safety_margin_ms,
            output_limit_bytes: docker.output_limit_bytes,
        }
    }
}

/// A ready-to-run shell invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub image: String,
    pub command: String,
    /// Wall-clock budget for the whole script
    pub deadline_ms: u64,
}

/// Language handler for compilation and execution
#[derive(Debug, Clone)]
pub struct LanguageHandler {
    language: String,
    display_name: String,
    version: String,
    source_file: String,
    /// Fixed upstream image; `None` means the configured judge image
    image: Option<String>,
    compile_command: Option<String>,
    run_command: String,
}

impl LanguageHandler {
    /// Get handler for a language token or one of its aliases
    pub fn for_language(language: &str) -> Result<Self, AdmissionError> {
        match canonical(language) {
            Some(constants::languages::C) => Ok(c::handler()),
            Some(constants::languages::CPP) => Ok(cpp::handler()),
            Some(constants::languages::JAVA) => Ok(java::handler()),
            Some(constants::languages::PYTHON) => Ok(python::handler()),
            Some(constants::languages::JAVASCRIPT) => Ok(javascript::handler()),
            _ => Err(AdmissionError::LanguageUnsupported(language.trim().to_string())),
        }
    }

    /// Canonical language token
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Human-readable name, e.g. `C++17 (GCC)`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_compiled(&self) -> bool {
        self.compile_command.is_some()
    }

    /// Image this language runs in
    pub fn image(&self, judge_image: &str) -> String {
        self.image.clone().unwrap_or_else(|| judge_image.to_string())
    }

    /// Wall-clock budget of one recipe run for a given time limit
    pub fn deadline_ms(&self, time_limit_ms: u64, settings: &RecipeSettings) -> u64 {
        let compile = if self.is_compiled() {
            settings.compile_timeout_ms
        } else {
            0
        };
        compile + time_limit_ms + settings.safety_margin_ms
    }

    /// Assemble the script that compiles `source`, feeds it `input_len` bytes
    /// of stdin and runs it under `time_limit_ms`.
    pub fn build_command(
        &self,
        source: &str,
        input_len: usize,
        time_limit_ms: u64,
        settings: &RecipeSettings,
    ) -> Recipe {
        let encoded = base64::engine::general_purpose::STANDARD.encode(source);
        let mut script = String::with_capacity(encoded.len() + 1024);

        script.push_str("cd /tmp\n");
        script.push_str(&format!(
            "printf '%s' '{encoded}' | base64 -d > /tmp/{}\n",
            self.source_file
        ));

        // Stdin arrives over the attached stream; read exactly what was sent
        if input_len > 0 {
            script.push_str(&format!("head -c {input_len} > /tmp/input\n"));
        } else {
            script.push_str(": > /tmp/input\n");
        }

        if let Some(compile) = &self.compile_command {
            script.push_str(&format!(
                "if ! timeout {} {compile} > /tmp/compile.log 2>&1; then\n\
                 \techo '{COMPILE_ERROR_MARKER}'\n\
                 \thead -c {COMPILE_OUTPUT_LIMIT_BYTES} /tmp/compile.log\n\
                 \texit {COMPILE_ERROR_EXIT_CODE}\n\
                 fi\n",
                seconds(settings.compile_timeout_ms),
            ));
        }

        // GNU time measures the program alone; the cgroup peak also covers the compiler
        script.push_str(&format!(
            "meter=\n\
             if [ -x /usr/bin/time ]; then meter=\"/usr/bin/time -f %M -o /tmp/run.mem\"; fi\n\
             start=$(date +%s%N)\n\
             timeout -k 1 {} $meter {} < /tmp/input > /tmp/output 2>&1\n\
             status=$?\n\
             end=$(date +%s%N)\n\
             elapsed=$(( (end - start + 999999) / 1000000 ))\n\
             if [ \"$status\" -ne 0 ] && [ \"$elapsed\" -ge {time_limit_ms} ]; then status={TIMEOUT_EXIT_CODE}; fi\n\
             head -c {} /tmp/output\n\
             echo \"{RUN_MS_MARKER} $elapsed\" >&2\n\
             mem_kb=$(tail -n 1 /tmp/run.mem 2>/dev/null)\n\
             case \"$mem_kb\" in ''|*[!0-9]*)\n\
             \tmem=$(cat /sys/fs/cgroup/memory.peak 2>/dev/null || cat /sys/fs/cgroup/memory/memory.max_usage_in_bytes 2>/dev/null || echo 0)\n\
             \tmem_kb=$(( mem / 1024 ));;\n\
             esac\n\
             echo \"{MEMORY_KB_MARKER} $mem_kb\" >&2\n\
             exit $status\n",
            seconds(time_limit_ms.max(1)),
            self.run_command,
            settings.output_limit_bytes,
        ));

        Recipe {
            image: self.image(&settings.judge_image),
            command: script,
            deadline_ms: self.deadline_ms(time_limit_ms, settings),
        }
    }
}

/// Resolve a user-supplied language token to its canonical form
pub fn canonical(language: &str) -> Option<&'static str> {
    let token = language.trim().to_ascii_lowercase();
    let canonical = match token.as_str() {
        "c" | "gcc" | "c11" => constants::languages::C,
        "cpp" | "c++" | "cxx" | "g++" | "cpp17" => constants::languages::CPP,
        "java" | "java17" => constants::languages::JAVA,
        "python" | "py" | "python3" => constants::languages::PYTHON,
        "javascript" | "js" | "node" | "nodejs" => constants::languages::JAVASCRIPT,
        _ => return None,
    };
    Some(canonical)
}

/// Format milliseconds as a `timeout` duration; zero would disable the timeout
fn seconds(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RecipeSettings {
        RecipeSettings {
            judge_image: "judgeflow/judge:test".to_string(),
            compile_timeout_ms: 10_000,
            safety_margin_ms: 3_000,
            output_limit_bytes: 65_536,
        }
    }

    #[test]
    fn test_settings_from_config() {
        let s = RecipeSettings::from_config(&DockerConfig::default(), &JudgeConfig::default());
        assert_eq!(s.judge_image, constants::DEFAULT_JUDGE_IMAGE);
        assert_eq!(s.compile_timeout_ms, constants::DEFAULT_COMPILE_TIMEOUT_MS);
        assert_eq!(s.output_limit_bytes, constants::DEFAULT_OUTPUT_LIMIT_BYTES);
    }

    #[test]
    fn test_aliases_resolve() {
        for (token, expected) in [
            ("C++", "cpp"),
            (" g++ ", "cpp"),
            ("py", "python"),
            ("NodeJS", "javascript"),
            ("java17", "java"),
            ("gcc", "c"),
        ] {
            let handler = LanguageHandler::for_language(token).unwrap();
            assert_eq!(handler.language(), expected, "token {token}");
        }
    }

    #[test]
    fn test_unknown_language() {
        let err = LanguageHandler::for_language("cobol").unwrap_err();
        assert_eq!(err, AdmissionError::LanguageUnsupported("cobol".to_string()));
    }

    #[test]
    fn test_images() {
        let s = settings();
        let cpp = LanguageHandler::for_language("cpp").unwrap();
        assert_eq!(cpp.image(&s.judge_image), "judgeflow/judge:test");

        let py = LanguageHandler::for_language("python").unwrap();
        assert_eq!(py.image(&s.judge_image), "python:3.11-slim");

        let js = LanguageHandler::for_language("js").unwrap();
        assert_eq!(js.image(&s.judge_image), "node:20-slim");
    }

    #[test]
    fn test_compiled_recipe_shape() {
        let cpp = LanguageHandler::for_language("cpp").unwrap();
        let recipe = cpp.build_command("int main(){}", 3, 1_000, &settings());

        let encoded = base64::engine::general_purpose::STANDARD.encode("int main(){}");
        assert!(recipe.command.contains(&encoded));
        assert!(recipe.command.contains("head -c 3 > /tmp/input"));
        assert!(recipe.command.contains("g++ -O2 -std=c++17"));
        assert!(recipe.command.contains(COMPILE_ERROR_MARKER));
        assert!(recipe.command.contains("exit 200"));
        assert!(recipe.command.contains("timeout -k 1 1.000s $meter /tmp/main < /tmp/input > /tmp/output 2>&1"));
        assert!(recipe.command.contains("head -c 65536 /tmp/output"));
        assert_eq!(recipe.deadline_ms, 10_000 + 1_000 + 3_000);
    }

    #[test]
    fn test_interpreted_recipe_has_no_compile_step() {
        let py = LanguageHandler::for_language("python").unwrap();
        let recipe = py.build_command("print(1)", 0, 250, &settings());

        assert!(!recipe.command.contains(COMPILE_ERROR_MARKER));
        assert!(recipe.command.contains(": > /tmp/input"));
        assert!(recipe.command.contains("timeout -k 1 0.250s $meter python3 /tmp/main.py"));
        assert_eq!(recipe.deadline_ms, 250 + 3_000);
    }

    #[test]
    fn test_memory_is_measured_on_the_run_step() {
        let c = LanguageHandler::for_language("c").unwrap();
        let recipe = c.build_command("int main(){}", 0, 1_000, &settings());

        let metered = recipe.command.find("/usr/bin/time -f %M").unwrap();
        let compiled = recipe.command.find("/tmp/compile.log").unwrap();
        assert!(compiled < metered);
        assert!(recipe.command.contains("tail -n 1 /tmp/run.mem"));
        // cgroup peak only when GNU time is missing from the image
        assert!(recipe.command.contains("/sys/fs/cgroup/memory.peak"));
    }

    #[test]
    fn test_sub_millisecond_runs_round_up() {
        let py = LanguageHandler::for_language("python").unwrap();
        let recipe = py.build_command("pass", 0, 1_000, &settings());
        assert!(recipe.command.contains("elapsed=$(( (end - start + 999999) / 1000000 ))"));
        assert!(!recipe.command.contains("elapsed=$(( (end - start) / 1000000 ))"));
    }

    #[test]
    fn test_display_metadata() {
        let cpp = LanguageHandler::for_language("cpp").unwrap();
        assert_eq!(cpp.display_name(), "C++17 (GCC)");
        assert!(!cpp.version().is_empty());
        for language in constants::languages::ALL {
            assert!(LanguageHandler::for_language(language).is_ok());
        }
    }
}
