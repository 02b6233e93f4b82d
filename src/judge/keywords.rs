//! Forbidden/required keyword policy on raw source text

use crate::models::Problem;

/// Substring policy of one problem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordGate {
    forbidden: Vec<String>,
    required: Vec<String>,
}

/// Why a source was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordViolation {
    Forbidden(String),
    Missing(String),
}

impl KeywordViolation {
    /// Message stored on the submission
    pub fn message(&self) -> String {
        match self {
            Self::Forbidden(keyword) => format!("Forbidden keyword found: '{keyword}'"),
            Self::Missing(keyword) => format!("Required keyword missing: '{keyword}'"),
        }
    }
}

impl std::fmt::Display for KeywordViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl KeywordGate {
    pub fn new(forbidden: &[String], required: &[String]) -> Self {
        Self {
            forbidden: clean(forbidden),
            required: clean(required),
        }
    }

    pub fn for_problem(problem: &Problem) -> Self {
        Self::new(&problem.forbidden_keywords, &problem.required_keywords)
    }

    /// First violation in stored order; forbidden entries are checked before required ones
    pub fn check(&self, source: &str) -> Result<(), KeywordViolation> {
        if let Some(keyword) = self.forbidden.iter().find(|k| source.contains(k.as_str())) {
            return Err(KeywordViolation::Forbidden(keyword.clone()));
        }

        if let Some(keyword) = self.required.iter().find(|k| !source.contains(k.as_str())) {
            return Err(KeywordViolation::Missing(keyword.clone()));
        }

        Ok(())
    }
}

fn clean(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .cloned()
        .collect()
}
