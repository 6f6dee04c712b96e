//! Quality gate
//!
//! Rejects extracted candidates that are empty, too short, or short generic
//! landing-page text. Long bodies are never rejected merely for containing a
//! generic phrase.

use crate::config::QualityConfig;
use crate::extract::ExtractedCandidate;
use std::fmt;

/// Generic onboarding phrases, lowercase, across the supported languages
const LANDING_PHRASES: &[&str] = &[
    // en
    "welcome",
    "join us",
    "join the community",
    "sign up",
    "sign in",
    "log in",
    "create an account",
    "get started",
    // fr
    "bienvenue",
    "rejoignez",
    "inscrivez-vous",
    "connectez-vous",
    // es
    "bienvenido",
    "bienvenida",
    "únete",
    "regístrate",
    "inicia sesión",
    // de
    "willkommen",
    "registrieren",
    "anmelden",
    // it
    "benvenuto",
    "benvenuti",
    "iscriviti",
    // pt
    "bem-vindo",
    "cadastre-se",
];

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyTitle,
    EmptyBody,
    TooShort { chars: usize, min: usize },
    LandingPage { phrase: &'static str, chars: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "empty title"),
            Self::EmptyBody => write!(f, "empty body"),
            Self::TooShort { chars, min } => {
                write!(f, "body too short ({} chars, minimum {})", chars, min)
            }
            Self::LandingPage { phrase, chars } => {
                write!(f, "landing page text ('{}', {} chars)", phrase, chars)
            }
        }
    }
}

/// Accept/reject rules for extracted candidates
#[derive(Debug, Clone)]
pub struct QualityGate {
    min_body_chars: usize,
    landing_page_chars: usize,
}

impl QualityGate {
    pub fn new(min_body_chars: usize, landing_page_chars: usize) -> Self {
        Self {
            min_body_chars,
            landing_page_chars,
        }
    }

    pub fn from_config(config: &QualityConfig) -> Self {
        Self::new(config.min_body_chars, config.landing_page_chars)
    }

    /// Checks a title/body pair
    pub fn check(&self, title: &str, body: &str) -> Result<(), Rejection> {
        if title.trim().is_empty() {
            return Err(Rejection::EmptyTitle);
        }
        if body.trim().is_empty() {
            return Err(Rejection::EmptyBody);
        }

        let chars = body.chars().count();
        if chars < self.min_body_chars {
            return Err(Rejection::TooShort {
                chars,
                min: self.min_body_chars,
            });
        }

        if chars < self.landing_page_chars {
            if let Some(phrase) = landing_phrase(title).or_else(|| landing_phrase(body)) {
                return Err(Rejection::LandingPage { phrase, chars });
            }
        }

        Ok(())
    }

    pub fn validate(&self, candidate: &ExtractedCandidate) -> Result<(), Rejection> {
        self.check(&candidate.title, &candidate.body)
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}

fn landing_phrase(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    LANDING_PHRASES
        .iter()
        .copied()
        .find(|phrase| lowered.contains(phrase))
}
