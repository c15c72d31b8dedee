//! Registry of the environment variables the configuration layer reads.
//!
//! All variables use the `ONBOARDING_` prefix with `__` separating nested
//! config paths (e.g., `ONBOARDING_BACKEND__URL`). The `env` subcommand
//! prints this table.

/// An environment variable definition
#[derive(Debug, Clone)]
pub struct EnvVar {
    /// Environment variable name (e.g., "ONBOARDING_BACKEND__URL")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    pub category: EnvVarCategory,
    /// Whether the wizard can run without it
    pub required: bool,
    pub default: Option<&'static str>,
    pub example: Option<&'static str>,
}

/// Categories for organizing environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVarCategory {
    /// Hosted storage and tables
    Backend,
    /// Phone-code verification
    Otp,
    /// Address lookup and nearby shops
    Geocoding,
    /// File path configuration
    Paths,
    Logging,
}

impl EnvVarCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            EnvVarCategory::Backend => "Backend",
            EnvVarCategory::Otp => "OTP",
            EnvVarCategory::Geocoding => "Geocoding",
            EnvVarCategory::Paths => "Paths",
            EnvVarCategory::Logging => "Logging",
        }
    }

    /// All categories in display order
    pub fn all() -> &'static [EnvVarCategory] {
        &[
            EnvVarCategory::Backend,
            EnvVarCategory::Otp,
            EnvVarCategory::Geocoding,
            EnvVarCategory::Paths,
            EnvVarCategory::Logging,
        ]
    }
}

/// Static registry of all documented environment variables
pub static ENV_VARS: &[EnvVar] = &[
    // === Backend ===
    EnvVar {
        name: "ONBOARDING_BACKEND__URL",
        description: "Hosted backend project URL (storage and tables)",
        category: EnvVarCategory::Backend,
        required: true,
        default: None,
        example: Some("https://xyzcompany.supabase.co"),
    },
    EnvVar {
        name: "ONBOARDING_BACKEND__ANON_KEY",
        description: "Public API key sent as apikey and bearer token",
        category: EnvVarCategory::Backend,
        required: true,
        default: None,
        example: Some("eyJhbGciOi..."),
    },
    EnvVar {
        name: "ONBOARDING_BACKEND__BUCKET",
        description: "Storage bucket for company logos and documents",
        category: EnvVarCategory::Backend,
        required: false,
        default: Some("files"),
        example: Some("company-files"),
    },
    EnvVar {
        name: "ONBOARDING_BACKEND__USERS_TABLE",
        description: "Table receiving verified users",
        category: EnvVarCategory::Backend,
        required: false,
        default: Some("users"),
        example: None,
    },
    EnvVar {
        name: "ONBOARDING_BACKEND__COMPANIES_TABLE",
        description: "Table receiving registered companies",
        category: EnvVarCategory::Backend,
        required: false,
        default: Some("companies"),
        example: None,
    },
    EnvVar {
        name: "ONBOARDING_BACKEND__FILES_TABLE",
        description: "Table receiving one row per uploaded document",
        category: EnvVarCategory::Backend,
        required: false,
        default: Some("files"),
        example: None,
    },
    // === OTP ===
    EnvVar {
        name: "ONBOARDING_OTP__BASE_URL",
        description: "Base URL of the code verification service (POST /api/send-otp)",
        category: EnvVarCategory::Otp,
        required: false,
        default: Some("http://localhost:3000"),
        example: Some("https://auth.example.com"),
    },
    // === Geocoding ===
    EnvVar {
        name: "ONBOARDING_GEOCODING__BASE_URL",
        description: "Nominatim-compatible search service",
        category: EnvVarCategory::Geocoding,
        required: false,
        default: Some("https://nominatim.openstreetmap.org"),
        example: None,
    },
    EnvVar {
        name: "ONBOARDING_GEOCODING__COUNTRY_CODE",
        description: "Country address lookups are restricted to",
        category: EnvVarCategory::Geocoding,
        required: false,
        default: Some("sa"),
        example: Some("ae"),
    },
    EnvVar {
        name: "ONBOARDING_GEOCODING__NEARBY_RADIUS_M",
        description: "Radius in meters for the nearby-shop lookup",
        category: EnvVarCategory::Geocoding,
        required: false,
        default: Some("2000"),
        example: Some("500"),
    },
    EnvVar {
        name: "ONBOARDING_GEOCODING__DEBOUNCE_MS",
        description: "Quiet period after the last address edit before it is geocoded",
        category: EnvVarCategory::Geocoding,
        required: false,
        default: Some("500"),
        example: Some("750"),
    },
    EnvVar {
        name: "ONBOARDING_GEOCODING__USER_AGENT",
        description: "User-Agent header sent to the geocoding service",
        category: EnvVarCategory::Geocoding,
        required: false,
        default: None,
        example: Some("acme-onboarding/1.0 (ops@acme.example)"),
    },
    // === Paths ===
    EnvVar {
        name: "ONBOARDING_PATHS__STATE",
        description: "Directory for the saved draft and log files",
        category: EnvVarCategory::Paths,
        required: false,
        default: Some(".onboarding"),
        example: Some("/var/lib/onboarding"),
    },
    EnvVar {
        name: "ONBOARDING_PATHS__DRAFT",
        description: "Saved wizard draft, relative to the state directory",
        category: EnvVarCategory::Paths,
        required: false,
        default: Some("draft.json"),
        example: None,
    },
    // === Logging ===
    EnvVar {
        name: "ONBOARDING_LOGGING__LEVEL",
        description: "Log level filter (RUST_LOG takes precedence)",
        category: EnvVarCategory::Logging,
        required: false,
        default: Some("info"),
        example: Some("debug"),
    },
    EnvVar {
        name: "ONBOARDING_LOGGING__TO_FILE",
        description: "Also write logs to {state}/logs/",
        category: EnvVarCategory::Logging,
        required: false,
        default: Some("false"),
        example: Some("true"),
    },
];

/// Get all environment variables for a given category
pub fn env_vars_for_category(category: EnvVarCategory) -> impl Iterator<Item = &'static EnvVar> {
    ENV_VARS.iter().filter(move |v| v.category == category)
}

/// Get environment variables grouped by category
pub fn env_vars_by_category() -> Vec<(EnvVarCategory, Vec<&'static EnvVar>)> {
    EnvVarCategory::all()
        .iter()
        .map(|cat| {
            let vars: Vec<&EnvVar> = env_vars_for_category(*cat).collect();
            (*cat, vars)
        })
        .filter(|(_, vars)| !vars.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_env_vars_have_descriptions() {
        for var in ENV_VARS {
            assert!(
                !var.description.is_empty(),
                "EnvVar {} has empty description",
                var.name
            );
        }
    }

    #[test]
    fn test_all_env_vars_have_onboarding_prefix() {
        for var in ENV_VARS {
            assert!(
                var.name.starts_with("ONBOARDING_"),
                "EnvVar {} does not have ONBOARDING_ prefix",
                var.name
            );
        }
    }

    #[test]
    fn test_every_category_is_populated() {
        let grouped = env_vars_by_category();
        assert_eq!(grouped.len(), EnvVarCategory::all().len());
    }

    #[test]
    fn test_required_vars_are_backend_credentials() {
        let required: Vec<&str> = ENV_VARS
            .iter()
            .filter(|v| v.required)
            .map(|v| v.name)
            .collect();
        assert_eq!(
            required,
            vec!["ONBOARDING_BACKEND__URL", "ONBOARDING_BACKEND__ANON_KEY"]
        );
    }
}
