//! Closed catalogs: secret token shapes, destructive schema patterns,
//! scan exemptions. Precision over recall; a pattern goes in only when a
//! match is actionable on its own.

use lazy_static::lazy_static;
use regex::Regex;

use crate::findings::Severity;

pub(crate) struct SecretPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub severity: Severity,
}

lazy_static! {
    pub(crate) static ref SECRET_PATTERNS: Vec<SecretPattern> = vec![
        SecretPattern {
            name: "GitHub Personal Access Token",
            regex: Regex::new(r"ghp_[A-Za-z0-9]{36}").unwrap(),
            severity: Severity::Critical,
        },
        SecretPattern {
            name: "GitHub Fine-Grained Token",
            regex: Regex::new(r"github_pat_[A-Za-z0-9]{22}_[A-Za-z0-9]{59}").unwrap(),
            severity: Severity::Critical,
        },
        SecretPattern {
            name: "AWS Access Key ID",
            regex: Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
            severity: Severity::Critical,
        },
        SecretPattern {
            name: "Stripe Live Secret Key",
            regex: Regex::new(r"sk_live_[A-Za-z0-9]{24,}").unwrap(),
            severity: Severity::Critical,
        },
        SecretPattern {
            name: "Stripe Live Publishable Key",
            regex: Regex::new(r"pk_live_[A-Za-z0-9]{24,}").unwrap(),
            severity: Severity::Warning,
        },
        SecretPattern {
            name: "Slack Bot Token",
            regex: Regex::new(r"xoxb-\d{11,13}-\d{11,13}-[A-Za-z0-9]{24}").unwrap(),
            severity: Severity::Critical,
        },
        SecretPattern {
            name: "Slack User Token",
            regex: Regex::new(r"xoxp-\d{11,13}-\d{11,13}-[A-Za-z0-9]{24}").unwrap(),
            severity: Severity::Critical,
        },
        SecretPattern {
            name: "SendGrid API Key",
            regex: Regex::new(r"SG\.[A-Za-z0-9_-]{22}\.[A-Za-z0-9_-]{43}").unwrap(),
            severity: Severity::Critical,
        },
        // An account SID alone is not a credential; informational tier.
        SecretPattern {
            name: "Twilio Account SID",
            regex: Regex::new(r"AC[a-f0-9]{32}").unwrap(),
            severity: Severity::Warning,
        },
    ];

    pub(crate) static ref PRIVATE_KEY: Regex =
        Regex::new(r"-----BEGIN (RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----").unwrap();

    pub(crate) static ref ENV_BASENAME: Regex =
        Regex::new(r"^\.env$|^\.env\.(local|production|staging)$").unwrap();

    pub(crate) static ref WITHOUT_AUTH_MIDDLEWARE: Regex =
        Regex::new(r#"(?i)->withoutMiddleware\(\s*\[?\s*['"](auth|verified|can|admin)"#).unwrap();

    pub(crate) static ref SCHEMA_DROP_TABLE: Regex =
        Regex::new(r#"Schema::(drop|dropIfExists)\(\s*['"]([^'"]+)['"]"#).unwrap();
    pub(crate) static ref DROP_COLUMN: Regex = Regex::new(r"(Schema::|->\s*)dropColumn\(").unwrap();
    pub(crate) static ref SCHEMA_RENAME_TABLE: Regex = Regex::new(r"Schema::rename\(").unwrap();
    pub(crate) static ref RENAME_COLUMN: Regex = Regex::new(r"->\s*renameColumn\(").unwrap();
    pub(crate) static ref QUOTED: Regex = Regex::new(r#"['"]([^'"]+)['"]"#).unwrap();
}

/// Key material basenames that leak whole identities by themselves.
pub(crate) const KEYFILE_BASENAMES: &[&str] = &["id_rsa", "id_ed25519", "id_ecdsa"];

/// Dependency lockfiles whose modification is always worth surfacing.
pub(crate) const LOCKFILE_BASENAMES: &[&str] = &[
    "composer.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Gemfile.lock",
    "poetry.lock",
];

/// Path fragments exempt from secret and private-key scanning. Minified,
/// vendored, and binary-adjacent content produces unactionable matches.
pub(crate) const SCAN_SKIPLIST: &[&str] = &[
    ".lock",
    ".min.js",
    ".min.css",
    ".map",
    ".png",
    ".jpg",
    ".jpeg",
    ".gif",
    ".svg",
    ".ico",
    ".webp",
    ".woff",
    ".woff2",
    ".ttf",
    ".eot",
    "/vendor/",
    "/node_modules/",
    "/dist/",
    "/build/",
    "__pycache__",
];
