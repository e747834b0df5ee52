//! Defaults shared by the server, the cron processor and the operator binaries.

pub const DEFAULT_CONFIG_FILE: &str = "farmstead.toml";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_METRICS_PORT: u16 = 9898;

/// Page size for one cron pass over due scheduled notifications.
pub const DEFAULT_NOTIFICATION_BATCH_SIZE: usize = 50;

// Swine husbandry defaults (overridable per organization)
pub const GESTATION_DAYS: i64 = 114;
pub const HEAT_CHECK_DAYS: i64 = 21;
pub const PREGNANCY_CHECK_DAYS: i64 = 28;
pub const FARROWING_PREP_DAYS: i64 = 4;
pub const WEANING_AGE_DAYS: i64 = 21;
pub const REMINDER_LEAD_DAYS: i64 = 1;
pub const REMINDER_HOUR_UTC: u32 = 8;

/// Upper bound for each count recorded on one litter.
pub const MAX_LITTER_COUNT: i32 = 40;
pub const MAX_WITHDRAWAL_DAYS: i32 = 365;

// Prop 12 (California Health & Safety Code 25990)
pub const PROP12_MIN_SPACE_SQFT: f64 = 24.0;
pub const PROP12_MAX_HOURS_PER_DAY: f64 = 6.0;
pub const PROP12_MAX_HOURS_PER_30_DAYS: f64 = 24.0;
pub const PROP12_PRE_FARROWING_EXEMPT_DAYS: i64 = 5;

pub const INVITE_TTL_DAYS: i64 = 7;
pub const INVITE_TOKEN_BYTES: usize = 32;

pub const SLUG_MAX_LEN: usize = 48;
pub const SLUG_FALLBACK: &str = "farm";

// Web push presentation
pub const PUSH_ICON: &str = "/icons/icon-192.png";
pub const PUSH_BADGE: &str = "/icons/badge-72.png";
pub const PUSH_TTL_SECONDS: u32 = 24 * 60 * 60;
