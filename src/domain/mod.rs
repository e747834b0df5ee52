//! Record shapes shared by storage, use cases and the HTTP layer.
//!
//! Field names match the backing Postgres columns so rows round-trip through
//! PostgREST without renaming.

pub mod animals;
pub mod breeding;
pub mod finance;
pub mod health;
pub mod housing;
pub mod notifications;
pub mod organization;
pub mod settings;

pub use animals::{Animal, AnimalKind, AnimalStatus, AnimalUpdate, NewAnimal, Sex};
pub use breeding::{BreedingMethod, BreedingRecord, BreedingStatus, Farrowing, FarrowingOutcome, NewBreeding, Weaning};
pub use finance::{FinancialKind, FinancialRecord, NewFinancialRecord};
pub use health::{HealthEvent, HealthEventType, NewHealthEvent};
pub use housing::{HousingAssignment, HousingUnit, HousingUnitType, NewAssignment, NewHousingUnit};
pub use notifications::{
    Channel, NewScheduledNotification, Notification, NotificationType, PushSubscription,
    ScheduledNotification,
};
pub use organization::{AuthUser, Membership, Organization, Role, TeamInvite};
pub use settings::OrganizationSettings;
