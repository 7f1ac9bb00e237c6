pub mod auth;
pub mod credential_encryption;
pub mod destination;
pub mod egress;
pub mod media_token;
pub mod participant;
pub mod recording;
pub mod room;
pub mod user;

pub use auth::{SessionClaims, SessionTokenService};
pub use credential_encryption::CredentialEncryption;
pub use destination::DestinationService;
pub use egress::{EgressClient, EgressFileResult, EgressStarted, EgressStopped, StreamUpdated};
pub use media_token::{MediaTokenService, VideoGrant};
pub use participant::{ConnectedParticipant, ParticipantService};
pub use recording::RecordingService;
pub use room::RoomService;
pub use user::UserService;
