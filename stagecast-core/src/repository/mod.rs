pub mod destination;
pub mod participant;
pub mod recording;
pub mod room;
pub mod scene;
pub mod user;

pub use destination::{DestinationRecord, DestinationRepository};
pub use participant::ParticipantRepository;
pub use recording::RecordingRepository;
pub use room::RoomRepository;
pub use scene::SceneRepository;
pub use user::UserRepository;
