pub mod destination;
pub mod id;
pub mod participant;
pub mod recording;
pub mod room;
pub mod scene;
pub mod user;

pub use destination::{Destination, DestinationConfig, DestinationKind};
pub use id::{DestinationId, ParticipantId, RecordingId, RoomId, SceneId, UserId};
pub use participant::{Participant, ParticipantRole};
pub use recording::Recording;
pub use room::{Room, RoomStatus, RoomWithCounts};
pub use scene::{Scene, SceneLayout};
pub use user::User;
