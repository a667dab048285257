pub mod challenge;
pub mod content;
pub mod principal;
pub mod validation;

pub use challenge::{
    Category, ChallengeRecord, CtfChallenge, CtfFields, Difficulty, HackTheBoxMachine,
    MachineFields, OsType, RoomFields, TryHackMeRoom,
};
pub use content::{SectionContentEntry, SectionCopy, StaticContentEntry};
pub use principal::{Principal, Session, SessionEvent, SignOutScope};
pub use validation::{ValidationError, Validator};
