use nutype::nutype;
use uuid::Uuid;

/// Identity of a game session. Assigned once by the `session_created` event.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 128),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct SessionId(String);

impl SessionId {
    /// Mints a fresh random id. Only called at the command boundary, never while folding.
    pub fn generate() -> Self {
        Self::try_new(Uuid::new_v4().to_string()).expect("a uuid is never empty")
    }
}

/// Stable identity of a player within one session.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 128),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn generate() -> Self {
        Self::try_new(Uuid::new_v4().to_string()).expect("a uuid is never empty")
    }
}

/// Key into the role registry. These ids are the only contract between stored
/// history and the catalogue, so they must never be renamed.
#[nutype(
    sanitize(trim),
    validate(
        not_empty,
        len_char_max = 64,
        predicate = |id| id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct RoleId(String);
