//! Identity and payload types shared by every bus component.

use serde::{Deserialize, Serialize};

/// Opaque handle to an object living in host entity storage.
///
/// Producer templates, link targets, sender accounts, placeholders and created
/// events are all plain entities from the bus's point of view. The value `0`
/// is the null handle and never identifies a live object.
///
/// # Examples
///
/// ```rust
/// use payload_bus::Entity;
///
/// let building = Entity(42);
/// assert!(!building.is_null());
/// assert_eq!(Entity::NULL.non_null(), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// The null handle.
    pub const NULL: Entity = Entity(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns `None` for the null handle, `Some(self)` otherwise.
    pub fn non_null(self) -> Option<Entity> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Monotonic sequence number assigned to every pending payload at enqueue time.
///
/// Tickets give a total order used for FIFO tie-breaking and are the only
/// stable identity used when an item is unlinked from several indices at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Single-use correlation token carried by a placeholder through the host pipeline.
///
/// Tokens come from their own counter; `0` is reserved and never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationToken(pub u64);

impl CorrelationToken {
    /// The reserved, never-issued token value.
    pub const INVALID: CorrelationToken = CorrelationToken(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "token:{}", self.0)
    }
}

/// The custom data a producer wants stamped onto a future host event.
///
/// The bus treats the body as opaque, except that `sender` is used as the
/// implied sender when scoring variant-aware matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadBody {
    /// Key of the text in the sliding text window.
    pub text_key: String,
    /// Sender account the event should show.
    pub sender: Option<Entity>,
    /// Object the event should link to.
    pub target: Option<Entity>,
    /// Display-name override for the sender row.
    pub sender_name: Option<String>,
}

impl PayloadBody {
    pub fn new(text_key: impl Into<String>) -> Self {
        Self {
            text_key: text_key.into(),
            ..Self::default()
        }
    }

    pub fn with_sender(mut self, sender: Entity) -> Self {
        self.sender = sender.non_null();
        self
    }

    pub fn with_target(mut self, target: Entity) -> Self {
        self.target = target.non_null();
        self
    }

    /// Sets the sender-name override. Blank names are ignored.
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.sender_name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }
}

/// Data carried by a placeholder entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub token: CorrelationToken,
    /// Real link target to put back in place of the placeholder, if any.
    pub final_target: Option<Entity>,
}

/// A freshly created host event, as observed by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedEvent {
    pub id: Entity,
    /// Concrete producer the host instantiated the event from.
    pub producer: Entity,
    /// Sender the host assigned, if any.
    pub sender: Option<Entity>,
}

/// Which heuristic strategy claimed a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeuristicStrategy {
    ExactTarget,
    Variant,
    Producer,
}

impl std::fmt::Display for HeuristicStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HeuristicStrategy::ExactTarget => "exact-target",
            HeuristicStrategy::Variant => "variant",
            HeuristicStrategy::Producer => "producer",
        };
        f.write_str(name)
    }
}

/// Outcome of resolving a created event against the bus.
///
/// Token matches and heuristic matches are kept apart because only the former
/// is exact; callers that care can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Claimed through a placeholder token.
    Token(PayloadBody),
    /// Claimed by one of the heuristic strategies.
    Heuristic {
        body: PayloadBody,
        strategy: HeuristicStrategy,
    },
    /// Nothing matched; `admitted` is the admission sampler's verdict.
    Unmatched { admitted: bool },
}

impl Resolution {
    pub fn body(&self) -> Option<&PayloadBody> {
        match self {
            Resolution::Token(body) | Resolution::Heuristic { body, .. } => Some(body),
            Resolution::Unmatched { .. } => None,
        }
    }

    pub fn into_body(self) -> Option<PayloadBody> {
        match self {
            Resolution::Token(body) | Resolution::Heuristic { body, .. } => Some(body),
            Resolution::Unmatched { .. } => None,
        }
    }

    /// Whether the event should stay alive.
    pub fn keeps_event(&self) -> bool {
        match self {
            Resolution::Unmatched { admitted } => *admitted,
            _ => true,
        }
    }
}
