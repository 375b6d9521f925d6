use smartstring::alias::String as SmartString;

/// Opaque session identity that issues changes. One actor per live client
/// session (spec §3). Typically a UUID string, but the core treats it as
/// an opaque, totally-ordered-by-bytes string.
pub type ActorID = SmartString;

/// Placeholder actor tag used for tickets issued before the real actor id
/// is known (spec.md §9, Open Question 1 — see DESIGN.md for the
/// rewrite-in-place decision). Never observed outside a single
/// `ChangeContext`/`Change` that hasn't yet been rewritten via
/// `Change::set_actor`.
pub fn local_actor_placeholder() -> ActorID {
    SmartString::from("")
}

pub fn is_placeholder(actor: &ActorID) -> bool {
    actor.is_empty()
}
