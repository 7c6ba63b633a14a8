//! # Event Flags
//!
//! Events are single bits in a 32-bit mask. Producers name them through an
//! [`EventFlag`] enum (usually generated with [`event_flags!`]), combine them
//! with `|`, and post the result to an [`EventSet`](crate::EventSet). Because
//! events are level-coded bits rather than queued messages, posting the same
//! event twice before the consumer wakes coalesces into one delivery.

use core::fmt;

use thiserror::Error;

/// A set of event bits packed into a `u32`.
///
/// `EventMask` is a plain value type: copying it, or-ing two masks together
/// and testing membership are all branch-free bit operations. The newtype
/// exists so that event masks cannot be confused with other integers at API
/// boundaries.
///
/// Bit positions run from 0 (highest priority by convention) to 31.
///
/// ```
/// use flagstate_core::EventMask;
///
/// let a = EventMask::bit(0);
/// let b = EventMask::bit(3);
/// let both = a | b;
///
/// assert!(both.contains(a));
/// assert!(both.intersects(b));
/// assert_eq!(both.count(), 2);
/// assert_eq!(both.iter().collect::<Vec<_>>(), vec![0, 3]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u32);

impl EventMask {
    /// The empty mask. Waiting never returns this; timed waits use it to
    /// signal expiry.
    pub const NONE: Self = Self(0);

    /// All 32 bits set.
    pub const ALL: Self = Self(u32::MAX);

    /// Wraps a raw bit pattern.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The mask with exactly one bit set.
    ///
    /// # Panics
    /// Panics if `pos >= 32`. Positions are checked at compile time when this
    /// is called from a `const` context, which is how [`event_flags!`] uses it.
    #[must_use]
    pub const fn bit(pos: u8) -> Self {
        assert!(pos < 32, "event bit position exceeds the 32-bit mask");
        Self(1 << pos)
    }

    /// `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if every bit of `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if at least one bit of `other` is set in `self`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// The union of both masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Number of set bits.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates over the set bit positions in ascending order, so lower bit
    /// positions are seen first. Handlers that treat bit position as priority
    /// get priority ordering for free.
    #[must_use]
    pub const fn iter(self) -> Bits {
        Bits(self.0)
    }
}

impl core::ops::BitOr for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::ops::BitAnd for EventMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl core::ops::BitAndAssign for EventMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventMask({:#010x})", self.0)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl FromIterator<EventMask> for EventMask {
    fn from_iter<I: IntoIterator<Item = EventMask>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::union)
    }
}

/// Iterator over the set bit positions of an [`EventMask`], ascending.
#[derive(Debug, Clone)]
pub struct Bits(u32);

impl Iterator for Bits {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let pos = self.0.trailing_zeros() as u8;
        // Clear the lowest set bit.
        self.0 &= self.0 - 1;
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Bits {}

/// A named event occupying one bit of the shared mask.
///
/// Types implementing this trait are small `Copy` enums where each variant
/// owns a distinct bit position. Implement it with [`event_flags!`] rather
/// than by hand; the macro checks at compile time that no two variants share
/// a bit.
pub trait EventFlag: Copy + fmt::Debug + 'static {
    /// Every variant of the implementing enum.
    const VARIANTS: &'static [Self];

    /// Bit position of this event, `0..=31`.
    fn bit(self) -> u8;

    /// Human-readable name, used by [`EventCatalog`] and log output.
    fn name(self) -> &'static str;

    /// The single-bit mask for this event.
    fn mask(self) -> EventMask {
        EventMask::bit(self.bit())
    }
}

/// Defines an event enum together with its bit assignments.
///
/// For each variant the macro generates a `SCREAMING_SNAKE_CASE` mask
/// constant at the invocation site, an `ANY` associated constant covering
/// every defined flag, and an [`EventFlag`] implementation. Duplicate or
/// out-of-range bit positions are rejected at compile time.
///
/// ```
/// use flagstate_core::{event_flags, EventFlag, EventMask};
///
/// event_flags! {
///     pub enum AppEvent {
///         ButtonPress = 0,
///         TimerExpired = 1,
///         LinkUp = 4,
///     }
/// }
///
/// assert_eq!(BUTTON_PRESS, EventMask::bit(0));
/// assert_eq!(AppEvent::LinkUp.name(), "LinkUp");
/// assert!(AppEvent::ANY.contains(TIMER_EXPIRED));
/// ```
#[macro_export]
macro_rules! event_flags {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $bit:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::EventFlag for $name {
            const VARIANTS: &'static [Self] = &[ $( Self::$variant ),+ ];

            fn bit(self) -> u8 {
                match self { $( Self::$variant => $bit ),+ }
            }

            fn name(self) -> &'static str {
                match self { $( Self::$variant => stringify!($variant) ),+ }
            }
        }

        impl $name {
            /// Union of every flag defined for this type.
            $vis const ANY: $crate::EventMask =
                $crate::EventMask::from_bits($( (1u32 << $bit) )|+);
        }

        $crate::__paste::paste! {
            $(
                $(#[$vmeta])*
                $vis const [<$variant:snake:upper>]: $crate::EventMask =
                    $crate::EventMask::bit($bit);
            )+
        }

        const _: () = {
            $( assert!($bit < 32u8, "event_flags!: bit position exceeds the 32-bit mask"); )+
            let union: u32 = $( (1u32 << $bit) )|+;
            let defined = [ $( $name::$variant ),+ ].len();
            assert!(
                union.count_ones() as usize == defined,
                "event_flags!: two events share a bit position"
            );
        };
    };
}

/// Errors detected while building an [`EventCatalog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two events were assigned the same bit position.
    #[error("events `{first}` and `{second}` share bit {bit}")]
    DuplicateBit { bit: u8, first: String, second: String },
    /// The same name was registered twice.
    #[error("event name `{name}` is registered twice")]
    DuplicateName { name: String },
    /// A bit position outside `0..=31`.
    #[error("bit {bit} of event `{name}` exceeds the 32-bit mask")]
    BitOutOfRange { name: String, bit: u8 },
}

/// Runtime registry mapping event names to bit positions.
///
/// [`event_flags!`] validates its assignments at compile time; the catalog
/// covers the cases a macro cannot, such as events loaded from configuration
/// or merged from several enums. Construction checks the same injectivity
/// rule: one bit per event, one event per bit.
///
/// A machine given a catalog via
/// [`StateMachine::with_catalog`](crate::StateMachine::with_catalog) logs
/// event names instead of raw hex masks.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    entries: Vec<(String, u8)>,
}

impl EventCatalog {
    /// Builds a catalog from `(name, bit)` pairs.
    ///
    /// # Errors
    /// Returns [`CatalogError`] if a bit is out of range, a bit is claimed by
    /// two names, or a name is registered twice.
    pub fn new<'a, I>(pairs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, u8)>,
    {
        let mut entries: Vec<(String, u8)> = Vec::new();
        for (name, bit) in pairs {
            if bit >= 32 {
                return Err(CatalogError::BitOutOfRange {
                    name: name.to_owned(),
                    bit,
                });
            }
            if let Some((prev, _)) = entries.iter().find(|(_, b)| *b == bit) {
                return Err(CatalogError::DuplicateBit {
                    bit,
                    first: prev.clone(),
                    second: name.to_owned(),
                });
            }
            if entries.iter().any(|(n, _)| n == name) {
                return Err(CatalogError::DuplicateName {
                    name: name.to_owned(),
                });
            }
            entries.push((name.to_owned(), bit));
        }
        Ok(Self { entries })
    }

    /// Builds a catalog from an [`EventFlag`] enum.
    ///
    /// # Errors
    /// Returns [`CatalogError`] for hand-written `EventFlag` impls that break
    /// the one-bit-per-event rule. Enums generated by [`event_flags!`] cannot
    /// fail here.
    pub fn from_flags<E: EventFlag>() -> Result<Self, CatalogError> {
        Self::new(E::VARIANTS.iter().map(|flag| (flag.name(), flag.bit())))
    }

    /// Number of registered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no event is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single-bit mask registered under `name`.
    #[must_use]
    pub fn mask_of(&self, name: &str) -> Option<EventMask> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, bit)| EventMask::bit(bit))
    }

    /// The name registered for `bit`.
    #[must_use]
    pub fn name_of(&self, bit: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|&&(_, b)| b == bit)
            .map(|(name, _)| name.as_str())
    }

    /// Iterates over `(name, bit)` pairs in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u8)> + '_ {
        self.entries.iter().map(|(name, bit)| (name.as_str(), *bit))
    }

    /// Iterates over the registered names present in `mask`, in ascending
    /// bit order. Bits without a registered name are skipped.
    pub fn names(&self, mask: EventMask) -> impl Iterator<Item = &str> + '_ {
        mask.iter().filter_map(|pos| self.name_of(pos))
    }

    /// Renders a mask as a `|`-joined list of event names.
    ///
    /// Bits without a registered name render as `bit<N>`; the empty mask
    /// renders as `(none)`.
    #[must_use]
    pub fn render(&self, mask: EventMask) -> String {
        if mask.is_empty() {
            return "(none)".to_owned();
        }
        let mut out = String::new();
        for pos in mask.iter() {
            if !out.is_empty() {
                out.push('|');
            }
            match self.name_of(pos) {
                Some(name) => out.push_str(name),
                None => {
                    out.push_str("bit");
                    out.push_str(&pos.to_string());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    event_flags! {
        enum Sample {
            ButtonPress = 0,
            TimerExpired = 1,
            LinkUp = 4,
        }
    }

    #[test]
    fn mask_bit_operations() {
        let m = EventMask::bit(0) | EventMask::bit(5);
        assert!(m.contains(EventMask::bit(0)));
        assert!(m.contains(EventMask::bit(5)));
        assert!(!m.contains(EventMask::bit(1)));
        assert!(m.intersects(EventMask::bit(5) | EventMask::bit(9)));
        assert!(!m.intersects(EventMask::bit(9)));
        assert_eq!(m.count(), 2);
        assert!(!m.is_empty());
        assert!(EventMask::NONE.is_empty());
    }

    #[test]
    fn mask_iterates_ascending() {
        let m = EventMask::bit(7) | EventMask::bit(0) | EventMask::bit(31);
        let positions: Vec<u8> = m.iter().collect();
        assert_eq!(positions, vec![0, 7, 31]);
        assert_eq!(EventMask::NONE.iter().count(), 0);
        assert_eq!(EventMask::ALL.iter().count(), 32);
    }

    #[test]
    fn mask_collects_from_iterator() {
        let m: EventMask = [EventMask::bit(1), EventMask::bit(2), EventMask::bit(1)]
            .into_iter()
            .collect();
        assert_eq!(m, EventMask::from_bits(0b110));
    }

    #[test]
    fn mask_formatting() {
        let m = EventMask::bit(0) | EventMask::bit(4);
        assert_eq!(format!("{m:?}"), "EventMask(0x00000011)");
        assert_eq!(format!("{m}"), "0x00000011");
    }

    #[test]
    #[should_panic(expected = "exceeds the 32-bit mask")]
    fn mask_rejects_out_of_range_bit() {
        let _ = EventMask::bit(32);
    }

    #[test]
    fn generated_constants_match_variants() {
        assert_eq!(BUTTON_PRESS, EventMask::bit(0));
        assert_eq!(TIMER_EXPIRED, EventMask::bit(1));
        assert_eq!(LINK_UP, EventMask::bit(4));
        assert_eq!(Sample::ANY, BUTTON_PRESS | TIMER_EXPIRED | LINK_UP);
    }

    #[test]
    fn flag_trait_surface() {
        assert_eq!(Sample::VARIANTS.len(), 3);
        assert_eq!(Sample::ButtonPress.bit(), 0);
        assert_eq!(Sample::ButtonPress.name(), "ButtonPress");
        assert_eq!(Sample::LinkUp.mask(), LINK_UP);
    }

    #[test]
    fn catalog_from_flags() {
        let catalog = EventCatalog::from_flags::<Sample>().unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.mask_of("LinkUp"), Some(EventMask::bit(4)));
        assert_eq!(catalog.mask_of("NoSuchEvent"), None);
        assert_eq!(catalog.name_of(1), Some("TimerExpired"));
        assert_eq!(catalog.name_of(2), None);
    }

    #[test]
    fn catalog_rejects_duplicate_bit() {
        let err = EventCatalog::new([("a", 3), ("b", 3)]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateBit {
                bit: 3,
                first: "a".to_owned(),
                second: "b".to_owned(),
            }
        );
    }

    #[test]
    fn catalog_rejects_duplicate_name() {
        let err = EventCatalog::new([("a", 0), ("a", 1)]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateName { name: "a".to_owned() });
    }

    #[test]
    fn catalog_rejects_out_of_range_bit() {
        let err = EventCatalog::new([("a", 32)]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::BitOutOfRange {
                name: "a".to_owned(),
                bit: 32,
            }
        );
    }

    #[test]
    fn catalog_renders_names() {
        let catalog = EventCatalog::from_flags::<Sample>().unwrap();
        assert_eq!(catalog.render(BUTTON_PRESS | LINK_UP), "ButtonPress|LinkUp");
        assert_eq!(catalog.render(EventMask::bit(9)), "bit9");
        assert_eq!(catalog.render(EventMask::NONE), "(none)");
    }

    #[test]
    fn catalog_names_skip_unregistered_bits() {
        let catalog = EventCatalog::from_flags::<Sample>().unwrap();
        let mask = BUTTON_PRESS | LINK_UP | EventMask::bit(9);
        let named: Vec<&str> = catalog.names(mask).collect();
        assert_eq!(named, ["ButtonPress", "LinkUp"]);
        assert_eq!(catalog.names(EventMask::NONE).count(), 0);
    }
}
